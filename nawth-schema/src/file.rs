use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::JsonObject;

/// An uploaded asset owned by a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct File {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub url: String,
    pub size: Option<i64>,
    #[serde(rename = "type")]
    pub mime_type: Option<String>,
    pub metadata: JsonObject,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewFile {
    pub user_id: String,
    pub name: String,
    pub url: String,
    #[serde(default)]
    pub size: Option<i64>,
    #[serde(rename = "type", default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub metadata: JsonObject,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilePatch {
    pub name: Option<String>,
    pub url: Option<String>,
    pub metadata: Option<JsonObject>,
}
