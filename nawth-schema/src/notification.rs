use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::JsonObject;
use crate::nullable;
use crate::status::NotificationKind;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub is_read: bool,
    pub metadata: JsonObject,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub read_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewNotification {
    pub user_id: String,
    pub title: String,
    pub message: String,
    #[serde(rename = "type", default)]
    pub kind: NotificationKind,
    #[serde(default)]
    pub is_read: bool,
    #[serde(default)]
    pub metadata: JsonObject,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NotificationPatch {
    pub title: Option<String>,
    pub message: Option<String>,
    pub is_read: Option<bool>,
    #[serde(default, deserialize_with = "nullable::deserialize")]
    pub read_at: Option<Option<DateTime<Utc>>>,
    pub metadata: Option<JsonObject>,
}
