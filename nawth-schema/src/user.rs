use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::JsonObject;
use crate::nullable;
use crate::status::{UserRole, UserStatus};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub avatar: Option<String>,
    pub role: UserRole,
    pub status: UserStatus,
    pub email_verified: bool,
    pub settings: JsonObject,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewUser {
    pub email: String,
    pub username: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub role: UserRole,
    #[serde(default)]
    pub status: UserStatus,
    #[serde(default)]
    pub email_verified: bool,
    /// Missing settings are stored as `{}`.
    #[serde(default)]
    pub settings: Option<JsonObject>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserPatch {
    pub email: Option<String>,
    pub username: Option<String>,
    pub password_hash: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    #[serde(default, deserialize_with = "nullable::deserialize")]
    pub phone: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable::deserialize")]
    pub avatar: Option<Option<String>>,
    pub role: Option<UserRole>,
    pub status: Option<UserStatus>,
    pub email_verified: Option<bool>,
    #[serde(default, deserialize_with = "nullable::deserialize")]
    pub last_login: Option<Option<DateTime<Utc>>>,
    pub settings: Option<JsonObject>,
}
