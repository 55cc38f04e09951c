use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::nullable;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub slug: String,
    pub image: Option<String>,
    pub description: Option<String>,
    pub parent_id: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewCategory {
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub is_active: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryPatch {
    pub name: Option<String>,
    pub slug: Option<String>,
    #[serde(default, deserialize_with = "nullable::deserialize")]
    pub image: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable::deserialize")]
    pub description: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable::deserialize")]
    pub parent_id: Option<Option<String>>,
    pub is_active: Option<bool>,
}

/// A purchasable growth service listed in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Service {
    pub id: String,
    pub title: String,
    pub description: String,
    pub price: f64,
    /// Delivery time in days.
    pub duration: i64,
    pub category_id: String,
    pub provider_id: String,
    pub images: Vec<String>,
    pub tags: Vec<String>,
    pub is_active: bool,
    pub is_featured: bool,
    pub rating: f64,
    pub review_count: i64,
    pub views: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewService {
    pub title: String,
    pub description: String,
    pub price: f64,
    pub duration: i64,
    pub category_id: String,
    pub provider_id: String,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub is_featured: bool,
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub review_count: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServicePatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub duration: Option<i64>,
    pub category_id: Option<String>,
    pub images: Option<Vec<String>>,
    pub tags: Option<Vec<String>>,
    pub is_active: Option<bool>,
    pub is_featured: Option<bool>,
    pub rating: Option<f64>,
    pub review_count: Option<i64>,
}
