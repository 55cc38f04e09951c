use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::JsonObject;
use crate::nullable;
use crate::status::{OrderStatus, PaymentIntentStatus, PaymentStatus};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    pub user_id: String,
    pub service_id: String,
    pub status: OrderStatus,
    pub amount: f64,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewOrder {
    pub user_id: String,
    pub service_id: String,
    #[serde(default)]
    pub status: OrderStatus,
    pub amount: f64,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderPatch {
    pub status: Option<OrderStatus>,
    pub amount: Option<f64>,
    #[serde(default, deserialize_with = "nullable::deserialize")]
    pub notes: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable::deserialize")]
    pub completed_at: Option<Option<DateTime<Utc>>>,
    #[serde(default, deserialize_with = "nullable::deserialize")]
    pub cancelled_at: Option<Option<DateTime<Utc>>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: String,
    pub order_id: String,
    pub amount: f64,
    pub currency: String,
    pub status: PaymentStatus,
    pub payment_method: Option<String>,
    pub transaction_id: Option<String>,
    pub metadata: JsonObject,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewPayment {
    pub order_id: String,
    pub amount: f64,
    /// Defaults to `USD` when empty.
    #[serde(default)]
    pub currency: String,
    #[serde(default)]
    pub status: PaymentStatus,
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub transaction_id: Option<String>,
    #[serde(default)]
    pub metadata: JsonObject,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaymentPatch {
    pub status: Option<PaymentStatus>,
    #[serde(default, deserialize_with = "nullable::deserialize")]
    pub payment_method: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable::deserialize")]
    pub transaction_id: Option<Option<String>>,
    pub metadata: Option<JsonObject>,
    #[serde(default, deserialize_with = "nullable::deserialize")]
    pub completed_at: Option<Option<DateTime<Utc>>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    pub order_id: String,
    pub amount: f64,
    pub currency: String,
    pub status: PaymentIntentStatus,
    #[serde(skip_serializing)]
    pub client_secret: String,
    pub payment_method_types: Vec<String>,
    pub metadata: JsonObject,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewPaymentIntent {
    pub order_id: String,
    pub amount: f64,
    pub currency: String,
    #[serde(default)]
    pub status: PaymentIntentStatus,
    pub client_secret: String,
    #[serde(default)]
    pub payment_method_types: Vec<String>,
    #[serde(default)]
    pub metadata: JsonObject,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaymentIntentPatch {
    pub status: Option<PaymentIntentStatus>,
    pub payment_method_types: Option<Vec<String>>,
    pub metadata: Option<JsonObject>,
}
