//! Wire-level entity types shared by the data layer and the HTTP surface.
//!
//! Everything here is plain serde data: no storage knowledge lives in this crate.

pub mod access;
pub mod catalog;
pub mod commerce;
pub mod file;
pub mod notification;
pub mod nullable;
pub mod page;
pub mod status;
pub mod user;

pub use access::{ApiKey, ApiKeyPatch, NewApiKey, NewSession, Session, SessionPatch};
pub use catalog::{Category, CategoryPatch, NewCategory, NewService, Service, ServicePatch};
pub use commerce::{
    NewOrder, NewPayment, NewPaymentIntent, Order, OrderPatch, Payment, PaymentIntent,
    PaymentIntentPatch, PaymentPatch,
};
pub use file::{File, FilePatch, NewFile};
pub use notification::{NewNotification, Notification, NotificationPatch};
pub use page::PaginatedResult;
pub use status::{
    NotificationKind, OrderStatus, PaymentIntentStatus, PaymentStatus, UnknownVariant, UserRole,
    UserStatus,
};
pub use user::{NewUser, User, UserPatch};

/// Structured JSON object stored in a blob column.
pub type JsonObject = serde_json::Map<String, serde_json::Value>;
