mod store;

pub use store::{ApiErrorBody, ConstraintKind, StoreError};
