use chrono::Utc;
use nawth_schema::User;

use super::Repository;
use crate::db::backend::Assignment;
use crate::error::StoreError;

impl Repository<User> {
    pub async fn get_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        self.get_by("email", email).await
    }

    pub async fn get_by_username(&self, username: &str) -> Result<Option<User>, StoreError> {
        self.get_by("username", username).await
    }

    /// Stamps `last_login` with the current time.
    pub async fn record_login(&self, id: &str) -> Result<Option<User>, StoreError> {
        self.update_columns(id, vec![Assignment::new("last_login", Utc::now())])
            .await
    }
}
