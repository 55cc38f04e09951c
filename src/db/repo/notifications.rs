use chrono::Utc;
use nawth_schema::{Notification, PaginatedResult};

use super::Repository;
use crate::db::backend::Assignment;
use crate::db::codec::encode_bool;
use crate::db::query::{FilterSet, ListQuery};
use crate::error::StoreError;

impl Repository<Notification> {
    pub async fn list_for_user(
        &self,
        user_id: &str,
        query: &ListQuery,
    ) -> Result<PaginatedResult<Notification>, StoreError> {
        let mut scoped = query.clone();
        scoped.filters = scoped.filters.eq("user_id", user_id);
        self.list(&scoped).await
    }

    pub async fn mark_read(&self, id: &str) -> Result<Option<Notification>, StoreError> {
        let set = vec![
            Assignment::new("is_read", encode_bool(true)),
            Assignment::new("read_at", Utc::now()),
        ];
        self.update_columns(id, set).await
    }

    /// Marks every unread notification of `user_id`; returns how many changed.
    pub async fn mark_all_read(&self, user_id: &str) -> Result<u64, StoreError> {
        let unread = FilterSet::new()
            .eq("user_id", user_id)
            .eq("is_read", encode_bool(false));
        let set = vec![
            Assignment::new("is_read", encode_bool(true)),
            Assignment::new("read_at", Utc::now()),
        ];
        self.update_matching(unread, set).await
    }

    pub async fn unread_count(&self, user_id: &str) -> Result<u64, StoreError> {
        let unread = FilterSet::new()
            .eq("user_id", user_id)
            .eq("is_read", encode_bool(false));
        self.count(&unread).await
    }
}
