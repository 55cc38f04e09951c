use chrono::{DateTime, Utc};
use nawth_schema::{ApiKey, Session};

use super::Repository;
use crate::db::backend::Assignment;
use crate::db::query::FilterSet;
use crate::error::StoreError;

impl Repository<ApiKey> {
    pub async fn get_by_hash(&self, key_hash: &str) -> Result<Option<ApiKey>, StoreError> {
        self.get_by("key_hash", key_hash).await
    }

    /// Stamps `last_used_at`.
    pub async fn touch(&self, id: &str) -> Result<Option<ApiKey>, StoreError> {
        self.update_columns(id, vec![Assignment::new("last_used_at", Utc::now())])
            .await
    }

    /// Revoked keys are gone for good.
    pub async fn revoke(&self, id: &str) -> Result<bool, StoreError> {
        self.purge(id).await
    }

    /// Adds `delta` to the quota counter and stamps `last_used_at`.
    pub async fn increment_usage(&self, id: &str, delta: i64) -> Result<bool, StoreError> {
        let set = vec![Assignment::new("last_used_at", Utc::now())];
        self.increment_with(id, "usage_count", delta, set).await
    }
}

impl Repository<Session> {
    /// Only sessions that have not expired yet.
    pub async fn get_by_token(&self, token: &str) -> Result<Option<Session>, StoreError> {
        let filters = FilterSet::new()
            .eq("token", token)
            .gt("expires_at", Utc::now());
        self.find_one(filters).await
    }

    /// Stamps `last_accessed_at`.
    pub async fn touch(&self, id: &str) -> Result<Option<Session>, StoreError> {
        self.update_columns(id, vec![Assignment::new("last_accessed_at", Utc::now())])
            .await
    }

    /// Deletes sessions that expired before `now`; returns how many.
    pub async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        self.purge_matching(FilterSet::new().lt("expires_at", now))
            .await
    }
}
