use chrono::Utc;
use nawth_schema::{
    Order, OrderStatus, PaginatedResult, Payment, PaymentIntent, PaymentIntentStatus,
    PaymentStatus,
};

use super::Repository;
use crate::db::backend::Assignment;
use crate::db::query::ListQuery;
use crate::error::StoreError;

impl Repository<Order> {
    pub async fn list_for_user(
        &self,
        user_id: &str,
        query: &ListQuery,
    ) -> Result<PaginatedResult<Order>, StoreError> {
        let mut scoped = query.clone();
        scoped.filters = scoped.filters.eq("user_id", user_id);
        self.list(&scoped).await
    }

    /// Sets `status`, stamping `completed_at` or `cancelled_at` on the matching
    /// transition. `notes`, when given, replaces the current notes.
    pub async fn update_status(
        &self,
        id: &str,
        status: OrderStatus,
        notes: Option<String>,
    ) -> Result<Option<Order>, StoreError> {
        let now = Utc::now();
        let mut set = vec![Assignment::new("status", status.as_str())];
        match status {
            OrderStatus::Completed => set.push(Assignment::new("completed_at", now)),
            OrderStatus::Cancelled => set.push(Assignment::new("cancelled_at", now)),
            _ => {}
        }
        if let Some(notes) = notes {
            set.push(Assignment::new("notes", notes));
        }
        self.update_columns(id, set).await
    }
}

impl Repository<Payment> {
    /// Sets `status`; `completed` and `refunded` stamp `completed_at`.
    pub async fn update_status(
        &self,
        id: &str,
        status: PaymentStatus,
        transaction_id: Option<String>,
    ) -> Result<Option<Payment>, StoreError> {
        let mut set = vec![Assignment::new("status", status.as_str())];
        if matches!(status, PaymentStatus::Completed | PaymentStatus::Refunded) {
            set.push(Assignment::new("completed_at", Utc::now()));
        }
        if let Some(transaction_id) = transaction_id {
            set.push(Assignment::new("transaction_id", transaction_id));
        }
        self.update_columns(id, set).await
    }
}

impl Repository<PaymentIntent> {
    pub async fn update_status(
        &self,
        id: &str,
        status: PaymentIntentStatus,
    ) -> Result<Option<PaymentIntent>, StoreError> {
        self.update_columns(id, vec![Assignment::new("status", status.as_str())])
            .await
    }
}
