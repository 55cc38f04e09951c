//! Typed CRUD over any [`Record`], plus per-entity extensions.

mod access;
mod catalog;
mod commerce;
mod files;
mod notifications;
mod users;

use chrono::Utc;
use nawth_schema::{
    ApiKey, Category, File, Notification, Order, PaginatedResult, Payment, PaymentIntent, Service,
    Session, User,
};
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::{debug, info};

use crate::db::backend::{Assignment, Backend};
use crate::db::codec::{self, Record};
use crate::db::connection::ConnectionManager;
use crate::db::query::{FilterSet, ListQuery, Pagination, Sort};
use crate::db::value::{DbValue, Row};
use crate::error::StoreError;

pub struct Repository<E> {
    db: Arc<ConnectionManager>,
    _entity: PhantomData<fn() -> E>,
}

impl<E> Clone for Repository<E> {
    fn clone(&self) -> Self {
        Self {
            db: self.db.clone(),
            _entity: PhantomData,
        }
    }
}

impl<E: Record> Repository<E> {
    pub fn new(db: Arc<ConnectionManager>) -> Self {
        Self {
            db,
            _entity: PhantomData,
        }
    }

    async fn backend(&self) -> Result<Arc<dyn Backend>, StoreError> {
        self.db.handle().await
    }

    /// Guard applied to every default read and write.
    fn live() -> FilterSet {
        if E::TABLE.soft_delete {
            FilterSet::new().is_null("deleted_at")
        } else {
            FilterSet::new()
        }
    }

    fn decode_all(rows: &[Row]) -> Result<Vec<E>, StoreError> {
        rows.iter().map(E::decode).collect()
    }

    pub async fn create(&self, new: E::New) -> Result<E, StoreError> {
        let row = codec::insert_row::<E>(new, Utc::now());
        let stored = self.backend().await?.insert(&E::TABLE, row).await?;
        E::decode(&stored)
    }

    pub async fn get_by_id(&self, id: &str) -> Result<Option<E>, StoreError> {
        let filters = Self::live().eq("id", id);
        self.find_one(filters).await
    }

    /// Lookup on a unique column.
    pub async fn get_by(
        &self,
        column: &'static str,
        value: impl Into<DbValue>,
    ) -> Result<Option<E>, StoreError> {
        if !E::TABLE.unique.contains(&column) {
            return Err(StoreError::InvalidFilter(format!(
                "column {column:?} is not a unique key of {}",
                E::TABLE.name
            )));
        }
        self.find_one(Self::live().eq(column, value)).await
    }

    pub(crate) async fn find_one(&self, filters: FilterSet) -> Result<Option<E>, StoreError> {
        self.backend()
            .await?
            .find_one(&E::TABLE, &filters)
            .await?
            .as_ref()
            .map(E::decode)
            .transpose()
    }

    /// Applies `patch` and re-stamps `updated_at`. `None` when the row does not
    /// exist or is soft-deleted.
    pub async fn update(&self, id: &str, patch: &E::Patch) -> Result<Option<E>, StoreError> {
        let set = codec::update_assignments::<E>(patch, Utc::now());
        self.update_columns(id, set).await
    }

    pub(crate) async fn update_columns(
        &self,
        id: &str,
        mut set: Vec<Assignment>,
    ) -> Result<Option<E>, StoreError> {
        if !set.iter().any(|a| a.column == "updated_at") {
            set.push(Assignment::new("updated_at", Utc::now()));
        }
        let updated = self
            .backend()
            .await?
            .update_by_id(&E::TABLE, id, &Self::live(), &set)
            .await?;
        updated.as_ref().map(E::decode).transpose()
    }

    /// Bulk update of live rows matching `filters`; returns the affected count.
    pub(crate) async fn update_matching(
        &self,
        filters: FilterSet,
        mut set: Vec<Assignment>,
    ) -> Result<u64, StoreError> {
        set.push(Assignment::new("updated_at", Utc::now()));
        let filters = Self::live().and(filters);
        self.backend()
            .await?
            .update_where(&E::TABLE, &filters, &set)
            .await
    }

    /// Soft delete when the table supports it, physical delete otherwise.
    pub async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        if !E::TABLE.soft_delete {
            return self.purge(id).await;
        }
        let now = Utc::now();
        let mut set = vec![
            Assignment::new("deleted_at", now),
            Assignment::new("updated_at", now),
        ];
        set.extend(E::soft_delete_assignments());
        let deleted = self
            .backend()
            .await?
            .update_by_id(&E::TABLE, id, &Self::live(), &set)
            .await?
            .is_some();
        if deleted {
            info!(table = E::TABLE.name, id, "row soft-deleted");
        }
        Ok(deleted)
    }

    /// Physical delete, regardless of soft-delete support.
    pub async fn purge(&self, id: &str) -> Result<bool, StoreError> {
        self.purge_matching(FilterSet::new().eq("id", id)).await.map(|n| n > 0)
    }

    pub(crate) async fn purge_matching(&self, filters: FilterSet) -> Result<u64, StoreError> {
        let affected = self
            .backend()
            .await?
            .delete_where(&E::TABLE, &filters)
            .await?;
        if affected > 0 {
            info!(table = E::TABLE.name, affected, "rows deleted");
        }
        Ok(affected)
    }

    /// One page of live rows. `total` and `data` come from the same filter set.
    pub async fn list(&self, query: &ListQuery) -> Result<PaginatedResult<E>, StoreError> {
        query.filters.validate(E::FILTERABLE)?;
        let sort = Sort::resolve(
            E::SORTABLE,
            query.sort_by.as_deref(),
            query.sort_order,
            E::DEFAULT_SORT,
        )?;
        let filters = Self::live().and(query.filters.clone());
        self.page(&filters, &sort, query.pagination).await
    }

    pub(crate) async fn page(
        &self,
        filters: &FilterSet,
        sort: &Sort,
        pagination: Pagination,
    ) -> Result<PaginatedResult<E>, StoreError> {
        let backend = self.backend().await?;
        let total = backend.count(&E::TABLE, filters).await?;
        let rows = backend
            .find_many(&E::TABLE, filters, Some(sort), Some(&pagination))
            .await?;
        debug!(
            table = E::TABLE.name,
            total,
            returned = rows.len(),
            page = pagination.page,
            "page listed"
        );
        Ok(PaginatedResult::new(
            Self::decode_all(&rows)?,
            total,
            pagination.page,
            pagination.limit,
        ))
    }

    /// Every live row matching `filters`, unpaginated.
    pub(crate) async fn find_all(
        &self,
        filters: FilterSet,
        sort: &Sort,
    ) -> Result<Vec<E>, StoreError> {
        let filters = Self::live().and(filters);
        let rows = self
            .backend()
            .await?
            .find_many(&E::TABLE, &filters, Some(sort), None)
            .await?;
        Self::decode_all(&rows)
    }

    /// Number of live rows matching `filters`.
    pub async fn count(&self, filters: &FilterSet) -> Result<u64, StoreError> {
        filters.validate(E::FILTERABLE)?;
        let filters = Self::live().and(filters.clone());
        self.backend().await?.count(&E::TABLE, &filters).await
    }

    /// `column = column + delta` on a live row; `false` when nothing matched.
    pub async fn increment(
        &self,
        id: &str,
        column: &'static str,
        delta: i64,
    ) -> Result<bool, StoreError> {
        self.increment_with(id, column, delta, Vec::new()).await
    }

    pub(crate) async fn increment_with(
        &self,
        id: &str,
        column: &'static str,
        delta: i64,
        mut set: Vec<Assignment>,
    ) -> Result<bool, StoreError> {
        if !E::COUNTERS.contains(&column) {
            return Err(StoreError::InvalidFilter(format!(
                "column {column:?} of {} is not a counter",
                E::TABLE.name
            )));
        }
        set.push(Assignment::new("updated_at", Utc::now()));
        let affected = self
            .backend()
            .await?
            .increment(&E::TABLE, id, &Self::live(), column, delta, &set)
            .await?;
        Ok(affected > 0)
    }
}

/// One repository per entity over a shared connection manager.
#[derive(Clone)]
pub struct Repositories {
    pub db: Arc<ConnectionManager>,
    pub users: Repository<User>,
    pub categories: Repository<Category>,
    pub services: Repository<Service>,
    pub orders: Repository<Order>,
    pub payments: Repository<Payment>,
    pub payment_intents: Repository<PaymentIntent>,
    pub notifications: Repository<Notification>,
    pub files: Repository<File>,
    pub api_keys: Repository<ApiKey>,
    pub sessions: Repository<Session>,
}

impl Repositories {
    pub fn new(db: Arc<ConnectionManager>) -> Self {
        Self {
            users: Repository::new(db.clone()),
            categories: Repository::new(db.clone()),
            services: Repository::new(db.clone()),
            orders: Repository::new(db.clone()),
            payments: Repository::new(db.clone()),
            payment_intents: Repository::new(db.clone()),
            notifications: Repository::new(db.clone()),
            files: Repository::new(db.clone()),
            api_keys: Repository::new(db.clone()),
            sessions: Repository::new(db.clone()),
            db,
        }
    }
}
