use nawth_schema::{Category, PaginatedResult, Service};

use super::Repository;
use crate::db::codec::Record;
use crate::db::query::{Filter, FilterOp, ListQuery, Sort};
use crate::error::StoreError;

impl Repository<Category> {
    pub async fn get_by_slug(&self, slug: &str) -> Result<Option<Category>, StoreError> {
        self.get_by("slug", slug).await
    }
}

impl Repository<Service> {
    pub async fn increment_views(&self, id: &str) -> Result<bool, StoreError> {
        self.increment(id, "views", 1).await
    }

    /// Services whose title, description or tags contain `text`, on top of the
    /// query's own filters. A blank `text` degrades to a plain `list`.
    pub async fn search(
        &self,
        text: &str,
        query: &ListQuery,
    ) -> Result<PaginatedResult<Service>, StoreError> {
        let text = text.trim();
        if text.is_empty() {
            return self.list(query).await;
        }
        query.filters.validate(Service::FILTERABLE)?;
        let sort = Sort::resolve(
            Service::SORTABLE,
            query.sort_by.as_deref(),
            query.sort_order,
            Service::DEFAULT_SORT,
        )?;
        let filters = Self::live().and(query.filters.clone()).any_of(
            ["title", "description", "tags"]
                .into_iter()
                .map(|column| Filter::new(column, FilterOp::Like(text.to_string())))
                .collect(),
        );
        self.page(&filters, &sort, query.pagination).await
    }
}
