//! Filter sets, pagination and sorting.
//!
//! A [`FilterSet`] is the backend-neutral description of a `WHERE` clause.
//! The SQLite backend renders it with [`build_filter`]; the document backend
//! evaluates it in memory. Column names are checked against per-entity
//! allow-lists before they reach either backend, and values are never
//! interpolated into SQL text.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::db::value::DbValue;
use crate::error::StoreError;

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_LIMIT: i64 = 10;
pub const MAX_LIMIT: i64 = 100;

/// Comparison applied to a single column.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterOp {
    Eq(DbValue),
    Gt(DbValue),
    Lt(DbValue),
    /// Substring match; the builder adds the surrounding wildcards.
    Like(String),
    In(Vec<DbValue>),
    IsNull,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub column: String,
    pub op: FilterOp,
}

impl Filter {
    pub fn new(column: impl Into<String>, op: FilterOp) -> Self {
        Self {
            column: column.into(),
            op,
        }
    }

    /// `Eq(NULL)` means "no constraint", not `column IS NULL`.
    fn is_absent(&self) -> bool {
        matches!(&self.op, FilterOp::Eq(v) if v.is_null())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    All(Filter),
    /// At least one of the filters must hold.
    AnyOf(Vec<Filter>),
}

/// Conjunction of conditions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FilterSet {
    conditions: Vec<Condition>,
}

impl FilterSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, filter: Filter) {
        if !filter.is_absent() {
            self.conditions.push(Condition::All(filter));
        }
    }

    pub fn with(mut self, column: impl Into<String>, op: FilterOp) -> Self {
        self.push(Filter::new(column, op));
        self
    }

    pub fn eq(self, column: impl Into<String>, value: impl Into<DbValue>) -> Self {
        self.with(column, FilterOp::Eq(value.into()))
    }

    pub fn gt(self, column: impl Into<String>, value: impl Into<DbValue>) -> Self {
        self.with(column, FilterOp::Gt(value.into()))
    }

    pub fn lt(self, column: impl Into<String>, value: impl Into<DbValue>) -> Self {
        self.with(column, FilterOp::Lt(value.into()))
    }

    pub fn like(self, column: impl Into<String>, needle: impl Into<String>) -> Self {
        self.with(column, FilterOp::Like(needle.into()))
    }

    pub fn is_in<V: Into<DbValue>>(
        self,
        column: impl Into<String>,
        values: impl IntoIterator<Item = V>,
    ) -> Self {
        let values = values.into_iter().map(Into::into).collect();
        self.with(column, FilterOp::In(values))
    }

    pub fn is_null(self, column: impl Into<String>) -> Self {
        self.with(column, FilterOp::IsNull)
    }

    pub fn any_of(mut self, filters: Vec<Filter>) -> Self {
        let filters: Vec<Filter> = filters.into_iter().filter(|f| !f.is_absent()).collect();
        if !filters.is_empty() {
            self.conditions.push(Condition::AnyOf(filters));
        }
        self
    }

    /// Appends every condition of `other`.
    pub fn and(mut self, other: FilterSet) -> Self {
        self.conditions.extend(other.conditions);
        self
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.conditions.iter().flat_map(|c| match c {
            Condition::All(f) => std::slice::from_ref(f).iter(),
            Condition::AnyOf(fs) => fs.iter(),
        })
        .map(|f| f.column.as_str())
    }

    /// Rejects any column outside `allowed`.
    pub fn validate(&self, allowed: &[&str]) -> Result<(), StoreError> {
        match self.columns().find(|c| !allowed.contains(c)) {
            Some(column) => Err(StoreError::InvalidFilter(format!(
                "column {column:?} is not filterable"
            ))),
            None => Ok(()),
        }
    }

    /// Parses the query-string convention where the operator is encoded as a
    /// key suffix (`price_gt`, `title_like`, `status_in`, plain key = equality).
    /// `null` values are skipped. A non-array `_in` value is a one-element list.
    pub fn from_suffixed(map: &serde_json::Map<String, Value>) -> Self {
        let mut set = FilterSet::new();
        for (key, value) in map {
            if value.is_null() {
                continue;
            }
            let filter = if let Some(column) = key.strip_suffix("_like") {
                let needle = match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                Filter::new(column, FilterOp::Like(needle))
            } else if let Some(column) = key.strip_suffix("_gt") {
                Filter::new(column, FilterOp::Gt(DbValue::from_json(value)))
            } else if let Some(column) = key.strip_suffix("_lt") {
                Filter::new(column, FilterOp::Lt(DbValue::from_json(value)))
            } else if let Some(column) = key.strip_suffix("_in") {
                let values = match value {
                    Value::Array(items) => items.iter().map(DbValue::from_json).collect(),
                    single => vec![DbValue::from_json(single)],
                };
                Filter::new(column, FilterOp::In(values))
            } else {
                Filter::new(key.as_str(), FilterOp::Eq(DbValue::from_json(value)))
            };
            set.push(filter);
        }
        set
    }
}

/// Rendered `WHERE` clause plus its positional parameters.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WhereClause {
    /// Either empty or `WHERE ...`.
    pub sql: String,
    pub params: Vec<DbValue>,
}

impl WhereClause {
    pub fn is_empty(&self) -> bool {
        self.sql.is_empty()
    }
}

fn render_filter(filter: &Filter, params: &mut Vec<DbValue>) -> String {
    let column = filter.column.as_str();
    match &filter.op {
        FilterOp::Eq(v) => {
            params.push(v.clone());
            format!("{column} = ?")
        }
        FilterOp::Gt(v) => {
            params.push(v.clone());
            format!("{column} > ?")
        }
        FilterOp::Lt(v) => {
            params.push(v.clone());
            format!("{column} < ?")
        }
        FilterOp::Like(needle) => {
            params.push(DbValue::Text(format!("%{needle}%")));
            format!("{column} LIKE ?")
        }
        FilterOp::In(values) if values.is_empty() => "1 = 0".to_string(),
        FilterOp::In(values) => {
            params.extend(values.iter().cloned());
            let placeholders = vec!["?"; values.len()].join(", ");
            format!("{column} IN ({placeholders})")
        }
        FilterOp::IsNull => format!("{column} IS NULL"),
    }
}

/// Renders a filter set as a parameterized SQL `WHERE` clause.
pub fn build_filter(filters: &FilterSet) -> WhereClause {
    let mut params = Vec::new();
    let clauses: Vec<String> = filters
        .conditions
        .iter()
        .map(|condition| match condition {
            Condition::All(f) => render_filter(f, &mut params),
            Condition::AnyOf(fs) => {
                let parts: Vec<String> = fs.iter().map(|f| render_filter(f, &mut params)).collect();
                format!("({})", parts.join(" OR "))
            }
        })
        .collect();

    if clauses.is_empty() {
        return WhereClause::default();
    }
    WhereClause {
        sql: format!("WHERE {}", clauses.join(" AND ")),
        params,
    }
}

/// Normalized page window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
}

impl Pagination {
    /// Clamps `page` to at least 1 and `limit` to `1..=100`.
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "both values are clamped into u32 range first"
    )]
    pub fn new(page: i64, limit: i64) -> Self {
        Self {
            page: page.clamp(1, i64::from(u32::MAX)) as u32,
            limit: limit.clamp(1, MAX_LIMIT) as u32,
        }
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE, DEFAULT_LIMIT)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[serde(alias = "ASC")]
    Asc,
    #[default]
    #[serde(alias = "DESC")]
    Desc,
}

impl SortOrder {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// A resolved sort: the column is always a physical column from an allow-list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sort {
    column: &'static str,
    order: SortOrder,
}

impl Sort {
    /// Maps a caller-supplied logical key through `allowed` (`(logical, physical)`
    /// pairs). `None` falls back to `default`.
    pub fn resolve(
        allowed: &[(&'static str, &'static str)],
        key: Option<&str>,
        order: Option<SortOrder>,
        default: (&'static str, SortOrder),
    ) -> Result<Self, StoreError> {
        let Some(key) = key else {
            return Ok(Self {
                column: default.0,
                order: order.unwrap_or(default.1),
            });
        };
        allowed
            .iter()
            .find(|(logical, _)| *logical == key)
            .map(|(_, physical)| Self {
                column: physical,
                order: order.unwrap_or(default.1),
            })
            .ok_or_else(|| StoreError::InvalidSort(format!("cannot sort by {key:?}")))
    }

    pub fn column(&self) -> &'static str {
        self.column
    }

    pub fn order(&self) -> SortOrder {
        self.order
    }

    /// `ORDER BY` with `id` as the tie-break so page windows never overlap.
    pub fn to_sql(&self) -> String {
        if self.column == "id" {
            format!("ORDER BY id {}", self.order.as_sql())
        } else {
            format!("ORDER BY {} {}, id ASC", self.column, self.order.as_sql())
        }
    }
}

/// Everything a `list` call needs.
#[derive(Debug, Clone, Default)]
pub struct ListQuery {
    pub filters: FilterSet,
    pub pagination: Pagination,
    pub sort_by: Option<String>,
    pub sort_order: Option<SortOrder>,
}

impl ListQuery {
    pub fn new(filters: FilterSet) -> Self {
        Self {
            filters,
            ..Default::default()
        }
    }

    pub fn page(mut self, page: i64, limit: i64) -> Self {
        self.pagination = Pagination::new(page, limit);
        self
    }

    pub fn sort(mut self, key: impl Into<String>, order: SortOrder) -> Self {
        self.sort_by = Some(key.into());
        self.sort_order = Some(order);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_set_renders_no_where() {
        let clause = build_filter(&FilterSet::new());
        assert!(clause.is_empty());
        assert!(clause.params.is_empty());
    }

    #[test]
    fn operators_render_placeholders_only() {
        let set = FilterSet::new()
            .gt("price", 10)
            .lt("price", 50)
            .like("title", "boost'; DROP TABLE services;--")
            .is_in("status", ["active", "pending"]);
        let clause = build_filter(&set);
        assert_eq!(
            clause.sql,
            "WHERE price > ? AND price < ? AND title LIKE ? AND status IN (?, ?)"
        );
        assert!(!clause.sql.contains("DROP"));
        assert!(!clause.sql.contains("active"));
        assert_eq!(
            clause.params,
            vec![
                DbValue::Integer(10),
                DbValue::Integer(50),
                DbValue::Text("%boost'; DROP TABLE services;--%".into()),
                DbValue::Text("active".into()),
                DbValue::Text("pending".into()),
            ]
        );
    }

    #[test]
    fn null_equality_is_skipped() {
        let set = FilterSet::new().eq("phone", DbValue::Null).eq("role", "admin");
        assert_eq!(build_filter(&set).sql, "WHERE role = ?");
    }

    #[test]
    fn any_of_is_parenthesized() {
        let set = FilterSet::new().is_null("deleted_at").any_of(vec![
            Filter::new("title", FilterOp::Like("x".into())),
            Filter::new("tags", FilterOp::Like("x".into())),
        ]);
        assert_eq!(
            build_filter(&set).sql,
            "WHERE deleted_at IS NULL AND (title LIKE ? OR tags LIKE ?)"
        );
    }

    #[test]
    fn empty_in_matches_nothing() {
        let set = FilterSet::new().is_in::<&str>("status", []);
        let clause = build_filter(&set);
        assert_eq!(clause.sql, "WHERE 1 = 0");
        assert!(clause.params.is_empty());
    }

    #[test]
    fn suffixed_keys_map_to_operators() {
        let map = json!({
            "price_gt": 10,
            "price_lt": 50,
            "title_like": "likes",
            "status_in": ["active", "inactive"],
            "category_id": "cat_1",
            "provider_id": null,
            "role_in": "admin"
        });
        let set = FilterSet::from_suffixed(map.as_object().unwrap());
        let ops: Vec<_> = set
            .conditions()
            .iter()
            .map(|c| match c {
                Condition::All(f) => (f.column.clone(), f.op.clone()),
                Condition::AnyOf(_) => unreachable!(),
            })
            .collect();

        assert!(ops.contains(&("price".into(), FilterOp::Gt(DbValue::Integer(10)))));
        assert!(ops.contains(&("price".into(), FilterOp::Lt(DbValue::Integer(50)))));
        assert!(ops.contains(&("title".into(), FilterOp::Like("likes".into()))));
        assert!(ops.contains(&(
            "status".into(),
            FilterOp::In(vec!["active".into(), "inactive".into()])
        )));
        assert!(ops.contains(&("role".into(), FilterOp::In(vec!["admin".into()]))));
        assert!(ops.contains(&("category_id".into(), FilterOp::Eq("cat_1".into()))));
        assert_eq!(ops.len(), 6);
    }

    #[test]
    fn validate_rejects_unknown_columns() {
        let set = FilterSet::new().eq("email", "a@b.c").gt("1=1 OR price", 0);
        assert!(set.validate(&["email", "price"]).is_err());
        assert!(FilterSet::new().eq("email", "x").validate(&["email"]).is_ok());
    }

    #[test]
    fn pagination_clamps() {
        assert_eq!(Pagination::new(0, 10), Pagination { page: 1, limit: 10 });
        assert_eq!(Pagination::new(-5, 10).page, 1);
        assert_eq!(Pagination::new(1, 1000).limit, 100);
        assert_eq!(Pagination::new(1, 0).limit, 1);
        assert_eq!(Pagination::new(1, -3).limit, 1);
        assert_eq!(Pagination::new(3, 20).offset(), 40);
        assert_eq!(Pagination::new(1, 10).offset(), 0);
        assert_eq!(Pagination::new(i64::MAX, i64::MAX).page, u32::MAX);
        assert_eq!(Pagination::new(i64::MAX, i64::MAX).limit, 100);
    }

    #[test]
    fn sort_goes_through_allow_list() {
        const SORTABLE: &[(&str, &str)] = &[("newest", "created_at"), ("price", "price")];
        let default = ("created_at", SortOrder::Desc);

        let sort = Sort::resolve(SORTABLE, Some("price"), Some(SortOrder::Asc), default).unwrap();
        assert_eq!(sort.to_sql(), "ORDER BY price ASC, id ASC");

        let sort = Sort::resolve(SORTABLE, None, None, default).unwrap();
        assert_eq!(sort.to_sql(), "ORDER BY created_at DESC, id ASC");

        let err = Sort::resolve(SORTABLE, Some("price; DROP TABLE users"), None, default);
        assert!(matches!(err, Err(StoreError::InvalidSort(_))));
    }
}
