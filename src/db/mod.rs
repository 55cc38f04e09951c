//! Data-access layer.
//!
//! Layout:
//! - `query.rs`: filter sets, pagination, sorting and the SQL `WHERE` renderer
//! - `value.rs`: backend-neutral values and rows
//! - `codec.rs`: row <-> entity mapping (`Record`), blob and boolean columns
//! - `records/`: `Record` impls for every entity
//! - `backend.rs`: the `Backend` trait; `sqlite/` and `document/` implement it
//! - `connection.rs`, `health.rs`: lazy shared handle and health probe
//! - `migrate.rs`, `schema.rs`: migration ledger and DDL
//! - `repo/`: typed repositories

pub mod backend;
pub mod codec;
pub mod connection;
pub mod document;
pub mod health;
pub mod migrate;
pub mod query;
pub mod records;
pub mod repo;
pub mod schema;
pub mod sqlite;
pub mod value;

pub use backend::{Assignment, Backend, TableSpec};
pub use codec::Record;
pub use connection::{ConfigConnector, ConnectionManager, ConnectionState, Connector};
pub use document::DocumentBackend;
pub use health::{HealthReport, HealthStatus};
pub use migrate::{Migration, MigrationReport, MigrationRunner};
pub use query::{
    Condition, Filter, FilterOp, FilterSet, ListQuery, Pagination, Sort, SortOrder, WhereClause,
    build_filter,
};
pub use repo::{Repositories, Repository};
pub use schema::MIGRATIONS;
pub use sqlite::SqliteBackend;
pub use value::{DbValue, Row};
