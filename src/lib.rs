pub mod config;
pub mod db;
pub mod error;
pub mod server;

pub use db::{ConnectionManager, Repositories, Repository};
pub use error::StoreError;
