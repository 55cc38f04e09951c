//! [`Record`](crate::db::codec::Record) implementations for every entity.

mod access;
mod catalog;
mod commerce;
mod file;
mod notification;
mod user;

pub use commerce::DEFAULT_CURRENCY;
