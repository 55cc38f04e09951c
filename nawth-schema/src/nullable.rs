//! `Option<Option<T>>` support for partial updates of nullable columns.
//!
//! A missing key deserializes to `None` (leave the column alone), an explicit
//! `null` to `Some(None)` (clear it) and a value to `Some(Some(v))`.
//! Fields need `#[serde(default, deserialize_with = "nullable::deserialize")]`.

use serde::{Deserialize, Deserializer};

pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
