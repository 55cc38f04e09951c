use chrono::Utc;
use nawth_schema::{ApiKey, ApiKeyPatch, NewApiKey, NewSession, Session, SessionPatch};

use crate::db::backend::{Assignment, TableSpec};
use crate::db::codec::{Record, RowReader, encode_array};
use crate::db::value::Row;
use crate::error::StoreError;

impl Record for ApiKey {
    type New = NewApiKey;
    type Patch = ApiKeyPatch;

    const TABLE: TableSpec = TableSpec {
        name: "api_keys",
        id_prefix: "key",
        soft_delete: false,
        unique: &["key_hash"],
    };
    const FILTERABLE: &'static [&'static str] = &["user_id", "name", "prefix"];
    const SORTABLE: &'static [(&'static str, &'static str)] = &[
        ("created_at", "created_at"),
        ("last_used_at", "last_used_at"),
        ("name", "name"),
    ];
    const COUNTERS: &'static [&'static str] = &["usage_count"];

    fn decode(row: &Row) -> Result<Self, StoreError> {
        let r = RowReader::new(Self::TABLE.name, row);
        Ok(ApiKey {
            id: r.text("id")?,
            user_id: r.text("user_id")?,
            name: r.text("name")?,
            key_hash: r.text("key_hash")?,
            prefix: r.text("prefix")?,
            permissions: r.array("permissions"),
            usage_count: r.int("usage_count")?,
            last_used_at: r.opt_timestamp("last_used_at")?,
            expires_at: r.opt_timestamp("expires_at")?,
            created_at: r.timestamp("created_at")?,
            updated_at: r.timestamp("updated_at")?,
        })
    }

    fn encode_new(new: NewApiKey) -> Vec<Assignment> {
        vec![
            Assignment::new("user_id", new.user_id),
            Assignment::new("name", new.name),
            Assignment::new("key_hash", new.key_hash),
            Assignment::new("prefix", new.prefix),
            Assignment::new("permissions", encode_array(&new.permissions)),
            Assignment::new("usage_count", 0i64),
            Assignment::new("last_used_at", None::<String>),
            Assignment::new("expires_at", new.expires_at),
        ]
    }

    fn encode_patch(patch: &ApiKeyPatch) -> Vec<Assignment> {
        let mut set = Vec::new();
        if let Some(v) = &patch.name {
            set.push(Assignment::new("name", v));
        }
        if let Some(v) = &patch.permissions {
            set.push(Assignment::new("permissions", encode_array(v)));
        }
        if let Some(v) = patch.expires_at {
            set.push(Assignment::new("expires_at", v));
        }
        set
    }
}

impl Record for Session {
    type New = NewSession;
    type Patch = SessionPatch;

    const TABLE: TableSpec = TableSpec {
        name: "sessions",
        id_prefix: "sess",
        soft_delete: false,
        unique: &["token"],
    };
    const FILTERABLE: &'static [&'static str] = &["user_id", "ip_address", "expires_at"];
    const SORTABLE: &'static [(&'static str, &'static str)] = &[
        ("created_at", "created_at"),
        ("last_accessed_at", "last_accessed_at"),
        ("expires_at", "expires_at"),
    ];

    fn decode(row: &Row) -> Result<Self, StoreError> {
        let r = RowReader::new(Self::TABLE.name, row);
        Ok(Session {
            id: r.text("id")?,
            user_id: r.text("user_id")?,
            token: r.text("token")?,
            user_agent: r.opt_text("user_agent"),
            ip_address: r.opt_text("ip_address"),
            expires_at: r.timestamp("expires_at")?,
            created_at: r.timestamp("created_at")?,
            updated_at: r.timestamp("updated_at")?,
            last_accessed_at: r.timestamp("last_accessed_at")?,
        })
    }

    fn encode_new(new: NewSession) -> Vec<Assignment> {
        vec![
            Assignment::new("user_id", new.user_id),
            Assignment::new("token", new.token),
            Assignment::new("user_agent", new.user_agent),
            Assignment::new("ip_address", new.ip_address),
            Assignment::new("expires_at", new.expires_at),
            Assignment::new("last_accessed_at", Utc::now()),
        ]
    }

    fn encode_patch(patch: &SessionPatch) -> Vec<Assignment> {
        let mut set = Vec::new();
        if let Some(v) = patch.expires_at {
            set.push(Assignment::new("expires_at", v));
        }
        if let Some(v) = patch.last_accessed_at {
            set.push(Assignment::new("last_accessed_at", v));
        }
        set
    }
}
