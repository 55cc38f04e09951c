use nawth_schema::{NewNotification, Notification, NotificationPatch};

use crate::db::backend::{Assignment, TableSpec};
use crate::db::codec::{Record, RowReader, encode_bool, encode_object};
use crate::db::value::Row;
use crate::error::StoreError;

impl Record for Notification {
    type New = NewNotification;
    type Patch = NotificationPatch;

    const TABLE: TableSpec = TableSpec {
        name: "notifications",
        id_prefix: "notif",
        soft_delete: false,
        unique: &[],
    };
    const FILTERABLE: &'static [&'static str] = &["user_id", "type", "is_read"];
    const SORTABLE: &'static [(&'static str, &'static str)] =
        &[("created_at", "created_at"), ("read_at", "read_at")];

    fn decode(row: &Row) -> Result<Self, StoreError> {
        let r = RowReader::new(Self::TABLE.name, row);
        Ok(Notification {
            id: r.text("id")?,
            user_id: r.text("user_id")?,
            title: r.text("title")?,
            message: r.text("message")?,
            kind: r.parse("type")?,
            is_read: r.bool("is_read"),
            metadata: r.object("metadata"),
            created_at: r.timestamp("created_at")?,
            updated_at: r.timestamp("updated_at")?,
            read_at: r.opt_timestamp("read_at")?,
        })
    }

    fn encode_new(new: NewNotification) -> Vec<Assignment> {
        vec![
            Assignment::new("user_id", new.user_id),
            Assignment::new("title", new.title),
            Assignment::new("message", new.message),
            Assignment::new("type", new.kind.as_str()),
            Assignment::new("is_read", encode_bool(new.is_read)),
            Assignment::new("metadata", encode_object(&new.metadata)),
            Assignment::new("read_at", None::<String>),
        ]
    }

    fn encode_patch(patch: &NotificationPatch) -> Vec<Assignment> {
        let mut set = Vec::new();
        if let Some(v) = &patch.title {
            set.push(Assignment::new("title", v));
        }
        if let Some(v) = &patch.message {
            set.push(Assignment::new("message", v));
        }
        if let Some(v) = patch.is_read {
            set.push(Assignment::new("is_read", encode_bool(v)));
        }
        if let Some(v) = patch.read_at {
            set.push(Assignment::new("read_at", v));
        }
        if let Some(v) = &patch.metadata {
            set.push(Assignment::new("metadata", encode_object(v)));
        }
        set
    }
}
