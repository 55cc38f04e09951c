use nawth_schema::{File, FilePatch, NewFile};

use crate::db::backend::{Assignment, TableSpec};
use crate::db::codec::{Record, RowReader, encode_object};
use crate::db::value::Row;
use crate::error::StoreError;

impl Record for File {
    type New = NewFile;
    type Patch = FilePatch;

    const TABLE: TableSpec = TableSpec {
        name: "files",
        id_prefix: "file",
        soft_delete: true,
        unique: &[],
    };
    const FILTERABLE: &'static [&'static str] = &["user_id", "name", "type"];
    const SORTABLE: &'static [(&'static str, &'static str)] = &[
        ("created_at", "created_at"),
        ("name", "name"),
        ("size", "size"),
    ];

    fn decode(row: &Row) -> Result<Self, StoreError> {
        let r = RowReader::new(Self::TABLE.name, row);
        Ok(File {
            id: r.text("id")?,
            user_id: r.text("user_id")?,
            name: r.text("name")?,
            url: r.text("url")?,
            size: r.opt_int("size")?,
            mime_type: r.opt_text("type"),
            metadata: r.object("metadata"),
            created_at: r.timestamp("created_at")?,
            updated_at: r.timestamp("updated_at")?,
            deleted_at: r.opt_timestamp("deleted_at")?,
        })
    }

    fn encode_new(new: NewFile) -> Vec<Assignment> {
        vec![
            Assignment::new("user_id", new.user_id),
            Assignment::new("name", new.name),
            Assignment::new("url", new.url),
            Assignment::new("size", new.size),
            Assignment::new("type", new.mime_type),
            Assignment::new("metadata", encode_object(&new.metadata)),
            Assignment::new("deleted_at", None::<String>),
        ]
    }

    fn encode_patch(patch: &FilePatch) -> Vec<Assignment> {
        let mut set = Vec::new();
        if let Some(v) = &patch.name {
            set.push(Assignment::new("name", v));
        }
        if let Some(v) = &patch.url {
            set.push(Assignment::new("url", v));
        }
        if let Some(v) = &patch.metadata {
            set.push(Assignment::new("metadata", encode_object(v)));
        }
        set
    }
}
