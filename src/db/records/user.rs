use nawth_schema::{NewUser, User, UserPatch, UserStatus};

use crate::db::backend::{Assignment, TableSpec};
use crate::db::codec::{Record, RowReader, encode_bool, encode_object};
use crate::db::value::Row;
use crate::error::StoreError;

impl Record for User {
    type New = NewUser;
    type Patch = UserPatch;

    const TABLE: TableSpec = TableSpec {
        name: "users",
        id_prefix: "user",
        soft_delete: true,
        unique: &["email", "username"],
    };
    const FILTERABLE: &'static [&'static str] = &[
        "email",
        "username",
        "first_name",
        "last_name",
        "role",
        "status",
        "email_verified",
        "created_at",
    ];
    const SORTABLE: &'static [(&'static str, &'static str)] = &[
        ("created_at", "created_at"),
        ("updated_at", "updated_at"),
        ("email", "email"),
        ("username", "username"),
        ("last_login", "last_login"),
    ];

    fn decode(row: &Row) -> Result<Self, StoreError> {
        let r = RowReader::new(Self::TABLE.name, row);
        Ok(User {
            id: r.text("id")?,
            email: r.text("email")?,
            username: r.text("username")?,
            password_hash: r.text("password_hash")?,
            first_name: r.text("first_name")?,
            last_name: r.text("last_name")?,
            phone: r.opt_text("phone"),
            avatar: r.opt_text("avatar"),
            role: r.parse("role")?,
            status: r.parse("status")?,
            email_verified: r.bool("email_verified"),
            settings: r.object("settings"),
            created_at: r.timestamp("created_at")?,
            updated_at: r.timestamp("updated_at")?,
            last_login: r.opt_timestamp("last_login")?,
            deleted_at: r.opt_timestamp("deleted_at")?,
        })
    }

    fn encode_new(new: NewUser) -> Vec<Assignment> {
        vec![
            Assignment::new("email", new.email),
            Assignment::new("username", new.username),
            Assignment::new("password_hash", new.password_hash),
            Assignment::new("first_name", new.first_name),
            Assignment::new("last_name", new.last_name),
            Assignment::new("phone", new.phone),
            Assignment::new("avatar", new.avatar),
            Assignment::new("role", new.role.as_str()),
            Assignment::new("status", new.status.as_str()),
            Assignment::new("email_verified", encode_bool(new.email_verified)),
            Assignment::new("settings", encode_object(&new.settings.unwrap_or_default())),
            Assignment::new("last_login", None::<String>),
            Assignment::new("deleted_at", None::<String>),
        ]
    }

    fn encode_patch(patch: &UserPatch) -> Vec<Assignment> {
        let mut set = Vec::new();
        if let Some(v) = &patch.email {
            set.push(Assignment::new("email", v));
        }
        if let Some(v) = &patch.username {
            set.push(Assignment::new("username", v));
        }
        if let Some(v) = &patch.password_hash {
            set.push(Assignment::new("password_hash", v));
        }
        if let Some(v) = &patch.first_name {
            set.push(Assignment::new("first_name", v));
        }
        if let Some(v) = &patch.last_name {
            set.push(Assignment::new("last_name", v));
        }
        if let Some(v) = &patch.phone {
            set.push(Assignment::new("phone", v.clone()));
        }
        if let Some(v) = &patch.avatar {
            set.push(Assignment::new("avatar", v.clone()));
        }
        if let Some(v) = patch.role {
            set.push(Assignment::new("role", v.as_str()));
        }
        if let Some(v) = patch.status {
            set.push(Assignment::new("status", v.as_str()));
        }
        if let Some(v) = patch.email_verified {
            set.push(Assignment::new("email_verified", encode_bool(v)));
        }
        if let Some(v) = &patch.last_login {
            set.push(Assignment::new("last_login", *v));
        }
        if let Some(v) = &patch.settings {
            set.push(Assignment::new("settings", encode_object(v)));
        }
        set
    }

    fn soft_delete_assignments() -> Vec<Assignment> {
        vec![Assignment::new("status", UserStatus::Deleted.as_str())]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::codec::insert_row;
    use crate::db::value::DbValue;
    use chrono::Utc;
    use nawth_schema::UserRole;

    #[test]
    fn new_user_round_trips_with_empty_settings() {
        let new = NewUser {
            email: "a@example.com".into(),
            username: "alice".into(),
            password_hash: "hash".into(),
            first_name: "Alice".into(),
            last_name: "Liddell".into(),
            ..Default::default()
        };
        let row = insert_row::<User>(new, Utc::now());
        assert_eq!(row.get("settings"), &DbValue::Text("{}".into()));
        assert_eq!(row.get("email_verified"), &DbValue::Integer(0));

        let user = User::decode(&row).unwrap();
        assert!(user.id.starts_with("user_"));
        assert!(user.settings.is_empty());
        assert_eq!(user.role, UserRole::User);
        assert_eq!(user.created_at, user.updated_at);
    }

    #[test]
    fn unknown_role_is_a_decode_error() {
        let new = NewUser {
            email: "b@example.com".into(),
            username: "bob".into(),
            ..Default::default()
        };
        let mut row = insert_row::<User>(new, Utc::now());
        row.set("role", "overlord");
        assert!(matches!(
            User::decode(&row),
            Err(StoreError::Decode { column: "role", .. })
        ));
    }

    #[test]
    fn patch_only_touches_present_fields() {
        let patch = UserPatch {
            phone: Some(None),
            first_name: Some("Al".into()),
            ..Default::default()
        };
        let set = User::encode_patch(&patch);
        assert_eq!(set.len(), 2);
        assert!(set.contains(&Assignment::new("phone", DbValue::Null)));
    }
}
