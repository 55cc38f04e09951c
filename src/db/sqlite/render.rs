//! SQL text for the generic backend operations.
//!
//! Table and column names come from static [`TableSpec`]s, codec assignments
//! and allow-listed filters; every value travels as a bound parameter.

use crate::db::backend::{Assignment, TableSpec};
use crate::db::query::{FilterSet, Pagination, Sort, build_filter};
use crate::db::value::{DbValue, Row};

#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    pub sql: String,
    pub params: Vec<DbValue>,
}

/// `WHERE <guard> AND id = ?`, so the key is always the last parameter.
fn by_id(id: &str, guard: &FilterSet) -> FilterSet {
    guard.clone().eq("id", id)
}

fn set_list(set: &[Assignment], params: &mut Vec<DbValue>) -> String {
    set.iter()
        .map(|a| {
            params.push(a.value.clone());
            format!("{} = ?", a.column)
        })
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn insert(table: &TableSpec, row: &Row) -> Statement {
    let (columns, params): (Vec<&str>, Vec<DbValue>) =
        row.iter().map(|(c, v)| (c, v.clone())).unzip();
    let placeholders = vec!["?"; columns.len()].join(", ");
    Statement {
        sql: format!(
            "INSERT INTO {} ({}) VALUES ({placeholders}) RETURNING *",
            table.name,
            columns.join(", ")
        ),
        params,
    }
}

pub fn select(
    table: &TableSpec,
    filters: &FilterSet,
    sort: Option<&Sort>,
    window: Option<&Pagination>,
) -> Statement {
    let clause = build_filter(filters);
    let mut sql = format!("SELECT * FROM {}", table.name);
    if !clause.is_empty() {
        sql.push(' ');
        sql.push_str(&clause.sql);
    }
    if let Some(sort) = sort {
        sql.push(' ');
        sql.push_str(&sort.to_sql());
    }
    if let Some(window) = window {
        sql.push_str(&format!(" LIMIT {} OFFSET {}", window.limit, window.offset()));
    }
    Statement {
        sql,
        params: clause.params,
    }
}

pub fn count(table: &TableSpec, filters: &FilterSet) -> Statement {
    let clause = build_filter(filters);
    let mut sql = format!("SELECT COUNT(*) AS total FROM {}", table.name);
    if !clause.is_empty() {
        sql.push(' ');
        sql.push_str(&clause.sql);
    }
    Statement {
        sql,
        params: clause.params,
    }
}

fn update(table: &TableSpec, assignments: String, mut params: Vec<DbValue>, filters: &FilterSet) -> Statement {
    let clause = build_filter(filters);
    params.extend(clause.params);
    let mut sql = format!("UPDATE {} SET {assignments}", table.name);
    if !clause.sql.is_empty() {
        sql.push(' ');
        sql.push_str(&clause.sql);
    }
    Statement { sql, params }
}

pub fn update_by_id(table: &TableSpec, id: &str, guard: &FilterSet, set: &[Assignment]) -> Statement {
    let mut params = Vec::new();
    let assignments = set_list(set, &mut params);
    let mut stmt = update(table, assignments, params, &by_id(id, guard));
    stmt.sql.push_str(" RETURNING *");
    stmt
}

pub fn update_where(table: &TableSpec, filters: &FilterSet, set: &[Assignment]) -> Statement {
    let mut params = Vec::new();
    let assignments = set_list(set, &mut params);
    update(table, assignments, params, filters)
}

pub fn increment(
    table: &TableSpec,
    id: &str,
    guard: &FilterSet,
    column: &str,
    delta: i64,
    set: &[Assignment],
) -> Statement {
    let mut params = vec![DbValue::Integer(delta)];
    let mut assignments = format!("{column} = COALESCE({column}, 0) + ?");
    let rest: Vec<&Assignment> = set.iter().filter(|a| a.column != column).collect();
    for a in rest {
        params.push(a.value.clone());
        assignments.push_str(&format!(", {} = ?", a.column));
    }
    update(table, assignments, params, &by_id(id, guard))
}

pub fn delete_where(table: &TableSpec, filters: &FilterSet) -> Statement {
    let clause = build_filter(filters);
    let mut sql = format!("DELETE FROM {}", table.name);
    if !clause.is_empty() {
        sql.push(' ');
        sql.push_str(&clause.sql);
    }
    Statement {
        sql,
        params: clause.params,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::query::SortOrder;

    const USERS: TableSpec = TableSpec {
        name: "users",
        id_prefix: "user",
        soft_delete: true,
        unique: &["email"],
    };

    #[test]
    fn update_binds_id_last() {
        let guard = FilterSet::new().is_null("deleted_at");
        let set = [
            Assignment::new("first_name", "Al"),
            Assignment::new("updated_at", "2024-01-01T00:00:00.000Z"),
        ];
        let stmt = update_by_id(&USERS, "user_1", &guard, &set);
        assert_eq!(
            stmt.sql,
            "UPDATE users SET first_name = ?, updated_at = ? WHERE deleted_at IS NULL AND id = ? RETURNING *"
        );
        assert_eq!(stmt.params.last(), Some(&DbValue::Text("user_1".into())));
        assert_eq!(stmt.params.len(), 3);
    }

    #[test]
    fn select_with_sort_and_window() {
        let sort = Sort::resolve(
            &[("price", "price")],
            Some("price"),
            Some(SortOrder::Asc),
            ("created_at", SortOrder::Desc),
        )
        .unwrap();
        let stmt = select(
            &USERS,
            &FilterSet::new().eq("role", "admin"),
            Some(&sort),
            Some(&Pagination::new(2, 2)),
        );
        assert_eq!(
            stmt.sql,
            "SELECT * FROM users WHERE role = ? ORDER BY price ASC, id ASC LIMIT 2 OFFSET 2"
        );
    }

    #[test]
    fn increment_adds_delta_and_extra_columns() {
        let stmt = increment(
            &USERS,
            "user_1",
            &FilterSet::new(),
            "views",
            1,
            &[Assignment::new("updated_at", "t")],
        );
        assert_eq!(
            stmt.sql,
            "UPDATE users SET views = COALESCE(views, 0) + ?, updated_at = ? WHERE id = ?"
        );
        assert_eq!(
            stmt.params,
            vec![DbValue::Integer(1), DbValue::Text("t".into()), DbValue::Text("user_1".into())]
        );
    }

    #[test]
    fn insert_lists_every_column() {
        let row = Row::new().with("id", "user_1").with("email", "a@b.c");
        let stmt = insert(&USERS, &row);
        assert_eq!(
            stmt.sql,
            "INSERT INTO users (email, id) VALUES (?, ?) RETURNING *"
        );
    }
}
