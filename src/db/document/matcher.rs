//! In-memory evaluation of filter sets and sorts, with SQLite semantics:
//! comparisons against `NULL` never match, `LIKE` is ASCII case-insensitive.

use std::borrow::Cow;
use std::cmp::Ordering;

use crate::db::query::{Condition, Filter, FilterOp, FilterSet, Sort, SortOrder};
use crate::db::value::{DbValue, Row};

pub fn matches(row: &Row, filters: &FilterSet) -> bool {
    filters.conditions().iter().all(|condition| match condition {
        Condition::All(f) => matches_filter(row, f),
        Condition::AnyOf(fs) => fs.iter().any(|f| matches_filter(row, f)),
    })
}

fn matches_filter(row: &Row, filter: &Filter) -> bool {
    let value = row.get(&filter.column);
    let cmp = |operand: &DbValue| -> Option<Ordering> {
        (!operand.is_null()).then(|| value.cmp_sql(&with_affinity(value, operand)))
    };
    match &filter.op {
        FilterOp::IsNull => value.is_null(),
        _ if value.is_null() => false,
        FilterOp::Eq(v) => cmp(v) == Some(Ordering::Equal),
        FilterOp::Gt(v) => cmp(v) == Some(Ordering::Greater),
        FilterOp::Lt(v) => cmp(v) == Some(Ordering::Less),
        FilterOp::In(vs) => vs.iter().any(|v| cmp(v) == Some(Ordering::Equal)),
        FilterOp::Like(needle) => like(&format!("%{needle}%"), &as_text(value)),
    }
}

/// Converts `operand` the way SQLite applies a column's affinity before
/// comparing: numeric text becomes a number against a numeric value, and a
/// number becomes text against a text value.
fn with_affinity<'a>(stored: &DbValue, operand: &'a DbValue) -> Cow<'a, DbValue> {
    match (stored, operand) {
        (DbValue::Integer(_) | DbValue::Real(_), DbValue::Text(text)) => {
            let text = text.trim();
            if let Ok(i) = text.parse::<i64>() {
                Cow::Owned(DbValue::Integer(i))
            } else if let Ok(r) = text.parse::<f64>() {
                Cow::Owned(DbValue::Real(r))
            } else {
                Cow::Borrowed(operand)
            }
        }
        (DbValue::Text(_), DbValue::Integer(_) | DbValue::Real(_)) => {
            Cow::Owned(DbValue::Text(as_text(operand)))
        }
        _ => Cow::Borrowed(operand),
    }
}

fn as_text(value: &DbValue) -> String {
    match value {
        DbValue::Null => String::new(),
        DbValue::Integer(i) => i.to_string(),
        DbValue::Real(r) => r.to_string(),
        DbValue::Text(s) => s.clone(),
    }
}

/// SQL `LIKE`: `%` matches any run, `_` one character.
pub fn like(pattern: &str, text: &str) -> bool {
    let p: Vec<char> = pattern.chars().map(|c| c.to_ascii_lowercase()).collect();
    let t: Vec<char> = text.chars().map(|c| c.to_ascii_lowercase()).collect();

    let (mut pi, mut ti) = (0, 0);
    // Last `%` position in the pattern and the text index it resumed at.
    let mut backtrack: Option<(usize, usize)> = None;
    while ti < t.len() {
        if pi < p.len() && (p[pi] == '_' || (p[pi] != '%' && p[pi] == t[ti])) {
            pi += 1;
            ti += 1;
        } else if pi < p.len() && p[pi] == '%' {
            backtrack = Some((pi, ti));
            pi += 1;
        } else if let Some((star, resume)) = backtrack {
            pi = star + 1;
            ti = resume + 1;
            backtrack = Some((star, resume + 1));
        } else {
            return false;
        }
    }
    p[pi..].iter().all(|c| *c == '%')
}

/// Sort key comparison with `id ASC` as the tie-break.
pub fn compare(a: &Row, b: &Row, sort: &Sort) -> Ordering {
    let primary = a.get(sort.column()).cmp_sql(b.get(sort.column()));
    let primary = match sort.order() {
        SortOrder::Asc => primary,
        SortOrder::Desc => primary.reverse(),
    };
    primary.then_with(|| a.get("id").cmp_sql(b.get("id")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(id: &str, price: f64, title: &str) -> Row {
        Row::new()
            .with("id", id)
            .with("price", price)
            .with("title", title)
            .with("deleted_at", DbValue::Null)
    }

    #[test]
    fn like_wildcards() {
        assert!(like("%boost%", "Instagram BOOST pack"));
        assert!(like("a_c", "abc"));
        assert!(!like("a_c", "abbc"));
        assert!(like("%", ""));
        assert!(like("%a%b%", "xxaxxbxx"));
        assert!(!like("%a%b%", "xxbxxaxx"));
    }

    #[test]
    fn range_and_null_semantics() {
        let rows = [
            service("s1", 10.0, "one"),
            service("s2", 20.0, "two"),
            service("s3", 40.0, "three"),
            service("s4", 50.0, "four"),
        ];
        let filters = FilterSet::new().gt("price", 15).lt("price", 45).is_null("deleted_at");
        let hits: Vec<_> = rows.iter().filter(|r| matches(r, &filters)).collect();
        assert_eq!(hits.len(), 2);

        let missing = Row::new().with("id", "x");
        assert!(!matches(&missing, &FilterSet::new().lt("price", 100)));
        assert!(matches(&missing, &FilterSet::new().is_null("price")));
    }

    #[test]
    fn numeric_text_operands_compare_as_numbers() {
        let rows = [5.0, 10.0, 20.0, 40.0, 60.0]
            .iter()
            .enumerate()
            .map(|(i, p)| service(&format!("s{i}"), *p, "x"))
            .collect::<Vec<_>>();
        let filters = FilterSet::new().gt("price", "10").lt("price", "50");
        let hits: Vec<f64> = rows
            .iter()
            .filter(|r| matches(r, &filters))
            .filter_map(|r| r.get("price").as_f64())
            .collect();
        assert_eq!(hits, vec![20.0, 40.0]);

        assert!(matches(&rows[1], &FilterSet::new().eq("price", "10")));
        assert!(!matches(&rows[1], &FilterSet::new().eq("price", "ten")));

        // A number against a text column compares as text.
        let row = Row::new().with("id", "c1").with("slug", "10");
        assert!(matches(&row, &FilterSet::new().eq("slug", 10)));
    }

    #[test]
    fn any_of_is_disjunction() {
        let row = service("s1", 1.0, "Growth pack");
        let filters = FilterSet::new().any_of(vec![
            Filter::new("title", FilterOp::Like("nothing".into())),
            Filter::new("title", FilterOp::Like("growth".into())),
        ]);
        assert!(matches(&row, &filters));
    }

    #[test]
    fn empty_in_matches_nothing() {
        let row = service("s1", 1.0, "x");
        assert!(!matches(&row, &FilterSet::new().is_in::<&str>("id", [])));
        assert!(matches(&row, &FilterSet::new().is_in("id", ["s0", "s1"])));
    }
}
