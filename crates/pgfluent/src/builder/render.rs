//! Pure rendering from accumulated state to SQL text plus ordered bindings.
//!
//! The one invariant everything here protects: the Nth `$` placeholder in the
//! rendered text lines up with the Nth value in the returned vector, for all
//! N, under every clause combination.

use super::{Connective, QueryBuilder, WherePredicate};
use crate::value::SqlValue;

/// Render the full statement, stitching captured union arms in front of the
/// current SELECT. Each later fragment is renumbered past the values already
/// emitted.
pub(crate) fn build_select(qb: &QueryBuilder) -> (String, Vec<SqlValue>) {
    if qb.unions.is_empty() {
        return build_single_select(qb, 0);
    }

    let mut sql = String::new();
    let mut values = Vec::new();
    for arm in &qb.unions {
        sql.push_str(&adjust_placeholders(&arm.sql, values.len()));
        sql.push_str(" UNION ");
        if qb.union_all {
            sql.push_str("ALL ");
        }
        values.extend(arm.values.iter().cloned());
    }

    let (current, current_values) = build_single_select(qb, values.len());
    sql.push_str(&current);
    values.extend(current_values);
    (sql, values)
}

/// Render one SELECT arm with placeholders starting at `offset + 1`.
pub(crate) fn build_single_select(qb: &QueryBuilder, offset: usize) -> (String, Vec<SqlValue>) {
    let mut sql = format!("SELECT {} FROM \"{}\"", qb.columns.join(", "), qb.table);
    let (clauses, values) = build_clauses(qb, offset);
    sql.push_str(&clauses);
    (sql, values)
}

/// Render everything after the FROM table, in fixed order: joins, WHERE,
/// GROUP BY, HAVING, ORDER BY, LIMIT, OFFSET, row lock.
pub(crate) fn build_clauses(qb: &QueryBuilder, offset: usize) -> (String, Vec<SqlValue>) {
    let mut sql = String::new();
    for join in &qb.joins {
        sql.push_str(join);
    }

    let (where_sql, values) = compose_where(qb, offset + 1);
    sql.push_str(&where_sql);

    if let Some(group) = &qb.group_by {
        sql.push_str(" GROUP BY ");
        sql.push_str(group);
    }

    if let Some(having) = &qb.having {
        sql.push_str(" HAVING ");
        sql.push_str(having);
    }

    sql.push_str(&compose_order_by(&qb.order_by, qb.order_by_raw.as_deref()));

    if qb.limit > 0 {
        sql.push_str(&format!(" LIMIT {}", qb.limit));
    }

    if qb.offset > 0 {
        sql.push_str(&format!(" OFFSET {}", qb.offset));
    }

    if qb.lock_for_update {
        sql.push_str(" FOR UPDATE");
    }

    (sql, values)
}

/// Render the WHERE clause with a running placeholder counter starting at
/// `start`. Callers thread a higher start when earlier placeholders exist
/// (UPDATE's SET columns, preceding union arms).
pub(crate) fn compose_where(qb: &QueryBuilder, start: usize) -> (String, Vec<SqlValue>) {
    if qb.wheres.is_empty() {
        return (String::new(), Vec::new());
    }

    let mut sql = String::from(" WHERE ");
    let mut values = Vec::new();
    let mut counter = start;

    for (k, entry) in qb.wheres.iter().enumerate() {
        if k > 0 {
            sql.push_str(match entry.connective {
                Connective::Or => " OR ",
                _ => " AND ",
            });
        }

        match &entry.predicate {
            WherePredicate::Bound {
                lhs,
                value: SqlValue::List(items),
            } => {
                let placeholders: Vec<String> = items
                    .iter()
                    .map(|_| {
                        let p = format!("${counter}");
                        counter += 1;
                        p
                    })
                    .collect();
                sql.push_str(&format!("{lhs} ({})", placeholders.join(", ")));
                values.extend(items.iter().cloned());
            }
            WherePredicate::Bound { lhs, value } => {
                sql.push_str(&format!("{lhs} ${counter}"));
                counter += 1;
                values.push(value.clone());
            }
            WherePredicate::Literal(text) => {
                sql.push_str(text);
            }
            WherePredicate::Exists {
                negated,
                sql: sub,
                values: sub_values,
            } => {
                let keyword = if *negated { "NOT EXISTS" } else { "EXISTS" };
                sql.push_str(&format!(
                    "{keyword} ({})",
                    adjust_placeholders(sub, counter - 1)
                ));
                counter += sub_values.len();
                values.extend(sub_values.iter().cloned());
            }
        }
    }

    (sql, values)
}

/// Structured pairs win; the raw override only applies when no pair was
/// accumulated.
pub(crate) fn compose_order_by(pairs: &[(String, String)], raw: Option<&str>) -> String {
    if !pairs.is_empty() {
        let rendered: Vec<String> = pairs
            .iter()
            .map(|(column, direction)| format!("{column} {direction}"))
            .collect();
        format!(" ORDER BY {}", rendered.join(", "))
    } else if let Some(raw) = raw {
        format!(" ORDER BY {raw}")
    } else {
        String::new()
    }
}

/// Shift every `$n` in a pre-rendered fragment by `offset`.
///
/// With offset 3, `$1 AND $2` becomes `$4 AND $5`.
pub(crate) fn adjust_placeholders(sql: &str, offset: usize) -> String {
    if offset == 0 {
        return sql.to_string();
    }

    let mut result = String::with_capacity(sql.len());
    let mut chars = sql.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' {
            let mut digits = String::new();
            while let Some(&next) = chars.peek() {
                if next.is_ascii_digit() {
                    digits.push(next);
                    chars.next();
                } else {
                    break;
                }
            }
            result.push('$');
            match digits.parse::<usize>() {
                Ok(n) => result.push_str(&(n + offset).to_string()),
                Err(_) => result.push_str(&digits),
            }
        } else {
            result.push(ch);
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::adjust_placeholders;

    #[test]
    fn shifts_all_placeholders() {
        assert_eq!(adjust_placeholders("$1 AND $2 AND $10", 5), "$6 AND $7 AND $15");
    }

    #[test]
    fn zero_offset_is_identity() {
        assert_eq!(adjust_placeholders("$1 AND $2", 0), "$1 AND $2");
    }
}
