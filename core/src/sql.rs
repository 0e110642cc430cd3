//! Parameterized SQL generation from column-keyed inputs.
//!
//! Every builder validates table and column names, quotes them with
//! backticks, and returns a [`BoundSql`] carrying the statement text and the
//! named values to bind. Placeholder names are handed out by a
//! [`ParamBinder`], which keeps them unique within one statement.
//!
//! # WHERE generation
//!
//! | Input | LIKE column | Other column |
//! |-------|-------------|--------------|
//! | scalar `v` | `` `c` LIKE :c `` bound to `%v%` | `` `c` = :c `` bound to `v` |
//! | list `[a, b]` | `` (`c` LIKE :c___0 OR `c` LIKE :c___1) `` | `` (`c` = :c___0 OR `c` = :c___1) `` |
//!
//! Columns are joined with `AND`. A `NULL` value becomes `IS NULL` on any
//! column, LIKE or not; an empty list matches nothing.
//!
//! # Example
//!
//! ```
//! use sqlhelper_core::{Filter, Value, sql};
//!
//! let filter = Filter::new().eq("name", "ad").any_of("id", [1, 2]);
//! let bound = sql::count_sql("users", &filter, &["name"]).unwrap();
//! assert_eq!(
//!     bound.sql,
//!     "SELECT COUNT(*) AS c FROM `users` WHERE `name` LIKE :name AND (`id` = :id___0 OR `id` = :id___1)"
//! );
//! assert_eq!(bound.params[0], (":name".to_string(), Value::from("%ad%")));
//! ```

use std::collections::HashSet;

use crate::error::{BuildError, Result};
use crate::types::{Criterion, Filter, Params, Value};

/// Placeholder namespace for the equality conditions of an update.
pub const WHERE_NAMESPACE: &str = "where_";

/// Placeholder namespace for the inequality conditions of an update.
pub const WHERE_NOT_NAMESPACE: &str = "wherenot_";

/// SQL text plus the named values to bind to it.
///
/// Parameter names include the leading `:`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BoundSql {
    pub sql: String,
    pub params: Vec<(String, Value)>,
}

/// Hands out unique named placeholders for one statement.
///
/// A base name that was already issued gets a numeric suffix (`_1`, `_2`,
/// ...), so the naming is deterministic for a given input order.
///
/// # Examples
///
/// ```
/// use sqlhelper_core::{Value, sql::ParamBinder};
///
/// let mut binder = ParamBinder::new();
/// assert_eq!(binder.bind("id", Value::Integer(1)), ":id");
/// assert_eq!(binder.bind("id", Value::Integer(2)), ":id_1");
/// assert_eq!(binder.into_params().len(), 2);
/// ```
#[derive(Debug, Default)]
pub struct ParamBinder {
    used: HashSet<String>,
    params: Vec<(String, Value)>,
}

impl ParamBinder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `value` under a name derived from `base` and returns the
    /// placeholder (with its `:`).
    pub fn bind(&mut self, base: &str, value: Value) -> String {
        let mut name = base.to_string();
        let mut n = 1;
        while self.used.contains(&name) {
            name = format!("{base}_{n}");
            n += 1;
        }
        self.used.insert(name.clone());
        let placeholder = format!(":{name}");
        self.params.push((placeholder.clone(), value));
        placeholder
    }

    pub fn into_params(self) -> Vec<(String, Value)> {
        self.params
    }
}

/// Whether conditions test for a match or a mismatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    /// `=`, `LIKE`, `IS NULL`; list elements joined with `OR`.
    Match,
    /// `!=`, `NOT LIKE`, `IS NOT NULL`; list elements joined with `AND`.
    Mismatch,
}

/// Validates a table name, returning it trimmed.
pub fn validate_table(table: &str) -> Result<&str> {
    let table = table.trim();
    if table.is_empty() {
        return Err(BuildError::EmptyTable);
    }
    validate_identifier(table)
}

/// Validates a column (or table) name, returning it trimmed.
///
/// Names must be non-empty and contain only alphanumerics and underscores,
/// since they are reused verbatim inside placeholder names.
pub fn validate_identifier(name: &str) -> Result<&str> {
    let name = name.trim();
    if name.is_empty() || !name.chars().all(|c| c.is_alphanumeric() || c == '_') {
        return Err(BuildError::InvalidIdentifier(name.to_string()));
    }
    Ok(name)
}

/// Quotes a validated identifier.
pub fn quote(name: &str) -> String {
    format!("`{name}`")
}

/// Adds a leading `:` to a parameter key unless it already carries a SQLite
/// parameter prefix.
///
/// ```
/// use sqlhelper_core::sql::normalize_param_name;
///
/// assert_eq!(normalize_param_name("id"), ":id");
/// assert_eq!(normalize_param_name(":id"), ":id");
/// assert_eq!(normalize_param_name("@id"), "@id");
/// ```
pub fn normalize_param_name(name: &str) -> String {
    if name.starts_with([':', '@', '$']) {
        name.to_string()
    } else {
        format!(":{name}")
    }
}

/// Builds the condition list for `filter`, binding values through `binder`.
///
/// Columns listed in `like` match with `LIKE %value%`. Placeholder names are
/// `{namespace}{column}` for scalars and `{namespace}{column}___{index}` for
/// list elements. Returns an empty string for an empty filter.
pub fn where_clause(
    filter: &Filter,
    like: &[&str],
    binder: &mut ParamBinder,
    namespace: &str,
    comparison: Comparison,
) -> Result<String> {
    let mut parts = Vec::with_capacity(filter.len());

    for (column, criterion) in filter.iter() {
        let column = validate_identifier(column)?;
        let is_like = like.iter().any(|l| l.trim() == column);

        let part = match criterion {
            Criterion::Eq(value) => {
                let base = format!("{namespace}{column}");
                condition(column, value, is_like, comparison, binder, &base)
            }
            Criterion::AnyOf(values) if values.is_empty() => match comparison {
                Comparison::Match => "0 = 1".to_string(),
                Comparison::Mismatch => "1 = 1".to_string(),
            },
            Criterion::AnyOf(values) => {
                let joiner = match comparison {
                    Comparison::Match => " OR ",
                    Comparison::Mismatch => " AND ",
                };
                let group: Vec<String> = values
                    .iter()
                    .enumerate()
                    .map(|(i, value)| {
                        let base = format!("{namespace}{column}___{i}");
                        condition(column, value, is_like, comparison, binder, &base)
                    })
                    .collect();
                format!("({})", group.join(joiner))
            }
        };
        parts.push(part);
    }

    Ok(parts.join(" AND "))
}

fn condition(
    column: &str,
    value: &Value,
    is_like: bool,
    comparison: Comparison,
    binder: &mut ParamBinder,
    base: &str,
) -> String {
    let quoted = quote(column);
    if value.is_null() {
        return match comparison {
            Comparison::Match => format!("{quoted} IS NULL"),
            Comparison::Mismatch => format!("{quoted} IS NOT NULL"),
        };
    }
    if is_like {
        let placeholder = binder.bind(base, Value::Text(format!("%{value}%")));
        return match comparison {
            Comparison::Match => format!("{quoted} LIKE {placeholder}"),
            Comparison::Mismatch => format!("{quoted} NOT LIKE {placeholder}"),
        };
    }
    let placeholder = binder.bind(base, value.clone());
    match comparison {
        Comparison::Match => format!("{quoted} = {placeholder}"),
        Comparison::Mismatch => format!("{quoted} != {placeholder}"),
    }
}

/// `SELECT COUNT(*) AS c` over `table`, filtered by `filter`.
///
/// An empty filter counts every row.
pub fn count_sql(table: &str, filter: &Filter, like: &[&str]) -> Result<BoundSql> {
    let table = validate_table(table)?;
    let mut binder = ParamBinder::new();
    let conditions = where_clause(filter, like, &mut binder, "", Comparison::Match)?;

    let mut sql = format!("SELECT COUNT(*) AS c FROM {}", quote(table));
    if !conditions.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&conditions);
    }

    Ok(BoundSql {
        sql,
        params: binder.into_params(),
    })
}

/// `SELECT COUNT(*) AS c` over `table` with a caller-written WHERE body.
///
/// The WHERE text is used as-is; an empty string counts every row.
pub fn count_raw_sql(table: &str, where_sql: &str) -> Result<String> {
    let table = validate_table(table)?;
    let where_sql = where_sql.trim();
    let mut sql = format!("SELECT COUNT(*) AS c FROM {}", quote(table));
    if !where_sql.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(where_sql);
    }
    Ok(sql)
}

/// `SELECT` of `columns` (or `*`) from `table` with equality conditions.
///
/// A `limit` of zero means no limit.
pub fn select_sql(table: &str, filter: &Filter, columns: &[&str], limit: u32) -> Result<BoundSql> {
    let table = validate_table(table)?;
    let projection = if columns.is_empty() {
        "*".to_string()
    } else {
        columns
            .iter()
            .map(|c| validate_identifier(c).map(quote))
            .collect::<Result<Vec<_>>>()?
            .join(", ")
    };

    let mut binder = ParamBinder::new();
    let conditions = where_clause(filter, &[], &mut binder, "", Comparison::Match)?;

    let mut sql = format!("SELECT {projection} FROM {}", quote(table));
    if !conditions.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&conditions);
    }
    if limit > 0 {
        sql.push_str(&format!(" LIMIT {limit}"));
    }

    Ok(BoundSql {
        sql,
        params: binder.into_params(),
    })
}

/// `INSERT` of one row built from `data`.
pub fn insert_sql(table: &str, data: &Params) -> Result<BoundSql> {
    let table = validate_table(table)?;
    if data.is_empty() {
        return Err(BuildError::EmptyData);
    }

    let mut binder = ParamBinder::new();
    let mut columns = Vec::with_capacity(data.len());
    let mut placeholders = Vec::with_capacity(data.len());
    for (column, value) in data.iter() {
        let column = validate_identifier(column)?;
        columns.push(quote(column));
        placeholders.push(binder.bind(column, value.clone()));
    }

    Ok(BoundSql {
        sql: format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote(table),
            columns.join(", "),
            placeholders.join(", ")
        ),
        params: binder.into_params(),
    })
}

/// `UPDATE` of `table` setting `data` where every `where_eq` condition holds
/// and every `where_not` condition fails.
///
/// SET placeholders use the bare column name; condition placeholders are
/// namespaced with [`WHERE_NAMESPACE`] and [`WHERE_NOT_NAMESPACE`]. One binder
/// covers the whole statement, so no two placeholders share a name.
///
/// SQLite has no `UPDATE ... LIMIT`; a positive `limit` restricts the update
/// to the first matching rowids instead.
///
/// # Examples
///
/// ```
/// use sqlhelper_core::{Filter, Params, sql};
///
/// let data = Params::new().with("name", "new");
/// let bound = sql::update_sql(
///     "users",
///     &data,
///     &Filter::new().eq("name", "old"),
///     &Filter::new().eq("id", 1),
///     0,
/// )
/// .unwrap();
/// assert_eq!(
///     bound.sql,
///     "UPDATE `users` SET `name` = :name WHERE `name` = :where_name AND `id` != :wherenot_id"
/// );
/// ```
pub fn update_sql(
    table: &str,
    data: &Params,
    where_eq: &Filter,
    where_not: &Filter,
    limit: u32,
) -> Result<BoundSql> {
    let table = validate_table(table)?;
    if data.is_empty() {
        return Err(BuildError::EmptyData);
    }
    if where_eq.is_empty() && where_not.is_empty() {
        return Err(BuildError::EmptyWhere);
    }

    let mut binder = ParamBinder::new();
    let mut assignments = Vec::with_capacity(data.len());
    for (column, value) in data.iter() {
        let column = validate_identifier(column)?;
        let placeholder = binder.bind(column, value.clone());
        assignments.push(format!("{} = {placeholder}", quote(column)));
    }

    let mut conditions = Vec::with_capacity(2);
    let matched = where_clause(
        where_eq,
        &[],
        &mut binder,
        WHERE_NAMESPACE,
        Comparison::Match,
    )?;
    if !matched.is_empty() {
        conditions.push(matched);
    }
    let mismatched = where_clause(
        where_not,
        &[],
        &mut binder,
        WHERE_NOT_NAMESPACE,
        Comparison::Mismatch,
    )?;
    if !mismatched.is_empty() {
        conditions.push(mismatched);
    }
    let conditions = conditions.join(" AND ");

    let quoted = quote(table);
    let mut sql = format!("UPDATE {quoted} SET {}", assignments.join(", "));
    if limit > 0 {
        sql.push_str(&format!(
            " WHERE rowid IN (SELECT rowid FROM {quoted} WHERE {conditions} LIMIT {limit})"
        ));
    } else {
        sql.push_str(" WHERE ");
        sql.push_str(&conditions);
    }

    Ok(BoundSql {
        sql,
        params: binder.into_params(),
    })
}

/// `INSERT` with one `:column` placeholder per column and no bound values.
pub fn insert_template(table: &str, columns: &[&str]) -> Result<String> {
    let table = validate_table(table)?;
    if columns.is_empty() {
        return Err(BuildError::EmptyData);
    }
    let columns = columns
        .iter()
        .map(|c| validate_identifier(c))
        .collect::<Result<Vec<_>>>()?;

    Ok(format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote(table),
        columns.iter().map(|c| quote(c)).collect::<Vec<_>>().join(", "),
        columns
            .iter()
            .map(|c| format!(":{c}"))
            .collect::<Vec<_>>()
            .join(", ")
    ))
}

/// `UPDATE` with one `` `column` = :column `` assignment per column and a
/// caller-written WHERE body.
pub fn update_template(table: &str, columns: &[&str], where_sql: &str) -> Result<String> {
    let table = validate_table(table)?;
    if columns.is_empty() {
        return Err(BuildError::EmptyData);
    }
    let where_sql = where_sql.trim();
    if where_sql.is_empty() {
        return Err(BuildError::EmptyWhere);
    }
    let assignments = columns
        .iter()
        .map(|c| validate_identifier(c).map(|c| format!("{} = :{c}", quote(c))))
        .collect::<Result<Vec<_>>>()?;

    Ok(format!(
        "UPDATE {} SET {} WHERE {where_sql}",
        quote(table),
        assignments.join(", ")
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(bound: &BoundSql) -> Vec<&str> {
        bound.params.iter().map(|(n, _)| n.as_str()).collect()
    }

    #[test]
    fn test_validate_identifier() {
        assert_eq!(validate_identifier(" id ").unwrap(), "id");
        assert!(validate_identifier("user_2").is_ok());
        assert!(validate_identifier("").is_err());
        assert!(validate_identifier("a`b").is_err());
        assert!(validate_identifier("drop;--").is_err());
        assert!(validate_identifier("first name").is_err());
    }

    #[test]
    fn test_validate_table_empty() {
        assert_eq!(validate_table("   "), Err(BuildError::EmptyTable));
    }

    #[test]
    fn test_binder_suffixes_collisions() {
        let mut binder = ParamBinder::new();
        assert_eq!(binder.bind("a", Value::Null), ":a");
        assert_eq!(binder.bind("a", Value::Null), ":a_1");
        assert_eq!(binder.bind("a", Value::Null), ":a_2");
        assert_eq!(binder.bind("a_1", Value::Null), ":a_1_1");
    }

    #[test]
    fn test_where_scalar_equality_and_like() {
        let filter = Filter::new().eq("id", 5).eq("name", "bo");
        let mut binder = ParamBinder::new();
        let clause = where_clause(&filter, &["name"], &mut binder, "", Comparison::Match).unwrap();
        assert_eq!(clause, "`id` = :id AND `name` LIKE :name");
        let params = binder.into_params();
        assert_eq!(params[0], (":id".to_string(), Value::Integer(5)));
        assert_eq!(params[1], (":name".to_string(), Value::from("%bo%")));
    }

    #[test]
    fn test_where_list_uses_indexed_names() {
        let filter = Filter::new().any_of("tag", ["x", "y", "z"]);
        let mut binder = ParamBinder::new();
        let clause = where_clause(&filter, &["tag"], &mut binder, "", Comparison::Match).unwrap();
        assert_eq!(
            clause,
            "(`tag` LIKE :tag___0 OR `tag` LIKE :tag___1 OR `tag` LIKE :tag___2)"
        );
        let params = binder.into_params();
        assert_eq!(params[2].1, Value::from("%z%"));
    }

    #[test]
    fn test_where_null_and_empty_list() {
        let filter = Filter::new()
            .eq("deleted_at", Value::Null)
            .any_of("id", Vec::<i64>::new());
        let mut binder = ParamBinder::new();
        let clause = where_clause(&filter, &[], &mut binder, "", Comparison::Match).unwrap();
        assert_eq!(clause, "`deleted_at` IS NULL AND 0 = 1");
        assert!(binder.into_params().is_empty());
    }

    #[test]
    fn test_where_null_on_like_column_is_not_a_pattern() {
        let filter = Filter::new().eq("name", Value::Null);
        let mut binder = ParamBinder::new();
        let clause = where_clause(&filter, &["name"], &mut binder, "", Comparison::Match).unwrap();
        assert_eq!(clause, "`name` IS NULL");

        let filter = Filter::new().any_of("name", [Value::Null, Value::from("bo")]);
        let clause =
            where_clause(&filter, &["name"], &mut binder, "n_", Comparison::Mismatch).unwrap();
        assert_eq!(clause, "(`name` IS NOT NULL AND `name` NOT LIKE :n_name___1)");
        let params = binder.into_params();
        assert_eq!(params, vec![(":n_name___1".to_string(), Value::from("%bo%"))]);
    }

    #[test]
    fn test_where_mismatch() {
        let filter = Filter::new().eq("a", 1).any_of("b", [2, 3]).eq("c", Value::Null);
        let mut binder = ParamBinder::new();
        let clause = where_clause(&filter, &[], &mut binder, "n_", Comparison::Mismatch).unwrap();
        assert_eq!(
            clause,
            "`a` != :n_a AND (`b` != :n_b___0 AND `b` != :n_b___1) AND `c` IS NOT NULL"
        );
    }

    #[test]
    fn test_where_rejects_bad_column() {
        let filter = Filter::new().eq("bad col", 1);
        let mut binder = ParamBinder::new();
        assert!(matches!(
            where_clause(&filter, &[], &mut binder, "", Comparison::Match),
            Err(BuildError::InvalidIdentifier(_))
        ));
    }

    #[test]
    fn test_count_sql_without_filter() {
        let bound = count_sql("t", &Filter::new(), &[]).unwrap();
        assert_eq!(bound.sql, "SELECT COUNT(*) AS c FROM `t`");
        assert!(bound.params.is_empty());
    }

    #[test]
    fn test_count_raw_sql() {
        assert_eq!(
            count_raw_sql("t", "id > 3").unwrap(),
            "SELECT COUNT(*) AS c FROM `t` WHERE id > 3"
        );
        assert_eq!(count_raw_sql("t", " ").unwrap(), "SELECT COUNT(*) AS c FROM `t`");
        assert_eq!(count_raw_sql("", "x"), Err(BuildError::EmptyTable));
    }

    #[test]
    fn test_select_sql() {
        let bound = select_sql("users", &Filter::new().eq("id", 1), &["id", "name"], 10).unwrap();
        assert_eq!(
            bound.sql,
            "SELECT `id`, `name` FROM `users` WHERE `id` = :id LIMIT 10"
        );
        let all = select_sql("users", &Filter::new(), &[], 0).unwrap();
        assert_eq!(all.sql, "SELECT * FROM `users`");
    }

    #[test]
    fn test_insert_sql() {
        let data = Params::new().with("name", "ada").with("age", 36);
        let bound = insert_sql("users", &data).unwrap();
        assert_eq!(
            bound.sql,
            "INSERT INTO `users` (`name`, `age`) VALUES (:name, :age)"
        );
        assert_eq!(names(&bound), vec![":name", ":age"]);
        assert_eq!(insert_sql("users", &Params::new()), Err(BuildError::EmptyData));
    }

    #[test]
    fn test_update_sql_namespaces_clause_groups() {
        let data = Params::new().with("id", 2).with("name", "n");
        let bound = update_sql(
            "t",
            &data,
            &Filter::new().eq("id", 1),
            &Filter::new().eq("name", "x"),
            0,
        )
        .unwrap();
        assert_eq!(
            bound.sql,
            "UPDATE `t` SET `id` = :id, `name` = :name WHERE `id` = :where_id AND `name` != :wherenot_name"
        );
        assert_eq!(
            names(&bound),
            vec![":id", ":name", ":where_id", ":wherenot_name"]
        );
    }

    #[test]
    fn test_update_sql_resolves_namespace_collisions() {
        let data = Params::new().with("where_id", 7);
        let bound = update_sql("t", &data, &Filter::new().eq("id", 1), &Filter::new(), 0).unwrap();
        assert_eq!(
            bound.sql,
            "UPDATE `t` SET `where_id` = :where_id WHERE `id` = :where_id_1"
        );
    }

    #[test]
    fn test_update_sql_with_limit() {
        let data = Params::new().with("flag", 1);
        let bound = update_sql("t", &data, &Filter::new().eq("flag", 0), &Filter::new(), 1).unwrap();
        assert_eq!(
            bound.sql,
            "UPDATE `t` SET `flag` = :flag WHERE rowid IN (SELECT rowid FROM `t` WHERE `flag` = :where_flag LIMIT 1)"
        );
    }

    #[test]
    fn test_update_sql_requires_data_and_where() {
        let data = Params::new().with("a", 1);
        assert_eq!(
            update_sql("t", &Params::new(), &Filter::new().eq("a", 1), &Filter::new(), 0),
            Err(BuildError::EmptyData)
        );
        assert_eq!(
            update_sql("t", &data, &Filter::new(), &Filter::new(), 0),
            Err(BuildError::EmptyWhere)
        );
    }

    #[test]
    fn test_templates() {
        assert_eq!(
            insert_template("t", &["a", "b"]).unwrap(),
            "INSERT INTO `t` (`a`, `b`) VALUES (:a, :b)"
        );
        assert_eq!(
            update_template("t", &["a"], "id = :id").unwrap(),
            "UPDATE `t` SET `a` = :a WHERE id = :id"
        );
        assert_eq!(insert_template("t", &[]), Err(BuildError::EmptyData));
        assert_eq!(update_template("t", &["a"], ""), Err(BuildError::EmptyWhere));
    }
}
