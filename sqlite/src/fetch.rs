//! Conversion between driver values and [`Value`]/[`Row`].
//!
//! SQLite storage classes map one-to-one onto [`Value`] variants, so rows
//! come back exactly as stored.

use rusqlite::types::{Value as SqlValue, ValueRef};
use rusqlite::{Statement, ToSql};
use sqlhelper_core::sql::normalize_param_name;
use sqlhelper_core::{Row, Value};

pub(crate) fn from_value_ref(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(v) => Value::Integer(v),
        ValueRef::Real(v) => Value::Real(v),
        ValueRef::Text(v) => Value::Text(String::from_utf8_lossy(v).into_owned()),
        ValueRef::Blob(v) => Value::Blob(v.to_vec()),
    }
}

pub(crate) fn to_sql_value(value: &Value) -> SqlValue {
    match value {
        Value::Null => SqlValue::Null,
        Value::Integer(v) => SqlValue::Integer(*v),
        Value::Real(v) => SqlValue::Real(*v),
        Value::Text(v) => SqlValue::Text(v.clone()),
        Value::Blob(v) => SqlValue::Blob(v.clone()),
    }
}

/// Owned, name-normalized parameters ready to hand to the driver.
pub(crate) struct NamedValues {
    values: Vec<(String, SqlValue)>,
}

impl NamedValues {
    pub(crate) fn new<'a>(params: impl IntoIterator<Item = (&'a str, &'a Value)>) -> Self {
        Self {
            values: params
                .into_iter()
                .map(|(name, value)| (normalize_param_name(name), to_sql_value(value)))
                .collect(),
        }
    }

    /// First `:name`/`@name`/`$name` placeholder of `stmt` with no value
    /// here. Positional `?` parameters are not checked.
    pub(crate) fn first_missing(&self, stmt: &Statement<'_>) -> Option<String> {
        (1..=stmt.parameter_count())
            .filter_map(|i| stmt.parameter_name(i))
            .filter(|name| !name.starts_with('?'))
            .find(|name| !self.values.iter().any(|(n, _)| n == name))
            .map(str::to_string)
    }

    pub(crate) fn as_params(&self) -> Vec<(&str, &dyn ToSql)> {
        self.values
            .iter()
            .map(|(name, value)| (name.as_str(), value as &dyn ToSql))
            .collect()
    }
}

/// Runs `stmt` with only `params` bound and maps up to `limit` rows (all when `None`) by column name.
pub(crate) fn fetch_rows(
    stmt: &mut Statement<'_>,
    params: &NamedValues,
    limit: Option<usize>,
) -> rusqlite::Result<Vec<Row>> {
    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
    let bound = params.as_params();
    stmt.clear_bindings();
    let mut rows = stmt.query(bound.as_slice())?;

    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        let mut pairs = Vec::with_capacity(columns.len());
        for (i, column) in columns.iter().enumerate() {
            pairs.push((column.clone(), from_value_ref(row.get_ref(i)?)));
        }
        out.push(Row::from_pairs(pairs));
        if limit.is_some_and(|l| out.len() >= l) {
            break;
        }
    }
    Ok(out)
}

/// Runs `stmt` with only `params` bound for its side effects and returns the affected row count.
pub(crate) fn execute(stmt: &mut Statement<'_>, params: &NamedValues) -> rusqlite::Result<usize> {
    let bound = params.as_params();
    stmt.clear_bindings();
    stmt.execute(bound.as_slice())
}
