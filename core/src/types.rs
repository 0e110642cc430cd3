//! Value, row and input-mapping types shared by the SQL builders and the
//! database helpers.
//!
//! The types mirror SQLite's storage classes and keep column order exactly
//! as the caller (or the driver) supplied it, so generated SQL and returned
//! rows are deterministic.

use std::fmt;

use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize, Serializer};

/// A single SQL value.
///
/// Serializes untagged: `Null` as `null`, numbers as JSON numbers, text as a
/// string and blobs as a byte array.
///
/// # Examples
///
/// ```
/// use sqlhelper_core::Value;
///
/// assert_eq!(Value::from(7), Value::Integer(7));
/// assert_eq!(Value::from("abc"), Value::Text("abc".into()));
/// assert_eq!(Value::from(None::<i64>), Value::Null);
/// assert_eq!(Value::from(true).to_string(), "1");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum Value {
    /// SQL `NULL`.
    #[default]
    Null,
    /// 64-bit signed integer.
    Integer(i64),
    /// 64-bit float.
    Real(f64),
    /// UTF-8 text.
    Text(String),
    /// Raw bytes.
    Blob(Vec<u8>),
}

impl Value {
    /// Returns `true` for [`Value::Null`].
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns the integer payload, if any.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the text payload, if any.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(v) => Some(v),
            _ => None,
        }
    }
}

/// Textual form used for LIKE patterns and map keys. `Null` renders empty,
/// blobs render lossily as UTF-8.
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Integer(v) => write!(f, "{v}"),
            Value::Real(v) => write!(f, "{v}"),
            Value::Text(v) => f.write_str(v),
            Value::Blob(v) => f.write_str(&String::from_utf8_lossy(v)),
        }
    }
}

macro_rules! impl_from_integer {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(v: $t) -> Self {
                    Value::Integer(i64::from(v))
                }
            }
        )*
    };
}

impl_from_integer!(i8, i16, i32, i64, u8, u16, u32);

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Integer(i64::from(v))
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Real(f64::from(v))
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Real(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Blob(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::Null, Into::into)
    }
}

/// One result row: column names paired with values, in result-set order.
///
/// Serializes as a JSON object whose keys keep the column order.
///
/// # Examples
///
/// ```
/// use sqlhelper_core::{Row, Value};
///
/// let row = Row::from_pairs(vec![
///     ("id".to_string(), Value::Integer(1)),
///     ("name".to_string(), Value::from("ada")),
/// ]);
/// assert_eq!(row.get("name"), Some(&Value::from("ada")));
/// assert_eq!(row.columns().collect::<Vec<_>>(), vec!["id", "name"]);
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Row {
    pairs: Vec<(String, Value)>,
}

impl Row {
    /// Builds a row from `(column, value)` pairs.
    pub fn from_pairs(pairs: Vec<(String, Value)>) -> Self {
        Self { pairs }
    }

    /// Looks up a column by name. With duplicate column names the first one
    /// wins, matching how the driver resolves names.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.pairs.iter().find(|(c, _)| c == column).map(|(_, v)| v)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.pairs.iter().map(|(c, _)| c.as_str())
    }

    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.pairs.iter().map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.pairs.iter().map(|(c, v)| (c.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn into_pairs(self) -> Vec<(String, Value)> {
        self.pairs
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.pairs.len()))?;
        for (column, value) in &self.pairs {
            map.serialize_entry(column, value)?;
        }
        map.end()
    }
}

/// Ordered column → value mapping used as the data of inserts and updates.
///
/// Inserting an existing key replaces its value in place, so every column
/// appears once.
///
/// # Examples
///
/// ```
/// use sqlhelper_core::{Params, Value};
///
/// let data = Params::new().with("name", "ada").with("age", 36).with("name", "grace");
/// assert_eq!(data.len(), 2);
/// assert_eq!(data.get("name"), Some(&Value::from("grace")));
/// assert_eq!(data.keys().collect::<Vec<_>>(), vec!["name", "age"]);
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Params {
    entries: Vec<(String, Value)>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Params {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut params = Params::new();
        for (k, v) in iter {
            params.insert(k, v);
        }
        params
    }
}

/// Match condition for one column of a [`Filter`].
#[derive(Debug, Clone, PartialEq)]
pub enum Criterion {
    /// A single value.
    Eq(Value),
    /// Any of an ordered list of values (rendered as an OR group).
    AnyOf(Vec<Value>),
}

/// Ordered column → [`Criterion`] mapping that drives WHERE generation.
///
/// Re-adding a column replaces its criterion in place.
///
/// # Examples
///
/// ```
/// use sqlhelper_core::{Criterion, Filter, Value};
///
/// let filter = Filter::new().eq("status", "open").any_of("owner", ["ada", "grace"]);
/// assert_eq!(filter.len(), 2);
/// assert!(matches!(filter.get("owner"), Some(Criterion::AnyOf(v)) if v.len() == 2));
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Filter {
    criteria: Vec<(String, Criterion)>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a scalar criterion.
    pub fn eq(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(column, Criterion::Eq(value.into()));
        self
    }

    /// Adds a list criterion.
    pub fn any_of<I, V>(mut self, column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        let values = values.into_iter().map(Into::into).collect();
        self.insert(column, Criterion::AnyOf(values));
        self
    }

    pub fn insert(&mut self, column: impl Into<String>, criterion: Criterion) {
        let column = column.into();
        match self.criteria.iter_mut().find(|(c, _)| *c == column) {
            Some(entry) => entry.1 = criterion,
            None => self.criteria.push((column, criterion)),
        }
    }

    pub fn get(&self, column: &str) -> Option<&Criterion> {
        self.criteria
            .iter()
            .find(|(c, _)| c == column)
            .map(|(_, crit)| crit)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Criterion)> {
        self.criteria.iter().map(|(c, crit)| (c.as_str(), crit))
    }

    pub fn len(&self) -> usize {
        self.criteria.len()
    }

    pub fn is_empty(&self) -> bool {
        self.criteria.is_empty()
    }
}

impl From<Params> for Filter {
    fn from(params: Params) -> Self {
        Filter {
            criteria: params
                .entries
                .into_iter()
                .map(|(k, v)| (k, Criterion::Eq(v)))
                .collect(),
        }
    }
}
