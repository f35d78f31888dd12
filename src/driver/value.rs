//! Values, rows and execution results exchanged with physical connections.

use std::sync::Arc;

use crate::error::{Error, Result};

/// A positional statement argument or a decoded column value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    String(String),
    Bytes(Vec<u8>),
}

impl Value {
    /// Check if value is NULL
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Integer view, converting unsigned and numeric strings where lossless
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            Value::UInt(u) => i64::try_from(*u).ok(),
            Value::Bool(b) => Some(i64::from(*b)),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Borrowed string view
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            Value::Bytes(b) => std::str::from_utf8(b).ok(),
            _ => None,
        }
    }

    /// Owned text rendering; NULL becomes `None`
    pub fn to_text(&self) -> Option<String> {
        match self {
            Value::Null => None,
            Value::Bool(b) => Some(if *b { "1" } else { "0" }.to_string()),
            Value::Int(i) => Some(i.to_string()),
            Value::UInt(u) => Some(u.to_string()),
            Value::Float(f) => Some(f.to_string()),
            Value::String(s) => Some(s.clone()),
            Value::Bytes(b) => Some(String::from_utf8_lossy(b).into_owned()),
        }
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.to_text() {
            Some(text) => write!(f, "{}", text),
            None => write!(f, "NULL"),
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(i64::from(v))
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<u64> for Value {
    fn from(v: u64) -> Self {
        Value::UInt(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::String(v)
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(Value::Null)
    }
}

/// One materialised result row
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Arc<[String]>,
    values: Vec<Value>,
}

impl Row {
    pub fn new(columns: Arc<[String]>, values: Vec<Value>) -> Self {
        Self { columns, values }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Value by column name (case-insensitive, first match wins)
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(column))
            .and_then(|i| self.values.get(i))
    }

    /// Required integer column
    pub fn try_i64(&self, column: &str) -> Result<i64> {
        self.get(column)
            .and_then(Value::as_i64)
            .ok_or_else(|| Error::QueryExecution(format!("column '{}' is not an integer", column)))
    }

    /// Text column; NULL decodes to an empty string
    pub fn try_string(&self, column: &str) -> Result<String> {
        self.get(column)
            .map(|v| v.to_text().unwrap_or_default())
            .ok_or_else(|| Error::QueryExecution(format!("column '{}' not in result", column)))
    }
}

/// A fully read result set
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Rows {
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl Rows {
    pub fn new(columns: Vec<String>, rows: Vec<Row>) -> Self {
        Self { columns, rows }
    }

    /// Build a result set from column names and raw value tuples
    pub fn from_values(columns: Vec<String>, values: Vec<Vec<Value>>) -> Self {
        let shared: Arc<[String]> = columns.clone().into();
        let rows = values
            .into_iter()
            .map(|v| Row::new(Arc::clone(&shared), v))
            .collect();
        Self { columns, rows }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Row> {
        self.rows.iter()
    }

    /// Consume the set, keeping only the first row
    pub fn into_first(self) -> Option<Row> {
        self.rows.into_iter().next()
    }
}

impl IntoIterator for Rows {
    type Item = Row;
    type IntoIter = std::vec::IntoIter<Row>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_iter()
    }
}

impl<'a> IntoIterator for &'a Rows {
    type Item = &'a Row;
    type IntoIter = std::slice::Iter<'a, Row>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}

/// Outcome of a statement that returns no rows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExecResult {
    pub rows_affected: u64,
    pub last_insert_id: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Rows {
        Rows::from_values(
            vec!["id".to_string(), "model".to_string()],
            vec![
                vec![Value::Int(1), Value::from("corolla")],
                vec![Value::UInt(2), Value::Null],
            ],
        )
    }

    #[test]
    fn test_row_lookup() {
        let rows = sample();
        assert_eq!(rows.len(), 2);

        let first = rows.iter().next().unwrap();
        assert_eq!(first.try_i64("ID").unwrap(), 1);
        assert_eq!(first.try_string("model").unwrap(), "corolla");
        assert!(first.try_string("color").is_err());

        let second = rows.into_iter().nth(1).unwrap();
        assert_eq!(second.try_i64("id").unwrap(), 2);
        assert_eq!(second.try_string("model").unwrap(), "");
    }

    #[test]
    fn test_value_conversions() {
        assert_eq!(Value::from(Some(5i64)), Value::Int(5));
        assert_eq!(Value::from(None::<String>), Value::Null);
        assert_eq!(Value::from("42").as_i64(), Some(42));
        assert_eq!(Value::UInt(u64::MAX).as_i64(), None);
        assert_eq!(Value::Null.to_string(), "NULL");
    }

    #[test]
    fn test_into_first() {
        assert!(Rows::default().into_first().is_none());
        assert_eq!(sample().into_first().unwrap().values()[0], Value::Int(1));
    }
}
