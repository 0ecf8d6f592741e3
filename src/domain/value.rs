//! Typed column values and rows
//!
//! Rows read from a source table are resolved once into a closed set of
//! value variants. Everything downstream (exclude matching, providers, the
//! bulk encoder) works on these types instead of driver-specific row types.

use serde_json::Number;
use std::fmt;
use std::sync::Arc;

/// A single column value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// SQL NULL
    Null,
    /// Any character data
    Text(String),
    /// Integer or floating point number
    Number(Number),
    /// Boolean
    Boolean(bool),
    /// JSON / JSONB document
    Structured(serde_json::Value),
}

impl Value {
    /// Returns true for SQL NULL
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns true when there is nothing to anonymize in this value
    ///
    /// NULL, empty text and empty JSON documents are empty. Zero and `false`
    /// are real values and are not considered empty.
    pub fn is_empty(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Text(s) => s.is_empty(),
            Value::Structured(json) => match json {
                serde_json::Value::Null => true,
                serde_json::Value::String(s) => s.is_empty(),
                serde_json::Value::Array(items) => items.is_empty(),
                serde_json::Value::Object(map) => map.is_empty(),
                _ => false,
            },
            Value::Number(_) | Value::Boolean(_) => false,
        }
    }

    /// Textual form of the value, as matched by exclude patterns and hashed by providers
    ///
    /// Returns `None` for NULL.
    pub fn text_form(&self) -> Option<String> {
        match self {
            Value::Null => None,
            Value::Text(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Boolean(b) => Some(b.to_string()),
            Value::Structured(json) => Some(json.to_string()),
        }
    }

    /// Append a literal suffix to the value
    ///
    /// Text gets the suffix appended directly, other non-null values are
    /// converted to their textual form first. NULL stays NULL.
    pub fn with_suffix(self, suffix: &str) -> Value {
        match self {
            Value::Null => Value::Null,
            Value::Text(mut s) => {
                s.push_str(suffix);
                Value::Text(s)
            }
            other => match other.text_form() {
                Some(mut s) => {
                    s.push_str(suffix);
                    Value::Text(s)
                }
                None => Value::Null,
            },
        }
    }

    /// Convert a JSON value into a column value
    ///
    /// Scalars map onto the matching variant; arrays and objects become
    /// [`Value::Structured`].
    pub fn from_json(json: serde_json::Value) -> Value {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Boolean(b),
            serde_json::Value::Number(n) => Value::Number(n),
            serde_json::Value::String(s) => Value::Text(s),
            other => Value::Structured(other),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(Number::from(n))
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(Number::from(n))
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Value::Null)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.text_form() {
            Some(s) => f.write_str(&s),
            None => f.write_str("NULL"),
        }
    }
}

/// A read-only snapshot of one source row
///
/// Values are stored in the order of the fetched column list, which always
/// starts with the identifying column. The column list is shared between all
/// rows of a table.
#[derive(Debug, Clone, PartialEq)]
pub struct Row {
    columns: Arc<[String]>,
    values: Vec<Value>,
}

impl Row {
    /// Create a row from a shared column list and values in the same order
    ///
    /// Returns `None` when the number of values does not match the column list
    /// or the column list is empty.
    pub fn new(columns: Arc<[String]>, values: Vec<Value>) -> Option<Self> {
        if columns.is_empty() || columns.len() != values.len() {
            return None;
        }
        Some(Self { columns, values })
    }

    /// Value of the identifying column
    pub fn key(&self) -> &Value {
        &self.values[0]
    }

    /// Value of a column by name
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|idx| &self.values[idx])
    }

    /// Value at a position of the fetched column list
    pub fn value_at(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Fetched column names
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Values in column order
    pub fn values(&self) -> &[Value] {
        &self.values
    }
}
