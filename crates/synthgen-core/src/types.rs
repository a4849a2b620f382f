use std::fmt;
use std::str::FromStr;

use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::Error;

/// Declared type of a field.
///
/// Identifiers are matched case-insensitively; anything outside this set is
/// rejected when a schema document is parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    String,
    Integer,
    Float,
    Boolean,
    Date,
    Datetime,
    Email,
    Phone,
    Address,
    Name,
    Custom,
}

impl DataType {
    pub const ALL: [DataType; 11] = [
        DataType::String,
        DataType::Integer,
        DataType::Float,
        DataType::Boolean,
        DataType::Date,
        DataType::Datetime,
        DataType::Email,
        DataType::Phone,
        DataType::Address,
        DataType::Name,
        DataType::Custom,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DataType::String => "string",
            DataType::Integer => "integer",
            DataType::Float => "float",
            DataType::Boolean => "boolean",
            DataType::Date => "date",
            DataType::Datetime => "datetime",
            DataType::Email => "email",
            DataType::Phone => "phone",
            DataType::Address => "address",
            DataType::Name => "name",
            DataType::Custom => "custom",
        }
    }

    pub fn is_numeric(self) -> bool {
        matches!(self, DataType::Integer | DataType::Float)
    }

    pub fn is_temporal(self) -> bool {
        matches!(self, DataType::Date | DataType::Datetime)
    }

    /// Types whose values are free text produced by a faker-style source.
    pub fn is_semantic_text(self) -> bool {
        matches!(
            self,
            DataType::Email | DataType::Phone | DataType::Address | DataType::Name
        )
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataType {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase();
        DataType::ALL
            .iter()
            .copied()
            .find(|data_type| data_type.as_str() == normalized)
            .ok_or_else(|| Error::InvalidValue(format!("unknown data type '{value}'")))
    }
}

impl<'de> Deserialize<'de> for DataType {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Scalar value stored in a record cell.
///
/// Dates and datetimes travel as canonical ISO-8601 text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl FieldValue {
    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, FieldValue::Int(_) | FieldValue::Float(_))
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            FieldValue::Int(value) => Some(*value as f64),
            FieldValue::Float(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Text(value) => Some(value.as_str()),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Bool(value) => Some(*value),
            _ => None,
        }
    }

    /// Runtime type label used in validation messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldValue::Null => "null",
            FieldValue::Bool(_) => "boolean",
            FieldValue::Int(_) => "integer",
            FieldValue::Float(_) => "float",
            FieldValue::Text(_) => "string",
        }
    }

    /// Equality that treats `Int(5)` and `Float(5.0)` as the same number.
    pub fn loosely_equals(&self, other: &FieldValue) -> bool {
        match (self.as_f64(), other.as_f64()) {
            (Some(left), Some(right)) => left == right,
            _ => self == other,
        }
    }

    /// Stable key for distinct-value counting.
    pub fn distinct_key(&self) -> String {
        match self {
            FieldValue::Int(_) | FieldValue::Float(_) => format!("number:{self}"),
            other => format!("{}:{other}", other.type_name()),
        }
    }

    /// Cell text for CSV export; nulls become empty cells.
    pub fn to_csv(&self) -> String {
        match self {
            FieldValue::Null => String::new(),
            other => other.to_string(),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            FieldValue::Null => Value::Null,
            FieldValue::Bool(value) => Value::Bool(*value),
            FieldValue::Int(value) => Value::from(*value),
            FieldValue::Float(value) => serde_json::Number::from_f64(*value)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            FieldValue::Text(value) => Value::String(value.clone()),
        }
    }

    /// Convert arbitrary JSON; arrays and objects are kept as compact JSON text.
    pub fn from_json(value: &Value) -> FieldValue {
        match value {
            Value::Null => FieldValue::Null,
            Value::Bool(value) => FieldValue::Bool(*value),
            Value::Number(number) => number
                .as_i64()
                .map(FieldValue::Int)
                .or_else(|| number.as_f64().map(FieldValue::Float))
                .unwrap_or(FieldValue::Null),
            Value::String(value) => FieldValue::Text(value.clone()),
            other => FieldValue::Text(other.to_string()),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => f.write_str("null"),
            FieldValue::Bool(value) => write!(f, "{value}"),
            FieldValue::Int(value) => write!(f, "{value}"),
            FieldValue::Float(value) => write!(f, "{value:?}"),
            FieldValue::Text(value) => f.write_str(value),
        }
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Bool(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Int(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        FieldValue::Int(i64::from(value))
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Float(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(FieldValue::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_type_parses_case_insensitively() {
        assert_eq!("Integer".parse::<DataType>().unwrap(), DataType::Integer);
        assert_eq!(" DATETIME ".parse::<DataType>().unwrap(), DataType::Datetime);
        assert!("uuid".parse::<DataType>().is_err());
    }

    #[test]
    fn field_value_round_trips_json_scalars() {
        let parsed: Vec<FieldValue> =
            serde_json::from_str(r#"[null, true, 3, 2.5, "x"]"#).expect("parse values");
        assert_eq!(
            parsed,
            vec![
                FieldValue::Null,
                FieldValue::Bool(true),
                FieldValue::Int(3),
                FieldValue::Float(2.5),
                FieldValue::Text("x".to_string()),
            ]
        );
        let json = serde_json::to_string(&parsed).expect("serialize values");
        assert_eq!(json, r#"[null,true,3,2.5,"x"]"#);
    }

    #[test]
    fn numbers_compare_loosely() {
        assert!(FieldValue::Int(5).loosely_equals(&FieldValue::Float(5.0)));
        assert!(!FieldValue::Text("5".into()).loosely_equals(&FieldValue::Int(5)));
    }

    #[test]
    fn nested_json_becomes_text() {
        let value = FieldValue::from_json(&serde_json::json!({"a": 1}));
        assert_eq!(value, FieldValue::Text(r#"{"a":1}"#.to_string()));
    }
}
