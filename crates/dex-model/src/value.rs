//! Raw source values and their typed interpretation.

use std::borrow::Cow;
use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use dex_common::{format_numeric, parse_bool, parse_f64, parse_i64};

use crate::datatype::DataType;

/// Date layout accepted for `date` columns.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Layouts accepted for `datetime` columns besides RFC 3339.
const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

/// A value exactly as received from a row source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    Text(String),
}

impl RawValue {
    /// Null or empty text. Whitespace is data.
    pub fn is_missing(&self) -> bool {
        match self {
            RawValue::Null => true,
            RawValue::Text(text) => text.is_empty(),
            _ => false,
        }
    }

    /// String form used for pattern matching and diagnostics.
    pub fn as_text(&self) -> Cow<'_, str> {
        match self {
            RawValue::Null => Cow::Borrowed(""),
            RawValue::Boolean(value) => Cow::Owned(value.to_string()),
            RawValue::Integer(value) => Cow::Owned(value.to_string()),
            RawValue::Float(value) => Cow::Owned(format_numeric(*value)),
            RawValue::Text(text) => Cow::Borrowed(text.as_str()),
        }
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        RawValue::Text(value.to_string())
    }
}

impl From<String> for RawValue {
    fn from(value: String) -> Self {
        RawValue::Text(value)
    }
}

impl From<i64> for RawValue {
    fn from(value: i64) -> Self {
        RawValue::Integer(value)
    }
}

impl From<f64> for RawValue {
    fn from(value: f64) -> Self {
        RawValue::Float(value)
    }
}

impl From<bool> for RawValue {
    fn from(value: bool) -> Self {
        RawValue::Boolean(value)
    }
}

impl<T: Into<RawValue>> From<Option<T>> for RawValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(RawValue::Null, Into::into)
    }
}

/// A raw value that cannot be interpreted as its declared type.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("'{value}' is not a valid {datatype}")]
pub struct CoercionError {
    pub datatype: DataType,
    pub value: String,
}

/// A value interpreted according to its column's declared type.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Text(String),
    Integer(i64),
    Double(f64),
    Boolean(bool),
    Date(NaiveDate),
    DateTime(NaiveDateTime),
}

impl Value {
    /// Interpret `raw` as `datatype`.
    ///
    /// Missing values coerce to `Null` for every type.
    pub fn coerce(raw: &RawValue, datatype: DataType) -> Result<Value, CoercionError> {
        if raw.is_missing() {
            return Ok(Value::Null);
        }
        let coerced = match datatype {
            DataType::String => Some(Value::Text(raw.as_text().into_owned())),
            DataType::Integer => match raw {
                RawValue::Integer(value) => Some(Value::Integer(*value)),
                RawValue::Float(value) if value.fract() == 0.0 && value.is_finite() => {
                    i64::try_from(*value as i128).ok().map(Value::Integer)
                }
                RawValue::Text(text) => parse_i64(text).map(Value::Integer),
                _ => None,
            },
            DataType::Double => match raw {
                RawValue::Integer(value) => Some(Value::Double(*value as f64)),
                RawValue::Float(value) if value.is_finite() => Some(Value::Double(*value)),
                RawValue::Text(text) => parse_f64(text).map(Value::Double),
                _ => None,
            },
            DataType::Boolean => match raw {
                RawValue::Boolean(value) => Some(Value::Boolean(*value)),
                RawValue::Integer(0) => Some(Value::Boolean(false)),
                RawValue::Integer(1) => Some(Value::Boolean(true)),
                RawValue::Text(text) => parse_bool(text).map(Value::Boolean),
                _ => None,
            },
            DataType::Date => match raw {
                RawValue::Text(text) => parse_date(text).map(Value::Date),
                _ => None,
            },
            DataType::DateTime => match raw {
                RawValue::Text(text) => parse_datetime(text).map(Value::DateTime),
                _ => None,
            },
        };
        coerced.ok_or_else(|| CoercionError {
            datatype,
            value: raw.as_text().into_owned(),
        })
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Numeric interpretation, if any.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(value) => Some(*value as f64),
            Value::Double(value) => Some(*value),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Text(text) => write!(f, "{text}"),
            Value::Integer(value) => write!(f, "{value}"),
            Value::Double(value) => write!(f, "{}", format_numeric(*value)),
            Value::Boolean(value) => write!(f, "{value}"),
            Value::Date(date) => write!(f, "{}", date.format(DATE_FORMAT)),
            Value::DateTime(datetime) => write!(f, "{}", datetime.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

fn parse_date(text: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(text.trim(), DATE_FORMAT).ok()
}

fn parse_datetime(text: &str) -> Option<NaiveDateTime> {
    let trimmed = text.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(parsed.naive_utc());
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(trimmed, format).ok())
}
