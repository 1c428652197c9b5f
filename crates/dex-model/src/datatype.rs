use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Declared type of a column.
///
/// Tokens are matched case-insensitively; a few aliases used by BI-tool
/// exports are accepted (`text`, `int`, `real`, `float`, `bool`).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DataType {
    #[default]
    String,
    Date,
    DateTime,
    Double,
    Integer,
    Boolean,
}

impl DataType {
    /// Canonical lower-case token.
    pub fn as_str(&self) -> &'static str {
        match self {
            DataType::String => "string",
            DataType::Date => "date",
            DataType::DateTime => "datetime",
            DataType::Double => "double",
            DataType::Integer => "integer",
            DataType::Boolean => "boolean",
        }
    }

    /// Returns true for types with a numeric interpretation.
    pub fn is_numeric(&self) -> bool {
        matches!(self, DataType::Double | DataType::Integer)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for DataType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "string" | "text" | "str" => Ok(DataType::String),
            "date" => Ok(DataType::Date),
            "datetime" | "timestamp" => Ok(DataType::DateTime),
            "double" | "float" | "real" | "number" => Ok(DataType::Double),
            "integer" | "int" => Ok(DataType::Integer),
            "boolean" | "bool" => Ok(DataType::Boolean),
            _ => Err(format!("unknown datatype: {s}")),
        }
    }
}

impl Serialize for DataType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for DataType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let token = String::deserialize(deserializer)?;
        token.parse().map_err(serde::de::Error::custom)
    }
}
