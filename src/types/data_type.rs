//! Declared column types and write-time coercion.

use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::types::Value;

/// A declarable column type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataType {
    Integer,
    Float,
    Varchar(u32),
    Text,
    Boolean,
    Date,
    Timestamp,
}

impl DataType {
    /// Coerce a value for storage in a column of this type.
    ///
    /// Null passes through untouched (NOT NULL is enforced by the catalog).
    /// An integer assigned to a FLOAT column becomes a float, and a string
    /// assigned to DATE/TIMESTAMP is parsed against `%Y-%m-%d` or
    /// `%Y-%m-%d %H:%M:%S`. Any other mismatch is a type error; a VARCHAR
    /// value longer than its limit is a constraint violation.
    pub fn coerce(&self, value: Value) -> Result<Value> {
        match (self, value) {
            (_, Value::Null) => Ok(Value::Null),
            (DataType::Integer, Value::Integer(n)) => Ok(Value::Integer(n)),
            (DataType::Float, Value::Float(f)) => Ok(Value::Float(f)),
            (DataType::Float, Value::Integer(n)) => Ok(Value::Float(n as f64)),
            (DataType::Varchar(limit), Value::Text(s)) => {
                let len = s.chars().count();
                if len > *limit as usize {
                    Err(Error::constraint(format!(
                        "value of length {} exceeds VARCHAR({})",
                        len, limit
                    )))
                } else {
                    Ok(Value::Text(s))
                }
            }
            (DataType::Text, Value::Text(s)) => Ok(Value::Text(s)),
            (DataType::Boolean, Value::Boolean(b)) => Ok(Value::Boolean(b)),
            (DataType::Date, Value::Date(d)) => Ok(Value::Date(d)),
            (DataType::Date, Value::Text(s)) => {
                let d = NaiveDate::parse_from_str(&s, "%Y-%m-%d").map_err(|_| {
                    Error::type_error(format!("invalid date '{}', expected YYYY-MM-DD", s))
                })?;
                Ok(Value::Date(d))
            }
            (DataType::Timestamp, Value::Timestamp(t)) => Ok(Value::Timestamp(t)),
            (DataType::Timestamp, Value::Text(s)) => {
                let t = NaiveDateTime::parse_from_str(&s, "%Y-%m-%d %H:%M:%S").map_err(|_| {
                    Error::type_error(format!(
                        "invalid timestamp '{}', expected YYYY-MM-DD HH:MM:SS",
                        s
                    ))
                })?;
                Ok(Value::Timestamp(t))
            }
            (ty, v) => Err(Error::type_error(format!(
                "cannot store {} value in {} column",
                v.kind_name(),
                ty
            ))),
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataType::Integer => write!(f, "INTEGER"),
            DataType::Float => write!(f, "FLOAT"),
            DataType::Varchar(n) => write!(f, "VARCHAR({})", n),
            DataType::Text => write!(f, "TEXT"),
            DataType::Boolean => write!(f, "BOOLEAN"),
            DataType::Date => write!(f, "DATE"),
            DataType::Timestamp => write!(f, "TIMESTAMP"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_integer_widens_to_float() {
        assert_eq!(
            DataType::Float.coerce(Value::Integer(3)).unwrap(),
            Value::Float(3.0)
        );
    }

    #[test]
    fn test_string_to_integer_fails() {
        assert!(matches!(
            DataType::Integer.coerce(Value::Text("5".into())),
            Err(Error::Type(_))
        ));
    }

    #[test]
    fn test_varchar_length_boundary() {
        let ty = DataType::Varchar(3);
        assert!(ty.coerce(Value::Text("abc".into())).is_ok());
        assert!(matches!(
            ty.coerce(Value::Text("abcd".into())),
            Err(Error::Constraint(_))
        ));
    }

    #[test]
    fn test_date_parsing() {
        let v = DataType::Date.coerce(Value::Text("2024-02-29".into())).unwrap();
        assert!(matches!(v, Value::Date(_)));
        assert!(DataType::Date
            .coerce(Value::Text("2024-13-01".into()))
            .is_err());
        assert!(DataType::Date.coerce(Value::Text("yesterday".into())).is_err());
    }

    #[test]
    fn test_timestamp_parsing() {
        let v = DataType::Timestamp
            .coerce(Value::Text("2024-02-29 12:30:00".into()))
            .unwrap();
        assert!(matches!(v, Value::Timestamp(_)));
        assert!(DataType::Timestamp
            .coerce(Value::Text("2024-02-29".into()))
            .is_err());
    }

    #[test]
    fn test_null_passes_through() {
        assert_eq!(DataType::Integer.coerce(Value::Null).unwrap(), Value::Null);
    }

    #[test]
    fn test_display() {
        assert_eq!(DataType::Varchar(10).to_string(), "VARCHAR(10)");
        assert_eq!(DataType::Integer.to_string(), "INTEGER");
    }
}
