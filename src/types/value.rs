//! SQL runtime values.
//!
//! [`Value`] is the tagged variant every expression evaluates to and every
//! stored cell holds. Null participates in comparison under three-valued
//! logic: comparing anything with null yields *unknown*, which callers see
//! as `Ok(None)`.

use std::cmp::Ordering;
use std::fmt;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A SQL value.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub enum Value {
    #[default]
    Null,
    Integer(i64),
    Float(f64),
    Text(String),
    Boolean(bool),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
}

impl Value {
    /// Check if this value is NULL.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// The kind of this value, for error messages.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Value::Null => "NULL",
            Value::Integer(_) => "INTEGER",
            Value::Float(_) => "FLOAT",
            Value::Text(_) => "TEXT",
            Value::Boolean(_) => "BOOLEAN",
            Value::Date(_) => "DATE",
            Value::Timestamp(_) => "TIMESTAMP",
        }
    }

    /// Interpret this value as a float, if it is numeric.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Integer(n) => Some(*n as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Compare two values under SQL semantics.
    ///
    /// Returns `Ok(None)` (unknown) when either side is null. Integer and
    /// float compare against each other using real-number ordering, and a
    /// string compares against a date/timestamp by parsing it (the dialect
    /// has no date literal syntax). Any other cross-kind comparison is a
    /// type error. String comparison is case-sensitive.
    pub fn compare(&self, other: &Value) -> Result<Option<Ordering>> {
        use Value::*;
        let ord = match (self, other) {
            (Null, _) | (_, Null) => return Ok(None),
            (Integer(a), Integer(b)) => a.cmp(b),
            (Float(a), Float(b)) => a.partial_cmp(b).unwrap_or(Ordering::Equal),
            (Integer(a), Float(b)) => (*a as f64).partial_cmp(b).unwrap_or(Ordering::Equal),
            (Float(a), Integer(b)) => a.partial_cmp(&(*b as f64)).unwrap_or(Ordering::Equal),
            (Text(a), Text(b)) => a.cmp(b),
            (Boolean(a), Boolean(b)) => a.cmp(b),
            (Date(a), Date(b)) => a.cmp(b),
            (Date(a), Text(s)) => a.cmp(&parse_date(s)?),
            (Text(s), Date(b)) => parse_date(s)?.cmp(b),
            (Timestamp(a), Timestamp(b)) => a.cmp(b),
            (Timestamp(a), Text(s)) => a.cmp(&parse_timestamp(s)?),
            (Text(s), Timestamp(b)) => parse_timestamp(s)?.cmp(b),
            (a, b) => {
                return Err(Error::type_error(format!(
                    "cannot compare {} with {}",
                    a.kind_name(),
                    b.kind_name()
                )))
            }
        };
        Ok(Some(ord))
    }

    /// Total ordering over non-null values of compatible kinds.
    ///
    /// Used by index keys and ORDER BY, where every value has already been
    /// coerced to the column's declared type. Incomparable kinds fall back
    /// to an arbitrary but stable order so sorting never panics.
    pub fn total_cmp(&self, other: &Value) -> Ordering {
        match self.compare(other) {
            Ok(Some(ord)) => ord,
            _ => self.kind_rank().cmp(&other.kind_rank()),
        }
    }

    fn kind_rank(&self) -> u8 {
        match self {
            Value::Null => 0,
            Value::Boolean(_) => 1,
            Value::Integer(_) => 2,
            Value::Float(_) => 3,
            Value::Date(_) => 4,
            Value::Timestamp(_) => 5,
            Value::Text(_) => 6,
        }
    }

    /// Canonical hashable form used for DISTINCT, GROUP BY, and IN-list
    /// dedup. Under this key null equals null, and an integral float equals
    /// the corresponding integer (`1 = 1.0`).
    pub fn key(&self) -> ValueKey {
        match self {
            Value::Null => ValueKey::Null,
            Value::Integer(n) => ValueKey::Integer(*n),
            Value::Float(f) => {
                if f.fract() == 0.0 && (i64::MIN as f64..=i64::MAX as f64).contains(f) {
                    ValueKey::Integer(*f as i64)
                } else if f.is_nan() {
                    ValueKey::Float(f64::NAN.to_bits())
                } else {
                    ValueKey::Float(f.to_bits())
                }
            }
            Value::Text(s) => ValueKey::Text(s.clone()),
            Value::Boolean(b) => ValueKey::Boolean(*b),
            Value::Date(d) => ValueKey::Date(*d),
            Value::Timestamp(t) => ValueKey::Timestamp(*t),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "NULL"),
            Value::Integer(n) => write!(f, "{}", n),
            Value::Float(v) => {
                if v.fract() == 0.0 && v.is_finite() {
                    write!(f, "{:.1}", v)
                } else {
                    write!(f, "{}", v)
                }
            }
            Value::Text(s) => write!(f, "{}", s),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            Value::Timestamp(t) => write!(f, "{}", t.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Integer(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Boolean(v)
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

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|_| Error::type_error(format!("invalid date '{}', expected YYYY-MM-DD", s)))
}

fn parse_timestamp(s: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S").map_err(|_| {
        Error::type_error(format!(
            "invalid timestamp '{}', expected YYYY-MM-DD HH:MM:SS",
            s
        ))
    })
}

/// Hashable canonical form of a [`Value`]. See [`Value::key`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ValueKey {
    Null,
    Integer(i64),
    Float(u64),
    Text(String),
    Boolean(bool),
    Date(NaiveDate),
    Timestamp(NaiveDateTime),
}
