//! SQL type hints used when binding parameters and mapping rows

use crate::{Error, Result, Value};
use std::collections::HashMap;
use uuid::Uuid;

/// Declared SQL type of a column, used to pick the bind and read conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SqlType {
    Boolean,
    SmallInt,
    Integer,
    BigInt,
    Real,
    Double,
    Decimal,
    Char,
    Text,
    Date,
    Time,
    Timestamp,
    Uuid,
    Json,
    Binary,
}

impl SqlType {
    /// Convert a serialized entity field into a bindable [`Value`].
    pub fn to_value(self, json: &serde_json::Value) -> Result<Value> {
        use serde_json::Value as Json;

        if json.is_null() {
            return Ok(Value::Null);
        }

        let mismatch = || {
            Error::mapping(format!(
                "cannot convert {} into a {:?} parameter",
                json, self
            ))
        };

        let value = match self {
            SqlType::Boolean => match json {
                Json::Bool(b) => Value::Bool(*b),
                Json::Number(n) => Value::Bool(n.as_i64().ok_or_else(mismatch)? != 0),
                _ => return Err(mismatch()),
            },
            SqlType::SmallInt => {
                let n = json.as_i64().ok_or_else(mismatch)?;
                Value::I16(i16::try_from(n).map_err(|_| mismatch())?)
            }
            SqlType::Integer => {
                let n = json.as_i64().ok_or_else(mismatch)?;
                Value::I32(i32::try_from(n).map_err(|_| mismatch())?)
            }
            SqlType::BigInt => Value::I64(json.as_i64().ok_or_else(mismatch)?),
            SqlType::Real => Value::F32(json.as_f64().ok_or_else(mismatch)? as f32),
            SqlType::Double => Value::F64(json.as_f64().ok_or_else(mismatch)?),
            SqlType::Decimal | SqlType::Char | SqlType::Text => match json {
                Json::String(s) => Value::String(s.clone()),
                Json::Number(n) => Value::String(n.to_string()),
                Json::Bool(b) => Value::String(b.to_string()),
                _ => return Err(mismatch()),
            },
            SqlType::Date | SqlType::Time | SqlType::Timestamp => match json {
                Json::String(s) => Value::String(s.clone()),
                _ => return Err(mismatch()),
            },
            SqlType::Uuid => match json {
                Json::String(s) => Value::Uuid(Uuid::parse_str(s).map_err(|_| mismatch())?),
                _ => return Err(mismatch()),
            },
            SqlType::Json => Value::Json(json.clone()),
            SqlType::Binary => match json {
                Json::Array(items) => {
                    let bytes = items
                        .iter()
                        .map(|item| {
                            item.as_u64()
                                .and_then(|b| u8::try_from(b).ok())
                                .ok_or_else(mismatch)
                        })
                        .collect::<Result<Vec<u8>>>()?;
                    Value::Bytes(bytes)
                }
                _ => return Err(mismatch()),
            },
        };
        Ok(value)
    }

    /// Convert a column value read from a row into the JSON shape the field
    /// deserializes from.
    pub fn to_json(self, value: &Value) -> serde_json::Value {
        match (self, value) {
            (SqlType::Boolean, v) if v.as_i64().is_some() => {
                serde_json::Value::Bool(v.as_i64() != Some(0))
            }
            (SqlType::Json, Value::String(s)) => {
                serde_json::from_str(s).unwrap_or_else(|_| serde_json::Value::String(s.clone()))
            }
            (SqlType::Decimal, Value::F64(f)) => serde_json::Value::String(f.to_string()),
            _ => value.to_json(),
        }
    }
}

/// Conversion used when no hint is known for a field
pub fn untyped_value(json: &serde_json::Value) -> Value {
    use serde_json::Value as Json;
    match json {
        Json::Null => Value::Null,
        Json::Bool(b) => Value::Bool(*b),
        Json::Number(n) => match n.as_i64() {
            Some(i) => Value::I64(i),
            None => n.as_f64().map(Value::F64).unwrap_or(Value::Null),
        },
        Json::String(s) => Value::String(s.clone()),
        other => Value::Json(other.clone()),
    }
}

/// Rust types that may back an entity field.
///
/// The type key is what [`TypeHints`] are indexed by; `Option<T>` shares the
/// key of `T`.
pub trait FieldType {
    fn type_key() -> &'static str {
        std::any::type_name::<Self>()
    }
}

impl<T: FieldType> FieldType for Option<T> {
    fn type_key() -> &'static str {
        T::type_key()
    }
}

macro_rules! field_types {
    ($($ty:ty),* $(,)?) => {
        $(impl FieldType for $ty {})*
    };
}

field_types!(bool, i16, i32, i64, u32, f32, f64, char, String, Vec<u8>, serde_json::Value, Uuid);

impl From<char> for Value {
    fn from(val: char) -> Self {
        Value::String(val.to_string())
    }
}

#[cfg(feature = "datetime-support")]
mod datetime {
    use super::FieldType;
    use crate::Value;
    use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};

    field_types!(NaiveDate, NaiveTime, NaiveDateTime, DateTime<Utc>);

    impl From<NaiveDate> for Value {
        fn from(val: NaiveDate) -> Self {
            Value::String(val.to_string())
        }
    }

    impl From<NaiveTime> for Value {
        fn from(val: NaiveTime) -> Self {
            Value::String(val.to_string())
        }
    }

    impl From<NaiveDateTime> for Value {
        fn from(val: NaiveDateTime) -> Self {
            Value::String(val.to_string())
        }
    }

    impl From<DateTime<Utc>> for Value {
        fn from(val: DateTime<Utc>) -> Self {
            Value::String(val.to_rfc3339())
        }
    }
}

#[cfg(feature = "decimal-support")]
mod decimal {
    use super::FieldType;
    use crate::Value;
    use rust_decimal::Decimal;

    field_types!(Decimal);

    impl From<Decimal> for Value {
        fn from(val: Decimal) -> Self {
            Value::String(val.to_string())
        }
    }
}

/// Process-wide map from Rust field type to [`SqlType`]
#[derive(Debug, Clone)]
pub struct TypeHints {
    hints: HashMap<&'static str, SqlType>,
}

impl TypeHints {
    /// An empty map, every field falls back to the untyped conversion
    pub fn empty() -> Self {
        Self {
            hints: HashMap::new(),
        }
    }

    /// Register or replace the hint for `T`
    pub fn insert<T: FieldType>(&mut self, sql_type: SqlType) -> &mut Self {
        self.hints.insert(T::type_key(), sql_type);
        self
    }

    pub fn get(&self, type_key: &str) -> Option<SqlType> {
        self.hints.get(type_key).copied()
    }

    pub fn len(&self) -> usize {
        self.hints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hints.is_empty()
    }
}

impl Default for TypeHints {
    fn default() -> Self {
        let mut hints = Self::empty();
        hints
            .insert::<bool>(SqlType::Boolean)
            .insert::<i16>(SqlType::SmallInt)
            .insert::<i32>(SqlType::Integer)
            .insert::<i64>(SqlType::BigInt)
            .insert::<u32>(SqlType::BigInt)
            .insert::<f32>(SqlType::Real)
            .insert::<f64>(SqlType::Double)
            .insert::<char>(SqlType::Char)
            .insert::<String>(SqlType::Text)
            .insert::<Vec<u8>>(SqlType::Binary)
            .insert::<serde_json::Value>(SqlType::Json)
            .insert::<Uuid>(SqlType::Uuid);

        #[cfg(feature = "datetime-support")]
        hints
            .insert::<chrono::NaiveDate>(SqlType::Date)
            .insert::<chrono::NaiveTime>(SqlType::Time)
            .insert::<chrono::NaiveDateTime>(SqlType::Timestamp)
            .insert::<chrono::DateTime<chrono::Utc>>(SqlType::Timestamp);

        #[cfg(feature = "decimal-support")]
        hints.insert::<rust_decimal::Decimal>(SqlType::Decimal);

        hints
    }
}
