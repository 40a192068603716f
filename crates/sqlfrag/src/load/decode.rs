//! Decoding column values into Rust types.

use crate::error::{DecodeError, RenderError, RenderResult};
use crate::value::Value;
use bytes::Bytes;
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;
use serde::de::DeserializeOwned;
use uuid::Uuid;

/// A type that decodes itself from one column value.
///
/// Types implementing `Decode` are leaves: the loader never looks inside them for
/// more columns, even when they are structs.
pub trait Decode: Sized {
    fn decode(value: &Value) -> Result<Self, DecodeError>;
}

/// Scan target for one column.
pub trait Scan {
    fn scan(&mut self, value: &Value) -> Result<(), DecodeError>;
}

impl<T: Decode> Scan for T {
    fn scan(&mut self, value: &Value) -> Result<(), DecodeError> {
        *self = T::decode(value)?;
        Ok(())
    }
}

/// A leaf value that can be bound back as a parameter, e.g. by
/// [`Insert::record`](crate::stmt::Insert::record).
///
/// Every `Clone` type convertible into [`Value`] is `Encode`. Custom decodable
/// types used as record fields usually get it from a `From<T> for Value` impl.
pub trait Encode {
    fn encode(&self) -> RenderResult<Value>;
}

impl<T: Clone + Into<Value>> Encode for T {
    fn encode(&self) -> RenderResult<Value> {
        Ok(self.clone().into())
    }
}

/// Scan target that accepts and drops any value.
///
/// Unmatched columns are read into it so every column of a row is consumed.
#[derive(Debug, Clone, Copy, Default)]
pub struct Discard;

impl Scan for Discard {
    fn scan(&mut self, _value: &Value) -> Result<(), DecodeError> {
        Ok(())
    }
}

fn mismatch(expected: &'static str, value: &Value) -> DecodeError {
    match value {
        Value::Null => DecodeError::UnexpectedNull,
        other => DecodeError::TypeMismatch {
            expected,
            found: other.kind(),
        },
    }
}

impl Decode for Value {
    fn decode(value: &Value) -> Result<Self, DecodeError> {
        Ok(value.clone())
    }
}

impl<T: Decode> Decode for Option<T> {
    fn decode(value: &Value) -> Result<Self, DecodeError> {
        match value {
            Value::Null => Ok(None),
            other => T::decode(other).map(Some),
        }
    }
}

impl Decode for bool {
    fn decode(value: &Value) -> Result<Self, DecodeError> {
        match value {
            Value::Bool(b) => Ok(*b),
            // MySQL and SQLite store booleans as integers
            Value::Int(0) => Ok(false),
            Value::Int(1) => Ok(true),
            other => Err(mismatch("bool", other)),
        }
    }
}

macro_rules! decode_int {
    ($($ty:ty => $name:literal),*) => {
        $(
            impl Decode for $ty {
                fn decode(value: &Value) -> Result<Self, DecodeError> {
                    match value {
                        Value::Int(i) => <$ty>::try_from(*i).map_err(|_| DecodeError::OutOfRange($name)),
                        other => Err(mismatch($name, other)),
                    }
                }
            }
        )*
    };
}

decode_int!(i16 => "i16", i32 => "i32", i64 => "i64", u32 => "u32");

impl Decode for f64 {
    fn decode(value: &Value) -> Result<Self, DecodeError> {
        match value {
            Value::Float(f) => Ok(*f),
            Value::Int(i) => Ok(*i as f64),
            other => Err(mismatch("f64", other)),
        }
    }
}

impl Decode for f32 {
    fn decode(value: &Value) -> Result<Self, DecodeError> {
        f64::decode(value).map(|f| f as f32)
    }
}

impl Decode for String {
    fn decode(value: &Value) -> Result<Self, DecodeError> {
        match value {
            Value::Text(s) => Ok(s.clone()),
            Value::Bytes(b) => String::from_utf8(b.to_vec()).map_err(|e| DecodeError::invalid(e.to_string())),
            other => Err(mismatch("string", other)),
        }
    }
}

impl Decode for Bytes {
    fn decode(value: &Value) -> Result<Self, DecodeError> {
        match value {
            Value::Bytes(b) => Ok(b.clone()),
            Value::Text(s) => Ok(Bytes::copy_from_slice(s.as_bytes())),
            other => Err(mismatch("bytes", other)),
        }
    }
}

impl Decode for serde_json::Value {
    fn decode(value: &Value) -> Result<Self, DecodeError> {
        match value {
            Value::Json(j) => Ok(j.clone()),
            Value::Text(s) => serde_json::from_str(s).map_err(|e| DecodeError::invalid(e.to_string())),
            Value::Bytes(b) => serde_json::from_slice(b).map_err(|e| DecodeError::invalid(e.to_string())),
            other => Err(mismatch("json", other)),
        }
    }
}

const TEXT_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

impl Decode for DateTime<Utc> {
    fn decode(value: &Value) -> Result<Self, DecodeError> {
        match value {
            Value::Timestamp(t) => Ok(*t),
            Value::Text(s) => parse_time(s),
            Value::Bytes(b) => {
                let s = std::str::from_utf8(b).map_err(|e| DecodeError::invalid(e.to_string()))?;
                parse_time(s)
            }
            other => Err(mismatch("timestamp", other)),
        }
    }
}

fn parse_time(s: &str) -> Result<DateTime<Utc>, DecodeError> {
    if let Ok(t) = DateTime::parse_from_rfc3339(s) {
        return Ok(t.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(s, TEXT_TIME_FORMAT)
        .map(|t| t.and_utc())
        .map_err(|_| DecodeError::invalid(format!("invalid time string: {s}")))
}

impl Decode for Uuid {
    fn decode(value: &Value) -> Result<Self, DecodeError> {
        match value {
            Value::Uuid(u) => Ok(*u),
            Value::Text(s) => Uuid::parse_str(s).map_err(|e| DecodeError::invalid(e.to_string())),
            Value::Bytes(b) => Uuid::from_slice(b).map_err(|e| DecodeError::invalid(e.to_string())),
            other => Err(mismatch("uuid", other)),
        }
    }
}

/// A JSON column deserialized into `T`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Json<T>(pub T);

impl<T: DeserializeOwned> Decode for Json<T> {
    fn decode(value: &Value) -> Result<Self, DecodeError> {
        let json = serde_json::Value::decode(value)?;
        serde_json::from_value(json)
            .map(Json)
            .map_err(|e| DecodeError::invalid(e.to_string()))
    }
}

impl<T: Serialize> Encode for Json<T> {
    fn encode(&self) -> RenderResult<Value> {
        serde_json::to_value(&self.0)
            .map(Value::Json)
            .map_err(|e| RenderError::fragment(e.to_string()))
    }
}

impl<T: Serialize> Encode for Option<Json<T>> {
    fn encode(&self) -> RenderResult<Value> {
        match self {
            Some(json) => json.encode(),
            None => Ok(Value::Null),
        }
    }
}
