//! RESP (`REdis` Serialization Protocol) value types and scalar reply helpers

use crate::error::{RedisError, RedisResult};
use bytes::Bytes;

/// RESP protocol value
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RespValue {
    /// Simple string: +OK\r\n
    SimpleString(String),
    /// Error: -ERR message\r\n
    Error(String),
    /// Integer: :1000\r\n
    Integer(i64),
    /// Bulk string: $6\r\nfoobar\r\n
    BulkString(Bytes),
    /// Null bulk string or null array: $-1\r\n, *-1\r\n
    Null,
    /// Array: *2\r\n$3\r\nfoo\r\n$3\r\nbar\r\n
    Array(Vec<RespValue>),
}

impl RespValue {
    /// Convert to a string
    ///
    /// Integers are rendered in decimal, as the server would for `GET` on a
    /// counter.
    pub fn as_string(&self) -> RedisResult<String> {
        match self {
            Self::SimpleString(s) => Ok(s.clone()),
            Self::BulkString(b) => std::str::from_utf8(b)
                .map(str::to_string)
                .map_err(|e| RedisError::Type(format!("Invalid UTF-8: {e}"))),
            Self::Integer(i) => Ok(i.to_string()),
            Self::Null => Err(RedisError::Nil),
            _ => Err(RedisError::Type(format!(
                "Cannot convert {self:?} to string"
            ))),
        }
    }

    /// Convert to an integer
    pub fn as_int(&self) -> RedisResult<i64> {
        match self {
            Self::Integer(i) => Ok(*i),
            Self::BulkString(_) | Self::SimpleString(_) => {
                let s = self.as_string()?;
                s.parse::<i64>()
                    .map_err(|e| RedisError::Type(format!("Cannot parse integer {s:?}: {e}")))
            }
            Self::Null => Err(RedisError::Nil),
            _ => Err(RedisError::Type(format!(
                "Cannot convert {self:?} to integer"
            ))),
        }
    }

    /// Convert to a floating-point number
    pub fn as_float(&self) -> RedisResult<f64> {
        match self {
            Self::Integer(i) => Ok(*i as f64),
            Self::BulkString(_) | Self::SimpleString(_) => {
                let s = self.as_string()?;
                s.parse::<f64>()
                    .map_err(|e| RedisError::Type(format!("Cannot parse float {s:?}: {e}")))
            }
            Self::Null => Err(RedisError::Nil),
            _ => Err(RedisError::Type(format!("Cannot convert {self:?} to float"))),
        }
    }

    /// Convert to a boolean
    ///
    /// Integers are true when nonzero. Text accepts the usual spellings
    /// (`1`, `t`, `true`, `0`, `f`, `false`, case-insensitive).
    pub fn as_bool(&self) -> RedisResult<bool> {
        match self {
            Self::Integer(i) => Ok(*i != 0),
            Self::SimpleString(s) if s == "OK" => Ok(true),
            Self::BulkString(_) | Self::SimpleString(_) => {
                let s = self.as_string()?;
                parse_bool(&s)
                    .ok_or_else(|| RedisError::Type(format!("Cannot parse bool {s:?}")))
            }
            Self::Null => Err(RedisError::Nil),
            _ => Err(RedisError::Type(format!("Cannot convert {self:?} to bool"))),
        }
    }

    /// Convert to bytes
    pub fn as_bytes(&self) -> RedisResult<Bytes> {
        match self {
            Self::BulkString(b) => Ok(b.clone()),
            Self::SimpleString(s) => Ok(Bytes::copy_from_slice(s.as_bytes())),
            Self::Integer(i) => Ok(Bytes::from(i.to_string())),
            Self::Null => Err(RedisError::Nil),
            _ => Err(RedisError::Type(format!(
                "Cannot convert {self:?} to bytes"
            ))),
        }
    }

    /// Convert to an array
    pub fn as_array(&self) -> RedisResult<&[Self]> {
        match self {
            Self::Array(arr) => Ok(arr),
            Self::Null => Err(RedisError::Nil),
            _ => Err(RedisError::Type(format!(
                "Cannot convert {self:?} to array"
            ))),
        }
    }

    /// Consume into an array
    pub fn into_array(self) -> RedisResult<Vec<Self>> {
        match self {
            Self::Array(arr) => Ok(arr),
            Self::Null => Err(RedisError::Nil),
            other => Err(RedisError::Type(format!(
                "Cannot convert {other:?} to array"
            ))),
        }
    }

    /// Check if this is a null value
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Check if this is an error
    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }
}

/// Parse the boolean spellings accepted in stored text
pub fn parse_bool(s: &str) -> Option<bool> {
    match s.to_ascii_lowercase().as_str() {
        "1" | "t" | "true" => Some(true),
        "0" | "f" | "false" => Some(false),
        _ => None,
    }
}

impl From<String> for RespValue {
    fn from(s: String) -> Self {
        Self::BulkString(Bytes::from(s.into_bytes()))
    }
}

impl From<&str> for RespValue {
    fn from(s: &str) -> Self {
        Self::BulkString(Bytes::copy_from_slice(s.as_bytes()))
    }
}

impl From<&String> for RespValue {
    fn from(s: &String) -> Self {
        Self::from(s.as_str())
    }
}

impl From<i64> for RespValue {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<i32> for RespValue {
    fn from(i: i32) -> Self {
        Self::Integer(i64::from(i))
    }
}

impl From<u32> for RespValue {
    fn from(i: u32) -> Self {
        Self::Integer(i64::from(i))
    }
}

impl From<usize> for RespValue {
    fn from(i: usize) -> Self {
        Self::BulkString(Bytes::from(i.to_string()))
    }
}

impl From<f64> for RespValue {
    fn from(f: f64) -> Self {
        Self::BulkString(Bytes::from(f.to_string()))
    }
}

impl From<Vec<u8>> for RespValue {
    fn from(b: Vec<u8>) -> Self {
        Self::BulkString(Bytes::from(b))
    }
}

impl From<Bytes> for RespValue {
    fn from(b: Bytes) -> Self {
        Self::BulkString(b)
    }
}

impl TryFrom<RespValue> for String {
    type Error = RedisError;

    fn try_from(value: RespValue) -> Result<Self, Self::Error> {
        value.as_string()
    }
}

impl TryFrom<RespValue> for i64 {
    type Error = RedisError;

    fn try_from(value: RespValue) -> Result<Self, Self::Error> {
        value.as_int()
    }
}

impl TryFrom<RespValue> for i32 {
    type Error = RedisError;

    fn try_from(value: RespValue) -> Result<Self, Self::Error> {
        let wide = value.as_int()?;
        Self::try_from(wide).map_err(|e| RedisError::Type(format!("{wide} out of range: {e}")))
    }
}

impl TryFrom<RespValue> for u64 {
    type Error = RedisError;

    fn try_from(value: RespValue) -> Result<Self, Self::Error> {
        let s = value.as_string()?;
        s.parse::<Self>()
            .map_err(|e| RedisError::Type(format!("Cannot parse unsigned {s:?}: {e}")))
    }
}

impl TryFrom<RespValue> for f64 {
    type Error = RedisError;

    fn try_from(value: RespValue) -> Result<Self, Self::Error> {
        value.as_float()
    }
}

impl TryFrom<RespValue> for bool {
    type Error = RedisError;

    fn try_from(value: RespValue) -> Result<Self, Self::Error> {
        value.as_bool()
    }
}

impl TryFrom<RespValue> for Bytes {
    type Error = RedisError;

    fn try_from(value: RespValue) -> Result<Self, Self::Error> {
        value.as_bytes()
    }
}
