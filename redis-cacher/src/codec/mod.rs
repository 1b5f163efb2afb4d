//! Value codec
//!
//! Every value written through the typed API is a [`Storable`]: either a
//! [`Scalar`] stored in its native text form, or a composite serialized to
//! structural text (JSON unless overridden). Nothing tags the stored bytes,
//! so readers pick the matching accessor: [`Codec::decode_scalar`] for
//! scalars, [`Codec::decode`] for composites.

mod fields;

use redis_cacher_core::{
    config::{MarshalFn, Options, UnmarshalFn},
    error::{RedisError, RedisResult},
    value::RespValue,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// A primitive value stored verbatim
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    /// Text
    Text(String),
    /// Signed integer of any width
    Int(i64),
    /// Unsigned integer too wide for `Int`
    UInt(u64),
    /// Floating-point number of any width
    Float(f64),
    /// Boolean, stored as `1` / `0`
    Bool(bool),
}

impl Scalar {
    fn into_wire(self) -> RespValue {
        match self {
            Self::Text(s) => RespValue::from(s),
            Self::Int(i) => RespValue::Integer(i),
            Self::UInt(u) => RespValue::from(u.to_string()),
            Self::Float(f) => RespValue::from(f),
            Self::Bool(b) => RespValue::from(if b { "1" } else { "0" }),
        }
    }
}

/// A value on its way into the store
#[derive(Debug, Clone, PartialEq)]
pub enum Storable {
    /// Stored verbatim
    Scalar(Scalar),
    /// Stored as structural text
    Composite(serde_json::Value),
}

impl Storable {
    /// Capture a composite value
    pub fn composite<T: Serialize + ?Sized>(value: &T) -> RedisResult<Self> {
        serde_json::to_value(value)
            .map(Self::Composite)
            .map_err(|e| RedisError::Serialization(e.to_string()))
    }

    /// Classify an already structural value: strings, numbers and booleans
    /// become scalars, everything else stays composite
    pub fn from_json(value: serde_json::Value) -> Self {
        use serde_json::Value;

        match value {
            Value::String(s) => Self::Scalar(Scalar::Text(s)),
            Value::Bool(b) => Self::Scalar(Scalar::Bool(b)),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Self::Scalar(Scalar::Int(i))
                } else if let Some(u) = n.as_u64() {
                    Self::Scalar(Scalar::UInt(u))
                } else {
                    Self::Scalar(Scalar::Float(n.as_f64().unwrap_or(f64::NAN)))
                }
            }
            other => Self::Composite(other),
        }
    }
}

macro_rules! impl_scalar_from {
    ($variant:ident => $($ty:ty),+) => {
        $(
            impl From<$ty> for Storable {
                fn from(value: $ty) -> Self {
                    Self::Scalar(Scalar::$variant(value.into()))
                }
            }
        )+
    };
}

impl_scalar_from!(Text => String, &str, &String);
impl_scalar_from!(Int => i8, i16, i32, i64, u8, u16, u32);
impl_scalar_from!(UInt => u64);
impl_scalar_from!(Float => f32, f64);
impl_scalar_from!(Bool => bool);

impl From<isize> for Storable {
    fn from(value: isize) -> Self {
        Self::Scalar(Scalar::Int(value as i64))
    }
}

impl From<usize> for Storable {
    fn from(value: usize) -> Self {
        Self::Scalar(Scalar::UInt(value as u64))
    }
}

impl From<Scalar> for Storable {
    fn from(value: Scalar) -> Self {
        Self::Scalar(value)
    }
}

fn json_marshal(value: &serde_json::Value) -> RedisResult<Vec<u8>> {
    serde_json::to_vec(value).map_err(|e| RedisError::Serialization(e.to_string()))
}

fn json_unmarshal(bytes: &[u8]) -> RedisResult<serde_json::Value> {
    serde_json::from_slice(bytes).map_err(|e| RedisError::Deserialization(e.to_string()))
}

/// Encoder and decoder for stored values
#[derive(Clone)]
pub struct Codec {
    marshal: MarshalFn,
    unmarshal: UnmarshalFn,
}

impl fmt::Debug for Codec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Codec").finish_non_exhaustive()
    }
}

impl Default for Codec {
    fn default() -> Self {
        Self::new(None, None)
    }
}

impl Codec {
    /// Build a codec, falling back to JSON for any missing hook
    pub fn new(marshal: Option<MarshalFn>, unmarshal: Option<UnmarshalFn>) -> Self {
        Self {
            marshal: marshal.unwrap_or_else(|| Arc::new(json_marshal) as MarshalFn),
            unmarshal: unmarshal.unwrap_or_else(|| Arc::new(json_unmarshal) as UnmarshalFn),
        }
    }

    /// Build the codec described by the options' override hooks
    pub fn from_options(options: &Options) -> Self {
        Self::new(options.marshal.clone(), options.unmarshal.clone())
    }

    /// Produce the wire form of a value
    pub fn encode(&self, value: Storable) -> RedisResult<RespValue> {
        match value {
            Storable::Scalar(scalar) => Ok(scalar.into_wire()),
            Storable::Composite(structure) => (self.marshal)(&structure).map(RespValue::from),
        }
    }

    /// Serialize any value through the composite path
    pub fn encode_composite<T: Serialize + ?Sized>(&self, value: &T) -> RedisResult<RespValue> {
        self.encode(Storable::composite(value)?)
    }

    /// Rebuild a composite value from its stored text
    pub fn decode<T: DeserializeOwned>(&self, reply: RespValue) -> RedisResult<T> {
        let bytes = reply.as_bytes()?;
        let structure = (self.unmarshal)(&bytes)?;
        serde_json::from_value(structure).map_err(|e| RedisError::Deserialization(e.to_string()))
    }

    /// Read a scalar stored verbatim
    pub fn decode_scalar<T>(&self, reply: RespValue) -> RedisResult<T>
    where
        T: TryFrom<RespValue, Error = RedisError>,
    {
        if reply.is_null() {
            return Err(RedisError::Nil);
        }
        T::try_from(reply)
    }

    /// Flatten a record or map into `field value ...` arguments
    ///
    /// Each field is encoded with the same scalar/composite rule as a whole
    /// value. `null` fields are skipped so they read back as absent.
    pub fn flatten<T: Serialize + ?Sized>(&self, value: &T) -> RedisResult<Vec<RespValue>> {
        let structure =
            serde_json::to_value(value).map_err(|e| RedisError::Serialization(e.to_string()))?;
        let serde_json::Value::Object(map) = structure else {
            return Err(RedisError::Serialization(
                "hash fields require a record or a map".to_string(),
            ));
        };

        let mut args = Vec::with_capacity(map.len() * 2);
        for (field, value) in map {
            if value.is_null() {
                continue;
            }
            args.push(RespValue::from(field));
            args.push(self.encode(Storable::from_json(value))?);
        }
        Ok(args)
    }

    /// Rebuild a record from a `field value ...` reply
    ///
    /// Scalar fields are parsed from their text form; nested fields go
    /// through the structural decoder. An empty reply (missing key) is
    /// [`RedisError::Nil`].
    pub fn unflatten<T: DeserializeOwned>(&self, reply: RespValue) -> RedisResult<T> {
        let items = reply.into_array()?;
        if items.is_empty() {
            return Err(RedisError::Nil);
        }
        if items.len() % 2 != 0 {
            return Err(RedisError::Protocol(format!(
                "field/value reply has odd length {}",
                items.len()
            )));
        }

        let mut pairs = Vec::with_capacity(items.len() / 2);
        let mut iter = items.into_iter();
        while let (Some(field), Some(value)) = (iter.next(), iter.next()) {
            pairs.push((field.as_string()?, value.as_string()?));
        }
        fields::from_pairs(pairs, &self.unmarshal)
    }
}
