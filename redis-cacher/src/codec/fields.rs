//! Deserializing records out of hash field/value pairs
//!
//! Every hash value comes back as text. Scalar fields are parsed from that
//! text according to the type the target asks for; sequences, maps and
//! nested records are handed to the structural decoder.

use redis_cacher_core::{
    config::UnmarshalFn,
    error::{RedisError, RedisResult},
    value::parse_bool,
};
use serde::de::{self, value::MapDeserializer, DeserializeOwned, IntoDeserializer, Visitor};
use serde::{forward_to_deserialize_any, Deserializer as _};

type Error = de::value::Error;

pub(super) fn from_pairs<T: DeserializeOwned>(
    pairs: Vec<(String, String)>,
    unmarshal: &UnmarshalFn,
) -> RedisResult<T> {
    let entries = pairs.into_iter().map(|(field, text)| {
        (
            field,
            FieldValue {
                text,
                unmarshal,
            },
        )
    });
    T::deserialize(MapDeserializer::<_, Error>::new(entries))
        .map_err(|e| RedisError::Deserialization(e.to_string()))
}

struct FieldValue<'a> {
    text: String,
    unmarshal: &'a UnmarshalFn,
}

impl FieldValue<'_> {
    fn parse<N: std::str::FromStr>(&self, expected: &str) -> Result<N, Error> {
        self.text.trim().parse::<N>().map_err(|_| {
            de::Error::invalid_value(de::Unexpected::Str(&self.text), &expected)
        })
    }

    fn structure(&self) -> Result<serde_json::Value, Error> {
        (self.unmarshal)(self.text.as_bytes()).map_err(de::Error::custom)
    }
}

impl<'de, 'a> IntoDeserializer<'de, Error> for FieldValue<'a> {
    type Deserializer = Self;

    fn into_deserializer(self) -> Self {
        self
    }
}

macro_rules! parse_as {
    ($($method:ident => $ty:ty, $visit:ident, $expected:literal;)+) => {
        $(
            fn $method<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
                visitor.$visit(self.parse::<$ty>($expected)?)
            }
        )+
    };
}

macro_rules! via_structure {
    ($($method:ident($($arg:ident: $ty:ty),*);)+) => {
        $(
            fn $method<V: Visitor<'de>>(self, $($arg: $ty,)* visitor: V) -> Result<V::Value, Error> {
                de::Deserializer::$method(self.structure()?, $($arg,)* visitor)
                    .map_err(de::Error::custom)
            }
        )+
    };
}

impl<'de, 'a> de::Deserializer<'de> for FieldValue<'a> {
    type Error = Error;

    fn deserialize_any<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        visitor.visit_string(self.text)
    }

    fn deserialize_bool<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        match parse_bool(self.text.trim()) {
            Some(b) => visitor.visit_bool(b),
            None => Err(de::Error::invalid_value(
                de::Unexpected::Str(&self.text),
                &"a boolean",
            )),
        }
    }

    parse_as! {
        deserialize_i8 => i64, visit_i64, "an integer";
        deserialize_i16 => i64, visit_i64, "an integer";
        deserialize_i32 => i64, visit_i64, "an integer";
        deserialize_i64 => i64, visit_i64, "an integer";
        deserialize_u8 => u64, visit_u64, "an unsigned integer";
        deserialize_u16 => u64, visit_u64, "an unsigned integer";
        deserialize_u32 => u64, visit_u64, "an unsigned integer";
        deserialize_u64 => u64, visit_u64, "an unsigned integer";
        deserialize_f32 => f64, visit_f64, "a number";
        deserialize_f64 => f64, visit_f64, "a number";
    }

    fn deserialize_option<V: Visitor<'de>>(self, visitor: V) -> Result<V::Value, Error> {
        visitor.visit_some(self)
    }

    fn deserialize_newtype_struct<V: Visitor<'de>>(
        self,
        _name: &'static str,
        visitor: V,
    ) -> Result<V::Value, Error> {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        name: &'static str,
        variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value, Error> {
        if self.text.starts_with('{') {
            de::Deserializer::deserialize_enum(self.structure()?, name, variants, visitor)
                .map_err(de::Error::custom)
        } else {
            self.text.into_deserializer().deserialize_enum(name, variants, visitor)
        }
    }

    via_structure! {
        deserialize_seq();
        deserialize_map();
        deserialize_tuple(len: usize);
        deserialize_tuple_struct(name: &'static str, len: usize);
        deserialize_struct(name: &'static str, fields: &'static [&'static str]);
    }

    forward_to_deserialize_any! {
        char str string bytes byte_buf unit unit_struct identifier ignored_any
    }
}
