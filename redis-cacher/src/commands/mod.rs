//! Typed command wrappers
//!
//! Every wrapper prefixes its keys, encodes values through the client's
//! codec, runs one command through [`Client::execute`] and converts the
//! reply. They carry no state of their own.
//!
//! Scalar accessors (`get_string`, `get_int`, ...) read values stored
//! verbatim; `*_object` accessors read values stored as structural text.
//! Nothing in the stored bytes says which was used, so read a value back
//! with the accessor matching how it was written.

pub mod geo;
pub mod hash;
pub mod list;
pub mod sorted_set;

use crate::client::Client;
use crate::codec::Storable;
use redis_cacher_core::{error::RedisResult, value::RespValue};
use serde::{de::DeserializeOwned, Serialize};

impl Client {
    pub(crate) fn key_arg(&self, key: &str) -> RespValue {
        RespValue::from(self.key(key))
    }

    /// Raw GET reply (`RespValue::Null` for a missing key)
    pub async fn get(&self, key: &str) -> RedisResult<RespValue> {
        self.execute("GET", &[self.key_arg(key)]).await
    }

    /// GET a text value
    pub async fn get_string(&self, key: &str) -> RedisResult<String> {
        self.codec().decode_scalar(self.get(key).await?)
    }

    /// GET a 32-bit integer
    pub async fn get_int(&self, key: &str) -> RedisResult<i32> {
        self.codec().decode_scalar(self.get(key).await?)
    }

    /// GET a 64-bit integer
    pub async fn get_int64(&self, key: &str) -> RedisResult<i64> {
        self.codec().decode_scalar(self.get(key).await?)
    }

    /// GET a boolean
    pub async fn get_bool(&self, key: &str) -> RedisResult<bool> {
        self.codec().decode_scalar(self.get(key).await?)
    }

    /// GET a floating-point number
    pub async fn get_float(&self, key: &str) -> RedisResult<f64> {
        self.codec().decode_scalar(self.get(key).await?)
    }

    /// GET a value stored with [`set_object`](Self::set_object)
    pub async fn get_object<T: DeserializeOwned>(&self, key: &str) -> RedisResult<T> {
        self.codec().decode(self.get(key).await?)
    }

    /// SET a value, with SETEX semantics when `expire_secs > 0`
    pub async fn set(
        &self,
        key: &str,
        value: impl Into<Storable>,
        expire_secs: u64,
    ) -> RedisResult<()> {
        let value = self.codec().encode(value.into())?;
        self.store(key, value, expire_secs).await
    }

    /// SET any serializable value through the composite path
    pub async fn set_object<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        expire_secs: u64,
    ) -> RedisResult<()> {
        let value = self.codec().encode_composite(value)?;
        self.store(key, value, expire_secs).await
    }

    async fn store(&self, key: &str, value: RespValue, expire_secs: u64) -> RedisResult<()> {
        let key = self.key_arg(key);
        if expire_secs > 0 {
            self.execute("SETEX", &[key, RespValue::from(expire_secs.to_string()), value])
                .await?;
        } else {
            self.execute("SET", &[key, value]).await?;
        }
        Ok(())
    }

    /// Whether the key exists
    pub async fn exists(&self, key: &str) -> RedisResult<bool> {
        self.execute("EXISTS", &[self.key_arg(key)]).await?.as_bool()
    }

    /// Delete keys, returning how many existed
    pub async fn del(&self, keys: &[&str]) -> RedisResult<i64> {
        let args: Vec<RespValue> = keys.iter().map(|k| self.key_arg(k)).collect();
        self.execute("DEL", &args).await?.as_int()
    }

    /// Remaining time to live in seconds (-1 without expiry, -2 if missing)
    pub async fn ttl(&self, key: &str) -> RedisResult<i64> {
        self.execute("TTL", &[self.key_arg(key)]).await?.as_int()
    }

    /// Set a key's time to live, returning false if the key is missing
    pub async fn expire(&self, key: &str, secs: u64) -> RedisResult<bool> {
        self.execute(
            "EXPIRE",
            &[self.key_arg(key), RespValue::from(secs.to_string())],
        )
        .await?
        .as_bool()
    }

    /// Increment by one
    pub async fn incr(&self, key: &str) -> RedisResult<i64> {
        self.execute("INCR", &[self.key_arg(key)]).await?.as_int()
    }

    /// Increment by `delta`
    pub async fn incr_by(&self, key: &str, delta: i64) -> RedisResult<i64> {
        self.execute("INCRBY", &[self.key_arg(key), RespValue::Integer(delta)])
            .await?
            .as_int()
    }

    /// Decrement by one
    pub async fn decr(&self, key: &str) -> RedisResult<i64> {
        self.execute("DECR", &[self.key_arg(key)]).await?.as_int()
    }

    /// Decrement by `delta`
    pub async fn decr_by(&self, key: &str, delta: i64) -> RedisResult<i64> {
        self.execute("DECRBY", &[self.key_arg(key), RespValue::Integer(delta)])
            .await?
            .as_int()
    }
}
