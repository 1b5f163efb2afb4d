//! Hash commands

use crate::client::Client;
use crate::codec::Storable;
use redis_cacher_core::{
    error::{RedisError, RedisResult},
    value::RespValue,
};
use serde::{de::DeserializeOwned, Serialize};

impl Client {
    /// HSET one field, returning true if the field is new
    pub async fn hset(
        &self,
        key: &str,
        field: &str,
        value: impl Into<Storable>,
    ) -> RedisResult<bool> {
        let value = self.codec().encode(value.into())?;
        self.execute("HSET", &[self.key_arg(key), RespValue::from(field), value])
            .await?
            .as_bool()
    }

    /// Raw HGET reply (`RespValue::Null` for a missing field)
    pub async fn hget(&self, key: &str, field: &str) -> RedisResult<RespValue> {
        self.execute("HGET", &[self.key_arg(key), RespValue::from(field)])
            .await
    }

    /// HGET a text field
    pub async fn hget_string(&self, key: &str, field: &str) -> RedisResult<String> {
        self.codec().decode_scalar(self.hget(key, field).await?)
    }

    /// HGET a 32-bit integer field
    pub async fn hget_int(&self, key: &str, field: &str) -> RedisResult<i32> {
        self.codec().decode_scalar(self.hget(key, field).await?)
    }

    /// HGET a 64-bit integer field
    pub async fn hget_int64(&self, key: &str, field: &str) -> RedisResult<i64> {
        self.codec().decode_scalar(self.hget(key, field).await?)
    }

    /// HGET a boolean field
    pub async fn hget_bool(&self, key: &str, field: &str) -> RedisResult<bool> {
        self.codec().decode_scalar(self.hget(key, field).await?)
    }

    /// HGET a field stored as structural text
    pub async fn hget_object<T: DeserializeOwned>(&self, key: &str, field: &str) -> RedisResult<T> {
        self.codec().decode(self.hget(key, field).await?)
    }

    /// Write every field of a record or map, then optionally set an expiry
    ///
    /// Both commands run on the same connection. If the expiry fails the
    /// fields stay written.
    pub async fn hmset<T: Serialize + ?Sized>(
        &self,
        key: &str,
        value: &T,
        expire_secs: u64,
    ) -> RedisResult<()> {
        let key = self.key_arg(key);
        let mut args = vec![key.clone()];
        args.extend(self.codec().flatten(value)?);
        if args.len() == 1 {
            // HMSET with no fields is a server error; nothing to write.
            return Ok(());
        }

        self.with_connection(move |conn| {
            Box::pin(async move {
                conn.request("HMSET", &args).await?;
                if expire_secs > 0 {
                    conn.request("EXPIRE", &[key, RespValue::from(expire_secs.to_string())])
                        .await?;
                }
                Ok::<_, RedisError>(())
            })
        })
        .await
    }

    /// Rebuild a record or map from every field of a hash
    ///
    /// A missing key is [`RedisError::Nil`].
    pub async fn hgetall<T: DeserializeOwned>(&self, key: &str) -> RedisResult<T> {
        let reply = self.execute("HGETALL", &[self.key_arg(key)]).await?;
        self.codec().unflatten(reply)
    }

    /// Delete fields, returning how many existed
    pub async fn hdel(&self, key: &str, fields: &[&str]) -> RedisResult<i64> {
        let mut args = vec![self.key_arg(key)];
        args.extend(fields.iter().map(|f| RespValue::from(*f)));
        self.execute("HDEL", &args).await?.as_int()
    }
}
