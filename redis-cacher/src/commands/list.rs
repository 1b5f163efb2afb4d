//! List commands

use crate::client::Client;
use crate::codec::Storable;
use redis_cacher_core::{
    error::{RedisError, RedisResult},
    value::RespValue,
};
use std::time::Duration;

impl Client {
    /// LPUSH one value, returning the new length
    pub async fn lpush(&self, key: &str, value: impl Into<Storable>) -> RedisResult<i64> {
        let value = self.codec().encode(value.into())?;
        self.execute("LPUSH", &[self.key_arg(key), value]).await?.as_int()
    }

    /// RPUSH one value, returning the new length
    pub async fn rpush(&self, key: &str, value: impl Into<Storable>) -> RedisResult<i64> {
        let value = self.codec().encode(value.into())?;
        self.execute("RPUSH", &[self.key_arg(key), value]).await?.as_int()
    }

    /// LPOP a scalar; an empty list is [`RedisError::Nil`]
    pub async fn lpop<T>(&self, key: &str) -> RedisResult<T>
    where
        T: TryFrom<RespValue, Error = RedisError>,
    {
        let reply = self.execute("LPOP", &[self.key_arg(key)]).await?;
        self.codec().decode_scalar(reply)
    }

    /// RPOP a scalar; an empty list is [`RedisError::Nil`]
    pub async fn rpop<T>(&self, key: &str) -> RedisResult<T>
    where
        T: TryFrom<RespValue, Error = RedisError>,
    {
        let reply = self.execute("RPOP", &[self.key_arg(key)]).await?;
        self.codec().decode_scalar(reply)
    }

    /// Blocking LPOP across `keys`
    ///
    /// Waits up to `timeout_secs` (0 = forever) and returns the unprefixed
    /// key that yielded along with the value, or `None` on timeout. The
    /// pooled connection stays borrowed for the whole wait.
    pub async fn blpop(
        &self,
        keys: &[&str],
        timeout_secs: u64,
    ) -> RedisResult<Option<(String, RespValue)>> {
        self.blocking_pop("BLPOP", keys, timeout_secs).await
    }

    /// Blocking RPOP across `keys`; see [`blpop`](Self::blpop)
    pub async fn brpop(
        &self,
        keys: &[&str],
        timeout_secs: u64,
    ) -> RedisResult<Option<(String, RespValue)>> {
        self.blocking_pop("BRPOP", keys, timeout_secs).await
    }

    async fn blocking_pop(
        &self,
        command: &str,
        keys: &[&str],
        timeout_secs: u64,
    ) -> RedisResult<Option<(String, RespValue)>> {
        let mut args: Vec<RespValue> = keys.iter().map(|k| self.key_arg(k)).collect();
        args.push(RespValue::from(timeout_secs.to_string()));

        let reply = self
            .execute_blocking(command, &args, Duration::from_secs(timeout_secs))
            .await?;
        if reply.is_null() {
            return Ok(None);
        }

        let mut pair = reply.into_array()?;
        if pair.len() != 2 {
            return Err(RedisError::Protocol(format!(
                "{command} reply has {} elements",
                pair.len()
            )));
        }
        let value = pair.pop().unwrap_or(RespValue::Null);
        let key = pair.pop().unwrap_or(RespValue::Null).as_string()?;
        let key = match key.strip_prefix(self.options().prefix.as_str()) {
            Some(stripped) => stripped.to_string(),
            None => key,
        };
        Ok(Some((key, value)))
    }

    /// LLEN
    pub async fn llen(&self, key: &str) -> RedisResult<i64> {
        self.execute("LLEN", &[self.key_arg(key)]).await?.as_int()
    }

    /// LRANGE, converting every element to `T`
    pub async fn lrange<T>(&self, key: &str, start: i64, stop: i64) -> RedisResult<Vec<T>>
    where
        T: TryFrom<RespValue, Error = RedisError>,
    {
        self.execute(
            "LRANGE",
            &[
                self.key_arg(key),
                RespValue::Integer(start),
                RespValue::Integer(stop),
            ],
        )
        .await?
        .into_array()?
        .into_iter()
        .map(T::try_from)
        .collect()
    }
}
