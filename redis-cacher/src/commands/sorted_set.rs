//! Sorted set commands

use crate::client::Client;
use crate::codec::Storable;
use redis_cacher_core::{
    error::{RedisError, RedisResult},
    value::RespValue,
};

/// Pair up a `member score member score ...` reply
fn with_scores(reply: RespValue) -> RedisResult<Vec<(String, f64)>> {
    let items = reply.into_array()?;
    if items.len() % 2 != 0 {
        return Err(RedisError::Protocol(format!(
            "member/score reply has odd length {}",
            items.len()
        )));
    }
    items
        .chunks_exact(2)
        .map(|pair| Ok((pair[0].as_string()?, pair[1].as_float()?)))
        .collect()
}

fn strings(reply: RespValue) -> RedisResult<Vec<String>> {
    reply
        .into_array()?
        .into_iter()
        .map(String::try_from)
        .collect()
}

/// Render a score bound; infinities use the server's spelling
fn bound(score: f64) -> RespValue {
    if score == f64::INFINITY {
        RespValue::from("+inf")
    } else if score == f64::NEG_INFINITY {
        RespValue::from("-inf")
    } else {
        RespValue::from(score)
    }
}

impl Client {
    /// ZADD one member, returning the number of new members
    pub async fn zadd(
        &self,
        key: &str,
        score: f64,
        member: impl Into<Storable>,
    ) -> RedisResult<i64> {
        let member = self.codec().encode(member.into())?;
        self.execute("ZADD", &[self.key_arg(key), RespValue::from(score), member])
            .await?
            .as_int()
    }

    /// ZREM members, returning how many were removed
    pub async fn zrem(&self, key: &str, members: &[&str]) -> RedisResult<i64> {
        let mut args = vec![self.key_arg(key)];
        args.extend(members.iter().map(|m| RespValue::from(*m)));
        self.execute("ZREM", &args).await?.as_int()
    }

    /// ZSCORE; a missing member is [`RedisError::Nil`]
    pub async fn zscore(&self, key: &str, member: &str) -> RedisResult<f64> {
        self.execute("ZSCORE", &[self.key_arg(key), RespValue::from(member)])
            .await?
            .as_float()
    }

    /// ZRANK, lowest score first; a missing member is [`RedisError::Nil`]
    pub async fn zrank(&self, key: &str, member: &str) -> RedisResult<i64> {
        self.execute("ZRANK", &[self.key_arg(key), RespValue::from(member)])
            .await?
            .as_int()
    }

    /// ZREVRANK, highest score first; a missing member is [`RedisError::Nil`]
    pub async fn zrevrank(&self, key: &str, member: &str) -> RedisResult<i64> {
        self.execute("ZREVRANK", &[self.key_arg(key), RespValue::from(member)])
            .await?
            .as_int()
    }

    /// ZRANGE by index
    pub async fn zrange(&self, key: &str, start: i64, stop: i64) -> RedisResult<Vec<String>> {
        let reply = self
            .execute(
                "ZRANGE",
                &[
                    self.key_arg(key),
                    RespValue::Integer(start),
                    RespValue::Integer(stop),
                ],
            )
            .await?;
        strings(reply)
    }

    /// ZREVRANGE by index
    pub async fn zrevrange(&self, key: &str, start: i64, stop: i64) -> RedisResult<Vec<String>> {
        let reply = self
            .execute(
                "ZREVRANGE",
                &[
                    self.key_arg(key),
                    RespValue::Integer(start),
                    RespValue::Integer(stop),
                ],
            )
            .await?;
        strings(reply)
    }

    /// Members with `min <= score <= max`, lowest first, with their scores
    ///
    /// `limit` is `(offset, count)`.
    pub async fn zrange_by_score(
        &self,
        key: &str,
        min: f64,
        max: f64,
        limit: Option<(i64, i64)>,
    ) -> RedisResult<Vec<(String, f64)>> {
        self.by_score("ZRANGEBYSCORE", key, bound(min), bound(max), limit)
            .await
    }

    /// Members with `min <= score <= max`, highest first, with their scores
    pub async fn zrevrange_by_score(
        &self,
        key: &str,
        max: f64,
        min: f64,
        limit: Option<(i64, i64)>,
    ) -> RedisResult<Vec<(String, f64)>> {
        self.by_score("ZREVRANGEBYSCORE", key, bound(max), bound(min), limit)
            .await
    }

    async fn by_score(
        &self,
        command: &str,
        key: &str,
        from: RespValue,
        to: RespValue,
        limit: Option<(i64, i64)>,
    ) -> RedisResult<Vec<(String, f64)>> {
        let mut args = vec![self.key_arg(key), from, to, RespValue::from("WITHSCORES")];
        if let Some((offset, count)) = limit {
            args.push(RespValue::from("LIMIT"));
            args.push(RespValue::Integer(offset));
            args.push(RespValue::Integer(count));
        }
        with_scores(self.execute(command, &args).await?)
    }

    /// ZCARD
    pub async fn zcard(&self, key: &str) -> RedisResult<i64> {
        self.execute("ZCARD", &[self.key_arg(key)]).await?.as_int()
    }
}
