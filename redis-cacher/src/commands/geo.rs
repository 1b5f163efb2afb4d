//! Geospatial commands

use crate::client::Client;
use crate::geo::{decode_geo_positions, decode_geo_reply};
use redis_cacher_core::{
    error::RedisResult,
    types::{GeoLocation, GeoOptions, GeoUnit},
    value::RespValue,
};

impl Client {
    /// GEOADD one member, returning the number of new members
    pub async fn geo_add(
        &self,
        key: &str,
        longitude: f64,
        latitude: f64,
        member: &str,
    ) -> RedisResult<i64> {
        self.execute(
            "GEOADD",
            &[
                self.key_arg(key),
                RespValue::from(longitude),
                RespValue::from(latitude),
                RespValue::from(member),
            ],
        )
        .await?
        .as_int()
    }

    /// GEOPOS, `None` for members that do not exist
    pub async fn geo_pos(
        &self,
        key: &str,
        members: &[&str],
    ) -> RedisResult<Vec<Option<(f64, f64)>>> {
        let mut args = vec![self.key_arg(key)];
        args.extend(members.iter().map(|m| RespValue::from(*m)));
        decode_geo_positions(self.execute("GEOPOS", &args).await?)
    }

    /// GEODIST, `None` if either member does not exist
    pub async fn geo_dist(
        &self,
        key: &str,
        member1: &str,
        member2: &str,
        unit: GeoUnit,
    ) -> RedisResult<Option<f64>> {
        let reply = self
            .execute(
                "GEODIST",
                &[
                    self.key_arg(key),
                    RespValue::from(member1),
                    RespValue::from(member2),
                    RespValue::from(unit.as_str()),
                ],
            )
            .await?;
        if reply.is_null() {
            return Ok(None);
        }
        reply.as_float().map(Some)
    }

    /// GEOHASH, `None` for members that do not exist
    pub async fn geo_hash(&self, key: &str, members: &[&str]) -> RedisResult<Vec<Option<String>>> {
        let mut args = vec![self.key_arg(key)];
        args.extend(members.iter().map(|m| RespValue::from(*m)));
        self.execute("GEOHASH", &args)
            .await?
            .into_array()?
            .into_iter()
            .map(|hash| {
                if hash.is_null() {
                    Ok(None)
                } else {
                    hash.as_string().map(Some)
                }
            })
            .collect()
    }

    /// Members within `radius` of a point
    ///
    /// Fields of each [`GeoLocation`] not requested in `options` stay zero.
    /// A null element in the reply stays in place as `None`.
    pub async fn geo_radius(
        &self,
        key: &str,
        longitude: f64,
        latitude: f64,
        radius: f64,
        options: &GeoOptions,
    ) -> RedisResult<Vec<Option<GeoLocation>>> {
        let mut args = vec![
            self.key_arg(key),
            RespValue::from(longitude),
            RespValue::from(latitude),
            RespValue::from(radius),
            RespValue::from(options.unit.as_str()),
        ];
        args.extend(options.args());
        let reply = self.execute("GEORADIUS", &args).await?;
        decode_geo_reply(reply, options)
    }

    /// Members within `radius` of an existing member
    pub async fn geo_radius_by_member(
        &self,
        key: &str,
        member: &str,
        radius: f64,
        options: &GeoOptions,
    ) -> RedisResult<Vec<Option<GeoLocation>>> {
        let mut args = vec![
            self.key_arg(key),
            RespValue::from(member),
            RespValue::from(radius),
            RespValue::from(options.unit.as_str()),
        ];
        args.extend(options.args());
        let reply = self.execute("GEORADIUSBYMEMBER", &args).await?;
        decode_geo_reply(reply, options)
    }
}
