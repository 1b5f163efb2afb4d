//! Decoding of geospatial replies
//!
//! A radius query returns one element per member, but the element's shape
//! depends on which `WITH*` flags were sent: a bare name when none were,
//! otherwise an array holding the name followed by the distance, the hash
//! and the `[longitude, latitude]` pair, each present only if requested and
//! always in that order. The decoder walks the element by position driven
//! by the same [`GeoOptions`] used to build the query.

use redis_cacher_core::{
    error::{RedisError, RedisResult},
    types::{GeoLocation, GeoOptions},
    value::RespValue,
};

fn shape_error(what: impl std::fmt::Display) -> RedisError {
    RedisError::Protocol(format!("unexpected geo reply shape: {what}"))
}

fn float_at(value: &RespValue, field: &str) -> RedisResult<f64> {
    value
        .as_float()
        .map_err(|e| shape_error(format_args!("{field}: {e}")))
}

fn coordinates(value: &RespValue) -> RedisResult<(f64, f64)> {
    match value.as_array() {
        Ok([lon, lat]) => Ok((float_at(lon, "longitude")?, float_at(lat, "latitude")?)),
        Ok(other) => Err(shape_error(format_args!(
            "coordinate pair has {} elements",
            other.len()
        ))),
        Err(e) => Err(shape_error(format_args!("coordinates: {e}"))),
    }
}

fn decode_element(element: RespValue, options: &GeoOptions) -> RedisResult<GeoLocation> {
    if !options.has_fields() {
        let name = element
            .as_string()
            .map_err(|e| shape_error(format_args!("name: {e}")))?;
        return Ok(GeoLocation {
            name,
            ..GeoLocation::default()
        });
    }

    let parts = match element {
        RespValue::Array(parts) => parts,
        other => return Err(shape_error(format_args!("expected array, got {other:?}"))),
    };
    if parts.len() != options.element_len() {
        return Err(shape_error(format_args!(
            "expected {} positions, got {}",
            options.element_len(),
            parts.len()
        )));
    }

    let mut parts = parts.iter();
    let mut location = GeoLocation::default();

    // Length was checked above, so every `next` below yields a value.
    if let Some(name) = parts.next() {
        location.name = name
            .as_string()
            .map_err(|e| shape_error(format_args!("name: {e}")))?;
    }
    if options.with_dist {
        if let Some(dist) = parts.next() {
            location.distance = float_at(dist, "distance")?;
        }
    }
    if options.with_hash {
        if let Some(hash) = parts.next() {
            location.hash = hash
                .as_int()
                .map_err(|e| shape_error(format_args!("hash: {e}")))?;
        }
    }
    if options.with_coord {
        if let Some(coord) = parts.next() {
            (location.longitude, location.latitude) = coordinates(coord)?;
        }
    }

    Ok(location)
}

/// Decode a GEORADIUS / GEORADIUSBYMEMBER reply
///
/// `options` must be the set the query was issued with. Null elements
/// decode to `None`.
pub fn decode_geo_reply(
    reply: RespValue,
    options: &GeoOptions,
) -> RedisResult<Vec<Option<GeoLocation>>> {
    let elements = match reply {
        RespValue::Array(elements) => elements,
        RespValue::Null => return Ok(Vec::new()),
        other => return Err(shape_error(format_args!("expected array, got {other:?}"))),
    };

    elements
        .into_iter()
        .map(|element| match element {
            RespValue::Null => Ok(None),
            element => decode_element(element, options).map(Some),
        })
        .collect()
}

/// Decode a GEOPOS reply into `(longitude, latitude)` pairs
///
/// Members that do not exist come back as `None`.
pub fn decode_geo_positions(reply: RespValue) -> RedisResult<Vec<Option<(f64, f64)>>> {
    let elements = match reply {
        RespValue::Array(elements) => elements,
        other => return Err(shape_error(format_args!("expected array, got {other:?}"))),
    };

    elements
        .iter()
        .map(|element| match element {
            RespValue::Null => Ok(None),
            element => coordinates(element).map(Some),
        })
        .collect()
}
