//! Core types and traits for the redis-cacher client
//!
//! This crate provides the configuration, error, reply and geo types shared
//! by the pool, codec, executor and subscription engine.

#![warn(missing_docs)]
#![allow(clippy::missing_errors_doc)]

pub mod config;
pub mod error;
pub mod types;
pub mod value;

pub use config::{MarshalFn, Options, PoolConfig, Transport, UnmarshalFn};
pub use error::{RedisError, RedisResult};
pub use types::{GeoLocation, GeoOptions, GeoSort, GeoUnit};
pub use value::RespValue;
