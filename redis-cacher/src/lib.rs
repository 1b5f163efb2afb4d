//! Typed async Redis facade for Rust
//!
//! `redis-cacher` hides connection management behind a cloneable [`Client`]
//! and gives typed access to strings, counters, hashes, lists, sorted sets
//! and geospatial sets.
//!
//! # Features
//!
//! - Bounded connection pool with PING validation, idle pruning and explicit
//!   shutdown
//! - Value codec storing scalars verbatim and serializing composites to JSON
//!   (or a custom format)
//! - Publish/subscribe that re-subscribes on its own after connection loss
//! - Geospatial radius queries decoded into records
//! - Async/await support with Tokio
//!
//! # Quick Start
//!
//! ```no_run
//! use redis_cacher::{Client, Options};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Serialize, Deserialize)]
//! struct User {
//!     name: String,
//!     age: u32,
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = Client::configure(Options::new("redis://localhost:6379"))?;
//!
//!     client.set("visits", 42, 0).await?;
//!     let visits = client.get_int64("visits").await?;
//!
//!     let user = User { name: "ann".into(), age: 23 };
//!     client.set_object("user:1", &user, 3600).await?;
//!     let back: User = client.get_object("user:1").await?;
//!     println!("{visits} visits, user {}", back.name);
//!
//!     client.shutdown();
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_const_for_fn)]
#![allow(clippy::uninlined_format_args)]
#![allow(clippy::future_not_send)]
#![allow(clippy::doc_markdown)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::return_self_not_must_use)]

pub mod client;
pub mod codec;
pub mod commands;
pub mod connection;
pub mod geo;
pub mod pool;
pub mod protocol;
pub mod pubsub;

pub use client::Client;
pub use codec::{Codec, Scalar, Storable};
pub use connection::{Connection, Connector, RedisConnection, RedisConnector};
pub use pool::{Pool, PoolStats, PooledConnection};
pub use pubsub::{Message, MessageHandler, Subscription, SubscriptionState};

pub use redis_cacher_core::{
    config::{MarshalFn, Options, PoolConfig, Transport, UnmarshalFn},
    error::{RedisError, RedisResult},
    types::{GeoLocation, GeoOptions, GeoSort, GeoUnit},
    value::RespValue,
};
