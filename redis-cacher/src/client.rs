//! High-level Redis client
//!
//! This module provides the main `Client` handle. Typed command wrappers
//! live in [`crate::commands`] as further `impl Client` blocks; everything
//! here is the plumbing they share.

use crate::codec::{Codec, Storable};
use crate::connection::{Connector, RedisConnector};
use crate::pool::{Pool, PoolStats, PooledConnection};
use crate::pubsub::{spawn_subscription, MessageHandler, Subscription};
use futures_util::future::BoxFuture;
use redis_cacher_core::{
    config::Options,
    error::RedisResult,
    value::RespValue,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// High-level Redis client
///
/// Cheap to clone; clones share one connection pool. Nothing connects until
/// the first command, and nothing is torn down until
/// [`shutdown`](Self::shutdown) is called.
#[derive(Clone)]
pub struct Client {
    pool: Pool,
    codec: Codec,
    options: Arc<Options>,
}

impl Client {
    /// Build a client from validated options
    ///
    /// # Example
    ///
    /// ```no_run
    /// use redis_cacher::{Client, Options};
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let client = Client::configure(Options::new("127.0.0.1:6379").with_prefix("app_"))?;
    ///     client.set("greeting", "hello", 60).await?;
    ///     assert_eq!(client.get_string("greeting").await?, "hello");
    ///     client.shutdown();
    ///     Ok(())
    /// }
    /// ```
    pub fn configure(options: Options) -> RedisResult<Self> {
        options.validate()?;
        let connector = Arc::new(RedisConnector::new(options.clone()));
        Ok(Self::with_connector(options, connector))
    }

    /// Build a client over a custom connector
    ///
    /// Options are used for the pool, codec, prefix and retry settings; the
    /// connector decides how sessions are opened.
    pub fn with_connector(options: Options, connector: Arc<dyn Connector>) -> Self {
        info!(
            "Configured Redis client for {} ({}), max_active={}, max_idle={}",
            options.address, options.network, options.pool.max_active, options.pool.max_idle
        );
        Self {
            pool: Pool::new(connector, options.pool.clone()),
            codec: Codec::from_options(&options),
            options: Arc::new(options),
        }
    }

    /// Get the configuration
    pub fn options(&self) -> &Options {
        &self.options
    }

    /// The value codec in use
    pub fn codec(&self) -> &Codec {
        &self.codec
    }

    /// Apply the configured prefix to a key
    pub fn key(&self, key: &str) -> String {
        if self.options.prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}{}", self.options.prefix, key)
        }
    }

    /// Run one command on a pooled connection
    ///
    /// Keys in `args` are sent as given; use [`key`](Self::key) to apply the
    /// prefix.
    pub async fn execute(&self, command: &str, args: &[RespValue]) -> RedisResult<RespValue> {
        let mut conn = self.pool.acquire().await?;
        debug!("Executing {} with {} args", command, args.len());
        conn.request(command, args).await
    }

    /// Run a command that blocks server-side for up to `block`
    ///
    /// The connection stays borrowed for the whole wait. A zero `block`
    /// waits indefinitely.
    pub async fn execute_blocking(
        &self,
        command: &str,
        args: &[RespValue],
        block: Duration,
    ) -> RedisResult<RespValue> {
        let mut conn = self.pool.acquire().await?;
        debug!("Executing blocking {} for up to {:?}", command, block);
        conn.blocking_request(command, args, block).await
    }

    /// Borrow one connection for the duration of the returned future
    ///
    /// Several requests issued through the handle run on the same session.
    /// Nothing is rolled back if a later request fails.
    pub async fn with_connection<T, F>(&self, f: F) -> RedisResult<T>
    where
        F: for<'c> FnOnce(&'c mut PooledConnection) -> BoxFuture<'c, RedisResult<T>>,
    {
        let mut conn = self.pool.acquire().await?;
        f(&mut conn).await
    }

    /// Borrow a connection directly; it is returned when dropped
    pub async fn connection(&self) -> RedisResult<PooledConnection> {
        self.pool.acquire().await
    }

    /// Publish a message, returning the number of receiving subscribers
    ///
    /// The message goes through the codec like any stored value.
    pub async fn publish(&self, channel: &str, message: impl Into<Storable>) -> RedisResult<i64> {
        let payload = self.codec.encode(message.into())?;
        self.execute("PUBLISH", &[RespValue::from(channel), payload])
            .await?
            .as_int()
    }

    /// Subscribe `handler` to `channels`
    ///
    /// Returns once the engine is started; use
    /// [`Subscription::wait_active`] to wait for the server's confirmation.
    /// The subscription survives connection loss, retrying every
    /// `subscribe_retry`. Channel names are not prefixed.
    pub fn subscribe<H: MessageHandler>(
        &self,
        channels: &[&str],
        handler: H,
    ) -> RedisResult<Subscription> {
        let channels = channels.iter().map(|c| c.to_string()).collect();
        spawn_subscription(
            self.pool.clone(),
            channels,
            handler,
            self.options.subscribe_retry,
        )
    }

    /// Close idle connections and refuse further commands
    ///
    /// Commands in flight finish; their connections are closed on release.
    /// Running subscriptions stop at their next reconnect.
    pub fn shutdown(&self) {
        self.pool.shutdown();
    }

    /// Whether [`shutdown`](Self::shutdown) has been called
    pub fn is_closed(&self) -> bool {
        self.pool.is_closed()
    }

    /// Current pool occupancy
    pub fn pool_stats(&self) -> PoolStats {
        self.pool.stats()
    }
}
