//! Configuration types for the cacher handle

use crate::error::{RedisError, RedisResult};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

/// Serializes a structural value into the bytes stored in Redis
pub type MarshalFn = Arc<dyn Fn(&serde_json::Value) -> RedisResult<Vec<u8>> + Send + Sync>;

/// Parses stored bytes back into a structural value
pub type UnmarshalFn = Arc<dyn Fn(&[u8]) -> RedisResult<serde_json::Value> + Send + Sync>;

/// Network transport used to reach the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Transport {
    /// TCP socket, address is `host:port`
    #[default]
    Tcp,
    /// Unix domain socket, address is a filesystem path
    Unix,
}

impl FromStr for Transport {
    type Err = RedisError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "tcp" | "tcp4" | "tcp6" => Ok(Self::Tcp),
            "unix" => Ok(Self::Unix),
            other => Err(RedisError::Config(format!("unknown network: {other}"))),
        }
    }
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tcp => write!(f, "tcp"),
            Self::Unix => write!(f, "unix"),
        }
    }
}

/// Configuration for connection pooling
#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Maximum number of borrowed connections at once (0 = unbounded)
    pub max_active: usize,
    /// Maximum number of idle connections kept for reuse
    pub max_idle: usize,
    /// Idle connections older than this are closed (zero = never).
    ///
    /// Should be larger than the server's own `timeout` setting.
    pub idle_timeout: Duration,
    /// Block when `max_active` is reached instead of failing with
    /// [`RedisError::PoolExhausted`]
    pub wait: bool,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_active: 0,
            max_idle: 3,
            idle_timeout: Duration::from_secs(240),
            wait: true,
        }
    }
}

/// Options accepted by `Client::configure`
#[derive(Clone)]
pub struct Options {
    /// Transport to dial
    pub network: Transport,

    /// Address (`host:port` for TCP, socket path for Unix)
    pub address: String,

    /// Optional password for AUTH
    pub password: Option<String>,

    /// Logical database selected on every new connection
    pub database: u32,

    /// Pool configuration
    pub pool: PoolConfig,

    /// Dial timeout
    pub connect_timeout: Duration,

    /// Read/write timeout for a single request
    pub operation_timeout: Duration,

    /// TCP keepalive interval
    pub tcp_keepalive: Option<Duration>,

    /// Prefix prepended to every key by the typed wrappers
    pub prefix: String,

    /// Delay between subscription attempts
    pub subscribe_retry: Duration,

    /// Override for the structural encoding step
    pub marshal: Option<MarshalFn>,

    /// Override for the structural decoding step
    pub unmarshal: Option<UnmarshalFn>,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            network: Transport::Tcp,
            address: "127.0.0.1:6379".to_string(),
            password: None,
            database: 0,
            pool: PoolConfig::default(),
            connect_timeout: Duration::from_secs(5),
            operation_timeout: Duration::from_secs(30),
            tcp_keepalive: Some(Duration::from_secs(60)),
            prefix: String::new(),
            subscribe_retry: Duration::from_secs(1),
            marshal: None,
            unmarshal: None,
        }
    }
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Options")
            .field("network", &self.network)
            .field("address", &self.address)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("database", &self.database)
            .field("pool", &self.pool)
            .field("connect_timeout", &self.connect_timeout)
            .field("operation_timeout", &self.operation_timeout)
            .field("tcp_keepalive", &self.tcp_keepalive)
            .field("prefix", &self.prefix)
            .field("subscribe_retry", &self.subscribe_retry)
            .field("marshal", &self.marshal.is_some())
            .field("unmarshal", &self.unmarshal.is_some())
            .finish()
    }
}

impl Options {
    /// Create options for the given address, `redis://` prefix allowed
    pub fn new(address: impl Into<String>) -> Self {
        let address = address.into();
        let address = address
            .strip_prefix("redis://")
            .map_or_else(|| address.clone(), str::to_string);
        Self {
            address,
            ..Default::default()
        }
    }

    /// Set the transport
    #[must_use]
    pub const fn with_network(mut self, network: Transport) -> Self {
        self.network = network;
        self
    }

    /// Set the password for authentication
    #[must_use]
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Set the database number
    #[must_use]
    pub const fn with_database(mut self, database: u32) -> Self {
        self.database = database;
        self
    }

    /// Set the pool configuration
    #[must_use]
    pub const fn with_pool_config(mut self, pool: PoolConfig) -> Self {
        self.pool = pool;
        self
    }

    /// Set the maximum number of borrowed connections (0 = unbounded)
    #[must_use]
    pub const fn with_max_active(mut self, max_active: usize) -> Self {
        self.pool.max_active = max_active;
        self
    }

    /// Set the maximum number of idle connections
    #[must_use]
    pub const fn with_max_idle(mut self, max_idle: usize) -> Self {
        self.pool.max_idle = max_idle;
        self
    }

    /// Set the idle timeout
    #[must_use]
    pub const fn with_idle_timeout(mut self, timeout: Duration) -> Self {
        self.pool.idle_timeout = timeout;
        self
    }

    /// Set the connection timeout
    #[must_use]
    pub const fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the operation timeout
    #[must_use]
    pub const fn with_operation_timeout(mut self, timeout: Duration) -> Self {
        self.operation_timeout = timeout;
        self
    }

    /// Set the key prefix
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Set the delay between subscription attempts
    #[must_use]
    pub const fn with_subscribe_retry(mut self, delay: Duration) -> Self {
        self.subscribe_retry = delay;
        self
    }

    /// Replace the structural encoder
    #[must_use]
    pub fn with_marshal<F>(mut self, marshal: F) -> Self
    where
        F: Fn(&serde_json::Value) -> RedisResult<Vec<u8>> + Send + Sync + 'static,
    {
        self.marshal = Some(Arc::new(marshal));
        self
    }

    /// Replace the structural decoder
    #[must_use]
    pub fn with_unmarshal<F>(mut self, unmarshal: F) -> Self
    where
        F: Fn(&[u8]) -> RedisResult<serde_json::Value> + Send + Sync + 'static,
    {
        self.unmarshal = Some(Arc::new(unmarshal));
        self
    }

    /// Check the options before a handle is built
    pub fn validate(&self) -> RedisResult<()> {
        if self.address.trim().is_empty() {
            return Err(RedisError::Config("address must not be empty".to_string()));
        }
        if self.network == Transport::Tcp && !self.address.contains(':') {
            return Err(RedisError::Config(format!(
                "tcp address must be host:port, got {}",
                self.address
            )));
        }
        if self.subscribe_retry.is_zero() {
            return Err(RedisError::Config(
                "subscribe retry interval must be nonzero".to_string(),
            ));
        }
        Ok(())
    }
}
