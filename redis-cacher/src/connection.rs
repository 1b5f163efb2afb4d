//! Connection management
//!
//! This module handles low-level sessions with the server: dialing over TCP
//! or a Unix socket, the AUTH/SELECT handshake, single request/reply
//! exchanges and the duplex send/receive used by subscriptions.
//!
//! The pool and the subscription engine only see the [`Connection`] and
//! [`Connector`] traits, so any session type can be pooled.

use crate::protocol::{RespDecoder, RespEncoder};
use async_trait::async_trait;
use bytes::{Buf, BytesMut};
use redis_cacher_core::{
    config::{Options, Transport},
    error::{RedisError, RedisResult},
    value::RespValue,
};
use std::io::Cursor;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::debug;

/// A live session with the server
#[async_trait]
pub trait Connection: Send {
    /// Send one command and read its reply
    ///
    /// Error replies are returned as [`RedisError::Server`].
    async fn request(&mut self, command: &str, args: &[RespValue]) -> RedisResult<RespValue>;

    /// Like [`request`](Self::request) for commands that block server-side
    /// for up to `block` (zero = indefinitely).
    async fn blocking_request(
        &mut self,
        command: &str,
        args: &[RespValue],
        _block: Duration,
    ) -> RedisResult<RespValue> {
        self.request(command, args).await
    }

    /// Write a command without waiting for a reply
    async fn send(&mut self, command: &str, args: &[RespValue]) -> RedisResult<()>;

    /// Wait for the next frame pushed by the server, without a deadline
    async fn receive(&mut self) -> RedisResult<RespValue>;

    /// Liveness probe run before an idle connection is reused
    ///
    /// Anything but `PONG` means the session is out of step with the server.
    async fn ping(&mut self) -> RedisResult<()> {
        match self.request("PING", &[]).await? {
            RespValue::SimpleString(ref reply) if reply == "PONG" => Ok(()),
            other => Err(RedisError::Protocol(format!(
                "unexpected PING reply: {:?}",
                other
            ))),
        }
    }
}

/// Creates new connections for the pool
#[async_trait]
pub trait Connector: Send + Sync {
    /// Open a fully initialised connection
    async fn connect(&self) -> RedisResult<Box<dyn Connection>>;
}

trait AsyncStream: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> AsyncStream for T {}

/// A connection to a Redis server
pub struct RedisConnection {
    stream: Box<dyn AsyncStream>,
    read_buffer: BytesMut,
    operation_timeout: Duration,
}

impl RedisConnection {
    /// Dial the configured address, then authenticate and select the
    /// database
    ///
    /// Every failure along the way is reported as
    /// [`RedisError::Connection`] and the half-open session is dropped.
    pub async fn connect(options: &Options) -> RedisResult<Self> {
        let stream = Self::dial(options).await?;
        let mut conn = Self {
            stream,
            read_buffer: BytesMut::with_capacity(8192),
            operation_timeout: options.operation_timeout,
        };

        if let Some(ref password) = options.password {
            conn.authenticate(password).await?;
        }
        if options.database != 0 {
            conn.select_database(options.database).await?;
        }

        Ok(conn)
    }

    async fn dial(options: &Options) -> RedisResult<Box<dyn AsyncStream>> {
        let addr = options.address.as_str();
        debug!("Connecting to Redis at {} ({})", addr, options.network);

        match options.network {
            Transport::Tcp => {
                let stream = timeout(options.connect_timeout, TcpStream::connect(addr))
                    .await
                    .map_err(|_| RedisError::Connection(format!("Timed out connecting to {addr}")))?
                    .map_err(|e| RedisError::Connection(format!("Failed to connect to {addr}: {e}")))?;
                stream.set_nodelay(true)?;

                if let Some(keepalive) = options.tcp_keepalive {
                    let params = socket2::TcpKeepalive::new().with_time(keepalive);
                    socket2::SockRef::from(&stream)
                        .set_tcp_keepalive(&params)
                        .map_err(|e| {
                            RedisError::Connection(format!("Failed to set TCP keepalive: {e}"))
                        })?;
                }
                Ok(Box::new(stream))
            }
            #[cfg(unix)]
            Transport::Unix => {
                let stream = timeout(
                    options.connect_timeout,
                    tokio::net::UnixStream::connect(addr),
                )
                .await
                .map_err(|_| RedisError::Connection(format!("Timed out connecting to {addr}")))?
                .map_err(|e| RedisError::Connection(format!("Failed to connect to {addr}: {e}")))?;
                Ok(Box::new(stream))
            }
            #[cfg(not(unix))]
            Transport::Unix => Err(RedisError::Config(
                "unix sockets are not supported on this platform".to_string(),
            )),
        }
    }

    async fn authenticate(&mut self, password: &str) -> RedisResult<()> {
        debug!("Authenticating with Redis server");
        match self.request("AUTH", &[RespValue::from(password)]).await {
            Ok(RespValue::SimpleString(ref s)) if s == "OK" => Ok(()),
            Ok(other) => Err(RedisError::Connection(format!(
                "Unexpected authentication response: {other:?}"
            ))),
            Err(e) => Err(RedisError::Connection(format!("Authentication failed: {e}"))),
        }
    }

    async fn select_database(&mut self, db: u32) -> RedisResult<()> {
        debug!("Selecting database {}", db);
        match self.request("SELECT", &[RespValue::from(db)]).await {
            Ok(RespValue::SimpleString(ref s)) if s == "OK" => Ok(()),
            Ok(other) => Err(RedisError::Connection(format!(
                "Unexpected SELECT response: {other:?}"
            ))),
            Err(e) => Err(RedisError::Connection(format!(
                "Failed to select database {db}: {e}"
            ))),
        }
    }

    async fn write_command(&mut self, command: &str, args: &[RespValue]) -> RedisResult<()> {
        let encoded = RespEncoder::encode_command(command, args)?;
        timeout(self.operation_timeout, self.stream.write_all(&encoded))
            .await
            .map_err(|_| RedisError::Timeout)??;
        Ok(())
    }

    /// Read one complete frame, buffering partial reads
    async fn read_response(&mut self) -> RedisResult<RespValue> {
        loop {
            let mut cursor = Cursor::new(&self.read_buffer[..]);
            if let Some(value) = RespDecoder::decode(&mut cursor)? {
                let consumed = cursor.position() as usize;
                self.read_buffer.advance(consumed);
                return Ok(value);
            }

            let n = self.stream.read_buf(&mut self.read_buffer).await?;
            if n == 0 {
                return Err(RedisError::Connection(
                    "Connection closed by server".to_string(),
                ));
            }
        }
    }

    async fn exchange(
        &mut self,
        command: &str,
        args: &[RespValue],
        deadline: Option<Duration>,
    ) -> RedisResult<RespValue> {
        self.write_command(command, args).await?;

        let response = match deadline {
            Some(limit) => timeout(limit, self.read_response())
                .await
                .map_err(|_| RedisError::Timeout)??,
            None => self.read_response().await?,
        };

        match response {
            RespValue::Error(msg) => Err(RedisError::Server(msg)),
            other => Ok(other),
        }
    }
}

#[async_trait]
impl Connection for RedisConnection {
    async fn request(&mut self, command: &str, args: &[RespValue]) -> RedisResult<RespValue> {
        let deadline = self.operation_timeout;
        self.exchange(command, args, Some(deadline)).await
    }

    async fn blocking_request(
        &mut self,
        command: &str,
        args: &[RespValue],
        block: Duration,
    ) -> RedisResult<RespValue> {
        // The reply may legitimately take as long as the server blocks.
        let deadline = (!block.is_zero()).then(|| block + self.operation_timeout);
        self.exchange(command, args, deadline).await
    }

    async fn send(&mut self, command: &str, args: &[RespValue]) -> RedisResult<()> {
        self.write_command(command, args).await
    }

    async fn receive(&mut self) -> RedisResult<RespValue> {
        self.read_response().await
    }
}

/// Connector dialing the address from [`Options`]
pub struct RedisConnector {
    options: Options,
}

impl RedisConnector {
    /// Create a connector for the given options
    pub fn new(options: Options) -> Self {
        Self { options }
    }

    /// Get the configuration
    pub fn options(&self) -> &Options {
        &self.options
    }
}

#[async_trait]
impl Connector for RedisConnector {
    async fn connect(&self) -> RedisResult<Box<dyn Connection>> {
        let conn = RedisConnection::connect(&self.options).await?;
        Ok(Box::new(conn))
    }
}
