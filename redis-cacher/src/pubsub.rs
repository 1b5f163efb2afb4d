//! Self-healing publish/subscribe
//!
//! [`spawn_subscription`] starts a supervisor task that borrows a dedicated
//! connection from the pool, sends `SUBSCRIBE` for the channel set and then
//! reads pushed frames until the connection fails. On any failure it waits
//! the configured retry interval and subscribes again with the same
//! channels, forever. Callers only get a read-only [`Subscription`] handle.
//!
//! Every delivered message is handed to the handler on its own task, so a
//! handler may run concurrently with itself and must be `Send + Sync`.
//! Ordering between messages is not preserved once they reach the handler.
//!
//! ```no_run
//! use redis_cacher::{Client, Message, Options};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let client = Client::configure(Options::new("127.0.0.1:6379"))?;
//! let subscription = client
//!     .subscribe(&["news"], |message: Message| async move {
//!         println!("{}: {:?}", message.channel, message.payload);
//!     })?;
//! subscription.wait_active().await?;
//! # Ok(())
//! # }
//! ```

use crate::pool::{Pool, PooledConnection};
use async_trait::async_trait;
use bytes::Bytes;
use redis_cacher_core::{
    error::{RedisError, RedisResult},
    value::RespValue,
};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// A message received on a subscribed channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Channel the message was published to
    pub channel: String,
    /// Raw payload
    pub payload: Bytes,
}

impl Message {
    /// Payload as UTF-8 text
    pub fn payload_str(&self) -> RedisResult<&str> {
        std::str::from_utf8(&self.payload)
            .map_err(|e| RedisError::Type(format!("Invalid UTF-8 payload: {e}")))
    }
}

/// Liveness of a subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionState {
    /// No connection; waiting to retry (or stopped after pool shutdown)
    Disconnected,
    /// Connection borrowed, `SUBSCRIBE` sent, confirmation pending
    Subscribing,
    /// Confirmed and receiving
    Active,
}

/// Callback invoked for every delivered message
///
/// Implemented for any `Fn(Message) -> impl Future<Output = ()>` closure.
#[async_trait]
pub trait MessageHandler: Send + Sync + 'static {
    /// Handle one message
    async fn handle(&self, message: Message);
}

#[async_trait]
impl<F, Fut> MessageHandler for F
where
    F: Fn(Message) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    async fn handle(&self, message: Message) {
        (self)(message).await;
    }
}

/// Read-only view of a running subscription
#[derive(Debug, Clone)]
pub struct Subscription {
    channels: Arc<[String]>,
    state: watch::Receiver<SubscriptionState>,
    reconnects: Arc<AtomicU64>,
}

impl Subscription {
    /// Channels this subscription listens on
    pub fn channels(&self) -> &[String] {
        &self.channels
    }

    /// Current state
    pub fn state(&self) -> SubscriptionState {
        *self.state.borrow()
    }

    /// How many retry attempts the engine has made
    ///
    /// Counts every retry after a failure, whether an established
    /// subscription was lost or the connection never came up.
    pub fn reconnects(&self) -> u64 {
        self.reconnects.load(Ordering::Acquire)
    }

    /// Wait until the subscription is confirmed by the server
    ///
    /// Fails with [`RedisError::PoolClosed`] if the engine stopped because
    /// the pool was shut down.
    pub async fn wait_active(&self) -> RedisResult<()> {
        let mut state = self.state.clone();
        loop {
            if *state.borrow_and_update() == SubscriptionState::Active {
                return Ok(());
            }
            state.changed().await.map_err(|_| RedisError::PoolClosed)?;
        }
    }
}

/// A classified pushed frame
enum Push {
    Message(Message),
    Confirmation {
        kind: String,
        channel: String,
        count: i64,
    },
}

fn classify(frame: RespValue) -> RedisResult<Push> {
    let parts = match frame {
        RespValue::Array(parts) if parts.len() == 3 => parts,
        other => {
            return Err(RedisError::Protocol(format!(
                "unexpected frame on subscribed connection: {other:?}"
            )))
        }
    };

    let kind = parts[0].as_string()?;
    match kind.as_str() {
        "message" => Ok(Push::Message(Message {
            channel: parts[1].as_string()?,
            payload: parts[2].as_bytes()?,
        })),
        "subscribe" | "unsubscribe" => Ok(Push::Confirmation {
            channel: parts[1].as_string()?,
            count: parts[2].as_int()?,
            kind,
        }),
        _ => Err(RedisError::Protocol(format!(
            "unexpected push kind {kind:?}"
        ))),
    }
}

struct Engine {
    pool: Pool,
    channels: Arc<[String]>,
    handler: Arc<dyn MessageHandler>,
    retry: Duration,
    state: watch::Sender<SubscriptionState>,
    reconnects: Arc<AtomicU64>,
}

impl Engine {
    async fn run(self) {
        loop {
            self.state.send_replace(SubscriptionState::Subscribing);
            let error = match self.open().await {
                Ok(conn) => self.listen(conn).await,
                Err(e) => e,
            };
            self.state.send_replace(SubscriptionState::Disconnected);

            if matches!(error, RedisError::PoolClosed) {
                info!("Subscription to {:?} stopped, pool shut down", self.channels);
                return;
            }
            warn!(
                "Subscription to {:?} lost: {}; retrying in {:?}",
                self.channels, error, self.retry
            );
            tokio::time::sleep(self.retry).await;
            self.reconnects.fetch_add(1, Ordering::AcqRel);
        }
    }

    async fn open(&self) -> RedisResult<PooledConnection> {
        let mut conn = self.pool.acquire().await?;
        // Subscriber mode cannot serve ordinary requests again.
        conn.mark_broken();

        let args: Vec<RespValue> = self.channels.iter().map(RespValue::from).collect();
        conn.send("SUBSCRIBE", &args).await?;
        Ok(conn)
    }

    /// Read until the connection fails, returning the failure
    async fn listen(&self, mut conn: PooledConnection) -> RedisError {
        loop {
            let push = match conn.receive().await.and_then(classify) {
                Ok(push) => push,
                Err(e) => return e,
            };

            match push {
                Push::Message(message) => {
                    let handler = self.handler.clone();
                    tokio::spawn(async move {
                        handler.handle(message).await;
                    });
                }
                Push::Confirmation {
                    kind,
                    channel,
                    count,
                } => {
                    debug!("{} {} ({} active)", kind, channel, count);
                    if kind == "subscribe" {
                        self.state.send_replace(SubscriptionState::Active);
                    }
                }
            }
        }
    }
}

/// Start a subscription engine on `pool`
///
/// Returns immediately; the first connection attempt happens on the
/// spawned task. An empty channel list is rejected.
pub fn spawn_subscription<H: MessageHandler>(
    pool: Pool,
    channels: Vec<String>,
    handler: H,
    retry: Duration,
) -> RedisResult<Subscription> {
    if channels.is_empty() {
        return Err(RedisError::Config(
            "subscribe requires at least one channel".to_string(),
        ));
    }

    let channels: Arc<[String]> = channels.into();
    let (state, receiver) = watch::channel(SubscriptionState::Disconnected);
    let reconnects = Arc::new(AtomicU64::new(0));

    let engine = Engine {
        pool,
        channels: channels.clone(),
        handler: Arc::new(handler),
        retry,
        state,
        reconnects: reconnects.clone(),
    };
    tokio::spawn(engine.run());

    Ok(Subscription {
        channels,
        state: receiver,
        reconnects,
    })
}
