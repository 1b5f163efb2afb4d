//! Connection pooling
//!
//! A bounded set of live connections handed out one caller at a time.
//!
//! - The active bound is a semaphore permit carried inside every
//!   [`PooledConnection`], so the count can never drift from reality.
//! - Release happens in `Drop`; a handle cannot be returned twice.
//! - Idle connections are PING-probed before reuse and pruned by age on the
//!   next acquire. There is no background sweeper.

use crate::connection::{Connection, Connector};
use redis_cacher_core::{
    config::PoolConfig,
    error::{RedisError, RedisResult},
    value::RespValue,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tokio::sync::{OwnedSemaphorePermit, Semaphore, TryAcquireError};
use tracing::{debug, info};

struct IdleConnection {
    conn: Box<dyn Connection>,
    since: Instant,
}

struct PoolInner {
    connector: Arc<dyn Connector>,
    config: PoolConfig,
    /// Most recently returned first
    idle: Mutex<VecDeque<IdleConnection>>,
    /// `None` when `max_active` is 0
    permits: Option<Arc<Semaphore>>,
    active: AtomicUsize,
    closed: AtomicBool,
}

impl PoolInner {
    fn idle(&self) -> MutexGuard<'_, VecDeque<IdleConnection>> {
        self.idle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Pop the freshest idle connection after dropping expired ones
    fn take_idle(&self) -> Option<Box<dyn Connection>> {
        let mut idle = self.idle();
        if !self.config.idle_timeout.is_zero() {
            while idle
                .back()
                .is_some_and(|entry| entry.since.elapsed() > self.config.idle_timeout)
            {
                idle.pop_back();
                debug!("Closed connection idle for longer than {:?}", self.config.idle_timeout);
            }
        }
        idle.pop_front().map(|entry| entry.conn)
    }

    fn put_idle(&self, conn: Box<dyn Connection>) {
        let mut idle = self.idle();
        // Checked under the lock so a concurrent shutdown cannot drain the
        // list between the check and the push.
        if self.closed.load(Ordering::Acquire) {
            return;
        }
        idle.push_front(IdleConnection {
            conn,
            since: Instant::now(),
        });
        idle.truncate(self.config.max_idle);
    }
}

/// Snapshot of pool occupancy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    /// Connections currently borrowed
    pub active: usize,
    /// Connections waiting for reuse
    pub idle: usize,
}

/// Connection pool handle, cheap to clone
#[derive(Clone)]
pub struct Pool {
    inner: Arc<PoolInner>,
}

impl Pool {
    /// Create a pool; no connection is opened until the first acquire
    pub fn new(connector: Arc<dyn Connector>, config: PoolConfig) -> Self {
        let permits = (config.max_active > 0).then(|| Arc::new(Semaphore::new(config.max_active)));
        Self {
            inner: Arc::new(PoolInner {
                connector,
                idle: Mutex::new(VecDeque::with_capacity(config.max_idle)),
                config,
                permits,
                active: AtomicUsize::new(0),
                closed: AtomicBool::new(false),
            }),
        }
    }

    /// Borrow a connection
    ///
    /// Reuses the freshest idle connection that answers PING, otherwise asks
    /// the connector for a new one. When `max_active` connections are out,
    /// waits for a release (or fails with [`RedisError::PoolExhausted`] if
    /// the pool is configured not to wait).
    pub async fn acquire(&self) -> RedisResult<PooledConnection> {
        if self.is_closed() {
            return Err(RedisError::PoolClosed);
        }
        let permit = self.reserve().await?;

        while let Some(mut conn) = self.inner.take_idle() {
            match conn.ping().await {
                Ok(()) => return Ok(PooledConnection::new(self.inner.clone(), conn, permit)),
                Err(e) => debug!("Discarding idle connection that failed PING: {}", e),
            }
        }

        let conn = self.inner.connector.connect().await?;
        debug!("Opened new pooled connection");
        Ok(PooledConnection::new(self.inner.clone(), conn, permit))
    }

    async fn reserve(&self) -> RedisResult<Option<OwnedSemaphorePermit>> {
        let Some(ref permits) = self.inner.permits else {
            return Ok(None);
        };

        if self.inner.config.wait {
            permits
                .clone()
                .acquire_owned()
                .await
                .map(Some)
                .map_err(|_| RedisError::PoolClosed)
        } else {
            match permits.clone().try_acquire_owned() {
                Ok(permit) => Ok(Some(permit)),
                Err(TryAcquireError::NoPermits) => Err(RedisError::PoolExhausted),
                Err(TryAcquireError::Closed) => Err(RedisError::PoolClosed),
            }
        }
    }

    /// Close every idle connection and refuse further borrowing
    ///
    /// Callers blocked in [`acquire`](Self::acquire) are woken with
    /// [`RedisError::PoolClosed`]; connections still borrowed are closed when
    /// their handles drop. Calling this more than once has no further effect.
    pub fn shutdown(&self) {
        if self.inner.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(ref permits) = self.inner.permits {
            permits.close();
        }
        let drained = {
            let mut idle = self.inner.idle();
            let count = idle.len();
            idle.clear();
            count
        };
        info!("Connection pool shut down, closed {} idle connections", drained);
    }

    /// Whether [`shutdown`](Self::shutdown) has been called
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Current occupancy
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            active: self.inner.active.load(Ordering::Acquire),
            idle: self.inner.idle().len(),
        }
    }
}

/// A borrowed connection, returned to the pool when dropped
///
/// A connection that hit a transport error is closed instead of returned,
/// and so is one whose request future was dropped before the reply was read.
pub struct PooledConnection {
    pool: Arc<PoolInner>,
    conn: Option<Box<dyn Connection>>,
    broken: bool,
    /// Set while an exchange is in progress
    in_flight: bool,
    _permit: Option<OwnedSemaphorePermit>,
}

impl PooledConnection {
    fn new(
        pool: Arc<PoolInner>,
        conn: Box<dyn Connection>,
        permit: Option<OwnedSemaphorePermit>,
    ) -> Self {
        pool.active.fetch_add(1, Ordering::AcqRel);
        Self {
            pool,
            conn: Some(conn),
            broken: false,
            in_flight: false,
            _permit: permit,
        }
    }

    fn conn(&mut self) -> RedisResult<&mut (dyn Connection + 'static)> {
        self.conn
            .as_deref_mut()
            .ok_or_else(|| RedisError::Connection("connection already released".to_string()))
    }

    fn track<T>(&mut self, result: RedisResult<T>) -> RedisResult<T> {
        self.in_flight = false;
        if let Err(ref e) = result {
            if e.is_transport() {
                self.broken = true;
            }
        }
        result
    }

    /// Issue one request on this connection
    pub async fn request(&mut self, command: &str, args: &[RespValue]) -> RedisResult<RespValue> {
        self.in_flight = true;
        let result = self.conn()?.request(command, args).await;
        self.track(result)
    }

    /// Issue a command that blocks server-side for up to `block`
    pub async fn blocking_request(
        &mut self,
        command: &str,
        args: &[RespValue],
        block: Duration,
    ) -> RedisResult<RespValue> {
        self.in_flight = true;
        let result = self.conn()?.blocking_request(command, args, block).await;
        self.track(result)
    }

    /// Write a command without reading a reply
    pub async fn send(&mut self, command: &str, args: &[RespValue]) -> RedisResult<()> {
        self.in_flight = true;
        let result = self.conn()?.send(command, args).await;
        self.track(result)
    }

    /// Read the next pushed frame
    pub async fn receive(&mut self) -> RedisResult<RespValue> {
        self.in_flight = true;
        let result = self.conn()?.receive().await;
        self.track(result)
    }

    /// Close this connection on drop instead of returning it
    ///
    /// Used for connections left in a state no other caller can use, such as
    /// subscriber mode.
    pub fn mark_broken(&mut self) {
        self.broken = true;
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        self.pool.active.fetch_sub(1, Ordering::AcqRel);
        if let Some(conn) = self.conn.take() {
            if !self.broken && !self.in_flight {
                self.pool.put_idle(conn);
            }
        }
        // The permit is released after the connection is back in the idle
        // list, so a woken waiter finds it there.
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use tokio::time::{sleep, timeout};

    struct MockConnection {
        id: usize,
        alive: Arc<AtomicBool>,
    }

    #[async_trait]
    impl Connection for MockConnection {
        async fn request(&mut self, command: &str, _args: &[RespValue]) -> RedisResult<RespValue> {
            if !self.alive.load(Ordering::Acquire) {
                return Err(RedisError::Connection("peer gone".to_string()));
            }
            match command {
                "PING" => Ok(RespValue::SimpleString("PONG".to_string())),
                "ID" => Ok(RespValue::Integer(self.id as i64)),
                "HANG" => std::future::pending().await,
                "BOOM" => Err(RedisError::Io(std::io::Error::from(
                    std::io::ErrorKind::BrokenPipe,
                ))),
                _ => Err(RedisError::Server("ERR unknown command".to_string())),
            }
        }

        async fn send(&mut self, _command: &str, _args: &[RespValue]) -> RedisResult<()> {
            Ok(())
        }

        async fn receive(&mut self) -> RedisResult<RespValue> {
            Err(RedisError::Connection("not subscribed".to_string()))
        }
    }

    #[derive(Default)]
    struct MockConnector {
        opened: AtomicUsize,
        alive: Arc<AtomicBool>,
        fail: AtomicBool,
    }

    impl MockConnector {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                alive: Arc::new(AtomicBool::new(true)),
                ..Default::default()
            })
        }
    }

    #[async_trait]
    impl Connector for MockConnector {
        async fn connect(&self) -> RedisResult<Box<dyn Connection>> {
            if self.fail.load(Ordering::Acquire) {
                return Err(RedisError::Connection("dial refused".to_string()));
            }
            let id = self.opened.fetch_add(1, Ordering::AcqRel);
            Ok(Box::new(MockConnection {
                id,
                alive: self.alive.clone(),
            }))
        }
    }

    fn config(max_active: usize, max_idle: usize) -> PoolConfig {
        PoolConfig {
            max_active,
            max_idle,
            ..Default::default()
        }
    }

    async fn conn_id(conn: &mut PooledConnection) -> i64 {
        conn.request("ID", &[]).await.unwrap().as_int().unwrap()
    }

    #[tokio::test]
    async fn test_reuses_idle_connection() {
        let connector = MockConnector::new();
        let pool = Pool::new(connector.clone(), config(0, 3));

        let mut conn = pool.acquire().await.unwrap();
        let first = conn_id(&mut conn).await;
        drop(conn);
        assert_eq!(pool.stats(), PoolStats { active: 0, idle: 1 });

        let mut conn = pool.acquire().await.unwrap();
        assert_eq!(conn_id(&mut conn).await, first);
        assert_eq!(connector.opened.load(Ordering::Acquire), 1);
    }

    #[tokio::test]
    async fn test_max_active_blocks_until_release() {
        let pool = Pool::new(MockConnector::new(), config(2, 2));

        let first = pool.acquire().await.unwrap();
        let _second = pool.acquire().await.unwrap();
        assert_eq!(pool.stats().active, 2);

        let blocked = timeout(Duration::from_millis(50), pool.acquire()).await;
        assert!(blocked.is_err(), "third acquire must wait");

        let waiter = {
            let pool = pool.clone();
            tokio::spawn(async move { pool.acquire().await.map(|_| ()) })
        };
        sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        drop(first);
        timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter woken by release")
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_bound_holds_under_concurrency() {
        let pool = Pool::new(MockConnector::new(), config(3, 3));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut tasks = Vec::new();
        for _ in 0..20 {
            let pool = pool.clone();
            let peak = peak.clone();
            tasks.push(tokio::spawn(async move {
                let _conn = pool.acquire().await.unwrap();
                peak.fetch_max(pool.stats().active, Ordering::AcqRel);
                sleep(Duration::from_millis(5)).await;
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        assert!(peak.load(Ordering::Acquire) <= 3);
        assert_eq!(pool.stats().active, 0);
    }

    #[tokio::test]
    async fn test_fail_fast_when_not_waiting() {
        let mut cfg = config(1, 1);
        cfg.wait = false;
        let pool = Pool::new(MockConnector::new(), cfg);

        let _held = pool.acquire().await.unwrap();
        assert!(matches!(
            pool.acquire().await,
            Err(RedisError::PoolExhausted)
        ));
    }

    #[tokio::test]
    async fn test_dead_idle_connection_replaced() {
        let connector = MockConnector::new();
        let pool = Pool::new(connector.clone(), config(0, 3));

        drop(pool.acquire().await.unwrap());
        connector.alive.store(false, Ordering::Release);
        let conn = pool.acquire().await;
        connector.alive.store(true, Ordering::Release);

        // The stale connection failed PING and a fresh one was dialed.
        assert!(conn.is_ok());
        assert_eq!(connector.opened.load(Ordering::Acquire), 2);
    }

    #[tokio::test]
    async fn test_transport_error_discards_connection() {
        let connector = MockConnector::new();
        let pool = Pool::new(connector.clone(), config(0, 3));

        let mut conn = pool.acquire().await.unwrap();
        assert!(conn.request("BOOM", &[]).await.is_err());
        drop(conn);
        assert_eq!(pool.stats().idle, 0);

        let mut conn = pool.acquire().await.unwrap();
        assert!(matches!(
            conn.request("NOPE", &[]).await,
            Err(RedisError::Server(_))
        ));
        drop(conn);
        assert_eq!(pool.stats().idle, 1, "server errors keep the connection");
    }

    #[tokio::test]
    async fn test_max_idle_and_idle_timeout() {
        let connector = MockConnector::new();
        let mut cfg = config(0, 1);
        cfg.idle_timeout = Duration::from_millis(30);
        let pool = Pool::new(connector.clone(), cfg);

        let a = pool.acquire().await.unwrap();
        let b = pool.acquire().await.unwrap();
        drop(a);
        drop(b);
        assert_eq!(pool.stats().idle, 1);

        sleep(Duration::from_millis(60)).await;
        let _conn = pool.acquire().await.unwrap();
        assert_eq!(connector.opened.load(Ordering::Acquire), 3);
    }

    #[tokio::test]
    async fn test_connect_failure_releases_permit() {
        let connector = MockConnector::new();
        let pool = Pool::new(connector.clone(), config(1, 1));

        connector.fail.store(true, Ordering::Release);
        assert!(matches!(
            pool.acquire().await,
            Err(RedisError::Connection(_))
        ));
        connector.fail.store(false, Ordering::Release);

        let conn = timeout(Duration::from_millis(100), pool.acquire()).await;
        assert!(matches!(conn, Ok(Ok(_))));
    }

    #[tokio::test]
    async fn test_cancelled_request_discards_connection() {
        let connector = MockConnector::new();
        let pool = Pool::new(connector.clone(), config(0, 3));

        let mut conn = pool.acquire().await.unwrap();
        let cancelled = timeout(Duration::from_millis(20), conn.request("HANG", &[])).await;
        assert!(cancelled.is_err());
        drop(conn);
        assert_eq!(pool.stats(), PoolStats { active: 0, idle: 0 });

        let mut conn = pool.acquire().await.unwrap();
        assert_eq!(conn_id(&mut conn).await, 1);
        drop(conn);
        assert_eq!(pool.stats().idle, 1, "completed requests keep the connection");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_release_racing_shutdown_never_parks() {
        for _ in 0..50 {
            let pool = Pool::new(MockConnector::new(), config(0, 8));
            let mut held = Vec::new();
            for _ in 0..8 {
                held.push(pool.acquire().await.unwrap());
            }
            let releaser = tokio::spawn(async move { drop(held) });
            pool.shutdown();
            releaser.await.unwrap();
            assert_eq!(pool.stats(), PoolStats { active: 0, idle: 0 });
        }
    }

    #[tokio::test]
    async fn test_shutdown() {
        let pool = Pool::new(MockConnector::new(), config(1, 3));

        let held = pool.acquire().await.unwrap();
        let waiter = {
            let pool = pool.clone();
            tokio::spawn(async move { pool.acquire().await.map(|_| ()) })
        };
        sleep(Duration::from_millis(20)).await;

        pool.shutdown();
        pool.shutdown();
        assert!(matches!(waiter.await.unwrap(), Err(RedisError::PoolClosed)));
        assert!(matches!(pool.acquire().await, Err(RedisError::PoolClosed)));

        drop(held);
        assert_eq!(pool.stats(), PoolStats { active: 0, idle: 0 });
    }
}
