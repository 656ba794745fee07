//! Bounded connection pool
//!
//! Live connections are either idle in the pool or checked out behind a
//! [`ConnectionGuard`]. Every checked-out connection holds one permit of a fair
//! semaphore sized to `max_connections`, so at capacity new callers queue and
//! are woken first-in-first-out as guards are released.
//!
//! A new connection is only opened when the idle set is empty, which keeps the
//! number of live connections at or below the permit count. Idle connections
//! past `idle_timeout_ms` are closed by a background sweep, never below
//! `min_connections`.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::{Duration, Instant};

use tokio::sync::{OwnedMutexGuard, OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::info;

use super::connection::{DatabaseConn, ExecMode, QueryOutcome};
use crate::error::{DialectError, Result};
use crate::grammar::{CompiledQuery, Value};

// =============================================================================
// Pool Configuration
// =============================================================================

/// Connection pool configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolConfig {
    /// Use a pool; when false the manager keeps a single connection
    pub enabled: bool,
    /// Maximum number of live connections
    pub max_connections: usize,
    /// Connections kept open once the pool has warmed up
    pub min_connections: usize,
    /// Idle time after which a connection may be closed, in milliseconds
    pub idle_timeout_ms: u64,
    /// Maximum time to wait for a connection, in milliseconds
    pub acquire_timeout_ms: u64,
    /// Interval between idle sweeps, in milliseconds
    pub reap_interval_ms: u64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_connections: 10,
            min_connections: 2,
            idle_timeout_ms: 30_000,    // 30 seconds
            acquire_timeout_ms: 30_000, // 30 seconds
            reap_interval_ms: 1_000,
        }
    }
}

impl PoolConfig {
    /// Create a new pool configuration with the given max connections.
    pub fn new(max_connections: usize) -> Self {
        Self {
            max_connections,
            ..Default::default()
        }
    }

    /// A configuration that disables pooling.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    pub fn min_connections(mut self, n: usize) -> Self {
        self.min_connections = n;
        self
    }

    pub fn idle_timeout(mut self, ms: u64) -> Self {
        self.idle_timeout_ms = ms;
        self
    }

    pub fn acquire_timeout(mut self, ms: u64) -> Self {
        self.acquire_timeout_ms = ms;
        self
    }

    pub fn reap_interval(mut self, ms: u64) -> Self {
        self.reap_interval_ms = ms;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_connections == 0 {
            return Err(DialectError::Config(
                "pool max_connections must be at least 1".to_string(),
            ));
        }
        if self.min_connections > self.max_connections {
            return Err(DialectError::Config(format!(
                "pool min_connections ({}) exceeds max_connections ({})",
                self.min_connections, self.max_connections
            )));
        }
        if self.reap_interval_ms == 0 {
            return Err(DialectError::Config(
                "pool reap_interval_ms must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Point-in-time pool statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStatus {
    /// Live connections, idle and checked out
    pub total: usize,
    pub idle: usize,
    pub in_use: usize,
    /// Callers suspended in `acquire`
    pub waiting: usize,
    /// Successful acquires since creation
    pub acquired: u64,
    /// Releases since creation
    pub released: u64,
}

// =============================================================================
// Connections
// =============================================================================

/// An engine connection tracked by the pool.
pub struct PooledConnection {
    id: u64,
    db: DatabaseConn,
    last_used: Instant,
}

impl PooledConnection {
    pub(crate) fn new(id: u64, db: DatabaseConn) -> Self {
        Self {
            id,
            db,
            last_used: Instant::now(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    fn check_in(&mut self) {
        self.last_used = Instant::now();
    }
}

/// Where a guard sends its connection back on release.
enum Home {
    Pool {
        pool: Arc<PoolInner>,
        _permit: OwnedSemaphorePermit,
    },
    Single(OwnedMutexGuard<Option<PooledConnection>>),
}

/// Exclusive use of one connection.
///
/// Dropping the guard releases the connection, so the release happens exactly
/// once on every exit path, including errors and cancelled futures.
pub struct ConnectionGuard {
    conn: Option<PooledConnection>,
    home: Home,
}

impl ConnectionGuard {
    pub(crate) fn single(mut slot: OwnedMutexGuard<Option<PooledConnection>>) -> Result<Self> {
        let conn = slot.take().ok_or_else(|| {
            DialectError::Internal("the single connection is no longer available".to_string())
        })?;
        Ok(Self {
            conn: Some(conn),
            home: Home::Single(slot),
        })
    }

    /// Identifier of the held connection.
    pub fn id(&self) -> Option<u64> {
        self.conn.as_ref().map(PooledConnection::id)
    }

    /// Run one statement on the held connection.
    pub async fn execute(&mut self, sql: &str, bindings: &[Value], mode: ExecMode) -> Result<QueryOutcome> {
        let sql = sql.to_string();
        let bindings = bindings.to_vec();
        self.with_connection(move |db| db.run(&sql, &bindings, mode))
            .await
    }

    /// Run several statements in one transaction on the held connection.
    pub async fn execute_batch(&mut self, statements: &[CompiledQuery], mode: ExecMode) -> Result<QueryOutcome> {
        let statements = statements.to_vec();
        self.with_connection(move |db| db.run_batch(&statements, mode))
            .await
    }

    /// Empty a table on the held connection, resetting its autoincrement counter.
    pub async fn truncate(&mut self, table: &str) -> Result<QueryOutcome> {
        let table = table.to_string();
        self.with_connection(move |db| db.truncate(&table)).await
    }

    /// Move the connection onto a blocking worker, run `f`, and take it back.
    async fn with_connection<F, T>(&mut self, f: F) -> Result<T>
    where
        F: FnOnce(&DatabaseConn) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.take().ok_or_else(|| {
            DialectError::Internal("connection was lost by an earlier statement".to_string())
        })?;

        let (conn, result) = tokio::task::spawn_blocking(move || {
            let result = f(&conn.db);
            (conn, result)
        })
        .await
        .map_err(|e| DialectError::Internal(format!("statement worker failed: {}", e)))?;

        self.conn = Some(conn);
        result
    }
}

impl Drop for ConnectionGuard {
    fn drop(&mut self) {
        let conn = self.conn.take();
        match &mut self.home {
            Home::Pool { pool, .. } => pool.give_back(conn),
            Home::Single(slot) => {
                if let Some(mut conn) = conn {
                    conn.check_in();
                    **slot = Some(conn);
                } else {
                    tracing::warn!("single connection lost; later statements will fail");
                }
            }
        }
    }
}

// =============================================================================
// Pool
// =============================================================================

#[derive(Default)]
struct PoolState {
    /// Oldest-returned at the front
    idle: VecDeque<PooledConnection>,
    /// Idle plus checked out plus being opened
    total: usize,
    warmed: bool,
    closed: bool,
}

struct PoolInner {
    path: String,
    config: PoolConfig,
    state: Mutex<PoolState>,
    permits: Arc<Semaphore>,
    next_id: AtomicU64,
    waiting: AtomicUsize,
    acquired: AtomicU64,
    released: AtomicU64,
    shutdown: CancellationToken,
}

impl PoolInner {
    fn lock(&self) -> Result<MutexGuard<'_, PoolState>> {
        self.state
            .lock()
            .map_err(|_| DialectError::Internal("pool state lock poisoned".to_string()))
    }

    /// Open a connection for a slot already counted in `total`.
    ///
    /// The caller holds a [`SlotReservation`] for that slot until the
    /// connection is handed over.
    async fn open(&self) -> Result<PooledConnection> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let path = self.path.clone();
        let opened = tokio::task::spawn_blocking(move || DatabaseConn::open_path(&path))
            .await
            .map_err(|e| DialectError::Internal(format!("connection worker failed: {}", e)))
            .and_then(|r| r);

        let db = opened?;
        info!(id, path = %self.path, "opened pooled connection");
        Ok(PooledConnection::new(id, db))
    }

    fn give_back(&self, conn: Option<PooledConnection>) {
        self.released.fetch_add(1, Ordering::Relaxed);

        let Ok(mut state) = self.lock() else {
            tracing::warn!("pool state lock poisoned; dropping returned connection");
            return;
        };

        match conn {
            Some(mut conn) if !state.closed => {
                conn.check_in();
                state.idle.push_back(conn);
            }
            Some(conn) => {
                state.total -= 1;
                drop(state);
                info!(id = conn.id, "closed connection returned after shutdown");
            }
            None => {
                state.total -= 1;
                tracing::warn!("pooled connection lost during a statement");
            }
        }
    }

    /// Close idle connections past the idle timeout, oldest first.
    fn evict_idle(&self) -> usize {
        let timeout = Duration::from_millis(self.config.idle_timeout_ms);
        let mut evicted = Vec::new();
        {
            let Ok(mut state) = self.lock() else {
                return 0;
            };
            while state.total > self.config.min_connections {
                match state.idle.front() {
                    Some(conn) if conn.last_used.elapsed() >= timeout => {}
                    _ => break,
                }
                if let Some(conn) = state.idle.pop_front() {
                    state.total -= 1;
                    evicted.push(conn);
                }
            }
        }

        for conn in &evicted {
            info!(id = conn.id, "evicted idle connection");
        }
        evicted.len()
    }
}

/// Keeps the waiting counter right even if the acquiring future is dropped.
struct WaitTicket<'a>(&'a AtomicUsize);

impl<'a> WaitTicket<'a> {
    fn new(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::Relaxed);
        Self(counter)
    }
}

impl Drop for WaitTicket<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::Relaxed);
    }
}

/// A slot counted in `total` whose connection is still being opened.
///
/// Dropping it without [`fill`](Self::fill) gives the slot back, so a failed
/// open or a cancelled acquire never leaves `total` counting a connection
/// that does not exist.
struct SlotReservation<'a> {
    inner: &'a PoolInner,
    filled: bool,
}

impl<'a> SlotReservation<'a> {
    /// Count a new slot. Call with the state lock held.
    fn reserve(inner: &'a PoolInner, state: &mut PoolState) -> Self {
        state.total += 1;
        Self {
            inner,
            filled: false,
        }
    }

    fn fill(mut self) {
        self.filled = true;
    }
}

impl Drop for SlotReservation<'_> {
    fn drop(&mut self) {
        if self.filled {
            return;
        }
        if let Ok(mut state) = self.inner.lock() {
            state.total -= 1;
        }
    }
}

/// A bounded pool of connections to one database file.
#[derive(Clone)]
pub struct Pool {
    inner: Arc<PoolInner>,
}

impl Pool {
    /// Create a pool and start its idle sweep on the current tokio runtime.
    ///
    /// No connection is opened until the first [`acquire`](Self::acquire).
    pub fn new(path: &str, config: PoolConfig) -> Result<Self> {
        config.validate()?;
        let handle = tokio::runtime::Handle::try_current().map_err(|_| {
            DialectError::Config("a connection pool must be created inside a tokio runtime".to_string())
        })?;

        let inner = Arc::new(PoolInner {
            path: path.to_string(),
            permits: Arc::new(Semaphore::new(config.max_connections)),
            config,
            state: Mutex::new(PoolState::default()),
            next_id: AtomicU64::new(0),
            waiting: AtomicUsize::new(0),
            acquired: AtomicU64::new(0),
            released: AtomicU64::new(0),
            shutdown: CancellationToken::new(),
        });

        handle.spawn(sweep_idle(Arc::downgrade(&inner)));

        info!(
            path = %path,
            max = inner.config.max_connections,
            min = inner.config.min_connections,
            idle_timeout_ms = inner.config.idle_timeout_ms,
            "created connection pool"
        );
        Ok(Pool { inner })
    }

    pub fn config(&self) -> &PoolConfig {
        &self.inner.config
    }

    /// Check out a connection, waiting in FIFO order when the pool is at capacity.
    pub async fn acquire(&self) -> Result<ConnectionGuard> {
        let inner = &self.inner;
        let timeout = Duration::from_millis(inner.config.acquire_timeout_ms);

        let permit = {
            let _ticket = WaitTicket::new(&inner.waiting);
            match tokio::time::timeout(timeout, Arc::clone(&inner.permits).acquire_owned()).await {
                Err(_) => {
                    return Err(DialectError::PoolTimeout {
                        waited_ms: inner.config.acquire_timeout_ms,
                    })
                }
                Ok(Err(_)) => return Err(DialectError::PoolClosed),
                Ok(Ok(permit)) => permit,
            }
        };

        let (reused, reservation, warm_up) = {
            let mut state = inner.lock()?;
            if state.closed {
                return Err(DialectError::PoolClosed);
            }
            let reused = state.idle.pop_back();
            let reservation = match reused {
                Some(_) => None,
                None => Some(SlotReservation::reserve(inner, &mut state)),
            };
            let warm_up = !state.warmed;
            state.warmed = true;
            (reused, reservation, warm_up)
        };

        let conn = match (reused, reservation) {
            (Some(conn), _) => conn,
            (None, reservation) => {
                let conn = inner.open().await?;
                if let Some(reservation) = reservation {
                    reservation.fill();
                }
                conn
            }
        };

        inner.acquired.fetch_add(1, Ordering::Relaxed);
        tracing::trace!(id = conn.id, "acquired connection");
        let guard = ConnectionGuard {
            conn: Some(conn),
            home: Home::Pool {
                pool: Arc::clone(inner),
                _permit: permit,
            },
        };

        // the guard already owns the connection, so cancelling here releases it
        if warm_up {
            self.warm_up().await;
        }
        Ok(guard)
    }

    /// Explicitly return a connection. Equivalent to dropping the guard.
    pub fn release(&self, guard: ConnectionGuard) {
        tracing::trace!(id = ?guard.id(), "releasing connection");
        drop(guard);
    }

    /// Open idle connections until `min_connections` are live.
    ///
    /// Each connection being opened holds a permit, so warm-up never pushes
    /// the pool past its maximum.
    async fn warm_up(&self) {
        let inner = &self.inner;
        loop {
            let Ok(permit) = Arc::clone(&inner.permits).try_acquire_owned() else {
                break;
            };
            let reservation = {
                let Ok(mut state) = inner.lock() else {
                    break;
                };
                if state.closed || state.total >= inner.config.min_connections {
                    break;
                }
                SlotReservation::reserve(inner, &mut state)
            };

            match inner.open().await {
                Ok(conn) => {
                    reservation.fill();
                    inner.give_back_idle(conn);
                }
                Err(e) => {
                    tracing::warn!(error = %e, "failed to open connection during warm-up");
                    break;
                }
            }
            drop(permit);
        }
    }

    /// Run one sweep now; returns the number of connections closed.
    pub fn evict_idle(&self) -> usize {
        self.inner.evict_idle()
    }

    pub fn status(&self) -> PoolStatus {
        let (total, idle) = match self.inner.lock() {
            Ok(state) => (state.total, state.idle.len()),
            Err(_) => (0, 0),
        };
        PoolStatus {
            total,
            idle,
            in_use: total.saturating_sub(idle),
            waiting: self.inner.waiting.load(Ordering::Relaxed),
            acquired: self.inner.acquired.load(Ordering::Relaxed),
            released: self.inner.released.load(Ordering::Relaxed),
        }
    }

    /// Stop the sweep, close idle connections and reject further acquires.
    ///
    /// Connections still checked out are closed when their guards drop.
    pub fn shutdown(&self) {
        self.inner.shutdown.cancel();
        self.inner.permits.close();

        let closed = match self.inner.lock() {
            Ok(mut state) => {
                state.closed = true;
                let idle: Vec<PooledConnection> = state.idle.drain(..).collect();
                state.total -= idle.len();
                idle.len()
            }
            Err(_) => 0,
        };
        info!(closed, path = %self.inner.path, "connection pool shut down");
    }

    pub fn is_closed(&self) -> bool {
        self.inner.lock().map(|s| s.closed).unwrap_or(true)
    }
}

impl PoolInner {
    fn give_back_idle(&self, mut conn: PooledConnection) {
        conn.check_in();
        match self.lock() {
            Ok(mut state) if !state.closed => state.idle.push_back(conn),
            Ok(mut state) => state.total -= 1,
            Err(_) => {}
        }
    }
}

async fn sweep_idle(pool: Weak<PoolInner>) {
    let (interval, token) = match pool.upgrade() {
        Some(inner) => (
            Duration::from_millis(inner.config.reap_interval_ms),
            inner.shutdown.clone(),
        ),
        None => return,
    };

    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = token.cancelled() => break,
            _ = ticker.tick() => {
                let Some(inner) = pool.upgrade() else {
                    break;
                };
                inner.evict_idle();
            }
        }
    }
}

impl Drop for PoolInner {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex as StdMutex;
    use tempfile::TempDir;

    fn db_path(dir: &TempDir) -> String {
        dir.path().join("pool.sqlite3").to_string_lossy().to_string()
    }

    async fn wait_for_waiters(pool: &Pool, n: usize) {
        while pool.status().waiting < n {
            tokio::task::yield_now().await;
        }
    }

    #[test]
    fn test_default_config() {
        let config = PoolConfig::default();
        assert!(config.enabled);
        assert_eq!(config.max_connections, 10);
        assert_eq!(config.min_connections, 2);
        assert_eq!(config.idle_timeout_ms, 30_000);
    }

    #[test]
    fn test_config_validation() {
        assert!(PoolConfig::new(0).validate().is_err());
        assert!(PoolConfig::new(2).min_connections(3).validate().is_err());
        assert!(PoolConfig::new(2).min_connections(2).validate().is_ok());
    }

    #[test]
    fn test_pool_requires_runtime() {
        let dir = tempfile::tempdir().unwrap();
        let result = Pool::new(&db_path(&dir), PoolConfig::default());
        assert!(matches!(result, Err(DialectError::Config(_))));
    }

    #[tokio::test]
    async fn test_lazy_creation_and_warm_up() {
        let dir = tempfile::tempdir().unwrap();
        let pool = Pool::new(&db_path(&dir), PoolConfig::new(5).min_connections(3)).unwrap();
        assert_eq!(pool.status().total, 0);

        let guard = pool.acquire().await.unwrap();
        let status = pool.status();
        assert_eq!(status.total, 3);
        assert_eq!(status.idle, 2);
        assert_eq!(status.in_use, 1);

        pool.release(guard);
        assert_eq!(pool.status().idle, 3);
    }

    #[tokio::test]
    async fn test_connection_ids_are_unique() {
        let dir = tempfile::tempdir().unwrap();
        let pool = Pool::new(&db_path(&dir), PoolConfig::new(3).min_connections(0)).unwrap();

        let a = pool.acquire().await.unwrap();
        let b = pool.acquire().await.unwrap();
        let c = pool.acquire().await.unwrap();
        let mut ids = vec![a.id(), b.id(), c.id()];
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), 3);
        assert!(ids.iter().all(Option::is_some));
    }

    #[tokio::test]
    async fn test_reuses_idle_connection() {
        let dir = tempfile::tempdir().unwrap();
        let pool = Pool::new(&db_path(&dir), PoolConfig::new(2).min_connections(0)).unwrap();

        let first = pool.acquire().await.unwrap();
        let id = first.id();
        pool.release(first);

        let second = pool.acquire().await.unwrap();
        assert_eq!(second.id(), id);
        assert_eq!(pool.status().total, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_waiters_are_served_fifo() {
        let dir = tempfile::tempdir().unwrap();
        let pool = Pool::new(&db_path(&dir), PoolConfig::new(1).min_connections(0)).unwrap();
        let order = Arc::new(StdMutex::new(Vec::new()));

        let held = pool.acquire().await.unwrap();

        let mut handles = Vec::new();
        for name in ["first", "second", "third"] {
            let task_pool = pool.clone();
            let order = Arc::clone(&order);
            let already_waiting = pool.status().waiting;
            handles.push(tokio::spawn(async move {
                let guard = task_pool.acquire().await.unwrap();
                order.lock().unwrap().push(name);
                tokio::time::sleep(Duration::from_millis(5)).await;
                drop(guard);
            }));
            wait_for_waiters(&pool, already_waiting + 1).await;
        }

        assert_eq!(pool.status().total, 1);
        pool.release(held);
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(*order.lock().unwrap(), vec!["first", "second", "third"]);
        assert_eq!(pool.status().total, 1);
    }

    #[tokio::test]
    async fn test_never_exceeds_max() {
        let dir = tempfile::tempdir().unwrap();
        let pool = Pool::new(&db_path(&dir), PoolConfig::new(2).min_connections(2)).unwrap();

        let a = pool.acquire().await.unwrap();
        let b = pool.acquire().await.unwrap();
        assert_eq!(pool.status().total, 2);

        let blocked = tokio::time::timeout(Duration::from_millis(50), pool.acquire()).await;
        assert!(blocked.is_err());
        assert_eq!(pool.status().total, 2);
        assert_eq!(pool.status().waiting, 0);

        drop(a);
        drop(b);
    }

    #[tokio::test]
    async fn test_acquire_timeout_leaves_pool_consistent() {
        let dir = tempfile::tempdir().unwrap();
        let config = PoolConfig::new(1).min_connections(0).acquire_timeout(30);
        let pool = Pool::new(&db_path(&dir), config).unwrap();

        let held = pool.acquire().await.unwrap();
        let err = pool.acquire().await.err();
        assert!(matches!(err, Some(DialectError::PoolTimeout { waited_ms: 30 })));

        let status = pool.status();
        assert_eq!(status.total, 1);
        assert_eq!(status.waiting, 0);

        pool.release(held);
        assert!(pool.acquire().await.is_ok());
    }

    #[tokio::test]
    async fn test_cancelled_acquire_gives_slot_back() {
        let dir = tempfile::tempdir().unwrap();
        let pool = Pool::new(&db_path(&dir), PoolConfig::new(2).min_connections(0)).unwrap();

        for _ in 0..5 {
            // either cancelled while opening, or completed and dropped at once
            let _ = tokio::time::timeout(Duration::from_micros(1), pool.acquire()).await;
            let status = pool.status();
            assert_eq!(status.in_use, 0);
            assert_eq!(status.total, status.idle);
        }

        let a = pool.acquire().await.unwrap();
        let b = pool.acquire().await.unwrap();
        let status = pool.status();
        assert_eq!(status.in_use, 2);
        assert!(status.total <= 2);
        drop((a, b));
    }

    #[tokio::test]
    async fn test_cancelled_warm_up_returns_connection() {
        let dir = tempfile::tempdir().unwrap();
        let pool = Pool::new(&db_path(&dir), PoolConfig::new(4).min_connections(3)).unwrap();

        for _ in 0..3 {
            let _ = tokio::time::timeout(Duration::from_micros(1), pool.acquire()).await;
            let status = pool.status();
            assert_eq!(status.in_use, 0);
            assert_eq!(status.total, status.idle);
        }

        let guard = pool.acquire().await.unwrap();
        assert_eq!(pool.status().in_use, 1);
        drop(guard);
        assert_eq!(pool.status().in_use, 0);
    }

    #[tokio::test]
    async fn test_idle_sweep_shrinks_to_min() {
        let dir = tempfile::tempdir().unwrap();
        let config = PoolConfig::new(3)
            .min_connections(1)
            .idle_timeout(20)
            .reap_interval(10);
        let pool = Pool::new(&db_path(&dir), config).unwrap();

        let a = pool.acquire().await.unwrap();
        let b = pool.acquire().await.unwrap();
        let c = pool.acquire().await.unwrap();
        drop((a, b, c));
        assert_eq!(pool.status().total, 3);

        tokio::time::sleep(Duration::from_millis(200)).await;
        let status = pool.status();
        assert_eq!(status.total, 1);
        assert_eq!(status.idle, 1);
    }

    #[tokio::test]
    async fn test_sweep_skips_fresh_connections() {
        let dir = tempfile::tempdir().unwrap();
        let config = PoolConfig::new(3).min_connections(0).idle_timeout(60_000);
        let pool = Pool::new(&db_path(&dir), config).unwrap();

        let a = pool.acquire().await.unwrap();
        drop(a);
        assert_eq!(pool.evict_idle(), 0);
        assert_eq!(pool.status().total, 1);
    }

    #[tokio::test]
    async fn test_shutdown_rejects_acquire() {
        let dir = tempfile::tempdir().unwrap();
        let pool = Pool::new(&db_path(&dir), PoolConfig::new(2).min_connections(0)).unwrap();

        let held = pool.acquire().await.unwrap();
        pool.shutdown();
        assert!(pool.is_closed());
        assert!(matches!(pool.acquire().await, Err(DialectError::PoolClosed)));

        drop(held);
        assert_eq!(pool.status().total, 0);
    }

    #[tokio::test]
    async fn test_guard_executes_statements() {
        let dir = tempfile::tempdir().unwrap();
        let pool = Pool::new(&db_path(&dir), PoolConfig::new(1).min_connections(0)).unwrap();

        let mut guard = pool.acquire().await.unwrap();
        guard
            .execute("create table t (id integer)", &[], ExecMode::Mutate)
            .await
            .unwrap();
        let outcome = guard
            .execute("insert into t values (?)", &[Value::from(7)], ExecMode::Mutate)
            .await
            .unwrap();
        assert_eq!(outcome.changes(), 1);

        let err = guard.execute("select * from nope", &[], ExecMode::Read).await;
        assert!(matches!(err, Err(DialectError::Query(_))));

        // the connection survives a failed statement
        let rows = guard
            .execute("select id from t", &[], ExecMode::Read)
            .await
            .unwrap();
        assert_eq!(rows.rows().len(), 1);
    }
}
