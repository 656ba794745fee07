//! Connection manager
//!
//! [`ConnectionManager`] is the single entry point for running SQL. It is
//! initialized explicitly, cloned cheaply between tasks, and shut down
//! explicitly. Depending on configuration it is backed by:
//!
//! - nothing at all (no database configured): every operation is a no-op
//! - one long-lived connection shared by all callers
//! - a bounded [`Pool`]

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tracing::info;

use super::connection::{DatabaseConn, ExecMode, QueryOutcome};
use super::pool::{ConnectionGuard, Pool, PoolConfig, PoolStatus, PooledConnection};
use crate::config::DialectConfig;
use crate::error::{DialectError, Result};
use crate::grammar::{CompiledQuery, Value};

/// Where the database lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// Database file path, or `:memory:`
    pub filename: String,
}

impl ConnectionConfig {
    pub fn new(filename: impl Into<String>) -> Self {
        Self {
            filename: filename.into(),
        }
    }
}

enum Backend {
    Disabled,
    Single {
        slot: Arc<Mutex<Option<PooledConnection>>>,
        acquire_timeout_ms: u64,
    },
    Pooled(Pool),
}

/// Runs statements against the configured database.
#[derive(Clone)]
pub struct ConnectionManager {
    backend: Arc<Backend>,
}

impl ConnectionManager {
    /// Set up the manager.
    ///
    /// Without a connection config the manager is disabled and every later
    /// call succeeds without touching a database. With pooling disabled one
    /// connection is opened immediately; otherwise the pool opens connections
    /// on demand.
    pub async fn initialize(
        connection: Option<ConnectionConfig>,
        pool: Option<PoolConfig>,
    ) -> Result<Self> {
        let Some(connection) = connection else {
            tracing::warn!("no database configured; connection manager is disabled");
            return Ok(Self {
                backend: Arc::new(Backend::Disabled),
            });
        };

        let pool = pool.unwrap_or_default();
        pool.validate()?;

        let backend = if pool.enabled {
            Backend::Pooled(Pool::new(&connection.filename, pool)?)
        } else {
            let filename = connection.filename.clone();
            let db = tokio::task::spawn_blocking(move || DatabaseConn::open_path(&filename))
                .await
                .map_err(|e| DialectError::Internal(format!("connection worker failed: {}", e)))??;
            info!(path = %connection.filename, "opened single connection");
            Backend::Single {
                slot: Arc::new(Mutex::new(Some(PooledConnection::new(1, db)))),
                acquire_timeout_ms: pool.acquire_timeout_ms,
            }
        };

        Ok(Self {
            backend: Arc::new(backend),
        })
    }

    /// Build a manager from loaded configuration.
    pub async fn from_config(config: &DialectConfig) -> Result<Self> {
        Self::initialize(config.connection_config(), Some(config.pool_config())).await
    }

    /// False when no database was configured.
    pub fn is_enabled(&self) -> bool {
        !matches!(*self.backend, Backend::Disabled)
    }

    /// Whether statements share one connection instead of a pool.
    pub fn is_single(&self) -> bool {
        matches!(*self.backend, Backend::Single { .. })
    }

    /// Check out a connection; `None` when the manager is disabled.
    pub async fn acquire(&self) -> Result<Option<ConnectionGuard>> {
        match &*self.backend {
            Backend::Disabled => Ok(None),
            Backend::Pooled(pool) => pool.acquire().await.map(Some),
            Backend::Single {
                slot,
                acquire_timeout_ms,
            } => {
                let timeout = Duration::from_millis(*acquire_timeout_ms);
                let guard = tokio::time::timeout(timeout, Arc::clone(slot).lock_owned())
                    .await
                    .map_err(|_| DialectError::PoolTimeout {
                        waited_ms: *acquire_timeout_ms,
                    })?;
                if guard.is_none() {
                    return Err(DialectError::PoolClosed);
                }
                ConnectionGuard::single(guard).map(Some)
            }
        }
    }

    /// Return a connection. Dropping the guard has the same effect.
    pub fn release(&self, guard: ConnectionGuard) {
        match &*self.backend {
            Backend::Pooled(pool) => pool.release(guard),
            _ => drop(guard),
        }
    }

    /// Run one statement and report its outcome.
    pub async fn execute(&self, sql: &str, bindings: &[Value], mode: ExecMode) -> Result<QueryOutcome> {
        let Some(mut guard) = self.acquire().await? else {
            tracing::warn!(sql, "connection manager disabled; statement skipped");
            return Ok(QueryOutcome::Disabled);
        };

        let result = guard.execute(sql, bindings, mode).await;
        self.release(guard);
        if let Err(e) = &result {
            tracing::debug!(sql, error = %e, "statement failed");
        }
        result
    }

    pub async fn execute_compiled(&self, query: &CompiledQuery, mode: ExecMode) -> Result<QueryOutcome> {
        self.execute(&query.sql, &query.bindings, mode).await
    }

    /// Run statements in order on one connection inside a transaction.
    pub async fn execute_batch(&self, statements: &[CompiledQuery], mode: ExecMode) -> Result<QueryOutcome> {
        let Some(mut guard) = self.acquire().await? else {
            tracing::warn!(
                count = statements.len(),
                "connection manager disabled; batch skipped"
            );
            return Ok(QueryOutcome::Disabled);
        };

        let result = guard.execute_batch(statements, mode).await;
        self.release(guard);
        result
    }

    /// Delete every row of `table` and reset its autoincrement counter.
    pub async fn truncate(&self, table: &str) -> Result<QueryOutcome> {
        let Some(mut guard) = self.acquire().await? else {
            tracing::warn!(table, "connection manager disabled; truncate skipped");
            return Ok(QueryOutcome::Disabled);
        };

        let result = guard.truncate(table).await;
        self.release(guard);
        result
    }

    pub fn status(&self) -> PoolStatus {
        match &*self.backend {
            Backend::Disabled => PoolStatus::default(),
            Backend::Pooled(pool) => pool.status(),
            Backend::Single { slot, .. } => match slot.try_lock() {
                Ok(conn) if conn.is_some() => PoolStatus {
                    total: 1,
                    idle: 1,
                    ..Default::default()
                },
                Ok(_) => PoolStatus::default(),
                Err(_) => PoolStatus {
                    total: 1,
                    in_use: 1,
                    ..Default::default()
                },
            },
        }
    }

    /// Close connections and reject further acquires.
    pub async fn shutdown(&self) {
        match &*self.backend {
            Backend::Disabled => {}
            Backend::Pooled(pool) => pool.shutdown(),
            Backend::Single { slot, .. } => {
                if slot.lock().await.take().is_some() {
                    info!("closed single connection");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::{Blueprint, Record, SqliteGrammar, SqliteSchemaGrammar};
    use tempfile::TempDir;

    fn file_config(dir: &TempDir) -> ConnectionConfig {
        ConnectionConfig::new(dir.path().join("manager.sqlite3").to_string_lossy())
    }

    async fn create_users(manager: &ConnectionManager) {
        let mut table = Blueprint::new("users");
        table.create();
        table.increments("id");
        table.string("name", None);
        let statements: Vec<CompiledQuery> = table
            .to_sql(&SqliteSchemaGrammar::new())
            .unwrap()
            .into_iter()
            .map(CompiledQuery::raw)
            .collect();
        manager
            .execute_batch(&statements, ExecMode::Mutate)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_disabled_manager_is_a_no_op() {
        let manager = ConnectionManager::initialize(None, None).await.unwrap();
        assert!(!manager.is_enabled());
        assert!(manager.acquire().await.unwrap().is_none());

        let outcome = manager
            .execute("select 1", &[], ExecMode::Read)
            .await
            .unwrap();
        assert_eq!(outcome, QueryOutcome::Disabled);
        assert_eq!(manager.status(), PoolStatus::default());
        manager.shutdown().await;
    }

    #[tokio::test]
    async fn test_invalid_pool_config_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let result =
            ConnectionManager::initialize(Some(file_config(&dir)), Some(PoolConfig::new(0))).await;
        assert!(matches!(result, Err(DialectError::Config(_))));
    }

    #[tokio::test]
    async fn test_pooled_insert_and_select() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ConnectionManager::initialize(Some(file_config(&dir)), None)
            .await
            .unwrap();
        assert!(manager.is_enabled());
        create_users(&manager).await;

        let insert = SqliteGrammar::new().compile_insert(
            "users",
            &[
                Record::new().with("name", "ada"),
                Record::new().with("name", "brian"),
            ],
        );
        let outcome = manager
            .execute_compiled(&insert, ExecMode::Mutate)
            .await
            .unwrap();
        assert_eq!(outcome.changes(), 2);
        assert_eq!(outcome.insert_id(), Some(2));

        let rows = manager
            .execute(
                "select name from users where id = ?",
                &[Value::from(1)],
                ExecMode::Read,
            )
            .await
            .unwrap();
        assert_eq!(rows.rows()[0].get("name"), Some(&Value::from("ada")));

        let status = manager.status();
        assert_eq!(status.in_use, 0);
        assert_eq!(status.acquired, status.released);
        manager.shutdown().await;
    }

    #[tokio::test]
    async fn test_failed_statement_releases_connection() {
        let dir = tempfile::tempdir().unwrap();
        let pool = PoolConfig::new(1).min_connections(0).acquire_timeout(100);
        let manager = ConnectionManager::initialize(Some(file_config(&dir)), Some(pool))
            .await
            .unwrap();

        for _ in 0..3 {
            let err = manager
                .execute("insert into missing values (1)", &[], ExecMode::Mutate)
                .await;
            assert!(matches!(err, Err(DialectError::Query(_))));
        }

        let status = manager.status();
        assert_eq!(status.in_use, 0);
        assert_eq!(status.acquired, 3);
        assert_eq!(status.released, 3);
        assert!(manager.execute("select 1", &[], ExecMode::Read).await.is_ok());
    }

    #[tokio::test]
    async fn test_truncate_resets_autoincrement() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ConnectionManager::initialize(Some(file_config(&dir)), None)
            .await
            .unwrap();
        create_users(&manager).await;

        let grammar = SqliteGrammar::new();
        let insert = grammar.compile_insert("users", &[Record::new().with("name", "ada")]);
        manager
            .execute_compiled(&insert, ExecMode::Mutate)
            .await
            .unwrap();

        manager
            .execute_batch(&grammar.compile_truncate("users"), ExecMode::Mutate)
            .await
            .unwrap();

        let outcome = manager
            .execute_compiled(&insert, ExecMode::Mutate)
            .await
            .unwrap();
        assert_eq!(outcome.insert_id(), Some(1));
    }

    #[tokio::test]
    async fn test_truncate_plain_table() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ConnectionManager::initialize(Some(file_config(&dir)), None)
            .await
            .unwrap();
        manager
            .execute("create table t (id integer)", &[], ExecMode::Mutate)
            .await
            .unwrap();
        manager
            .execute("insert into t values (?)", &[Value::from(1)], ExecMode::Mutate)
            .await
            .unwrap();

        manager.truncate("t").await.unwrap();

        let rows = manager
            .execute("select * from t", &[], ExecMode::Read)
            .await
            .unwrap();
        assert!(rows.rows().is_empty());
        assert_eq!(manager.status().in_use, 0);
    }

    #[tokio::test]
    async fn test_truncate_autoincrement_table() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ConnectionManager::initialize(Some(file_config(&dir)), None)
            .await
            .unwrap();
        create_users(&manager).await;

        let insert =
            SqliteGrammar::new().compile_insert("users", &[Record::new().with("name", "ada")]);
        for _ in 0..3 {
            manager
                .execute_compiled(&insert, ExecMode::Mutate)
                .await
                .unwrap();
        }

        let outcome = manager.truncate("users").await.unwrap();
        assert_eq!(outcome.changes(), 3);

        let outcome = manager
            .execute_compiled(&insert, ExecMode::Mutate)
            .await
            .unwrap();
        assert_eq!(outcome.insert_id(), Some(1));
    }

    #[tokio::test]
    async fn test_truncate_when_disabled() {
        let manager = ConnectionManager::initialize(None, None).await.unwrap();
        assert_eq!(manager.truncate("t").await.unwrap(), QueryOutcome::Disabled);
    }

    #[tokio::test]
    async fn test_single_connection_mode() {
        let dir = tempfile::tempdir().unwrap();
        let manager =
            ConnectionManager::initialize(Some(file_config(&dir)), Some(PoolConfig::disabled()))
                .await
                .unwrap();
        assert!(manager.is_single());
        assert_eq!(manager.status().total, 1);

        let first = manager.acquire().await.unwrap().unwrap();
        let id = first.id();
        assert_eq!(manager.status().in_use, 1);
        manager.release(first);

        let second = manager.acquire().await.unwrap().unwrap();
        assert_eq!(second.id(), id);
        drop(second);

        create_users(&manager).await;
        let journal = manager
            .execute("pragma journal_mode", &[], ExecMode::Read)
            .await
            .unwrap();
        assert_eq!(
            journal.rows()[0].get("journal_mode"),
            Some(&Value::from("wal"))
        );

        manager.shutdown().await;
        assert!(matches!(manager.acquire().await, Err(DialectError::PoolClosed)));
    }

    #[tokio::test]
    async fn test_single_connection_timeout() {
        let dir = tempfile::tempdir().unwrap();
        let pool = PoolConfig::disabled().acquire_timeout(20);
        let manager = ConnectionManager::initialize(Some(file_config(&dir)), Some(pool))
            .await
            .unwrap();

        let held = manager.acquire().await.unwrap();
        assert!(matches!(
            manager.acquire().await,
            Err(DialectError::PoolTimeout { waited_ms: 20 })
        ));
        drop(held);
        assert!(manager.acquire().await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_shutdown_rejects_pooled_acquire() {
        let dir = tempfile::tempdir().unwrap();
        let manager = ConnectionManager::initialize(Some(file_config(&dir)), None)
            .await
            .unwrap();
        manager.execute("select 1", &[], ExecMode::Read).await.unwrap();
        manager.shutdown().await;
        assert!(matches!(
            manager.execute("select 1", &[], ExecMode::Read).await,
            Err(DialectError::PoolClosed)
        ));
    }
}
