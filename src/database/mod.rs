//! Database module
//!
//! All SQLite connection handling lives under `core`:
//!
//! ```text
//! database/
//! └── core/
//!     ├── connection  # DatabaseConn: one configured SQLite connection
//!     ├── pool        # Pool, PoolConfig, ConnectionGuard
//!     └── manager     # ConnectionManager: disabled, single or pooled
//! ```
//!
//! # Concurrency model
//!
//! SQLite allows one writer at a time. Every connection is opened in WAL mode
//! so readers never block the writer, and a busy timeout makes competing
//! writers queue on the engine lock rather than fail. The pool bounds how many
//! connections exist; it does not serialize writes itself.
//!
//! # Usage
//!
//! ```rust,ignore
//! use sqlite_dialect::database::{ConnectionConfig, ConnectionManager, ExecMode};
//!
//! let manager = ConnectionManager::initialize(
//!     Some(ConnectionConfig::new("/var/lib/app/data.sqlite3")),
//!     None, // pool defaults: max 10, min 2, 30s idle timeout
//! )
//! .await?;
//!
//! let outcome = manager.execute("select 1 as one", &[], ExecMode::Read).await?;
//! ```

pub mod core;

pub use core::{
    ConnectionConfig, ConnectionGuard, ConnectionManager, DatabaseConn, ExecMode, Pool,
    PoolConfig, PoolStatus, PooledConnection, QueryOutcome,
};
