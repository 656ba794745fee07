//! Core database infrastructure
//!
//! - `DatabaseConn`: SQLite connection wrapper with journaling configuration
//! - `Pool`: bounded connection pool with FIFO waiters and idle eviction
//! - `ConnectionManager`: the entry point for running statements

mod connection;
mod manager;
mod pool;

pub use connection::{DatabaseConn, ExecMode, QueryOutcome};
pub use manager::{ConnectionConfig, ConnectionManager};
pub use pool::{ConnectionGuard, Pool, PoolConfig, PoolStatus, PooledConnection};
