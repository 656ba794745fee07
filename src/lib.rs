#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

//! sqlite-dialect - SQL compilation and connection management for SQLite
//!
//! The crate turns abstract query and schema descriptors into SQLite-flavoured
//! SQL text, and runs that text on a bounded pool of connections. It can be
//! used as a library, or through the `sqlite-dialect` command-line tool.
//!
//! # Feature Flags
//!
//! | Feature | Description | Key Dependencies |
//! |---------|-------------|------------------|
//! | `cli` (default) | Command-line binary | `clap`, `tracing-subscriber` |
//!
//! ```toml
//! # Library only
//! sqlite-dialect = { version = "0.1", default-features = false }
//! ```
//!
//! # Architecture
//!
//! - **[`grammar`]**: SQL compilers
//!   - `SqliteGrammar`: row-level statements (multi-row insert, ordering,
//!     truncate)
//!   - `SqliteSchemaGrammar`: DDL from a [`Blueprint`]
//! - **[`database`]**: SQLite connections
//!   - `ConnectionManager`: disabled, single-connection or pooled execution
//!   - `Pool`: bounded FIFO pool with idle eviction
//!   - `DatabaseConn`: one WAL-journaled connection
//! - **[`config`]**: Configuration file and environment loading
//! - **[`error`]**: The crate-wide [`DialectError`]
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use sqlite_dialect::*;
//!
//! let manager = ConnectionManager::initialize(
//!     Some(ConnectionConfig::new("app.sqlite3")),
//!     Some(PoolConfig::new(4).min_connections(1)),
//! )
//! .await?;
//!
//! // Create a table
//! let mut users = Blueprint::new("users");
//! users.create();
//! users.increments("id");
//! users.string("name", None);
//! for sql in users.to_sql(&SqliteSchemaGrammar::new())? {
//!     manager.execute(&sql, &[], ExecMode::Mutate).await?;
//! }
//!
//! // Insert two rows in one statement
//! let insert = SqliteGrammar::new().compile_insert(
//!     "users",
//!     &[Record::new().with("name", "ada"), Record::new().with("name", "brian")],
//! );
//! let outcome = manager.execute_compiled(&insert, ExecMode::Mutate).await?;
//! println!("inserted {} rows", outcome.changes());
//!
//! manager.shutdown().await;
//! ```

pub mod config;
pub mod database;
pub mod error;
pub mod grammar;

// =============================================================================
// Configuration
// =============================================================================

pub use config::{format_size, DialectConfig};

// =============================================================================
// Errors
// =============================================================================

pub use error::{DialectError, Result};

// =============================================================================
// Grammar
// =============================================================================

pub use grammar::{
    Blueprint, ColumnDefinition, ColumnType, Command, CompiledQuery, Direction, ForeignKey,
    Grammar, OrderSpec, QueryDescriptor, Record, SqliteGrammar, SqliteSchemaGrammar, Value,
};

// =============================================================================
// Database
// =============================================================================

pub use database::{
    ConnectionConfig, ConnectionGuard, ConnectionManager, DatabaseConn, ExecMode, Pool,
    PoolConfig, PoolStatus, QueryOutcome,
};
