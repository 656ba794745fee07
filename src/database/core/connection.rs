//! Database connection management
//!
//! This module provides the engine connection wrapper used by both the pool and
//! the single-connection mode of the connection manager.

use rusqlite::{params_from_iter, Connection};
use serde::Serialize;
use std::time::Duration;

use crate::error::{DialectError, Result};
use crate::grammar::{CompiledQuery, Record, SqliteGrammar, SqliteSchemaGrammar, Value};

/// How a statement's result is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecMode {
    /// Insert/update/delete/DDL: report the last row id and affected rows
    Mutate,
    /// Select: return the full result set
    Read,
}

/// Normalized result of running a statement.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum QueryOutcome {
    /// Result of a mutating statement
    Mutation { insert_id: i64, changes: usize },
    /// Result set of a read
    Rows { rows: Vec<Record> },
    /// The manager was initialized without a connection; nothing ran
    Disabled,
}

impl QueryOutcome {
    pub fn rows(&self) -> &[Record] {
        match self {
            QueryOutcome::Rows { rows } => rows,
            _ => &[],
        }
    }

    pub fn changes(&self) -> usize {
        match self {
            QueryOutcome::Mutation { changes, .. } => *changes,
            _ => 0,
        }
    }

    pub fn insert_id(&self) -> Option<i64> {
        match self {
            QueryOutcome::Mutation { insert_id, .. } => Some(*insert_id),
            _ => None,
        }
    }
}

/// Core database connection wrapper
///
/// `DatabaseConn` wraps a single SQLite connection, applying the journaling
/// and locking pragmas every connection handed out by this crate relies on.
pub struct DatabaseConn {
    pub conn: Connection,
}

impl DatabaseConn {
    /// Open a database at the specified path
    ///
    /// If the path is `None`, an in-memory database is created.
    pub fn open(path: Option<&str>) -> Result<Self> {
        let conn = match path {
            Some(p) => Connection::open(p).map_err(|e| {
                DialectError::Connection(format!("failed to open database at '{}': {}", p, e))
            })?,
            None => Connection::open_in_memory().map_err(|e| {
                DialectError::Connection(format!("failed to create in-memory database: {}", e))
            })?,
        };

        let db = DatabaseConn { conn };
        db.configure()?;
        Ok(db)
    }

    /// Open a database at the specified path (convenience method)
    pub fn open_path(path: &str) -> Result<Self> {
        Self::open(Some(path))
    }

    /// Create an in-memory database
    pub fn open_in_memory() -> Result<Self> {
        Self::open(None)
    }

    /// Configure the connection for one writer and many concurrent readers
    fn configure(&self) -> Result<()> {
        // WAL lets readers proceed while a single writer holds the lock
        let _: String = self
            .conn
            .query_row("PRAGMA journal_mode=WAL", [], |row| row.get(0))
            .map_err(|e| DialectError::Connection(format!("failed to set journal mode: {}", e)))?;

        self.conn
            .execute("PRAGMA synchronous=NORMAL", [])
            .map_err(|e| {
                DialectError::Connection(format!("failed to set synchronous mode: {}", e))
            })?;

        self.conn
            .execute("PRAGMA foreign_keys=ON", [])
            .map_err(|e| DialectError::Connection(format!("failed to enable foreign keys: {}", e)))?;

        // Writers queue on the engine lock instead of failing with SQLITE_BUSY
        self.conn
            .busy_timeout(Duration::from_secs(5))
            .map_err(|e| DialectError::Connection(format!("failed to set busy timeout: {}", e)))?;

        Ok(())
    }

    /// Current journal mode (`wal` for file databases, `memory` in memory)
    pub fn journal_mode(&self) -> Result<String> {
        Ok(self
            .conn
            .query_row("PRAGMA journal_mode", [], |row| row.get(0))?)
    }

    /// Run one statement with positional bindings
    pub fn run(&self, sql: &str, bindings: &[Value], mode: ExecMode) -> Result<QueryOutcome> {
        match mode {
            ExecMode::Mutate => {
                let changes = self.conn.execute(sql, params_from_iter(bindings.iter()))?;
                Ok(QueryOutcome::Mutation {
                    insert_id: self.conn.last_insert_rowid(),
                    changes,
                })
            }
            ExecMode::Read => {
                let mut stmt = self.conn.prepare(sql)?;
                let columns: Vec<String> =
                    stmt.column_names().into_iter().map(String::from).collect();

                let mut rows = stmt.query(params_from_iter(bindings.iter()))?;
                let mut records = Vec::new();
                while let Some(row) = rows.next()? {
                    let mut record = Record::new();
                    for (idx, name) in columns.iter().enumerate() {
                        record.push(name, Value::from(row.get_ref(idx)?));
                    }
                    records.push(record);
                }
                Ok(QueryOutcome::Rows { rows: records })
            }
        }
    }

    /// Run several statements in order inside one transaction
    ///
    /// Returns the outcome of the last statement. Nothing is committed if any
    /// statement fails.
    pub fn run_batch(&self, statements: &[CompiledQuery], mode: ExecMode) -> Result<QueryOutcome> {
        let tx = self.conn.unchecked_transaction()?;
        let mut outcome = QueryOutcome::Mutation {
            insert_id: self.conn.last_insert_rowid(),
            changes: 0,
        };
        for statement in statements {
            outcome = self.run(&statement.sql, &statement.bindings, mode)?;
        }
        tx.commit()?;
        Ok(outcome)
    }

    /// Delete every row of `table` and reset its autoincrement counter
    ///
    /// `sqlite_sequence` only exists once some table has been declared with
    /// `autoincrement`; without it the counter reset is skipped.
    pub fn truncate(&self, table: &str) -> Result<QueryOutcome> {
        let mut statements = SqliteGrammar::new().compile_truncate(table);
        if !self.table_exists("sqlite_sequence")? {
            statements.retain(|s| !s.sql.contains("sqlite_sequence"));
        }
        self.run_batch(&statements, ExecMode::Mutate)
    }

    /// Check if a table exists in the database
    pub fn table_exists(&self, table_name: &str) -> Result<bool> {
        let query = SqliteSchemaGrammar::new().table_exists_query(table_name);
        let outcome = self.run(&query.sql, &query.bindings, ExecMode::Read)?;
        Ok(!outcome.rows().is_empty())
    }
}
