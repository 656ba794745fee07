//! Grammar compilers
//!
//! This module turns abstract query and schema descriptors into SQL text:
//!
//! - **[`Grammar`]**: the base capability set every dialect shares (identifier
//!   wrapping, column lists, placeholder lists, the generic single-row insert)
//! - **[`SqliteGrammar`]**: row-level compilation for SQLite (multi-row insert,
//!   case-insensitive ordering, truncate)
//! - **[`SqliteSchemaGrammar`]**: DDL compilation for SQLite, built on top of a
//!   `SqliteGrammar` it owns
//!
//! # Architecture
//!
//! ```text
//! grammar/
//! ├── value      # Value and ordered Record
//! ├── query      # QueryDescriptor, OrderSpec, SqliteGrammar
//! ├── blueprint  # Blueprint, ColumnDefinition, Command
//! └── schema     # SqliteSchemaGrammar
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use sqlite_dialect::grammar::{Blueprint, Record, SqliteGrammar, SqliteSchemaGrammar};
//!
//! let grammar = SqliteGrammar::new();
//! let insert = grammar.compile_insert(
//!     "users",
//!     &[Record::new().with("name", "a"), Record::new().with("name", "b")],
//! );
//!
//! let schema = SqliteSchemaGrammar::new();
//! let mut table = Blueprint::new("users");
//! table.create();
//! table.increments("id");
//! table.string("email", None);
//! let statements = table.to_sql(&schema)?;
//! ```

mod blueprint;
mod query;
mod schema;
mod value;

pub use blueprint::{Blueprint, ColumnDefinition, ColumnType, Command, ForeignKey};
pub use query::{Direction, OrderSpec, QueryDescriptor, SqliteGrammar};
pub use schema::SqliteSchemaGrammar;
pub use value::{Record, Value};

/// SQL text paired with its positional bindings.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledQuery {
    pub sql: String,
    pub bindings: Vec<Value>,
}

impl CompiledQuery {
    pub fn new(sql: impl Into<String>, bindings: Vec<Value>) -> Self {
        Self {
            sql: sql.into(),
            bindings,
        }
    }

    /// A statement with no bindings.
    pub fn raw(sql: impl Into<String>) -> Self {
        Self::new(sql, Vec::new())
    }
}

/// Capabilities shared by every dialect grammar.
///
/// Dialects implement [`Grammar`] and override only the methods where their SQL
/// differs; everything else falls through to these provided methods.
pub trait Grammar {
    /// Quote a single identifier segment. `*` is never quoted.
    fn wrap_value(&self, value: &str) -> String {
        if value == "*" {
            return value.to_string();
        }
        format!("\"{}\"", value.replace('"', "\"\""))
    }

    /// Quote a possibly qualified (`a.b`) or aliased (`a as b`) identifier.
    fn wrap(&self, value: &str) -> String {
        if let Some(pos) = value.to_ascii_lowercase().find(" as ") {
            let (left, right) = (&value[..pos], &value[pos + 4..]);
            return format!(
                "{} as {}",
                self.wrap(left.trim()),
                self.wrap_value(right.trim())
            );
        }

        value
            .split('.')
            .map(|segment| self.wrap_value(segment))
            .collect::<Vec<_>>()
            .join(".")
    }

    fn wrap_table(&self, table: &str) -> String {
        self.wrap(table)
    }

    /// Comma-joined list of wrapped column names.
    fn columnize<S: AsRef<str>>(&self, columns: &[S]) -> String {
        columns
            .iter()
            .map(|c| self.wrap(c.as_ref()))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Comma-joined list of `count` positional placeholders.
    fn parameterize(&self, count: usize) -> String {
        vec!["?"; count].join(", ")
    }

    /// Generic `insert ... values (...)` for a single row.
    fn compile_single_insert(&self, table: &str, row: &Record) -> CompiledQuery {
        let columns: Vec<&str> = row.columns().collect();
        let sql = format!(
            "insert into {} ({}) values ({})",
            self.wrap_table(table),
            self.columnize(&columns),
            self.parameterize(columns.len())
        );
        CompiledQuery::new(sql, row.values().cloned().collect())
    }

    /// Generic `order by` clause; `None` when there is nothing to order by.
    fn compile_orders(&self, orders: &[OrderSpec]) -> Option<String> {
        if orders.is_empty() {
            return None;
        }
        let parts: Vec<String> = orders
            .iter()
            .map(|o| format!("{} {}", self.wrap(&o.column), o.direction.as_str()))
            .collect();
        Some(format!("order by {}", parts.join(", ")))
    }

    /// Generic `select` over a descriptor's columns, orders, limit and offset.
    fn compile_select(&self, query: &QueryDescriptor) -> CompiledQuery {
        let columns = if query.columns.is_empty() {
            "*".to_string()
        } else {
            self.columnize(&query.columns)
        };

        let mut sql = format!("select {} from {}", columns, self.wrap_table(&query.table));
        if let Some(orders) = self.compile_orders(&query.orders) {
            sql.push(' ');
            sql.push_str(&orders);
        }
        if let Some(limit) = query.limit {
            sql.push_str(&format!(" limit {}", limit));
        }
        if let Some(offset) = query.offset {
            sql.push_str(&format!(" offset {}", offset));
        }

        CompiledQuery::raw(sql)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct BaseGrammar;

    impl Grammar for BaseGrammar {}

    #[test]
    fn test_wrap_qualified_and_aliased() {
        let g = BaseGrammar;
        assert_eq!(g.wrap("users.name"), r#""users"."name""#);
        assert_eq!(g.wrap("users.*"), r#""users".*"#);
        assert_eq!(g.wrap("name AS n"), r#""name" as "n""#);
        assert_eq!(g.wrap(r#"we"ird"#), r#""we""ird""#);
    }

    #[test]
    fn test_columnize_and_parameterize() {
        let g = BaseGrammar;
        assert_eq!(g.columnize(&["a", "b"]), r#""a", "b""#);
        assert_eq!(g.parameterize(3), "?, ?, ?");
        assert_eq!(g.parameterize(0), "");
    }

    #[test]
    fn test_generic_single_insert() {
        let g = BaseGrammar;
        let row = Record::new().with("a", 1).with("b", "x");
        let compiled = g.compile_single_insert("t", &row);
        assert_eq!(compiled.sql, r#"insert into "t" ("a", "b") values (?, ?)"#);
        assert_eq!(compiled.bindings, vec![Value::from(1), Value::from("x")]);
    }

    #[test]
    fn test_generic_orders_have_no_collation() {
        let g = BaseGrammar;
        let orders = vec![OrderSpec::desc("created_at")];
        assert_eq!(
            g.compile_orders(&orders).as_deref(),
            Some(r#"order by "created_at" desc"#)
        );
    }
}
