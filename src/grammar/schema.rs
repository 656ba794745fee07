//! SQLite DDL compilation
//!
//! SQLite cannot add primary or foreign keys to an existing table, cannot drop
//! a column without rebuilding the table, and accepts only one column per
//! `alter table ... add column`. Keys are therefore declared inline by
//! [`SqliteSchemaGrammar::compile_create_table`], `foreign` commands compile
//! to nothing, and `dropColumn` is rejected outright.

use super::blueprint::{Blueprint, ColumnDefinition, ColumnType, Command, ForeignKey};
use super::{CompiledQuery, Grammar, SqliteGrammar, Value};
use crate::error::{DialectError, Result};

/// SQLite schema grammar, layered over the query grammar's quoting rules.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteSchemaGrammar {
    query: SqliteGrammar,
}

impl SqliteSchemaGrammar {
    pub fn new() -> Self {
        Self::with_query_grammar(SqliteGrammar::new())
    }

    pub fn with_query_grammar(query: SqliteGrammar) -> Self {
        Self { query }
    }

    /// The query grammar this schema grammar quotes with.
    pub fn query_grammar(&self) -> &SqliteGrammar {
        &self.query
    }

    /// Look up a table in the schema catalog; bind the table name.
    pub fn compile_table_exists(&self) -> &'static str {
        "select * from sqlite_master where type = 'table' and name = ?"
    }

    /// [`compile_table_exists`](Self::compile_table_exists) with its binding attached.
    pub fn table_exists_query(&self, table: &str) -> CompiledQuery {
        CompiledQuery::new(self.compile_table_exists(), vec![Value::from(table)])
    }

    pub fn compile_create_table(&self, blueprint: &Blueprint) -> String {
        tracing::debug!(
            table = %blueprint.table,
            columns = blueprint.columns.len(),
            "compiling create table"
        );

        let mut sql = format!(
            "create table {} ({}",
            self.query.wrap_table(&blueprint.table),
            self.get_columns(blueprint).join(", ")
        );
        sql.push_str(&self.add_foreign_keys(blueprint));
        sql.push_str(&self.add_primary_keys(blueprint));
        sql.push(')');
        sql
    }

    /// Inline `foreign key` clauses, each prefixed with `", "`.
    pub fn add_foreign_keys(&self, blueprint: &Blueprint) -> String {
        blueprint
            .foreign_keys()
            .map(|fk| {
                let mut clause = format!(
                    ", foreign key ({}) references {} ({})",
                    self.query.columnize(&fk.columns),
                    self.query.wrap_table(&fk.on),
                    self.query.columnize(&fk.references)
                );
                if let Some(action) = &fk.on_delete {
                    clause.push_str(&format!(" on delete {}", action));
                }
                if let Some(action) = &fk.on_update {
                    clause.push_str(&format!(" on update {}", action));
                }
                clause
            })
            .collect()
    }

    /// Inline `primary key` clause prefixed with `", "`, or empty.
    pub fn add_primary_keys(&self, blueprint: &Blueprint) -> String {
        match blueprint.primary_columns() {
            Some(columns) => format!(", primary key ({})", self.query.columnize(columns)),
            None => String::new(),
        }
    }

    /// One `alter table ... add column` per column.
    pub fn compile_add(&self, blueprint: &Blueprint) -> Vec<String> {
        let table = self.query.wrap_table(&blueprint.table);
        self.get_columns(blueprint)
            .into_iter()
            .map(|column| format!("alter table {} add column {}", table, column))
            .collect()
    }

    pub fn compile_unique(&self, blueprint: &Blueprint, index: &str, columns: &[String]) -> String {
        format!(
            "create unique index {} on {} ({})",
            self.query.wrap(index),
            self.query.wrap_table(&blueprint.table),
            self.query.columnize(columns)
        )
    }

    pub fn compile_index(&self, blueprint: &Blueprint, index: &str, columns: &[String]) -> String {
        format!(
            "create index {} on {} ({})",
            self.query.wrap(index),
            self.query.wrap_table(&blueprint.table),
            self.query.columnize(columns)
        )
    }

    /// Foreign keys only exist when declared at creation; nothing to emit here.
    pub fn compile_foreign(&self, blueprint: &Blueprint, foreign: &ForeignKey) -> Option<String> {
        tracing::debug!(
            table = %blueprint.table,
            columns = ?foreign.columns,
            on = %foreign.on,
            "foreign key is applied only by create table"
        );
        None
    }

    pub fn compile_drop_table(&self, blueprint: &Blueprint) -> String {
        format!("drop table {}", self.query.wrap_table(&blueprint.table))
    }

    pub fn compile_drop_table_if_exists(&self, blueprint: &Blueprint) -> String {
        format!(
            "drop table if exists {}",
            self.query.wrap_table(&blueprint.table)
        )
    }

    pub fn compile_drop_column(&self, blueprint: &Blueprint, columns: &[String]) -> Result<Vec<String>> {
        Err(DialectError::UnsupportedOperation(format!(
            "sqlite cannot drop columns ({}) from table {} without rebuilding it",
            columns.join(", "),
            blueprint.table
        )))
    }

    pub fn compile_drop_unique(&self, index: &str) -> String {
        format!("drop index {}", self.query.wrap(index))
    }

    pub fn compile_drop_index(&self, index: &str) -> String {
        format!("drop index {}", self.query.wrap(index))
    }

    pub fn compile_rename(&self, blueprint: &Blueprint, to: &str) -> String {
        format!(
            "alter table {} rename to {}",
            self.query.wrap_table(&blueprint.table),
            self.query.wrap_table(to)
        )
    }

    /// Compile a single command. `primary` and `foreign` produce no
    /// statements: they are emitted inline by `create`.
    pub fn compile_command(&self, blueprint: &Blueprint, command: &Command) -> Result<Vec<String>> {
        let statements = match command {
            Command::Create => vec![self.compile_create_table(blueprint)],
            Command::Add => self.compile_add(blueprint),
            Command::Primary { .. } => Vec::new(),
            Command::Unique { index, columns } => {
                vec![self.compile_unique(blueprint, index, columns)]
            }
            Command::Index { index, columns } => {
                vec![self.compile_index(blueprint, index, columns)]
            }
            Command::Foreign(foreign) => {
                self.compile_foreign(blueprint, foreign).into_iter().collect()
            }
            Command::Rename { to } => vec![self.compile_rename(blueprint, to)],
            Command::DropTable => vec![self.compile_drop_table(blueprint)],
            Command::DropTableIfExists => vec![self.compile_drop_table_if_exists(blueprint)],
            Command::DropColumn { columns } => self.compile_drop_column(blueprint, columns)?,
            Command::DropUnique { index } => vec![self.compile_drop_unique(index)],
            Command::DropIndex { index } => vec![self.compile_drop_index(index)],
        };

        tracing::debug!(
            table = %blueprint.table,
            command = command.name(),
            statements = statements.len(),
            "compiled schema command"
        );
        Ok(statements)
    }

    /// Compiled column definitions, in declaration order.
    pub fn get_columns(&self, blueprint: &Blueprint) -> Vec<String> {
        blueprint
            .columns
            .iter()
            .map(|column| {
                format!(
                    "{} {}{}",
                    self.query.wrap(&column.name),
                    self.column_type(column),
                    self.modifiers(column)
                )
            })
            .collect()
    }

    /// Concrete SQLite type for a column. Length, precision and enum values are dropped.
    pub fn column_type(&self, column: &ColumnDefinition) -> &'static str {
        match column.column_type {
            ColumnType::String => "varchar",
            ColumnType::Text => "text",
            ColumnType::Integer => "integer",
            ColumnType::Float => "float",
            ColumnType::Decimal => "float",
            ColumnType::Boolean => "tinyint",
            ColumnType::Enum => "varchar",
            ColumnType::Date => "date",
            ColumnType::DateTime => "datetime",
            ColumnType::Time => "time",
            ColumnType::Timestamp => "datetime",
            ColumnType::Binary => "blob",
        }
    }

    fn modifiers(&self, column: &ColumnDefinition) -> String {
        let mut sql = String::new();
        sql.push_str(&self.modify_nullable(column));
        sql.push_str(&self.modify_default(column));
        sql.push_str(&self.modify_increment(column));
        sql
    }

    fn modify_nullable(&self, column: &ColumnDefinition) -> String {
        if column.nullable {
            " null".to_string()
        } else {
            " not null".to_string()
        }
    }

    fn modify_default(&self, column: &ColumnDefinition) -> String {
        match &column.default {
            None => String::new(),
            Some(value) if value.is_null() => " default null".to_string(),
            Some(value @ Value::Blob(_)) => format!(" default x'{}'", value.literal_body()),
            Some(value) => format!(" default '{}'", value.literal_body()),
        }
    }

    fn modify_increment(&self, column: &ColumnDefinition) -> String {
        if column.column_type == ColumnType::Integer && column.auto_increment {
            " primary key autoincrement".to_string()
        } else {
            String::new()
        }
    }
}
