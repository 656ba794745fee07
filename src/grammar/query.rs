//! Row-level SQL compilation for SQLite
//!
//! SQLite departs from the generic grammar in three places:
//!
//! - multi-row inserts are written as `insert into ... select ... union select ...`
//! - ordering always applies `collate nocase`, since the default collation is byte-wise
//! - there is no `truncate`; it becomes two deletes, one of them against `sqlite_sequence`

use super::{CompiledQuery, Grammar, Record, Value};

/// Sort direction for an ordering clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Asc => "asc",
            Direction::Desc => "desc",
        }
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Direction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "asc" => Ok(Direction::Asc),
            "desc" => Ok(Direction::Desc),
            other => Err(format!("invalid sort direction: {}", other)),
        }
    }
}

/// One entry of an ordering clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderSpec {
    pub column: String,
    pub direction: Direction,
}

impl OrderSpec {
    pub fn new(column: &str, direction: Direction) -> Self {
        Self {
            column: column.to_string(),
            direction,
        }
    }

    pub fn asc(column: &str) -> Self {
        Self::new(column, Direction::Asc)
    }

    pub fn desc(column: &str) -> Self {
        Self::new(column, Direction::Desc)
    }
}

/// Abstract description of a row-level operation against one table.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryDescriptor {
    /// Target table
    pub table: String,
    /// Select list (empty means `*`)
    pub columns: Vec<String>,
    /// Rows to insert, in order
    pub rows: Vec<Record>,
    /// Ordering clauses, in order
    pub orders: Vec<OrderSpec>,
    /// LIMIT clause
    pub limit: Option<u64>,
    /// OFFSET clause
    pub offset: Option<u64>,
}

impl QueryDescriptor {
    pub fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            ..Default::default()
        }
    }

    pub fn select(mut self, columns: &[&str]) -> Self {
        self.columns = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn row(mut self, row: Record) -> Self {
        self.rows.push(row);
        self
    }

    pub fn order_by(mut self, column: &str, direction: Direction) -> Self {
        self.orders.push(OrderSpec::new(column, direction));
        self
    }

    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = Some(offset);
        self
    }
}

/// SQLite query grammar.
#[derive(Debug, Clone, Copy, Default)]
pub struct SqliteGrammar;

impl SqliteGrammar {
    pub fn new() -> Self {
        Self
    }

    /// Compile an insert of any number of rows.
    ///
    /// Column names come from the first row. Later rows are expected to carry
    /// the same keys; a key missing from a later row binds `NULL`.
    pub fn compile_insert(&self, table: &str, rows: &[Record]) -> CompiledQuery {
        let first = match rows {
            [] => {
                return CompiledQuery::raw(format!(
                    "insert into {} default values",
                    self.wrap_table(table)
                ))
            }
            [only] => return self.compile_single_insert(table, only),
            [first, ..] => first,
        };

        let columns: Vec<&str> = first.columns().collect();
        let select = columns
            .iter()
            .map(|c| format!("? as {}", self.wrap(c)))
            .collect::<Vec<_>>()
            .join(", ");
        let selects = vec![select; rows.len()].join(" union select ");

        let sql = format!(
            "insert into {} ({}) select {}",
            self.wrap_table(table),
            self.columnize(&columns),
            selects
        );

        let bindings = rows
            .iter()
            .flat_map(|row| {
                columns
                    .iter()
                    .map(move |c| row.get(c).cloned().unwrap_or(Value::Null))
            })
            .collect();

        tracing::debug!(table = %table, rows = rows.len(), "compiled multi-row insert");
        CompiledQuery::new(sql, bindings)
    }

    /// Compile the insert described by a [`QueryDescriptor`].
    pub fn compile_insert_query(&self, query: &QueryDescriptor) -> CompiledQuery {
        self.compile_insert(&query.table, &query.rows)
    }

    /// Compile a truncate into its two delete statements.
    ///
    /// The sequence reset is bound to the raw table name, as stored by SQLite.
    pub fn compile_truncate(&self, table: &str) -> Vec<CompiledQuery> {
        vec![
            CompiledQuery::new(
                "delete from sqlite_sequence where name = ?",
                vec![Value::from(table)],
            ),
            CompiledQuery::raw(format!("delete from {}", self.wrap_table(table))),
        ]
    }
}

impl Grammar for SqliteGrammar {
    fn compile_orders(&self, orders: &[OrderSpec]) -> Option<String> {
        if orders.is_empty() {
            return None;
        }
        let parts: Vec<String> = orders
            .iter()
            .map(|o| {
                format!(
                    "{} collate nocase {}",
                    self.wrap(&o.column),
                    o.direction.as_str()
                )
            })
            .collect();
        Some(format!("order by {}", parts.join(", ")))
    }
}
