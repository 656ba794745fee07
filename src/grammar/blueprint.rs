//! Table blueprints
//!
//! A [`Blueprint`] collects the columns and commands describing one table
//! change. It is built fluently, compiled once by a schema grammar, then
//! discarded.

use super::schema::SqliteSchemaGrammar;
use super::Value;
use crate::error::Result;

/// Semantic column type, mapped to a concrete SQL type by the grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    String,
    Text,
    Integer,
    Float,
    Decimal,
    Boolean,
    Enum,
    Date,
    DateTime,
    Time,
    Timestamp,
    Binary,
}

/// A single column declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDefinition {
    pub name: String,
    pub column_type: ColumnType,
    pub nullable: bool,
    pub default: Option<Value>,
    pub auto_increment: bool,
    /// Declared length for string columns
    pub length: Option<u32>,
    /// Declared precision and scale for decimal columns
    pub precision: Option<(u32, u32)>,
    /// Allowed values for enum columns
    pub allowed: Vec<String>,
}

impl ColumnDefinition {
    pub fn new(name: &str, column_type: ColumnType) -> Self {
        Self {
            name: name.to_string(),
            column_type,
            nullable: false,
            default: None,
            auto_increment: false,
            length: None,
            precision: None,
            allowed: Vec::new(),
        }
    }

    pub fn nullable(&mut self) -> &mut Self {
        self.nullable = true;
        self
    }

    pub fn default_value(&mut self, value: impl Into<Value>) -> &mut Self {
        self.default = Some(value.into());
        self
    }

    pub fn auto_increment(&mut self) -> &mut Self {
        self.auto_increment = true;
        self
    }
}

/// A foreign key declared on a blueprint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKey {
    pub columns: Vec<String>,
    /// Referenced table
    pub on: String,
    /// Referenced columns
    pub references: Vec<String>,
    pub on_delete: Option<String>,
    pub on_update: Option<String>,
}

impl ForeignKey {
    pub fn references(mut self, columns: &[&str]) -> Self {
        self.references = to_strings(columns);
        self
    }

    pub fn on(mut self, table: &str) -> Self {
        self.on = table.to_string();
        self
    }

    pub fn on_delete(mut self, action: &str) -> Self {
        self.on_delete = Some(action.to_string());
        self
    }

    pub fn on_update(mut self, action: &str) -> Self {
        self.on_update = Some(action.to_string());
        self
    }
}

/// A schema command carried by a blueprint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Create,
    Add,
    Primary { columns: Vec<String> },
    Unique { index: String, columns: Vec<String> },
    Index { index: String, columns: Vec<String> },
    Foreign(ForeignKey),
    Rename { to: String },
    DropTable,
    DropTableIfExists,
    DropColumn { columns: Vec<String> },
    DropUnique { index: String },
    DropIndex { index: String },
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::Create => "create",
            Command::Add => "add",
            Command::Primary { .. } => "primary",
            Command::Unique { .. } => "unique",
            Command::Index { .. } => "index",
            Command::Foreign(_) => "foreign",
            Command::Rename { .. } => "rename",
            Command::DropTable => "dropTable",
            Command::DropTableIfExists => "dropTableIfExists",
            Command::DropColumn { .. } => "dropColumn",
            Command::DropUnique { .. } => "dropUnique",
            Command::DropIndex { .. } => "dropIndex",
        }
    }
}

/// The desired schema of one table.
#[derive(Debug, Clone, PartialEq)]
pub struct Blueprint {
    pub table: String,
    pub columns: Vec<ColumnDefinition>,
    pub commands: Vec<Command>,
}

impl Blueprint {
    pub fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            columns: Vec::new(),
            commands: Vec::new(),
        }
    }

    // ---------------------------------------------------------------------
    // Commands
    // ---------------------------------------------------------------------

    pub fn create(&mut self) -> &mut Self {
        self.commands.push(Command::Create);
        self
    }

    pub fn primary(&mut self, columns: &[&str]) -> &mut Self {
        self.commands.push(Command::Primary {
            columns: to_strings(columns),
        });
        self
    }

    /// Add a unique index; the name defaults to `<table>_<cols>_unique`.
    pub fn unique(&mut self, columns: &[&str], index: Option<&str>) -> &mut Self {
        let index = self.index_name(columns, "unique", index);
        self.commands.push(Command::Unique {
            index,
            columns: to_strings(columns),
        });
        self
    }

    /// Add a plain index; the name defaults to `<table>_<cols>_index`.
    pub fn index(&mut self, columns: &[&str], index: Option<&str>) -> &mut Self {
        let index = self.index_name(columns, "index", index);
        self.commands.push(Command::Index {
            index,
            columns: to_strings(columns),
        });
        self
    }

    /// Add a foreign key. Chain `.references(..).on(..)` on the [`ForeignKey`]
    /// before passing it, or use [`Blueprint::foreign_key`].
    pub fn foreign(&mut self, foreign: ForeignKey) -> &mut Self {
        self.commands.push(Command::Foreign(foreign));
        self
    }

    /// Start a foreign key over `columns`.
    pub fn foreign_key(columns: &[&str]) -> ForeignKey {
        ForeignKey {
            columns: to_strings(columns),
            on: String::new(),
            references: Vec::new(),
            on_delete: None,
            on_update: None,
        }
    }

    pub fn rename(&mut self, to: &str) -> &mut Self {
        self.commands.push(Command::Rename { to: to.to_string() });
        self
    }

    pub fn drop_table(&mut self) -> &mut Self {
        self.commands.push(Command::DropTable);
        self
    }

    pub fn drop_if_exists(&mut self) -> &mut Self {
        self.commands.push(Command::DropTableIfExists);
        self
    }

    pub fn drop_column(&mut self, columns: &[&str]) -> &mut Self {
        self.commands.push(Command::DropColumn {
            columns: to_strings(columns),
        });
        self
    }

    pub fn drop_unique(&mut self, index: &str) -> &mut Self {
        self.commands.push(Command::DropUnique {
            index: index.to_string(),
        });
        self
    }

    pub fn drop_index(&mut self, index: &str) -> &mut Self {
        self.commands.push(Command::DropIndex {
            index: index.to_string(),
        });
        self
    }

    // ---------------------------------------------------------------------
    // Columns
    // ---------------------------------------------------------------------

    /// Auto-incrementing integer primary key.
    pub fn increments(&mut self, name: &str) -> &mut ColumnDefinition {
        self.add_column(name, ColumnType::Integer).auto_increment()
    }

    pub fn string(&mut self, name: &str, length: Option<u32>) -> &mut ColumnDefinition {
        let column = self.add_column(name, ColumnType::String);
        column.length = Some(length.unwrap_or(255));
        column
    }

    pub fn text(&mut self, name: &str) -> &mut ColumnDefinition {
        self.add_column(name, ColumnType::Text)
    }

    pub fn integer(&mut self, name: &str) -> &mut ColumnDefinition {
        self.add_column(name, ColumnType::Integer)
    }

    pub fn float(&mut self, name: &str) -> &mut ColumnDefinition {
        self.add_column(name, ColumnType::Float)
    }

    pub fn decimal(&mut self, name: &str, precision: u32, scale: u32) -> &mut ColumnDefinition {
        let column = self.add_column(name, ColumnType::Decimal);
        column.precision = Some((precision, scale));
        column
    }

    pub fn boolean(&mut self, name: &str) -> &mut ColumnDefinition {
        self.add_column(name, ColumnType::Boolean)
    }

    pub fn enumeration(&mut self, name: &str, allowed: &[&str]) -> &mut ColumnDefinition {
        let column = self.add_column(name, ColumnType::Enum);
        column.allowed = to_strings(allowed);
        column
    }

    pub fn date(&mut self, name: &str) -> &mut ColumnDefinition {
        self.add_column(name, ColumnType::Date)
    }

    pub fn date_time(&mut self, name: &str) -> &mut ColumnDefinition {
        self.add_column(name, ColumnType::DateTime)
    }

    pub fn time(&mut self, name: &str) -> &mut ColumnDefinition {
        self.add_column(name, ColumnType::Time)
    }

    pub fn timestamp(&mut self, name: &str) -> &mut ColumnDefinition {
        self.add_column(name, ColumnType::Timestamp)
    }

    pub fn binary(&mut self, name: &str) -> &mut ColumnDefinition {
        self.add_column(name, ColumnType::Binary)
    }

    pub fn add_column(&mut self, name: &str, column_type: ColumnType) -> &mut ColumnDefinition {
        self.columns.push(ColumnDefinition::new(name, column_type));
        let last = self.columns.len() - 1;
        &mut self.columns[last]
    }

    // ---------------------------------------------------------------------
    // Lookup and compilation
    // ---------------------------------------------------------------------

    pub fn creating(&self) -> bool {
        self.commands.iter().any(|c| matches!(c, Command::Create))
    }

    /// The first `primary` command's columns, if any.
    pub fn primary_columns(&self) -> Option<&[String]> {
        self.commands.iter().find_map(|c| match c {
            Command::Primary { columns } => Some(columns.as_slice()),
            _ => None,
        })
    }

    pub fn foreign_keys(&self) -> impl Iterator<Item = &ForeignKey> {
        self.commands.iter().filter_map(|c| match c {
            Command::Foreign(fk) => Some(fk),
            _ => None,
        })
    }

    /// Compile every command into SQL statements, in command order.
    ///
    /// When columns are present but the table is not being created, an `add`
    /// command is implied ahead of the explicit ones.
    pub fn to_sql(&self, grammar: &SqliteSchemaGrammar) -> Result<Vec<String>> {
        let implied_add = !self.columns.is_empty()
            && !self.creating()
            && !self.commands.iter().any(|c| matches!(c, Command::Add));

        let mut statements = Vec::new();
        if implied_add {
            statements.extend(grammar.compile_command(self, &Command::Add)?);
        }
        for command in &self.commands {
            statements.extend(grammar.compile_command(self, command)?);
        }
        Ok(statements)
    }

    fn index_name(&self, columns: &[&str], kind: &str, explicit: Option<&str>) -> String {
        match explicit {
            Some(name) => name.to_string(),
            None => format!("{}_{}_{}", self.table, columns.join("_"), kind)
                .to_lowercase()
                .replace(['-', '.'], "_"),
        }
    }
}

fn to_strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_builders() {
        let mut table = Blueprint::new("users");
        table.increments("id");
        table.string("email", None).nullable();
        table.boolean("active").default_value(true);

        assert_eq!(table.columns.len(), 3);
        assert!(table.columns[0].auto_increment);
        assert_eq!(table.columns[0].column_type, ColumnType::Integer);
        assert_eq!(table.columns[1].length, Some(255));
        assert!(table.columns[1].nullable);
        assert_eq!(table.columns[2].default, Some(Value::Boolean(true)));
    }

    #[test]
    fn test_default_index_names() {
        let mut table = Blueprint::new("users");
        table.unique(&["email"], None);
        table.index(&["first", "last"], Some("name_idx"));

        assert_eq!(
            table.commands[0],
            Command::Unique {
                index: "users_email_unique".to_string(),
                columns: vec!["email".to_string()],
            }
        );
        assert_eq!(
            table.commands[1],
            Command::Index {
                index: "name_idx".to_string(),
                columns: vec!["first".to_string(), "last".to_string()],
            }
        );
    }

    #[test]
    fn test_lookup_helpers() {
        let mut table = Blueprint::new("posts");
        table.create();
        table.primary(&["id"]);
        table.foreign(
            Blueprint::foreign_key(&["user_id"])
                .references(&["id"])
                .on("users"),
        );

        assert!(table.creating());
        assert_eq!(table.primary_columns(), Some(&["id".to_string()][..]));
        assert_eq!(table.foreign_keys().count(), 1);
        assert_eq!(table.commands[2].name(), "foreign");
    }
}
