use anyhow::Result;
use clap::Args;
use sqlite_dialect::{
    ConnectionManager, Direction, ExecMode, Grammar, QueryDescriptor, SqliteGrammar, Value,
};

use super::to_json;

/// Arguments for the Tables command
#[derive(Args)]
pub struct TablesArgs {
    /// Output as JSON
    #[clap(long)]
    pub json: bool,

    /// Include SQLite's internal tables
    #[clap(short, long)]
    pub all: bool,
}

pub async fn run(manager: &ConnectionManager, args: TablesArgs) -> Result<()> {
    let TablesArgs { json, all } = args;

    let listing = QueryDescriptor::new("sqlite_master")
        .select(&["name", "type"])
        .order_by("name", Direction::Asc);
    let compiled = SqliteGrammar::new().compile_select(&listing);
    let outcome = manager.execute_compiled(&compiled, ExecMode::Read).await?;

    let names: Vec<String> = outcome
        .rows()
        .iter()
        .filter(|row| row.get("type") == Some(&Value::from("table")))
        .filter_map(|row| match row.get("name") {
            Some(Value::Text(name)) => Some(name.clone()),
            _ => None,
        })
        .filter(|name| all || !name.starts_with("sqlite_"))
        .collect();

    if json {
        println!("{}", to_json(&names, false)?);
    } else if names.is_empty() {
        println!("no tables");
    } else {
        for name in names {
            println!("{}", name);
        }
    }
    Ok(())
}
