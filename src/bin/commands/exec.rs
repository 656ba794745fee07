use std::io::Write;

use anyhow::{anyhow, Result};
use clap::Args;
use sqlite_dialect::{ConnectionManager, ExecMode, QueryOutcome};

use super::{parse_bindings, to_json};

/// Arguments for the Exec command
#[derive(Args)]
pub struct ExecArgs {
    /// SQL statement to run
    pub sql: String,

    /// Positional values for `?` placeholders, in order
    #[clap(short, long = "bind")]
    pub bindings: Vec<String>,
}

/// Arguments for the Query command
#[derive(Args)]
pub struct QueryArgs {
    /// SQL select to run
    pub sql: String,

    /// Positional values for `?` placeholders, in order
    #[clap(short, long = "bind")]
    pub bindings: Vec<String>,

    /// Print one JSON array instead of one object per line
    #[clap(long)]
    pub pretty: bool,
}

pub async fn run_exec(manager: &ConnectionManager, args: ExecArgs) -> Result<()> {
    let ExecArgs { sql, bindings } = args;
    let outcome = manager
        .execute(&sql, &parse_bindings(&bindings), ExecMode::Mutate)
        .await?;

    match outcome {
        QueryOutcome::Mutation { insert_id, changes } => {
            println!("changes: {}, last insert id: {}", changes, insert_id);
        }
        QueryOutcome::Disabled => {
            println!("no database configured; statement not run");
        }
        QueryOutcome::Rows { .. } => return Err(anyhow!("unexpected row result")),
    }
    Ok(())
}

pub async fn run_query(manager: &ConnectionManager, args: QueryArgs) -> Result<()> {
    let QueryArgs {
        sql,
        bindings,
        pretty,
    } = args;
    let outcome = manager
        .execute(&sql, &parse_bindings(&bindings), ExecMode::Read)
        .await?;

    if let QueryOutcome::Disabled = outcome {
        println!("no database configured; statement not run");
        return Ok(());
    }

    if pretty {
        println!("{}", to_json(&outcome.rows(), true)?);
        return Ok(());
    }

    let mut stdout = std::io::stdout();
    for row in outcome.rows() {
        if let Err(e) = writeln!(stdout, "{}", to_json(row, false)?) {
            if e.kind() != std::io::ErrorKind::BrokenPipe {
                return Err(e.into());
            }
            break;
        }
    }
    Ok(())
}
