use clap::{Parser, Subcommand};
use sqlite_dialect::*;
use tracing::Level;

mod commands;

#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
#[clap(propagate_version = true)]
struct Cli {
    /// configuration file path, by default $HOME/.sqlite-dialect/sqlite-dialect.toml is used
    #[clap(short, long)]
    config: Option<String>,

    /// Print debug information
    #[clap(long)]
    debug: bool,

    #[clap(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a mutating statement and report the last insert id and affected rows.
    Exec(commands::exec::ExecArgs),

    /// Run a read statement and print the rows as JSON.
    Query(commands::exec::QueryArgs),

    /// List the tables in the configured database.
    Tables(commands::tables::TablesArgs),

    /// Show the loaded configuration.
    Config,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if cli.debug {
        tracing_subscriber::fmt()
            // filter spans/events with level DEBUG or higher.
            .with_max_level(Level::DEBUG)
            .init();
    }

    let config = match DialectConfig::new(&cli.config) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(1);
        }
    };

    if let Commands::Config = cli.command {
        println!("{}", config.summary());
        return;
    }

    let manager = match ConnectionManager::from_config(&config).await {
        Ok(m) => m,
        Err(e) => {
            eprintln!("failed to initialize connection manager: {e}");
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Exec(args) => commands::exec::run_exec(&manager, args).await,
        Commands::Query(args) => commands::exec::run_query(&manager, args).await,
        Commands::Tables(args) => commands::tables::run(&manager, args).await,
        Commands::Config => Ok(()),
    };

    manager.shutdown().await;

    if let Err(e) = result {
        eprintln!("{e}");
        std::process::exit(1);
    }
}
