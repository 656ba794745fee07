use anyhow::{anyhow, Result};
use config::Config;
use std::collections::HashMap;
use std::path::Path;
use std::str::FromStr;

use crate::database::{ConnectionConfig, PoolConfig};

#[derive(Debug, Clone, Default)]
pub struct DialectConfig {
    /// Path to the SQLite database file; no database means a disabled manager
    pub database: Option<String>,

    /// Connection pool settings
    pub pool: PoolConfig,

    /// Configuration file the settings were read from
    pub config_file: Option<String>,
}

const EMPTY_CONFIG: &str = r#"### sqlite-dialect configuration file

### path to the SQLite database file (":memory:" for an in-memory database)
### leave unset to run with the connection manager disabled
# database = "~/.sqlite-dialect/data.sqlite3"

### connection pool settings
# pool_enabled = true              # false keeps one shared connection
# pool_max = 10
# pool_min = 2
# pool_idle_timeout_ms = 30000     # 30 seconds
# pool_acquire_timeout_ms = 30000  # 30 seconds
# pool_reap_interval_ms = 1000
"#;

impl DialectConfig {
    /// Function to create and initialize a new configuration
    pub fn new(path: &Option<String>) -> Result<DialectConfig> {
        let mut builder = Config::builder();

        // Add in toml configuration file
        let config_file = match path {
            Some(p) => {
                let path = Path::new(p.as_str());
                if path.exists() {
                    let path_str = path
                        .to_str()
                        .ok_or_else(|| anyhow!("Could not convert path to string"))?;
                    builder = builder.add_source(config::File::with_name(path_str));
                } else {
                    std::fs::write(p.as_str(), EMPTY_CONFIG)
                        .map_err(|e| anyhow!("Unable to create config file: {}", e))?;
                }
                p.clone()
            }
            None => {
                // By default use $HOME/.sqlite-dialect/sqlite-dialect.toml
                let home_dir = dirs::home_dir()
                    .ok_or_else(|| anyhow!("Could not find home directory"))?
                    .to_str()
                    .ok_or_else(|| anyhow!("Could not convert home directory path to string"))?
                    .to_owned();
                let dialect_dir = format!("{}/.sqlite-dialect", home_dir);
                std::fs::create_dir_all(dialect_dir.as_str())
                    .map_err(|e| anyhow!("Unable to create config directory: {}", e))?;

                let p = format!("{}/sqlite-dialect.toml", dialect_dir);
                if Path::new(p.as_str()).exists() {
                    builder = builder.add_source(config::File::with_name(p.as_str()));
                } else {
                    std::fs::write(p.as_str(), EMPTY_CONFIG).map_err(|e| {
                        anyhow!("Unable to create config file {}: {}", p.as_str(), e)
                    })?;
                }
                p
            }
        };

        // Add in settings from the environment (with a prefix of SQLITE_DIALECT)
        // E.g., `SQLITE_DIALECT_POOL_MAX=4 ./sqlite-dialect` would cap the pool at 4
        builder = builder.add_source(config::Environment::with_prefix("SQLITE_DIALECT"));

        let settings = builder
            .build()
            .map_err(|e| anyhow!("Failed to build configuration: {}", e))?;

        let values = settings
            .try_deserialize::<HashMap<String, String>>()
            .map_err(|e| anyhow!("Failed to deserialize configuration: {}", e))?;

        let mut config = Self::from_values(&values)?;
        config.config_file = Some(config_file);
        Ok(config)
    }

    /// Build a configuration from flat key/value settings.
    pub fn from_values(values: &HashMap<String, String>) -> Result<DialectConfig> {
        let defaults = PoolConfig::default();

        let database = values
            .get("database")
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(expand_home);

        let pool = PoolConfig {
            enabled: parse_or(values, "pool_enabled", defaults.enabled)?,
            max_connections: parse_or(values, "pool_max", defaults.max_connections)?,
            min_connections: parse_or(values, "pool_min", defaults.min_connections)?,
            idle_timeout_ms: parse_or(values, "pool_idle_timeout_ms", defaults.idle_timeout_ms)?,
            acquire_timeout_ms: parse_or(
                values,
                "pool_acquire_timeout_ms",
                defaults.acquire_timeout_ms,
            )?,
            reap_interval_ms: parse_or(
                values,
                "pool_reap_interval_ms",
                defaults.reap_interval_ms,
            )?,
        };
        pool.validate().map_err(|e| anyhow!("{}", e))?;

        Ok(DialectConfig {
            database,
            pool,
            config_file: None,
        })
    }

    /// Connection settings for the manager; `None` when no database is set
    pub fn connection_config(&self) -> Option<ConnectionConfig> {
        self.database.as_deref().map(ConnectionConfig::new)
    }

    pub fn pool_config(&self) -> PoolConfig {
        self.pool.clone()
    }

    /// Display configuration summary
    pub fn summary(&self) -> String {
        let mut lines = vec![
            format!(
                "Config File:        {}",
                self.config_file.as_deref().unwrap_or("(none)")
            ),
            format!(
                "Database:           {}",
                self.database.as_deref().unwrap_or("(not set, manager disabled)")
            ),
        ];

        if let Some(size) = self
            .database
            .as_deref()
            .and_then(|p| std::fs::metadata(p).ok())
            .map(|m| m.len())
        {
            lines.push(format!("Database Size:      {}", format_size(size)));
        }

        if self.pool.enabled {
            lines.push(format!(
                "Pool:               min {} / max {} connections",
                self.pool.min_connections, self.pool.max_connections
            ));
            lines.push(format!(
                "Idle Timeout:       {} ms",
                self.pool.idle_timeout_ms
            ));
            lines.push(format!(
                "Acquire Timeout:    {} ms",
                self.pool.acquire_timeout_ms
            ));
        } else {
            lines.push("Pool:               disabled (single connection)".to_string());
        }

        lines.join("\n")
    }
}

fn parse_or<T: FromStr>(values: &HashMap<String, String>, key: &str, default: T) -> Result<T> {
    match values.get(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| anyhow!("Invalid value for {}: '{}'", key, raw)),
        None => Ok(default),
    }
}

fn expand_home(path: &str) -> String {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest).to_string_lossy().to_string(),
        _ => path.to_string(),
    }
}

/// Format bytes as human-readable size
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
