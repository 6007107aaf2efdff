// SQLite connection setup

use crate::error::map_sqlx_error;
use serde::Deserialize;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::{ConnectOptions, Connection, SqliteConnection};
use std::str::FromStr;
use std::time::Duration;
use stinger_core::error::Result;
use tracing::debug;

/// Pool tuning, read from the `pool` configuration section
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PoolSettings {
    pub max_connections: u32,
    pub busy_timeout_ms: u64,
    pub create_if_missing: bool,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            max_connections: 10,
            busy_timeout_ms: 5_000,
            create_if_missing: true,
        }
    }
}

/// Connect options shared by the pool and dedicated transaction connections
pub fn connect_options(database_url: &str, settings: &PoolSettings) -> Result<SqliteConnectOptions> {
    let options = SqliteConnectOptions::from_str(database_url)
        .map_err(map_sqlx_error)?
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_millis(settings.busy_timeout_ms))
        .foreign_keys(true)
        .create_if_missing(settings.create_if_missing)
        .disable_statement_logging();
    Ok(options)
}

/// Create SQLite connection pool with WAL mode and foreign keys enabled
pub async fn create_pool(database_url: &str, settings: &PoolSettings) -> Result<SqlitePool> {
    let options = connect_options(database_url, settings)?;
    SqlitePoolOptions::new()
        .max_connections(settings.max_connections)
        .connect_with(options)
        .await
        .map_err(map_sqlx_error)
}

/// Open a connection outside the pool
pub(crate) async fn open_connection(options: &SqliteConnectOptions) -> Result<SqliteConnection> {
    let conn = SqliteConnection::connect_with(options)
        .await
        .map_err(map_sqlx_error)?;
    debug!("Opened dedicated connection");
    Ok(conn)
}
