// Settings: optional `stinger.toml`, then `STINGER__*` environment variables

use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::Path;
use stinger_infra_sqlite::{PoolSettings, ProcedureCatalog};

const DEFAULT_DATABASE_URL: &str = "sqlite://stinger.db";

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub database_url: String,
    #[serde(default)]
    pub pool: PoolSettings,
    /// `pretty` or `json`
    #[serde(default = "default_log_format")]
    pub log_format: String,
    /// Emulated stored procedures, by exact name
    #[serde(default)]
    pub procedures: ProcedureCatalog,
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Settings {
    /// Layer the config file (if any) under environment overrides.
    /// `STINGER__POOL__MAX_CONNECTIONS=4` sets `pool.max_connections`.
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let mut builder = Config::builder().set_default("database_url", DEFAULT_DATABASE_URL)?;
        builder = match file {
            Some(path) => builder.add_source(File::from(path).required(true)),
            None => builder.add_source(File::with_name("stinger").required(false)),
        };
        let settings = builder
            .add_source(Environment::with_prefix("STINGER").separator("__"))
            .build()
            .context("Failed to read configuration")?
            .try_deserialize::<Settings>()
            .context("Invalid configuration")?;
        Ok(settings)
    }
}
