//! Application configuration module
//!
//! Handles loading and validating configuration from environment variables.

use crate::connection::{ConnectionLabel, ConnectionParams};
use crate::error::AppError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration value: {0}")]
    InvalidValue(String),
}

impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

/// Database configuration for one side of the comparison
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
}

impl DatabaseConfig {
    /// Defaults per side, as the comparison has always shipped them
    pub fn default_for(label: ConnectionLabel) -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3306,
            user: "root".to_string(),
            password: String::new(),
            database: label.as_str().to_string(),
        }
    }

    pub fn to_params(&self) -> ConnectionParams {
        ConnectionParams {
            host: self.host.clone(),
            port: self.port,
            user: self.user.clone(),
            password: self.password.clone(),
            database: self.database.clone(),
        }
    }
}

/// Where generated scripts go
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputConfig {
    pub dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("storage/app/compareDB"),
        }
    }
}

/// Complete application settings
#[derive(Debug, Clone)]
pub struct Settings {
    pub source: DatabaseConfig,
    pub destination: DatabaseConfig,
    pub output: OutputConfig,
    /// Pool size per side
    pub max_connections: u32,
}

impl Settings {
    /// Load settings from environment variables
    pub fn load() -> Result<Self, ConfigError> {
        // Load .env file if it exists (ignore errors if file not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build settings from any key/value source
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let source = Self::database_config(&lookup, ConnectionLabel::Source)?;
        let destination = Self::database_config(&lookup, ConnectionLabel::Destination)?;

        let output = OutputConfig {
            dir: lookup("COMPAREDB_OUTPUT_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| OutputConfig::default().dir),
        };

        let max_connections = match lookup("COMPAREDB_MAX_CONNECTIONS") {
            Some(raw) => raw.parse().map_err(|_| {
                ConfigError::InvalidValue(format!("COMPAREDB_MAX_CONNECTIONS: {}", raw))
            })?,
            None => 2,
        };

        Ok(Self {
            source,
            destination,
            output,
            max_connections,
        })
    }

    /// Resolve one side: `<PREFIX>_DATABASE_URL` first, then the
    /// individual `<PREFIX>_DB_*` variables.
    ///
    /// Only the source side falls back to the generic `DB_*` variables.
    fn database_config<F>(lookup: &F, label: ConnectionLabel) -> Result<DatabaseConfig, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let prefix = label.as_str().to_uppercase();

        if let Some(url) = lookup(&format!("{}_DATABASE_URL", prefix)).filter(|u| !u.is_empty()) {
            return Self::parse_database_url(&url);
        }

        let defaults = DatabaseConfig::default_for(label);
        let var = |name: &str| {
            lookup(&format!("{}_DB_{}", prefix, name)).or_else(|| match label {
                ConnectionLabel::Source => lookup(&format!("DB_{}", name)),
                ConnectionLabel::Destination => None,
            })
        };

        let port = match var("PORT") {
            Some(raw) => raw
                .parse()
                .map_err(|_| ConfigError::InvalidValue(format!("{}_DB_PORT: {}", prefix, raw)))?,
            None => defaults.port,
        };

        Ok(DatabaseConfig {
            host: var("HOST").unwrap_or(defaults.host),
            port,
            user: var("USERNAME").unwrap_or(defaults.user),
            password: var("PASSWORD").unwrap_or(defaults.password),
            database: var("DATABASE").unwrap_or(defaults.database),
        })
    }

    /// Parse a DATABASE_URL connection string (mysql://...)
    fn parse_database_url(url: &str) -> Result<DatabaseConfig, ConfigError> {
        let params = ConnectionParams::from_connection_string(url)
            .map_err(|e| ConfigError::InvalidValue(e.to_string()))?;

        Ok(DatabaseConfig {
            host: params.host,
            port: params.port,
            user: params.user,
            password: params.password,
            database: params.database,
        })
    }
}
