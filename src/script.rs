//! Script Emitter
//!
//! Persists one connection's statements as a reviewable `.sql` file under
//! `<root>/<label>/<database>_<timestamp>.sql`.

use crate::connection::ConnectionLabel;
use crate::error::AppError;
use chrono::{DateTime, Utc};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

/// Timestamp part of a script file name
const FILE_TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// Writes migration scripts below a root directory
#[derive(Debug, Clone)]
pub struct ScriptEmitter {
    root: PathBuf,
}

impl ScriptEmitter {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where the script for this connection and run time goes
    pub fn script_path(&self, label: ConnectionLabel, database: &str, at: DateTime<Utc>) -> PathBuf {
        self.root
            .join(label.as_str())
            .join(format!("{}_{}.sql", database, at.format(FILE_TIMESTAMP_FORMAT)))
    }

    /// Script text: statements joined line by line
    pub fn render(statements: &[String]) -> String {
        statements.join("\n")
    }

    /// Write the script.
    ///
    /// Returns `None` when there is nothing to write or a file with the
    /// same name already exists; an existing file is never overwritten.
    pub async fn emit(
        &self,
        label: ConnectionLabel,
        database: &str,
        statements: &[String],
        at: DateTime<Utc>,
    ) -> Result<Option<PathBuf>, AppError> {
        if statements.is_empty() {
            debug!("[{}] No statements for {}, nothing written", label, database);
            return Ok(None);
        }

        let path = self.script_path(label, database, at);
        let persistence = |source: std::io::Error| AppError::Persistence {
            path: path.clone(),
            source,
        };

        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir).await.map_err(&persistence)?;
        }

        let mut file = match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                warn!("[{}] {} already exists, skipping", label, path.display());
                return Ok(None);
            }
            Err(e) => return Err(persistence(e)),
        };

        file.write_all(Self::render(statements).as_bytes())
            .await
            .map_err(&persistence)?;
        file.flush().await.map_err(&persistence)?;

        info!(
            "📝 [{}] Wrote {} statements to {}",
            label,
            statements.len(),
            path.display()
        );

        Ok(Some(path))
    }
}
