//! Report types for a comparison run

use crate::connection::ConnectionLabel;
use crate::snapshot::DiffSummary;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// Outcome for one side of the comparison
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionReport {
    pub label: ConnectionLabel,
    pub database: String,
    pub summary: DiffSummary,
    /// Generated statements in emission order
    pub statements: Vec<String>,
    /// Written script, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub script: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persistence_error: Option<String>,
}

impl ConnectionReport {
    pub fn has_differences(&self) -> bool {
        self.summary.total() > 0
    }
}

/// Result of one comparison run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    /// Both snapshots have the same checksum
    pub identical: bool,
    pub source: ConnectionReport,
    pub destination: ConnectionReport,
}

impl ComparisonReport {
    pub fn connections(&self) -> [&ConnectionReport; 2] {
        [&self.source, &self.destination]
    }

    pub fn has_differences(&self) -> bool {
        self.connections().iter().any(|c| c.has_differences())
    }

    pub fn persistence_failed(&self) -> bool {
        self.connections().iter().any(|c| c.persistence_error.is_some())
    }
}
