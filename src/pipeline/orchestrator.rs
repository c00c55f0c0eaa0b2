//! Orchestrator - one comparison run from catalogs to scripts

use super::types::{ComparisonReport, ConnectionReport};
use crate::connection::Catalog;
use crate::error::AppError;
use crate::introspection::MySqlIntrospector;
use crate::migration::MigrationGenerator;
use crate::script::ScriptEmitter;
use crate::snapshot::{DiffEngine, DiffResult};
use chrono::{DateTime, Utc};
use std::path::PathBuf;
use tracing::{debug, error, info};
use uuid::Uuid;

/// Runs a full source / destination comparison
pub struct Comparison;

impl Comparison {
    /// Introspect, diff, generate and (unless `emitter` is `None`) emit.
    ///
    /// Any introspection failure aborts the run. A script that cannot be
    /// written is recorded on its connection report instead.
    pub async fn run(
        source: &dyn Catalog,
        destination: &dyn Catalog,
        emitter: Option<&ScriptEmitter>,
    ) -> Result<ComparisonReport, AppError> {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();

        info!(
            "🔍 Comparing {} ({}) with {} ({})",
            source.label(),
            source.database_name(),
            destination.label(),
            destination.database_name()
        );

        let (source_snapshot, destination_snapshot) = tokio::try_join!(
            MySqlIntrospector::introspect(source),
            MySqlIntrospector::introspect(destination),
        )?;

        debug!(
            "Snapshot checksums: {} {}, {} {}",
            source.label(),
            source_snapshot.checksum(),
            destination.label(),
            destination_snapshot.checksum()
        );

        let (source_diff, destination_diff) = DiffEngine::diff(&source_snapshot, &destination_snapshot);

        // checksums differ across database names, the diffs do not
        let identical = source_diff.is_empty() && destination_diff.is_empty();
        if identical {
            info!("Schemas are identical");
        }
        let source_statements = MigrationGenerator::generate(&source_diff);
        let destination_statements = MigrationGenerator::generate(&destination_diff);

        let (source_written, destination_written) = tokio::join!(
            Self::persist(emitter, &source_diff, &source_statements, started_at),
            Self::persist(emitter, &destination_diff, &destination_statements, started_at),
        );

        let report = ComparisonReport {
            run_id,
            started_at,
            identical,
            source: Self::connection_report(&source_diff, source_statements, source_written),
            destination: Self::connection_report(
                &destination_diff,
                destination_statements,
                destination_written,
            ),
        };

        info!(
            "✅ Comparison {} finished: {} source / {} destination differences",
            report.run_id,
            report.source.summary.total(),
            report.destination.summary.total()
        );

        Ok(report)
    }

    async fn persist(
        emitter: Option<&ScriptEmitter>,
        diff: &DiffResult,
        statements: &[String],
        at: DateTime<Utc>,
    ) -> Result<Option<PathBuf>, AppError> {
        match emitter {
            Some(emitter) => {
                emitter
                    .emit(diff.label, &diff.database_name, statements, at)
                    .await
            }
            None => Ok(None),
        }
    }

    fn connection_report(
        diff: &DiffResult,
        statements: Vec<String>,
        written: Result<Option<PathBuf>, AppError>,
    ) -> ConnectionReport {
        let (script, persistence_error) = match written {
            Ok(script) => (script, None),
            Err(e) => {
                error!("❌ [{}] {}", diff.label, e);
                (None, Some(e.to_string()))
            }
        };

        ConnectionReport {
            label: diff.label,
            database: diff.database_name.clone(),
            summary: diff.summary(),
            statements,
            script,
            persistence_error,
        }
    }
}
