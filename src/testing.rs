//! In-memory catalog used by unit tests.

use crate::connection::{Catalog, CatalogRow, ConnectionLabel};
use crate::error::AppError;
use async_trait::async_trait;
use indexmap::IndexMap;

/// Catalog that answers queries from canned rows.
///
/// A query is answered by the first registered needle it contains; any
/// other query fails with a `Query` error.
pub struct FakeCatalog {
    label: ConnectionLabel,
    database: String,
    tables: IndexMap<String, Vec<CatalogRow>>,
    responses: Vec<(String, Vec<CatalogRow>)>,
    connection_failures: Vec<String>,
}

impl FakeCatalog {
    pub fn new(label: ConnectionLabel, database: &str) -> Self {
        Self {
            label,
            database: database.to_string(),
            tables: IndexMap::new(),
            responses: Vec::new(),
            connection_failures: Vec::new(),
        }
    }

    pub fn with_table(mut self, table: &str, columns: Vec<CatalogRow>) -> Self {
        self.tables.insert(table.to_string(), columns);
        self
    }

    pub fn respond(mut self, needle: &str, rows: Vec<CatalogRow>) -> Self {
        self.responses.push((needle.to_string(), rows));
        self
    }

    /// Make any query containing `needle` fail as if the server went away
    pub fn fail_connection_on(mut self, needle: &str) -> Self {
        self.connection_failures.push(needle.to_string());
        self
    }

    /// A `SHOW COLUMNS` row
    pub fn column_row(
        field: &str,
        column_type: &str,
        null: &str,
        key: &str,
        default: Option<&str>,
        extra: &str,
    ) -> CatalogRow {
        CatalogRow::from_pairs([
            ("Field", Some(field)),
            ("Type", Some(column_type)),
            ("Null", Some(null)),
            ("Key", Some(key)),
            ("Default", default),
            ("Extra", Some(extra)),
        ])
    }

    /// A constraint join row; `reference` is
    /// `(referenced table, referenced column, delete rule, update rule)`
    pub fn constraint_row(
        table: &str,
        name: &str,
        constraint_type: &str,
        column: &str,
        reference: Option<(&str, &str, &str, &str)>,
    ) -> CatalogRow {
        let (ref_table, ref_column, delete_rule, update_rule) = match reference {
            Some((t, c, d, u)) => (Some(t), Some(c), Some(d), Some(u)),
            None => (None, None, None, None),
        };

        CatalogRow::from_pairs([
            ("CONSTRAINT_NAME", Some(name)),
            ("TABLE_NAME", Some(table)),
            ("CONSTRAINT_TYPE", Some(constraint_type)),
            ("COLUMN_NAME", Some(column)),
            ("REFERENCED_TABLE_NAME", ref_table),
            ("REFERENCED_COLUMN_NAME", ref_column),
            ("UPDATE_RULE", update_rule),
            ("DELETE_RULE", delete_rule),
        ])
    }
}

#[async_trait]
impl Catalog for FakeCatalog {
    fn label(&self) -> ConnectionLabel {
        self.label
    }

    fn database_name(&self) -> &str {
        &self.database
    }

    async fn list_tables(&self) -> Result<Vec<String>, AppError> {
        Ok(self.tables.keys().cloned().collect())
    }

    async fn describe_columns(&self, table: &str) -> Result<Vec<CatalogRow>, AppError> {
        self.tables
            .get(table)
            .cloned()
            .ok_or_else(|| AppError::query(self.label, "describing columns", "no such table"))
    }

    async fn fetch_rows(&self, sql: &str) -> Result<Vec<CatalogRow>, AppError> {
        if self.connection_failures.iter().any(|n| sql.contains(n.as_str())) {
            return Err(AppError::connection(self.label, "server has gone away"));
        }

        self.responses
            .iter()
            .find(|(needle, _)| sql.contains(needle.as_str()))
            .map(|(_, rows)| rows.clone())
            .ok_or_else(|| AppError::query(self.label, sql.trim(), "no canned response"))
    }
}
