//! Schema Introspection Module
//!
//! Builds a normalized, in-memory snapshot of one MySQL/MariaDB database:
//! tables, columns, constraints, triggers, procedures, functions, events
//! and views.

use crate::connection::{Catalog, CatalogRow, ConnectionLabel};
use crate::error::AppError;
use crate::sql::{quote_ident, quote_literal};
use chrono::{DateTime, Utc};
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::future::Future;
use tracing::{debug, warn};

/// Complete schema snapshot of one connection
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    pub database_name: String,
    pub captured_at: DateTime<Utc>,
    pub tables: IndexSet<String>,
    /// table -> field -> column, in catalog order
    pub columns: IndexMap<String, IndexMap<String, Column>>,
    /// table -> constraint name -> constraint
    pub constraints: IndexMap<String, IndexMap<String, Constraint>>,
    /// table -> trigger name -> trigger
    pub triggers: IndexMap<String, IndexMap<String, Trigger>>,
    pub procedures: IndexMap<String, Routine>,
    pub functions: IndexMap<String, Routine>,
    pub events: IndexMap<String, Event>,
    pub views: IndexMap<String, View>,
}

impl Snapshot {
    pub fn new(database_name: impl Into<String>) -> Self {
        Self {
            database_name: database_name.into(),
            captured_at: Utc::now(),
            tables: IndexSet::new(),
            columns: IndexMap::new(),
            constraints: IndexMap::new(),
            triggers: IndexMap::new(),
            procedures: IndexMap::new(),
            functions: IndexMap::new(),
            events: IndexMap::new(),
            views: IndexMap::new(),
        }
    }

    /// Register a table with its columns.
    ///
    /// Every table gets a (possibly empty) constraint and trigger map.
    pub fn add_table(&mut self, table: impl Into<String>, columns: Vec<Column>) -> &mut Self {
        let table = table.into();
        self.tables.insert(table.clone());
        self.columns.insert(
            table.clone(),
            columns.into_iter().map(|c| (c.field.clone(), c)).collect(),
        );
        self.constraints.entry(table.clone()).or_default();
        self.triggers.entry(table).or_default();
        self
    }

    pub fn add_constraint(&mut self, constraint: Constraint) -> &mut Self {
        self.constraints
            .entry(constraint.table.clone())
            .or_default()
            .insert(constraint.name.clone(), constraint);
        self
    }

    pub fn add_trigger(&mut self, trigger: Trigger) -> &mut Self {
        self.triggers
            .entry(trigger.table.clone())
            .or_default()
            .insert(trigger.name.clone(), trigger);
        self
    }

    pub fn add_routine(&mut self, routine: Routine) -> &mut Self {
        let map = match routine.kind {
            RoutineKind::Procedure => &mut self.procedures,
            RoutineKind::Function => &mut self.functions,
        };
        map.insert(routine.name.clone(), routine);
        self
    }

    pub fn add_event(&mut self, event: Event) -> &mut Self {
        self.events.insert(event.name.clone(), event);
        self
    }

    pub fn add_view(&mut self, view: View) -> &mut Self {
        self.views.insert(view.name.clone(), view);
        self
    }

    /// Columns of a table in catalog order
    pub fn table_columns(&self, table: &str) -> Vec<Column> {
        self.columns
            .get(table)
            .map(|cols| cols.values().cloned().collect())
            .unwrap_or_default()
    }

    /// Compute checksum from schema content (capture time excluded)
    pub fn checksum(&self) -> String {
        let mut hasher = Sha256::new();

        let content = serde_json::to_vec(&(
            &self.tables,
            &self.columns,
            &self.constraints,
            &self.triggers,
            &self.procedures,
            &self.functions,
            &self.events,
            &self.views,
        ))
        .unwrap_or_default();
        hasher.update(&content);

        format!("{:x}", hasher.finalize())
    }
}

/// Column as described by `SHOW COLUMNS`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    pub field: String,
    pub column_type: String,
    pub nullable: bool,
    /// PRI / UNI / MUL or empty
    pub key: String,
    pub default_value: Option<String>,
    pub extra: Option<String>,
}

impl Column {
    pub fn new(field: impl Into<String>, column_type: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            column_type: column_type.into(),
            nullable: true,
            key: String::new(),
            default_value: None,
            extra: None,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = key.into();
        self
    }

    pub fn with_default(mut self, default: impl Into<String>) -> Self {
        self.default_value = Some(default.into());
        self
    }

    pub fn with_extra(mut self, extra: impl Into<String>) -> Self {
        self.extra = Some(extra.into());
        self
    }

    pub fn is_auto_increment(&self) -> bool {
        self.extra
            .as_deref()
            .is_some_and(|e| e.to_ascii_lowercase().contains("auto_increment"))
    }

    /// `on update CURRENT_TIMESTAMP`, also when MySQL 8 prefixes it with
    /// `DEFAULT_GENERATED`
    pub fn updates_on_current_timestamp(&self) -> bool {
        self.extra
            .as_deref()
            .is_some_and(|e| e.to_ascii_lowercase().contains("on update current_timestamp"))
    }
}

/// Kinds of table constraints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConstraintType {
    PrimaryKey,
    Unique,
    ForeignKey,
    Check,
    Index,
    Fulltext,
    Default,
}

impl ConstraintType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConstraintType::PrimaryKey => "PRIMARY KEY",
            ConstraintType::Unique => "UNIQUE",
            ConstraintType::ForeignKey => "FOREIGN KEY",
            ConstraintType::Check => "CHECK",
            ConstraintType::Index => "INDEX",
            ConstraintType::Fulltext => "FULLTEXT",
            ConstraintType::Default => "DEFAULT",
        }
    }

    /// Parse the catalog spelling (`TABLE_CONSTRAINTS.CONSTRAINT_TYPE`)
    pub fn from_catalog(value: &str) -> Option<Self> {
        match value.trim().to_ascii_uppercase().as_str() {
            "PRIMARY KEY" => Some(ConstraintType::PrimaryKey),
            "UNIQUE" => Some(ConstraintType::Unique),
            "FOREIGN KEY" => Some(ConstraintType::ForeignKey),
            "CHECK" => Some(ConstraintType::Check),
            "INDEX" => Some(ConstraintType::Index),
            "FULLTEXT" => Some(ConstraintType::Fulltext),
            "DEFAULT" => Some(ConstraintType::Default),
            _ => None,
        }
    }
}

/// Table constraint or index.
///
/// Not every field applies to every type; unused ones stay empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Constraint {
    pub name: String,
    pub table: String,
    pub constraint_type: ConstraintType,
    /// Key columns in ordinal order
    pub columns: Vec<String>,
    pub referenced_table: Option<String>,
    pub referenced_columns: Vec<String>,
    pub update_rule: Option<String>,
    pub delete_rule: Option<String>,
    pub check_clause: Option<String>,
    pub index_type: Option<String>,
    pub column_default: Option<String>,
}

impl Constraint {
    pub fn new(
        table: impl Into<String>,
        name: impl Into<String>,
        constraint_type: ConstraintType,
        columns: &[&str],
    ) -> Self {
        Self {
            name: name.into(),
            table: table.into(),
            constraint_type,
            columns: columns.iter().map(|c| c.to_string()).collect(),
            referenced_table: None,
            referenced_columns: Vec::new(),
            update_rule: None,
            delete_rule: None,
            check_clause: None,
            index_type: None,
            column_default: None,
        }
    }

    pub fn references(mut self, table: impl Into<String>, columns: &[&str]) -> Self {
        self.referenced_table = Some(table.into());
        self.referenced_columns = columns.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn with_rules(mut self, on_delete: impl Into<String>, on_update: impl Into<String>) -> Self {
        self.delete_rule = Some(on_delete.into());
        self.update_rule = Some(on_update.into());
        self
    }

    pub fn with_check_clause(mut self, clause: impl Into<String>) -> Self {
        self.check_clause = Some(clause.into());
        self
    }

    pub fn with_index_type(mut self, index_type: impl Into<String>) -> Self {
        self.index_type = Some(index_type.into());
        self
    }

    pub fn with_column_default(mut self, default: impl Into<String>) -> Self {
        self.column_default = Some(default.into());
        self
    }
}

/// Trigger as described by `SHOW TRIGGERS`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trigger {
    pub name: String,
    pub table: String,
    /// INSERT / UPDATE / DELETE
    pub event: String,
    /// BEFORE / AFTER
    pub timing: String,
    pub statement: String,
    pub sql_mode: Option<String>,
    pub definer: Option<String>,
    pub character_set_client: Option<String>,
    pub collation_connection: Option<String>,
    pub database_collation: Option<String>,
}

impl Trigger {
    pub fn new(
        table: impl Into<String>,
        name: impl Into<String>,
        timing: impl Into<String>,
        event: impl Into<String>,
        statement: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            table: table.into(),
            event: event.into(),
            timing: timing.into(),
            statement: statement.into(),
            sql_mode: None,
            definer: None,
            character_set_client: None,
            collation_connection: None,
            database_collation: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoutineKind {
    Procedure,
    Function,
}

impl RoutineKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoutineKind::Procedure => "PROCEDURE",
            RoutineKind::Function => "FUNCTION",
        }
    }
}

/// Stored procedure or function
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Routine {
    pub name: String,
    pub kind: RoutineKind,
    pub definer: Option<String>,
    pub security_type: Option<String>,
    pub comment: Option<String>,
    pub character_set_client: Option<String>,
    pub collation_connection: Option<String>,
    pub database_collation: Option<String>,
    /// Full `CREATE PROCEDURE` / `CREATE FUNCTION` text
    pub definition: String,
}

impl Routine {
    pub fn new(kind: RoutineKind, name: impl Into<String>, definition: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            definer: None,
            security_type: None,
            comment: None,
            character_set_client: None,
            collation_connection: None,
            database_collation: None,
            definition: definition.into(),
        }
    }
}

/// Scheduled event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub name: String,
    pub definer: Option<String>,
    pub time_zone: Option<String>,
    pub execute_at: Option<String>,
    pub interval_value: Option<String>,
    pub interval_field: Option<String>,
    pub starts: Option<String>,
    pub ends: Option<String>,
    pub status: Option<String>,
    pub originator: Option<String>,
    pub character_set_client: Option<String>,
    pub collation_connection: Option<String>,
    pub database_collation: Option<String>,
    /// Full `CREATE EVENT` text
    pub definition: String,
}

impl Event {
    pub fn new(name: impl Into<String>, definition: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            definer: None,
            time_zone: None,
            execute_at: None,
            interval_value: None,
            interval_field: None,
            starts: None,
            ends: None,
            status: None,
            originator: None,
            character_set_client: None,
            collation_connection: None,
            database_collation: None,
            definition: definition.into(),
        }
    }
}

/// View as described by `information_schema.VIEWS`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct View {
    pub name: String,
    /// The `SELECT` body
    pub definition: String,
    pub check_option: Option<String>,
    pub is_updatable: Option<String>,
    pub definer: Option<String>,
    pub security_type: Option<String>,
    pub character_set_client: Option<String>,
    pub collation_connection: Option<String>,
}

impl View {
    pub fn new(name: impl Into<String>, definition: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            definition: definition.into(),
            check_option: None,
            is_updatable: None,
            definer: None,
            security_type: None,
            character_set_client: None,
            collation_connection: None,
        }
    }
}

/// Schema introspector for MySQL / MariaDB
pub struct MySqlIntrospector;

impl MySqlIntrospector {
    /// Introspect the complete schema behind a catalog handle.
    ///
    /// Table, column, constraint and view queries are mandatory; trigger,
    /// routine, event and the supplemental index/check queries are
    /// optional catalog features and degrade to empty maps.
    pub async fn introspect<C>(catalog: &C) -> Result<Snapshot, AppError>
    where
        C: Catalog + ?Sized,
    {
        let label = catalog.label();
        let mut snapshot = Snapshot::new(catalog.database_name());

        Self::load_tables(catalog, &mut snapshot).await?;
        Self::load_constraints(catalog, &mut snapshot).await?;

        let indexes = Self::optional(label, "indexes", Self::get_indexes(catalog, &snapshot)).await?;
        for index in indexes.into_iter().flatten() {
            snapshot.add_constraint(index);
        }

        let checks =
            Self::optional(label, "check constraints", Self::get_checks(catalog, &snapshot)).await?;
        for check in checks.into_iter().flatten() {
            snapshot.add_constraint(check);
        }

        let triggers =
            Self::optional(label, "triggers", Self::get_triggers(catalog, &snapshot)).await?;
        for trigger in triggers.into_iter().flatten() {
            snapshot.add_trigger(trigger);
        }

        for kind in [RoutineKind::Procedure, RoutineKind::Function] {
            let routines =
                Self::optional(label, kind.as_str(), Self::get_routines(catalog, kind)).await?;
            for routine in routines.into_iter().flatten() {
                snapshot.add_routine(routine);
            }
        }

        let events = Self::optional(label, "events", Self::get_events(catalog)).await?;
        for event in events.into_iter().flatten() {
            snapshot.add_event(event);
        }

        for view in Self::get_views(catalog).await? {
            snapshot.add_view(view);
        }

        debug!(
            "[{}] Introspected {}: {} tables, {} constraints, {} triggers, {} procedures, {} functions, {} events, {} views",
            label,
            snapshot.database_name,
            snapshot.tables.len(),
            snapshot.constraints.values().map(|c| c.len()).sum::<usize>(),
            snapshot.triggers.values().map(|t| t.len()).sum::<usize>(),
            snapshot.procedures.len(),
            snapshot.functions.len(),
            snapshot.events.len(),
            snapshot.views.len(),
        );

        Ok(snapshot)
    }

    /// Run an optional catalog lookup; query failures become `None`
    async fn optional<T, F>(label: ConnectionLabel, what: &str, fut: F) -> Result<Option<T>, AppError>
    where
        F: Future<Output = Result<T, AppError>>,
    {
        match fut.await {
            Ok(value) => Ok(Some(value)),
            Err(err @ AppError::Query { .. }) => {
                warn!("[{}] Skipping {}: {}", label, what, err);
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }

    fn shape_error(label: ConnectionLabel, context: &str) -> impl Fn(String) -> AppError + '_ {
        move |message| AppError::query(label, context, message)
    }

    /// Get all base tables with their columns
    async fn load_tables<C>(catalog: &C, snapshot: &mut Snapshot) -> Result<(), AppError>
    where
        C: Catalog + ?Sized,
    {
        let label = catalog.label();

        for table in catalog.list_tables().await? {
            let rows = catalog.describe_columns(&table).await?;
            let context = format!("describing columns of {}", table);

            let columns = rows
                .iter()
                .map(|row| Self::column_from_row(row).map_err(Self::shape_error(label, &context)))
                .collect::<Result<Vec<_>, _>>()?;

            snapshot.add_table(table, columns);
        }

        Ok(())
    }

    fn column_from_row(row: &CatalogRow) -> Result<Column, String> {
        Ok(Column {
            field: row.require("Field")?,
            column_type: row.require("Type")?,
            nullable: row.get("Null").is_some_and(|n| n.eq_ignore_ascii_case("YES")),
            key: row.text("Key").unwrap_or_default(),
            default_value: row.text("Default"),
            extra: row.text("Extra").filter(|e| !e.trim().is_empty()),
        })
    }

    /// Key-based constraints from the constraint / key-usage / referential join
    async fn load_constraints<C>(catalog: &C, snapshot: &mut Snapshot) -> Result<(), AppError>
    where
        C: Catalog + ?Sized,
    {
        let label = catalog.label();
        let context = "loading constraints";
        let query = format!(
            r#"
            SELECT
                tc.CONSTRAINT_NAME,
                tc.TABLE_NAME,
                tc.CONSTRAINT_TYPE,
                kcu.COLUMN_NAME,
                kcu.REFERENCED_TABLE_NAME,
                kcu.REFERENCED_COLUMN_NAME,
                rc.UPDATE_RULE,
                rc.DELETE_RULE
            FROM information_schema.TABLE_CONSTRAINTS tc
            JOIN information_schema.KEY_COLUMN_USAGE kcu
                ON tc.CONSTRAINT_CATALOG = kcu.CONSTRAINT_CATALOG
                AND tc.CONSTRAINT_SCHEMA = kcu.CONSTRAINT_SCHEMA
                AND tc.CONSTRAINT_NAME = kcu.CONSTRAINT_NAME
                AND tc.TABLE_NAME = kcu.TABLE_NAME
            LEFT JOIN information_schema.REFERENTIAL_CONSTRAINTS rc
                ON tc.CONSTRAINT_CATALOG = rc.CONSTRAINT_CATALOG
                AND tc.CONSTRAINT_SCHEMA = rc.CONSTRAINT_SCHEMA
                AND tc.CONSTRAINT_NAME = rc.CONSTRAINT_NAME
                AND tc.TABLE_NAME = rc.TABLE_NAME
            WHERE tc.CONSTRAINT_SCHEMA = {}
            ORDER BY tc.TABLE_NAME, tc.CONSTRAINT_NAME, kcu.ORDINAL_POSITION
            "#,
            quote_literal(catalog.database_name())
        );

        let rows = catalog.fetch_rows(&query).await?;
        let err = Self::shape_error(label, context);

        // Multi-column keys come back one row per column
        let mut grouped: IndexMap<(String, String), Constraint> = IndexMap::new();
        for row in &rows {
            let table = row.require("TABLE_NAME").map_err(&err)?;
            if !snapshot.tables.contains(&table) {
                continue;
            }
            let name = row.require("CONSTRAINT_NAME").map_err(&err)?;
            let raw_type = row.require("CONSTRAINT_TYPE").map_err(&err)?;
            let constraint_type = ConstraintType::from_catalog(&raw_type)
                .ok_or_else(|| err(format!("unknown constraint type `{}`", raw_type)))?;

            let entry = grouped
                .entry((table.clone(), name.clone()))
                .or_insert_with(|| Constraint {
                    name,
                    table,
                    constraint_type,
                    columns: Vec::new(),
                    referenced_table: row.text("REFERENCED_TABLE_NAME"),
                    referenced_columns: Vec::new(),
                    update_rule: row.text("UPDATE_RULE"),
                    delete_rule: row.text("DELETE_RULE"),
                    check_clause: None,
                    index_type: None,
                    column_default: None,
                });

            if let Some(column) = row.text("COLUMN_NAME") {
                entry.columns.push(column);
            }
            if let Some(referenced) = row.text("REFERENCED_COLUMN_NAME") {
                entry.referenced_columns.push(referenced);
            }
        }

        for constraint in grouped.into_values() {
            snapshot.add_constraint(constraint);
        }

        Ok(())
    }

    /// Non-unique indexes that are not already backing a key constraint
    async fn get_indexes<C>(catalog: &C, snapshot: &Snapshot) -> Result<Vec<Constraint>, AppError>
    where
        C: Catalog + ?Sized,
    {
        let query = format!(
            r#"
            SELECT TABLE_NAME, INDEX_NAME, COLUMN_NAME, INDEX_TYPE
            FROM information_schema.STATISTICS
            WHERE TABLE_SCHEMA = {} AND NON_UNIQUE = 1
            ORDER BY TABLE_NAME, INDEX_NAME, SEQ_IN_INDEX
            "#,
            quote_literal(catalog.database_name())
        );

        let rows = catalog.fetch_rows(&query).await?;
        let err = Self::shape_error(catalog.label(), "loading indexes");

        let mut indexes: IndexMap<(String, String), Constraint> = IndexMap::new();
        for row in &rows {
            let table = row.require("TABLE_NAME").map_err(&err)?;
            let name = row.require("INDEX_NAME").map_err(&err)?;

            let known = snapshot
                .constraints
                .get(&table)
                .is_some_and(|c| c.contains_key(&name));
            if known || !snapshot.tables.contains(&table) {
                continue;
            }

            let index_type = row.text("INDEX_TYPE");
            let constraint_type = match index_type.as_deref() {
                Some(t) if t.eq_ignore_ascii_case("FULLTEXT") => ConstraintType::Fulltext,
                _ => ConstraintType::Index,
            };

            let entry = indexes
                .entry((table.clone(), name.clone()))
                .or_insert_with(|| {
                    let mut index = Constraint::new(table, name, constraint_type, &[]);
                    index.index_type = index_type;
                    index
                });
            if let Some(column) = row.text("COLUMN_NAME") {
                entry.columns.push(column);
            }
        }

        Ok(indexes.into_values().collect())
    }

    /// CHECK constraints (MySQL 8.0.16+ / MariaDB 10.2+)
    async fn get_checks<C>(catalog: &C, snapshot: &Snapshot) -> Result<Vec<Constraint>, AppError>
    where
        C: Catalog + ?Sized,
    {
        let query = format!(
            r#"
            SELECT tc.TABLE_NAME, cc.CONSTRAINT_NAME, cc.CHECK_CLAUSE
            FROM information_schema.CHECK_CONSTRAINTS cc
            JOIN information_schema.TABLE_CONSTRAINTS tc
                ON tc.CONSTRAINT_SCHEMA = cc.CONSTRAINT_SCHEMA
                AND tc.CONSTRAINT_NAME = cc.CONSTRAINT_NAME
                AND tc.CONSTRAINT_TYPE = 'CHECK'
            WHERE cc.CONSTRAINT_SCHEMA = {}
            ORDER BY tc.TABLE_NAME, cc.CONSTRAINT_NAME
            "#,
            quote_literal(catalog.database_name())
        );

        let rows = catalog.fetch_rows(&query).await?;
        let err = Self::shape_error(catalog.label(), "loading check constraints");

        let mut checks = Vec::new();
        for row in &rows {
            let table = row.require("TABLE_NAME").map_err(&err)?;
            if !snapshot.tables.contains(&table) {
                continue;
            }
            let name = row.require("CONSTRAINT_NAME").map_err(&err)?;
            let clause = row.require("CHECK_CLAUSE").map_err(&err)?;

            checks.push(
                Constraint::new(table, name, ConstraintType::Check, &[]).with_check_clause(clause),
            );
        }

        Ok(checks)
    }

    /// Triggers of every introspected table
    async fn get_triggers<C>(catalog: &C, snapshot: &Snapshot) -> Result<Vec<Trigger>, AppError>
    where
        C: Catalog + ?Sized,
    {
        let query = format!("SHOW TRIGGERS FROM {}", quote_ident(catalog.database_name()));
        let rows = catalog.fetch_rows(&query).await?;
        let err = Self::shape_error(catalog.label(), "loading triggers");

        let mut triggers = Vec::new();
        for row in &rows {
            let table = row.require("Table").map_err(&err)?;
            if !snapshot.tables.contains(&table) {
                continue;
            }

            triggers.push(Trigger {
                name: row.require("Trigger").map_err(&err)?,
                table,
                event: row.require("Event").map_err(&err)?,
                timing: row.require("Timing").map_err(&err)?,
                statement: row.require("Statement").map_err(&err)?,
                sql_mode: row.text("sql_mode"),
                definer: row.text("Definer"),
                character_set_client: row.text("character_set_client"),
                collation_connection: row.text("collation_connection"),
                database_collation: row.text("Database Collation"),
            });
        }

        Ok(triggers)
    }

    /// Procedures or functions, each with its `SHOW CREATE` text
    async fn get_routines<C>(catalog: &C, kind: RoutineKind) -> Result<Vec<Routine>, AppError>
    where
        C: Catalog + ?Sized,
    {
        let db = catalog.database_name();
        let context = format!("loading {} definitions", kind.as_str().to_lowercase());
        let err = Self::shape_error(catalog.label(), &context);

        let query = format!("SHOW {} STATUS WHERE Db = {}", kind.as_str(), quote_literal(db));
        let rows = catalog.fetch_rows(&query).await?;

        let create_column = match kind {
            RoutineKind::Procedure => "Create Procedure",
            RoutineKind::Function => "Create Function",
        };

        let mut routines = Vec::new();
        for row in &rows {
            let name = row.require("Name").map_err(&err)?;
            let show_create = format!(
                "SHOW CREATE {} {}.{}",
                kind.as_str(),
                quote_ident(db),
                quote_ident(&name)
            );
            let definition = catalog
                .fetch_rows(&show_create)
                .await?
                .first()
                .and_then(|r| r.text(create_column))
                .ok_or_else(|| err(format!("no definition text for {}", name)))?;

            routines.push(Routine {
                name,
                kind,
                definer: row.text("Definer"),
                security_type: row.text("Security_type"),
                comment: row.text("Comment"),
                character_set_client: row.text("character_set_client"),
                collation_connection: row.text("collation_connection"),
                database_collation: row.text("Database Collation"),
                definition,
            });
        }

        Ok(routines)
    }

    /// Scheduled events, each with its `SHOW CREATE EVENT` text
    async fn get_events<C>(catalog: &C) -> Result<Vec<Event>, AppError>
    where
        C: Catalog + ?Sized,
    {
        let db = catalog.database_name();
        let err = Self::shape_error(catalog.label(), "loading events");

        let rows = catalog
            .fetch_rows(&format!("SHOW EVENTS FROM {}", quote_ident(db)))
            .await?;

        let mut events = Vec::new();
        for row in &rows {
            let name = row.require("Name").map_err(&err)?;
            let show_create = format!("SHOW CREATE EVENT {}.{}", quote_ident(db), quote_ident(&name));
            let definition = catalog
                .fetch_rows(&show_create)
                .await?
                .first()
                .and_then(|r| r.text("Create Event"))
                .ok_or_else(|| err(format!("no definition text for {}", name)))?;

            events.push(Event {
                name,
                definer: row.text("Definer"),
                time_zone: row.text("Time zone"),
                execute_at: row.text("Execute at"),
                interval_value: row.text("Interval value"),
                interval_field: row.text("Interval field"),
                starts: row.text("Starts"),
                ends: row.text("Ends"),
                status: row.text("Status"),
                originator: row.text("Originator"),
                character_set_client: row.text("character_set_client"),
                collation_connection: row.text("collation_connection"),
                database_collation: row.text("Database Collation"),
                definition,
            });
        }

        Ok(events)
    }

    /// All views of the database
    async fn get_views<C>(catalog: &C) -> Result<Vec<View>, AppError>
    where
        C: Catalog + ?Sized,
    {
        let query = format!(
            r#"
            SELECT
                TABLE_NAME,
                VIEW_DEFINITION,
                CHECK_OPTION,
                IS_UPDATABLE,
                DEFINER,
                SECURITY_TYPE,
                CHARACTER_SET_CLIENT,
                COLLATION_CONNECTION
            FROM information_schema.VIEWS
            WHERE TABLE_SCHEMA = {}
            "#,
            quote_literal(catalog.database_name())
        );

        let rows = catalog.fetch_rows(&query).await?;
        let err = Self::shape_error(catalog.label(), "loading views");

        rows.iter()
            .map(|row| {
                Ok(View {
                    name: row.require("TABLE_NAME").map_err(&err)?,
                    definition: row.text("VIEW_DEFINITION").unwrap_or_default(),
                    check_option: row.text("CHECK_OPTION"),
                    is_updatable: row.text("IS_UPDATABLE"),
                    definer: row.text("DEFINER"),
                    security_type: row.text("SECURITY_TYPE"),
                    character_set_client: row.text("CHARACTER_SET_CLIENT"),
                    collation_connection: row.text("COLLATION_CONNECTION"),
                })
            })
            .collect()
    }
}
