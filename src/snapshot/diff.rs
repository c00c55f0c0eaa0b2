//! Schema Diff Engine
//!
//! Compares two snapshots in both directions. Each side gets its own
//! `DiffResult` describing what it is missing, or holds differently, to
//! match the other side; recorded values are the counterpart's definitions.

use super::attributes::{
    first_difference, Attribute, COLUMN_ATTRIBUTES, CONSTRAINT_ATTRIBUTES, EVENT_ATTRIBUTES,
    ROUTINE_ATTRIBUTES, TRIGGER_ATTRIBUTES, VIEW_ATTRIBUTES,
};
use crate::connection::ConnectionLabel;
use crate::introspection::{Column, Constraint, Event, Routine, Snapshot, Trigger, View};
use crate::sql::rewrite_schema_name;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::hash::Hash;
use tracing::debug;

/// Table-scoped key: (table, object name)
pub type TableKey = (String, String);

/// Why an object was recorded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Divergence {
    /// Absent on this side
    Missing,
    /// Present on both sides but structurally divergent
    Different,
}

/// Missing / different entries of one object kind
#[derive(Debug, Clone, PartialEq)]
pub struct KindDiff<K: Hash + Eq, V> {
    pub missing: IndexMap<K, V>,
    pub different: IndexMap<K, V>,
}

impl<K: Hash + Eq, V> Default for KindDiff<K, V> {
    fn default() -> Self {
        Self {
            missing: IndexMap::new(),
            different: IndexMap::new(),
        }
    }
}

impl<K: Hash + Eq, V> KindDiff<K, V> {
    /// Record an entry unless the key is already present in either map.
    ///
    /// Returns whether the entry was recorded.
    pub fn record_if_absent(&mut self, divergence: Divergence, key: K, value: V) -> bool {
        if self.missing.contains_key(&key) || self.different.contains_key(&key) {
            return false;
        }

        match divergence {
            Divergence::Missing => self.missing.insert(key, value),
            Divergence::Different => self.different.insert(key, value),
        };
        true
    }

    pub fn is_empty(&self) -> bool {
        self.missing.is_empty() && self.different.is_empty()
    }

    pub fn count(&self) -> KindCount {
        KindCount {
            missing: self.missing.len(),
            different: self.different.len(),
        }
    }
}

/// A table to create, with everything needed to create it
#[derive(Debug, Clone, PartialEq)]
pub struct MissingTable {
    pub name: String,
    pub columns: Vec<Column>,
    pub constraints: Vec<Constraint>,
}

/// What one connection lacks or holds differently
#[derive(Debug, Clone)]
pub struct DiffResult {
    pub label: ConnectionLabel,
    pub database_name: String,
    /// Database the recorded definitions come from
    pub counterpart_database_name: String,
    pub tables: KindDiff<String, MissingTable>,
    pub columns: KindDiff<TableKey, Column>,
    pub constraints: KindDiff<TableKey, Constraint>,
    pub triggers: KindDiff<TableKey, Trigger>,
    pub procedures: KindDiff<String, Routine>,
    pub functions: KindDiff<String, Routine>,
    pub events: KindDiff<String, Event>,
    pub views: KindDiff<String, View>,
}

impl DiffResult {
    pub fn new(label: ConnectionLabel, database_name: &str, counterpart_database_name: &str) -> Self {
        Self {
            label,
            database_name: database_name.to_string(),
            counterpart_database_name: counterpart_database_name.to_string(),
            tables: KindDiff::default(),
            columns: KindDiff::default(),
            constraints: KindDiff::default(),
            triggers: KindDiff::default(),
            procedures: KindDiff::default(),
            functions: KindDiff::default(),
            events: KindDiff::default(),
            views: KindDiff::default(),
        }
    }

    /// Per-kind counts
    pub fn summary(&self) -> DiffSummary {
        DiffSummary {
            tables: self.tables.count(),
            columns: self.columns.count(),
            constraints: self.constraints.count(),
            triggers: self.triggers.count(),
            procedures: self.procedures.count(),
            functions: self.functions.count(),
            events: self.events.count(),
            views: self.views.count(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.summary().total() == 0
    }
}

/// Missing / different counts for one kind
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindCount {
    pub missing: usize,
    pub different: usize,
}

impl KindCount {
    pub fn total(&self) -> usize {
        self.missing + self.different
    }
}

/// Summary statistics for one side
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiffSummary {
    pub tables: KindCount,
    pub columns: KindCount,
    pub constraints: KindCount,
    pub triggers: KindCount,
    pub procedures: KindCount,
    pub functions: KindCount,
    pub events: KindCount,
    pub views: KindCount,
}

impl DiffSummary {
    /// Counts in emission order
    pub fn kinds(&self) -> [(&'static str, KindCount); 8] {
        [
            ("tables", self.tables),
            ("columns", self.columns),
            ("constraints", self.constraints),
            ("triggers", self.triggers),
            ("procedures", self.procedures),
            ("functions", self.functions),
            ("events", self.events),
            ("views", self.views),
        ]
    }

    pub fn total(&self) -> usize {
        self.kinds().iter().map(|(_, count)| count.total()).sum()
    }
}

/// The diff engine that compares schema snapshots
pub struct DiffEngine;

impl DiffEngine {
    /// Compare the source and destination snapshots.
    ///
    /// Returns `(source result, destination result)`.
    pub fn diff(source: &Snapshot, destination: &Snapshot) -> (DiffResult, DiffResult) {
        let source_result = Self::diff_side(ConnectionLabel::Source, source, destination);
        let destination_result = Self::diff_side(ConnectionLabel::Destination, destination, source);

        debug!(
            "Diff complete: {} source entries, {} destination entries",
            source_result.summary().total(),
            destination_result.summary().total()
        );

        (source_result, destination_result)
    }

    /// Everything `ours` needs to match `theirs`
    fn diff_side(label: ConnectionLabel, ours: &Snapshot, theirs: &Snapshot) -> DiffResult {
        let mut result = DiffResult::new(label, &ours.database_name, &theirs.database_name);

        Self::diff_tables(&mut result, ours, theirs);
        Self::diff_table_scoped(
            &mut result.columns,
            COLUMN_ATTRIBUTES,
            ours,
            &ours.columns,
            &theirs.columns,
        );
        Self::diff_table_scoped(
            &mut result.constraints,
            CONSTRAINT_ATTRIBUTES,
            ours,
            &ours.constraints,
            &theirs.constraints,
        );
        Self::diff_table_scoped(
            &mut result.triggers,
            TRIGGER_ATTRIBUTES,
            ours,
            &ours.triggers,
            &theirs.triggers,
        );
        Self::diff_named(&mut result.procedures, ROUTINE_ATTRIBUTES, &ours.procedures, &theirs.procedures);
        Self::diff_named(&mut result.functions, ROUTINE_ATTRIBUTES, &ours.functions, &theirs.functions);
        Self::diff_named(&mut result.events, EVENT_ATTRIBUTES, &ours.events, &theirs.events);

        // Their view definitions name their database; compare them as if
        // they had been written against ours.
        let their_views: IndexMap<String, View> = theirs
            .views
            .iter()
            .map(|(name, view)| {
                let mut view = view.clone();
                view.definition =
                    rewrite_schema_name(&view.definition, &theirs.database_name, &ours.database_name);
                (name.clone(), view)
            })
            .collect();
        Self::diff_named(&mut result.views, VIEW_ATTRIBUTES, &ours.views, &their_views);

        result
    }

    /// Tables present on their side only, with columns and constraints to
    /// create them. Their triggers go along as missing triggers.
    fn diff_tables(result: &mut DiffResult, ours: &Snapshot, theirs: &Snapshot) {
        for table in theirs.tables.iter().filter(|t| !ours.tables.contains(*t)) {
            let missing = MissingTable {
                name: table.clone(),
                columns: theirs.table_columns(table),
                constraints: theirs
                    .constraints
                    .get(table)
                    .map(|c| c.values().cloned().collect())
                    .unwrap_or_default(),
            };
            result.tables.record_if_absent(Divergence::Missing, table.clone(), missing);

            for trigger in theirs.triggers.get(table).into_iter().flat_map(|t| t.values()) {
                result.triggers.record_if_absent(
                    Divergence::Missing,
                    (table.clone(), trigger.name.clone()),
                    trigger.clone(),
                );
            }
        }
    }

    /// Objects scoped to a table that exists on both sides
    fn diff_table_scoped<T: Clone>(
        diff: &mut KindDiff<TableKey, T>,
        attributes: &[Attribute<T>],
        ours_snapshot: &Snapshot,
        ours: &IndexMap<String, IndexMap<String, T>>,
        theirs: &IndexMap<String, IndexMap<String, T>>,
    ) {
        for (table, their_objects) in theirs {
            // missing tables are handled at table level
            if !ours_snapshot.tables.contains(table) {
                continue;
            }
            let our_objects = ours.get(table);

            for (name, their_object) in their_objects {
                let key = (table.clone(), name.clone());
                let object = format!("{}.{}", table, name);
                let our_object = our_objects.and_then(|o| o.get(name));
                Self::compare(diff, attributes, key, &object, their_object, our_object);
            }
        }
    }

    /// Objects keyed by name alone
    fn diff_named<T: Clone>(
        diff: &mut KindDiff<String, T>,
        attributes: &[Attribute<T>],
        ours: &IndexMap<String, T>,
        theirs: &IndexMap<String, T>,
    ) {
        for (name, their_object) in theirs {
            Self::compare(diff, attributes, name.clone(), name, their_object, ours.get(name));
        }
    }

    fn compare<K: Hash + Eq, T: Clone>(
        diff: &mut KindDiff<K, T>,
        attributes: &[Attribute<T>],
        key: K,
        object: &str,
        theirs: &T,
        ours: Option<&T>,
    ) {
        match ours {
            None => {
                diff.record_if_absent(Divergence::Missing, key, theirs.clone());
            }
            Some(ours) => {
                if let Some(attribute) = first_difference(attributes, object, ours, theirs) {
                    debug!("`{}` differs on {}", object, attribute);
                    diff.record_if_absent(Divergence::Different, key, theirs.clone());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::introspection::{ConstraintType, RoutineKind};
    use pretty_assertions::assert_eq;

    fn key(table: &str, name: &str) -> TableKey {
        (table.to_string(), name.to_string())
    }

    fn users_table() -> Vec<Column> {
        vec![
            Column::new("id", "int").not_null().with_key("PRI").with_extra("auto_increment"),
            Column::new("name", "varchar(100)").not_null(),
        ]
    }

    fn rich_snapshot(db: &str) -> Snapshot {
        let mut snapshot = Snapshot::new(db);
        snapshot
            .add_table("users", users_table())
            .add_table(
                "orders",
                vec![
                    Column::new("id", "int").not_null().with_extra("auto_increment"),
                    Column::new("user_id", "int").not_null().with_key("MUL"),
                ],
            )
            .add_constraint(
                Constraint::new("orders", "orders_user_fk", ConstraintType::ForeignKey, &["user_id"])
                    .references("users", &["id"])
                    .with_rules("CASCADE", "RESTRICT"),
            )
            .add_trigger(Trigger::new("orders", "orders_bi", "BEFORE", "INSERT", "SET NEW.id = NEW.id"))
            .add_routine(Routine::new(
                RoutineKind::Procedure,
                "touch",
                "CREATE PROCEDURE `touch`() BEGIN SELECT 1; END",
            ))
            .add_routine(Routine::new(
                RoutineKind::Function,
                "one",
                "CREATE FUNCTION `one`() RETURNS int BEGIN RETURN 1; END",
            ))
            .add_event(Event::new(
                "purge",
                "CREATE EVENT `purge` ON SCHEDULE EVERY 1 DAY DO DELETE FROM orders",
            ))
            .add_view(View::new(
                "v_users",
                format!("select `{db}`.`users`.`id` AS `id` from `{db}`.`users`"),
            ));
        snapshot
    }

    #[test]
    fn test_identical_snapshots_have_no_differences() {
        let a = rich_snapshot("shop");
        let (source, destination) = DiffEngine::diff(&a, &a);

        assert!(source.is_empty());
        assert!(destination.is_empty());
        assert_eq!(source.summary(), DiffSummary::default());
    }

    #[test]
    fn test_same_schema_under_different_database_names_is_identical() {
        let (source, destination) = DiffEngine::diff(&rich_snapshot("shop_a"), &rich_snapshot("shop_b"));

        assert!(source.is_empty());
        assert!(destination.is_empty());
    }

    #[test]
    fn test_missing_table_carries_counterpart_columns() {
        let a = Snapshot::new("a");
        let b = rich_snapshot("b");
        let (a_result, b_result) = DiffEngine::diff(&a, &b);

        assert_eq!(a_result.tables.missing.len(), 2);
        let users = &a_result.tables.missing["users"];
        assert_eq!(users.columns, b.table_columns("users"));

        let orders = &a_result.tables.missing["orders"];
        assert_eq!(orders.constraints.len(), 1);
        assert_eq!(orders.constraints[0].name, "orders_user_fk");

        // columns of a missing table are not repeated at column level
        assert!(a_result.columns.is_empty());
        // triggers of the missing table come along
        assert!(a_result.triggers.missing.contains_key(&key("orders", "orders_bi")));

        assert!(b_result.tables.is_empty());
        assert_eq!(b_result.summary().total(), 0);
    }

    #[test]
    fn test_users_email_scenario() {
        let mut source = Snapshot::new("shop");
        source.add_table("users", users_table());

        let mut with_email = users_table();
        with_email.push(Column::new("email", "varchar(255)"));
        let mut destination = Snapshot::new("shop");
        destination.add_table("users", with_email);

        let (source_result, destination_result) = DiffEngine::diff(&source, &destination);

        assert!(destination_result.is_empty());
        assert_eq!(
            source_result.columns.missing.keys().cloned().collect::<Vec<_>>(),
            vec![key("users", "email")]
        );
        assert_eq!(source_result.columns.missing[&key("users", "email")].column_type, "varchar(255)");
    }

    #[test]
    fn test_column_key_difference_is_ignored() {
        let mut a = Snapshot::new("x");
        a.add_table("t", vec![Column::new("email", "varchar(255)").with_key("UNI")]);
        let mut b = Snapshot::new("x");
        b.add_table("t", vec![Column::new("email", "varchar(255)").with_key("MUL")]);

        let (a_result, b_result) = DiffEngine::diff(&a, &b);
        assert!(a_result.columns.is_empty());
        assert!(b_result.columns.is_empty());
    }

    #[test]
    fn test_different_column_recorded_on_both_sides_with_counterpart_definition() {
        let mut a = Snapshot::new("x");
        a.add_table("t", vec![Column::new("age", "int")]);
        let mut b = Snapshot::new("x");
        b.add_table("t", vec![Column::new("age", "bigint").not_null()]);

        let (a_result, b_result) = DiffEngine::diff(&a, &b);

        assert_eq!(a_result.columns.different[&key("t", "age")].column_type, "bigint");
        assert_eq!(b_result.columns.different[&key("t", "age")].column_type, "int");
        assert!(a_result.columns.missing.is_empty());
    }

    #[test]
    fn test_whitespace_only_body_changes_are_not_different() {
        let a = rich_snapshot("shop");
        let mut b = rich_snapshot("shop");
        b.add_routine(Routine::new(
            RoutineKind::Procedure,
            "touch",
            "CREATE PROCEDURE `touch`()\nBEGIN\n\tSELECT 1 ;\nEND",
        ))
        .add_routine(Routine::new(
            RoutineKind::Function,
            "one",
            "CREATE FUNCTION `one`() RETURNS int\nBEGIN\n  RETURN 1;\nEND",
        ))
        .add_event(Event::new(
            "purge",
            "CREATE EVENT `purge` ON SCHEDULE EVERY 1 DAY\nDO\n  DELETE FROM orders",
        ))
        .add_trigger(Trigger::new("orders", "orders_bi", "BEFORE", "INSERT", "SET  NEW.id = NEW.id"));

        let (a_result, b_result) = DiffEngine::diff(&a, &b);
        assert!(a_result.is_empty());
        assert!(b_result.is_empty());
    }

    #[test]
    fn test_body_change_is_different() {
        let a = rich_snapshot("shop");
        let mut b = rich_snapshot("shop");
        b.add_routine(Routine::new(
            RoutineKind::Procedure,
            "touch",
            "CREATE PROCEDURE `touch`() BEGIN SELECT 2; END",
        ));

        let (a_result, _) = DiffEngine::diff(&a, &b);
        assert_eq!(a_result.procedures.different.len(), 1);
        assert!(a_result.procedures.different["touch"].definition.contains("SELECT 2"));
    }

    #[test]
    fn test_view_with_other_database_name_and_whitespace_is_not_different() {
        let mut a = Snapshot::new("shop_a");
        a.add_view(View::new("v1", "select `shop_a`.`t`.`id` AS `id` from `shop_a`.`t`"));
        let mut b = Snapshot::new("shop_b");
        b.add_view(View::new("v1", "select  `shop_b`.`t`.`id` AS `id`\n from `shop_b`.`t`"));

        let (a_result, b_result) = DiffEngine::diff(&a, &b);
        assert!(a_result.views.is_empty());
        assert!(b_result.views.is_empty());
    }

    #[test]
    fn test_constraint_rule_change_is_different() {
        let a = rich_snapshot("shop");
        let mut b = rich_snapshot("shop");
        b.add_constraint(
            Constraint::new("orders", "orders_user_fk", ConstraintType::ForeignKey, &["user_id"])
                .references("users", &["id"])
                .with_rules("SET NULL", "RESTRICT"),
        );

        let (a_result, b_result) = DiffEngine::diff(&a, &b);
        let fk = &a_result.constraints.different[&key("orders", "orders_user_fk")];
        assert_eq!(fk.delete_rule.as_deref(), Some("SET NULL"));
        assert_eq!(
            b_result.constraints.different[&key("orders", "orders_user_fk")].delete_rule.as_deref(),
            Some("CASCADE")
        );
    }

    #[test]
    fn test_table_without_constraints_still_compares() {
        let mut a = Snapshot::new("x");
        a.add_table("t", vec![Column::new("id", "int")]);
        let mut b = Snapshot::new("x");
        b.add_table("t", vec![Column::new("id", "int")])
            .add_constraint(Constraint::new("t", "PRIMARY", ConstraintType::PrimaryKey, &["id"]));

        let (a_result, b_result) = DiffEngine::diff(&a, &b);
        assert!(a_result.constraints.missing.contains_key(&key("t", "PRIMARY")));
        assert!(b_result.constraints.is_empty());
    }

    #[test]
    fn test_record_if_absent_keeps_first_entry() {
        let mut diff: KindDiff<String, u32> = KindDiff::default();

        assert!(diff.record_if_absent(Divergence::Different, "a".into(), 1));
        assert!(!diff.record_if_absent(Divergence::Different, "a".into(), 2));
        assert!(!diff.record_if_absent(Divergence::Missing, "a".into(), 3));

        assert_eq!(diff.different["a"], 1);
        assert!(diff.missing.is_empty());
        assert_eq!(diff.count(), KindCount { missing: 0, different: 1 });
    }
}
