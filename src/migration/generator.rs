//! Migration SQL generator
//!
//! Turns one connection's `DiffResult` into MySQL DDL, grouped by kind in
//! a fixed order: tables, columns (constraints last), triggers,
//! procedures, functions, events, views. Within a kind, missing objects
//! come before different ones.

use super::statements::{AlterClause, ColumnClause, ConstraintDefinition, DdlStatement, DropObject};
use crate::introspection::{Column, Constraint, ConstraintType, Event, Routine, Trigger};
use crate::snapshot::{DiffResult, MissingTable, TableKey};
use crate::sql::quote_ident;
use indexmap::{IndexMap, IndexSet};
use tracing::debug;

pub struct MigrationGenerator;

impl MigrationGenerator {
    /// Generate the ordered SQL statements for one connection
    pub fn generate(diff: &DiffResult) -> Vec<String> {
        Self::statements(diff).iter().map(DdlStatement::to_sql).collect()
    }

    /// Generate the ordered typed statements for one connection
    pub fn statements(diff: &DiffResult) -> Vec<DdlStatement> {
        let mut statements = Vec::new();

        statements.extend(diff.tables.missing.values().map(Self::create_table));

        // tables whose missing primary key is declared inline by an added column
        let inline_keys: IndexSet<&str> = diff
            .columns
            .missing
            .iter()
            .filter(|((table, _), column)| {
                Self::declares_primary_key(column, Self::missing_primary_key(diff, table))
            })
            .map(|((table, _), _)| table.as_str())
            .collect();

        statements.extend(Self::per_table(&diff.columns.missing, |table, c| {
            vec![AlterClause::AddColumn(Self::column_clause(
                c,
                Self::missing_primary_key(diff, table),
            ))]
        }));
        statements.extend(Self::per_table(&diff.columns.different, |_, c| {
            vec![AlterClause::ModifyColumn(ColumnClause::for_modify(c))]
        }));
        statements.extend(Self::per_table(&diff.constraints.missing, |table, c| {
            if c.constraint_type == ConstraintType::PrimaryKey && inline_keys.contains(table) {
                return Vec::new();
            }
            Self::add_constraint(c)
        }));
        statements.extend(Self::per_table(&diff.constraints.different, |_, c| {
            Self::replace_constraint(c)
        }));

        for (triggers, replace) in [(&diff.triggers.missing, false), (&diff.triggers.different, true)] {
            statements.extend(triggers.values().map(|t| Self::trigger(t, replace)));
        }
        for (routines, replace) in [
            (&diff.procedures.missing, false),
            (&diff.procedures.different, true),
            (&diff.functions.missing, false),
            (&diff.functions.different, true),
        ] {
            statements.extend(routines.values().map(|r| Self::routine(r, replace)));
        }
        for (events, replace) in [(&diff.events.missing, false), (&diff.events.different, true)] {
            statements.extend(events.values().map(|e| Self::event(e, replace)));
        }
        // definitions were rewritten to this database by the diff engine
        for (views, drop_first) in [(&diff.views.missing, false), (&diff.views.different, true)] {
            statements.extend(views.values().map(|v| DdlStatement::CreateView {
                name: v.name.clone(),
                definition: v.definition.clone(),
                drop_first,
            }));
        }

        debug!(
            "[{}] Generated {} statements for {}",
            diff.label,
            statements.len(),
            diff.database_name
        );

        statements
    }

    fn create_table(table: &MissingTable) -> DdlStatement {
        let primary_key = table
            .constraints
            .iter()
            .find(|c| c.constraint_type == ConstraintType::PrimaryKey);
        let inline_primary_key = table
            .columns
            .iter()
            .any(|c| Self::declares_primary_key(c, primary_key));

        DdlStatement::CreateTable {
            table: table.name.clone(),
            columns: table
                .columns
                .iter()
                .map(|c| Self::column_clause(c, primary_key))
                .collect(),
            constraints: table
                .constraints
                .iter()
                .filter(|c| !(inline_primary_key && c.constraint_type == ConstraintType::PrimaryKey))
                .filter_map(ConstraintDefinition::from_constraint)
                .collect(),
        }
    }

    /// An `auto_increment` column carries `PRIMARY KEY` inline only when
    /// it is the whole primary key
    fn declares_primary_key(column: &Column, primary_key: Option<&Constraint>) -> bool {
        column.is_auto_increment()
            && primary_key.is_some_and(|pk| pk.columns.len() == 1 && pk.columns[0] == column.field)
    }

    fn column_clause(column: &Column, primary_key: Option<&Constraint>) -> ColumnClause {
        if Self::declares_primary_key(column, primary_key) {
            ColumnClause::for_create(column)
        } else {
            ColumnClause::for_modify(column)
        }
    }

    fn missing_primary_key<'a>(diff: &'a DiffResult, table: &str) -> Option<&'a Constraint> {
        diff.constraints
            .missing
            .iter()
            .find(|((t, _), c)| t == table && c.constraint_type == ConstraintType::PrimaryKey)
            .map(|(_, c)| c)
    }

    /// One `ALTER TABLE` per table, tables in first-seen order
    fn per_table<T, F>(entries: &IndexMap<TableKey, T>, clauses: F) -> Vec<DdlStatement>
    where
        F: Fn(&str, &T) -> Vec<AlterClause>,
    {
        let mut grouped: IndexMap<&str, Vec<AlterClause>> = IndexMap::new();
        for ((table, _), entry) in entries {
            grouped
                .entry(table.as_str())
                .or_default()
                .extend(clauses(table, entry));
        }

        grouped
            .into_iter()
            .filter(|(_, clauses)| !clauses.is_empty())
            .map(|(table, clauses)| DdlStatement::AlterTable {
                table: table.to_string(),
                clauses,
            })
            .collect()
    }

    fn add_constraint(constraint: &Constraint) -> Vec<AlterClause> {
        match ConstraintDefinition::from_constraint(constraint) {
            Some(definition) => vec![AlterClause::AddConstraint(definition)],
            None => Self::set_default(constraint).into_iter().collect(),
        }
    }

    /// Drop then recreate; defaults are simply set again
    fn replace_constraint(constraint: &Constraint) -> Vec<AlterClause> {
        let drop = match constraint.constraint_type {
            ConstraintType::PrimaryKey => AlterClause::DropPrimaryKey,
            ConstraintType::Unique | ConstraintType::Index | ConstraintType::Fulltext => {
                AlterClause::DropIndex(constraint.name.clone())
            }
            ConstraintType::ForeignKey => AlterClause::DropForeignKey(constraint.name.clone()),
            ConstraintType::Check => AlterClause::DropCheck(constraint.name.clone()),
            ConstraintType::Default => return Self::set_default(constraint).into_iter().collect(),
        };

        let mut clauses = vec![drop];
        clauses.extend(Self::add_constraint(constraint));
        clauses
    }

    fn set_default(constraint: &Constraint) -> Option<AlterClause> {
        let column = constraint.columns.first()?;
        let default = constraint.column_default.clone()?;

        Some(AlterClause::SetDefault {
            column: column.clone(),
            default,
        })
    }

    fn trigger(trigger: &Trigger, replace: bool) -> DdlStatement {
        DdlStatement::DelimitedCreate {
            drop: replace.then(|| DropObject {
                kind: "TRIGGER",
                name: trigger.name.clone(),
            }),
            create: format!(
                "CREATE TRIGGER {} {} {} ON {} FOR EACH ROW {}",
                quote_ident(&trigger.name),
                trigger.timing,
                trigger.event,
                quote_ident(&trigger.table),
                trigger.statement.trim()
            ),
        }
    }

    fn routine(routine: &Routine, replace: bool) -> DdlStatement {
        DdlStatement::DelimitedCreate {
            drop: replace.then(|| DropObject {
                kind: routine.kind.as_str(),
                name: routine.name.clone(),
            }),
            create: routine.definition.clone(),
        }
    }

    fn event(event: &Event, replace: bool) -> DdlStatement {
        DdlStatement::DelimitedCreate {
            drop: replace.then(|| DropObject {
                kind: "EVENT",
                name: event.name.clone(),
            }),
            create: event.definition.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::ConnectionLabel;
    use crate::introspection::{RoutineKind, Snapshot, View};
    use crate::snapshot::{DiffEngine, Divergence};
    use pretty_assertions::assert_eq;

    fn empty_diff() -> DiffResult {
        DiffResult::new(ConnectionLabel::Source, "shop", "shop_live")
    }

    fn key(table: &str, name: &str) -> TableKey {
        (table.to_string(), name.to_string())
    }

    #[test]
    fn test_missing_foreign_key() {
        let mut diff = empty_diff();
        diff.constraints.record_if_absent(
            Divergence::Missing,
            key("child", "fk1"),
            Constraint::new("child", "fk1", ConstraintType::ForeignKey, &["parent_id"])
                .references("parent", &["id"])
                .with_rules("CASCADE", "RESTRICT"),
        );

        assert_eq!(
            MigrationGenerator::generate(&diff),
            vec![
                "ALTER TABLE `child` ADD CONSTRAINT `fk1` FOREIGN KEY (`parent_id`) REFERENCES `parent` (`id`) ON DELETE CASCADE ON UPDATE RESTRICT;"
            ]
        );
    }

    #[test]
    fn test_users_email_scenario() {
        let mut source = Snapshot::new("shop");
        source.add_table(
            "users",
            vec![
                Column::new("id", "int").not_null().with_extra("auto_increment"),
                Column::new("name", "varchar(100)").not_null(),
            ],
        );
        let mut destination = source.clone();
        destination.add_table(
            "users",
            vec![
                Column::new("id", "int").not_null().with_extra("auto_increment"),
                Column::new("name", "varchar(100)").not_null(),
                Column::new("email", "varchar(255)"),
            ],
        );

        let (source_diff, destination_diff) = DiffEngine::diff(&source, &destination);

        assert_eq!(
            MigrationGenerator::generate(&source_diff),
            vec!["ALTER TABLE `users` ADD COLUMN `email` varchar(255) NULL;"]
        );
        assert!(MigrationGenerator::generate(&destination_diff).is_empty());
    }

    #[test]
    fn test_create_table_inlines_constraints() {
        let mut diff = empty_diff();
        diff.tables.record_if_absent(
            Divergence::Missing,
            "orders".to_string(),
            MissingTable {
                name: "orders".to_string(),
                columns: vec![
                    Column::new("id", "int").not_null().with_extra("auto_increment"),
                    Column::new("user_id", "int").not_null(),
                    Column::new("status", "varchar(20)").not_null().with_default("new"),
                ],
                constraints: vec![
                    Constraint::new("orders", "PRIMARY", ConstraintType::PrimaryKey, &["id"]),
                    Constraint::new("orders", "orders_user_fk", ConstraintType::ForeignKey, &["user_id"])
                        .references("users", &["id"])
                        .with_rules("CASCADE", "CASCADE"),
                    Constraint::new("orders", "status_idx", ConstraintType::Index, &["status"])
                        .with_index_type("BTREE"),
                ],
            },
        );

        assert_eq!(
            MigrationGenerator::generate(&diff),
            vec![concat!(
                "CREATE TABLE IF NOT EXISTS `orders` (\n",
                "    `id` int NOT NULL AUTO_INCREMENT PRIMARY KEY,\n",
                "    `user_id` int NOT NULL,\n",
                "    `status` varchar(20) NOT NULL DEFAULT 'new',\n",
                "    CONSTRAINT `orders_user_fk` FOREIGN KEY (`user_id`) REFERENCES `users` (`id`) ON DELETE CASCADE ON UPDATE CASCADE,\n",
                "    KEY `status_idx` (`status`) USING BTREE\n",
                ") ENGINE=InnoDB DEFAULT CHARSET=UTF8MB4 COLLATE=utf8mb4_general_ci;"
            )]
        );
    }

    #[test]
    fn test_columns_grouped_per_table_add_before_modify() {
        let mut diff = empty_diff();
        diff.columns.record_if_absent(Divergence::Missing, key("a", "x"), Column::new("x", "int"));
        diff.columns.record_if_absent(Divergence::Missing, key("b", "y"), Column::new("y", "int"));
        diff.columns.record_if_absent(Divergence::Missing, key("a", "z"), Column::new("z", "int"));
        diff.columns.record_if_absent(
            Divergence::Different,
            key("a", "w"),
            Column::new("w", "bigint").not_null(),
        );

        assert_eq!(
            MigrationGenerator::generate(&diff),
            vec![
                "ALTER TABLE `a` ADD COLUMN `x` int NULL, ADD COLUMN `z` int NULL;",
                "ALTER TABLE `b` ADD COLUMN `y` int NULL;",
                "ALTER TABLE `a` MODIFY COLUMN `w` bigint NOT NULL;",
            ]
        );
    }

    #[test]
    fn test_different_constraints_drop_then_add() {
        let mut diff = empty_diff();
        diff.constraints.record_if_absent(
            Divergence::Different,
            key("t", "PRIMARY"),
            Constraint::new("t", "PRIMARY", ConstraintType::PrimaryKey, &["a", "b"]),
        );
        diff.constraints.record_if_absent(
            Divergence::Different,
            key("t", "uq_email"),
            Constraint::new("t", "uq_email", ConstraintType::Unique, &["email"]),
        );
        diff.constraints.record_if_absent(
            Divergence::Different,
            key("t", "chk_age"),
            Constraint::new("t", "chk_age", ConstraintType::Check, &[]).with_check_clause("`age` >= 0"),
        );
        diff.constraints.record_if_absent(
            Divergence::Different,
            key("t", "df_status"),
            Constraint::new("t", "df_status", ConstraintType::Default, &["status"])
                .with_column_default("'new'"),
        );

        assert_eq!(
            MigrationGenerator::generate(&diff),
            vec![concat!(
                "ALTER TABLE `t` DROP PRIMARY KEY, ADD PRIMARY KEY (`a`, `b`), ",
                "DROP INDEX `uq_email`, ADD UNIQUE KEY `uq_email` (`email`), ",
                "DROP CONSTRAINT `chk_age`, ADD CONSTRAINT `chk_age` CHECK (`age` >= 0), ",
                "ALTER COLUMN `status` SET DEFAULT 'new';"
            )]
        );
    }

    #[test]
    fn test_delimited_objects_and_kind_order() {
        let mut diff = empty_diff();
        diff.views.record_if_absent(
            Divergence::Missing,
            "v1".to_string(),
            View::new("v1", "select `shop`.`t`.`id` AS `id` from `shop`.`t`"),
        );
        diff.procedures.record_if_absent(
            Divergence::Different,
            "p".to_string(),
            Routine::new(RoutineKind::Procedure, "p", "CREATE PROCEDURE `p`() BEGIN SELECT 1; END"),
        );
        diff.triggers.record_if_absent(
            Divergence::Missing,
            key("t", "t_bi"),
            Trigger::new("t", "t_bi", "BEFORE", "INSERT", "BEGIN SET NEW.a = 1; END"),
        );

        assert_eq!(
            MigrationGenerator::generate(&diff),
            vec![
                "DELIMITER $$\nCREATE TRIGGER `t_bi` BEFORE INSERT ON `t` FOR EACH ROW BEGIN SET NEW.a = 1; END$$\nDELIMITER ;",
                "DROP PROCEDURE IF EXISTS `p`;\nDELIMITER $$\nCREATE PROCEDURE `p`() BEGIN SELECT 1; END$$\nDELIMITER ;",
                "CREATE OR REPLACE VIEW `v1` AS select `shop`.`t`.`id` AS `id` from `shop`.`t`;",
            ]
        );
    }

    #[test]
    fn test_different_view_and_event() {
        let mut diff = empty_diff();
        diff.views.record_if_absent(
            Divergence::Different,
            "v1".to_string(),
            View::new("v1", "select 1 AS `one`"),
        );
        diff.events.record_if_absent(
            Divergence::Missing,
            "purge".to_string(),
            Event::new("purge", "CREATE EVENT `purge` ON SCHEDULE EVERY 1 DAY DO DELETE FROM logs"),
        );

        assert_eq!(
            MigrationGenerator::generate(&diff),
            vec![
                "DELIMITER $$\nCREATE EVENT `purge` ON SCHEDULE EVERY 1 DAY DO DELETE FROM logs$$\nDELIMITER ;",
                "DROP VIEW IF EXISTS `v1`; CREATE OR REPLACE VIEW `v1` AS select 1 AS `one`;",
            ]
        );
    }

    #[test]
    fn test_generation_is_deterministic() {
        let mut a = Snapshot::new("a");
        a.add_table("t", vec![Column::new("id", "int")]);
        let mut b = Snapshot::new("b");
        b.add_table("t", vec![Column::new("id", "bigint"), Column::new("name", "text")])
            .add_table("u", vec![Column::new("id", "int").not_null()]);

        let (a_diff, _) = DiffEngine::diff(&a, &b);

        let first = MigrationGenerator::generate(&a_diff);
        let second = MigrationGenerator::generate(&a_diff);
        assert_eq!(first, second);
        assert_eq!(first.len(), 3);
    }

    fn missing_table(name: &str, columns: Vec<Column>, constraints: Vec<Constraint>) -> DiffResult {
        let mut diff = empty_diff();
        diff.tables.record_if_absent(
            Divergence::Missing,
            name.to_string(),
            MissingTable {
                name: name.to_string(),
                columns,
                constraints,
            },
        );
        diff
    }

    #[test]
    fn test_added_auto_increment_key_column_declares_key_once() {
        let mut source = Snapshot::new("shop");
        source
            .add_table(
                "users",
                vec![
                    Column::new("id", "int").not_null().with_key("PRI").with_extra("auto_increment"),
                    Column::new("name", "varchar(100)").not_null(),
                ],
            )
            .add_constraint(Constraint::new("users", "PRIMARY", ConstraintType::PrimaryKey, &["id"]));
        let mut destination = Snapshot::new("shop");
        destination.add_table("users", vec![Column::new("name", "varchar(100)").not_null()]);

        let (_, destination_diff) = DiffEngine::diff(&source, &destination);

        assert_eq!(destination_diff.constraints.missing.len(), 1);
        assert_eq!(
            MigrationGenerator::generate(&destination_diff),
            vec!["ALTER TABLE `users` ADD COLUMN `id` int NOT NULL AUTO_INCREMENT PRIMARY KEY;"]
        );
    }

    #[test]
    fn test_create_table_keeps_composite_primary_key() {
        let diff = missing_table(
            "events",
            vec![
                Column::new("id", "bigint").not_null().with_extra("auto_increment"),
                Column::new("tenant_id", "int").not_null(),
            ],
            vec![Constraint::new(
                "events",
                "PRIMARY",
                ConstraintType::PrimaryKey,
                &["id", "tenant_id"],
            )],
        );

        assert_eq!(
            MigrationGenerator::generate(&diff),
            vec![concat!(
                "CREATE TABLE IF NOT EXISTS `events` (\n",
                "    `id` bigint NOT NULL AUTO_INCREMENT,\n",
                "    `tenant_id` int NOT NULL,\n",
                "    PRIMARY KEY (`id`, `tenant_id`)\n",
                ") ENGINE=InnoDB DEFAULT CHARSET=UTF8MB4 COLLATE=utf8mb4_general_ci;"
            )]
        );
    }

    #[test]
    fn test_create_table_unique_auto_increment_is_not_primary() {
        let diff = missing_table(
            "tokens",
            vec![
                Column::new("id", "int").not_null().with_extra("auto_increment"),
                Column::new("code", "varchar(20)").not_null(),
            ],
            vec![
                Constraint::new("tokens", "PRIMARY", ConstraintType::PrimaryKey, &["code"]),
                Constraint::new("tokens", "tokens_id_uq", ConstraintType::Unique, &["id"]),
            ],
        );

        assert_eq!(
            MigrationGenerator::generate(&diff),
            vec![concat!(
                "CREATE TABLE IF NOT EXISTS `tokens` (\n",
                "    `id` int NOT NULL AUTO_INCREMENT,\n",
                "    `code` varchar(20) NOT NULL,\n",
                "    PRIMARY KEY (`code`),\n",
                "    UNIQUE KEY `tokens_id_uq` (`id`)\n",
                ") ENGINE=InnoDB DEFAULT CHARSET=UTF8MB4 COLLATE=utf8mb4_general_ci;"
            )]
        );
    }

    #[test]
    fn test_index_and_foreign_key_changes() {
        let mut diff = empty_diff();
        diff.constraints.record_if_absent(
            Divergence::Missing,
            key("posts", "title_idx"),
            Constraint::new("posts", "title_idx", ConstraintType::Index, &["title"])
                .with_index_type("BTREE"),
        );
        diff.constraints.record_if_absent(
            Divergence::Different,
            key("posts", "body_ft"),
            Constraint::new("posts", "body_ft", ConstraintType::Fulltext, &["body"])
                .with_index_type("FULLTEXT"),
        );
        diff.constraints.record_if_absent(
            Divergence::Different,
            key("child", "fk1"),
            Constraint::new("child", "fk1", ConstraintType::ForeignKey, &["parent_id"])
                .references("parent", &["id"])
                .with_rules("SET NULL", "CASCADE"),
        );

        assert_eq!(
            MigrationGenerator::generate(&diff),
            vec![
                "ALTER TABLE `posts` ADD KEY `title_idx` (`title`) USING BTREE;",
                "ALTER TABLE `posts` DROP INDEX `body_ft`, ADD FULLTEXT KEY `body_ft` (`body`);",
                concat!(
                    "ALTER TABLE `child` DROP FOREIGN KEY `fk1`, ",
                    "ADD CONSTRAINT `fk1` FOREIGN KEY (`parent_id`) REFERENCES `parent` (`id`) ",
                    "ON DELETE SET NULL ON UPDATE CASCADE;"
                ),
            ]
        );
    }

    #[test]
    fn test_different_trigger_function_and_event_are_dropped_first() {
        let mut diff = empty_diff();
        diff.events.record_if_absent(
            Divergence::Different,
            "purge".to_string(),
            Event::new("purge", "CREATE EVENT `purge` ON SCHEDULE EVERY 1 HOUR DO DELETE FROM logs;"),
        );
        diff.functions.record_if_absent(
            Divergence::Different,
            "total".to_string(),
            Routine::new(
                RoutineKind::Function,
                "total",
                "CREATE FUNCTION `total`() RETURNS int DETERMINISTIC BEGIN RETURN 1; END",
            ),
        );
        diff.triggers.record_if_absent(
            Divergence::Different,
            key("t", "t_bu"),
            Trigger::new("t", "t_bu", "BEFORE", "UPDATE", "SET NEW.updated_at = NOW()"),
        );

        assert_eq!(
            MigrationGenerator::generate(&diff),
            vec![
                "DROP TRIGGER IF EXISTS `t_bu`;\nDELIMITER $$\nCREATE TRIGGER `t_bu` BEFORE UPDATE ON `t` FOR EACH ROW SET NEW.updated_at = NOW()$$\nDELIMITER ;",
                "DROP FUNCTION IF EXISTS `total`;\nDELIMITER $$\nCREATE FUNCTION `total`() RETURNS int DETERMINISTIC BEGIN RETURN 1; END$$\nDELIMITER ;",
                "DROP EVENT IF EXISTS `purge`;\nDELIMITER $$\nCREATE EVENT `purge` ON SCHEDULE EVERY 1 HOUR DO DELETE FROM logs$$\nDELIMITER ;",
            ]
        );
    }

    #[test]
    fn test_view_definition_is_rewritten_once() {
        let source = Snapshot::new("shop");
        let mut destination = Snapshot::new("shop_live");
        destination.add_view(View::new(
            "v1",
            "select `shop_live`.`t`.`id` AS `id` from `shop_live`.`t`",
        ));

        let (source_diff, _) = DiffEngine::diff(&source, &destination);
        let expected = "select `shop`.`t`.`id` AS `id` from `shop`.`t`";

        assert_eq!(source_diff.views.missing["v1"].definition, expected);
        assert_eq!(
            MigrationGenerator::generate(&source_diff),
            vec![format!("CREATE OR REPLACE VIEW `v1` AS {};", expected)]
        );
    }
}
