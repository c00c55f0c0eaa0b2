//! Typed DDL statements
//!
//! Every generated statement is built as a value first and serialized with
//! `to_sql()`, so quoting lives in one place.

use crate::introspection::{Column, Constraint, ConstraintType};
use crate::sql::{quote_ident, quote_ident_list, quote_literal};
use once_cell::sync::Lazy;
use regex::Regex;

/// Table options appended to every created table
pub const TABLE_OPTIONS: &str = "ENGINE=InnoDB DEFAULT CHARSET=UTF8MB4 COLLATE=utf8mb4_general_ci";

static TIMESTAMP_EXPRESSION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(current_timestamp|now|localtime|localtimestamp)(\(\d*\))?$")
        .expect("valid regex")
});

/// Render a column default as SQL
pub fn render_default(value: &str, generated: bool) -> String {
    if value.eq_ignore_ascii_case("NULL") || TIMESTAMP_EXPRESSION.is_match(value.trim()) {
        value.to_string()
    } else if generated {
        // MySQL 8 expression defaults must be parenthesized
        format!("({})", value)
    } else {
        quote_literal(value)
    }
}

/// What follows the default in a column clause
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnModifier {
    None,
    AutoIncrement,
    AutoIncrementPrimaryKey,
    OnUpdateCurrentTimestamp,
}

/// `` `field` type NOT NULL|NULL [DEFAULT v] [modifier] ``
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnClause {
    pub field: String,
    pub column_type: String,
    pub nullable: bool,
    /// Already rendered
    pub default: Option<String>,
    pub modifier: ColumnModifier,
}

impl ColumnClause {
    /// Clause for a column that is the whole primary key; an
    /// `auto_increment` column declares `PRIMARY KEY` inline
    pub fn for_create(column: &Column) -> Self {
        Self::build(column, ColumnModifier::AutoIncrementPrimaryKey)
    }

    /// Clause with key membership left to the constraints
    pub fn for_modify(column: &Column) -> Self {
        Self::build(column, ColumnModifier::AutoIncrement)
    }

    fn build(column: &Column, auto_increment: ColumnModifier) -> Self {
        let generated = column
            .extra
            .as_deref()
            .is_some_and(|e| e.to_ascii_uppercase().contains("DEFAULT_GENERATED"));

        let modifier = if column.is_auto_increment() {
            auto_increment
        } else if column.updates_on_current_timestamp() {
            ColumnModifier::OnUpdateCurrentTimestamp
        } else {
            ColumnModifier::None
        };

        Self {
            field: column.field.clone(),
            column_type: column.column_type.clone(),
            nullable: column.nullable,
            default: column
                .default_value
                .as_deref()
                .map(|d| render_default(d, generated)),
            modifier,
        }
    }

    pub fn to_sql(&self) -> String {
        let mut sql = format!(
            "{} {} {}",
            quote_ident(&self.field),
            self.column_type,
            if self.nullable { "NULL" } else { "NOT NULL" }
        );

        if let Some(default) = &self.default {
            sql.push_str(" DEFAULT ");
            sql.push_str(default);
        }

        match self.modifier {
            ColumnModifier::None => {}
            ColumnModifier::AutoIncrement => sql.push_str(" AUTO_INCREMENT"),
            ColumnModifier::AutoIncrementPrimaryKey => sql.push_str(" AUTO_INCREMENT PRIMARY KEY"),
            ColumnModifier::OnUpdateCurrentTimestamp => sql.push_str(" ON UPDATE CURRENT_TIMESTAMP"),
        }

        sql
    }
}

/// A key, index or constraint as it appears inside `CREATE TABLE` or
/// after `ADD`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConstraintDefinition {
    PrimaryKey {
        columns: Vec<String>,
    },
    Unique {
        name: String,
        columns: Vec<String>,
    },
    Index {
        name: String,
        columns: Vec<String>,
        using: Option<String>,
    },
    Fulltext {
        name: String,
        columns: Vec<String>,
    },
    ForeignKey {
        name: String,
        columns: Vec<String>,
        referenced_table: String,
        referenced_columns: Vec<String>,
        on_delete: Option<String>,
        on_update: Option<String>,
    },
    Check {
        name: String,
        clause: String,
    },
}

impl ConstraintDefinition {
    /// `None` for `DEFAULT`, which is not a table element
    pub fn from_constraint(constraint: &Constraint) -> Option<Self> {
        let name = constraint.name.clone();
        let columns = constraint.columns.clone();

        Some(match constraint.constraint_type {
            ConstraintType::PrimaryKey => ConstraintDefinition::PrimaryKey { columns },
            ConstraintType::Unique => ConstraintDefinition::Unique { name, columns },
            ConstraintType::Index => ConstraintDefinition::Index {
                name,
                columns,
                using: constraint
                    .index_type
                    .clone()
                    .filter(|t| matches!(t.to_ascii_uppercase().as_str(), "BTREE" | "HASH")),
            },
            ConstraintType::Fulltext => ConstraintDefinition::Fulltext { name, columns },
            ConstraintType::ForeignKey => ConstraintDefinition::ForeignKey {
                name,
                columns,
                referenced_table: constraint.referenced_table.clone().unwrap_or_default(),
                referenced_columns: constraint.referenced_columns.clone(),
                on_delete: constraint.delete_rule.clone(),
                on_update: constraint.update_rule.clone(),
            },
            ConstraintType::Check => ConstraintDefinition::Check {
                name,
                clause: constraint.check_clause.clone().unwrap_or_default(),
            },
            ConstraintType::Default => return None,
        })
    }

    pub fn to_sql(&self) -> String {
        match self {
            ConstraintDefinition::PrimaryKey { columns } => {
                format!("PRIMARY KEY ({})", quote_ident_list(columns))
            }
            ConstraintDefinition::Unique { name, columns } => {
                format!("UNIQUE KEY {} ({})", quote_ident(name), quote_ident_list(columns))
            }
            ConstraintDefinition::Index { name, columns, using } => {
                let mut sql = format!("KEY {} ({})", quote_ident(name), quote_ident_list(columns));
                if let Some(using) = using {
                    sql.push_str(&format!(" USING {}", using.to_ascii_uppercase()));
                }
                sql
            }
            ConstraintDefinition::Fulltext { name, columns } => {
                format!("FULLTEXT KEY {} ({})", quote_ident(name), quote_ident_list(columns))
            }
            ConstraintDefinition::ForeignKey {
                name,
                columns,
                referenced_table,
                referenced_columns,
                on_delete,
                on_update,
            } => {
                let mut sql = format!(
                    "CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({})",
                    quote_ident(name),
                    quote_ident_list(columns),
                    quote_ident(referenced_table),
                    quote_ident_list(referenced_columns)
                );
                if let Some(rule) = on_delete {
                    sql.push_str(&format!(" ON DELETE {}", rule));
                }
                if let Some(rule) = on_update {
                    sql.push_str(&format!(" ON UPDATE {}", rule));
                }
                sql
            }
            ConstraintDefinition::Check { name, clause } => {
                format!("CONSTRAINT {} CHECK ({})", quote_ident(name), clause)
            }
        }
    }
}

/// One clause of an `ALTER TABLE`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlterClause {
    AddColumn(ColumnClause),
    ModifyColumn(ColumnClause),
    AddConstraint(ConstraintDefinition),
    DropPrimaryKey,
    DropIndex(String),
    DropForeignKey(String),
    DropCheck(String),
    SetDefault { column: String, default: String },
}

impl AlterClause {
    pub fn to_sql(&self) -> String {
        match self {
            AlterClause::AddColumn(column) => format!("ADD COLUMN {}", column.to_sql()),
            AlterClause::ModifyColumn(column) => format!("MODIFY COLUMN {}", column.to_sql()),
            AlterClause::AddConstraint(definition) => format!("ADD {}", definition.to_sql()),
            AlterClause::DropPrimaryKey => "DROP PRIMARY KEY".to_string(),
            AlterClause::DropIndex(name) => format!("DROP INDEX {}", quote_ident(name)),
            AlterClause::DropForeignKey(name) => format!("DROP FOREIGN KEY {}", quote_ident(name)),
            // accepted by both MySQL 8.0.19+ and MariaDB
            AlterClause::DropCheck(name) => format!("DROP CONSTRAINT {}", quote_ident(name)),
            AlterClause::SetDefault { column, default } => {
                format!("ALTER COLUMN {} SET DEFAULT {}", quote_ident(column), default)
            }
        }
    }
}

/// `DROP <kind> IF EXISTS` target
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropObject {
    /// TRIGGER / PROCEDURE / FUNCTION / EVENT
    pub kind: &'static str,
    pub name: String,
}

/// A generated DDL statement
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DdlStatement {
    CreateTable {
        table: String,
        columns: Vec<ColumnClause>,
        constraints: Vec<ConstraintDefinition>,
    },
    AlterTable {
        table: String,
        clauses: Vec<AlterClause>,
    },
    /// A create whose body carries its own terminators
    DelimitedCreate {
        drop: Option<DropObject>,
        create: String,
    },
    CreateView {
        name: String,
        definition: String,
        drop_first: bool,
    },
}

impl DdlStatement {
    pub fn to_sql(&self) -> String {
        match self {
            DdlStatement::CreateTable {
                table,
                columns,
                constraints,
            } => {
                let elements: Vec<String> = columns
                    .iter()
                    .map(ColumnClause::to_sql)
                    .chain(constraints.iter().map(ConstraintDefinition::to_sql))
                    .map(|e| format!("    {}", e))
                    .collect();

                format!(
                    "CREATE TABLE IF NOT EXISTS {} (\n{}\n) {};",
                    quote_ident(table),
                    elements.join(",\n"),
                    TABLE_OPTIONS
                )
            }
            DdlStatement::AlterTable { table, clauses } => format!(
                "ALTER TABLE {} {};",
                quote_ident(table),
                clauses
                    .iter()
                    .map(AlterClause::to_sql)
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            DdlStatement::DelimitedCreate { drop, create } => {
                let body = create.trim_end();
                let body = body.strip_suffix(';').unwrap_or(body).trim_end();

                let mut sql = String::new();
                if let Some(drop) = drop {
                    sql.push_str(&format!("DROP {} IF EXISTS {};\n", drop.kind, quote_ident(&drop.name)));
                }
                sql.push_str(&format!("DELIMITER $$\n{}$$\nDELIMITER ;", body));
                sql
            }
            DdlStatement::CreateView {
                name,
                definition,
                drop_first,
            } => {
                let create = format!(
                    "CREATE OR REPLACE VIEW {} AS {};",
                    quote_ident(name),
                    definition.trim().trim_end_matches(';')
                );
                if *drop_first {
                    format!("DROP VIEW IF EXISTS {}; {}", quote_ident(name), create)
                } else {
                    create
                }
            }
        }
    }
}
