//! Migration module
//!
//! Renders diff results as MySQL DDL.

mod generator;
mod statements;

pub use generator::MigrationGenerator;
pub use statements::{
    render_default, AlterClause, ColumnClause, ColumnModifier, ConstraintDefinition, DdlStatement,
    DropObject, TABLE_OPTIONS,
};
