//! Schema Snapshot Comparison
//!
//! Detecting what differs between two databases:
//! - Body normalization (formatting-insensitive definitions)
//! - Per-kind attribute tables
//! - The bidirectional diff engine

pub mod attributes;
pub mod diff;
pub mod normalize;

pub use diff::{
    DiffEngine, DiffResult, DiffSummary, Divergence, KindCount, KindDiff, MissingTable, TableKey,
};
pub use normalize::{normalize, BodyKind, NormalizationAmbiguity};
