//! Comparison Pipeline Module
//!
//! Connects the stages of one run:
//!
//! 1. **Introspection**: snapshot both databases concurrently
//! 2. **Diff**: compare the snapshots in both directions
//! 3. **Generation**: render each side's DDL
//! 4. **Emission**: write each side's script concurrently

pub mod orchestrator;
pub mod types;

pub use orchestrator::Comparison;
pub use types::{ComparisonReport, ConnectionReport};
