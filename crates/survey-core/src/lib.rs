//! Domain layer for the developer-survey trends pipeline.
//!
//! Holds the tabular data model shared by every stage, the declarative
//! reconciliation rule tables, descriptive statistics helpers, CLI settings
//! and the crate-wide error taxonomy.

pub mod error;
pub mod formatting;
pub mod models;
pub mod rules;
pub mod settings;
pub mod stats;
