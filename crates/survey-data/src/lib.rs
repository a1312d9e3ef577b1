//! Ingestion and normalisation layer for the developer-survey pipeline.
//!
//! Loads per-year CSV exports, resolves semantic fields to physical columns,
//! tallies multi-select answers, reconciles category labels across years,
//! cross-tabulates cohorts and persists the resulting aggregate tables.

pub mod aggregator;
pub mod analysis;
pub mod crosstab;
pub mod export;
pub mod loader;
pub mod numeric;
pub mod reconciler;
pub mod resolver;
pub mod shares;

pub use survey_core as core;
