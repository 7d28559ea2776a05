//! Raw transactions → daily summary → feature table.
//!
//! Every stage is a pure, synchronous transform over a fully materialized table.

pub mod aggregate;
pub mod clean;
pub mod error;
pub mod features;

pub use aggregate::aggregate;
pub use clean::clean;
pub use error::PipelineError;
pub use features::{build_features, positional_lag};

use crate::domain::sales::FeatureRow;
use crate::ingest::{ColumnMap, RawTable};

/// Runs clean, aggregate and feature building in order.
pub fn run(table: &RawTable, columns: &ColumnMap) -> Result<Vec<FeatureRow>, PipelineError> {
    let cleaned = clean(table, columns)?;
    let daily = aggregate(&cleaned);
    let features = build_features(&daily);

    tracing::info!(
        raw_rows = table.len(),
        clean_rows = cleaned.len(),
        daily_rows = daily.len(),
        "feature pipeline finished"
    );
    Ok(features)
}
