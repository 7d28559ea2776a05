use anyhow::{ensure, Context};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::sales::FeatureRow;
use crate::ingest::{ColumnMap, RawTable};
use crate::model::{DemandModel, FeatureMatrix};
use crate::pipeline;

/// One row of the report returned to callers. Field order is the presentation order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRow {
    #[serde(rename = "Date")]
    pub date: NaiveDate,
    #[serde(rename = "Menu_Name")]
    pub item_name: String,
    #[serde(rename = "Amount_of_Sale")]
    pub unit_count: u64,
    #[serde(rename = "Predicted_Amount_of_Sale")]
    pub predicted_units: f64,
}

/// Pairs each feature row with its prediction, preserving feature-table order.
pub fn assemble_report(
    features: &[FeatureRow],
    predictions: &[f64],
) -> anyhow::Result<Vec<PredictionRow>> {
    ensure!(
        features.len() == predictions.len(),
        "model returned {} predictions for {} feature rows",
        predictions.len(),
        features.len()
    );

    Ok(features
        .iter()
        .zip(predictions)
        .map(|(row, predicted)| PredictionRow {
            date: row.summary.date,
            item_name: row.summary.item_name.clone(),
            unit_count: row.summary.unit_count,
            predicted_units: *predicted,
        })
        .collect())
}

/// Scores an already-built feature table.
pub async fn predict_features(
    features: &[FeatureRow],
    model: &dyn DemandModel,
) -> anyhow::Result<Vec<PredictionRow>> {
    let matrix = FeatureMatrix::from_rows(features);
    matrix.ensure_schema()?;

    let predictions = model
        .predict(&matrix)
        .await
        .with_context(|| format!("demand model '{}' failed", model.name()))?;

    assemble_report(features, &predictions)
}

/// Full run: raw table → features → model → report.
///
/// Pipeline failures surface as [`pipeline::PipelineError`] inside the `anyhow::Error` so
/// callers can `downcast_ref` and report the offending field.
pub async fn predict_table(
    table: &RawTable,
    columns: &ColumnMap,
    model: &dyn DemandModel,
) -> anyhow::Result<Vec<PredictionRow>> {
    let features = pipeline::run(table, columns)?;
    let report = predict_features(&features, model).await?;

    tracing::info!(
        rows = report.len(),
        model = model.name(),
        "prediction report assembled"
    );
    Ok(report)
}
