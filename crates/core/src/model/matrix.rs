use anyhow::{ensure, Context};
use serde::{Deserialize, Serialize};

use crate::domain::sales::FeatureRow;

/// Model input columns, in the order the regressor was trained on.
pub const FEATURE_COLUMNS: [&str; 8] = [
    "Weeksort",
    "Monthsort",
    "Menu_Name",
    "Total_Revenue",
    "day_number",
    "sale_yesterday",
    "sale_last_week",
    "is_weekend",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    #[serde(rename = "Weeksort")]
    pub weekday_rank: u8,
    #[serde(rename = "Monthsort")]
    pub month_rank: u8,
    #[serde(rename = "Menu_Name")]
    pub item_name: String,
    #[serde(rename = "Total_Revenue")]
    pub total_revenue: f64,
    #[serde(rename = "day_number")]
    pub day_index: i64,
    pub sale_yesterday: u64,
    pub sale_last_week: u64,
    /// 0 or 1.
    pub is_weekend: u8,
}

impl From<&FeatureRow> for FeatureVector {
    fn from(row: &FeatureRow) -> Self {
        Self {
            weekday_rank: row.summary.weekday_rank,
            month_rank: row.summary.month_rank,
            item_name: row.summary.item_name.clone(),
            total_revenue: row.summary.total_revenue,
            day_index: row.day_index,
            sale_yesterday: row.sale_yesterday,
            sale_last_week: row.sale_last_week,
            is_weekend: u8::from(row.is_weekend),
        }
    }
}

/// The exact table handed to a [`crate::model::DemandModel`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureMatrix {
    columns: Vec<String>,
    rows: Vec<FeatureVector>,
}

impl FeatureMatrix {
    pub fn new(columns: Vec<String>, rows: Vec<FeatureVector>) -> Self {
        Self { columns, rows }
    }

    pub fn from_rows(rows: &[FeatureRow]) -> Self {
        Self {
            columns: FEATURE_COLUMNS.iter().map(|c| c.to_string()).collect(),
            rows: rows.iter().map(FeatureVector::from).collect(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[FeatureVector] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Fails unless the declared columns and the serialized row keys both match
    /// [`FEATURE_COLUMNS`].
    pub fn ensure_schema(&self) -> anyhow::Result<()> {
        ensure!(
            self.columns.iter().map(String::as_str).eq(FEATURE_COLUMNS),
            "feature columns drifted from training schema: expected {:?}, got {:?}",
            FEATURE_COLUMNS,
            self.columns
        );

        if let Some(first) = self.rows.first() {
            let value = serde_json::to_value(first).context("serialize feature row failed")?;
            let obj = value
                .as_object()
                .context("feature row did not serialize to an object")?;
            ensure!(
                obj.len() == FEATURE_COLUMNS.len()
                    && FEATURE_COLUMNS.iter().all(|c| obj.contains_key(*c)),
                "feature row keys drifted from training schema: {:?}",
                obj.keys().collect::<Vec<_>>()
            );
        }

        Ok(())
    }
}
