use crate::model::{DemandModel, FeatureMatrix};

/// Predicts that today's sales repeat the previous recorded day's.
#[derive(Debug, Clone, Copy, Default)]
pub struct LagBaselineModel;

#[async_trait::async_trait]
impl DemandModel for LagBaselineModel {
    fn name(&self) -> &'static str {
        "lag_baseline"
    }

    async fn predict(&self, features: &FeatureMatrix) -> anyhow::Result<Vec<f64>> {
        Ok(features
            .rows()
            .iter()
            .map(|row| row.sale_yesterday as f64)
            .collect())
    }
}
