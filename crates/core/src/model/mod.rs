pub mod baseline;
pub mod matrix;
pub mod remote;

use std::sync::Arc;

pub use baseline::LagBaselineModel;
pub use matrix::{FeatureMatrix, FeatureVector, FEATURE_COLUMNS};
pub use remote::HttpDemandModel;

use crate::config::Settings;

/// A trained demand regressor, consumed as a black box.
#[async_trait::async_trait]
pub trait DemandModel: Send + Sync {
    fn name(&self) -> &'static str;

    /// Returns one predicted quantity per row of `features`.
    async fn predict(&self, features: &FeatureMatrix) -> anyhow::Result<Vec<f64>>;
}

/// Uses the remote model server when `MODEL_SERVER_URL` is set, otherwise the lag baseline.
pub fn from_settings(settings: &Settings) -> anyhow::Result<Arc<dyn DemandModel>> {
    if settings.model_server_url.is_some() {
        let model = HttpDemandModel::from_settings(settings)?;
        tracing::info!(model = model.name(), "using remote demand model");
        return Ok(Arc::new(model));
    }

    tracing::warn!("MODEL_SERVER_URL not set; falling back to lag baseline model");
    Ok(Arc::new(LagBaselineModel))
}
