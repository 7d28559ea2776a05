use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use salecast_core::forecast::{self, PredictionRow};
use salecast_core::ingest::{ColumnMap, RawTable};
use salecast_core::model::DemandModel;
use salecast_core::pipeline::PipelineError;

const UPLOAD_FIELD: &str = "file";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let settings = salecast_core::config::Settings::from_env()?;
    let _sentry_guard = init_sentry(&settings);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer())
        .init();

    let model = salecast_core::model::from_settings(&settings)?;
    let state = AppState {
        model,
        columns: Arc::new(ColumnMap::default()),
    };

    let app = router(state, settings.max_upload_bytes());

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], settings.port()));
    tracing::info!(%addr, max_upload_bytes = settings.max_upload_bytes(), "api listening");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

fn router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/healthz", get(healthz))
        .route("/predict", post(predict_csv))
        .with_state(state)
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

#[derive(Clone)]
struct AppState {
    model: Arc<dyn DemandModel>,
    columns: Arc<ColumnMap>,
}

#[derive(Debug, Serialize)]
struct HomeMessage {
    message: &'static str,
}

async fn home() -> Json<HomeMessage> {
    Json(HomeMessage {
        message: "Coffee Sales Prediction API is running!",
    })
}

async fn healthz() -> &'static str {
    "ok"
}

#[tracing::instrument(skip_all, fields(run_id = %uuid::Uuid::new_v4()))]
async fn predict_csv(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<Vec<PredictionRow>>, ApiError> {
    let bytes = read_upload(&mut multipart).await?;
    tracing::debug!(upload_bytes = bytes.len(), "received csv upload");

    let table = RawTable::from_csv_bytes(&bytes).map_err(|e| ApiError::from_anyhow(e.into()))?;
    let report = forecast::predict_table(&table, &state.columns, state.model.as_ref())
        .await
        .map_err(ApiError::from_anyhow)?;

    tracing::info!(rows = report.len(), "prediction served");
    Ok(Json(report))
}

async fn read_upload(multipart: &mut Multipart) -> Result<Vec<u8>, ApiError> {
    while let Some(field) = multipart.next_field().await.map_err(ApiError::from_multipart)? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let bytes = field.bytes().await.map_err(ApiError::from_multipart)?;
        return Ok(bytes.to_vec());
    }

    Err(ApiError {
        status: StatusCode::BAD_REQUEST,
        body: ErrorBody {
            error: format!("multipart field '{UPLOAD_FIELD}' is required"),
            kind: "upload",
            field: None,
        },
    })
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
    kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    field: Option<&'static str>,
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    body: ErrorBody,
}

impl ApiError {
    fn from_anyhow(err: anyhow::Error) -> Self {
        if let Some(pipeline_err) = err.downcast_ref::<PipelineError>() {
            tracing::warn!(kind = pipeline_err.kind(), error = %pipeline_err, "rejected upload");
            return Self {
                status: StatusCode::UNPROCESSABLE_ENTITY,
                body: ErrorBody {
                    error: pipeline_err.to_string(),
                    kind: pipeline_err.kind(),
                    field: pipeline_err.field(),
                },
            };
        }

        sentry_anyhow::capture_anyhow(&err);
        tracing::error!(error = %format!("{err:#}"), "prediction failed");
        Self {
            status: StatusCode::BAD_GATEWAY,
            body: ErrorBody {
                error: format!("{err:#}"),
                kind: "model",
                field: None,
            },
        }
    }

    fn from_multipart(err: axum::extract::multipart::MultipartError) -> Self {
        Self {
            status: err.status(),
            body: ErrorBody {
                error: err.body_text(),
                kind: "upload",
                field: None,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.body)).into_response()
    }
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

fn init_sentry(settings: &salecast_core::config::Settings) -> Option<sentry::ClientInitGuard> {
    let dsn = settings.sentry_dsn.as_deref()?;
    Some(sentry::init((
        dsn,
        sentry::ClientOptions {
            release: sentry::release_name!(),
            ..Default::default()
        },
    )))
}
