use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, Path, Request, State, rejection::JsonRejection},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tokio::signal;
use tower_http::cors::CorsLayer;
use tower_http::services::{ServeDir, ServeFile};

use crate::compare::{CompareResult, compare_datasets};
use crate::config::Config;
use crate::dataset::{Dataset, DatasetInfo, DatasetRegistry};
use crate::error::ApiError;
use crate::formula::{CalculationResult, FormulaKind, calculate};
use crate::loader;
use crate::period::{Period, PeriodAggregate, aggregate_by_period};

/// Shared server state: the dataset store
#[derive(Debug, Default)]
pub struct AppState {
    pub registry: DatasetRegistry,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }
}

pub type SharedState = Arc<AppState>;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CalculateRequest {
    dataset_id: String,
    #[serde(default)]
    formula: FormulaKind,
    #[serde(default, deserialize_with = "column_name")]
    column_x: String,
    #[serde(default, deserialize_with = "column_name")]
    column_y: String,
}

// Column names arrive loosely typed: null reads as no column, numbers and
// booleans name the column their text spells
fn column_name<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => String::new(),
        Value::String(name) => name,
        other => other.to_string(),
    })
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AggregateRequest {
    dataset_id: String,
    date_column: String,
    value_column: String,
    period: Period,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CompareRequest {
    dataset_ids: Vec<String>,
    value_column: String,
    label_column: String,
}

/// `{"success": true, "result": ...}` envelope used by the compute endpoints
#[derive(Serialize)]
struct ApiResponse<T> {
    success: bool,
    result: T,
}

impl<T> ApiResponse<T> {
    fn ok(result: T) -> Json<Self> {
        Json(Self {
            success: true,
            result,
        })
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UploadResponse {
    success: bool,
    dataset_id: String,
    data: Arc<Dataset>,
}

#[derive(Serialize)]
struct DeleteResponse {
    success: bool,
}

/// Build the application router
///
/// API routes live under `/api`. Everything else is served from
/// `config.static_dir`, falling back to its `index.html` so client-side
/// routes work; without a front end build a JSON banner is returned.
pub fn router(state: SharedState, config: &Config) -> Router {
    let api = Router::new()
        .route("/api/health", get(health))
        .route("/api/upload", post(upload))
        .route("/api/datasets", get(list_datasets))
        .route("/api/datasets/:id", get(get_dataset).delete(delete_dataset))
        .route("/api/calculate", post(calculate_formula))
        .route("/api/aggregate", post(aggregate))
        .route("/api/compare-datasets", post(compare));

    let index = config.static_dir.join("index.html");
    let app = if index.is_file() {
        log::info!("Serving static files from {}", config.static_dir.display());
        api.fallback_service(ServeDir::new(&config.static_dir).fallback(ServeFile::new(index)))
    } else {
        log::info!(
            "No front end found at {}, serving API only",
            config.static_dir.display()
        );
        api.fallback(banner)
    };

    app.layer(DefaultBodyLimit::max(config.max_upload_bytes()))
        .layer(CorsLayer::permissive())
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}

/// Bind the configured address and serve until Ctrl-C or SIGTERM
pub async fn run(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    let state = Arc::new(AppState::new());
    let app = router(state, &config);

    let listener = TcpListener::bind((config.host.as_str(), config.port)).await?;
    log::info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    log::info!("Server stopped");
    Ok(())
}

async fn log_request(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();

    let response = next.run(request).await;

    log::info!(
        "{} {} -> {} ({:.1} ms)",
        method,
        path,
        response.status().as_u16(),
        started.elapsed().as_secs_f64() * 1000.0
    );
    response
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            log::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                log::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    log::info!("Shutdown signal received, stopping server");
}

async fn banner() -> impl IntoResponse {
    Json(serde_json::json!({
        "message": "Data Vision API Server",
        "version": env!("CARGO_PKG_VERSION"),
        "endpoints": {
            "health": "/api/health",
            "upload": "/api/upload",
            "datasets": "/api/datasets",
            "calculate": "/api/calculate",
            "aggregate": "/api/aggregate",
            "compareDatasets": "/api/compare-datasets",
        },
    }))
}

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    }))
}

async fn upload(
    State(state): State<SharedState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let file_name = field.file_name().unwrap_or_default().to_string();
        if !loader::is_supported(&file_name) {
            return Err(ApiError::UnsupportedFile);
        }
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(e.to_string()))?;

        // Decoding is CPU bound, keep it off the async workers
        let dataset = tokio::task::spawn_blocking(move || loader::parse_file(&bytes, &file_name))
            .await
            .map_err(|e| ApiError::Internal(e.to_string()))??;

        let dataset = Arc::new(dataset);
        let dataset_id = state.registry.insert(dataset.clone());
        log::info!(
            "Stored dataset {} ({}, {} rows)",
            dataset_id,
            dataset.file_name,
            dataset.rows.len()
        );

        return Ok(Json(UploadResponse {
            success: true,
            dataset_id,
            data: dataset,
        }));
    }

    Err(ApiError::MissingFile)
}

async fn list_datasets(State(state): State<SharedState>) -> Json<Vec<DatasetInfo>> {
    Json(state.registry.list())
}

async fn get_dataset(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<Arc<Dataset>>, ApiError> {
    state
        .registry
        .get(&id)
        .map(Json)
        .ok_or(ApiError::DatasetNotFound)
}

async fn delete_dataset(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Json<DeleteResponse> {
    Json(DeleteResponse {
        success: state.registry.remove(&id),
    })
}

async fn calculate_formula(
    State(state): State<SharedState>,
    payload: Result<Json<CalculateRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<CalculationResult>>, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let dataset = state
        .registry
        .get(&request.dataset_id)
        .ok_or(ApiError::DatasetNotFound)?;

    Ok(ApiResponse::ok(calculate(
        &dataset.rows,
        request.formula,
        &request.column_x,
        &request.column_y,
    )))
}

async fn aggregate(
    State(state): State<SharedState>,
    payload: Result<Json<AggregateRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<PeriodAggregate>>, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let dataset = state
        .registry
        .get(&request.dataset_id)
        .ok_or(ApiError::DatasetNotFound)?;

    let data = aggregate_by_period(
        &dataset.rows,
        &request.date_column,
        &request.value_column,
        request.period,
    );
    Ok(ApiResponse::ok(PeriodAggregate { data }))
}

async fn compare(
    State(state): State<SharedState>,
    payload: Result<Json<CompareRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<Vec<CompareResult>>>, ApiError> {
    let Json(request) = payload.map_err(|e| ApiError::BadRequest(e.body_text()))?;

    Ok(ApiResponse::ok(compare_datasets(
        &request.dataset_ids,
        &state.registry,
        &request.value_column,
        &request.label_column,
    )))
}
