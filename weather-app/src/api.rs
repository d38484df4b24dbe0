//! REST API under `/api`.
//!
//! | Method | Path                  | Purpose                               |
//! |--------|-----------------------|---------------------------------------|
//! | GET    | `/api/health`         | Liveness and version                  |
//! | GET    | `/api/geocode?q=`     | Resolve free text to coordinates      |
//! | GET    | `/api/weather?lat&lon`| Current weather and daily forecast    |
//! | GET    | `/api/records?q=`     | List records, optionally filtered     |
//! | POST   | `/api/records`        | Create a record                       |
//! | GET    | `/api/records/{id}`   | Fetch one record                      |
//! | PUT    | `/api/records/{id}`   | Update a record, refreshing weather   |
//! | DELETE | `/api/records/{id}`   | Delete a record                       |
//! | GET    | `/api/exports/{fmt}`  | Download as `json`, `csv` or `pdf`    |
//!
//! Failures are returned as `{"error": "<message>"}`.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, Query, State, rejection::JsonRejection},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use serde::{Deserialize, Serialize};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::error;
use weather_core::{
    Error, GeoLocation, NewRecord, Record, RecordPatch, WeatherPayload,
    export::{self, ExportFormat},
};

use crate::state::AppState;

/// API routes, without middleware.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/geocode", get(geocode))
        .route("/api/weather", get(weather))
        .route("/api/records", get(list_records).post(create_record))
        .route(
            "/api/records/{id}",
            get(get_record).put(update_record).delete(delete_record),
        )
        .route("/api/exports/json", get(export_json))
        .route("/api/exports/csv", get(export_csv))
        .route("/api/exports/pdf", get(export_pdf))
}

/// The full application: routes, request tracing and permissive CORS.
pub fn app(state: Arc<AppState>) -> Router {
    router()
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Debug, Deserialize)]
pub struct GeocodeQuery {
    pub q: Option<String>,
}

/// Every geocoding failure, upstream included, is reported as 400.
async fn geocode(
    State(state): State<Arc<AppState>>,
    Query(params): Query<GeocodeQuery>,
) -> Result<Json<GeoLocation>, AppError> {
    let q = params
        .q
        .filter(|q| !q.trim().is_empty())
        .ok_or_else(|| AppError::BadRequest("q is required".into()))?;

    state
        .service
        .geocode(&q)
        .await
        .map(Json)
        .map_err(|e| AppError::BadRequest(e.to_string()))
}

#[derive(Debug, Deserialize)]
pub struct WeatherQuery {
    pub lat: Option<String>,
    pub lon: Option<String>,
}

async fn weather(
    State(state): State<Arc<AppState>>,
    Query(params): Query<WeatherQuery>,
) -> Result<Json<WeatherPayload>, AppError> {
    let (Some(lat), Some(lon)) = (params.lat, params.lon) else {
        return Err(AppError::BadRequest("lat and lon required".into()));
    };
    let (Ok(lat), Ok(lon)) = (lat.trim().parse::<f64>(), lon.trim().parse::<f64>()) else {
        return Err(AppError::BadRequest("lat and lon must be numbers".into()));
    };
    if !lat.is_finite() || !lon.is_finite() {
        return Err(AppError::BadRequest("lat and lon must be numbers".into()));
    }

    Ok(Json(state.service.weather(lat, lon).await?))
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub q: Option<String>,
}

async fn list_records(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListQuery>,
) -> Result<Json<Vec<Record>>, AppError> {
    Ok(Json(state.service.list(params.q.as_deref()).await?))
}

async fn create_record(
    State(state): State<Arc<AppState>>,
    body: Result<Json<NewRecord>, JsonRejection>,
) -> Result<Json<Record>, AppError> {
    let Json(request) = body?;
    Ok(Json(state.service.create(request).await?))
}

async fn get_record(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Record>, AppError> {
    Ok(Json(state.service.get(&id).await?))
}

async fn update_record(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    body: Result<Json<RecordPatch>, JsonRejection>,
) -> Result<Json<Record>, AppError> {
    let Json(patch) = body?;
    Ok(Json(state.service.update(&id, patch).await?))
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub ok: bool,
}

async fn delete_record(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, AppError> {
    state.service.delete(&id).await?;
    Ok(Json(DeleteResponse { ok: true }))
}

async fn export_json(State(state): State<Arc<AppState>>) -> Result<Response, AppError> {
    export_records(&state, ExportFormat::Json).await
}

async fn export_csv(State(state): State<Arc<AppState>>) -> Result<Response, AppError> {
    export_records(&state, ExportFormat::Csv).await
}

async fn export_pdf(State(state): State<Arc<AppState>>) -> Result<Response, AppError> {
    export_records(&state, ExportFormat::Pdf).await
}

async fn export_records(state: &AppState, format: ExportFormat) -> Result<Response, AppError> {
    let records = state.service.list(None).await?;
    let body = export::render(format, &records).map_err(|e| {
        error!(error = %e, format = format.extension(), "Export failed");
        AppError::Internal(format!("{} export failed", format.extension().to_uppercase()))
    })?;

    Ok((
        [
            (header::CONTENT_TYPE, format.content_type().to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename={}", format.file_name()),
            ),
        ],
        body,
    )
        .into_response())
}

/// Application error type.
#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    NotFound(String),
    Internal(String),
}

impl From<Error> for AppError {
    fn from(e: Error) -> Self {
        match e {
            Error::InvalidDateRange(_) | Error::Validation(_) | Error::LocationNotFound(_) => {
                AppError::BadRequest(e.to_string())
            }
            Error::RecordNotFound(_) => AppError::NotFound("Not found".into()),
            Error::Upstream(_) | Error::Persistence { .. } | Error::CorruptData { .. } => {
                error!(error = %e, "Request failed");
                AppError::Internal(e.to_string())
            }
        }
    }
}

/// Malformed, mistyped or non-JSON request bodies.
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::BadRequest(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        let body = serde_json::json!({
            "error": message,
        });

        (status, Json(body)).into_response()
    }
}
