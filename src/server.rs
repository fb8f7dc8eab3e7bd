//! JSON HTTP API for submitting and browsing entries.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Health check (returns version) |
//! | `POST` | `/entries` | Submit a URL, YouTube link, text, or base64 file |
//! | `GET`  | `/entries` | Newest entries, `?category=&limit=` |
//! | `GET`  | `/entries/{id}` | Full entry |
//! | `PUT`  | `/entries/{id}/category` | Reassign the category |
//! | `GET`  | `/stats` | Entry counts per category |
//!
//! `POST /entries` answers `201` when the entry was stored and `200` when
//! the content was already present (the body carries the existing id).
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "empty_content", "message": "submission contains no text after normalization" } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404),
//! `unsupported_format` (415), `extraction_failed` (422), `no_captions` (422),
//! `empty_content` (422), `internal` (500).

use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, put},
    Json, Router,
};
use base64::Engine;
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use content_intake_core::error::IntakeError;
use content_intake_core::models::{
    Category, CategoryCount, ContentEntry, EntrySummary, ListFilter, Submission,
};

use crate::config::Config;
use crate::ingest::{IngestOutcome, IngestState, Ingestor};
use crate::sqlite_store::SqliteStore;

const DEFAULT_LIST_LIMIT: usize = 50;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
struct AppState {
    ingestor: Ingestor,
}

/// Starts the HTTP server on `[server].bind`. Runs until the process exits.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let store = Arc::new(SqliteStore::open(config).await?);
    let ingestor = Ingestor::from_config(config, store)?;

    // Base64 inflates uploads by a third; leave room for the JSON envelope.
    let body_limit = (config.extract.max_file_bytes as usize / 3 + 1) * 4 + 64 * 1024;
    let app = router(ingestor, body_limit);

    let bind_addr = &config.server.bind;
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    info!(bind = %bind_addr, "server listening");
    println!("Intake server listening on http://{}", bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}

/// Builds the router around an existing [`Ingestor`].
pub fn router(ingestor: Ingestor, max_body_bytes: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/entries", get(handle_list).post(handle_submit))
        .route("/entries/{id}", get(handle_get))
        .route("/entries/{id}/category", put(handle_set_category))
        .route("/stats", get(handle_stats))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(cors)
        .with_state(AppState { ingestor })
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// Error type that converts into an Axum HTTP response.
struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

impl From<IntakeError> for AppError {
    fn from(err: IntakeError) -> Self {
        let (status, code) = match &err {
            IntakeError::UnsupportedFormat(_) => {
                (StatusCode::UNSUPPORTED_MEDIA_TYPE, err.kind().as_str())
            }
            IntakeError::Extraction { .. }
            | IntakeError::NoCaptions { .. }
            | IntakeError::EmptyContent => (StatusCode::UNPROCESSABLE_ENTITY, err.kind().as_str()),
            IntakeError::NotFound(_) => (StatusCode::NOT_FOUND, err.kind().as_str()),
            IntakeError::DuplicateEntry { .. } => (StatusCode::CONFLICT, err.kind().as_str()),
            IntakeError::Storage(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
        };
        AppError {
            status,
            code: code.to_string(),
            message: err.to_string(),
        }
    }
}

fn parse_category(raw: Option<&str>) -> Result<Option<Category>, AppError> {
    raw.map(|c| c.parse::<Category>())
        .transpose()
        .map_err(|e| bad_request(e.to_string()))
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ POST /entries ============

/// Request body for `POST /entries`. Exactly one of `url`, `youtube_url`,
/// `text`, or `filename` + `content_base64` must be present.
#[derive(Deserialize)]
struct SubmitRequest {
    url: Option<String>,
    youtube_url: Option<String>,
    text: Option<String>,
    filename: Option<String>,
    content_base64: Option<String>,
    category: Option<String>,
    title: Option<String>,
}

impl SubmitRequest {
    fn into_submission(self) -> Result<Submission, AppError> {
        let category = parse_category(self.category.as_deref())?;

        let mut submission = match (self.url, self.youtube_url, self.text, self.filename) {
            (Some(url), None, None, None) => Submission::url(url),
            (None, Some(url), None, None) => Submission::youtube(url),
            (None, None, Some(text), None) => Submission::text(text),
            (None, None, None, Some(filename)) => {
                let encoded = self
                    .content_base64
                    .ok_or_else(|| bad_request("filename requires content_base64"))?;
                let bytes = base64::engine::general_purpose::STANDARD
                    .decode(encoded.trim())
                    .map_err(|e| bad_request(format!("content_base64 is not valid base64: {}", e)))?;
                Submission::file(bytes, filename)
            }
            (None, None, None, None) => {
                return Err(bad_request(
                    "one of url, youtube_url, text, or filename is required",
                ))
            }
            _ => {
                return Err(bad_request(
                    "only one of url, youtube_url, text, or filename may be given",
                ))
            }
        };

        if let Some(category) = category {
            submission = submission.with_category(category);
        }
        if let Some(title) = self.title.filter(|t| !t.trim().is_empty()) {
            submission = submission.with_title(title);
        }
        Ok(submission)
    }
}

#[derive(Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
enum SubmitResponse {
    Stored {
        id: String,
        category: Category,
        states: Vec<IngestState>,
    },
    Duplicate {
        existing_id: String,
        states: Vec<IngestState>,
    },
}

async fn handle_submit(
    State(state): State<AppState>,
    Json(request): Json<SubmitRequest>,
) -> Result<(StatusCode, Json<SubmitResponse>), AppError> {
    let submission = request.into_submission()?;
    let report = state.ingestor.submit(submission).await;

    match report.outcome {
        IngestOutcome::Stored { id, category } => Ok((
            StatusCode::CREATED,
            Json(SubmitResponse::Stored {
                id,
                category,
                states: report.states,
            }),
        )),
        IngestOutcome::Duplicate { existing_id } => Ok((
            StatusCode::OK,
            Json(SubmitResponse::Duplicate {
                existing_id,
                states: report.states,
            }),
        )),
        IngestOutcome::Failed(err) => Err(err.into()),
    }
}

// ============ GET /entries ============

#[derive(Deserialize)]
struct ListQuery {
    category: Option<String>,
    limit: Option<usize>,
}

#[derive(Serialize)]
struct ListResponse {
    entries: Vec<EntrySummary>,
}

async fn handle_list(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ListResponse>, AppError> {
    let filter = ListFilter {
        category: parse_category(query.category.as_deref())?,
        limit: Some(query.limit.unwrap_or(DEFAULT_LIST_LIMIT)),
    };
    let entries = state.ingestor.store().list(&filter).await?;
    Ok(Json(ListResponse { entries }))
}

// ============ GET /entries/{id} ============

async fn handle_get(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ContentEntry>, AppError> {
    Ok(Json(state.ingestor.store().get(&id).await?))
}

// ============ PUT /entries/{id}/category ============

#[derive(Deserialize)]
struct CategoryRequest {
    category: String,
}

#[derive(Serialize)]
struct CategoryResponse {
    id: String,
    category: Category,
}

async fn handle_set_category(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<CategoryRequest>,
) -> Result<Json<CategoryResponse>, AppError> {
    let category = request
        .category
        .parse::<Category>()
        .map_err(|e| bad_request(e.to_string()))?;
    state.ingestor.store().set_category(&id, category).await?;
    Ok(Json(CategoryResponse { id, category }))
}

// ============ GET /stats ============

#[derive(Serialize)]
struct StatsResponse {
    total: u64,
    categories: Vec<CategoryCount>,
}

async fn handle_stats(State(state): State<AppState>) -> Result<Json<StatsResponse>, AppError> {
    let categories = state.ingestor.store().category_counts().await?;
    Ok(Json(StatsResponse {
        total: categories.iter().map(|c| c.count).sum(),
        categories,
    }))
}
