//! JSON HTTP API over a loaded corpus.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Health check (returns version and corpus size) |
//! | `GET`  | `/files` | Document ids with node and relation counts |
//! | `GET`  | `/files/{name}` | One parsed document |
//! | `GET`  | `/files/{name}/usage?node=ID` | Relation usage below a node (root by default) |
//! | `GET`  | `/relations/stats` | Declaration counts per relation name |
//! | `GET`  | `/relations/groups` | Distinct relations grouped by type |
//! | `GET`  | `/relations/distribution` | Declaration counts per type |
//! | `GET`  | `/hierarchy` | Root tree of every document, keyed by document id |
//! | `POST` | `/reload` | Re-read the corpus from disk |
//!
//! Document ids containing `/` must be percent-encoded in the path
//! (`/files/cluster-1%2Fdoc.rs3`).
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "not_found", "message": "no document: a.rs3" } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404), `internal` (500).
//!
//! A failed reload leaves the previously loaded corpus in place.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use rst_lens_core::models::NodeTree;
use rst_lens_core::service::{RelationGroup, RelationStats, RelationUsage, TypeCount};
use rst_lens_core::{NamedDocument, NodeId, RelationService};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::config::Config;
use crate::loader::load_corpus;
use crate::progress::NoProgress;

#[derive(Clone)]
struct AppState {
    config: Arc<Config>,
    service: Arc<RelationService<NamedDocument>>,
}

/// Serve `service` on `[server].bind` until the process is terminated.
///
/// `POST /reload` re-reads the corpus described by `config` and swaps it
/// into `service`.
pub async fn run_server(
    config: &Config,
    service: Arc<RelationService<NamedDocument>>,
) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let state = AppState {
        config: Arc::new(config.clone()),
        service,
    };

    println!(
        "Serving {} documents on http://{}",
        state.service.len(),
        bind_addr
    );

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, router(state)).await?;

    Ok(())
}

fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/files", get(handle_list_files))
        .route("/files/{name}", get(handle_get_file))
        .route("/files/{name}/usage", get(handle_usage))
        .route("/relations/stats", get(handle_stats))
        .route("/relations/groups", get(handle_groups))
        .route("/relations/distribution", get(handle_distribution))
        .route("/hierarchy", get(handle_hierarchy))
        .route("/reload", post(handle_reload))
        .layer(cors)
        .with_state(state)
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

#[derive(Debug)]
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

fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found".to_string(),
        message: message.into(),
    }
}

fn internal(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal".to_string(),
        message: message.into(),
    }
}

fn find_document<'a>(
    corpus: &'a [NamedDocument],
    name: &str,
) -> Result<&'a NamedDocument, AppError> {
    corpus
        .iter()
        .find(|doc| doc.id == name)
        .ok_or_else(|| not_found(format!("no document: {}", name)))
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
    documents: usize,
}

async fn handle_health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        documents: state.service.len(),
    })
}

// ============ /files ============

#[derive(Serialize)]
struct FileSummary {
    id: String,
    nodes: usize,
    relations: usize,
}

#[derive(Serialize)]
struct FileListResponse {
    files: Vec<FileSummary>,
}

async fn handle_list_files(State(state): State<AppState>) -> Json<FileListResponse> {
    let files = state
        .service
        .snapshot()
        .iter()
        .map(|doc| FileSummary {
            id: doc.id.clone(),
            nodes: doc.document.nodes().len(),
            relations: doc.document.relations().len(),
        })
        .collect();
    Json(FileListResponse { files })
}

async fn handle_get_file(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Response, AppError> {
    let corpus = state.service.snapshot();
    let named = find_document(&corpus, &name)?;
    Ok(Json(named).into_response())
}

#[derive(Deserialize)]
struct UsageParams {
    node: Option<String>,
}

#[derive(Serialize)]
struct UsageResponse {
    document: String,
    node: NodeId,
    usage: Vec<RelationUsage>,
}

async fn handle_usage(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(params): Query<UsageParams>,
) -> Result<Json<UsageResponse>, AppError> {
    let corpus = state.service.snapshot();
    let named = find_document(&corpus, &name)?;
    let document = &named.document;

    let node = match params.node.as_deref() {
        None => document.root_node(),
        Some(raw) => {
            let id: NodeId = raw
                .parse()
                .map_err(|_| bad_request(format!("node must be a positive integer, got '{}'", raw)))?;
            document
                .node(id)
                .ok_or_else(|| not_found(format!("no node {} in {}", id, named.id)))?
        }
    };

    Ok(Json(UsageResponse {
        document: named.id.clone(),
        node: node.id,
        usage: state.service.usage(document, node),
    }))
}

// ============ /relations ============

async fn handle_stats(State(state): State<AppState>) -> Json<RelationStats> {
    Json(state.service.stats())
}

async fn handle_groups(State(state): State<AppState>) -> Json<Vec<RelationGroup>> {
    Json(state.service.groups())
}

async fn handle_distribution(State(state): State<AppState>) -> Json<Vec<TypeCount>> {
    Json(state.service.distribution())
}

#[derive(Serialize)]
struct DocumentTree<'a> {
    id: &'a str,
    root: NodeTree<'a>,
}

async fn handle_hierarchy(State(state): State<AppState>) -> Response {
    let hierarchy = state.service.hierarchy();
    let trees: Vec<DocumentTree<'_>> = hierarchy
        .trees()
        .map(|(named, root)| DocumentTree {
            id: &named.id,
            root,
        })
        .collect();
    Json(trees).into_response()
}

// ============ POST /reload ============

#[derive(Serialize)]
struct ReloadResponse {
    documents: usize,
    skipped: Vec<SkippedEntry>,
}

#[derive(Serialize)]
struct SkippedEntry {
    id: String,
    reason: String,
}

async fn handle_reload(State(state): State<AppState>) -> Result<Json<ReloadResponse>, AppError> {
    let loaded = load_corpus(&state.config, &NoProgress)
        .await
        .map_err(|e| internal(format!("{:#}", e)))?;

    let documents = loaded.documents.len();
    let skipped = loaded
        .skipped
        .into_iter()
        .map(|s| SkippedEntry {
            id: s.id,
            reason: s.reason,
        })
        .collect();
    state.service.load(loaded.documents);

    Ok(Json(ReloadResponse { documents, skipped }))
}
