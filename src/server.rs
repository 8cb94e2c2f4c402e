//! Keg HTTP server.
//!
//! Exposes kegs stored in GitHub repositories as a small JSON API. Every
//! request clones the repository afresh; nothing is cached between
//! requests.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/keg/github/{owner}/{repo}` | Keg descriptor as `{"keg": ...}` |
//! | `GET`  | `/keg/github/{owner}/{repo}/dex` | Dex nodes keyed by id |
//! | `GET`  | `/keg/github/{owner}/{repo}/nodes/{id}` | Entry Markdown (`text/markdown`) |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! The `/keg/github` routes accept an optional `?branch=` query and are
//! only registered when a GitHub token is configured. Each of them first
//! asks GitHub whether the repository exists.
//!
//! # Error Contract
//!
//! ```json
//! { "error": "repository does not exist: octocat/nope", "code": "not_found" }
//! ```
//!
//! Codes: `bad_request` (400), `not_found` (404), `provider_error`,
//! `fetch_error`, `no_keg`, `parse_error`, `internal` (all 500).

use axum::{
    extract::{Path, Query, Request, State},
    http::{header, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::connector_git::{GitFetcher, SourceFetcher};
use crate::descriptor::KegDescriptor;
use crate::error::KegError;
use crate::github::{GithubProvider, RepoProvider};
use crate::keg::Keg;
use crate::models::{NodeId, NodeMap, RepoRef};

/// Shared state of the keg routes.
#[derive(Clone)]
struct AppState {
    config: Arc<Config>,
    provider: Arc<dyn RepoProvider>,
    fetcher: Arc<dyn SourceFetcher>,
}

/// Repository resolved by [`require_repo`] for the downstream handler.
#[derive(Debug, Clone)]
struct RepoTarget {
    repo: RepoRef,
    clone_url: String,
}

/// Builds the application router.
///
/// With `provider` set to `None` only `/health` is served; the keg routes
/// are not registered at all.
pub fn build_router(
    config: Arc<Config>,
    provider: Option<Arc<dyn RepoProvider>>,
    fetcher: Arc<dyn SourceFetcher>,
) -> Router {
    let mut app = Router::new().route("/health", get(handle_health));

    if let Some(provider) = provider {
        let state = AppState {
            config,
            provider,
            fetcher,
        };

        let keg_routes = Router::new()
            .route("/keg/github/{owner}/{repo}", get(handle_keg))
            .route("/keg/github/{owner}/{repo}/dex", get(handle_dex))
            .route("/keg/github/{owner}/{repo}/nodes/{id}", get(handle_node))
            .route_layer(middleware::from_fn_with_state(state.clone(), require_repo))
            .with_state(state);

        app = app.merge(keg_routes);
    }

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    app.layer(cors).layer(TraceLayer::new_for_http())
}

/// Starts the HTTP server on `[server].bind` and runs until Ctrl-C.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let provider = GithubProvider::from_config(&config.github)?
        .map(|p| Arc::new(p) as Arc<dyn RepoProvider>);
    if provider.is_none() {
        tracing::warn!("GITHUB_TOKEN is not set; /keg/github routes are disabled");
    }

    let fetcher = Arc::new(GitFetcher::from_config(&config.fetch));
    let app = build_router(Arc::new(config.clone()), provider, fetcher);

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    tracing::info!(bind = %config.server.bind, "kegeye listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutting down");
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    code: &'static str,
}

/// Error type that converts into an Axum HTTP response.
#[derive(Debug)]
struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl AppError {
    fn body(&self) -> Json<ErrorBody> {
        Json(ErrorBody {
            error: self.message.clone(),
            code: self.code,
        })
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        (self.status, self.body()).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request",
        message: message.into(),
    }
}

impl From<KegError> for AppError {
    fn from(err: KegError) -> Self {
        let (status, code) = match &err {
            KegError::InvalidRepoRef(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            KegError::RepositoryNotFound { .. } | KegError::EntryNotFound(_) => {
                (StatusCode::NOT_FOUND, "not_found")
            }
            KegError::Provider(_) => (StatusCode::INTERNAL_SERVER_ERROR, "provider_error"),
            KegError::Fetch(_) | KegError::RepositoryEmpty => {
                (StatusCode::INTERNAL_SERVER_ERROR, "fetch_error")
            }
            KegError::NoKegFound | KegError::NoDexFound => {
                (StatusCode::INTERNAL_SERVER_ERROR, "no_keg")
            }
            KegError::Parse(_) => (StatusCode::INTERNAL_SERVER_ERROR, "parse_error"),
            KegError::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
        };

        if status.is_server_error() {
            tracing::error!(error = %err, "request failed");
        } else {
            tracing::debug!(error = %err, "request rejected");
        }

        AppError {
            status,
            code,
            message: err.to_string(),
        }
    }
}

// ============ Repository middleware ============

#[derive(Deserialize)]
struct RepoParams {
    owner: String,
    repo: String,
}

#[derive(Deserialize)]
struct BranchQuery {
    branch: Option<String>,
}

/// Confirms the repository exists and picks the branch to clone.
///
/// Answers `404` if the provider reports the repository absent.
async fn require_repo(
    State(state): State<AppState>,
    Path(params): Path<RepoParams>,
    Query(query): Query<BranchQuery>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let repo = RepoRef::new(params.owner, params.repo)?;
    let remote = state.provider.lookup(&repo).await?;

    let branch = query.branch.unwrap_or(remote.default_branch);
    let repo = repo.with_branch(branch)?;

    req.extensions_mut().insert(RepoTarget {
        repo,
        clone_url: remote.clone_url,
    });
    Ok(next.run(req).await)
}

async fn open_keg(state: &AppState, target: &RepoTarget) -> Result<Keg, KegError> {
    let snapshot = state
        .fetcher
        .fetch(&target.clone_url, target.repo.branch())
        .await?;
    Keg::open(snapshot, &state.config.keg.search_paths).await
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

// ============ GET /keg/github/{owner}/{repo} ============

#[derive(Serialize)]
struct KegResponse {
    keg: KegDescriptor,
}

async fn handle_keg(
    State(state): State<AppState>,
    Extension(target): Extension<RepoTarget>,
) -> Result<Json<KegResponse>, AppError> {
    let keg = open_keg(&state, &target).await?;
    let descriptor = keg.descriptor().await?;
    Ok(Json(KegResponse { keg: descriptor }))
}

// ============ GET /keg/github/{owner}/{repo}/dex ============

async fn handle_dex(
    State(state): State<AppState>,
    Extension(target): Extension<RepoTarget>,
) -> Result<Json<NodeMap>, AppError> {
    let keg = open_keg(&state, &target).await?;
    let dex = keg.dex().await?;
    Ok(Json(dex.nodes))
}

// ============ GET /keg/github/{owner}/{repo}/nodes/{id} ============

#[derive(Deserialize)]
struct EntryParams {
    id: String,
}

/// Serves an entry listed in the dex.
///
/// A missing entry is `404` unless `server.compat_missing_entry_200` is set,
/// in which case the same error body comes back with `200`.
async fn handle_node(
    State(state): State<AppState>,
    Extension(target): Extension<RepoTarget>,
    Path(params): Path<EntryParams>,
) -> Result<Response, AppError> {
    let id: NodeId = params
        .id
        .parse()
        .map_err(|_| bad_request(format!("invalid id {:?}, must be an integer", params.id)))?;

    let keg = open_keg(&state, &target).await?;
    match keg.indexed_entry(id).await {
        Ok(markdown) => Ok((
            [(header::CONTENT_TYPE, "text/markdown; charset=utf-8")],
            markdown,
        )
            .into_response()),
        Err(KegError::EntryNotFound(id)) if state.config.server.compat_missing_entry_200 => {
            let err = AppError::from(KegError::EntryNotFound(id));
            Ok((StatusCode::OK, err.body()).into_response())
        }
        Err(e) => Err(e.into()),
    }
}
