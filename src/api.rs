//! HTTP API and report page.
//!
//! Every failure is turned into `{"success": false, "message": ...}`; no
//! error escapes a handler. Git work runs on the blocking pool, one request
//! at a time per handler invocation.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    response::{Html, IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use indexmap::IndexMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::branches::list_branches;
use crate::domain::{parse_keywords, AppConfig, BranchInfo, PlatformProfile, ReportRow, RepositoryConfig};
use crate::error::{Error, Result};
use crate::ports::ConfigStore;
use crate::report::check_merge_status;
use crate::session::RepoConnector;

const INDEX_HTML: &str = include_str!("../assets/index.html");

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub connector: RepoConnector,
    pub config: Arc<dyn ConfigStore>,
    /// Serializes read-modify-write cycles on the configuration file.
    config_guard: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(connector: RepoConnector, config: Arc<dyn ConfigStore>) -> Self {
        Self {
            connector,
            config,
            config_guard: Arc::new(Mutex::new(())),
        }
    }
}

/// Error returned to API clients.
#[derive(Debug)]
pub struct ApiError(String);

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        ApiError(err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError(format!("invalid request body: {}", rejection.body_text()))
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError(format!("invalid path: {}", rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        warn!(error = %self.0, "request failed");
        Json(MessageResponse {
            success: false,
            message: self.0,
        })
        .into_response()
    }
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub success: bool,
    pub message: String,
}

impl MessageResponse {
    fn ok(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            success: true,
            message: message.into(),
        })
    }
}

#[derive(Debug, Serialize)]
pub struct ConfigResponse {
    pub success: bool,
    pub repositories: Vec<RepositoryConfig>,
    pub platforms: IndexMap<String, PlatformProfile>,
}

#[derive(Debug, Serialize)]
pub struct RepositoryResponse {
    pub success: bool,
    pub message: String,
    pub repository: RepositoryConfig,
}

#[derive(Debug, Serialize)]
pub struct ConnectResponse {
    pub success: bool,
    pub message: String,
    pub branches: Vec<BranchInfo>,
    pub local_path: String,
}

#[derive(Debug, Serialize)]
pub struct CheckMergeResponse {
    pub success: bool,
    pub results: Vec<ReportRow>,
}

#[derive(Debug, Deserialize)]
pub struct PlatformRequest {
    #[serde(default)]
    pub key: String,
    pub config: PlatformProfile,
}

#[derive(Debug, Deserialize)]
pub struct ConnectRequest {
    #[serde(default)]
    pub repo_input: String,
}

#[derive(Debug, Deserialize)]
pub struct CheckMergeRequest {
    #[serde(default)]
    pub repo_input: String,
    #[serde(default)]
    pub keyword: String,
    #[serde(default)]
    pub target_branch: String,
}

/// Creates the API router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health_check))
        .route("/api/config", get(get_config))
        .route("/api/config/save", post(save_config))
        .route("/api/config/repository", post(add_repository))
        .route("/api/config/repository/{index}", delete(remove_repository))
        .route("/api/config/platform", post(upsert_platform))
        .route("/api/connect", post(connect))
        .route("/api/check_merge", post(check_merge))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Run git or file work on the blocking pool.
async fn blocking<T, F>(work: F) -> std::result::Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| ApiError(format!("worker failed: {}", e)))?
        .map_err(ApiError::from)
}

/// Load, mutate and save the configuration under the config guard.
async fn update_config<T, F>(state: &AppState, mutate: F) -> std::result::Result<T, ApiError>
where
    T: Send + 'static,
    F: FnOnce(&mut AppConfig) -> Result<T> + Send + 'static,
{
    let _guard = state.config_guard.lock().await;
    let store = state.config.clone();
    blocking(move || {
        let mut config = store.load();
        let value = mutate(&mut config)?;
        store.save(&config)?;
        Ok(value)
    })
    .await
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn health_check() -> Json<MessageResponse> {
    MessageResponse::ok("ok")
}

async fn get_config(State(state): State<AppState>) -> std::result::Result<Json<ConfigResponse>, ApiError> {
    let store = state.config.clone();
    let config = blocking(move || Ok(store.load())).await?;
    Ok(Json(ConfigResponse {
        success: true,
        repositories: config.repositories,
        platforms: config.platforms,
    }))
}

async fn save_config(
    State(state): State<AppState>,
    payload: std::result::Result<Json<AppConfig>, JsonRejection>,
) -> std::result::Result<Json<MessageResponse>, ApiError> {
    let Json(config) = payload?;
    let config = config.validated()?;
    let _guard = state.config_guard.lock().await;
    let store = state.config.clone();
    blocking(move || store.save(&config)).await?;
    info!("configuration saved");
    Ok(MessageResponse::ok("configuration saved"))
}

async fn add_repository(
    State(state): State<AppState>,
    payload: std::result::Result<Json<RepositoryConfig>, JsonRejection>,
) -> std::result::Result<Json<RepositoryResponse>, ApiError> {
    let Json(repo) = payload?;
    let repository = update_config(&state, move |config| Ok(config.add_repository(repo)?.clone())).await?;
    info!(name = %repository.name, "repository added");
    Ok(Json(RepositoryResponse {
        success: true,
        message: format!("repository '{}' added", repository.name),
        repository,
    }))
}

async fn remove_repository(
    State(state): State<AppState>,
    index: std::result::Result<Path<usize>, PathRejection>,
) -> std::result::Result<Json<MessageResponse>, ApiError> {
    let Path(index) = index?;
    let removed = update_config(&state, move |config| config.remove_repository(index)).await?;
    info!(name = %removed.name, "repository removed");
    Ok(MessageResponse::ok(format!("repository '{}' removed", removed.name)))
}

async fn upsert_platform(
    State(state): State<AppState>,
    payload: std::result::Result<Json<PlatformRequest>, JsonRejection>,
) -> std::result::Result<Json<MessageResponse>, ApiError> {
    let Json(request) = payload?;
    let key = request.key.trim().to_string();
    let saved_key = key.clone();
    update_config(&state, move |config| config.upsert_platform(&key, request.config)).await?;
    info!(key = %saved_key, "platform saved");
    Ok(MessageResponse::ok(format!("platform '{}' saved", saved_key)))
}

async fn connect(
    State(state): State<AppState>,
    payload: std::result::Result<Json<ConnectRequest>, JsonRejection>,
) -> std::result::Result<Json<ConnectResponse>, ApiError> {
    let Json(request) = payload?;
    let connector = state.connector.clone();
    let response = blocking(move || {
        let session = connector.connect(&request.repo_input)?;
        let branches = list_branches(session.repo())?;
        Ok(ConnectResponse {
            success: true,
            message: session.message.clone(),
            branches,
            local_path: session.local_path.display().to_string(),
        })
    })
    .await?;
    Ok(Json(response))
}

async fn check_merge(
    State(state): State<AppState>,
    payload: std::result::Result<Json<CheckMergeRequest>, JsonRejection>,
) -> std::result::Result<Json<CheckMergeResponse>, ApiError> {
    let Json(request) = payload?;
    let keywords = parse_keywords(&request.keyword);
    let target = request.target_branch.trim().to_string();
    if request.repo_input.trim().is_empty() || keywords.is_empty() || target.is_empty() {
        return Err(ApiError(
            "repo_input, keyword and target_branch are required".to_string(),
        ));
    }

    let connector = state.connector.clone();
    let store = state.config.clone();
    let results = blocking(move || {
        let config = store.load();
        let session = connector.connect(&request.repo_input)?;
        check_merge_status(&session, &config, &keywords, &target)
    })
    .await?;
    Ok(Json(CheckMergeResponse {
        success: true,
        results,
    }))
}
