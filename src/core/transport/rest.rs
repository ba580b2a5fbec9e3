//! REST admin API.
//!
//! Mirrors the administrative operations for plain HTTP clients:
//!
//! | Method & path | Operation |
//! |---|---|
//! | `GET /api/tools` | list expression tools |
//! | `POST /api/tools?mode=add\|upsert` | add or upsert an expression tool |
//! | `DELETE /api/tools/{name}` | remove an expression tool |
//! | `POST /api/tools/{name}/execute` | run an expression tool |
//! | `POST /api/plugins?filename=NAME` | upload a bundle (raw body) |
//! | `GET /api/plugins` | list plugins |
//! | `DELETE /api/plugins/{id}?deleteBundle=bool` | unload a plugin (`{id, unloaded}`) |
//! | `GET /api/catalog/tools` | list the catalog |
//!
//! Failures answer `{"error": kind, "message": text}` with a status derived
//! from the error kind.

use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Path, Query, State},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use bytes::Bytes;
use http::StatusCode;
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::{Map, Value, json};
use tracing::{info, instrument, warn};

use super::http::AppState;
use crate::core::error::ErrorKind;
use crate::domains::expressions::{ExpressionError, ExpressionTool};
use crate::domains::plugins::PluginError;
use crate::domains::tools::definitions::{AddMode, ExpressionToolDraft};

/// Slack on top of the bundle limit so the loader, not the extractor,
/// reports an oversized bundle.
const BODY_LIMIT_SLACK: usize = 1024;

/// Build the `/api` routes.
pub fn routes(max_bundle_bytes: u64) -> Router<AppState> {
    let upload_limit = usize::try_from(max_bundle_bytes)
        .unwrap_or(usize::MAX)
        .saturating_add(BODY_LIMIT_SLACK);

    Router::new()
        .route("/api/tools", get(list_tools).post(add_tool))
        .route("/api/tools/{name}", delete(remove_tool))
        .route("/api/tools/{name}/execute", post(execute_tool))
        .route(
            "/api/plugins",
            get(list_plugins)
                .post(upload_plugin)
                .layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/api/plugins/{id}", delete(unload_plugin))
        .route("/api/catalog/tools", get(list_catalog))
}

// ============================================================================
// Errors
// ============================================================================

/// An error answered as `{"error": kind, "message": text}`.
#[derive(Debug)]
pub struct ApiError {
    kind: ErrorKind,
    message: String,
}

impl ApiError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

/// HTTP status for an error kind.
pub fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Conflict => StatusCode::CONFLICT,
        ErrorKind::Unsupported | ErrorKind::EvaluationError | ErrorKind::LoadError => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        ErrorKind::IoError | ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        ErrorKind::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = status_for(self.kind);
        if status.is_server_error() {
            warn!("REST request failed ({}): {}", self.kind, self.message);
        }
        (
            status,
            Json(json!({ "error": self.kind, "message": self.message })),
        )
            .into_response()
    }
}

impl From<ExpressionError> for ApiError {
    fn from(e: ExpressionError) -> Self {
        Self::new(e.kind(), e.to_string())
    }
}

impl From<PluginError> for ApiError {
    fn from(e: PluginError) -> Self {
        Self::new(e.kind(), e.to_string())
    }
}

/// Parse a JSON body; an empty body parses as `{}`.
fn parse_body<T: DeserializeOwned>(body: &Bytes) -> Result<T, ApiError> {
    let raw: &[u8] = if body.iter().all(u8::is_ascii_whitespace) {
        b"{}"
    } else {
        body
    };
    serde_json::from_slice(raw)
        .map_err(|e| ApiError::new(ErrorKind::InvalidInput, format!("invalid JSON body: {e}")))
}

// ============================================================================
// Expression tools
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct ModeQuery {
    #[serde(default)]
    mode: AddMode,
}

async fn list_tools(State(state): State<AppState>) -> Json<Vec<ExpressionTool>> {
    Json(state.server.services().expressions.list())
}

#[instrument(skip_all)]
async fn add_tool(
    State(state): State<AppState>,
    Query(query): Query<ModeQuery>,
    body: Bytes,
) -> Result<(StatusCode, Json<ExpressionTool>), ApiError> {
    let draft: ExpressionToolDraft = parse_body(&body)?;
    let store = &state.server.services().expressions;
    let stored = match query.mode {
        AddMode::Add => store.add(draft.into())?,
        AddMode::Upsert => store.upsert(draft.into())?,
    };
    Ok((StatusCode::CREATED, Json(stored)))
}

async fn remove_tool(State(state): State<AppState>, Path(name): Path<String>) -> StatusCode {
    state.server.services().expressions.remove(&name);
    StatusCode::NO_CONTENT
}

#[instrument(skip(state, body))]
async fn execute_tool(
    State(state): State<AppState>,
    Path(name): Path<String>,
    body: Bytes,
) -> Result<Json<Value>, ApiError> {
    let args: Map<String, Value> = parse_body(&body)?;
    Ok(Json(state.server.services().executor.execute(&name, &args)?))
}

// ============================================================================
// Plugins
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    #[serde(default)]
    filename: String,
}

#[derive(Debug, Deserialize)]
pub struct UnloadQuery {
    #[serde(default, rename = "deleteBundle")]
    delete_bundle: bool,
}

#[instrument(skip(state, body), fields(bytes = body.len()))]
async fn upload_plugin(
    State(state): State<AppState>,
    Query(query): Query<UploadQuery>,
    body: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let descriptor = state
        .server
        .services()
        .loader
        .upload_and_load(body.as_ref(), &query.filename)
        .await?;
    info!("Plugin '{}' uploaded over REST", descriptor.id);
    Ok((StatusCode::CREATED, Json(descriptor)))
}

async fn list_plugins(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.server.services().loader.list().await)
}

/// Unloading an unknown id is not an error: it answers `unloaded: false`.
#[instrument(skip(state))]
async fn unload_plugin(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<UnloadQuery>,
) -> Json<Value> {
    let unloaded = state
        .server
        .services()
        .loader
        .unload(&id, query.delete_bundle)
        .await;
    Json(json!({ "id": id, "unloaded": unloaded }))
}

// ============================================================================
// Catalog
// ============================================================================

async fn list_catalog(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.server.services().catalog.list_direct())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Config, McpServer};
    use crate::domains::plugins::test_bundles::greeter_bundle;
    use http_body_util::BodyExt;
    use tempfile::TempDir;

    fn state_in(dir: &TempDir) -> AppState {
        let mut config = Config::default();
        config.plugins.storage_dir = dir.path().to_path_buf();
        AppState::new(McpServer::new(config).unwrap())
    }

    async fn body_json(response: Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_for(ErrorKind::InvalidInput), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(ErrorKind::Conflict), StatusCode::CONFLICT);
        assert_eq!(status_for(ErrorKind::EvaluationError), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(status_for(ErrorKind::LoadError), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(status_for(ErrorKind::Unavailable), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn test_error_body_names_kind() {
        let response = ApiError::from(ExpressionError::conflict("mul")).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        let body = body_json(response).await;
        assert_eq!(body["error"], "conflict");
        assert!(body["message"].as_str().unwrap().contains("mul"));
    }

    #[tokio::test]
    async fn test_add_and_execute_tool() {
        let dir = TempDir::new().unwrap();
        let state = state_in(&dir);

        let (status, Json(tool)) = add_tool(
            State(state.clone()),
            Query(ModeQuery { mode: AddMode::Add }),
            Bytes::from_static(br#"{"name": "mul", "expression": "a * b"}"#),
        )
        .await
        .unwrap();
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(tool.name, "mul");

        let Json(result) = execute_tool(
            State(state.clone()),
            Path("mul".to_string()),
            Bytes::from_static(br#"{"a": 3, "b": 7}"#),
        )
        .await
        .unwrap();
        assert_eq!(result, json!(21));

        let err = add_tool(
            State(state),
            Query(ModeQuery { mode: AddMode::Add }),
            Bytes::from_static(br#"{"name": "mul", "expression": "a"}"#),
        )
        .await
        .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn test_execute_without_body_uses_no_arguments() {
        let dir = TempDir::new().unwrap();
        let state = state_in(&dir);
        state
            .server
            .services()
            .expressions
            .add(ExpressionTool::new("answer", "6 * 7"))
            .unwrap();

        let Json(result) = execute_tool(State(state), Path("answer".to_string()), Bytes::new())
            .await
            .unwrap();
        assert_eq!(result, json!(42));
    }

    #[tokio::test]
    async fn test_upload_and_unload_plugin() {
        let dir = TempDir::new().unwrap();
        let state = state_in(&dir);

        let response = upload_plugin(
            State(state.clone()),
            Query(UploadQuery {
                filename: "greeter.wasm".to_string(),
            }),
            Bytes::from(greeter_bundle()),
        )
        .await
        .unwrap()
        .into_response();
        assert_eq!(response.status(), StatusCode::CREATED);
        let descriptor = body_json(response).await;
        let id = descriptor["id"].as_str().unwrap().to_string();

        let Json(body) = unload_plugin(
            State(state.clone()),
            Path(id.clone()),
            Query(UnloadQuery { delete_bundle: true }),
        )
        .await;
        assert_eq!(body, json!({"id": id, "unloaded": true}));
        assert!(!dir.path().join(format!("{id}.wasm")).exists());

        let Json(body) = unload_plugin(
            State(state),
            Path(id.clone()),
            Query(UnloadQuery {
                delete_bundle: false,
            }),
        )
        .await;
        assert_eq!(body, json!({"id": id, "unloaded": false}));
    }

    #[tokio::test]
    async fn test_upload_without_filename_is_bad_request() {
        let dir = TempDir::new().unwrap();
        let state = state_in(&dir);

        let err = upload_plugin(
            State(state),
            Query(UploadQuery {
                filename: String::new(),
            }),
            Bytes::from(greeter_bundle()),
        )
        .await
        .err()
        .unwrap();
        assert_eq!(status_for(err.kind), StatusCode::BAD_REQUEST);
    }
}
