use std::sync::Arc;
use axum::{routing::{get, post}, Router, Json};
use tower_http::cors::{CorsLayer, Any};
use serde::{Deserialize, Serialize};
use serde_json::json;
use axum::http::StatusCode;
use tracing::{info, warn};
use crate::engine::{CancelOnDrop, CancelToken};
use crate::executor::{Executor, ResultMap, RENDER_PREDICATES};
use crate::table::TableResult;

#[derive(Deserialize)]
pub struct ExecuteRequest {
    #[serde(rename = "domainLanguage")]
    pub domain_language: String,
    #[serde(rename = "visualLanguage", default)]
    pub visual_language: Option<String>,
}

#[derive(Serialize)]
pub struct ExecuteResponse {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tables: Option<ResultMap>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub graph: Option<TableResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub node: Option<TableResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub edge: Option<TableResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// The frontend binds the three render predicates directly, so they are echoed
// as flat keys next to the full map.
fn ok_response(tables: ResultMap) -> ExecuteResponse {
    let pick = |name: &str| Some(tables.get(name).cloned().unwrap_or_default());
    ExecuteResponse {
        status: "OK".into(),
        graph: pick("Graph"),
        node: pick("Node"),
        edge: pick("Edge"),
        tables: Some(tables),
        error: None,
    }
}

fn error_response(message: String) -> ExecuteResponse {
    ExecuteResponse {
        status: "error".into(),
        tables: None,
        graph: None,
        node: None,
        edge: None,
        error: Some(message),
    }
}

pub fn router(executor: Arc<Executor>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);
    let execute = post(move |Json(req): Json<ExecuteRequest>| {
        let executor = Arc::clone(&executor);
        async move {
            // We run the chain in a blocking thread since engine invocations are synchronous.
            let started = std::time::Instant::now();
            // If the client goes away this future is dropped, the guard fires,
            // and any in-flight engine process is killed.
            let cancel = CancelToken::new();
            let _guard = CancelOnDrop::new(cancel.clone());
            let result = tokio::task::spawn_blocking(move || {
                executor.execute_cancellable(
                    &req.domain_language,
                    req.visual_language.as_deref(),
                    &RENDER_PREDICATES,
                    &cancel,
                )
            }).await.map_err(|e| {
                warn!(error=%e, "Join error");
                (StatusCode::INTERNAL_SERVER_ERROR, "Join error")
            })?;
            let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
            match result {
                Ok(tables) => {
                    let rows: usize = tables.values().map(|t| t.rows.len()).sum();
                    info!(ms = elapsed_ms, rows, "execution complete");
                    Ok::<_, (StatusCode, &'static str)>((StatusCode::OK, Json(ok_response(tables))))
                }
                Err(e) => {
                    let msg = format!("{e}");
                    warn!(%msg, ms = elapsed_ms, "execution error");
                    Ok::<_, (StatusCode, &'static str)>((
                        StatusCode::INTERNAL_SERVER_ERROR,
                        Json(error_response(msg)),
                    ))
                }
            }
        }
    });
    Router::new()
        .route("/", execute.clone())
        // alias kept for the original playground frontend
        .route("/api/logica_backend", execute)
        .route("/health", get(|| async { Json(json!({"status": "healthy"})) }))
        .layer(cors)
}
