use std::sync::Arc;
use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use tower_http::cors::{Any, CorsLayer};
use serde_json::json;
use tracing::{info, warn};
use crate::error::FacadeError;
use crate::resolver::{Reply, Resolver};
use crate::root;

/// Prefix every SensorThings route is mounted under.
pub const VERSION_PREFIX: &str = "/v1.1";

impl IntoResponse for Reply {
    fn into_response(self) -> Response {
        match self.body() {
            Some(body) => (StatusCode::OK, Json(body)).into_response(),
            None => {
                let text = self.text().unwrap_or_default().to_string();
                (StatusCode::OK, [(header::CONTENT_TYPE, "text/plain; charset=utf-8")], text).into_response()
            }
        }
    }
}

impl IntoResponse for FacadeError {
    fn into_response(self) -> Response {
        let status = match &self {
            e if e.is_upstream_not_found() => StatusCode::NOT_FOUND,
            FacadeError::Upstream { .. } | FacadeError::Decode(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let msg = format!("{self}");
        warn!(%msg, code = %status.as_u16(), "request failed");
        (status, Json(json!({ "error": msg }))).into_response()
    }
}

async fn service_root(State(resolver): State<Arc<Resolver>>) -> impl IntoResponse {
    Json(root::capabilities(resolver.translator().service_root()))
}

async fn entity_set(
    State(resolver): State<Arc<Resolver>>,
    Path(param): Path<String>,
) -> Result<Reply, FacadeError> {
    respond(&resolver, &param, None, None).await
}

async fn nested(
    State(resolver): State<Arc<Resolver>>,
    Path((param, nest)): Path<(String, String)>,
) -> Result<Reply, FacadeError> {
    respond(&resolver, &param, Some(&nest), None).await
}

async fn qualified(
    State(resolver): State<Arc<Resolver>>,
    Path((param, nest, subrequest)): Path<(String, String, String)>,
) -> Result<Reply, FacadeError> {
    respond(&resolver, &param, Some(&nest), Some(&subrequest)).await
}

async fn respond(
    resolver: &Resolver,
    param: &str,
    nest: Option<&str>,
    subrequest: Option<&str>,
) -> Result<Reply, FacadeError> {
    let started = std::time::Instant::now();
    let reply = resolver.resolve(param, nest, subrequest).await?;
    let elapsed_ms = started.elapsed().as_secs_f64() * 1000.0;
    info!(ms = elapsed_ms, param, nest, subrequest, "request resolved");
    Ok(reply)
}

pub fn router(resolver: Arc<Resolver>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([axum::http::Method::GET])
        .allow_headers(Any);
    Router::new()
        .route(VERSION_PREFIX, get(service_root))
        .route(&format!("{VERSION_PREFIX}/"), get(service_root))
        .route(&format!("{VERSION_PREFIX}/:param"), get(entity_set))
        .route(&format!("{VERSION_PREFIX}/:param/:nest"), get(nested))
        .route(&format!("{VERSION_PREFIX}/:param/:nest/:subrequest"), get(qualified))
        .layer(cors)
        .with_state(resolver)
}
