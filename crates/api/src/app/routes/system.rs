use std::sync::Arc;

use axum::{
    Json,
    extract::Extension,
    http::StatusCode,
    response::IntoResponse,
};

use crate::app::services::{AppServices, realtime_sse_stream};
use crate::context::AuthContext;

pub async fn health() -> axum::response::Response {
    (StatusCode::OK, Json(serde_json::json!({ "status": "ok" }))).into_response()
}

pub async fn whoami(Extension(ctx): Extension<AuthContext>) -> axum::response::Response {
    let scope = match ctx.scope().enterprise_ids() {
        None => serde_json::json!("all"),
        Some(ids) => serde_json::json!(ids.iter().map(|id| id.to_string()).collect::<Vec<_>>()),
    };

    (
        StatusCode::OK,
        Json(serde_json::json!({
            "principal_id": ctx.principal_id().to_string(),
            "roles": ctx.roles().iter().map(|r| r.as_str()).collect::<Vec<_>>(),
            "enterprises": scope,
        })),
    )
        .into_response()
}

pub async fn stream(
    Extension(services): Extension<Arc<AppServices>>,
) -> axum::response::Response {
    realtime_sse_stream(services).into_response()
}
