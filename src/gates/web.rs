use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use crate::gates::resolver::applicable_gates;
use crate::gates::types::RuleValue;
use crate::gates::RuleStore;

#[derive(Debug, Serialize)]
pub struct ResolveResponse<'a> {
    pub controller: String,
    pub action: String,
    pub rule: &'a RuleValue,
}

pub fn router(state: Arc<RuleStore>) -> Router {
    Router::new()
        .route("/v1/gates/{controller}/{action}", get(handle_resolve))
        .route("/healthz", get(health))
        .with_state(state)
}

async fn handle_resolve(
    State(state): State<Arc<RuleStore>>,
    Path((controller, action)): Path<(String, String)>,
) -> impl IntoResponse {
    let rule = applicable_gates(&controller, &action, &state);
    Json(ResolveResponse {
        controller,
        action,
        rule,
    })
    .into_response()
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}
