use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{FromRequestParts, RawPathParams, Request, State};
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use crate::gates::context::GateContext;
use crate::gates::errors::{ErrorSink, GateError, TracingSink};
use crate::gates::registry::CheckRegistry;
use crate::gates::resolver::applicable_gates;
use crate::gates::runner::GateRunner;
use crate::gates::types::{Disposition, Dispatch};
use crate::gates::RuleStore;

/// Builds the responses for requests the gates stop.
pub trait ResponseFactory: Send + Sync {
    fn forbidden(&self) -> Response;
    fn internal_server_error(&self, error: &GateError) -> Response;
}

/// JSON error bodies. Error details are only included when `expose_errors`
/// is set.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonResponses {
    pub expose_errors: bool,
}

impl ResponseFactory for JsonResponses {
    fn forbidden(&self) -> Response {
        (StatusCode::FORBIDDEN, Json(json!({ "error": "forbidden" }))).into_response()
    }

    fn internal_server_error(&self, error: &GateError) -> Response {
        let body = if self.expose_errors {
            json!({ "error": "internal server error", "detail": error.to_string() })
        } else {
            json!({ "error": "internal server error" })
        };
        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}

/// Everything the gates layer needs per request. Shared as axum state.
#[derive(Clone)]
pub struct GatesMiddleware {
    rules: Option<Arc<RuleStore>>,
    registry: Arc<dyn CheckRegistry>,
    responses: Arc<dyn ResponseFactory>,
    sink: Arc<dyn ErrorSink>,
}

impl GatesMiddleware {
    /// Without rules every request passes; see [`GatesMiddleware::with_rules`].
    pub fn new(registry: Arc<dyn CheckRegistry>) -> Self {
        Self {
            rules: None,
            registry,
            responses: Arc::new(JsonResponses::default()),
            sink: Arc::new(TracingSink),
        }
    }

    pub fn with_rules(mut self, rules: Arc<RuleStore>) -> Self {
        self.rules = Some(rules);
        self
    }

    pub fn with_responses(mut self, responses: Arc<dyn ResponseFactory>) -> Self {
        self.responses = responses;
        self
    }

    pub fn with_error_sink(mut self, sink: Arc<dyn ErrorSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn rules(&self) -> Option<&Arc<RuleStore>> {
        self.rules.as_ref()
    }

    /// Resolve and run the rules for the context's dispatch.
    pub async fn evaluate(&self, ctx: &mut GateContext) -> Disposition {
        let Some(rules) = &self.rules else {
            return Disposition::Continue;
        };
        let dispatch = ctx.dispatch().clone();
        let rule = applicable_gates(&dispatch.controller, &dispatch.action, rules);
        GateRunner::new(self.registry.as_ref(), self.sink.as_ref())
            .run(ctx, rule)
            .await
    }

    /// The response for a disposition that stops the request, or `None` to
    /// let it through.
    pub fn response_for(&self, disposition: Disposition) -> Option<Response> {
        match disposition {
            Disposition::Continue => None,
            Disposition::Forbidden => Some(self.responses.forbidden()),
            Disposition::Respond(response) => Some(response),
            Disposition::ErrorReported(error) => Some(self.responses.internal_server_error(&error)),
        }
    }
}

impl std::fmt::Debug for GatesMiddleware {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatesMiddleware")
            .field("rules", &self.rules)
            .finish_non_exhaustive()
    }
}

/// axum middleware: gate every request that carries a [`Dispatch`].
///
/// Requests the host did not dispatch are not gated. Values gates attach to
/// the context reach handlers as a [`GateState`](crate::gates::context::GateState)
/// extension.
pub async fn enforce_gates(
    State(gates): State<Arc<GatesMiddleware>>,
    request: Request,
    next: Next,
) -> Response {
    let Some(dispatch) = request.extensions().get::<Dispatch>().cloned() else {
        return next.run(request).await;
    };

    let (mut parts, body) = request.into_parts();
    let params: HashMap<String, String> = RawPathParams::from_request_parts(&mut parts, &())
        .await
        .map(|p| p.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect())
        .unwrap_or_default();

    let mut ctx = GateContext::from_parts(dispatch, &parts, params);
    let disposition = gates.evaluate(&mut ctx).await;

    if let Some(response) = gates.response_for(disposition) {
        tracing::debug!(
            dispatch = %ctx.dispatch(),
            status = %response.status(),
            "request stopped by gates"
        );
        return response;
    }

    parts.extensions.insert(ctx.into_state());
    next.run(Request::from_parts(parts, body)).await
}
