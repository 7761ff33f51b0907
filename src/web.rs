//! The HTTP host: a small demo application whose routes are dispatched to
//! controller/action pairs and gated by the policies in `gates.policies_dir`.
use crate::errors::GatehouseError;
use crate::gates::builtin::PRINCIPAL;
use crate::gates::context::GateState;
use crate::gates::middleware::{enforce_gates, GatesMiddleware};
use crate::gates::types::Dispatch;
use crate::settings::Settings;
use axum::extract::{MatchedPath, Path, Request, State};
use axum::http::Method;
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Extension, Json, Router};
use serde_json::json;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;

/// Maps (method, route pattern) to the controller/action that handles it.
#[derive(Debug, Clone, Default)]
pub struct DispatchTable {
    routes: HashMap<(Method, String), Dispatch>,
}

impl DispatchTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn map(
        mut self,
        method: Method,
        route: &str,
        controller: &str,
        action: &str,
    ) -> Self {
        self.routes
            .insert((method, route.to_string()), Dispatch::new(controller, action));
        self
    }

    /// The dispatch for a request on `route`.
    ///
    /// Routes nobody mapped dispatch to `<route>.<method>`, which no policy
    /// names, so they fall through to the `*` controller. A method a mapped
    /// route has no handler for is not dispatched at all, so the router's own
    /// 405 reaches the client instead of a gate decision.
    pub fn lookup(&self, method: &Method, route: &str) -> Option<Dispatch> {
        if let Some(dispatch) = self.routes.get(&(method.clone(), route.to_string())) {
            return Some(dispatch.clone());
        }
        if self.routes.keys().any(|(_, r)| r == route) {
            return None;
        }
        Some(Dispatch::new(route, method.as_str().to_lowercase()))
    }
}

async fn dispatch(
    State(table): State<Arc<DispatchTable>>,
    mut request: Request,
    next: Next,
) -> Response {
    let dispatch = request
        .extensions()
        .get::<MatchedPath>()
        .and_then(|route| table.lookup(request.method(), route.as_str()));
    if let Some(dispatch) = dispatch {
        request.extensions_mut().insert(dispatch);
    }
    next.run(request).await
}

pub fn dispatch_table() -> DispatchTable {
    DispatchTable::new()
        .map(Method::GET, "/", "home", "index")
        .map(Method::GET, "/login", "sessions", "new")
        .map(Method::GET, "/users", "users", "index")
        .map(Method::GET, "/users/{id}", "users", "show")
        .map(Method::POST, "/users/{id}", "users", "update")
        .map(Method::GET, "/admin", "admin", "dashboard")
}

/// The demo application with the dispatch and gates layers applied.
pub fn app(gates: Arc<GatesMiddleware>, table: DispatchTable) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/login", get(login_page))
        .route("/users", get(list_users))
        .route("/users/{id}", get(show_user).post(update_user))
        .route("/admin", get(admin_dashboard))
        // layers run bottom-up: dispatch first, then the gates
        .layer(middleware::from_fn_with_state(gates, enforce_gates))
        .layer(middleware::from_fn_with_state(Arc::new(table), dispatch))
}

pub async fn serve(settings: Settings, gates: GatesMiddleware) -> Result<(), GatehouseError> {
    let gates = Arc::new(gates);

    let public_addr: SocketAddr = format!("{}:{}", settings.server.host, settings.server.port)
        .parse()
        .map_err(|e| GatehouseError::Other(format!("bad listen addr: {e}")))?;

    // Start rule inspection API on a separate port
    if let Some(rules) = gates.rules().cloned() {
        let inspect_addr: SocketAddr =
            format!("{}:{}", settings.server.host, settings.inspect_port())
                .parse()
                .map_err(|e| GatehouseError::Other(format!("bad inspect addr: {e}")))?;
        let inspect_router = crate::gates::web::router(rules);
        let inspect_listener = tokio::net::TcpListener::bind(inspect_addr).await?;
        tracing::info!(%inspect_addr, "Gate rule inspection API listening");
        tokio::spawn(async move {
            if let Err(e) = axum::serve(inspect_listener, inspect_router).await {
                tracing::error!(error = %e, "Gate rule inspection API failed");
            }
        });
    } else {
        tracing::warn!("Gates are DISABLED - every request passes");
    }

    let router = app(gates, dispatch_table());

    tracing::info!(%public_addr, "Public API listening");
    let listener = tokio::net::TcpListener::bind(public_addr).await?;
    axum::serve(listener, router).await?;
    Ok(())
}

async fn index() -> impl IntoResponse {
    Json(json!({ "service": "gatehouse" }))
}

async fn login_page() -> impl IntoResponse {
    Json(json!({ "login": "send `Authorization: Bearer <name>`" }))
}

async fn list_users(Extension(state): Extension<GateState>) -> impl IntoResponse {
    Json(json!({ "users": ["alice", "bob"], "viewer": state.get(PRINCIPAL) }))
}

async fn show_user(
    Path(id): Path<String>,
    Extension(state): Extension<GateState>,
) -> impl IntoResponse {
    Json(json!({ "id": id, "viewer": state.get(PRINCIPAL) }))
}

async fn update_user(Path(id): Path<String>) -> impl IntoResponse {
    Json(json!({ "id": id, "updated": true }))
}

async fn admin_dashboard() -> impl IntoResponse {
    Json(json!({ "admin": true }))
}
