use axum::{
    middleware,
    routing::{any_service, get},
    Router,
};
use rmcp::handler::server::tool::ToolRouter;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::api::well_known::{oauth_protected_resource, AuthorizationServers, RESOURCE_METADATA_PATH};
use crate::clients::erp::ErpClient;
use crate::infra::auth::{require_bearer, JwksVerifier, SharedVerifier};
use crate::infra::config::Config;
use crate::infra::runtime::mcp_transport::{self, LocalSessionManager};
use crate::tools::erp::tool_router::ErpSvc;

/// Builds the per-session `(handler, tools)` pair for the ERP tool set.
pub fn erp_factory(client: ErpClient) -> impl Fn() -> (ErpSvc, ToolRouter<ErpSvc>) + Send + Sync + Clone + 'static {
    move || (ErpSvc::new(client.clone()), ErpSvc::router())
}

/// `/healthz`, the protected-resource metadata, and bearer-protected MCP at `/mcp`.
///
/// CORS mirrors any origin, method and header and allows credentials. That
/// suits local development only.
pub fn build_app(client: ErpClient, verifier: SharedVerifier, authorization_servers: Vec<String>) -> Router {
    let session_mgr = Arc::new(LocalSessionManager::default());
    let mcp_service = mcp_transport::make_streamable_http_service(erp_factory(client), session_mgr);

    let mcp = Router::new()
        .route_service("/mcp", any_service(mcp_service))
        .layer(middleware::from_fn_with_state(verifier, require_bearer));

    let metadata = Router::new()
        .route(
            RESOURCE_METADATA_PATH,
            get(oauth_protected_resource).options(oauth_protected_resource),
        )
        .with_state(Arc::new(AuthorizationServers(authorization_servers)));

    Router::new()
        .route("/healthz", get(|| async { "ok" }))
        .merge(metadata)
        .merge(mcp)
        .layer(CorsLayer::very_permissive())
        .layer(TraceLayer::new_for_http())
}

/// Production wiring from configuration.
pub fn build_app_from_config(cfg: &Config) -> Router {
    let client = ErpClient::new(cfg.erp.clone());
    let verifier: SharedVerifier = Arc::new(JwksVerifier::from_config(&cfg.auth));
    build_app(client, verifier, vec![cfg.auth.domain.clone()])
}
