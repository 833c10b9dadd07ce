//! OAuth protected-resource metadata (RFC 9728) for MCP clients.

use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, Uri},
    Json,
};
use serde::Serialize;

pub const RESOURCE_METADATA_PATH: &str = "/.well-known/oauth-protected-resource";

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ProtectedResourceMetadata {
    pub resource: String,
    pub authorization_servers: Vec<String>,
    pub scopes_supported: Vec<&'static str>,
    pub bearer_methods_supported: Vec<&'static str>,
}

/// Identity provider issuers advertised to callers.
#[derive(Debug, Clone)]
pub struct AuthorizationServers(pub Vec<String>);

/// Scheme and host the caller used to reach us, honoring proxy headers.
pub fn observed_base_url(headers: &HeaderMap, uri: &Uri) -> String {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    let scheme = header("x-forwarded-proto")
        .or_else(|| uri.scheme_str())
        .unwrap_or("http");
    let host = header("x-forwarded-host")
        .or_else(|| header("host"))
        .or_else(|| uri.authority().map(|a| a.as_str()))
        .unwrap_or("localhost");
    format!("{scheme}://{host}")
}

pub async fn oauth_protected_resource(
    State(servers): State<Arc<AuthorizationServers>>,
    uri: Uri,
    headers: HeaderMap,
) -> Json<ProtectedResourceMetadata> {
    let resource = observed_base_url(&headers, &uri);
    tracing::debug!(%resource, "serving protected resource metadata");
    Json(ProtectedResourceMetadata {
        resource,
        authorization_servers: servers.0.clone(),
        scopes_supported: vec!["read", "write"],
        bearer_methods_supported: vec!["header", "body"],
    })
}
