//! Bearer-token authentication for the MCP endpoint.
//!
//! Tokens are JWTs issued by the identity provider. The signing keys are read
//! from the provider's published JWKS on each verification; issuer and
//! audience must match the configured project.

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use jsonwebtoken::{decode, decode_header, jwk::JwkSet, Algorithm, DecodingKey, Validation};
use serde_json::{json, Value as JsonValue};
use thiserror::Error;

use crate::api::well_known::{observed_base_url, RESOURCE_METADATA_PATH};
use crate::infra::config::AuthConfig;
use crate::infra::http::client::make_http_client;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("missing bearer token")]
    MissingToken,
    #[error("unable to fetch signing keys: {0}")]
    KeySet(String),
    #[error("no signing key matches kid {0:?}")]
    UnknownKey(Option<String>),
    #[error("algorithm {0:?} is not accepted")]
    UnsupportedAlgorithm(Algorithm),
    #[error("invalid token: {0}")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),
}

/// Verified caller identity, attached to the request extensions.
#[derive(Debug, Clone)]
pub struct AccessToken {
    pub subject: Option<String>,
    pub scopes: Vec<String>,
    pub claims: JsonValue,
}

impl AccessToken {
    pub fn from_claims(claims: JsonValue) -> Self {
        let subject = claims.get("sub").and_then(|v| v.as_str()).map(str::to_owned);
        let scopes = claims
            .get("scope")
            .and_then(|v| v.as_str())
            .map(|s| s.split_whitespace().map(str::to_owned).collect())
            .unwrap_or_default();
        Self {
            subject,
            scopes,
            claims,
        }
    }
}

#[async_trait]
pub trait TokenVerifier: Send + Sync + 'static {
    async fn verify(&self, token: &str) -> Result<AccessToken, AuthError>;
}

/// Verifies JWTs against a remote JWKS.
pub struct JwksVerifier {
    jwks_uri: String,
    issuer: String,
    audience: String,
    algorithms: Vec<Algorithm>,
    http: reqwest::Client,
}

impl JwksVerifier {
    pub fn new(
        jwks_uri: impl Into<String>,
        issuer: impl Into<String>,
        audience: impl Into<String>,
    ) -> Self {
        Self {
            jwks_uri: jwks_uri.into(),
            issuer: issuer.into(),
            audience: audience.into(),
            algorithms: vec![Algorithm::RS256],
            http: make_http_client(),
        }
    }

    pub fn from_config(cfg: &AuthConfig) -> Self {
        Self::new(cfg.jwks_uri(), cfg.domain.clone(), cfg.project_id.clone())
    }

    pub fn with_algorithms(mut self, algorithms: Vec<Algorithm>) -> Self {
        self.algorithms = algorithms;
        self
    }

    async fn fetch_keys(&self) -> Result<JwkSet, AuthError> {
        let resp = self
            .http
            .get(&self.jwks_uri)
            .send()
            .await
            .map_err(|e| AuthError::KeySet(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(AuthError::KeySet(format!("jwks status {}", resp.status())));
        }
        resp.json::<JwkSet>()
            .await
            .map_err(|e| AuthError::KeySet(e.to_string()))
    }
}

#[async_trait]
impl TokenVerifier for JwksVerifier {
    async fn verify(&self, token: &str) -> Result<AccessToken, AuthError> {
        let header = decode_header(token)?;
        if !self.algorithms.contains(&header.alg) {
            return Err(AuthError::UnsupportedAlgorithm(header.alg));
        }

        let keys = self.fetch_keys().await?;
        let jwk = match header.kid.as_deref() {
            Some(kid) => keys.find(kid),
            None => keys.keys.first(),
        }
        .ok_or_else(|| AuthError::UnknownKey(header.kid.clone()))?;
        let key = DecodingKey::from_jwk(jwk)?;

        let mut validation = Validation::new(header.alg);
        validation.set_issuer(&[&self.issuer]);
        validation.set_audience(&[&self.audience]);

        let data = decode::<JsonValue>(token, &key, &validation)?;
        Ok(AccessToken::from_claims(data.claims))
    }
}

pub type SharedVerifier = Arc<dyn TokenVerifier>;

pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

/// Rejects the request with 401 unless it carries a verifiable bearer token.
pub async fn require_bearer(
    State(verifier): State<SharedVerifier>,
    mut req: Request,
    next: Next,
) -> Response {
    let outcome = match bearer_token(req.headers()) {
        Some(token) => verifier.verify(token).await,
        None => Err(AuthError::MissingToken),
    };
    match outcome {
        Ok(access) => {
            tracing::debug!(subject = ?access.subject, scopes = ?access.scopes, "bearer token accepted");
            req.extensions_mut().insert(access);
            next.run(req).await
        }
        Err(e) => {
            tracing::warn!(error = %e, path = %req.uri().path(), "rejecting unauthenticated request");
            unauthorized(req.headers(), req.uri(), &e)
        }
    }
}

fn unauthorized(headers: &HeaderMap, uri: &axum::http::Uri, err: &AuthError) -> Response {
    let metadata = format!("{}{}", observed_base_url(headers, uri), RESOURCE_METADATA_PATH);
    let (code, description) = match err {
        AuthError::MissingToken => ("invalid_request", err.to_string()),
        _ => ("invalid_token", err.to_string()),
    };
    let challenge = format!(r#"Bearer error="{code}", resource_metadata="{metadata}""#);

    let mut resp = (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "error": code, "error_description": description })),
    )
        .into_response();
    if let Ok(v) = HeaderValue::from_str(&challenge) {
        resp.headers_mut().insert(header::WWW_AUTHENTICATE, v);
    }
    resp
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    const SECRET: &[u8] = b"erp-gateway-test-signing-secret";
    // base64url(SECRET), as published in an "oct" JWK
    const SECRET_B64: &str = "ZXJwLWdhdGV3YXktdGVzdC1zaWduaW5nLXNlY3JldA";
    const ISSUER: &str = "https://login.example.com";
    const AUDIENCE: &str = "project-test-123";

    fn jwks_server() -> MockServer {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/.well-known/jwks.json");
            then.status(200).json_body(json!({
                "keys": [{ "kty": "oct", "kid": "test-key", "alg": "HS256", "k": SECRET_B64 }]
            }));
        });
        server
    }

    fn verifier(server: &MockServer) -> JwksVerifier {
        JwksVerifier::new(server.url("/.well-known/jwks.json"), ISSUER, AUDIENCE)
            .with_algorithms(vec![Algorithm::HS256])
    }

    fn sign(claims: JsonValue, kid: Option<&str>) -> String {
        let mut header = Header::new(Algorithm::HS256);
        header.kid = kid.map(str::to_owned);
        encode(&header, &claims, &EncodingKey::from_secret(SECRET)).unwrap()
    }

    fn claims(aud: &str) -> JsonValue {
        json!({
            "sub": "user-test-1",
            "iss": ISSUER,
            "aud": aud,
            "exp": 4_102_444_800u64,
            "scope": "read write"
        })
    }

    #[tokio::test]
    async fn accepts_token_signed_by_published_key() {
        let server = jwks_server();
        let token = sign(claims(AUDIENCE), Some("test-key"));
        let access = verifier(&server).verify(&token).await.unwrap();
        assert_eq!(access.subject.as_deref(), Some("user-test-1"));
        assert_eq!(access.scopes, ["read", "write"]);
    }

    #[tokio::test]
    async fn token_without_kid_uses_first_key() {
        let server = jwks_server();
        let token = sign(claims(AUDIENCE), None);
        assert!(verifier(&server).verify(&token).await.is_ok());
    }

    #[tokio::test]
    async fn rejects_wrong_audience() {
        let server = jwks_server();
        let token = sign(claims("someone-else"), Some("test-key"));
        let err = verifier(&server).verify(&token).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken(_)), "got {err:?}");
    }

    #[tokio::test]
    async fn rejects_unknown_kid() {
        let server = jwks_server();
        let token = sign(claims(AUDIENCE), Some("rotated-away"));
        let err = verifier(&server).verify(&token).await.unwrap_err();
        assert!(matches!(err, AuthError::UnknownKey(Some(_))), "got {err:?}");
    }

    #[tokio::test]
    async fn rejects_algorithm_outside_allow_list() {
        let server = jwks_server();
        let token = sign(claims(AUDIENCE), Some("test-key"));
        let strict = JwksVerifier::new(server.url("/.well-known/jwks.json"), ISSUER, AUDIENCE);
        let err = strict.verify(&token).await.unwrap_err();
        assert!(matches!(err, AuthError::UnsupportedAlgorithm(Algorithm::HS256)));
    }

    #[tokio::test]
    async fn unreachable_key_set_is_reported() {
        let token = sign(claims(AUDIENCE), Some("test-key"));
        let v = JwksVerifier::new("http://127.0.0.1:1/.well-known/jwks.json", ISSUER, AUDIENCE)
            .with_algorithms(vec![Algorithm::HS256]);
        assert!(matches!(v.verify(&token).await, Err(AuthError::KeySet(_))));
    }

    #[tokio::test]
    async fn garbage_token_is_invalid() {
        let server = jwks_server();
        let err = verifier(&server).verify("not-a-jwt").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidToken(_)));
    }

    #[test]
    fn extracts_bearer_token_case_insensitively() {
        let mut h = HeaderMap::new();
        assert_eq!(bearer_token(&h), None);
        h.insert(header::AUTHORIZATION, HeaderValue::from_static("bearer abc.def.ghi"));
        assert_eq!(bearer_token(&h), Some("abc.def.ghi"));
        h.insert(header::AUTHORIZATION, HeaderValue::from_static("Basic dXNlcjpwYXNz"));
        assert_eq!(bearer_token(&h), None);
        h.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(bearer_token(&h), None);
    }

    #[test]
    fn scopes_are_split_from_claim() {
        let t = AccessToken::from_claims(json!({"sub": "u", "scope": "read"}));
        assert_eq!(t.scopes, ["read"]);
        assert!(AccessToken::from_claims(json!({})).scopes.is_empty());
    }
}
