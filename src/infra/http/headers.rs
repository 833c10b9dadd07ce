use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::RequestBuilder;

/// Generate a simple request id suitable for logging/correlation.
pub fn generate_request_id() -> String {
    use std::time::{SystemTime, UNIX_EPOCH};
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    format!("erp-gw-{}-{}", now.as_secs(), now.subsec_nanos())
}

/// Add correlation headers to an outgoing request. Returns the updated builder and the request id used.
pub fn add_standard_headers(
    builder: RequestBuilder,
    request_id: Option<String>,
) -> (RequestBuilder, String) {
    let rid = request_id.unwrap_or_else(generate_request_id);
    let b = builder.header("x-request-id", rid.as_str()).header(
        reqwest::header::USER_AGENT,
        format!("erp-mcp-gateway/{}", env!("CARGO_PKG_VERSION")),
    );
    (b, rid)
}

/// Frappe token auth plus JSON content type.
pub fn frappe_token_headers(api_key: &str, api_secret: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    if let Ok(v) = HeaderValue::from_str(&format!("token {api_key}:{api_secret}")) {
        headers.insert(AUTHORIZATION, v);
    }
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_ids_are_prefixed() {
        assert!(generate_request_id().starts_with("erp-gw-"));
    }

    #[test]
    fn token_header_joins_key_and_secret() {
        let h = frappe_token_headers("abc", "xyz");
        assert_eq!(h[AUTHORIZATION], "token abc:xyz");
        assert_eq!(h[CONTENT_TYPE], "application/json");
    }

    #[test]
    fn token_header_is_sent_even_when_credentials_are_empty() {
        let h = frappe_token_headers("", "");
        assert_eq!(h[AUTHORIZATION], "token :");
    }
}
