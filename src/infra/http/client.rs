/// Outbound client for ERP and JWKS calls. Library defaults for timeouts and
/// redirects; a slow ERP call holds its task for as long as reqwest allows.
pub fn make_http_client() -> reqwest::Client {
    reqwest::Client::new()
}
