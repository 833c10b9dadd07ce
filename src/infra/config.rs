use serde::Deserialize;

/// Process-wide settings, read once at startup.
///
/// Missing credentials are not an error here: an empty ERP key shows up as a
/// 401/403 from the ERP API on the first tool call, and an empty IdP domain
/// makes every bearer token fail verification.
#[derive(Debug, Clone)]
pub struct Config {
    pub mode: String, // "server" or "stdio"
    pub host: String,
    pub port: u16,
    pub erp: ErpConfig,
    pub auth: AuthConfig,
}

/// Remote ERP REST API (Frappe) connection settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ErpConfig {
    pub base_url: String,
    pub api_key: String,
    pub api_secret: String,
}

/// Identity provider (Stytch) settings used to verify bearer tokens.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    /// Expected `aud` claim.
    pub project_id: String,
    /// Token issuer; also the host of the published JWKS.
    pub domain: String,
    pub api_secret: String,
}

impl AuthConfig {
    pub fn jwks_uri(&self) -> String {
        format!("{}/.well-known/jwks.json", self.domain.trim_end_matches('/'))
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct FileConfig {
    server: ServerSection,
    erp: ErpConfig,
    auth: AuthConfig,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ServerSection {
    mode: Option<String>,
    host: Option<String>,
    port: Option<u16>,
}

pub const CONFIG_PATH_VAR: &str = "ERP_GATEWAY_CONFIG";

fn env_nonempty(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

impl Config {
    pub fn from_env() -> Self {
        Self::layered(FileConfig::default())
    }

    /// Environment on top of the optional TOML file named by `ERP_GATEWAY_CONFIG`.
    pub fn from_env_and_toml() -> Self {
        let file = match env_nonempty(CONFIG_PATH_VAR) {
            Some(path) => match std::fs::read_to_string(&path) {
                Ok(raw) => Self::parse_toml(&raw).unwrap_or_else(|e| {
                    tracing::warn!(path = %path, error = %e, "ignoring unparsable config file");
                    FileConfig::default()
                }),
                Err(e) => {
                    tracing::warn!(path = %path, error = %e, "config file not readable");
                    FileConfig::default()
                }
            },
            None => FileConfig::default(),
        };
        Self::layered(file)
    }

    fn parse_toml(raw: &str) -> Result<FileConfig, toml::de::Error> {
        toml::from_str(raw)
    }

    fn layered(file: FileConfig) -> Self {
        let mode = env_nonempty("MODE")
            .or(file.server.mode)
            .unwrap_or_else(|| "server".into());
        let host = env_nonempty("HOST")
            .or(file.server.host)
            .unwrap_or_else(|| "0.0.0.0".into());
        let port = std::env::var("PORT")
            .ok()
            .and_then(|s| s.parse::<u16>().ok())
            .or(file.server.port)
            .unwrap_or(8000);

        let erp = ErpConfig {
            base_url: env_nonempty("FRAPPE_BASE_URL").unwrap_or(file.erp.base_url),
            api_key: env_nonempty("FRAPPE_API_KEY").unwrap_or(file.erp.api_key),
            api_secret: env_nonempty("FRAPPE_API_SECRET").unwrap_or(file.erp.api_secret),
        };
        let auth = AuthConfig {
            project_id: env_nonempty("STYTCH_PROJECT_ID").unwrap_or(file.auth.project_id),
            domain: env_nonempty("STYTCH_DOMAIN").unwrap_or(file.auth.domain),
            api_secret: env_nonempty("STYTCH_API_SECRET").unwrap_or(file.auth.api_secret),
        };

        Self {
            mode,
            host,
            port,
            erp,
            auth,
        }
    }

    /// Names of credential variables that are unset. Reported, never enforced.
    pub fn missing_credentials(&self) -> Vec<&'static str> {
        let checks = [
            ("FRAPPE_BASE_URL", &self.erp.base_url),
            ("FRAPPE_API_KEY", &self.erp.api_key),
            ("FRAPPE_API_SECRET", &self.erp.api_secret),
            ("STYTCH_PROJECT_ID", &self.auth.project_id),
            ("STYTCH_DOMAIN", &self.auth.domain),
            ("STYTCH_API_SECRET", &self.auth.api_secret),
        ];
        checks
            .into_iter()
            .filter(|(_, v)| v.trim().is_empty())
            .map(|(k, _)| k)
            .collect()
    }
}
