use crate::clients::erp::ErpClient;
use crate::infra::config::Config;
use crate::infra::http_app::{build_app_from_config, erp_factory};
use std::net::SocketAddr;

pub async fn run_server(cfg: Config) -> anyhow::Result<()> {
    tracing::info!(
        mode = %cfg.mode,
        host = %cfg.host,
        port = cfg.port,
        erp_base_url = %cfg.erp.base_url,
        issuer = %cfg.auth.domain,
        "BOOT erp-mcp-gateway"
    );
    for missing in cfg.missing_credentials() {
        tracing::warn!(var = missing, "not configured; calls depending on it will fail");
    }

    // Stdio mode: run MCP over stdio ONLY (no HTTP, no bearer auth).
    if cfg.mode == "stdio" {
        let factory = erp_factory(ErpClient::new(cfg.erp.clone()));
        crate::infra::runtime::mcp_transport::serve_stdio(factory)
            .await
            .map_err(|e| anyhow::anyhow!(e))?;
        return Ok(());
    }

    let app = build_app_from_config(&cfg);
    let addr: SocketAddr = format!("{}:{}", cfg.host, cfg.port).parse()?;
    tracing::info!(%addr, "listening");
    axum::serve(tokio::net::TcpListener::bind(addr).await?, app).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn app_factory_selects_server_by_default() {
        std::env::remove_var("MODE");
        let cfg = Config::from_env();
        assert_eq!(cfg.mode, "server");
    }

    #[tokio::test]
    async fn invalid_host_is_an_error() {
        let mut cfg = Config::from_env();
        cfg.mode = "server".into();
        cfg.host = "not a host".into();
        assert!(run_server(cfg).await.is_err());
    }
}
