use clap::{Parser, Subcommand};
use std::process::ExitCode;

use crate::clients::erp::ErpClient;
use crate::infra::config::Config;

#[derive(Parser)]
#[command(name = "erp-mcp-gateway")]
#[command(about = "MCP gateway for the ERP REST API")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the gateway (HTTP, or stdio when MODE=stdio)
    Serve,
    /// Health check the service
    Health {
        /// Service URL to check
        #[arg(short, long, default_value = "http://localhost:8000")]
        url: String,
    },
    /// Validate configuration
    Config {
        /// Validate config without starting service
        #[arg(long)]
        validate: bool,
    },
    /// Show service status and configuration summary
    Status {
        /// Service URL to check
        #[arg(short, long, default_value = "http://localhost:8000")]
        url: String,
    },
    /// Print the desk URL of a record
    DoctypeUrl {
        /// DocType, e.g. "Sales Order"
        doctype: String,
        /// Record name, e.g. "SO-0001"
        name: String,
    },
}

pub async fn run() -> ExitCode {
    let cli = Cli::parse();
    run_commands(cli.command.unwrap_or(Commands::Serve)).await
}

pub async fn run_commands(command: Commands) -> ExitCode {
    match command {
        Commands::Serve => {
            let cfg = Config::from_env_and_toml();
            match crate::infra::boot::run_server(cfg).await {
                Ok(()) => ExitCode::SUCCESS,
                Err(e) => {
                    tracing::error!(error = %e, "server exited with error");
                    ExitCode::FAILURE
                }
            }
        }
        Commands::Health { url } => match health_check(&url).await {
            Ok(_) => {
                println!("✅ Service is healthy");
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("❌ Health check failed: {}", e);
                ExitCode::FAILURE
            }
        },
        Commands::Config { validate: _ } => match validate_config() {
            Ok(missing) => {
                for var in missing {
                    println!("⚠️  {} is not set", var);
                }
                println!("✅ Configuration is valid");
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("❌ Configuration validation failed: {}", e);
                ExitCode::FAILURE
            }
        },
        Commands::Status { url } => match show_status(&url).await {
            Ok(_) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("❌ Status check failed: {}", e);
                ExitCode::FAILURE
            }
        },
        Commands::DoctypeUrl { doctype, name } => {
            let cfg = Config::from_env_and_toml();
            println!("{}", ErpClient::new(cfg.erp).url_for_doctype(&doctype, &name));
            ExitCode::SUCCESS
        }
    }
}

async fn health_check(url: &str) -> Result<(), Box<dyn std::error::Error>> {
    let client = reqwest::Client::new();
    let response = client
        .get(format!("{}/healthz", url))
        .timeout(std::time::Duration::from_millis(500))
        .send()
        .await?;

    if response.status().is_success() {
        Ok(())
    } else {
        Err(format!("HTTP {}", response.status()).into())
    }
}

/// Hard errors for MODE/PORT; the returned list names unset credentials.
fn validate_config() -> Result<Vec<&'static str>, Box<dyn std::error::Error>> {
    let cfg = Config::from_env_and_toml();

    if !matches!(cfg.mode.as_str(), "server" | "stdio") {
        return Err(format!("Invalid MODE: {}. Must be 'server' or 'stdio'", cfg.mode).into());
    }

    if cfg.mode == "server" && cfg.port == 0 {
        return Err("PORT cannot be 0".into());
    }

    Ok(cfg.missing_credentials())
}

async fn show_status(url: &str) -> Result<(), Box<dyn std::error::Error>> {
    let client = reqwest::Client::new();

    let health_response = client
        .get(format!("{}/healthz", url))
        .timeout(std::time::Duration::from_secs(5))
        .send()
        .await?;

    println!(
        "🏥 Health Status: {}",
        if health_response.status().is_success() {
            "✅ Healthy"
        } else {
            "❌ Unhealthy"
        }
    );

    let metadata = client
        .get(format!(
            "{}{}",
            url,
            crate::api::well_known::RESOURCE_METADATA_PATH
        ))
        .timeout(std::time::Duration::from_millis(500))
        .send()
        .await;

    match metadata {
        Ok(resp) if resp.status().is_success() => {
            let doc: serde_json::Value = resp.json().await.unwrap_or_default();
            println!("🔐 Resource: {}", doc["resource"].as_str().unwrap_or("?"));
            println!("🔐 Authorization servers: {}", doc["authorization_servers"]);
        }
        Ok(resp) => println!("🔐 Auth metadata: ❌ HTTP {}", resp.status()),
        Err(_) => println!("🔐 Auth metadata: ❌ Unavailable"),
    }

    let cfg = Config::from_env_and_toml();
    println!("\n📋 Configuration:");
    println!("  Mode: {}", cfg.mode);
    println!("  Listen: {}:{}", cfg.host, cfg.port);
    println!(
        "  Log Level: {}",
        std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into())
    );
    if cfg.erp.base_url.is_empty() {
        println!("  ERP: Not configured");
    } else {
        println!("  ERP: {}", cfg.erp.base_url);
    }
    if cfg.auth.domain.is_empty() {
        println!("  Issuer: Not configured");
    } else {
        println!("  Issuer: {}", cfg.auth.domain);
    }

    Ok(())
}
