use std::process::ExitCode;

use erp_mcp_gateway::{cli, infra};

#[tokio::main]
async fn main() -> ExitCode {
    // A missing .env is normal in deployed environments.
    let _ = dotenvy::dotenv();
    infra::logging::init();
    cli::run().await
}
