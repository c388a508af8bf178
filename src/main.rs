mod command;
mod error;
mod mavlink;
mod session;
mod tools;
mod transport;

use anyhow::Result;
use ardupilot_mcp_shared::{McpServer, ServerInfo};
use command::{CommandExecutor, ControlConfig};
use crate::mavlink::{FcConfig, MavlinkConnector};
use tools::VehicleTools;

use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // stdout carries the protocol, so logs go to stderr
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let fc_config = FcConfig::from_env()?;
    info!("ArduPilot MCP server starting");
    info!("  Endpoint: {}", fc_config.connection);
    info!(
        "  Source identity: system {} component {}",
        fc_config.system_id, fc_config.component_id
    );

    let executor = CommandExecutor::new(MavlinkConnector, fc_config, ControlConfig::default());
    let server = McpServer::new(
        VehicleTools::new(executor),
        ServerInfo {
            name: "ArduPilot Controller".into(),
            version: env!("CARGO_PKG_VERSION").into(),
        },
    );

    info!("Waiting for client on stdio");
    server.run().await?;
    info!("Client disconnected, shutting down");
    Ok(())
}
