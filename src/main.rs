//! Dice Gateway - rate-limited JSON-RPC tool server

use std::process::ExitCode;

use clap::Parser;
use tracing::{error, info};

use dice_gateway::{
    cli::{Cli, Command, TransportKind},
    config::Config,
    gateway::{Dispatcher, Gateway},
    registry::ToolRegistry,
    setup_tracing, transport,
};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Setup tracing
    if let Err(e) = setup_tracing(&cli.log_level, cli.log_format.as_deref()) {
        eprintln!("Failed to setup tracing: {e}");
        return ExitCode::FAILURE;
    }

    match &cli.command {
        Some(Command::Tools) => print_tools(),
        Some(Command::Serve { transport }) => run(&cli, *transport).await,
        None => run(&cli, TransportKind::Stdio).await,
    }
}

/// Print the catalog in `tools/list` shape
fn print_tools() -> ExitCode {
    let registry = ToolRegistry::dice();
    let listing = serde_json::json!({ "tools": registry.list_tools() });
    match serde_json::to_string_pretty(&listing) {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Failed to serialize tool catalog: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Load configuration, apply CLI overrides, and serve on `kind`
async fn run(cli: &Cli, kind: TransportKind) -> ExitCode {
    let config = match Config::load(cli.config.as_deref()) {
        Ok(mut config) => {
            // Apply CLI overrides
            if let Some(port) = cli.port {
                config.server.port = port;
            }
            if let Some(ref host) = cli.host {
                config.server.host = host.clone();
            }
            config
        }
        Err(e) => {
            error!("Failed to load configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    info!(
        version = env!("CARGO_PKG_VERSION"),
        transport = ?kind,
        capacity = config.rate_limit.capacity,
        tool_call_cost = config.rate_limit.tool_call_cost,
        "Starting Dice Gateway"
    );

    let result = match kind {
        TransportKind::Stdio => match Dispatcher::from_config(&config) {
            Ok(dispatcher) => transport::serve_stdio(&dispatcher, &config.stdio).await,
            Err(e) => Err(e),
        },
        TransportKind::Http => match Gateway::new(config) {
            Ok(gateway) => gateway.run().await,
            Err(e) => Err(e),
        },
    };

    if let Err(e) = result {
        error!("Gateway error: {e}");
        return ExitCode::FAILURE;
    }

    info!("Gateway shutdown complete");
    ExitCode::SUCCESS
}
