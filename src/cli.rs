//! Command-line interface

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

/// Dice Gateway - rate-limited JSON-RPC tool server
#[derive(Parser, Debug)]
#[command(name = "dice-gateway")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file (YAML)
    #[arg(short, long, env = "DICE_GATEWAY_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Port to listen on (http transport)
    #[arg(short, long, env = "DICE_GATEWAY_PORT")]
    pub port: Option<u16>,

    /// Host to bind to (http transport)
    #[arg(long, env = "DICE_GATEWAY_HOST")]
    pub host: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(
        long,
        default_value = "info",
        env = "DICE_GATEWAY_LOG_LEVEL",
        global = true
    )]
    pub log_level: String,

    /// Log format (text, json)
    #[arg(long, env = "DICE_GATEWAY_LOG_FORMAT", global = true)]
    pub log_format: Option<String>,

    /// Subcommand (optional - defaults to serving over stdio)
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the gateway (default)
    Serve {
        /// Where messages arrive from
        #[arg(short, long, value_enum, default_value_t = TransportKind::Stdio)]
        transport: TransportKind,
    },

    /// Print the tool catalog as JSON and exit
    Tools,
}

/// Message transports
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    /// One message per line on stdin, one response per line on stdout
    Stdio,
    /// `POST /mcp` on the configured host and port
    Http,
}
