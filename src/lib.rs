//! Dice Gateway Library
//!
//! A small JSON-RPC 2.0 tool gateway serving a fixed catalog of dice tools.
//!
//! # Features
//!
//! - **Admission control**: per-caller continuous token bucket, charged before any tool work
//! - **Declarative schemas**: one parameter declaration drives both `tools/list` and validation
//! - **Stable error codes**: every message gets exactly one envelope, whatever goes wrong
//! - **Two transports**: newline-delimited stdio and HTTP, both over the same [`gateway::Dispatcher`]
//!
//! # Example
//!
//! ```no_run
//! use dice_gateway::{config::Config, gateway::Dispatcher};
//!
//! let dispatcher = Dispatcher::from_config(&Config::default())?;
//! let response = dispatcher.handle(br#"{"id":1,"method":"tools/list"}"#, "127.0.0.1");
//! assert!(response.error.is_none());
//! # Ok::<(), dice_gateway::Error>(())
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod admission;
pub mod cli;
pub mod config;
pub mod dice;
pub mod error;
pub mod gateway;
pub mod protocol;
pub mod registry;
pub mod transport;

pub use error::{Error, Result};

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Setup tracing/logging. Logs go to stderr; stdout is reserved for the
/// stdio transport.
pub fn setup_tracing(level: &str, format: Option<&str>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::registry().with(filter);

    let installed = match format {
        Some("json") => subscriber
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
        _ => subscriber
            .with(fmt::layer().with_writer(std::io::stderr))
            .try_init(),
    };

    installed.map_err(|e| Error::Internal(format!("Failed to install tracing subscriber: {e}")))
}
