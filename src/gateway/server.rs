//! Gateway server

use std::future::{Future, IntoFuture};
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::oneshot;
use tracing::{error, info, warn};

use super::Dispatcher;
use super::router::{AppState, create_router};
use crate::config::Config;
use crate::{Error, Result};

/// Dice gateway HTTP server
pub struct Gateway {
    /// Configuration
    config: Config,
    /// Request handler shared with every connection
    dispatcher: Arc<Dispatcher>,
}

impl Gateway {
    /// Create a gateway with the dice catalog and configured budget
    pub fn new(config: Config) -> Result<Self> {
        let dispatcher = Arc::new(Dispatcher::from_config(&config)?);
        Ok(Self { config, dispatcher })
    }

    /// Create a gateway around an existing dispatcher
    #[must_use]
    pub fn with_dispatcher(config: Config, dispatcher: Arc<Dispatcher>) -> Self {
        Self { config, dispatcher }
    }

    /// Shared dispatcher
    #[must_use]
    pub fn dispatcher(&self) -> Arc<Dispatcher> {
        Arc::clone(&self.dispatcher)
    }

    /// Bind the configured address and serve until Ctrl-C or SIGTERM
    pub async fn run(self) -> Result<()> {
        let addr = SocketAddr::new(
            self.config
                .server
                .host
                .parse()
                .map_err(|e| Error::Config(format!("Invalid host: {e}")))?,
            self.config.server.port,
        );
        let listener = TcpListener::bind(addr).await?;
        self.serve(listener, shutdown_signal()).await
    }

    /// Serve on an already-bound listener until `shutdown` resolves.
    ///
    /// In-flight requests get `server.shutdown_timeout` to drain.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let local = listener.local_addr()?;
        let drain_timeout = self.config.server.shutdown_timeout;
        let state = Arc::new(AppState {
            dispatcher: Arc::clone(&self.dispatcher),
        });
        let app = create_router(state, self.config.server.max_body_size);

        let rate = &self.config.rate_limit;
        info!("============================================================");
        info!("DICE GATEWAY v{}", env!("CARGO_PKG_VERSION"));
        info!("============================================================");
        info!(address = %local, "Listening");
        info!(tools = self.dispatcher.registry().len(), "Tools registered");
        info!(
            capacity = rate.capacity,
            refill_rate = rate.refill_rate,
            interval = ?rate.interval,
            tool_call_cost = rate.tool_call_cost,
            failure_policy = ?rate.failure_policy,
            "Rate limit"
        );
        info!("  POST http://{local}/mcp     (JSON-RPC)");
        info!("  GET  http://{local}/health  (health)");
        info!("============================================================");

        let (stopping_tx, stopping_rx) = oneshot::channel::<()>();
        let server = axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async move {
            shutdown.await;
            let _ = stopping_tx.send(());
        })
        .into_future();

        let drain_deadline = async move {
            if stopping_rx.await.is_ok() {
                tokio::time::sleep(drain_timeout).await;
            } else {
                std::future::pending::<()>().await;
            }
        };

        tokio::select! {
            result = server => {
                result.map_err(|e| Error::Transport(e.to_string()))?;
                info!("Server stopped");
            }
            () = drain_deadline => {
                warn!(timeout = ?drain_timeout, "Shutdown timeout elapsed with requests still in flight");
            }
        }
        Ok(())
    }
}

/// Resolves on Ctrl-C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutdown signal received");
}
