// # Static File Server
//
// Serves one directory over HTTP on a background tokio task.
//
// ## Lifecycle
//
// - `start()` binds, spawns the accept loop and returns the bound address
// - `stop()` signals graceful shutdown, waits up to 5 seconds for in-flight
//   requests, then aborts the accept loop
// - dropping a running server signals shutdown and aborts the task, so the
//   listener is always released
//
// ## Request Handling
//
// - `Access-Control-Allow-Origin: *` on every response
// - content type from the file extension (`.mp4`, `.webm`, `.ogv` included)
// - directories: `index.html` if present, otherwise 403 or a generated
//   listing depending on `ServerConfig::directory_listing`
// - requests are logged through `tower_http::trace::TraceLayer`

pub mod listing;
pub mod path;
pub mod router;

use async_trait::async_trait;
use autoshare_core::config::ServerConfig;
use autoshare_core::{Error, Result};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

pub use autoshare_core::traits::StaticServer;

/// How long `stop()` waits for in-flight requests before aborting
pub const DRAIN_TIMEOUT: Duration = Duration::from_secs(5);

/// Background accept loop and the means to end it
struct RunningServer {
    addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl RunningServer {
    fn signal_shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            // Task may already be gone
            let _ = tx.send(());
        }
    }
}

/// Static file server
pub struct FileServer {
    config: ServerConfig,
    running: Option<RunningServer>,
}

impl std::fmt::Debug for FileServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileServer")
            .field("config", &self.config)
            .field("local_addr", &self.local_addr())
            .finish()
    }
}

impl FileServer {
    /// Create a stopped server
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            running: None,
        }
    }
}

#[async_trait]
impl StaticServer for FileServer {
    async fn start(&mut self) -> Result<SocketAddr> {
        if let Some(running) = &self.running {
            if !running.task.is_finished() {
                return Err(Error::usage(format!(
                    "server is already running on {}",
                    running.addr
                )));
            }
        }
        // A loop that died on its own leaves a stale handle behind
        self.running = None;

        let host = self.config.host.as_str();
        let port = self.config.port;
        let listener = TcpListener::bind((host, port))
            .await
            .map_err(|e| Error::server(format!("Failed to bind {}:{}: {}", host, port, e)))?;
        let addr = listener.local_addr()?;

        let app = router::build_router(
            self.config.directory().to_path_buf(),
            self.config.directory_listing,
        );

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let task = tokio::spawn(async move {
            let result = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                })
                .await;
            if let Err(e) = result {
                tracing::error!(error = %e, "File server stopped with error");
            }
        });

        tracing::info!(
            %addr,
            directory = %self.config.directory().display(),
            directory_listing = self.config.directory_listing,
            "Serving directory"
        );

        self.running = Some(RunningServer {
            addr,
            shutdown_tx: Some(shutdown_tx),
            task,
        });
        Ok(addr)
    }

    async fn stop(&mut self) -> Result<()> {
        let Some(mut running) = self.running.take() else {
            return Ok(());
        };

        running.signal_shutdown();

        match tokio::time::timeout(DRAIN_TIMEOUT, &mut running.task).await {
            Ok(Ok(())) => {
                tracing::info!(addr = %running.addr, "File server stopped");
            }
            Ok(Err(e)) => {
                tracing::warn!(addr = %running.addr, error = %e, "File server task ended abnormally");
            }
            Err(_) => {
                tracing::warn!(
                    addr = %running.addr,
                    "Connections still open after {:?}, aborting",
                    DRAIN_TIMEOUT
                );
                running.task.abort();
                // Listener is released once the aborted task is reaped
                let _ = running.task.await;
            }
        }

        Ok(())
    }

    fn is_running(&self) -> bool {
        self.running
            .as_ref()
            .is_some_and(|running| !running.task.is_finished())
    }

    fn local_addr(&self) -> Option<SocketAddr> {
        self.running
            .as_ref()
            .filter(|running| !running.task.is_finished())
            .map(|running| running.addr)
    }
}

impl Drop for FileServer {
    fn drop(&mut self) {
        if let Some(mut running) = self.running.take() {
            running.signal_shutdown();
            running.task.abort();
            tracing::debug!(addr = %running.addr, "File server dropped while running");
        }
    }
}
