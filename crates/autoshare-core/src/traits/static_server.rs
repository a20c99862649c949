// # Static Server Trait
//
// Lifecycle interface of the file server as seen by the orchestrator.
//
// ## Implementations
//
// - axum/tower-http file server: `autoshare-server` crate

use async_trait::async_trait;
use std::net::SocketAddr;

/// Lifecycle of a background file server
///
/// # Contract
///
/// - [`start`](Self::start) binds and returns immediately; connections are
///   accepted on a background task. Starting a running server is a
///   [`Error::Usage`](crate::Error::Usage) and leaves the existing listener
///   untouched.
/// - [`stop`](Self::stop) is idempotent: stopping a server that is not running
///   does nothing. After a stop, `start` is allowed again.
#[async_trait]
pub trait StaticServer: Send + Sync {
    /// Bind and begin accepting connections
    async fn start(&mut self) -> Result<SocketAddr, crate::Error>;

    /// Stop accepting connections and release the listener
    async fn stop(&mut self) -> Result<(), crate::Error>;

    /// Whether the accept loop is alive
    fn is_running(&self) -> bool;

    /// Bound address while running
    fn local_addr(&self) -> Option<SocketAddr>;
}
