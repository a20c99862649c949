// # IP Source Trait
//
// Defines the interface for discovering an address to publish.
//
// ## Implementations
//
// - Public lookup over HTTP: `autoshare-ip-http` crate
// - Local outbound interface: `autoshare-ip-local` crate
//
// ## Usage
//
// ```rust,ignore
// use autoshare_core::IpSource;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let source = /* IpSource implementation */;
//     let ip = source.current().await?;
//     println!("{} says {}", source.source_name(), ip);
//     Ok(())
// }
// ```

use async_trait::async_trait;
use std::net::IpAddr;

/// Trait for address source implementations
///
/// A source answers one question: which address should the DNS record point
/// at? Failures are ordinary errors; deciding what to do about them (trying
/// the next source, falling back to loopback) belongs to
/// [`AddressResolver`](crate::resolver::AddressResolver).
///
/// Implementations must be thread-safe and bound every network call they make.
#[async_trait]
pub trait IpSource: Send + Sync {
    /// Determine the current address
    ///
    /// # Returns
    ///
    /// - `Ok(IpAddr)`: A well-formed address
    /// - `Err(Error)`: If this source could not produce one
    async fn current(&self) -> Result<IpAddr, crate::Error>;

    /// Short name used in logs (e.g. the lookup URL)
    fn source_name(&self) -> String;
}
