//! Address resolution with fallback
//!
//! Public sources are tried in order and the first well-formed answer wins.
//! When every public source fails (or public lookup is not wanted) the local
//! source is asked, and when that fails too the loopback address is used.
//! Resolution therefore never fails; callers must not assume the result is
//! reachable from outside.
//!
//! Published records are of type A, so an IPv6 answer counts as a failure of
//! the source that gave it.

use std::net::{IpAddr, Ipv4Addr};
use tracing::{debug, info, warn};

use crate::traits::IpSource;

/// Address used when nothing else works
pub const LOOPBACK: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

/// Ordered chain of address sources
pub struct AddressResolver {
    /// Public lookups, tried in order
    public: Vec<Box<dyn IpSource>>,

    /// Local interface source, used when public lookup is skipped or exhausted
    local: Box<dyn IpSource>,
}

impl AddressResolver {
    /// Create a resolver from ordered public sources and a local fallback
    pub fn new(public: Vec<Box<dyn IpSource>>, local: Box<dyn IpSource>) -> Self {
        Self { public, local }
    }

    /// Resolve the address to publish
    pub async fn resolve(&self, prefer_public: bool) -> IpAddr {
        if prefer_public {
            if let Some(ip) = self.resolve_public().await {
                return ip;
            }
            info!("No public IP lookup succeeded, falling back to local address");
        }

        self.resolve_local().await
    }

    /// First public answer, if any
    async fn resolve_public(&self) -> Option<IpAddr> {
        for source in &self.public {
            match source.current().await {
                Ok(ip @ IpAddr::V4(_)) => {
                    debug!(source = %source.source_name(), %ip, "Public IP resolved");
                    return Some(ip);
                }
                Ok(ip) => {
                    warn!(source = %source.source_name(), %ip, "Public IP lookup returned IPv6, skipping");
                }
                Err(e) => {
                    warn!(source = %source.source_name(), error = %e, "Public IP lookup failed");
                }
            }
        }
        None
    }

    /// Local answer, or loopback
    async fn resolve_local(&self) -> IpAddr {
        match self.local.current().await {
            Ok(ip @ IpAddr::V4(_)) => {
                debug!(source = %self.local.source_name(), %ip, "Local IP resolved");
                ip
            }
            Ok(ip) => {
                warn!(
                    source = %self.local.source_name(),
                    %ip,
                    "Local address is IPv6, using {}",
                    LOOPBACK
                );
                LOOPBACK
            }
            Err(e) => {
                warn!(
                    source = %self.local.source_name(),
                    error = %e,
                    "Local IP detection failed, using {}",
                    LOOPBACK
                );
                LOOPBACK
            }
        }
    }
}
