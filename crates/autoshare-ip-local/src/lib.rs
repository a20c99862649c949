// # Local IP Source
//
// Finds the address of the interface the OS would route outbound traffic
// through. A UDP socket is "connected" to a non-routable probe address; no
// packet is sent, but the kernel picks a source address, which is then read
// back from the socket.
//
// ## Platform Support
//
// Works anywhere tokio's UDP sockets do. Hosts without a default route make
// `current()` fail; `AddressResolver` then falls back to loopback.

use async_trait::async_trait;
use autoshare_core::traits::IpSource;
use autoshare_core::{Error, Result};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use tokio::net::UdpSocket;

/// Probe target used to select the outbound interface (never contacted)
pub const PROBE_ADDR: SocketAddr = SocketAddr::new(IpAddr::V4(Ipv4Addr::new(10, 255, 255, 255)), 1);

/// Outbound-interface address source
#[derive(Debug, Clone)]
pub struct LocalIpSource {
    probe: SocketAddr,
}

impl LocalIpSource {
    /// Source probing the default target
    pub fn new() -> Self {
        Self { probe: PROBE_ADDR }
    }

    /// Source probing a custom target
    pub fn with_probe(probe: SocketAddr) -> Self {
        Self { probe }
    }

    async fn detect(&self) -> Result<IpAddr> {
        let bind_addr: SocketAddr = match self.probe {
            SocketAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, 0).into(),
            SocketAddr::V6(_) => (std::net::Ipv6Addr::UNSPECIFIED, 0).into(),
        };

        let socket = UdpSocket::bind(bind_addr).await?;
        socket.connect(self.probe).await?;
        let ip = socket.local_addr()?.ip();

        if ip.is_unspecified() {
            return Err(Error::Other(format!(
                "no outbound interface for {}",
                self.probe
            )));
        }
        Ok(ip)
    }
}

impl Default for LocalIpSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl IpSource for LocalIpSource {
    async fn current(&self) -> Result<IpAddr> {
        let ip = self.detect().await?;
        tracing::debug!(%ip, "Detected local outbound address");
        Ok(ip)
    }

    fn source_name(&self) -> String {
        "local-interface".to_string()
    }
}
