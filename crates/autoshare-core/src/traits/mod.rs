//! Core traits for autoshare
//!
//! This module defines the abstract interfaces that all implementations must follow.
//!
//! - [`IpSource`]: Discover an address to publish
//! - [`DnsProvider`]: Create, list and delete DNS records via a provider API
//! - [`StaticServer`]: Start and stop the background file server

pub mod ip_source;
pub mod dns_provider;
pub mod static_server;

pub use ip_source::IpSource;
pub use dns_provider::{DnsProvider, RecordFilter};
pub use static_server::StaticServer;
