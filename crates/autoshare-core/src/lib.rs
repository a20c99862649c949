// # autoshare-core
//
// Core library for sharing a local directory under a throwaway DNS name.
//
// ## Architecture Overview
//
// - **IpSource**: Trait for discovering an address to publish
// - **AddressResolver**: Ordered public lookups with local and loopback fallback
// - **DnsProvider**: Trait for creating, listing and deleting DNS records
// - **StaticServer**: Trait for the background file server lifecycle
// - **Orchestrator**: Ties the record's lifetime to the server's running lifetime
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Core logic is separate from implementations
// 2. **Best-Effort DNS**: A DNS failure degrades the run, it never stops serving
// 3. **Library-First**: All core functionality can be used as a library

pub mod traits;
pub mod orchestrator;
pub mod resolver;
pub mod record;
pub mod subdomain;
pub mod shutdown;
pub mod config;
pub mod error;

// Re-export core types for convenience
pub use traits::{DnsProvider, IpSource, RecordFilter, StaticServer};
pub use orchestrator::{Orchestrator, OrchestratorEvent, ProvisionState, RunSummary};
pub use resolver::AddressResolver;
pub use record::{DeletedRecord, DnsRecordConfig, ProvisionedRecord, RecordSettings, RecordType};
pub use shutdown::{ShutdownSignal, ShutdownTrigger};
pub use config::{ProviderCredentials, ProvisionOptions, ServerConfig};
pub use error::{ApiErrorEntry, Error, Result};
