//! Provisioning orchestrator
//!
//! The Orchestrator ties the DNS record lifecycle to the file server's running
//! lifetime:
//! - Resolving the address to publish via AddressResolver
//! - Creating the DNS record via DnsProvider
//! - Starting the StaticServer and waiting for shutdown
//! - Stopping the server and deleting the record again
//!
//! ## State Machine
//!
//! ```text
//!  Idle ──► ResolvingAddress ──► CreatingRecord ──► Serving ──► TearingDown ──► Done
//!    │              (skipped when an IP is given)     │  ▲
//!    └──────────────── no_dns ────────────────────────┘  │
//!                                                        │ failed start
//!                                                        ▼
//!                                                     Aborted
//! ```
//!
//! ## Failure Policy
//!
//! 1. DNS creation failure never prevents serving. Unless proxying was already
//!    disabled, the run continues without the proxy.
//! 2. Deletion is keyed off "was a record created", nothing else, and a
//!    deletion failure is logged, never escalated.
//! 3. Teardown stops the server before touching DNS and runs once: `run`
//!    consumes the orchestrator and only the first shutdown trigger counts.

use std::net::{IpAddr, SocketAddr};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::config::ProvisionOptions;
use crate::error::{Error, Result};
use crate::record::{DnsRecordConfig, ProvisionedRecord, RecordSettings};
use crate::resolver::AddressResolver;
use crate::shutdown::ShutdownSignal;
use crate::subdomain;
use crate::traits::{DnsProvider, StaticServer};

/// Default capacity of the event channel
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

/// States of one provisioning run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProvisionState {
    Idle,
    ResolvingAddress,
    CreatingRecord,
    Serving,
    TearingDown,
    Done,
    /// The file server could not be started
    Aborted,
}

impl ProvisionState {
    /// Whether the run is over
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Aborted)
    }
}

impl std::fmt::Display for ProvisionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::ResolvingAddress => "resolving-address",
            Self::CreatingRecord => "creating-record",
            Self::Serving => "serving",
            Self::TearingDown => "tearing-down",
            Self::Done => "done",
            Self::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

/// Events emitted by the Orchestrator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OrchestratorEvent {
    /// State transition
    StateChanged {
        from: ProvisionState,
        to: ProvisionState,
    },

    /// Address to publish is known
    AddressResolved { ip: IpAddr },

    /// DNS record created
    RecordCreated { id: String, name: String },

    /// DNS record creation failed (non-fatal)
    RecordCreationFailed { error: String },

    /// Switched to running without the provider proxy
    ProxyDisabled,

    /// File server is accepting connections
    ServerStarted { addr: SocketAddr },

    /// File server stopped
    ServerStopped,

    /// DNS record deleted during teardown
    RecordDeleted { id: String },

    /// DNS record deletion failed (non-fatal)
    RecordDeletionFailed { id: String, error: String },
}

/// Outcome of one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Address the record was built from (None when DNS was skipped)
    pub address: Option<IpAddr>,

    /// Record created for this run
    pub record: Option<ProvisionedRecord>,

    /// Final no-proxy flag (set by the fallback when creation failed)
    pub no_proxy: bool,

    /// Address the file server was bound to
    pub server_addr: Option<SocketAddr>,

    /// Whether the created record was deleted again
    pub record_deleted: bool,

    /// Terminal state
    pub final_state: ProvisionState,
}

impl RunSummary {
    fn new(no_proxy: bool) -> Self {
        Self {
            address: None,
            record: None,
            no_proxy,
            server_addr: None,
            record_deleted: false,
            final_state: ProvisionState::Idle,
        }
    }

    /// URL under which the share is publicly reachable, if a record exists
    pub fn public_url(&self) -> Option<String> {
        let record = self.record.as_ref()?;
        if self.no_proxy {
            self.server_addr
                .map(|addr| format!("http://{}:{}/", record.name, addr.port()))
        } else {
            Some(format!("https://{}/", record.name))
        }
    }
}

/// Provisioning orchestrator
///
/// ## Lifecycle
///
/// 1. Create with [`Orchestrator::new()`], attach DNS with
///    [`with_dns()`](Self::with_dns) and [`with_resolver()`](Self::with_resolver)
/// 2. Drive with [`Orchestrator::run()`], which returns after teardown
///
/// ## Threading
///
/// The orchestrator runs on a single task. DNS calls are awaited one after
/// another; the file server accepts connections on its own tasks meanwhile.
pub struct Orchestrator {
    /// File server
    server: Box<dyn StaticServer>,

    /// DNS provider (required unless `no_dns`)
    provider: Option<Box<dyn DnsProvider>>,

    /// Base domain subdomains are created under
    base_domain: String,

    /// Address resolver (required unless `no_dns` or an IP is given)
    resolver: Option<AddressResolver>,

    /// Options for this run
    options: ProvisionOptions,

    /// Current state
    state: ProvisionState,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<OrchestratorEvent>,
}

impl Orchestrator {
    /// Create a new orchestrator
    ///
    /// # Returns
    ///
    /// A tuple of (orchestrator, event_receiver) where event_receiver yields
    /// orchestrator events
    pub fn new(
        server: Box<dyn StaticServer>,
        options: ProvisionOptions,
    ) -> Result<(Self, mpsc::Receiver<OrchestratorEvent>)> {
        Self::with_event_capacity(server, options, DEFAULT_EVENT_CAPACITY)
    }

    /// Create a new orchestrator with a custom event channel capacity
    pub fn with_event_capacity(
        server: Box<dyn StaticServer>,
        options: ProvisionOptions,
        event_capacity: usize,
    ) -> Result<(Self, mpsc::Receiver<OrchestratorEvent>)> {
        options.validate()?;

        let (tx, rx) = mpsc::channel(event_capacity.max(1));

        let orchestrator = Self {
            server,
            provider: None,
            base_domain: String::new(),
            resolver: None,
            options,
            state: ProvisionState::Idle,
            event_tx: tx,
        };

        Ok((orchestrator, rx))
    }

    /// Attach the DNS provider and the base domain records go under
    pub fn with_dns(mut self, provider: Box<dyn DnsProvider>, base_domain: impl Into<String>) -> Self {
        self.provider = Some(provider);
        self.base_domain = base_domain.into();
        self
    }

    /// Attach the address resolver
    pub fn with_resolver(mut self, resolver: AddressResolver) -> Self {
        self.resolver = Some(resolver);
        self
    }

    /// Current state
    pub fn state(&self) -> ProvisionState {
        self.state
    }

    /// Run until shutdown is signalled, then tear down
    ///
    /// # Returns
    ///
    /// - `Ok(RunSummary)`: Clean shutdown (DNS failures included)
    /// - `Err(Error)`: Missing collaborators, or the server failed to start
    pub async fn run(mut self, mut shutdown: ShutdownSignal) -> Result<RunSummary> {
        self.check_collaborators()?;

        let mut summary = RunSummary::new(self.options.no_proxy);

        if !self.options.no_dns {
            let ip = self.resolve_address().await;
            summary.address = Some(ip);

            self.transition(ProvisionState::CreatingRecord);
            match self.create_record(ip).await {
                Ok(record) => {
                    info!(record_id = %record.id, name = %record.name, "Created DNS record");
                    self.emit_event(OrchestratorEvent::RecordCreated {
                        id: record.id.clone(),
                        name: record.name.clone(),
                    });
                    summary.record = Some(record);
                }
                Err(e) => {
                    error!("Failed to create DNS record: {}", e.details());
                    self.emit_event(OrchestratorEvent::RecordCreationFailed {
                        error: e.to_string(),
                    });
                    if !summary.no_proxy {
                        warn!("Running without proxy");
                        summary.no_proxy = true;
                        self.emit_event(OrchestratorEvent::ProxyDisabled);
                    }
                }
            }
        } else {
            debug!("DNS provisioning disabled");
        }

        self.transition(ProvisionState::Serving);

        if shutdown.is_triggered() {
            info!("Shutdown requested before the server started");
        } else {
            match self.server.start().await {
                Ok(addr) => {
                    info!(%addr, "File server started");
                    summary.server_addr = Some(addr);
                    self.emit_event(OrchestratorEvent::ServerStarted { addr });

                    shutdown.wait().await;
                    info!("Shutdown signal received");
                }
                Err(e) => {
                    error!("Failed to start file server: {}", e);
                    summary.record_deleted = self.delete_record(summary.record.as_ref()).await;
                    self.transition(ProvisionState::Aborted);
                    return Err(e);
                }
            }
        }

        self.transition(ProvisionState::TearingDown);
        summary.record_deleted = self.tear_down(summary.record.as_ref()).await;

        self.transition(ProvisionState::Done);
        summary.final_state = self.state;
        Ok(summary)
    }

    /// Fail fast if the options need a collaborator that was not attached
    fn check_collaborators(&self) -> Result<()> {
        if self.options.no_dns {
            return Ok(());
        }
        if self.provider.is_none() {
            return Err(Error::validation("DNS provisioning requires a DNS provider"));
        }
        if self.base_domain.trim_matches('.').is_empty() {
            return Err(Error::validation("DNS provisioning requires a base domain"));
        }
        if self.options.ip.is_none() && self.resolver.is_none() {
            return Err(Error::validation(
                "an address resolver is required when no IP is given",
            ));
        }
        Ok(())
    }

    /// Explicit IP, or whatever the resolver finds
    async fn resolve_address(&mut self) -> IpAddr {
        let ip = match self.options.ip {
            Some(ip) => ip,
            None => {
                self.transition(ProvisionState::ResolvingAddress);
                match self.resolver.as_ref() {
                    Some(resolver) => resolver.resolve(self.options.prefer_public_ip).await,
                    // Ruled out by check_collaborators
                    None => crate::resolver::LOOPBACK,
                }
            }
        };

        info!(%ip, "Using IP address");
        self.emit_event(OrchestratorEvent::AddressResolved { ip });
        ip
    }

    /// Build the record from options and create it
    async fn create_record(&self, ip: IpAddr) -> Result<ProvisionedRecord> {
        let provider = self
            .provider
            .as_ref()
            .ok_or_else(|| Error::validation("DNS provisioning requires a DNS provider"))?;

        let label = match &self.options.subdomain {
            Some(sub) => sub.trim().to_string(),
            None => subdomain::generate(self.options.subdomain_length)?,
        };
        let name = format!("{}.{}", label, self.base_domain.trim_matches('.'));

        let record = DnsRecordConfig::builder(name, ip.to_string())
            .proxied(self.options.proxied && !self.options.no_proxy)
            .ttl(self.options.ttl)
            .comment(self.options.comment.clone())
            .settings(RecordSettings::default())
            .build()?;

        debug!(name = %record.name(), content = %record.content(), "Creating DNS record");
        provider.create_record(&record).await
    }

    /// Stop the server, then delete the record if one was created
    async fn tear_down(&mut self, record: Option<&ProvisionedRecord>) -> bool {
        if let Err(e) = self.server.stop().await {
            warn!("Failed to stop file server cleanly: {}", e);
        }
        self.emit_event(OrchestratorEvent::ServerStopped);

        self.delete_record(record).await
    }

    /// Best-effort deletion. Returns whether the record is gone.
    async fn delete_record(&self, record: Option<&ProvisionedRecord>) -> bool {
        let (Some(record), Some(provider)) = (record, self.provider.as_ref()) else {
            return false;
        };

        info!(record_id = %record.id, name = %record.name, "Cleaning up DNS record");
        match provider.delete_record(&record.id).await {
            Ok(_) => {
                info!(record_id = %record.id, "Cleaned up DNS record");
                self.emit_event(OrchestratorEvent::RecordDeleted {
                    id: record.id.clone(),
                });
                true
            }
            Err(e) => {
                error!("Failed to clean up DNS record: {}", e.details());
                self.emit_event(OrchestratorEvent::RecordDeletionFailed {
                    id: record.id.clone(),
                    error: e.to_string(),
                });
                false
            }
        }
    }

    /// Move to `to`, emitting the transition
    fn transition(&mut self, to: ProvisionState) {
        let from = self.state;
        if from == to {
            return;
        }
        debug!(%from, %to, "State transition");
        self.state = to;
        self.emit_event(OrchestratorEvent::StateChanged { from, to });
    }

    /// Emit an orchestrator event
    fn emit_event(&self, event: OrchestratorEvent) {
        match self.event_tx.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("Event channel full, dropping event");
            }
            // Receiver dropped: nobody is monitoring
            Err(mpsc::error::TrySendError::Closed(_)) => {}
        }
    }
}
