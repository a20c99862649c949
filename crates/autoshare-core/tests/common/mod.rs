//! Test doubles and common utilities for orchestrator contract tests
//!
//! All doubles write into one shared [`CallLog`] so tests can assert on the
//! relative order of server and DNS operations.

#![allow(dead_code)]

use autoshare_core::error::{ApiErrorEntry, Error, Result};
use autoshare_core::record::{DeletedRecord, DnsRecordConfig, ProvisionedRecord};
use autoshare_core::traits::{DnsProvider, IpSource, RecordFilter, StaticServer};
use autoshare_core::ProvisionOptions;
use std::net::{IpAddr, SocketAddr};
use std::sync::{Arc, Mutex};

/// One observed collaborator call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Create {
        name: String,
        content: String,
        proxied: bool,
    },
    List,
    Delete(String),
    Start,
    Stop,
    Lookup(String),
}

/// Shared, ordered call log
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<Call>>>);

impl CallLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, call: Call) {
        self.0.lock().unwrap().push(call);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.0.lock().unwrap().clone()
    }

    pub fn deletes(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Delete(id) => Some(id),
                _ => None,
            })
            .collect()
    }

    pub fn creates(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Create { .. }))
            .count()
    }

    pub fn position(&self, call: &Call) -> Option<usize> {
        self.calls().iter().position(|c| c == call)
    }
}

/// A DnsProvider double with scripted outcomes
pub struct MockDnsProvider {
    log: CallLog,
    record_id: String,
    fail_create: bool,
    fail_delete: bool,
}

impl MockDnsProvider {
    /// Provider whose create succeeds with `record_id`
    pub fn new(log: CallLog, record_id: &str) -> Self {
        Self {
            log,
            record_id: record_id.to_string(),
            fail_create: false,
            fail_delete: false,
        }
    }

    /// Make create_record fail with a provider error
    pub fn failing_create(mut self) -> Self {
        self.fail_create = true;
        self
    }

    /// Make delete_record fail with a provider error
    pub fn failing_delete(mut self) -> Self {
        self.fail_delete = true;
        self
    }
}

#[async_trait::async_trait]
impl DnsProvider for MockDnsProvider {
    async fn create_record(&self, record: &DnsRecordConfig) -> Result<ProvisionedRecord> {
        self.log.push(Call::Create {
            name: record.name().to_string(),
            content: record.content().to_string(),
            proxied: record.proxied(),
        });

        if self.fail_create {
            return Err(Error::provider_with_errors(
                "mock",
                "Record creation failed",
                vec![ApiErrorEntry::new(81057, "Record already exists.")],
            ));
        }

        Ok(ProvisionedRecord {
            id: self.record_id.clone(),
            name: record.name().to_string(),
            content: record.content().to_string(),
            proxied: record.proxied(),
            ttl: record.ttl(),
        })
    }

    async fn list_records(&self, _filter: &RecordFilter) -> Result<Vec<serde_json::Value>> {
        self.log.push(Call::List);
        Ok(Vec::new())
    }

    async fn delete_record(&self, record_id: &str) -> Result<DeletedRecord> {
        self.log.push(Call::Delete(record_id.to_string()));

        if self.fail_delete {
            return Err(Error::provider("mock", "Record deletion failed"));
        }

        Ok(DeletedRecord {
            id: record_id.to_string(),
        })
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

/// A StaticServer double that never binds a socket
pub struct MockServer {
    log: CallLog,
    addr: SocketAddr,
    running: bool,
    fail_start: bool,
}

impl MockServer {
    pub fn new(log: CallLog) -> Self {
        Self {
            log,
            addr: SocketAddr::from(([127, 0, 0, 1], 8000)),
            running: false,
            fail_start: false,
        }
    }

    /// Make start fail as if the port were taken
    pub fn failing_start(mut self) -> Self {
        self.fail_start = true;
        self
    }
}

#[async_trait::async_trait]
impl StaticServer for MockServer {
    async fn start(&mut self) -> Result<SocketAddr> {
        self.log.push(Call::Start);
        if self.fail_start {
            return Err(Error::server("Address already in use"));
        }
        if self.running {
            return Err(Error::usage("server is already running"));
        }
        self.running = true;
        Ok(self.addr)
    }

    async fn stop(&mut self) -> Result<()> {
        self.log.push(Call::Stop);
        self.running = false;
        Ok(())
    }

    fn is_running(&self) -> bool {
        self.running
    }

    fn local_addr(&self) -> Option<SocketAddr> {
        self.running.then_some(self.addr)
    }
}

/// An IpSource double with a fixed answer
pub struct StubIpSource {
    name: String,
    answer: Option<IpAddr>,
    log: CallLog,
}

impl StubIpSource {
    pub fn ok(log: CallLog, name: &str, ip: IpAddr) -> Self {
        Self {
            name: name.to_string(),
            answer: Some(ip),
            log,
        }
    }

    pub fn failing(log: CallLog, name: &str) -> Self {
        Self {
            name: name.to_string(),
            answer: None,
            log,
        }
    }
}

#[async_trait::async_trait]
impl IpSource for StubIpSource {
    async fn current(&self) -> Result<IpAddr> {
        self.log.push(Call::Lookup(self.name.clone()));
        self.answer
            .ok_or_else(|| Error::Other(format!("{} unreachable", self.name)))
    }

    fn source_name(&self) -> String {
        self.name.clone()
    }
}

/// Options with an explicit IP and nothing else changed
pub fn options_with_ip(ip: IpAddr) -> ProvisionOptions {
    ProvisionOptions {
        ip: Some(ip),
        ..ProvisionOptions::default()
    }
}

/// Wait until `fut` finishes or fail the test after five seconds
pub async fn within_timeout<F: std::future::Future>(fut: F) -> F::Output {
    tokio::time::timeout(std::time::Duration::from_secs(5), fut)
        .await
        .expect("operation should finish within 5 seconds")
}
