// # DNS Provider Trait
//
// Defines the interface for managing DNS records via a provider API.
//
// ## Implementations
//
// - Cloudflare: `autoshare-provider-cloudflare` crate
//
// ## Usage
//
// ```rust,ignore
// use autoshare_core::{DnsProvider, DnsRecordConfig};
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let provider = /* DnsProvider implementation */;
//
//     let record = DnsRecordConfig::builder("abc123.example.com", "1.2.3.4").build()?;
//     let created = provider.create_record(&record).await?;
//     provider.delete_record(&created.id).await?;
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use std::collections::BTreeMap;

use crate::record::{DeletedRecord, DnsRecordConfig, ProvisionedRecord};

/// Query filter for listing records (sent as query parameters)
pub type RecordFilter = BTreeMap<String, String>;

/// Trait for DNS provider implementations
///
/// # Contract
///
/// - Every method performs at most one API call.
/// - Local validation failures are returned before any network call.
/// - Non-success responses become [`Error::Provider`](crate::Error::Provider)
///   carrying whatever structured entries the provider returned.
/// - No retries: callers decide what a failure means. The orchestrator turns a
///   creation failure into the no-proxy fallback and only logs a deletion
///   failure.
///
/// # Thread Safety
///
/// Implementations must be thread-safe and usable across async tasks.
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// Create a record
    ///
    /// # Returns
    ///
    /// - `Ok(ProvisionedRecord)`: The record as stored by the provider
    /// - `Err(Error)`: If the provider rejected the request
    async fn create_record(
        &self,
        record: &DnsRecordConfig,
    ) -> Result<ProvisionedRecord, crate::Error>;

    /// List raw records matching `filter`
    async fn list_records(
        &self,
        filter: &RecordFilter,
    ) -> Result<Vec<serde_json::Value>, crate::Error>;

    /// Delete a record by id
    async fn delete_record(&self, record_id: &str) -> Result<DeletedRecord, crate::Error>;

    /// Get the provider name (for logging/debugging)
    fn provider_name(&self) -> &'static str;
}
