// # Cloudflare DNS Provider
//
// Cloudflare implementation of the `DnsProvider` trait, scoped to a single
// zone's DNS records collection.
//
// ## Behaviour
//
// - One HTTP request per trait call, no retries (callers own failure policy)
// - 30 second HTTP timeout on every request
// - Every response body is decoded exactly once by `handle_response`
// - Structured `{code, message}` error entries are carried on the error
//
// ## Security Requirements
//
// - API key NEVER appears in logs or Debug output
// - Credentials are validated before the client is built
//
// ## API Reference
//
// - Cloudflare API v4: https://developers.cloudflare.com/api/
// - Create DNS Record: POST `/zones/:zone_id/dns_records`
// - List DNS Records: GET `/zones/:zone_id/dns_records?<filter>`
// - Delete DNS Record: DELETE `/zones/:zone_id/dns_records/:record_id`

use async_trait::async_trait;
use autoshare_core::config::ProviderCredentials;
use autoshare_core::error::ApiErrorEntry;
use autoshare_core::record::{
    DeletedRecord, DnsRecordConfig, ProvisionedRecord, RecordSettings, validate_record_id,
};
use autoshare_core::traits::{DnsProvider, RecordFilter};
use autoshare_core::{Error, Result};
use reqwest::StatusCode;
use serde_json::Value;
use std::time::Duration;

/// Cloudflare API base URL
pub const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

const PROVIDER_NAME: &str = "cloudflare";

/// Cloudflare DNS provider
///
/// # Security
///
/// The Debug implementation intentionally does NOT expose the API key.
pub struct CloudflareProvider {
    /// Account email sent as `X-Auth-Email`
    account_email: String,

    /// Global API key sent as `X-Auth-Key`
    /// ⚠️ NEVER log this value
    api_key: String,

    /// Zone the records live in
    zone_id: String,

    /// API base URL (overridable for tests)
    base_url: String,

    /// HTTP client for API requests
    client: reqwest::Client,
}

// Custom Debug implementation that hides the API key
impl std::fmt::Debug for CloudflareProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareProvider")
            .field("account_email", &self.account_email)
            .field("api_key", &"<REDACTED>")
            .field("zone_id", &self.zone_id)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl CloudflareProvider {
    /// Create a new Cloudflare provider
    ///
    /// # Errors
    ///
    /// - `Error::Validation` if the credentials are incomplete or the zone id
    ///   is too long
    /// - `Error::Provider` if the HTTP client cannot be built
    pub fn new(credentials: &ProviderCredentials) -> Result<Self> {
        credentials.validate()?;

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| {
                Error::provider(PROVIDER_NAME, format!("Failed to build HTTP client: {}", e))
            })?;

        Ok(Self {
            account_email: credentials.account_email.clone(),
            api_key: credentials.api_key.clone(),
            zone_id: credentials.zone_id.clone(),
            base_url: CLOUDFLARE_API_BASE.to_string(),
            client,
        })
    }

    /// Point the client at a different API base URL
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Zone this client manages
    pub fn zone_id(&self) -> &str {
        &self.zone_id
    }

    fn records_url(&self) -> String {
        format!("{}/zones/{}/dns_records", self.base_url, self.zone_id)
    }

    /// Attach authentication headers
    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .header("X-Auth-Email", &self.account_email)
            .header("X-Auth-Key", &self.api_key)
            .header("Content-Type", "application/json")
    }

    /// Send a request and decode the envelope
    async fn send(&self, request: reqwest::RequestBuilder) -> Result<Value> {
        let response = request.send().await.map_err(|e| {
            Error::provider(PROVIDER_NAME, format!("HTTP request failed: {}", e))
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| {
            Error::provider(PROVIDER_NAME, format!("Failed to read response: {}", e))
        })?;

        handle_response(status, &body)
    }
}

/// Decode a Cloudflare API response
///
/// Checks, in order: the body is JSON, the status is 2xx, `success` is true.
/// Returns the whole envelope on success.
pub fn handle_response(status: StatusCode, body: &str) -> Result<Value> {
    let json: Value = serde_json::from_str(body).map_err(|_| {
        Error::provider(PROVIDER_NAME, format!("Invalid JSON response: {}", body))
    })?;

    let errors = error_entries(&json);

    if !status.is_success() {
        let mut message = format!(
            "{} {}",
            status.as_u16(),
            status.canonical_reason().unwrap_or("Unknown Status")
        );
        if !errors.is_empty() {
            let rendered: Vec<String> = errors.iter().map(ToString::to_string).collect();
            message.push_str(": ");
            message.push_str(&rendered.join(", "));
        }
        return Err(Error::provider_with_errors(PROVIDER_NAME, message, errors));
    }

    if !json.get("success").and_then(Value::as_bool).unwrap_or(false) {
        return Err(Error::provider_with_errors(
            PROVIDER_NAME,
            "API request was not successful",
            errors,
        ));
    }

    Ok(json)
}

fn error_entries(json: &Value) -> Vec<ApiErrorEntry> {
    json.get("errors")
        .and_then(Value::as_array)
        .map(|entries| entries.iter().map(ApiErrorEntry::from_value).collect())
        .unwrap_or_default()
}

fn unexpected_format(what: &str) -> Error {
    Error::provider(PROVIDER_NAME, format!("Invalid response format: {}", what))
}

#[async_trait]
impl DnsProvider for CloudflareProvider {
    /// Create a DNS record
    ///
    /// # API Call
    ///
    /// ```http
    /// POST /zones/:zone_id/dns_records
    /// X-Auth-Email: <email>
    /// X-Auth-Key: <key>
    ///
    /// {"name": "abc.example.com", "type": "A", "content": "1.2.3.4", ...}
    /// ```
    async fn create_record(&self, record: &DnsRecordConfig) -> Result<ProvisionedRecord> {
        let mut payload = serde_json::to_value(record)?;
        if record.settings().is_none()
            && let Some(map) = payload.as_object_mut()
        {
            map.insert(
                "settings".to_string(),
                serde_json::to_value(RecordSettings::default())?,
            );
        }

        tracing::info!(
            name = %record.name(),
            content = %record.content(),
            proxied = record.proxied(),
            "Creating Cloudflare DNS record"
        );

        let json = self
            .send(self.request(reqwest::Method::POST, &self.records_url()).json(&payload))
            .await?;

        let result = json
            .get("result")
            .cloned()
            .ok_or_else(|| unexpected_format("result is missing"))?;
        let created: ProvisionedRecord = serde_json::from_value(result)
            .map_err(|e| unexpected_format(&format!("result is not a DNS record ({})", e)))?;

        tracing::debug!(record_id = %created.id, "Cloudflare DNS record created");
        Ok(created)
    }

    /// List DNS records, passing `filter` as query parameters
    async fn list_records(&self, filter: &RecordFilter) -> Result<Vec<Value>> {
        tracing::debug!(?filter, "Listing Cloudflare DNS records");

        let json = self
            .send(self.request(reqwest::Method::GET, &self.records_url()).query(filter))
            .await?;

        match json.get("result") {
            Some(Value::Array(records)) => Ok(records.clone()),
            None | Some(Value::Null) => Ok(Vec::new()),
            Some(_) => Err(unexpected_format("result is not an array")),
        }
    }

    /// Delete a DNS record
    ///
    /// Record ids longer than 32 characters are rejected without a request.
    async fn delete_record(&self, record_id: &str) -> Result<DeletedRecord> {
        validate_record_id(record_id)?;

        tracing::info!(record_id = %record_id, "Deleting Cloudflare DNS record");

        let url = format!("{}/{}", self.records_url(), record_id);
        let json = self
            .send(self.request(reqwest::Method::DELETE, &url))
            .await?;

        let id = json
            .pointer("/result/id")
            .and_then(Value::as_str)
            .unwrap_or(record_id)
            .to_string();

        Ok(DeletedRecord { id })
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER_NAME
    }
}
