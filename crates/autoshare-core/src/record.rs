//! DNS record model
//!
//! [`DnsRecordConfig`] is what gets sent to the provider; it can only be built
//! through [`DnsRecordBuilder`], which enforces the record invariants.
//! [`ProvisionedRecord`] is what the provider hands back.

use serde::{Deserialize, Serialize};
use std::net::IpAddr;

use crate::error::{Error, Result};

/// TTL value meaning "let the provider decide"
pub const AUTOMATIC_TTL: u32 = 1;
/// Smallest explicit TTL accepted by the provider
pub const MIN_TTL: u32 = 60;
/// Largest explicit TTL accepted by the provider
pub const MAX_TTL: u32 = 86_400;

/// Maximum length of a provider record identifier
pub const MAX_RECORD_ID_LEN: usize = 32;

/// DNS record type
///
/// Only A records are modelled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecordType {
    /// A record (IPv4)
    #[default]
    A,
}

/// Per-record settings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordSettings {
    /// Only resolve over IPv4
    pub ipv4_only: bool,
    /// Only resolve over IPv6
    pub ipv6_only: bool,
}

/// A validated DNS record ready to be created
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DnsRecordConfig {
    name: String,
    #[serde(rename = "type")]
    record_type: RecordType,
    content: String,
    proxied: bool,
    ttl: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    comment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    settings: Option<RecordSettings>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tags: Option<Vec<String>>,
}

impl DnsRecordConfig {
    /// Start building a record for `name` pointing at `content`
    pub fn builder(name: impl Into<String>, content: impl Into<String>) -> DnsRecordBuilder {
        DnsRecordBuilder::new(name, content)
    }

    /// Fully-qualified record name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Record type (always A)
    pub fn record_type(&self) -> RecordType {
        self.record_type
    }

    /// Address the record points at
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Whether the record is proxied
    pub fn proxied(&self) -> bool {
        self.proxied
    }

    /// TTL (1 = automatic)
    pub fn ttl(&self) -> u32 {
        self.ttl
    }

    /// Optional comment
    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    /// Optional settings
    pub fn settings(&self) -> Option<RecordSettings> {
        self.settings
    }
}

/// Builder for [`DnsRecordConfig`]
#[derive(Debug, Clone)]
pub struct DnsRecordBuilder {
    name: String,
    content: String,
    proxied: bool,
    ttl: u32,
    comment: Option<String>,
    settings: Option<RecordSettings>,
    tags: Option<Vec<String>>,
}

impl DnsRecordBuilder {
    /// New builder with the defaults: proxied, automatic TTL
    pub fn new(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
            proxied: true,
            ttl: AUTOMATIC_TTL,
            comment: None,
            settings: None,
            tags: None,
        }
    }

    /// Set whether the record is proxied
    pub fn proxied(mut self, proxied: bool) -> Self {
        self.proxied = proxied;
        self
    }

    /// Set the TTL (checked in [`build`](Self::build))
    pub fn ttl(mut self, ttl: u32) -> Self {
        self.ttl = ttl;
        self
    }

    /// Attach a comment
    pub fn comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = Some(comment.into());
        self
    }

    /// Attach settings
    pub fn settings(mut self, settings: RecordSettings) -> Self {
        self.settings = Some(settings);
        self
    }

    /// Attach tags
    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = Some(tags.into_iter().map(Into::into).collect());
        self
    }

    /// Validate and build the record
    pub fn build(self) -> Result<DnsRecordConfig> {
        if self.name.trim().is_empty() {
            return Err(Error::validation("name cannot be empty"));
        }
        if self.content.trim().is_empty() {
            return Err(Error::validation("content cannot be empty"));
        }
        match self.content.parse::<IpAddr>() {
            Ok(IpAddr::V4(_)) => {}
            Ok(IpAddr::V6(_)) => {
                return Err(Error::validation(format!(
                    "A records need an IPv4 address, got '{}'",
                    self.content
                )));
            }
            Err(_) => {
                return Err(Error::validation(format!(
                    "content must be an IP address literal, got '{}'",
                    self.content
                )));
            }
        }
        validate_ttl(self.ttl)?;

        Ok(DnsRecordConfig {
            name: self.name,
            record_type: RecordType::A,
            content: self.content,
            proxied: self.proxied,
            ttl: self.ttl,
            comment: self.comment,
            settings: self.settings,
            tags: self.tags,
        })
    }
}

/// Check a TTL against the provider's accepted values
pub fn validate_ttl(ttl: u32) -> Result<()> {
    if ttl == AUTOMATIC_TTL || (MIN_TTL..=MAX_TTL).contains(&ttl) {
        Ok(())
    } else {
        Err(Error::validation(format!(
            "ttl must be {} (automatic) or between {} and {} seconds, got {}",
            AUTOMATIC_TTL, MIN_TTL, MAX_TTL, ttl
        )))
    }
}

/// Check a record identifier before sending it to the provider
pub fn validate_record_id(record_id: &str) -> Result<()> {
    if record_id.is_empty() {
        return Err(Error::validation("record_id cannot be empty"));
    }
    if record_id.len() > MAX_RECORD_ID_LEN {
        return Err(Error::validation(format!(
            "record_id must not exceed {} characters",
            MAX_RECORD_ID_LEN
        )));
    }
    Ok(())
}

/// A record that exists at the provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisionedRecord {
    /// Provider-assigned identifier
    pub id: String,
    /// Fully-qualified name
    pub name: String,
    /// Address the record points at
    pub content: String,
    /// Whether the record is proxied
    #[serde(default)]
    pub proxied: bool,
    /// TTL (1 = automatic)
    #[serde(default = "default_ttl")]
    pub ttl: u32,
}

/// Confirmation of a deleted record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletedRecord {
    /// Identifier of the record that was removed
    pub id: String,
}

fn default_ttl() -> u32 {
    AUTOMATIC_TTL
}
