//! Configuration types for autoshare
//!
//! Everything here is built once at startup and handed to constructors.
//! Nothing in the component logic reads the environment directly.

use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::record::validate_ttl;

/// Environment variable holding the account email
pub const ENV_EMAIL: &str = "CLOUDFLARE_EMAIL";
/// Environment variable holding the API key
pub const ENV_API_KEY: &str = "CLOUDFLARE_API_KEY";
/// Environment variable holding the zone ID
pub const ENV_ZONE_ID: &str = "CLOUDFLARE_ZONE_ID";
/// Environment variable holding the base domain
pub const ENV_BASE_DOMAIN: &str = "BASE_DOMAIN";

/// Maximum length of a zone identifier
pub const MAX_ZONE_ID_LEN: usize = 32;

/// Default bind host for the file server
pub const DEFAULT_HOST: &str = "0.0.0.0";
/// Default bind port for the file server
pub const DEFAULT_PORT: u16 = 8000;
/// Default length of generated subdomains
pub const DEFAULT_SUBDOMAIN_LENGTH: usize = 8;
/// Comment attached to every record this tool creates
pub const AUTO_RECORD_COMMENT: &str = "Auto-generated subdomain for file server";

/// DNS provider credentials
///
/// # Security
///
/// The Debug implementation does NOT expose the API key.
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderCredentials {
    /// Account email (`X-Auth-Email`)
    pub account_email: String,
    /// Global API key (`X-Auth-Key`)
    /// ⚠️ NEVER log this value
    pub api_key: String,
    /// Zone the records live in
    pub zone_id: String,
    /// Domain under which subdomains are created
    pub base_domain: String,
}

impl std::fmt::Debug for ProviderCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderCredentials")
            .field("account_email", &self.account_email)
            .field("api_key", &"<REDACTED>")
            .field("zone_id", &self.zone_id)
            .field("base_domain", &self.base_domain)
            .finish()
    }
}

impl ProviderCredentials {
    /// Create and validate credentials
    pub fn new(
        account_email: impl Into<String>,
        api_key: impl Into<String>,
        zone_id: impl Into<String>,
        base_domain: impl Into<String>,
    ) -> Result<Self> {
        let creds = Self {
            account_email: account_email.into(),
            api_key: api_key.into(),
            zone_id: zone_id.into(),
            base_domain: base_domain.into(),
        };
        creds.validate()?;
        Ok(creds)
    }

    /// Load credentials from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load credentials through an arbitrary lookup function.
    ///
    /// Every missing (or empty) variable is reported in one error.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut missing = Vec::new();
        let mut fetch = |name: &'static str| match lookup(name) {
            Some(value) if !value.trim().is_empty() => value.trim().to_string(),
            _ => {
                missing.push(name);
                String::new()
            }
        };

        let account_email = fetch(ENV_EMAIL);
        let api_key = fetch(ENV_API_KEY);
        let zone_id = fetch(ENV_ZONE_ID);
        let base_domain = fetch(ENV_BASE_DOMAIN);

        if !missing.is_empty() {
            return Err(Error::validation(format!(
                "Missing required environment variables: {}",
                missing.join(", ")
            )));
        }

        Self::new(account_email, api_key, zone_id, base_domain)
    }

    /// Validate the credentials
    pub fn validate(&self) -> Result<()> {
        if self.account_email.is_empty() || self.api_key.is_empty() {
            return Err(Error::validation("account email and API key are required"));
        }
        if self.zone_id.is_empty() {
            return Err(Error::validation("zone_id cannot be empty"));
        }
        if self.zone_id.len() > MAX_ZONE_ID_LEN {
            return Err(Error::validation(format!(
                "zone_id must not exceed {} characters",
                MAX_ZONE_ID_LEN
            )));
        }
        if self.base_domain.trim_matches('.').is_empty() {
            return Err(Error::validation("base_domain cannot be empty"));
        }
        Ok(())
    }

    /// Compose `<subdomain>.<base_domain>`
    pub fn fqdn(&self, subdomain: &str) -> String {
        format!("{}.{}", subdomain, self.base_domain.trim_matches('.'))
    }
}

/// File server configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    directory: PathBuf,
    /// Host to bind to
    pub host: String,
    /// Port to bind to (0 = OS-assigned)
    pub port: u16,
    /// Whether directories without an index page get a generated listing
    pub directory_listing: bool,
}

impl ServerConfig {
    /// Create a server configuration.
    ///
    /// The directory must exist and be a directory; it is stored canonicalized.
    pub fn new(
        directory: impl AsRef<Path>,
        host: impl Into<String>,
        port: u16,
        directory_listing: bool,
    ) -> Result<Self> {
        let directory = directory.as_ref();
        let metadata = std::fs::metadata(directory).map_err(|e| {
            Error::validation(format!(
                "Directory '{}' is not accessible: {}",
                directory.display(),
                e
            ))
        })?;
        if !metadata.is_dir() {
            return Err(Error::validation(format!(
                "'{}' is not a directory",
                directory.display()
            )));
        }
        let directory = directory.canonicalize()?;

        let host = host.into();
        if host.is_empty() {
            return Err(Error::validation("host cannot be empty"));
        }

        Ok(Self {
            directory,
            host,
            port,
            directory_listing,
        })
    }

    /// Create a configuration with default host, port and listing enabled
    pub fn with_defaults(directory: impl AsRef<Path>) -> Result<Self> {
        Self::new(directory, DEFAULT_HOST, DEFAULT_PORT, true)
    }

    /// Absolute root directory being served
    pub fn directory(&self) -> &Path {
        &self.directory
    }
}

/// Options for one provisioning run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProvisionOptions {
    /// Address to publish; resolved automatically when absent
    #[serde(default)]
    pub ip: Option<IpAddr>,

    /// Prefer the public address over the local one when resolving
    #[serde(default = "default_true")]
    pub prefer_public_ip: bool,

    /// Explicit subdomain label; generated when absent
    #[serde(default)]
    pub subdomain: Option<String>,

    /// Length of generated subdomains
    #[serde(default = "default_subdomain_length")]
    pub subdomain_length: usize,

    /// Whether the record should be proxied by the provider edge
    #[serde(default = "default_true")]
    pub proxied: bool,

    /// Record TTL (1 = automatic)
    #[serde(default = "default_ttl")]
    pub ttl: u32,

    /// Skip DNS provisioning entirely
    #[serde(default)]
    pub no_dns: bool,

    /// Do not route through the provider proxy
    #[serde(default)]
    pub no_proxy: bool,

    /// Comment attached to the created record
    #[serde(default = "default_comment")]
    pub comment: String,
}

impl Default for ProvisionOptions {
    fn default() -> Self {
        Self {
            ip: None,
            prefer_public_ip: true,
            subdomain: None,
            subdomain_length: default_subdomain_length(),
            proxied: true,
            ttl: default_ttl(),
            no_dns: false,
            no_proxy: false,
            comment: default_comment(),
        }
    }
}

impl ProvisionOptions {
    /// Validate the options before any resource is acquired
    pub fn validate(&self) -> Result<()> {
        validate_ttl(self.ttl)?;
        if self.subdomain_length == 0 {
            return Err(Error::validation("subdomain length must be at least 1"));
        }
        if let Some(sub) = &self.subdomain
            && sub.trim().is_empty()
        {
            return Err(Error::validation("subdomain cannot be empty"));
        }
        if let Some(ip @ IpAddr::V6(_)) = self.ip {
            return Err(Error::validation(format!(
                "A records need an IPv4 address, got '{}'",
                ip
            )));
        }
        Ok(())
    }
}

fn default_true() -> bool {
    true
}

fn default_subdomain_length() -> usize {
    DEFAULT_SUBDOMAIN_LENGTH
}

fn default_ttl() -> u32 {
    1
}

fn default_comment() -> String {
    AUTO_RECORD_COMMENT.to_string()
}
