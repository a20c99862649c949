// # HTTP IP Source
//
// Public address lookup through plain HTTP echo services.
//
// ## Architecture
//
// Each `HttpIpSource` asks exactly one endpoint, once per `current()` call,
// with a 5 second timeout. Ordering and fallback across endpoints is the
// job of `autoshare_core::AddressResolver`; `default_public_sources()` gives
// it the standard chain.
//
// A non-200 status, an unreadable body, a missing JSON field or a malformed
// address all count as a failure of that endpoint.

use async_trait::async_trait;
use autoshare_core::traits::IpSource;
use autoshare_core::{Error, Result};
use serde_json::Value;
use std::net::IpAddr;
use std::time::Duration;

/// Per-endpoint lookup timeout
const LOOKUP_TIMEOUT: Duration = Duration::from_secs(5);

/// Default lookup services, in the order they are tried
pub const DEFAULT_IP_SERVICES: &[(&str, ResponseFormat)] = &[
    ("https://api.ipify.org", ResponseFormat::PlainText),
    ("https://api.myip.com", ResponseFormat::JsonField("ip")),
    ("https://ifconfig.me/ip", ResponseFormat::PlainText),
];

/// How an endpoint reports the address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseFormat {
    /// Body is the bare address
    PlainText,
    /// Body is a JSON object with the address under this key
    JsonField(&'static str),
}

/// HTTP-based public IP source
pub struct HttpIpSource {
    /// URL to fetch the address from
    url: String,

    /// Body format of this endpoint
    format: ResponseFormat,

    /// HTTP client
    client: reqwest::Client,
}

impl HttpIpSource {
    /// Create a new HTTP IP source
    ///
    /// # Parameters
    ///
    /// - `url`: URL to fetch the address from (e.g., "https://api.ipify.org")
    /// - `format`: how the endpoint encodes the address
    pub fn new(url: impl Into<String>, format: ResponseFormat) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(LOOKUP_TIMEOUT)
            .build()
            .map_err(|e| Error::provider("http", format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            url: url.into(),
            format,
            client,
        })
    }

    /// Fetch and parse the address
    async fn fetch_ip(&self) -> Result<IpAddr> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| Error::provider("http", format!("Request failed: {}", e)))?;

        if response.status() != reqwest::StatusCode::OK {
            return Err(Error::provider(
                "http",
                format!("HTTP error: {}", response.status()),
            ));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::provider("http", format!("Failed to read response: {}", e)))?;

        parse_address(&body, self.format)
    }
}

/// Extract an address from a response body
pub fn parse_address(body: &str, format: ResponseFormat) -> Result<IpAddr> {
    let text = match format {
        ResponseFormat::PlainText => body.trim().to_string(),
        ResponseFormat::JsonField(key) => {
            let json: Value = serde_json::from_str(body)
                .map_err(|e| Error::provider("http", format!("Invalid JSON: {}", e)))?;
            json.get(key)
                .and_then(Value::as_str)
                .map(|s| s.trim().to_string())
                .ok_or_else(|| Error::provider("http", format!("Missing field: {}", key)))?
        }
    };

    text.parse()
        .map_err(|_| Error::provider("http", format!("Invalid IP address: {}", text)))
}

#[async_trait]
impl IpSource for HttpIpSource {
    async fn current(&self) -> Result<IpAddr> {
        let ip = self.fetch_ip().await?;
        tracing::debug!(source = %self.url, %ip, "Fetched public IP");
        Ok(ip)
    }

    fn source_name(&self) -> String {
        self.url.clone()
    }
}

/// The standard public lookup chain
pub fn default_public_sources() -> Result<Vec<Box<dyn IpSource>>> {
    DEFAULT_IP_SERVICES
        .iter()
        .map(|(url, format)| {
            HttpIpSource::new(*url, *format).map(|source| Box::new(source) as Box<dyn IpSource>)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_text_is_trimmed() {
        let ip = parse_address("203.0.113.9\n", ResponseFormat::PlainText).unwrap();
        assert_eq!(ip, IpAddr::from([203, 0, 113, 9]));
    }

    #[test]
    fn test_json_field() {
        let body = r#"{"ip":"198.51.100.4","country":"Nowhere","cc":"XX"}"#;
        let ip = parse_address(body, ResponseFormat::JsonField("ip")).unwrap();
        assert_eq!(ip, IpAddr::from([198, 51, 100, 4]));
    }

    #[test]
    fn test_json_missing_field() {
        let err = parse_address(r#"{"addr":"1.2.3.4"}"#, ResponseFormat::JsonField("ip"))
            .unwrap_err();
        assert!(err.to_string().contains("Missing field: ip"));
    }

    #[test]
    fn test_garbage_is_rejected() {
        assert!(parse_address("<html>", ResponseFormat::PlainText).is_err());
        assert!(parse_address("not json", ResponseFormat::JsonField("ip")).is_err());
        assert!(parse_address("", ResponseFormat::PlainText).is_err());
    }

    #[test]
    fn test_ipv6_is_accepted() {
        let ip = parse_address("2001:db8::1", ResponseFormat::PlainText).unwrap();
        assert!(ip.is_ipv6());
    }

    #[test]
    fn test_default_chain_order() {
        let sources = default_public_sources().unwrap();
        let names: Vec<String> = sources.iter().map(|s| s.source_name()).collect();
        assert_eq!(
            names,
            vec![
                "https://api.ipify.org",
                "https://api.myip.com",
                "https://ifconfig.me/ip"
            ]
        );
    }
}
