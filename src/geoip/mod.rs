//! IP geolocation over a third-party HTTP lookup service

mod providers;

use async_trait::async_trait;
use std::net::IpAddr;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

use crate::config::{GeolocationConfig, Provider};

/// Normalized lookup result; every field is optional
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Geolocation {
    pub city: Option<String>,
    pub region: Option<String>,
    pub country: Option<String>,
    pub isp: Option<String>,
}

#[derive(Debug, Error)]
pub enum LookupError {
    #[error("'{0}' is not an IP address")]
    InvalidAddress(String),
    #[error("address {0} cannot be geolocated")]
    NonRoutable(String),
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("provider returned status {0}")]
    Status(reqwest::StatusCode),
    #[error("malformed provider response: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("provider reported an error: {0}")]
    Provider(String),
}

#[async_trait]
pub trait GeoLookup: Send + Sync {
    async fn lookup(&self, ip: &str) -> Result<Geolocation, LookupError>;
}

/// Thread-safe lookup handle
pub type SharedGeoLookup = Arc<dyn GeoLookup>;

/// Lookup backed by ipapi.co or ipinfo.io
pub struct HttpGeoLookup {
    client: reqwest::Client,
    provider: Provider,
    base_url: String,
    skip_private: bool,
}

impl HttpGeoLookup {
    pub fn new(config: &GeolocationConfig) -> Result<Self, LookupError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            provider: config.provider,
            base_url: config.base_url().trim_end_matches('/').to_string(),
            skip_private: config.skip_private,
        })
    }
}

#[async_trait]
impl GeoLookup for HttpGeoLookup {
    async fn lookup(&self, ip: &str) -> Result<Geolocation, LookupError> {
        // Header text never reaches the URL; only a parsed address does
        let addr: IpAddr = ip
            .trim()
            .parse()
            .map_err(|_| LookupError::InvalidAddress(ip.to_string()))?;
        if self.skip_private && is_private_ip(&addr) {
            return Err(LookupError::NonRoutable(addr.to_string()));
        }

        let url = providers::lookup_url(self.provider, &self.base_url, addr);
        debug!("Geolocation lookup: {}", url);

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(LookupError::Status(response.status()));
        }

        let body = response.bytes().await?;
        providers::parse(self.provider, &body)
    }
}

/// Whether an address is worth sending to a public geolocation service
pub fn is_routable(ip: &str) -> bool {
    match ip.parse::<IpAddr>() {
        Ok(addr) => !is_private_ip(&addr),
        Err(_) => false,
    }
}

/// Check if an IP address is private/local
fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(ipv4) => {
            ipv4.is_private()
                || ipv4.is_loopback()
                || ipv4.is_link_local()
                || ipv4.is_broadcast()
                || ipv4.is_documentation()
                || ipv4.is_unspecified()
        }
        IpAddr::V6(ipv6) => {
            if let Some(mapped) = ipv6.to_ipv4_mapped() {
                return is_private_ip(&IpAddr::V4(mapped));
            }
            let segments = ipv6.segments();
            ipv6.is_loopback()
                || ipv6.is_unspecified()
                // fc00::/7 unique local, fe80::/10 link-local
                || (segments[0] & 0xfe00) == 0xfc00
                || (segments[0] & 0xffc0) == 0xfe80
                // 2001:db8::/32 documentation
                || (segments[0] == 0x2001 && segments[1] == 0x0db8)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_public_addresses_are_routable() {
        assert!(is_routable("8.8.8.8"));
        assert!(is_routable("2606:4700:4700::1111"));
    }

    #[test]
    fn test_reserved_addresses_are_not_routable() {
        for ip in [
            "10.0.0.1",
            "192.168.1.10",
            "127.0.0.1",
            "169.254.0.5",
            "203.0.113.5",
            "0.0.0.0",
            "::1",
            "fe80::1",
            "fd12:3456::1",
            "2001:db8::1",
            "2001:db8:ffff::42",
            "::ffff:192.168.0.1",
            "not-an-ip",
        ] {
            assert!(!is_routable(ip), "{} should not be routable", ip);
        }
    }

    #[tokio::test]
    async fn test_private_address_skips_network() {
        let config = GeolocationConfig {
            provider: Provider::Ipapi,
            // Nothing listens here; reaching the network would be a transport error
            base_url: Some("http://127.0.0.1:9".to_string()),
            timeout_secs: 1,
            skip_private: true,
        };
        let lookup = HttpGeoLookup::new(&config).expect("client");

        let result = lookup.lookup("192.168.1.1").await;
        assert!(matches!(result, Err(LookupError::NonRoutable(_))));
    }

    #[tokio::test]
    async fn test_non_address_is_rejected_even_without_private_skip() {
        let config = GeolocationConfig {
            provider: Provider::Ipapi,
            // Nothing listens here; reaching the network would be a transport error
            base_url: Some("http://127.0.0.1:9".to_string()),
            timeout_secs: 1,
            skip_private: false,
        };
        let lookup = HttpGeoLookup::new(&config).expect("client");

        for value in ["../admin/x?token=1#", "8.8.8.8/../../x", "", "example.com"] {
            let result = lookup.lookup(value).await;
            assert!(
                matches!(result, Err(LookupError::InvalidAddress(_))),
                "{:?} should be rejected, got {:?}",
                value,
                result
            );
        }
    }
}
