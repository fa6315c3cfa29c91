//! Per-provider request URLs and response adapters.
//!
//! Provider field names stay in this file; everything else sees [`Geolocation`].

use serde::Deserialize;
use std::net::IpAddr;

use super::{Geolocation, LookupError};
use crate::config::Provider;

/// ipapi.co `/{ip}/json/`
#[derive(Debug, Deserialize)]
struct IpApiResponse {
    city: Option<String>,
    region: Option<String>,
    country_name: Option<String>,
    org: Option<String>,
    #[serde(default)]
    error: bool,
    reason: Option<String>,
}

/// ipinfo.io `/{ip}/json`
#[derive(Debug, Deserialize)]
struct IpInfoResponse {
    city: Option<String>,
    region: Option<String>,
    country: Option<String>,
    org: Option<String>,
    #[serde(default)]
    bogon: bool,
}

pub(super) fn lookup_url(provider: Provider, base_url: &str, ip: IpAddr) -> String {
    match provider {
        Provider::Ipapi => format!("{}/{}/json/", base_url, ip),
        Provider::Ipinfo => format!("{}/{}/json", base_url, ip),
    }
}

pub(super) fn parse(provider: Provider, body: &[u8]) -> Result<Geolocation, LookupError> {
    match provider {
        Provider::Ipapi => {
            let response: IpApiResponse = serde_json::from_slice(body)?;
            if response.error {
                return Err(LookupError::Provider(
                    response.reason.unwrap_or_else(|| "unspecified".to_string()),
                ));
            }
            Ok(Geolocation {
                city: non_empty(response.city),
                region: non_empty(response.region),
                country: non_empty(response.country_name),
                isp: non_empty(response.org),
            })
        }
        Provider::Ipinfo => {
            let response: IpInfoResponse = serde_json::from_slice(body)?;
            if response.bogon {
                return Err(LookupError::Provider("bogon address".to_string()));
            }
            Ok(Geolocation {
                city: non_empty(response.city),
                region: non_empty(response.region),
                country: non_empty(response.country),
                isp: non_empty(response.org),
            })
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ipapi_fields_are_normalized() {
        let body = br#"{
            "ip": "8.8.8.8",
            "city": "Mountain View",
            "region": "California",
            "country": "US",
            "country_name": "United States",
            "org": "GOOGLE"
        }"#;

        let geo = parse(Provider::Ipapi, body).expect("parse");
        assert_eq!(geo.city.as_deref(), Some("Mountain View"));
        assert_eq!(geo.region.as_deref(), Some("California"));
        assert_eq!(geo.country.as_deref(), Some("United States"));
        assert_eq!(geo.isp.as_deref(), Some("GOOGLE"));
    }

    #[test]
    fn test_ipinfo_fields_are_normalized() {
        let body = br#"{
            "ip": "1.1.1.1",
            "city": "Brisbane",
            "region": "Queensland",
            "country": "AU",
            "org": "AS13335 Cloudflare, Inc."
        }"#;

        let geo = parse(Provider::Ipinfo, body).expect("parse");
        assert_eq!(geo.city.as_deref(), Some("Brisbane"));
        assert_eq!(geo.country.as_deref(), Some("AU"));
        assert_eq!(geo.isp.as_deref(), Some("AS13335 Cloudflare, Inc."));
    }

    #[test]
    fn test_partial_response_leaves_missing_fields_empty() {
        let geo = parse(Provider::Ipapi, br#"{"city": "Oslo", "region": ""}"#).expect("parse");
        assert_eq!(geo.city.as_deref(), Some("Oslo"));
        assert_eq!(geo.region, None);
        assert_eq!(geo.country, None);
        assert_eq!(geo.isp, None);
    }

    #[test]
    fn test_ipapi_error_body_is_a_failure() {
        let body = br#"{"ip": "127.0.0.1", "error": true, "reason": "Reserved IP Address"}"#;
        match parse(Provider::Ipapi, body) {
            Err(LookupError::Provider(reason)) => assert_eq!(reason, "Reserved IP Address"),
            other => panic!("expected provider error, got {:?}", other),
        }
    }

    #[test]
    fn test_ipinfo_bogon_is_a_failure() {
        let body = br#"{"ip": "10.0.0.1", "bogon": true}"#;
        assert!(matches!(parse(Provider::Ipinfo, body), Err(LookupError::Provider(_))));
    }

    #[test]
    fn test_garbage_body_is_a_decode_failure() {
        assert!(matches!(
            parse(Provider::Ipinfo, b"<html>rate limited</html>"),
            Err(LookupError::Decode(_))
        ));
    }

    #[test]
    fn test_lookup_urls_follow_provider_layout() {
        let ip: IpAddr = "8.8.8.8".parse().expect("addr");
        assert_eq!(
            lookup_url(Provider::Ipapi, "https://ipapi.co", ip),
            "https://ipapi.co/8.8.8.8/json/"
        );
        assert_eq!(
            lookup_url(Provider::Ipinfo, "https://ipinfo.io", ip),
            "https://ipinfo.io/8.8.8.8/json"
        );
    }
}
