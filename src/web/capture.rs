//! Capture: turn an inbound request into a persisted visitor record

use axum::http::HeaderMap;
use std::net::IpAddr;
use tracing::info;

use super::AppState;
use crate::device::{classify_browser, classify_device, DeviceClass};
use crate::diagnostics::{self, Failure};
use crate::record::{VisitorRecord, UNKNOWN, UNSPECIFIED_IP};

/// Everything the page needs about the current request
#[derive(Debug, Clone)]
pub struct Visit {
    pub record: VisitorRecord,
    pub device: DeviceClass,
    pub browser: Option<&'static str>,
    /// False when the append failed and the record only lives in memory
    pub persisted: bool,
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Resolve the client address.
/// Priority: X-Forwarded-For (first entry) > X-Real-IP > peer address > `0.0.0.0`
pub fn resolve_ip(headers: &HeaderMap, peer: Option<IpAddr>) -> String {
    // May contain a chain of proxies; the first entry is the original client
    if let Some(forwarded) = header_str(headers, "x-forwarded-for") {
        if let Some(first_ip) = forwarded.split(',').next() {
            let ip = first_ip.trim();
            if !ip.is_empty() {
                return ip.to_string();
            }
        }
    }

    if let Some(real_ip) = header_str(headers, "x-real-ip") {
        return real_ip.to_string();
    }

    peer.map(|addr| addr.to_string())
        .unwrap_or_else(|| UNSPECIFIED_IP.to_string())
}

/// Raw User-Agent header, `Unknown` when absent or blank
pub fn resolve_user_agent(headers: &HeaderMap) -> String {
    headers
        .get(axum::http::header::USER_AGENT)
        .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
        .filter(|ua| !ua.trim().is_empty())
        .unwrap_or_else(|| UNKNOWN.to_string())
}

/// Build one record for this request and append it to the log.
/// Never fails: lookup and persistence errors degrade to defaults.
pub async fn capture(state: &AppState, headers: &HeaderMap, peer: Option<IpAddr>) -> Visit {
    let ip = resolve_ip(headers, peer);
    let user_agent = resolve_user_agent(headers);
    let device = classify_device(&user_agent);
    let browser = classify_browser(&user_agent);

    let mut record = VisitorRecord::new(ip, user_agent).with_device(device.label.clone());

    match state.geo.lookup(&record.ip).await {
        Ok(geo) => record = record.with_geo(geo),
        Err(e) => diagnostics::report(Failure::Lookup, &record.ip, &e),
    }

    let persisted = match state.store.append(&record).await {
        Ok(()) => true,
        Err(e) => {
            diagnostics::report(Failure::Persist, &record.ip, &e);
            false
        }
    };

    info!(
        persisted,
        "Visit from {} ({}, {})", record.ip, record.device, record.country
    );

    Visit {
        record,
        device,
        browser,
        persisted,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(*value));
        }
        map
    }

    #[test]
    fn test_forwarded_for_takes_first_entry() {
        let map = headers(&[("x-forwarded-for", "203.0.113.5, 10.0.0.1")]);
        let peer = Some("127.0.0.1".parse().unwrap());
        assert_eq!(resolve_ip(&map, peer), "203.0.113.5");
    }

    #[test]
    fn test_peer_address_fallback() {
        let peer = Some("198.51.100.7".parse().unwrap());
        assert_eq!(resolve_ip(&HeaderMap::new(), peer), "198.51.100.7");
    }

    #[test]
    fn test_sentinel_when_nothing_known() {
        assert_eq!(resolve_ip(&HeaderMap::new(), None), "0.0.0.0");
    }

    #[test]
    fn test_real_ip_used_when_forwarded_for_missing() {
        let map = headers(&[("x-real-ip", " 192.0.2.44 ")]);
        let peer = Some("127.0.0.1".parse().unwrap());
        assert_eq!(resolve_ip(&map, peer), "192.0.2.44");
    }

    #[test]
    fn test_empty_forwarded_entry_falls_through() {
        let map = headers(&[("x-forwarded-for", " , 10.0.0.1")]);
        let peer = Some("198.51.100.7".parse().unwrap());
        assert_eq!(resolve_ip(&map, peer), "198.51.100.7");
    }

    #[test]
    fn test_user_agent_defaults_to_unknown() {
        assert_eq!(resolve_user_agent(&HeaderMap::new()), "Unknown");
        assert_eq!(resolve_user_agent(&headers(&[("user-agent", "  ")])), "Unknown");
        assert_eq!(
            resolve_user_agent(&headers(&[("user-agent", "curl/8.4.0")])),
            "curl/8.4.0"
        );
    }
}
