//! The visitor record persisted once per captured request

use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::geoip::Geolocation;

/// Sentinel for any field we could not determine
pub const UNKNOWN: &str = "Unknown";
/// Sentinel for a user-agent no device rule matched
pub const UNKNOWN_DEVICE: &str = "Unknown Device";
/// Sentinel when neither a forwarding header nor a peer address is available
pub const UNSPECIFIED_IP: &str = "0.0.0.0";

fn unknown_device() -> String {
    UNKNOWN_DEVICE.to_string()
}

/// One visit, serialized as a single JSON line in the log
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisitorRecord {
    /// ISO-8601, UTC, trailing `Z`
    pub timestamp: String,
    pub ip: String,
    pub city: String,
    pub region: String,
    pub country: String,
    pub isp: String,
    /// Older lines were written before device classification existed
    #[serde(default = "unknown_device")]
    pub device: String,
    pub user_agent: String,
}

impl VisitorRecord {
    pub fn new(ip: String, user_agent: String) -> Self {
        Self {
            timestamp: now_timestamp(),
            ip,
            city: UNKNOWN.to_string(),
            region: UNKNOWN.to_string(),
            country: UNKNOWN.to_string(),
            isp: UNKNOWN.to_string(),
            device: unknown_device(),
            user_agent,
        }
    }

    /// Fill location fields, each one defaulting on its own
    pub fn with_geo(mut self, geo: Geolocation) -> Self {
        self.city = geo.city.unwrap_or_else(|| UNKNOWN.to_string());
        self.region = geo.region.unwrap_or_else(|| UNKNOWN.to_string());
        self.country = geo.country.unwrap_or_else(|| UNKNOWN.to_string());
        self.isp = geo.isp.unwrap_or_else(|| UNKNOWN.to_string());
        self
    }

    pub fn with_device(mut self, device: String) -> Self {
        self.device = device;
        self
    }

    /// Encode as one line of JSON, without the trailing newline
    pub fn to_line(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_line(line: &str) -> serde_json::Result<Self> {
        serde_json::from_str(line)
    }
}

/// Current UTC time, e.g. `2024-05-01T12:00:00.123456Z`
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_record_defaults_every_location_field() {
        let record = VisitorRecord::new("8.8.8.8".to_string(), "curl/8.0".to_string());
        assert_eq!(record.city, UNKNOWN);
        assert_eq!(record.region, UNKNOWN);
        assert_eq!(record.country, UNKNOWN);
        assert_eq!(record.isp, UNKNOWN);
        assert_eq!(record.device, UNKNOWN_DEVICE);
        assert!(record.timestamp.ends_with('Z'));
    }

    #[test]
    fn test_partial_geo_defaults_missing_fields() {
        let geo = Geolocation {
            city: Some("Lisbon".to_string()),
            region: None,
            country: Some("Portugal".to_string()),
            isp: None,
        };
        let record = VisitorRecord::new("8.8.8.8".to_string(), UNKNOWN.to_string()).with_geo(geo);
        assert_eq!(record.city, "Lisbon");
        assert_eq!(record.region, UNKNOWN);
        assert_eq!(record.country, "Portugal");
        assert_eq!(record.isp, UNKNOWN);
    }

    #[test]
    fn test_line_encoding_is_single_line() {
        let record = VisitorRecord::new(
            "8.8.8.8".to_string(),
            "weird\nagent \"quoted\"".to_string(),
        );
        let line = record.to_line().expect("encode");
        assert!(!line.contains('\n'));
        assert_eq!(VisitorRecord::from_line(&line).expect("decode"), record);
    }

    #[test]
    fn test_line_without_device_decodes_with_sentinel() {
        let line = r#"{"timestamp":"2024-01-01T00:00:00.000000Z","ip":"1.1.1.1","city":"Unknown","region":"Unknown","country":"Unknown","isp":"Unknown","user_agent":"Unknown"}"#;
        let record = VisitorRecord::from_line(line).expect("decode");
        assert_eq!(record.device, UNKNOWN_DEVICE);
        assert_eq!(record.ip, "1.1.1.1");
    }
}
