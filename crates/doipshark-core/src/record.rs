//! Canonical decoded unit delivered to record sinks.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

use crate::decode::ErrorCode;

/// Protocol classification of a record, ordered from the outermost layer.
///
/// # Examples
/// ```
/// use doipshark_core::ProtocolType;
///
/// let proto: ProtocolType = "DoIP".parse().unwrap();
/// assert_eq!(proto, ProtocolType::Doip);
/// assert_eq!(proto.to_string(), "DoIP");
/// ```
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum ProtocolType {
    #[default]
    Default,
    #[serde(rename = "IPv4")]
    Ipv4,
    #[serde(rename = "IPv6")]
    Ipv6,
    #[serde(rename = "TCP")]
    Tcp,
    #[serde(rename = "UDP")]
    Udp,
    #[serde(rename = "DoIP")]
    Doip,
    #[serde(rename = "UDS")]
    Uds,
}

impl ProtocolType {
    pub fn as_str(self) -> &'static str {
        match self {
            ProtocolType::Default => "Default",
            ProtocolType::Ipv4 => "IPv4",
            ProtocolType::Ipv6 => "IPv6",
            ProtocolType::Tcp => "TCP",
            ProtocolType::Udp => "UDP",
            ProtocolType::Doip => "DoIP",
            ProtocolType::Uds => "UDS",
        }
    }
}

impl fmt::Display for ProtocolType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProtocolType {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "default" | "" => Ok(ProtocolType::Default),
            "ipv4" => Ok(ProtocolType::Ipv4),
            "ipv6" => Ok(ProtocolType::Ipv6),
            "tcp" => Ok(ProtocolType::Tcp),
            "udp" => Ok(ProtocolType::Udp),
            "doip" => Ok(ProtocolType::Doip),
            "uds" => Ok(ProtocolType::Uds),
            other => Err(format!("unknown protocol type '{other}'")),
        }
    }
}

/// Transport carrying a DoIP payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportProtocol {
    Tcp,
    Udp,
}

impl TransportProtocol {
    pub fn as_str(self) -> &'static str {
        match self {
            TransportProtocol::Tcp => "tcp",
            TransportProtocol::Udp => "udp",
        }
    }
}

/// One decoded frame (or one DoIP message within a frame).
///
/// When `error` is not [`ErrorCode::NoError`], every field after it is
/// best-effort and must not be treated as validated.
///
/// # Examples
/// ```
/// use doipshark_core::{ErrorCode, PacketRecord, ProtocolType};
///
/// let record = PacketRecord::default();
/// assert_eq!(record.error, ErrorCode::NoError);
/// assert_eq!(record.protocol, ProtocolType::Default);
/// assert_eq!(record.index, 0);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PacketRecord {
    /// Position in the delivered stream, starting at 1. Zero until classified.
    pub index: u64,
    /// RFC3339 capture timestamp (empty when the source has none).
    pub timestamp: String,
    pub error: ErrorCode,
    /// Human-readable diagnostic for `error`; empty on success.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub error_detail: String,
    pub src_mac: String,
    pub dst_mac: String,
    pub src_ip: String,
    pub dst_ip: String,
    pub src_port: u16,
    pub dst_port: u16,
    pub protocol: ProtocolType,
    pub payload_length: usize,
    /// Lower-case hex rendering of the payload bytes.
    pub payload: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doip_payload_type: Option<u16>,
    /// NACK reason when DoIP framing was rejected on a DoIP port.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doip_nack: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uds_service: Option<u8>,
}

impl PacketRecord {
    pub fn is_error(&self) -> bool {
        self.error.is_error()
    }
}

/// RFC3339 rendering of a capture timestamp in seconds since the epoch.
pub(crate) fn ts_to_rfc3339(ts: Option<f64>) -> Option<String> {
    let ts = ts?;
    let nanos = (ts * 1_000_000_000.0) as i128;
    OffsetDateTime::from_unix_timestamp_nanos(nanos)
        .ok()
        .and_then(|dt| dt.format(&Rfc3339).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamps_render_as_rfc3339() {
        assert_eq!(
            ts_to_rfc3339(Some(1_700_000_000.0)).as_deref(),
            Some("2023-11-14T22:13:20Z")
        );
        assert_eq!(ts_to_rfc3339(None), None);
    }

    #[test]
    fn protocol_type_serializes_with_wire_names() {
        let value = serde_json::to_value(ProtocolType::Ipv6).expect("json");
        assert_eq!(value, serde_json::json!("IPv6"));
        let parsed: ProtocolType = serde_json::from_str("\"UDS\"").expect("parse");
        assert_eq!(parsed, ProtocolType::Uds);
    }

    #[test]
    fn protocol_type_parses_case_insensitively() {
        assert_eq!("tcp".parse::<ProtocolType>(), Ok(ProtocolType::Tcp));
        assert_eq!("DOIP".parse::<ProtocolType>(), Ok(ProtocolType::Doip));
        assert!("sctp".parse::<ProtocolType>().is_err());
    }

    #[test]
    fn record_omits_optional_fields_when_unset() {
        let record = PacketRecord::default();
        let value = serde_json::to_value(&record).expect("json");
        assert!(value.get("error_detail").is_none());
        assert!(value.get("doip_payload_type").is_none());
        assert!(value.get("doip_nack").is_none());
        assert!(value.get("uds_service").is_none());
        assert_eq!(value["error"], serde_json::json!("NoError"));
    }
}
