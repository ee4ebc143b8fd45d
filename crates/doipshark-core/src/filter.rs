//! Record filter predicate.
//!
//! Every set field of a [`FilterRule`] must match; unset fields (empty
//! strings, zero ports or lengths, `ProtocolType::Default`) never restrict.

use serde::{Deserialize, Serialize};

use crate::config::ConfigError;
use crate::{PacketRecord, ProtocolType};

/// Match criteria applied to decoded records.
///
/// # Examples
/// ```
/// use doipshark_core::{FilterRule, PacketRecord, ProtocolType};
///
/// let rule = FilterRule {
///     protocol: Some(ProtocolType::Doip),
///     port: Some(13400),
///     ..FilterRule::default()
/// };
/// let record = PacketRecord {
///     protocol: ProtocolType::Uds,
///     dst_port: 13400,
///     ..PacketRecord::default()
/// };
/// assert!(rule.matches(&record));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterRule {
    pub protocol: Option<ProtocolType>,
    /// Matches either endpoint. Exclusive with `src_ip`/`dst_ip`.
    pub ip: Option<String>,
    pub src_ip: Option<String>,
    pub dst_ip: Option<String>,
    pub src_mac: Option<String>,
    pub dst_mac: Option<String>,
    /// Matches either port. Exclusive with `src_port`/`dst_port`.
    pub port: Option<u16>,
    pub src_port: Option<u16>,
    pub dst_port: Option<u16>,
    pub min_payload_length: Option<usize>,
    pub max_payload_length: Option<usize>,
}

impl FilterRule {
    /// Reject rules combining a single address/port with directional ones.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if set_str(&self.ip).is_some()
            && (set_str(&self.src_ip).is_some() || set_str(&self.dst_ip).is_some())
        {
            return Err(ConfigError::Invalid(
                "filter.ip cannot be combined with filter.src_ip or filter.dst_ip".to_string(),
            ));
        }
        if set_num(self.port).is_some()
            && (set_num(self.src_port).is_some() || set_num(self.dst_port).is_some())
        {
            return Err(ConfigError::Invalid(
                "filter.port cannot be combined with filter.src_port or filter.dst_port"
                    .to_string(),
            ));
        }
        if let (Some(min), Some(max)) = (
            set_len(self.min_payload_length),
            set_len(self.max_payload_length),
        ) {
            if min > max {
                return Err(ConfigError::Invalid(format!(
                    "filter.min_payload_length {min} exceeds filter.max_payload_length {max}"
                )));
            }
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.protocol_criterion().is_none()
            && set_str(&self.ip).is_none()
            && set_str(&self.src_ip).is_none()
            && set_str(&self.dst_ip).is_none()
            && set_str(&self.src_mac).is_none()
            && set_str(&self.dst_mac).is_none()
            && set_num(self.port).is_none()
            && set_num(self.src_port).is_none()
            && set_num(self.dst_port).is_none()
            && set_len(self.min_payload_length).is_none()
            && set_len(self.max_payload_length).is_none()
    }

    /// Both stages: addressing then protocol class.
    pub fn matches(&self, record: &PacketRecord) -> bool {
        self.matches_addressing(record) && self.matches_protocol(record)
    }

    /// Address, port, MAC and payload-length criteria.
    pub fn matches_addressing(&self, record: &PacketRecord) -> bool {
        if set_str(&self.ip).is_some_and(|ip| record.src_ip != ip && record.dst_ip != ip) {
            return false;
        }
        if !str_matches(&self.src_ip, &record.src_ip)
            || !str_matches(&self.dst_ip, &record.dst_ip)
            || !mac_matches(&self.src_mac, &record.src_mac)
            || !mac_matches(&self.dst_mac, &record.dst_mac)
        {
            return false;
        }
        if set_num(self.port).is_some_and(|port| record.src_port != port && record.dst_port != port)
        {
            return false;
        }
        if set_num(self.src_port).is_some_and(|port| record.src_port != port)
            || set_num(self.dst_port).is_some_and(|port| record.dst_port != port)
        {
            return false;
        }
        if set_len(self.min_payload_length).is_some_and(|min| record.payload_length < min)
            || set_len(self.max_payload_length).is_some_and(|max| record.payload_length > max)
        {
            return false;
        }
        true
    }

    /// Protocol-class criterion, evaluated after DoIP/UDS classification.
    pub fn matches_protocol(&self, record: &PacketRecord) -> bool {
        match self.protocol_criterion() {
            Some(wanted) => protocol_admits(wanted, record.protocol),
            None => true,
        }
    }

    fn protocol_criterion(&self) -> Option<ProtocolType> {
        self.protocol.filter(|p| *p != ProtocolType::Default)
    }
}

/// Whether a rule on `wanted` admits a record classified as `actual`.
///
/// A `DoIP` rule also admits `UDS`, which is carried inside DoIP; every
/// other class must match exactly.
pub fn protocol_admits(wanted: ProtocolType, actual: ProtocolType) -> bool {
    match wanted {
        ProtocolType::Default => true,
        ProtocolType::Doip => matches!(actual, ProtocolType::Doip | ProtocolType::Uds),
        other => other == actual,
    }
}

fn set_str(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn set_num(value: Option<u16>) -> Option<u16> {
    value.filter(|v| *v != 0)
}

fn set_len(value: Option<usize>) -> Option<usize> {
    value.filter(|v| *v != 0)
}

fn str_matches(wanted: &Option<String>, actual: &str) -> bool {
    set_str(wanted).is_none_or(|wanted| wanted == actual)
}

fn mac_matches(wanted: &Option<String>, actual: &str) -> bool {
    set_str(wanted).is_none_or(|wanted| wanted.eq_ignore_ascii_case(actual))
}
