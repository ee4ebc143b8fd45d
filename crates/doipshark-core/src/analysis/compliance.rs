use std::collections::{BTreeMap, BTreeSet};

use crate::decode::ErrorCode;
use crate::protocols::doip::NackCode;
use crate::{ComplianceSummary, PacketRecord, Violation};

const MAX_EXAMPLES: usize = 3;

const SEVERITY_ERROR: &str = "error";
const SEVERITY_WARNING: &str = "warning";

/// Static description of one violation kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Rule {
    pub protocol: &'static str,
    pub id: &'static str,
    pub severity: &'static str,
    pub message: &'static str,
}

const fn rule(
    protocol: &'static str,
    id: &'static str,
    severity: &'static str,
    message: &'static str,
) -> Rule {
    Rule {
        protocol,
        id,
        severity,
        message,
    }
}

pub(crate) fn decode_rule(code: ErrorCode) -> Option<Rule> {
    let rule = match code {
        ErrorCode::NoError => return None,
        ErrorCode::SnapLengthError => rule(
            "frame",
            "DS-FRAME-SNAP-LENGTH",
            SEVERITY_ERROR,
            "Frame shorter than Ethernet + IPv4 + UDP headers",
        ),
        ErrorCode::EthernetTypeUnknown => rule(
            "frame",
            "DS-FRAME-ETHERTYPE",
            SEVERITY_WARNING,
            "EtherType is neither IPv4 nor IPv6",
        ),
        ErrorCode::Ipv4HeaderLostError => rule(
            "ip",
            "DS-IP-V4-HEADER-LOST",
            SEVERITY_ERROR,
            "IPv4 header truncated",
        ),
        ErrorCode::Ipv6HeaderLostError => rule(
            "ip",
            "DS-IP-V6-HEADER-LOST",
            SEVERITY_ERROR,
            "IPv6 header truncated",
        ),
        ErrorCode::InvalidIpVersion => {
            rule("ip", "DS-IP-VERSION", SEVERITY_ERROR, "IP version is not 4 or 6")
        }
        ErrorCode::InvalidIpHeaderLength => rule(
            "ip",
            "DS-IP-HEADER-LENGTH",
            SEVERITY_ERROR,
            "IPv4 header length below 5 words or beyond the packet",
        ),
        ErrorCode::InvalidIpTotalLength => rule(
            "ip",
            "DS-IP-TOTAL-LENGTH",
            SEVERITY_ERROR,
            "IP total length below 20 or beyond the packet",
        ),
        ErrorCode::IpTtlExpired => rule(
            "ip",
            "DS-IP-TTL",
            SEVERITY_WARNING,
            "TTL or hop limit below 2",
        ),
        ErrorCode::InvalidIpChecksum => rule(
            "ip",
            "DS-IP-CHECKSUM",
            SEVERITY_ERROR,
            "IPv4 header checksum mismatch",
        ),
        ErrorCode::TcpHeaderLostError => rule(
            "tcp",
            "DS-TCP-HEADER-LOST",
            SEVERITY_ERROR,
            "TCP header truncated",
        ),
        ErrorCode::HeaderOffsetError => rule(
            "tcp",
            "DS-TCP-DATA-OFFSET",
            SEVERITY_ERROR,
            "TCP data offset is zero",
        ),
        ErrorCode::TcpPayloadLostError => rule(
            "tcp",
            "DS-TCP-PAYLOAD-LOST",
            SEVERITY_ERROR,
            "TCP payload shorter than declared",
        ),
        ErrorCode::InvalidTcpPort => {
            rule("tcp", "DS-TCP-PORT", SEVERITY_ERROR, "TCP port is zero")
        }
        ErrorCode::InvalidTcpHeaderLength => rule(
            "tcp",
            "DS-TCP-HEADER-LENGTH",
            SEVERITY_ERROR,
            "TCP data offset outside 5..=15 words",
        ),
        ErrorCode::InvalidTcpChecksum => rule(
            "tcp",
            "DS-TCP-CHECKSUM",
            SEVERITY_ERROR,
            "TCP checksum mismatch",
        ),
        ErrorCode::UdpHeaderLostError => rule(
            "udp",
            "DS-UDP-HEADER-LOST",
            SEVERITY_ERROR,
            "UDP header truncated",
        ),
        ErrorCode::UdpPayloadLostError => rule(
            "udp",
            "DS-UDP-PAYLOAD-LOST",
            SEVERITY_ERROR,
            "UDP payload shorter than declared",
        ),
        ErrorCode::IncompletePacketError => rule(
            "doip",
            "DS-DOIP-INCOMPLETE",
            SEVERITY_ERROR,
            "Trailing bytes do not form a DoIP message",
        ),
    };
    Some(rule)
}

pub(crate) fn nack_rule(nack: NackCode) -> Rule {
    match nack {
        NackCode::IncorrectPatternFormat => rule(
            "doip",
            "DS-DOIP-PATTERN",
            SEVERITY_ERROR,
            "Protocol version and inverse version do not match",
        ),
        NackCode::UnknownPayloadType => rule(
            "doip",
            "DS-DOIP-PAYLOAD-TYPE",
            SEVERITY_ERROR,
            "Payload type, length or transport outside the DoIP table",
        ),
        NackCode::MessageTooLarge => rule(
            "doip",
            "DS-DOIP-TOO-LARGE",
            SEVERITY_ERROR,
            "Declared DoIP payload exceeds the configured maximum",
        ),
        NackCode::OutOfMemory => rule(
            "doip",
            "DS-DOIP-OUT-OF-MEMORY",
            SEVERITY_ERROR,
            "DoIP message could not be buffered",
        ),
        NackCode::InvalidPayloadLength => rule(
            "doip",
            "DS-DOIP-PAYLOAD-LENGTH",
            SEVERITY_ERROR,
            "Declared DoIP payload longer than the bytes present",
        ),
    }
}

fn nack_from_name(name: &str) -> Option<NackCode> {
    (0..=4u8)
        .filter_map(NackCode::from_code)
        .find(|nack| nack.as_str() == name)
}

#[derive(Debug, Default)]
struct ViolationStats {
    rule: Option<Rule>,
    count: u64,
    examples: Vec<String>,
}

/// Per-frame bookkeeping; commit once per frame so a frame counts at most
/// once per protocol.
#[derive(Debug, Default)]
pub(crate) struct FrameTally {
    observed: BTreeSet<&'static str>,
    violated: BTreeSet<&'static str>,
}

impl FrameTally {
    pub(crate) fn observe(&mut self, protocol: &'static str) {
        self.observed.insert(protocol);
    }
}

#[derive(Debug, Default)]
pub(crate) struct ComplianceTracker {
    observed: BTreeMap<&'static str, u64>,
    violating: BTreeMap<&'static str, u64>,
    violations: BTreeMap<&'static str, ViolationStats>,
}

impl ComplianceTracker {
    pub(crate) fn record(&mut self, tally: &mut FrameTally, rule: Rule, context: &PacketRecord) {
        tally.violated.insert(rule.protocol);
        let entry = self.violations.entry(rule.id).or_default();
        entry.rule = Some(rule);
        entry.count += 1;
        if entry.examples.len() < MAX_EXAMPLES {
            entry.examples.push(example(context));
        }
    }

    /// Violations carried by a classified record: its decode error and the
    /// DoIP NACK, when set.
    pub(crate) fn record_packet(&mut self, tally: &mut FrameTally, record: &PacketRecord) {
        if let Some(rule) = decode_rule(record.error) {
            self.record(tally, rule, record);
        }
        if let Some(nack) = record.doip_nack.as_deref().and_then(nack_from_name) {
            self.record(tally, nack_rule(nack), record);
        }
    }

    pub(crate) fn commit(&mut self, tally: FrameTally) {
        for protocol in tally.observed.union(&tally.violated) {
            *self.observed.entry(*protocol).or_default() += 1;
        }
        for protocol in tally.violated {
            *self.violating.entry(protocol).or_default() += 1;
        }
    }

    pub(crate) fn into_summaries(self) -> Vec<ComplianceSummary> {
        let mut per_protocol: BTreeMap<&'static str, Vec<Violation>> = BTreeMap::new();
        for (_, stats) in self.violations {
            let Some(rule) = stats.rule else {
                continue;
            };
            per_protocol.entry(rule.protocol).or_default().push(Violation {
                id: rule.id.to_string(),
                severity: rule.severity.to_string(),
                message: rule.message.to_string(),
                count: stats.count,
                examples: stats.examples,
            });
        }

        self.observed
            .iter()
            .map(|(protocol, observed)| {
                let violating = self.violating.get(protocol).copied().unwrap_or(0);
                let mut violations = per_protocol.remove(protocol).unwrap_or_default();
                violations.sort_by(|a, b| {
                    severity_rank(&a.severity)
                        .cmp(&severity_rank(&b.severity))
                        .then_with(|| a.id.cmp(&b.id))
                });
                ComplianceSummary {
                    protocol: protocol.to_string(),
                    compliance_percentage: percentage(*observed, violating),
                    violations,
                }
            })
            .collect()
    }
}

fn severity_rank(severity: &str) -> u8 {
    if severity == SEVERITY_ERROR { 0 } else { 1 }
}

fn percentage(observed: u64, violating: u64) -> f64 {
    if observed == 0 {
        return 100.0;
    }
    let clean = observed.saturating_sub(violating);
    clean as f64 * 100.0 / observed as f64
}

fn example(record: &PacketRecord) -> String {
    let when = if record.timestamp.is_empty() {
        "unknown time"
    } else {
        record.timestamp.as_str()
    };
    if record.src_ip.is_empty() {
        return format!("frame {} @ {when}", record.index);
    }
    format!(
        "{} -> {} @ {when}",
        endpoint(&record.src_ip, record.src_port),
        endpoint(&record.dst_ip, record.dst_port)
    )
}

pub(crate) fn endpoint(ip: &str, port: u16) -> String {
    if ip.contains(':') {
        format!("[{ip}]:{port}")
    } else {
        format!("{ip}:{port}")
    }
}
