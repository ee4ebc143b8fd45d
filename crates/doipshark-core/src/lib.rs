//! DoIPShark core library: capture, decode and DoIP/UDS classification.
//!
//! Frames come from a [`PacketSource`] (a PCAP/PCAPNG file, or a libpcap
//! interface with the `live` feature). The header decoder turns each frame
//! into a [`PacketRecord`]; the filter and the DoIP codec then classify it,
//! one record per DoIP message. Two drivers exist: [`analyze_pcap_file`]
//! aggregates a deterministic [`Report`] offline, and
//! [`capture::CaptureDispatcher`] streams records from a capture thread
//! through a worker pool. [`session::DoipSession`] is the tester-side
//! routing activation and diagnostic exchange on top of the same codec.
//!
//! Invariants:
//! - Decoding never panics; failures are an [`ErrorCode`] on the record.
//! - A header rejected by the DoIP codec is never handed to the UDS check.
//! - Record indices are unique and dense, assigned once per delivered record.
//!
//! Version française (résumé):
//! Cette crate capture des trames, décode Ethernet/IP/TCP/UDP, reconnaît
//! DoIP (ISO 13400-2) et UDS (ISO 14229), puis produit un flux
//! d'enregistrements ou un rapport déterministe. Elle fournit aussi la
//! session cliente DoIP (activation de routage, diagnostic, délais).
//!
//! # Examples
//! ```no_run
//! use std::path::Path;
//!
//! use doipshark_core::{AnalysisOptions, analyze_pcap_file};
//!
//! let report = analyze_pcap_file(Path::new("capture.pcapng"), &AnalysisOptions::default())?;
//! println!("report version: {}", report.report_version);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use serde::{Deserialize, Serialize};

mod analysis;
pub mod capture;
pub mod config;
pub mod decode;
pub mod filter;
pub mod protocols;
mod record;
pub mod session;
pub mod source;

pub use analysis::{AnalysisError, AnalysisOptions, analyze_pcap_file, analyze_source};
pub use config::{AppConfig, ConfigError, load_config};
pub use decode::ErrorCode;
pub use filter::FilterRule;
pub use record::{PacketRecord, ProtocolType, TransportProtocol};
pub use source::{PacketEvent, PacketSource, PcapFileSource, SourceError};

/// Current report schema version.
pub const REPORT_VERSION: u32 = 1;
/// Default timestamp used when no capture time is available.
pub const DEFAULT_GENERATED_AT: &str = "1970-01-01T00:00:00Z";

/// Aggregated analysis report with deterministic ordering.
///
/// # Examples
/// ```
/// use doipshark_core::make_stub_report;
///
/// let report = make_stub_report("capture.pcapng", 123);
/// assert_eq!(report.report_version, doipshark_core::REPORT_VERSION);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    /// Report schema version (not the binary version).
    pub report_version: u32,
    pub tool: ToolInfo,
    /// RFC3339 timestamp of the last packet, or the epoch when unknown.
    pub generated_at: String,
    pub input: InputInfo,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub capture_summary: Option<CaptureSummary>,
    /// Record counts per protocol tag, in tag order.
    pub protocols: Vec<ProtocolSummary>,
    /// Transport flows sorted by source, destination, transport.
    pub flows: Vec<FlowSummary>,
    /// UDS service identifiers seen, in SID order.
    pub uds_services: Vec<UdsServiceSummary>,
    /// Compliance per protocol layer, in name order.
    pub compliance: Vec<ComplianceSummary>,
    /// Every classified record, when requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub records: Option<Vec<PacketRecord>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InputInfo {
    /// Input path as provided to the analyzer.
    pub path: String,
    pub bytes: u64,
}

/// Capture totals (timestamps may be absent).
///
/// # Examples
/// ```
/// use doipshark_core::CaptureSummary;
///
/// let summary = CaptureSummary {
///     packets_total: 10,
///     packets_skipped: 0,
///     records_total: 12,
///     time_start: None,
///     time_end: None,
/// };
/// assert!(summary.records_total >= summary.packets_total);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureSummary {
    /// Frames read from the input.
    pub packets_total: u64,
    /// Frames with a link type other than Ethernet.
    pub packets_skipped: u64,
    /// Records produced after filtering; one frame may yield several.
    pub records_total: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_start: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_end: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProtocolSummary {
    pub protocol: ProtocolType,
    pub records: u64,
}

/// Flow-level summary for a TCP or UDP endpoint pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlowSummary {
    /// `tcp` or `udp`.
    pub transport: String,
    /// `uds`, `doip`, or the transport name when no DoIP was seen.
    pub app_proto: String,
    /// Source endpoint in `ip:port` form (`[ip]:port` for IPv6).
    pub src: String,
    pub dst: String,
    pub packets: u64,
    /// Transport payload bytes.
    pub bytes: u64,
    pub doip_messages: u64,
    /// Packets per second over the capture duration.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pps: Option<f64>,
    /// Payload bytes per second over the capture duration.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bps: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UdsServiceSummary {
    pub sid: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Positive response identifier (request SID + 0x40).
    pub response: bool,
    pub count: u64,
}

/// Compliance summary for a protocol layer.
///
/// # Examples
/// ```
/// use doipshark_core::{ComplianceSummary, Violation};
///
/// let summary = ComplianceSummary {
///     protocol: "doip".to_string(),
///     compliance_percentage: 100.0,
///     violations: vec![Violation {
///         id: "DS-DOIP-PATTERN".to_string(),
///         severity: "error".to_string(),
///         message: "Protocol version and inverse version do not match".to_string(),
///         count: 1,
///         examples: Vec::new(),
///     }],
/// };
/// assert_eq!(summary.violations.len(), 1);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComplianceSummary {
    /// Layer name: `frame`, `ip`, `tcp`, `udp` or `doip`.
    pub protocol: String,
    /// Share of frames on this layer without violations (0.0–100.0).
    pub compliance_percentage: f64,
    /// Violations sorted by severity and ID.
    pub violations: Vec<Violation>,
}

/// Single compliance violation record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Violation {
    /// Stable violation identifier (e.g., `DS-TCP-CHECKSUM`).
    pub id: String,
    /// Severity label (`error` or `warning`).
    pub severity: String,
    pub message: String,
    pub count: u64,
    /// At most three example contexts, formatted as `src -> dst @ ts`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub examples: Vec<String>,
}

/// Build a stub report with base fields filled and empty aggregates.
///
/// # Examples
/// ```
/// use doipshark_core::make_stub_report;
///
/// let report = make_stub_report("capture.pcapng", 123);
/// assert_eq!(report.tool.name, "doipshark");
/// assert!(report.flows.is_empty());
/// ```
pub fn make_stub_report(input_path: &str, input_bytes: u64) -> Report {
    Report {
        report_version: REPORT_VERSION,
        tool: ToolInfo {
            name: "doipshark".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
        generated_at: DEFAULT_GENERATED_AT.to_string(),
        input: InputInfo {
            path: input_path.to_string(),
            bytes: input_bytes,
        },
        capture_summary: None,
        protocols: vec![],
        flows: vec![],
        uds_services: vec![],
        compliance: vec![],
        records: None,
    }
}
