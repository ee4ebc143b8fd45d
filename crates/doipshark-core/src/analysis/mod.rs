//! Offline analysis: drive a packet source through decode, filter and
//! DoIP/UDS classification, then aggregate a deterministic [`Report`].
//!
//! This is the synchronous counterpart of the threaded capture pipeline.
//! Records are indexed in source order, so two runs over the same file give
//! the same report.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use log::debug;
use pcap_parser::Linktype;
use thiserror::Error;

use crate::capture::{WorkItem, classify};
use crate::config::ConfigError;
use crate::decode::{ErrorCode, check_frame};
use crate::filter::FilterRule;
use crate::protocols::doip::layout as doip_layout;
use crate::protocols::uds;
use crate::record::ts_to_rfc3339;
use crate::source::{PacketSource, PcapFileSource, SourceError};
use crate::{
    CaptureSummary, DEFAULT_GENERATED_AT, PacketRecord, ProtocolSummary, ProtocolType, Report,
    UdsServiceSummary, make_stub_report,
};

mod compliance;
mod flows;

use compliance::{ComplianceTracker, FrameTally, decode_rule};
use flows::{FlowKey, FlowStats, build_flow_summaries};

#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Source error: {0}")]
    Source(#[from] SourceError),
    #[error("Invalid filter: {0}")]
    Filter(#[from] ConfigError),
}

/// Knobs for one analysis run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisOptions {
    pub filter: FilterRule,
    /// Largest DoIP payload accepted before `MessageTooLarge`.
    pub max_doip_payload: u32,
    /// Run the IP/TCP header checks (checksums, TTL, lengths) on frames
    /// that decoded cleanly.
    pub validate_headers: bool,
    /// Embed every classified record in the report.
    pub include_records: bool,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            filter: FilterRule::default(),
            max_doip_payload: doip_layout::DEFAULT_MAX_PAYLOAD_LEN,
            validate_headers: true,
            include_records: false,
        }
    }
}

pub fn analyze_pcap_file(path: &Path, options: &AnalysisOptions) -> Result<Report, AnalysisError> {
    let source = PcapFileSource::open(path)?;
    analyze_source(path, source, options)
}

pub fn analyze_source<S: PacketSource>(
    path: &Path,
    mut source: S,
    options: &AnalysisOptions,
) -> Result<Report, AnalysisError> {
    options.filter.validate()?;

    let mut packets_total = 0u64;
    let mut packets_skipped = 0u64;
    let mut next_index = 0u64;
    let mut first_ts = None;
    let mut last_ts = None;
    let mut flow_stats: HashMap<FlowKey, FlowStats> = HashMap::new();
    let mut protocol_counts: BTreeMap<ProtocolType, u64> = BTreeMap::new();
    let mut service_counts: BTreeMap<u8, u64> = BTreeMap::new();
    let mut compliance = ComplianceTracker::default();
    let mut kept_records = Vec::new();

    while let Some(event) = source.next_packet()? {
        packets_total += 1;
        update_ts_bounds(&mut first_ts, &mut last_ts, event.ts);
        if event.linktype != Linktype::ETHERNET {
            packets_skipped += 1;
            debug!("frame {packets_total}: unsupported linktype {}", event.linktype.0);
            continue;
        }

        let item = WorkItem::from_event(&event);
        let header_check = if options.validate_headers && !item.record.is_error() {
            check_frame(&event.data)
        } else {
            ErrorCode::NoError
        };
        let key = flow_key(&item);
        let payload_bytes = item.payload.len() as u64;

        let mut records = classify(item, &options.filter, options.max_doip_payload);
        let Some(first) = records.first() else {
            continue;
        };

        let mut tally = FrameTally::default();
        observe_layers(&mut tally, first, key.as_ref());
        if let Some(rule) = decode_rule(header_check) {
            compliance.record(&mut tally, rule, first);
        }
        if let Some(key) = &key {
            let flow = flow_stats.entry(key.clone()).or_default();
            flow.packets += 1;
            flow.bytes += payload_bytes;
        }

        for record in &mut records {
            next_index += 1;
            record.index = next_index;
            *protocol_counts.entry(record.protocol).or_default() += 1;
            if let Some(sid) = record.uds_service {
                *service_counts.entry(sid).or_default() += 1;
            }
            if matches!(record.protocol, ProtocolType::Doip | ProtocolType::Uds) {
                tally.observe("doip");
            }
            if let Some(flow) = key.as_ref().and_then(|key| flow_stats.get_mut(key)) {
                flow.add_message(record.protocol);
            }
            compliance.record_packet(&mut tally, record);
        }
        compliance.commit(tally);
        if options.include_records {
            kept_records.append(&mut records);
        }
    }

    let mut report = make_stub_report(&path.display().to_string(), path.metadata()?.len());
    report.capture_summary = Some(CaptureSummary {
        packets_total,
        packets_skipped,
        records_total: next_index,
        time_start: ts_to_rfc3339(first_ts),
        time_end: ts_to_rfc3339(last_ts),
    });
    report.generated_at = report
        .capture_summary
        .as_ref()
        .and_then(|summary| summary.time_end.clone().or(summary.time_start.clone()))
        .unwrap_or_else(|| DEFAULT_GENERATED_AT.to_string());

    let duration_s = match (first_ts, last_ts) {
        (Some(start), Some(end)) if end > start => Some(end - start),
        _ => None,
    };

    report.protocols = protocol_counts
        .into_iter()
        .map(|(protocol, records)| ProtocolSummary { protocol, records })
        .collect();
    report.flows = build_flow_summaries(flow_stats, duration_s);
    report.uds_services = service_counts
        .into_iter()
        .map(|(sid, count)| UdsServiceSummary {
            sid,
            name: uds::service_name(sid).map(str::to_string),
            response: uds::is_positive_response(sid),
            count,
        })
        .collect();
    report.compliance = compliance.into_summaries();
    if options.include_records {
        report.records = Some(kept_records);
    }
    Ok(report)
}

fn flow_key(item: &WorkItem) -> Option<FlowKey> {
    let transport = item.transport?;
    let record = &item.record;
    if record.src_ip.is_empty() {
        return None;
    }
    Some(FlowKey {
        transport,
        src_ip: record.src_ip.clone(),
        src_port: record.src_port,
        dst_ip: record.dst_ip.clone(),
        dst_port: record.dst_port,
    })
}

fn observe_layers(tally: &mut FrameTally, record: &PacketRecord, key: Option<&FlowKey>) {
    tally.observe("frame");
    if !record.src_ip.is_empty() {
        tally.observe("ip");
    }
    if let Some(key) = key {
        tally.observe(key.transport.as_str());
    }
}

fn update_ts_bounds(first: &mut Option<f64>, last: &mut Option<f64>, ts: Option<f64>) {
    let ts = match ts {
        Some(ts) => ts,
        None => return,
    };
    match first {
        None => *first = Some(ts),
        Some(existing) => {
            if ts < *existing {
                *first = Some(ts);
            }
        }
    }
    match last {
        None => *last = Some(ts),
        Some(existing) => {
            if ts > *existing {
                *last = Some(ts);
            }
        }
    }
}
