mod common;

use doipshark_core::protocols::doip::{
    DEFAULT_PROTOCOL_VERSION as V, DOIP_PORT, construct_diagnostic_message,
    construct_routing_activation_request, construct_vehicle_identification_request,
};
use doipshark_core::{
    AnalysisError, AnalysisOptions, FilterRule, ProtocolType, analyze_pcap_file,
};

const TESTER_PORT: u16 = 40000;

/// Handshake frame, activation request, UDS session control, UDP vehicle
/// identification and one DoIP header with a broken version pattern.
fn exchange_frames() -> Vec<Vec<u8>> {
    let activation = construct_routing_activation_request(V, 0x0e00, 0x00, None).to_bytes();
    let diagnostic = construct_diagnostic_message(V, 0x0e00, 0x1001, &[0x10, 0x03])
        .unwrap()
        .to_bytes();
    let identification = construct_vehicle_identification_request(V).to_bytes();
    let mut broken = construct_diagnostic_message(V, 0x0e00, 0x1001, &[0x3e, 0x00])
        .unwrap()
        .to_bytes();
    broken[1] = broken[0];

    vec![
        common::tcp_frame(TESTER_PORT, DOIP_PORT, b""),
        common::tcp_frame(TESTER_PORT, DOIP_PORT, &activation),
        common::tcp_frame(TESTER_PORT, DOIP_PORT, &diagnostic),
        common::udp_frame(50000, DOIP_PORT, &identification),
        common::tcp_frame(TESTER_PORT, DOIP_PORT, &broken),
    ]
}

#[test]
fn analysis_summarizes_doip_exchange() {
    let dir = tempfile::tempdir().unwrap();
    let path = common::pcap_in(&dir, "exchange.pcap", &exchange_frames());
    let report = analyze_pcap_file(&path, &AnalysisOptions::default()).unwrap();

    let summary = report.capture_summary.as_ref().unwrap();
    assert_eq!(summary.packets_total, 5);
    assert_eq!(summary.packets_skipped, 0);
    assert_eq!(summary.records_total, 5);
    assert!(report.generated_at.starts_with("2023-11-14T22:13:2"));

    let protocols: Vec<(ProtocolType, u64)> = report
        .protocols
        .iter()
        .map(|summary| (summary.protocol, summary.records))
        .collect();
    assert_eq!(
        protocols,
        vec![
            (ProtocolType::Tcp, 2),
            (ProtocolType::Doip, 2),
            (ProtocolType::Uds, 1),
        ]
    );

    assert_eq!(report.uds_services.len(), 1);
    let service = &report.uds_services[0];
    assert_eq!(service.sid, 0x10);
    assert_eq!(service.name.as_deref(), Some("DiagnosticSessionControl"));
    assert!(!service.response);

    assert_eq!(report.flows.len(), 2);
    let tcp = report
        .flows
        .iter()
        .find(|flow| flow.transport == "tcp")
        .unwrap();
    assert_eq!(tcp.src, "192.168.0.10:40000");
    assert_eq!(tcp.dst, "192.168.0.20:13400");
    assert_eq!(tcp.packets, 4);
    assert_eq!(tcp.app_proto, "uds");
    assert_eq!(tcp.doip_messages, 2);

    let doip = report
        .compliance
        .iter()
        .find(|summary| summary.protocol == "doip")
        .unwrap();
    assert_eq!(doip.compliance_percentage, 75.0);
    assert_eq!(doip.violations.len(), 1);
    assert_eq!(doip.violations[0].id, "DS-DOIP-PATTERN");
    assert_eq!(doip.violations[0].count, 1);

    let tcp_layer = report
        .compliance
        .iter()
        .find(|summary| summary.protocol == "tcp")
        .unwrap();
    assert!(tcp_layer.violations.is_empty());
    assert!(report.records.is_none());
}

#[test]
fn analysis_report_is_deterministic() {
    let dir = tempfile::tempdir().unwrap();
    let path = common::pcap_in(&dir, "exchange.pcap", &exchange_frames());
    let options = AnalysisOptions {
        include_records: true,
        ..AnalysisOptions::default()
    };

    let first = serde_json::to_string(&analyze_pcap_file(&path, &options).unwrap()).unwrap();
    let second = serde_json::to_string(&analyze_pcap_file(&path, &options).unwrap()).unwrap();
    assert_eq!(first, second);

    let value: serde_json::Value = serde_json::from_str(&first).unwrap();
    let records = value["records"].as_array().unwrap();
    let indices: Vec<u64> = records
        .iter()
        .map(|record| record["index"].as_u64().unwrap())
        .collect();
    assert_eq!(indices, vec![1, 2, 3, 4, 5]);
    assert_eq!(records[4]["doip_nack"], "IncorrectPatternFormat");
}

#[test]
fn protocol_filter_keeps_only_uds_records() {
    let dir = tempfile::tempdir().unwrap();
    let path = common::pcap_in(&dir, "exchange.pcap", &exchange_frames());
    let options = AnalysisOptions {
        filter: FilterRule {
            protocol: Some(ProtocolType::Uds),
            ..FilterRule::default()
        },
        include_records: true,
        ..AnalysisOptions::default()
    };

    let report = analyze_pcap_file(&path, &options).unwrap();
    let summary = report.capture_summary.as_ref().unwrap();
    assert_eq!(summary.packets_total, 5);
    assert_eq!(summary.records_total, 1);
    let records = report.records.unwrap();
    assert_eq!(records[0].index, 1);
    assert_eq!(records[0].uds_service, Some(0x10));
}

#[test]
fn contradictory_filter_is_rejected_before_reading() {
    let dir = tempfile::tempdir().unwrap();
    let path = common::pcap_in(&dir, "exchange.pcap", &exchange_frames());
    let options = AnalysisOptions {
        filter: FilterRule {
            port: Some(DOIP_PORT),
            dst_port: Some(DOIP_PORT),
            ..FilterRule::default()
        },
        ..AnalysisOptions::default()
    };

    let err = analyze_pcap_file(&path, &options).unwrap_err();
    assert!(matches!(err, AnalysisError::Filter(_)));
}
