mod common;

use std::collections::BTreeSet;
use std::sync::Arc;

use crossbeam_channel::unbounded;
use doipshark_core::capture::{CaptureDispatcher, ChannelSink, RecordSink};
use doipshark_core::config::{CaptureConfig, PoolConfig};
use doipshark_core::protocols::doip::{
    DEFAULT_PROTOCOL_VERSION as V, DOIP_PORT, construct_diagnostic_message,
};
use doipshark_core::{ErrorCode, FilterRule, PcapFileSource, ProtocolType};

fn pool() -> PoolConfig {
    PoolConfig {
        max_workers: 4,
        min_workers: 1,
        idle_timeout_ms: 50,
        queue_capacity: 4096,
    }
}

#[test]
fn file_capture_delivers_every_record_once() {
    let dir = tempfile::tempdir().unwrap();
    let mut frames = vec![common::tcp_frame(40000, DOIP_PORT, b"")];
    for i in 0..200u16 {
        let message = construct_diagnostic_message(V, 0x0e00, 0x1001, &[0x22, (i >> 8) as u8, i as u8])
            .unwrap()
            .to_bytes();
        frames.push(common::tcp_frame(40000, DOIP_PORT, &message));
    }
    let path = common::pcap_in(&dir, "burst.pcap", &frames);

    let (tx, rx) = unbounded();
    let sink: Arc<dyn RecordSink> = Arc::new(ChannelSink::new(tx));
    let dispatcher = CaptureDispatcher::new(CaptureConfig::default(), pool(), FilterRule::default(), sink);
    dispatcher.start(PcapFileSource::open(&path).unwrap()).unwrap();
    dispatcher.join().unwrap();

    let records: Vec<_> = rx.try_iter().collect();
    assert_eq!(records.len(), frames.len());
    let indices: BTreeSet<u64> = records.iter().map(|record| record.index).collect();
    assert_eq!(indices, (1..=frames.len() as u64).collect::<BTreeSet<_>>());

    let handshake = records
        .iter()
        .find(|record| record.protocol == ProtocolType::Tcp)
        .unwrap();
    assert_eq!(handshake.error, ErrorCode::NoError);
    assert_eq!(handshake.payload_length, 0);
    assert_eq!(handshake.dst_port, DOIP_PORT);

    let uds = records
        .iter()
        .filter(|record| record.uds_service == Some(0x22))
        .count();
    assert_eq!(uds, 200);

    let stats = dispatcher.stats();
    assert_eq!(stats.frames_seen, frames.len() as u64);
    assert_eq!(stats.frames_dropped, 0);
    assert_eq!(stats.records_delivered, frames.len() as u64);
    assert!(!dispatcher.is_running());
}

#[test]
fn port_filter_applies_to_file_capture() {
    let dir = tempfile::tempdir().unwrap();
    let frames = vec![
        common::tcp_frame(40000, DOIP_PORT, b""),
        common::tcp_frame(40000, 8080, b"GET /"),
        common::udp_frame(50000, DOIP_PORT, b""),
    ];
    let path = common::pcap_in(&dir, "mixed.pcap", &frames);

    let (tx, rx) = unbounded();
    let sink: Arc<dyn RecordSink> = Arc::new(ChannelSink::new(tx));
    let filter = FilterRule {
        port: Some(DOIP_PORT),
        ..FilterRule::default()
    };
    let dispatcher = CaptureDispatcher::new(CaptureConfig::default(), pool(), filter, sink);
    dispatcher.start(PcapFileSource::open(&path).unwrap()).unwrap();
    dispatcher.join().unwrap();

    let mut records: Vec<_> = rx.try_iter().collect();
    records.sort_by_key(|record| record.index);
    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|record| record.dst_port == DOIP_PORT));
    assert_eq!(records[0].index, 1);
    assert_eq!(records[1].index, 2);
}
