#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use etherparse::PacketBuilder;

pub const TESTER_MAC: [u8; 6] = [0x02, 0x00, 0x00, 0x00, 0x0e, 0x00];
pub const ENTITY_MAC: [u8; 6] = [0x02, 0x00, 0x00, 0x00, 0x10, 0x01];
pub const TESTER_IP: [u8; 4] = [192, 168, 0, 10];
pub const ENTITY_IP: [u8; 4] = [192, 168, 0, 20];

/// Ethernet + IPv4 + TCP frame from the tester to the entity.
pub fn tcp_frame(src_port: u16, dst_port: u16, payload: &[u8]) -> Vec<u8> {
    let builder = PacketBuilder::ethernet2(TESTER_MAC, ENTITY_MAC)
        .ipv4(TESTER_IP, ENTITY_IP, 64)
        .tcp(src_port, dst_port, 1000, 4096);
    let mut frame = Vec::with_capacity(builder.size(payload.len()));
    builder.write(&mut frame, payload).unwrap();
    frame
}

/// Ethernet + IPv4 + UDP broadcast frame from the tester.
pub fn udp_frame(src_port: u16, dst_port: u16, payload: &[u8]) -> Vec<u8> {
    let builder = PacketBuilder::ethernet2(TESTER_MAC, [0xff; 6])
        .ipv4(TESTER_IP, [255, 255, 255, 255], 64)
        .udp(src_port, dst_port);
    let mut frame = Vec::with_capacity(builder.size(payload.len()));
    builder.write(&mut frame, payload).unwrap();
    frame
}

/// Write a little-endian legacy PCAP file with Ethernet linktype.
///
/// Each frame is stamped one second after the previous one, starting at
/// `1_700_000_000`.
pub fn write_pcap(path: &Path, frames: &[Vec<u8>]) {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&0xa1b2_c3d4u32.to_le_bytes());
    bytes.extend_from_slice(&2u16.to_le_bytes());
    bytes.extend_from_slice(&4u16.to_le_bytes());
    bytes.extend_from_slice(&0i32.to_le_bytes());
    bytes.extend_from_slice(&0u32.to_le_bytes());
    bytes.extend_from_slice(&65535u32.to_le_bytes());
    bytes.extend_from_slice(&1u32.to_le_bytes());
    for (i, frame) in frames.iter().enumerate() {
        let len = frame.len() as u32;
        bytes.extend_from_slice(&(1_700_000_000u32 + i as u32).to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes());
        bytes.extend_from_slice(&len.to_le_bytes());
        bytes.extend_from_slice(&len.to_le_bytes());
        bytes.extend_from_slice(frame);
    }
    fs::write(path, bytes).unwrap();
}

pub fn pcap_in(dir: &tempfile::TempDir, name: &str, frames: &[Vec<u8>]) -> PathBuf {
    let path = dir.path().join(name);
    write_pcap(&path, frames);
    path
}
