use std::fs;
use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::PredicateBooleanExt;
use predicates::str::contains;
use serde_json::Value;
use tempfile::TempDir;

fn cmd() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("doipshark"))
}

/// Minimal Ethernet/IPv4/TCP frame to port 13400 with a correct IPv4
/// checksum; the TCP checksum is left at zero.
fn tcp_frame(payload: &[u8]) -> Vec<u8> {
    let mut frame = Vec::new();
    frame.extend_from_slice(&[0x02, 0, 0, 0, 0x10, 0x01]);
    frame.extend_from_slice(&[0x02, 0, 0, 0, 0x0e, 0x00]);
    frame.extend_from_slice(&[0x08, 0x00]);

    let total_len = (20 + 20 + payload.len()) as u16;
    let mut ip = vec![0x45, 0x00];
    ip.extend_from_slice(&total_len.to_be_bytes());
    ip.extend_from_slice(&[0x00, 0x01, 0x40, 0x00, 64, 6, 0, 0]);
    ip.extend_from_slice(&[192, 168, 0, 10]);
    ip.extend_from_slice(&[192, 168, 0, 20]);
    let checksum = ipv4_checksum(&ip);
    ip[10..12].copy_from_slice(&checksum.to_be_bytes());
    frame.extend_from_slice(&ip);

    frame.extend_from_slice(&40000u16.to_be_bytes());
    frame.extend_from_slice(&13400u16.to_be_bytes());
    frame.extend_from_slice(&[0, 0, 0, 1, 0, 0, 0, 0, 0x50, 0x18, 0x10, 0x00, 0, 0, 0, 0]);
    frame.extend_from_slice(payload);
    frame
}

fn ipv4_checksum(header: &[u8]) -> u16 {
    let mut sum = 0u32;
    for chunk in header.chunks(2) {
        sum += u32::from(u16::from_be_bytes([chunk[0], chunk[1]]));
    }
    while sum > 0xffff {
        sum = (sum & 0xffff) + (sum >> 16);
    }
    !(sum as u16)
}

fn write_pcap(path: &Path, frames: &[Vec<u8>]) {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&0xa1b2_c3d4u32.to_le_bytes());
    bytes.extend_from_slice(&2u16.to_le_bytes());
    bytes.extend_from_slice(&4u16.to_le_bytes());
    bytes.extend_from_slice(&[0; 8]);
    bytes.extend_from_slice(&65535u32.to_le_bytes());
    bytes.extend_from_slice(&1u32.to_le_bytes());
    for (i, frame) in frames.iter().enumerate() {
        bytes.extend_from_slice(&(1_700_000_000u32 + i as u32).to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes());
        bytes.extend_from_slice(&(frame.len() as u32).to_le_bytes());
        bytes.extend_from_slice(&(frame.len() as u32).to_le_bytes());
        bytes.extend_from_slice(frame);
    }
    fs::write(path, bytes).expect("write pcap");
}

/// Diagnostic session control request, then a header whose inverse version
/// byte is wrong.
fn sample_capture(temp: &TempDir) -> PathBuf {
    let diagnostic = [
        0x02, 0xfd, 0x80, 0x01, 0, 0, 0, 6, 0x0e, 0x00, 0x10, 0x01, 0x10, 0x03,
    ];
    let mut broken = diagnostic;
    broken[1] = 0x02;
    let path = temp.path().join("exchange.pcap");
    write_pcap(&path, &[tcp_frame(&diagnostic), tcp_frame(&broken)]);
    path
}

#[test]
fn help_supports_analyse_and_analyze() {
    cmd()
        .arg("pcap")
        .arg("analyse")
        .arg("--help")
        .assert()
        .success();
    cmd()
        .arg("pcap")
        .arg("analyze")
        .arg("--help")
        .assert()
        .success();
}

#[test]
fn missing_input_shows_error_and_hint() {
    let temp = TempDir::new().expect("tempdir");
    let missing = temp.path().join("missing.pcapng");
    let report = temp.path().join("report.json");

    cmd()
        .arg("pcap")
        .arg("analyze")
        .arg(missing)
        .arg("-o")
        .arg(report)
        .assert()
        .code(2)
        .stderr(contains("error:").and(contains("hint:")));
}

#[test]
fn stdout_outputs_report_json() {
    let temp = TempDir::new().expect("tempdir");
    let input = sample_capture(&temp);
    let assert = cmd()
        .arg("pcap")
        .arg("analyze")
        .arg(input)
        .arg("--stdout")
        .assert()
        .success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).expect("utf8 stdout");
    let report: Value = serde_json::from_str(&stdout).expect("valid json");
    assert_eq!(report["tool"]["name"], "doipshark");
    assert_eq!(report["capture_summary"]["packets_total"], 2);
    assert_eq!(report["uds_services"][0]["sid"], 0x10);
}

#[test]
fn protocol_flag_filters_embedded_records() {
    let temp = TempDir::new().expect("tempdir");
    let input = sample_capture(&temp);
    let assert = cmd()
        .args(["pcap", "analyse"])
        .arg(input)
        .args(["--stdout", "--records", "--protocol", "uds"])
        .assert()
        .success();
    let report: Value = serde_json::from_slice(&assert.get_output().stdout).expect("valid json");
    let records = report["records"].as_array().expect("records");
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["protocol"], "UDS");
}

#[test]
fn stdout_and_report_conflict() {
    let temp = TempDir::new().expect("tempdir");
    let input = sample_capture(&temp);
    let report = temp.path().join("report.json");

    cmd()
        .arg("pcap")
        .arg("analyze")
        .arg(input)
        .arg("--stdout")
        .arg("-o")
        .arg(report)
        .assert()
        .failure()
        .stderr(contains("error:"));
}

#[test]
fn pretty_and_compact_conflict() {
    let temp = TempDir::new().expect("tempdir");
    let input = sample_capture(&temp);
    let report = temp.path().join("report.json");

    cmd()
        .arg("pcap")
        .arg("analyze")
        .arg(input)
        .arg("-o")
        .arg(report)
        .arg("--pretty")
        .arg("--compact")
        .assert()
        .failure()
        .stderr(contains("error:"));
}

#[test]
fn report_file_is_written_and_announced() {
    let temp = TempDir::new().expect("tempdir");
    let input = sample_capture(&temp);
    let report = temp.path().join("out").join("report.json");

    cmd()
        .arg("pcap")
        .arg("analyse")
        .arg(input)
        .arg("-o")
        .arg(&report)
        .assert()
        .success()
        .stderr(contains("OK: report written"));
    let text = fs::read_to_string(&report).expect("report written");
    let _: Value = serde_json::from_str(&text).expect("valid json");
}

#[test]
fn quiet_suppresses_ok_message() {
    let temp = TempDir::new().expect("tempdir");
    let input = sample_capture(&temp);
    let report = temp.path().join("report.json");

    cmd()
        .arg("pcap")
        .arg("analyze")
        .arg(input)
        .arg("-o")
        .arg(report)
        .arg("--quiet")
        .assert()
        .success()
        .stderr(predicates::str::contains("OK:").not());
}

#[test]
fn report_may_not_overwrite_input() {
    let temp = TempDir::new().expect("tempdir");
    let input = sample_capture(&temp);

    cmd()
        .arg("pcap")
        .arg("analyze")
        .arg(&input)
        .arg("-o")
        .arg(&input)
        .assert()
        .failure()
        .stderr(contains("report path must differ from input"));
}

#[test]
fn list_violations_outputs_ids() {
    let temp = TempDir::new().expect("tempdir");
    let input = sample_capture(&temp);
    let report = temp.path().join("report.json");

    cmd()
        .arg("pcap")
        .arg("analyze")
        .arg(input)
        .arg("-o")
        .arg(report)
        .arg("--list-violations")
        .assert()
        .success()
        .stderr(contains("Compliance violations:").and(contains("DS-DOIP-PATTERN")));
}

#[test]
fn strict_fails_when_violations_present() {
    let temp = TempDir::new().expect("tempdir");
    let input = sample_capture(&temp);
    let report = temp.path().join("report.json");

    cmd()
        .arg("pcap")
        .arg("analyze")
        .arg(input)
        .arg("-o")
        .arg(report)
        .arg("--strict")
        .assert()
        .failure()
        .stderr(contains("compliance violations detected"));
}

#[test]
fn replay_streams_json_lines_and_stats() {
    let temp = TempDir::new().expect("tempdir");
    let input = sample_capture(&temp);

    let assert = cmd()
        .args(["pcap", "replay"])
        .arg(input)
        .assert()
        .success()
        .stderr(contains("stats:").and(contains("\"frames_seen\":2")));
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).expect("utf8 stdout");
    let mut indices: Vec<u64> = stdout
        .lines()
        .map(|line| {
            let record: Value = serde_json::from_str(line).expect("json line");
            record["index"].as_u64().expect("index")
        })
        .collect();
    indices.sort_unstable();
    assert_eq!(indices, vec![1, 2]);
}

#[test]
fn invalid_config_file_is_reported() {
    let temp = TempDir::new().expect("tempdir");
    let input = sample_capture(&temp);
    let config = temp.path().join("config.json");
    fs::write(&config, "{ not json").expect("write config");

    cmd()
        .arg("--config")
        .arg(&config)
        .args(["pcap", "analyse"])
        .arg(input)
        .arg("--stdout")
        .assert()
        .code(2)
        .stderr(contains("invalid configuration").and(contains("hint:")));
}

#[test]
fn config_filter_applies_to_replay() {
    let temp = TempDir::new().expect("tempdir");
    let input = sample_capture(&temp);
    let config = temp.path().join("config.json");
    fs::write(&config, r#"{"filter": {"protocol": "UDS"}}"#).expect("write config");

    let assert = cmd()
        .arg("--config")
        .arg(&config)
        .args(["pcap", "replay"])
        .arg(input)
        .arg("--quiet")
        .assert()
        .success();
    let stdout = String::from_utf8(assert.get_output().stdout.clone()).expect("utf8 stdout");
    assert_eq!(stdout.lines().count(), 1);
}
