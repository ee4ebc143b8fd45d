use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use crossbeam_channel::{Receiver, RecvTimeoutError, unbounded};
use doipshark_core::capture::{CaptureDispatcher, CaptureStats, ChannelSink, RecordSink};
use doipshark_core::{
    AnalysisOptions, AppConfig, FilterRule, PacketRecord, PcapFileSource, ProtocolType,
};
use glob::glob;
use log::{LevelFilter, info};

mod net;

#[derive(Parser, Debug)]
#[command(name = "doipshark")]
#[command(version = long_version())]
#[command(
    about = "Capture analyzer and tester client for DoIP (ISO 13400-2) and UDS traffic.",
    long_about = None,
    after_help = "Examples:\n  doipshark pcap analyse capture.pcapng -o report.json\n  doipshark pcap replay capture.pcap --protocol uds\n  doipshark session diag 192.168.0.20 --data 1003"
)]
struct Cli {
    /// Suppress non-error output (log level `error`)
    #[arg(long, global = true)]
    quiet: bool,

    /// JSON configuration file; command-line flags override it
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Operations on PCAP/PCAPNG inputs.
    Pcap {
        #[command(subcommand)]
        command: PcapCommands,
    },
    /// Live capture on a network interface (requires the `live` feature).
    #[cfg(feature = "live")]
    Live {
        #[command(subcommand)]
        command: LiveCommands,
    },
    /// Tester-side DoIP exchanges with a vehicle entity.
    Session {
        #[command(subcommand)]
        command: SessionCommands,
    },
}

#[derive(Subcommand, Debug)]
enum PcapCommands {
    /// Analyse a capture file and generate a versioned JSON report.
    #[command(alias = "analyze")]
    #[command(
        after_help = "Examples:\n  doipshark pcap analyse capture.pcapng -o report.json\n  doipshark pcap analyze capture.pcap --stdout --pretty\n  doipshark pcap analyse capture.pcapng -o report.json --protocol uds --records"
    )]
    Analyse {
        /// Path to a .pcap or .pcapng file
        input: PathBuf,

        /// Output report path (JSON)
        #[arg(short = 'o', long, required_unless_present = "stdout")]
        report: Option<PathBuf>,

        /// Write JSON report to stdout
        #[arg(long, conflicts_with = "report")]
        stdout: bool,

        /// Pretty-print JSON output
        #[arg(long, conflicts_with = "compact")]
        pretty: bool,

        /// Compact JSON output (default)
        #[arg(long)]
        compact: bool,

        /// Exit with a non-zero code if compliance violations are present
        #[arg(long)]
        strict: bool,

        /// List compliance violations after analysis
        #[arg(long)]
        list_violations: bool,

        /// Embed every classified record in the report
        #[arg(long)]
        records: bool,

        /// Skip IP/TCP checksum and length checks
        #[arg(long)]
        no_validate: bool,

        #[command(flatten)]
        filter: FilterArgs,
    },
    /// Stream a capture file through the worker pool as JSON lines.
    Replay {
        /// Path to a .pcap or .pcapng file
        input: PathBuf,

        #[command(flatten)]
        pool: PoolArgs,

        #[command(flatten)]
        filter: FilterArgs,
    },
}

#[cfg(feature = "live")]
#[derive(Subcommand, Debug)]
enum LiveCommands {
    /// List capture devices and their addresses.
    Devices,
    /// Capture from an interface and stream records as JSON lines.
    Capture {
        /// Interface name (default: first device found)
        #[arg(short = 'i', long)]
        device: Option<String>,

        /// BPF expression applied by libpcap
        #[arg(long)]
        bpf: Option<String>,

        /// Stop after this many records
        #[arg(long)]
        count: Option<u64>,

        /// Stop after this many seconds
        #[arg(long)]
        seconds: Option<u64>,

        #[command(flatten)]
        pool: PoolArgs,

        #[command(flatten)]
        filter: FilterArgs,
    },
}

#[derive(Subcommand, Debug)]
enum SessionCommands {
    /// Broadcast a vehicle identification request over UDP.
    Identify {
        /// Destination address (default: limited broadcast)
        #[arg(default_value = "255.255.255.255")]
        target: String,

        /// Only entities with this EID answer (12 hex digits)
        #[arg(long, conflicts_with = "vin", value_parser = parse_eid)]
        eid: Option<[u8; 6]>,

        /// Only the vehicle with this VIN answers
        #[arg(long, value_parser = parse_vin)]
        vin: Option<[u8; 17]>,

        /// Wait this long for an announcement
        #[arg(long, default_value_t = 2000)]
        timeout_ms: u64,
    },
    /// Activate routing over TCP and send one diagnostic request.
    Diag {
        /// Entity address
        target: String,

        /// UDS request bytes in hex (e.g. `1003`)
        #[arg(long, value_parser = parse_hex_arg)]
        data: HexBytes,

        #[command(flatten)]
        addressing: AddressArgs,

        /// Wait this long for the diagnostic response
        #[arg(long, default_value_t = 2000)]
        timeout_ms: u64,
    },
}

/// Record filter flags, merged over the configuration file filter.
#[derive(Args, Debug, Default)]
struct FilterArgs {
    /// Keep only records of this protocol (tcp, udp, doip, uds, ...)
    #[arg(long)]
    protocol: Option<ProtocolType>,

    /// Source or destination IP
    #[arg(long, conflicts_with_all = ["src_ip", "dst_ip"])]
    ip: Option<String>,

    #[arg(long)]
    src_ip: Option<String>,

    #[arg(long)]
    dst_ip: Option<String>,

    #[arg(long)]
    src_mac: Option<String>,

    #[arg(long)]
    dst_mac: Option<String>,

    /// Source or destination port
    #[arg(long, conflicts_with_all = ["src_port", "dst_port"])]
    port: Option<u16>,

    #[arg(long)]
    src_port: Option<u16>,

    #[arg(long)]
    dst_port: Option<u16>,

    /// Minimum transport payload length in bytes
    #[arg(long)]
    min_len: Option<usize>,

    /// Maximum transport payload length in bytes
    #[arg(long)]
    max_len: Option<usize>,
}

impl FilterArgs {
    fn apply(&self, rule: &mut FilterRule) {
        fn set<T: Clone>(slot: &mut Option<T>, value: &Option<T>) {
            if value.is_some() {
                *slot = value.clone();
            }
        }
        set(&mut rule.protocol, &self.protocol);
        set(&mut rule.ip, &self.ip);
        set(&mut rule.src_ip, &self.src_ip);
        set(&mut rule.dst_ip, &self.dst_ip);
        set(&mut rule.src_mac, &self.src_mac);
        set(&mut rule.dst_mac, &self.dst_mac);
        set(&mut rule.port, &self.port);
        set(&mut rule.src_port, &self.src_port);
        set(&mut rule.dst_port, &self.dst_port);
        set(&mut rule.min_payload_length, &self.min_len);
        set(&mut rule.max_payload_length, &self.max_len);
    }
}

#[derive(Args, Debug, Default)]
struct PoolArgs {
    /// Maximum worker threads
    #[arg(long)]
    workers: Option<usize>,

    /// Worker queue capacity; frames beyond it are dropped
    #[arg(long)]
    queue: Option<usize>,
}

#[derive(Args, Debug, Default)]
struct AddressArgs {
    /// Tester logical address (e.g. 0x0e00)
    #[arg(long, value_parser = parse_u16)]
    source_address: Option<u16>,

    /// Entity logical address (e.g. 0x1001)
    #[arg(long, value_parser = parse_u16)]
    target_address: Option<u16>,

    /// Do not wait for a routing activation response
    #[arg(long)]
    no_activation: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.quiet);

    let result = run(cli);

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {}", err.message);
            if let Some(hint) = err.hint {
                eprintln!("hint: {}", hint);
            }
            ExitCode::from(2)
        }
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let config = load_app_config(cli.config.as_deref())?;
    let quiet = cli.quiet;

    match cli.command {
        Commands::Pcap { command } => match command {
            PcapCommands::Analyse {
                input,
                report,
                stdout,
                pretty,
                compact,
                strict,
                list_violations,
                records,
                no_validate,
                filter,
            } => {
                let output = OutputArgs {
                    report,
                    stdout,
                    pretty,
                    compact,
                    quiet,
                    strict,
                    list_violations,
                };
                let mut options = AnalysisOptions {
                    filter: config.filter,
                    max_doip_payload: config.capture.max_doip_payload,
                    validate_headers: !no_validate,
                    include_records: records,
                };
                filter.apply(&mut options.filter);
                cmd_pcap_analyse(input, output, &options)
            }
            PcapCommands::Replay {
                input,
                pool,
                filter,
            } => cmd_pcap_replay(input, config, &pool, &filter, quiet),
        },
        #[cfg(feature = "live")]
        Commands::Live { command } => match command {
            LiveCommands::Devices => cmd_live_devices(),
            LiveCommands::Capture {
                device,
                bpf,
                count,
                seconds,
                pool,
                filter,
            } => {
                let mut config = config;
                if device.is_some() {
                    config.capture.device = device;
                }
                if let Some(bpf) = bpf {
                    config.capture.filter = bpf;
                }
                let limits = StreamLimits {
                    count,
                    deadline: seconds.map(|s| Instant::now() + Duration::from_secs(s)),
                };
                cmd_live_capture(config, &pool, &filter, limits, quiet)
            }
        },
        Commands::Session { command } => match command {
            SessionCommands::Identify {
                target,
                eid,
                vin,
                timeout_ms,
            } => net::identify(
                &target,
                config.session,
                eid,
                vin,
                Duration::from_millis(timeout_ms),
            )
            .map_err(Into::into),
            SessionCommands::Diag {
                target,
                data,
                addressing,
                timeout_ms,
            } => {
                let mut session = config.session;
                if let Some(address) = addressing.source_address {
                    session.source_address = address;
                }
                if let Some(address) = addressing.target_address {
                    session.target_address = address;
                }
                if addressing.no_activation {
                    session.activation_required = false;
                }
                net::diagnostic(&target, session, &data.0, Duration::from_millis(timeout_ms))
                    .map_err(Into::into)
            }
        },
    }
}

fn init_logging(quiet: bool) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if quiet {
        builder.filter_level(LevelFilter::Error);
    }
    builder.format_timestamp_millis().init();
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (",
        env!("DOIPSHARK_BUILD_COMMIT"),
        " ",
        env!("DOIPSHARK_BUILD_DATE"),
        ")"
    )
}

#[derive(Debug)]
struct CliError {
    message: String,
    hint: Option<String>,
}

impl CliError {
    fn new(message: impl Into<String>, hint: Option<String>) -> Self {
        Self {
            message: message.into(),
            hint,
        }
    }
}

impl std::fmt::Display for CliError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for CliError {}

impl From<anyhow::Error> for CliError {
    fn from(err: anyhow::Error) -> Self {
        CliError::new(format!("{err:#}"), None)
    }
}

fn load_app_config(path: Option<&Path>) -> Result<AppConfig, CliError> {
    let Some(path) = path else {
        return Ok(AppConfig::default());
    };
    doipshark_core::load_config(path).map_err(|err| {
        CliError::new(
            format!("invalid configuration {}: {err}", path.display()),
            Some("expected a JSON object with capture/pool/filter/session sections".to_string()),
        )
    })
}

struct OutputArgs {
    report: Option<PathBuf>,
    stdout: bool,
    pretty: bool,
    compact: bool,
    quiet: bool,
    strict: bool,
    list_violations: bool,
}

fn cmd_pcap_analyse(
    input: PathBuf,
    output: OutputArgs,
    options: &AnalysisOptions,
) -> Result<(), CliError> {
    let resolved_input = resolve_input_path(&input)?;
    validate_input_file(&resolved_input)?;
    let input_abs = fs::canonicalize(&resolved_input)
        .with_context(|| format!("Failed to resolve input path: {}", resolved_input.display()))?;
    let report = if output.stdout {
        None
    } else {
        Some(output.report.clone().ok_or_else(|| {
            CliError::new(
                "missing output path",
                Some("use -o/--report or --stdout".to_string()),
            )
        })?)
    };

    if let Some(report_path) = report.as_ref() {
        ensure_distinct_output(report_path, &input_abs)?;
    }

    let meta = fs::metadata(&resolved_input)
        .with_context(|| format!("Failed to read input file: {}", resolved_input.display()))?;
    if !meta.is_file() {
        return Err(CliError::new(
            format!("input is not a file: {}", input.display()),
            Some("use a .pcap or .pcapng file".to_string()),
        ));
    }

    let rep = doipshark_core::analyze_pcap_file(&resolved_input, options)
        .context("PCAP/PCAPNG analysis failed")?;
    let json = serialize_report(&rep, output.pretty, output.compact)?;

    match report {
        None => print!("{}", json),
        Some(report) => {
            if let Some(parent) = report.parent() {
                if !parent.as_os_str().is_empty() {
                    fs::create_dir_all(parent).with_context(|| {
                        format!("Failed to create output directory: {}", parent.display())
                    })?;
                }
            }
            fs::write(&report, json)
                .with_context(|| format!("Failed to write report: {}", report.display()))?;
            if !output.quiet {
                eprintln!("OK: report written -> {}", report.display());
            }
        }
    }

    if output.list_violations && !output.quiet {
        print_violations(&rep);
    }
    if output.strict && has_violations(&rep) {
        return Err(CliError::new(
            "compliance violations detected",
            Some("use --list-violations to inspect".to_string()),
        ));
    }
    Ok(())
}

fn ensure_distinct_output(report_path: &Path, input_abs: &Path) -> Result<(), CliError> {
    let report_dir = report_path
        .parent()
        .map(|parent| {
            if parent.as_os_str().is_empty() {
                fs::canonicalize(".")
            } else {
                fs::canonicalize(parent)
            }
        })
        .transpose();
    // A parent that does not exist yet cannot contain the input.
    let Ok(Some(report_dir)) = report_dir else {
        return Ok(());
    };
    let file_name = report_path
        .file_name()
        .ok_or_else(|| anyhow::anyhow!("Invalid report path: {}", report_path.display()))?;
    if report_dir.join(file_name) == input_abs {
        return Err(CliError::new(
            format!(
                "report path must differ from input: {}",
                report_path.display()
            ),
            Some("choose a different output path".to_string()),
        ));
    }
    Ok(())
}

fn serialize_report(
    rep: &doipshark_core::Report,
    pretty: bool,
    compact: bool,
) -> Result<String, CliError> {
    if pretty && compact {
        return Err(CliError::new(
            "cannot use --pretty and --compact together",
            Some("choose one output format".to_string()),
        ));
    }
    if pretty {
        serde_json::to_string_pretty(rep)
            .context("JSON serialization failed")
            .map_err(Into::into)
    } else {
        serde_json::to_string(rep)
            .context("JSON serialization failed")
            .map_err(Into::into)
    }
}

fn has_violations(rep: &doipshark_core::Report) -> bool {
    rep.compliance
        .iter()
        .any(|entry| !entry.violations.is_empty())
}

fn print_violations(rep: &doipshark_core::Report) {
    eprintln!("Compliance violations:");
    for entry in &rep.compliance {
        for violation in &entry.violations {
            eprintln!(
                "  {} {} {} ({})",
                entry.protocol, violation.severity, violation.id, violation.count
            );
        }
    }
}

fn cmd_pcap_replay(
    input: PathBuf,
    config: AppConfig,
    pool: &PoolArgs,
    filter: &FilterArgs,
    quiet: bool,
) -> Result<(), CliError> {
    let resolved_input = resolve_input_path(&input)?;
    validate_input_file(&resolved_input)?;
    let source = PcapFileSource::open(&resolved_input)
        .with_context(|| format!("Failed to open capture: {}", resolved_input.display()))?;

    let (dispatcher, records) = build_dispatcher(config, pool, filter)?;
    dispatcher
        .start(source)
        .context("Failed to start capture dispatcher")?;
    info!("replaying {}", resolved_input.display());

    let limits = StreamLimits::default();
    stream_records(&dispatcher, &records, &limits)?;
    finish_stream(&dispatcher, quiet)
}

#[cfg(feature = "live")]
fn cmd_live_devices() -> Result<(), CliError> {
    let devices = doipshark_core::source::list_devices().map_err(|err| {
        CliError::new(
            format!("failed to list capture devices: {err}"),
            Some("live capture usually needs root or CAP_NET_RAW".to_string()),
        )
    })?;
    let listing: Vec<serde_json::Value> = devices
        .iter()
        .map(|device| {
            let addresses: Vec<serde_json::Value> = device
                .addresses
                .iter()
                .map(|address| {
                    serde_json::json!({
                        "ip": address.ip.to_string(),
                        "netmask": address.netmask.map(|mask| mask.to_string()),
                    })
                })
                .collect();
            serde_json::json!({
                "name": device.name,
                "description": device.description,
                "addresses": addresses,
            })
        })
        .collect();
    let json = serde_json::to_string_pretty(&listing).context("JSON serialization failed")?;
    println!("{json}");
    Ok(())
}

#[cfg(feature = "live")]
fn cmd_live_capture(
    config: AppConfig,
    pool: &PoolArgs,
    filter: &FilterArgs,
    limits: StreamLimits,
    quiet: bool,
) -> Result<(), CliError> {
    let (dispatcher, records) = build_dispatcher(config, pool, filter)?;
    dispatcher.start_live().map_err(|err| {
        CliError::new(
            format!("failed to start live capture: {err}"),
            Some("check the device name with `doipshark live devices`".to_string()),
        )
    })?;
    stream_records(&dispatcher, &records, &limits)?;
    dispatcher.request_stop();
    finish_stream(&dispatcher, quiet)
}

fn build_dispatcher(
    config: AppConfig,
    pool: &PoolArgs,
    filter: &FilterArgs,
) -> Result<(CaptureDispatcher, Receiver<PacketRecord>), CliError> {
    let AppConfig {
        capture,
        pool: mut pool_config,
        filter: mut rule,
        ..
    } = config;
    if let Some(workers) = pool.workers {
        pool_config.max_workers = workers;
        pool_config.min_workers = pool_config.min_workers.min(workers);
    }
    if let Some(queue) = pool.queue {
        pool_config.queue_capacity = queue;
    }
    filter.apply(&mut rule);
    rule.validate().map_err(|err| {
        CliError::new(
            format!("invalid filter: {err}"),
            Some("--ip/--port cannot be combined with their directional forms".to_string()),
        )
    })?;

    let (tx, rx) = unbounded();
    let sink: Arc<dyn RecordSink> = Arc::new(ChannelSink::new(tx));
    Ok((
        CaptureDispatcher::new(capture, pool_config, rule, sink),
        rx,
    ))
}

#[derive(Debug, Default)]
struct StreamLimits {
    count: Option<u64>,
    deadline: Option<Instant>,
}

impl StreamLimits {
    fn reached(&self, written: u64) -> bool {
        self.count.is_some_and(|count| written >= count)
            || self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
    }
}

/// Print records as JSON lines until the capture ends or a limit is hit.
fn stream_records(
    dispatcher: &CaptureDispatcher,
    records: &Receiver<PacketRecord>,
    limits: &StreamLimits,
) -> Result<u64, CliError> {
    let stdout = io::stdout();
    let mut out = BufWriter::new(stdout.lock());
    let mut written = 0u64;

    while !limits.reached(written) {
        match records.recv_timeout(Duration::from_millis(100)) {
            Ok(record) => {
                write_record(&mut out, &record)?;
                written += 1;
            }
            Err(RecvTimeoutError::Timeout) => {
                if !dispatcher.is_running() {
                    break;
                }
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    if limits.count.is_none() {
        for record in records.try_iter() {
            write_record(&mut out, &record)?;
            written += 1;
        }
    }
    out.flush().context("Failed to flush stdout")?;
    Ok(written)
}

fn write_record(out: &mut impl Write, record: &PacketRecord) -> Result<(), CliError> {
    let line = serde_json::to_string(record).context("JSON serialization failed")?;
    writeln!(out, "{line}").context("Failed to write record")?;
    Ok(())
}

fn finish_stream(dispatcher: &CaptureDispatcher, quiet: bool) -> Result<(), CliError> {
    dispatcher.join().map_err(|err| {
        CliError::new(
            format!("capture failed: {err}"),
            Some("records delivered before the failure were written".to_string()),
        )
    })?;
    if !quiet {
        print_stats(&dispatcher.stats());
    }
    Ok(())
}

fn print_stats(stats: &CaptureStats) {
    match serde_json::to_string(stats) {
        Ok(json) => eprintln!("stats: {json}"),
        Err(err) => log::warn!("failed to serialize capture stats: {err}"),
    }
}

fn validate_input_file(input: &Path) -> Result<(), CliError> {
    if !input.exists() {
        return Err(CliError::new(
            format!("input file not found: {}", input.display()),
            Some("use a .pcap or .pcapng file".to_string()),
        ));
    }
    let ext = input
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();
    if ext != "pcap" && ext != "pcapng" {
        return Err(CliError::new(
            format!("unsupported input format '{}'", input.display()),
            Some("expected a .pcap or .pcapng file".to_string()),
        ));
    }
    Ok(())
}

fn resolve_input_path(input: &Path) -> Result<PathBuf, CliError> {
    let pattern = input.to_string_lossy();
    if !is_glob_pattern(&pattern) {
        return Ok(input.to_path_buf());
    }

    let mut matches = Vec::new();
    let paths = glob(&pattern).map_err(|err| {
        CliError::new(
            format!("invalid input pattern '{}'", pattern),
            Some(format!("pattern error: {}", err.msg)),
        )
    })?;
    for entry in paths {
        let path = entry.map_err(|err| {
            CliError::new(
                format!("invalid input pattern '{}'", pattern),
                Some(format!("pattern error: {}", err)),
            )
        })?;
        if path.is_file() {
            matches.push(path);
        }
    }

    if matches.is_empty() {
        return Err(CliError::new(
            format!("no files match pattern '{}'", pattern),
            Some("check the path or quote the pattern; expected .pcap or .pcapng".to_string()),
        ));
    }
    if matches.len() > 1 {
        let listed = matches
            .iter()
            .take(3)
            .map(|p| p.display().to_string())
            .collect::<Vec<_>>()
            .join(", ");
        let more = if matches.len() > 3 { ", ..." } else { "" };
        return Err(CliError::new(
            format!(
                "multiple files match pattern '{}' ({} matches); matches: {listed}{more}",
                pattern,
                matches.len()
            ),
            Some("pass a single capture file, or run once per file".to_string()),
        ));
    }

    Ok(matches.remove(0))
}

fn is_glob_pattern(input: &str) -> bool {
    input.contains('*') || input.contains('?') || input.contains('[')
}

/// Raw bytes given on the command line in hex.
#[derive(Debug, Clone)]
struct HexBytes(Vec<u8>);

fn parse_hex_arg(value: &str) -> Result<HexBytes, String> {
    parse_hex(value).map(HexBytes)
}

fn parse_hex(value: &str) -> Result<Vec<u8>, String> {
    let digits: String = value
        .chars()
        .filter(|c| !c.is_ascii_whitespace() && *c != ':')
        .collect();
    if digits.is_empty() || digits.len() % 2 != 0 {
        return Err(format!("'{value}' is not an even number of hex digits"));
    }
    (0..digits.len())
        .step_by(2)
        .map(|i| {
            u8::from_str_radix(&digits[i..i + 2], 16)
                .map_err(|_| format!("'{value}' contains non-hex characters"))
        })
        .collect()
}

fn parse_u16(value: &str) -> Result<u16, String> {
    let parsed = match value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
    {
        Some(hex) => u16::from_str_radix(hex, 16),
        None => value.parse(),
    };
    parsed.map_err(|_| format!("'{value}' is not a 16-bit address"))
}

fn parse_eid(value: &str) -> Result<[u8; 6], String> {
    let bytes = parse_hex(value)?;
    bytes
        .try_into()
        .map_err(|_| format!("EID '{value}' must be exactly 6 bytes"))
}

fn parse_vin(value: &str) -> Result<[u8; 17], String> {
    if !value.is_ascii() {
        return Err(format!("VIN '{value}' must be ASCII"));
    }
    value
        .as_bytes()
        .try_into()
        .map_err(|_| format!("VIN '{value}' must be exactly 17 characters"))
}
