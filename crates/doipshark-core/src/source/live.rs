//! Live capture through libpcap.

use std::net::{IpAddr, Ipv4Addr};

use log::{debug, info};
use pcap::{Active, Capture, Device};

use crate::config::CaptureConfig;
use crate::source::{PacketEvent, PacketSource, SourceError};

/// One address bound to a capture device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceAddress {
    pub ip: IpAddr,
    pub netmask: Option<IpAddr>,
}

/// Capture device as listed by the platform capture facility.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub name: String,
    pub description: Option<String>,
    pub addresses: Vec<DeviceAddress>,
}

impl From<Device> for DeviceInfo {
    fn from(device: Device) -> Self {
        Self {
            name: device.name,
            description: device.desc,
            addresses: device
                .addresses
                .into_iter()
                .map(|address| DeviceAddress {
                    ip: address.addr,
                    netmask: address.netmask,
                })
                .collect(),
        }
    }
}

pub fn list_devices() -> Result<Vec<DeviceInfo>, SourceError> {
    let devices = Device::list().map_err(capture_error)?;
    Ok(devices.into_iter().map(DeviceInfo::from).collect())
}

/// Activated capture handle on a named interface.
pub struct LiveCapture {
    capture: Capture<Active>,
    linktype: pcap_parser::Linktype,
}

impl LiveCapture {
    /// Open `config.device` with the configured snapshot length, promiscuous
    /// flag and read timeout, then install the capture filter.
    pub fn open(config: &CaptureConfig) -> Result<Self, SourceError> {
        let name = config
            .device
            .as_deref()
            .ok_or_else(|| SourceError::DeviceNotFound("no capture device configured".to_string()))?;
        let device = Device::list()
            .map_err(capture_error)?
            .into_iter()
            .find(|device| device.name == name)
            .ok_or_else(|| SourceError::DeviceNotFound(name.to_string()))?;

        let addresses = DeviceInfo::from(device.clone()).addresses;
        for address in &addresses {
            if let Some(netmask) = address.netmask {
                debug!("{name}: address {} netmask {netmask}", address.ip);
            }
        }
        let filter = resolve_filter(&config.filter, ipv4_netmask(&addresses));

        let timeout_ms = i32::try_from(config.read_timeout_ms).unwrap_or(i32::MAX);
        let mut capture = Capture::from_device(device)
            .map_err(capture_error)?
            .promisc(config.promisc)
            .snaplen(config.snaplen)
            .timeout(timeout_ms)
            .open()
            .map_err(capture_error)?;
        if !filter.is_empty() {
            capture
                .filter(&filter, true)
                .map_err(|err| SourceError::Capture(format!("filter '{filter}': {err}")))?;
        }

        let linktype = pcap_parser::Linktype(capture.get_datalink().0);
        info!(
            "live capture on {name} (snaplen {}, promisc {}, filter '{filter}')",
            config.snaplen, config.promisc
        );
        Ok(Self { capture, linktype })
    }
}

impl PacketSource for LiveCapture {
    fn next_packet(&mut self) -> Result<Option<PacketEvent>, SourceError> {
        match self.capture.next_packet() {
            Ok(packet) => {
                let header = packet.header;
                let ts = header.ts.tv_sec as f64 + header.ts.tv_usec as f64 * 1e-6;
                Ok(Some(PacketEvent {
                    ts: Some(ts),
                    linktype: self.linktype,
                    data: packet.data.to_vec(),
                    orig_len: header.len,
                }))
            }
            Err(pcap::Error::TimeoutExpired) => Err(SourceError::Timeout),
            Err(pcap::Error::NoMorePackets) => Ok(None),
            Err(err) => Err(capture_error(err)),
        }
    }
}

/// Netmask of the first IPv4 address bound to a device.
fn ipv4_netmask(addresses: &[DeviceAddress]) -> Option<Ipv4Addr> {
    addresses
        .iter()
        .find_map(|address| match (address.ip, address.netmask) {
            (IpAddr::V4(_), Some(IpAddr::V4(netmask))) => Some(netmask),
            _ => None,
        })
}

/// Resolve a capture filter against the interface netmask.
///
/// `Capture::filter` compiles with an unknown netmask, under which libpcap
/// refuses `ip broadcast`. That primitive is expanded here into the same
/// test on the destination host bits: all zeros or all ones.
fn resolve_filter(expression: &str, netmask: Option<Ipv4Addr>) -> String {
    let expression = expression.split_whitespace().collect::<Vec<_>>().join(" ");
    let Some(netmask) = netmask else {
        return expression;
    };
    let host = !u32::from(netmask);
    let broadcast =
        format!("(ip[16:4] & 0x{host:08x} = 0 or ip[16:4] & 0x{host:08x} = 0x{host:08x})");
    expression.replace("ip broadcast", &broadcast)
}

fn capture_error(err: pcap::Error) -> SourceError {
    SourceError::Capture(err.to_string())
}
