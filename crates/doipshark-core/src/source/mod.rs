//! Packet sources feeding the decoder.
//!
//! A source yields raw link-layer frames one at a time. File sources read
//! PCAP/PCAPNG through `pcap-parser`; with the `live` feature, a libpcap
//! handle captures from a network interface.

#[cfg(feature = "live")]
pub mod live;
mod pcap;

#[cfg(feature = "live")]
pub use live::{DeviceAddress, DeviceInfo, LiveCapture, list_devices};
pub use self::pcap::PcapFileSource;

use pcap_parser::Linktype;
use thiserror::Error;

use self::pcap::error::PcapSourceError;

/// One captured frame.
///
/// `data.len()` is the captured length; `orig_len` the on-wire length.
#[derive(Debug, Clone)]
pub struct PacketEvent {
    pub ts: Option<f64>,
    pub linktype: Linktype,
    pub data: Vec<u8>,
    pub orig_len: u32,
}

impl PacketEvent {
    pub fn captured_len(&self) -> usize {
        self.data.len()
    }
}

pub trait PacketSource {
    /// Next frame, `Ok(None)` at end of input.
    ///
    /// Live sources return `SourceError::Timeout` when the read timeout
    /// expired without a frame; callers retry.
    fn next_packet(&mut self) -> Result<Option<PacketEvent>, SourceError>;
}

impl<S: PacketSource + ?Sized> PacketSource for Box<S> {
    fn next_packet(&mut self) -> Result<Option<PacketEvent>, SourceError> {
        (**self).next_packet()
    }
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("PCAP parse error: {0}")]
    Pcap(String),
    #[error("capture read timed out")]
    Timeout,
    #[error("capture device not found: {0}")]
    DeviceNotFound(String),
    #[error("capture error: {0}")]
    Capture(String),
}

impl From<PcapSourceError> for SourceError {
    fn from(value: PcapSourceError) -> Self {
        match value {
            PcapSourceError::Io(err) => SourceError::Io(err),
            PcapSourceError::Pcap { stage, message } => {
                SourceError::Pcap(format!("{stage}: {message}"))
            }
        }
    }
}
