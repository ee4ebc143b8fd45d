use std::fmt::Display;

use thiserror::Error;

/// Errors raised while reading a capture file.
#[derive(Debug, Error)]
pub enum PcapSourceError {
    /// Open, read or rewind failure, including files shorter than a magic.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// `stage` names the reader step that failed (`pcapng reader init`, ...).
    #[error("PCAP parse error ({stage}): {message}")]
    Pcap {
        stage: &'static str,
        message: String,
    },
}

impl PcapSourceError {
    pub(crate) fn pcap(stage: &'static str, err: impl Display) -> Self {
        PcapSourceError::Pcap {
            stage,
            message: err.to_string(),
        }
    }
}
