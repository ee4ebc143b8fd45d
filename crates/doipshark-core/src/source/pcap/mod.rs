//! Capture file replay.
//!
//! The format is chosen from the first four bytes: the PCAPNG section
//! header magic selects the block reader, anything else goes to the legacy
//! PCAP reader, which rejects unknown magics itself. Each packet record
//! becomes one [`PacketEvent`](crate::source::PacketEvent) with the link
//! type of its interface.

pub mod error;
pub mod layout;
pub mod parser;
pub mod reader;

pub use parser::PcapFileSource;
