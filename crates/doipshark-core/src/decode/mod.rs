//! Layered Ethernet/IP/TCP/UDP header decoding.
//!
//! `decode` walks the layers outer-to-inner and stops at the first failure,
//! recording it as an [`ErrorCode`] on the returned record. The checks in
//! [`validate`] are separate and never run implicitly.

pub mod error;
pub mod layout;
pub mod parser;
pub mod reader;
pub mod validate;

pub use error::{ErrorCode, ReadError};
pub use parser::{DecodedFrame, decode, decode_frame};
pub use reader::FrameReader;
pub use validate::{HeaderCheck, check_frame, check_ip_header, check_tcp_header};
