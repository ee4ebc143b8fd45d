//! Application protocols carried over TCP/UDP: DoIP framing and the UDS
//! service check on diagnostic payloads.
//!
//! Each protocol keeps byte offsets in `layout`, bounds-checked field access
//! in `reader` and decoding in `parser`; DoIP adds `builder` for outgoing
//! messages. Nothing here performs I/O.

pub(crate) mod common;
pub mod doip;
pub mod uds;
