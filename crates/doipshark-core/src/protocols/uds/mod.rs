//! UDS (ISO 14229) service identification inside DoIP diagnostic messages.
//!
//! Classification only: a payload whose first byte after the addressing
//! prefix is not a known SID stays DoIP.

pub mod layout;
pub mod parser;

pub use parser::{
    is_diagnostic_service_data, is_known_service, is_positive_response, request_sid, service_id,
    service_name,
};
