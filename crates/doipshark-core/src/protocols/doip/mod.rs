//! DoIP (ISO 13400-2) generic header codec and message builders.
//!
//! The parser validates the version/complement pattern, the maximum
//! payload size and the payload-type table (length constraint plus the one
//! legal transport) before any payload byte is interpreted. A rejected
//! header yields a [`NackCode`]; callers must not look at the payload then.
//!
//! Byte offsets live in `layout`, field access in `reader`, typed payloads
//! in `payload` and wire construction in `builder`.
//!
//! Version française (résumé):
//! Le module valide l'en-tête DoIP (version et complément, taille maximale,
//! table type/longueur/transport) puis décode les charges utiles typées.
//! Toute erreur d'en-tête produit un code NACK et la charge n'est pas lue.

pub mod builder;
pub mod error;
pub mod layout;
pub mod message;
pub mod parser;
pub mod payload;
pub mod reader;

pub use builder::*;
pub use error::{DoipError, NackCode};
pub use layout::{DEFAULT_PROTOCOL_VERSION, DOIP_PORT};
pub use message::{DoipHeader, DoipMessage, LengthRule, ParsedMessage, PayloadRule, PayloadType};
pub use parser::{parse_header, parse_header_limited, parse_message, parse_message_limited};
pub use payload::{
    DiagnosticAck, DiagnosticMessage, DoipPayload, EntityStatusResponse, PowerMode,
    RoutingActivationCode, RoutingActivationRequest, RoutingActivationResponse,
    VehicleAnnouncement, decode_payload, diagnostic_nack_reason, parse_vehicle_announcement,
};
