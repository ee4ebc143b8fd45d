pub(crate) mod reader;

pub(crate) use reader::{format_mac, to_hex};
