//! Protocol module - Defines the Server List Ping wire protocol
//!
//! All frames are length-prefixed: a varint giving the combined size of
//! the packet-id varint and the payload, followed by the id and payload.
//! Numeric fields inside payloads are big-endian; lengths and ids are
//! unsigned LEB128 varints.

mod codec;
mod packet;
mod varint;

pub use codec::*;
pub use packet::*;
pub use varint::*;

use std::time::{SystemTime, UNIX_EPOCH};

/// Handshake protocol version (Minecraft 1.16.1). Override per session via
/// `SessionConfig::protocol_version`.
pub const PROTOCOL_VERSION: u64 = 736;

/// Default Minecraft server port
pub const DEFAULT_PORT: u16 = 25565;

/// Packet id shared by the handshake, status request and status response
pub const STATUS_PACKET_ID: u64 = 0;

/// Packet id shared by the ping request and the pong reply
pub const PING_PACKET_ID: u64 = 1;

/// Next-state field value selecting the status phase of the handshake
pub const NEXT_STATE_STATUS: u64 = 1;

/// Current time as milliseconds since the Unix epoch
pub fn epoch_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as i64
}
