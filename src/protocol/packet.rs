//! Packet framing
//!
//! Builds the outbound handshake/status/ping frames and extracts complete
//! inbound frames from an accumulating buffer. TCP delivers chunk
//! boundaries unrelated to frame boundaries, so extraction is two-phase:
//! peek the length varint, wait until the whole declared frame is
//! buffered, then parse it.

use bytes::{BufMut, Bytes, BytesMut};

use super::codec::CodecError;
use super::varint::{read_varint, varint_len, write_varint};
use super::{NEXT_STATE_STATUS, PING_PACKET_ID, STATUS_PACKET_ID};

/// Maximum accepted frame length (1 MB covers any status JSON plus favicon)
pub const MAX_PACKET_LEN: usize = 1024 * 1024;

/// One decoded wire frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    /// Packet id
    pub id: u64,
    /// Raw payload bytes, uninterpreted at this layer
    pub payload: Bytes,
}

/// Append one framed packet to `buf`: length varint, id varint, payload.
pub fn write_packet(id: u64, payload: &[u8], buf: &mut BytesMut) {
    write_varint((varint_len(id) + payload.len()) as u64, buf);
    write_varint(id, buf);
    buf.put_slice(payload);
}

/// Handshake packet followed immediately by the empty status request.
///
/// Handshake payload: protocol version varint, host length varint, host
/// bytes, port as big-endian u16, next-state varint selecting status.
pub fn handshake_sequence(host: &str, port: u16, protocol_version: u64) -> BytesMut {
    let mut payload = BytesMut::with_capacity(host.len() + 16);
    write_varint(protocol_version, &mut payload);
    write_varint(host.len() as u64, &mut payload);
    payload.put_slice(host.as_bytes());
    payload.put_u16(port);
    write_varint(NEXT_STATE_STATUS, &mut payload);

    let mut out = BytesMut::with_capacity(payload.len() + 8);
    write_packet(STATUS_PACKET_ID, &payload, &mut out);
    write_packet(STATUS_PACKET_ID, &[], &mut out);
    out
}

/// Ping packet carrying the timestamp as a signed 64-bit big-endian integer.
pub fn ping_packet(timestamp_ms: i64) -> BytesMut {
    let mut out = BytesMut::with_capacity(16);
    write_packet(PING_PACKET_ID, &timestamp_ms.to_be_bytes(), &mut out);
    out
}

/// Attempt to extract one complete packet from the front of `buf`.
///
/// Returns `Ok(None)` while the length varint or the declared frame is not
/// fully buffered. On success returns the packet and the total number of
/// bytes consumed (length varint plus frame) so the caller can advance.
pub fn try_extract(buf: &[u8]) -> Result<Option<(Packet, usize)>, CodecError> {
    let Some((length, len_size)) = read_varint(buf, 0) else {
        return Ok(None);
    };
    let length = length as usize;
    if length > MAX_PACKET_LEN {
        return Err(CodecError::PacketTooLarge(length, MAX_PACKET_LEN));
    }

    let total = len_size + length;
    if buf.len() < total {
        return Ok(None);
    }

    let frame = &buf[len_size..total];
    let Some((id, id_size)) = read_varint(frame, 0) else {
        return Err(CodecError::BadPacketId);
    };

    let packet = Packet {
        id,
        payload: Bytes::copy_from_slice(&frame[id_size..]),
    };
    Ok(Some((packet, total)))
}
