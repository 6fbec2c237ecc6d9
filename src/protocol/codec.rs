//! Stream decoder for inbound status traffic
//!
//! Accumulates raw transport chunks, extracts complete frames and
//! interprets them: id 0 is the status response (varint-prefixed UTF-8
//! JSON), id 1 is the pong echoing our ping timestamp. Anything else is
//! consumed and dropped.

use bytes::{Buf, BytesMut};
use thiserror::Error;

use super::epoch_millis;
use super::packet::try_extract;
use super::{PING_PACKET_ID, STATUS_PACKET_ID};

/// Codec errors
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("packet id varint is malformed")]
    BadPacketId,

    #[error("packet too large: {0} bytes (max: {1})")]
    PacketTooLarge(usize, usize),

    #[error("status payload shorter than its declared JSON length")]
    TruncatedStatus,

    #[error("pong payload is not a full 8-byte timestamp")]
    TruncatedPong,

    #[error("status JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// A semantically interpreted inbound packet
#[derive(Debug, Clone, PartialEq)]
pub enum StatusEvent {
    /// Status response: the server metadata document, passed through as-is
    Status(serde_json::Value),
    /// Pong: round-trip latency computed from the echoed timestamp
    Pong { latency_ms: i64 },
}

/// Buffering decoder owning the accumulation buffer for one session.
///
/// Bytes are removed from the front only after a complete frame has been
/// extracted, so feeding the same stream in different chunkings yields the
/// same event sequence.
pub struct StreamDecoder {
    buf: BytesMut,
}

impl StreamDecoder {
    pub fn new() -> Self {
        Self {
            buf: BytesMut::with_capacity(4096),
        }
    }

    /// Append a transport chunk and drain every complete frame from the
    /// buffer, returning interpreted packets in arrival order.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<Vec<StatusEvent>, CodecError> {
        self.buf.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some((packet, consumed)) = try_extract(&self.buf)? {
            let event = match packet.id {
                STATUS_PACKET_ID => Some(decode_status(&packet.payload)?),
                PING_PACKET_ID => Some(decode_pong(&packet.payload)?),
                id => {
                    tracing::debug!(id, "ignoring packet with unknown id");
                    None
                }
            };
            self.buf.advance(consumed);
            events.extend(event);
        }
        Ok(events)
    }

    /// Bytes currently buffered without forming a complete frame
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }
}

impl Default for StreamDecoder {
    fn default() -> Self {
        Self::new()
    }
}

fn decode_status(payload: &[u8]) -> Result<StatusEvent, CodecError> {
    let (json_len, len_size) =
        super::read_varint(payload, 0).ok_or(CodecError::TruncatedStatus)?;
    // Compare in u64: a hostile declared length must not overflow the
    // usize bounds math.
    if json_len > (payload.len() - len_size) as u64 {
        return Err(CodecError::TruncatedStatus);
    }
    let end = len_size + json_len as usize;

    let metadata = serde_json::from_slice(&payload[len_size..end])?;
    Ok(StatusEvent::Status(metadata))
}

fn decode_pong(payload: &[u8]) -> Result<StatusEvent, CodecError> {
    let bytes: [u8; 8] = payload
        .get(..8)
        .and_then(|b| b.try_into().ok())
        .ok_or(CodecError::TruncatedPong)?;
    let timestamp = i64::from_be_bytes(bytes);

    Ok(StatusEvent::Pong {
        latency_ms: (epoch_millis() - timestamp).max(0),
    })
}

#[cfg(test)]
mod tests {
    use super::super::packet::write_packet;
    use super::super::write_varint;
    use super::*;
    use serde_json::json;

    fn status_packet(json: &serde_json::Value) -> BytesMut {
        let text = json.to_string();
        let mut payload = BytesMut::new();
        write_varint(text.len() as u64, &mut payload);
        payload.extend_from_slice(text.as_bytes());

        let mut out = BytesMut::new();
        write_packet(STATUS_PACKET_ID, &payload, &mut out);
        out
    }

    fn pong_packet(timestamp: i64) -> BytesMut {
        let mut out = BytesMut::new();
        write_packet(PING_PACKET_ID, &timestamp.to_be_bytes(), &mut out);
        out
    }

    #[test]
    fn test_status_then_pong() {
        let metadata = json!({"version": {"protocol": 736}, "players": {"online": 3}});
        let mut stream = status_packet(&metadata);
        stream.extend_from_slice(&pong_packet(epoch_millis()));

        let mut decoder = StreamDecoder::new();
        let events = decoder.feed(&stream).unwrap();

        assert_eq!(events.len(), 2);
        assert_eq!(events[0], StatusEvent::Status(metadata));
        match events[1] {
            StatusEvent::Pong { latency_ms } => assert!(latency_ms >= 0),
            ref other => panic!("expected pong, got {other:?}"),
        }
    }

    #[test]
    fn test_chunk_independence() {
        let metadata = json!({"description": "A Minecraft Server"});
        let mut stream = status_packet(&metadata);
        stream.extend_from_slice(&pong_packet(epoch_millis()));

        let mut whole = StreamDecoder::new();
        let whole_events = whole.feed(&stream).unwrap();

        let mut split = StreamDecoder::new();
        let mut split_events = Vec::new();
        for byte in stream.iter() {
            split_events.extend(split.feed(&[*byte]).unwrap());
        }

        assert_eq!(whole_events.len(), split_events.len());
        assert_eq!(whole_events[0], split_events[0]);
        assert!(matches!(split_events[1], StatusEvent::Pong { .. }));
    }

    #[test]
    fn test_buffer_drains_to_trailing_bytes() {
        let mut stream = status_packet(&json!({}));
        stream.extend_from_slice(&pong_packet(0));
        stream.extend_from_slice(&[0xaa, 0xbb, 0xcc]);

        let mut decoder = StreamDecoder::new();
        let events = decoder.feed(&stream).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(decoder.buffered(), 3);
    }

    #[test]
    fn test_unknown_id_consumed_silently() {
        let mut stream = BytesMut::new();
        write_packet(7, &[1, 2, 3], &mut stream);
        stream.extend_from_slice(&status_packet(&json!({"ok": true})));

        let mut decoder = StreamDecoder::new();
        let events = decoder.feed(&stream).unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0], StatusEvent::Status(json!({"ok": true})));
        assert_eq!(decoder.buffered(), 0);
    }

    #[test]
    fn test_malformed_json_is_an_error() {
        let mut payload = BytesMut::new();
        write_varint(4, &mut payload);
        payload.extend_from_slice(b"{oops");
        let mut stream = BytesMut::new();
        write_packet(STATUS_PACKET_ID, &payload, &mut stream);

        let mut decoder = StreamDecoder::new();
        assert!(matches!(decoder.feed(&stream), Err(CodecError::Json(_))));
    }

    #[test]
    fn test_json_length_overrunning_payload() {
        let mut payload = BytesMut::new();
        write_varint(100, &mut payload);
        payload.extend_from_slice(b"{}");
        let mut stream = BytesMut::new();
        write_packet(STATUS_PACKET_ID, &payload, &mut stream);

        let mut decoder = StreamDecoder::new();
        assert!(matches!(
            decoder.feed(&stream),
            Err(CodecError::TruncatedStatus)
        ));
    }

    #[test]
    fn test_huge_declared_json_length() {
        // A declared length near u64::MAX fits in a small frame but must
        // fail cleanly instead of wrapping the bounds check.
        let mut payload = BytesMut::new();
        write_varint(u64::MAX, &mut payload);
        payload.extend_from_slice(b"{}");
        let mut stream = BytesMut::new();
        write_packet(STATUS_PACKET_ID, &payload, &mut stream);

        let mut decoder = StreamDecoder::new();
        assert!(matches!(
            decoder.feed(&stream),
            Err(CodecError::TruncatedStatus)
        ));
    }

    #[test]
    fn test_short_pong_payload() {
        let mut stream = BytesMut::new();
        write_packet(PING_PACKET_ID, &[0, 1, 2], &mut stream);

        let mut decoder = StreamDecoder::new();
        assert!(matches!(
            decoder.feed(&stream),
            Err(CodecError::TruncatedPong)
        ));
    }

    #[test]
    fn test_future_timestamp_clamps_to_zero() {
        let stream = pong_packet(epoch_millis() + 60_000);
        let mut decoder = StreamDecoder::new();
        let events = decoder.feed(&stream).unwrap();
        assert_eq!(events, vec![StatusEvent::Pong { latency_ms: 0 }]);
    }
}
