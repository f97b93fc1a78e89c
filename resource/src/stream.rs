//! The system Channel message that carries one chunk of a byte stream
//! (§4.7, §6). `StreamDataMessage` rides inside a regular `Channel`
//! envelope, so it inherits Channel's ordering and dedup for free; only the
//! EOF/stream-id framing and the MAX_DATA_LEN budget are specific to it.

use channel::{ChannelMessage, SYSTEM_MSGTYPE_FLOOR};

use crate::error::{Result, ResourceError};

/// Stream ids are peer-scoped 15-bit integers (§3): 0..=32767.
pub const MAX_STREAM_ID: u16 = 0x7FFF;

const EOF_BIT: u16 = 0x8000;
const HEADER_LEN: usize = 2;
/// Fixed overhead a Channel envelope charges on top of any message body
/// (§4.6's `MSGTYPE(2) || SEQUENCE(2) || LENGTH(2)`).
const CHANNEL_ENVELOPE_OVERHEAD: usize = 6;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamDataMessage {
    pub stream_id: u16,
    pub eof: bool,
    pub data: Vec<u8>,
}

impl StreamDataMessage {
    pub fn new(stream_id: u16, eof: bool, data: Vec<u8>) -> Result<Self> {
        if stream_id > MAX_STREAM_ID {
            return Err(ResourceError::InvalidStreamId(stream_id));
        }
        Ok(StreamDataMessage { stream_id, eof, data })
    }

    /// MAX_DATA_LEN for a given Link MDU: the budget left for the raw
    /// stream payload after the stream header and the Channel envelope
    /// header have both been charged against it (§4.7).
    pub fn max_data_len(link_mdu: usize) -> usize {
        link_mdu.saturating_sub(HEADER_LEN + CHANNEL_ENVELOPE_OVERHEAD)
    }
}

impl ChannelMessage for StreamDataMessage {
    // Falls inside the system-reserved range (§4.6); registered with
    // `register_system_handler`, not `register_handler`.
    const MSGTYPE: u16 = SYSTEM_MSGTYPE_FLOOR;

    fn pack(&self) -> Vec<u8> {
        let header = (self.eof as u16) << 15 | self.stream_id;
        let mut out = Vec::with_capacity(HEADER_LEN + self.data.len());
        out.extend_from_slice(&header.to_be_bytes());
        out.extend_from_slice(&self.data);
        out
    }

    fn unpack(bytes: &[u8]) -> Option<Self> {
        if bytes.len() < HEADER_LEN {
            return None;
        }
        let header = u16::from_be_bytes([bytes[0], bytes[1]]);
        let eof = header & EOF_BIT != 0;
        let stream_id = header & MAX_STREAM_ID;
        Some(StreamDataMessage { stream_id, eof, data: bytes[HEADER_LEN..].to_vec() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_with_eof_and_stream_id() {
        let msg = StreamDataMessage::new(12345, true, b"chunk".to_vec()).unwrap();
        let packed = msg.pack();
        let unpacked = StreamDataMessage::unpack(&packed).unwrap();
        assert_eq!(unpacked, msg);
    }

    #[test]
    fn eof_bit_does_not_leak_into_stream_id() {
        let msg = StreamDataMessage::new(MAX_STREAM_ID, true, vec![]).unwrap();
        let packed = msg.pack();
        let unpacked = StreamDataMessage::unpack(&packed).unwrap();
        assert_eq!(unpacked.stream_id, MAX_STREAM_ID);
        assert!(unpacked.eof);
    }

    #[test]
    fn stream_id_above_15_bits_is_rejected() {
        assert!(matches!(
            StreamDataMessage::new(MAX_STREAM_ID + 1, false, vec![]),
            Err(ResourceError::InvalidStreamId(_))
        ));
    }

    #[test]
    fn max_data_len_charges_both_headers() {
        assert_eq!(StreamDataMessage::max_data_len(500), 500 - 2 - 6);
    }

    #[test]
    fn truncated_message_fails_to_unpack() {
        assert!(StreamDataMessage::unpack(&[0u8]).is_none());
    }
}
