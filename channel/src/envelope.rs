//! The envelope format Channel packs every message into:
//! `MSGTYPE(u16 BE) || SEQ(u16 BE) || LEN(u16 BE) || body`.

use crate::error::{ChannelError, Result};

const HEADER_LEN: usize = 6;

/// Message types at or above this value are reserved for Channel's own
/// control messages (§4.6); application types must stay below it unless
/// explicitly registered as a system handler.
pub const SYSTEM_MSGTYPE_FLOOR: u16 = 0xFF00;

#[derive(Debug, Clone)]
pub struct Envelope {
    pub msgtype: u16,
    pub seq: u16,
    pub body: Vec<u8>,
}

impl Envelope {
    pub fn pack(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(HEADER_LEN + self.body.len());
        out.extend_from_slice(&self.msgtype.to_be_bytes());
        out.extend_from_slice(&self.seq.to_be_bytes());
        out.extend_from_slice(&(self.body.len() as u16).to_be_bytes());
        out.extend_from_slice(&self.body);
        out
    }

    pub fn unpack(raw: &[u8]) -> Result<Self> {
        if raw.len() < HEADER_LEN {
            return Err(ChannelError::EnvelopeTooShort);
        }
        let msgtype = u16::from_be_bytes([raw[0], raw[1]]);
        let seq = u16::from_be_bytes([raw[2], raw[3]]);
        let len = u16::from_be_bytes([raw[4], raw[5]]) as usize;
        if raw.len() < HEADER_LEN + len {
            return Err(ChannelError::EnvelopeTooShort);
        }
        Ok(Envelope { msgtype, seq, body: raw[HEADER_LEN..HEADER_LEN + len].to_vec() })
    }
}
