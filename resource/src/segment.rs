//! Wire formats for the three Resource packet kinds (§4.7, §6). These ride
//! directly over a Link's Token-encrypted DATA packets via
//! `Context::ResourceAdvertise`/`ResourceSegment`/`ResourceProof`, never
//! through Channel — Resource is for bulk transfers too large to shuttle
//! through Channel's one-envelope-at-a-time discipline.

use common_types::Hash16;

use crate::error::{Result, ResourceError};

const RESOURCE_ID_LEN: usize = Hash16::LEN;
const SEGMENT_HASH_LEN: usize = Hash16::LEN;

/// Fixed overhead a `Segment` packet charges on top of its raw chunk: the
/// resource id, the segment index, and the per-segment hash.
pub const SEGMENT_HEADER_LEN: usize = RESOURCE_ID_LEN + 4 + SEGMENT_HASH_LEN;

/// `resource_id(16) || total_len(u32 BE) || segment_size(u32 BE) ||
/// segment_count(u32 BE) || sha256(32)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Advertise {
    pub resource_id: Hash16,
    pub total_len: u32,
    pub segment_size: u32,
    pub segment_count: u32,
    pub full_hash: [u8; 32],
}

impl Advertise {
    pub fn pack(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(RESOURCE_ID_LEN + 12 + 32);
        out.extend_from_slice(self.resource_id.as_bytes());
        out.extend_from_slice(&self.total_len.to_be_bytes());
        out.extend_from_slice(&self.segment_size.to_be_bytes());
        out.extend_from_slice(&self.segment_count.to_be_bytes());
        out.extend_from_slice(&self.full_hash);
        out
    }

    pub fn unpack(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != RESOURCE_ID_LEN + 12 + 32 {
            return Err(ResourceError::MalformedAdvertise);
        }
        let resource_id = Hash16::from_slice(&bytes[..RESOURCE_ID_LEN]).expect("length checked above");
        let mut offset = RESOURCE_ID_LEN;
        let total_len = u32::from_be_bytes(bytes[offset..offset + 4].try_into().unwrap());
        offset += 4;
        let segment_size = u32::from_be_bytes(bytes[offset..offset + 4].try_into().unwrap());
        offset += 4;
        let segment_count = u32::from_be_bytes(bytes[offset..offset + 4].try_into().unwrap());
        offset += 4;
        let mut full_hash = [0u8; 32];
        full_hash.copy_from_slice(&bytes[offset..offset + 32]);
        Ok(Advertise { resource_id, total_len, segment_size, segment_count, full_hash })
    }
}

/// `resource_id(16) || segment_index(u32 BE) || segment_hash(16) || data`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub resource_id: Hash16,
    pub index: u32,
    pub segment_hash: Hash16,
    pub data: Vec<u8>,
}

impl Segment {
    pub fn pack(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(RESOURCE_ID_LEN + 4 + SEGMENT_HASH_LEN + self.data.len());
        out.extend_from_slice(self.resource_id.as_bytes());
        out.extend_from_slice(&self.index.to_be_bytes());
        out.extend_from_slice(self.segment_hash.as_bytes());
        out.extend_from_slice(&self.data);
        out
    }

    pub fn unpack(bytes: &[u8]) -> Result<Self> {
        let header_len = RESOURCE_ID_LEN + 4 + SEGMENT_HASH_LEN;
        if bytes.len() < header_len {
            return Err(ResourceError::MalformedAdvertise);
        }
        let resource_id = Hash16::from_slice(&bytes[..RESOURCE_ID_LEN]).expect("length checked above");
        let mut offset = RESOURCE_ID_LEN;
        let index = u32::from_be_bytes(bytes[offset..offset + 4].try_into().unwrap());
        offset += 4;
        let segment_hash = Hash16::from_slice(&bytes[offset..offset + SEGMENT_HASH_LEN]).expect("length checked above");
        offset += SEGMENT_HASH_LEN;
        Ok(Segment { resource_id, index, segment_hash, data: bytes[offset..].to_vec() })
    }

    pub fn hash_of(data: &[u8]) -> Hash16 {
        Hash16::of(&[data])
    }
}

/// `resource_id(16) || success(1)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Proof {
    pub resource_id: Hash16,
    pub success: bool,
}

impl Proof {
    pub fn pack(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(RESOURCE_ID_LEN + 1);
        out.extend_from_slice(self.resource_id.as_bytes());
        out.push(self.success as u8);
        out
    }

    pub fn unpack(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != RESOURCE_ID_LEN + 1 {
            return Err(ResourceError::MalformedAdvertise);
        }
        let resource_id = Hash16::from_slice(&bytes[..RESOURCE_ID_LEN]).expect("length checked above");
        Ok(Proof { resource_id, success: bytes[RESOURCE_ID_LEN] != 0 })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advertise_round_trips() {
        let advertise = Advertise {
            resource_id: Hash16::from([0x11u8; 16]),
            total_len: 123_456,
            segment_size: 400,
            segment_count: 309,
            full_hash: [0x22u8; 32],
        };
        assert_eq!(Advertise::unpack(&advertise.pack()).unwrap(), advertise);
    }

    #[test]
    fn segment_round_trips() {
        let segment = Segment {
            resource_id: Hash16::from([0x33u8; 16]),
            index: 7,
            segment_hash: Segment::hash_of(b"chunk"),
            data: b"chunk".to_vec(),
        };
        assert_eq!(Segment::unpack(&segment.pack()).unwrap(), segment);
    }

    #[test]
    fn proof_round_trips() {
        let proof = Proof { resource_id: Hash16::from([0x44u8; 16]), success: true };
        assert_eq!(Proof::unpack(&proof.pack()).unwrap(), proof);
    }
}
