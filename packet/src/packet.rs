use crate::context::Context;
use crate::error::{PacketError, Result};
use crate::header::{DestinationType, Header, HeaderType};
use common_types::{DestinationHash, Hash16};

/// Default MTU assumed when an interface hasn't reported its own; real
/// interface drivers override this via `Interface::mdu`.
pub const DEFAULT_MTU: usize = 500;

const HOPS_LEN: usize = 1;
const CONTEXT_LEN: usize = 1;
const MIN_HEADER_LEN: usize = 1 + HOPS_LEN + DestinationHash::LEN + CONTEXT_LEN;

/// The addressing tag carried right after the hop count. Destination-typed
/// packets (SINGLE/GROUP/PLAIN) carry a 10-byte destination hash; Link
/// packets carry a 16-byte link id instead, since link ids are minted wider
/// than destination hashes to stay unique for the life of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutingTag {
    Destination(DestinationHash),
    Link(Hash16),
}

impl RoutingTag {
    fn destination_type(&self) -> DestinationType {
        match self {
            RoutingTag::Destination(_) => DestinationType::Single,
            RoutingTag::Link(_) => DestinationType::Link,
        }
    }

    fn as_bytes(&self) -> &[u8] {
        match self {
            RoutingTag::Destination(h) => h.as_ref(),
            RoutingTag::Link(h) => h.as_ref(),
        }
    }

    fn len(&self) -> usize {
        match self {
            RoutingTag::Destination(_) => DestinationHash::LEN,
            RoutingTag::Link(_) => Hash16::LEN,
        }
    }
}

/// A single-hop Reticulum packet: header byte, hop count, routing tag,
/// context byte, and an opaque ciphertext payload (already Token-sealed or,
/// for Announce, plaintext per §6's announce format).
#[derive(Debug, Clone)]
pub struct Packet {
    pub header: Header,
    pub hops: u8,
    pub tag: RoutingTag,
    pub context: Context,
    pub payload: Vec<u8>,
}

impl Packet {
    pub fn new(packet_type: crate::header::PacketType, tag: RoutingTag, context: Context, payload: Vec<u8>) -> Self {
        let header = Header {
            ifac_flag: crate::header::IfacFlag::Open,
            header_type: HeaderType::Type1,
            context_flag: !context.is_none(),
            propagation_type: crate::header::PropagationType::Broadcast,
            destination_type: tag.destination_type(),
            packet_type,
        };
        Packet { header, hops: 0, tag, context, payload }
    }

    /// Serializes to wire bytes and rejects the result if it would exceed
    /// `mtu` (the caller's interface MDU, or `DEFAULT_MTU`).
    pub fn serialize(&self, mtu: usize) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(1 + HOPS_LEN + self.tag.len() + CONTEXT_LEN + self.payload.len());
        out.push(self.header.to_byte());
        out.push(self.hops);
        out.extend_from_slice(self.tag.as_bytes());
        out.push(self.context.to_byte());
        out.extend_from_slice(&self.payload);

        if out.len() > mtu {
            return Err(PacketError::TooLarge { len: out.len(), mtu });
        }
        Ok(out)
    }

    pub fn parse(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < MIN_HEADER_LEN {
            return Err(PacketError::TooShort(bytes.len()));
        }

        let header = Header::from_byte(bytes[0])?;
        let hops = bytes[1];

        let tag_len = match header.destination_type {
            DestinationType::Link => Hash16::LEN,
            _ => DestinationHash::LEN,
        };
        let tag_start = 2;
        let tag_end = tag_start + tag_len;
        let context_idx = tag_end;
        if bytes.len() < context_idx + CONTEXT_LEN {
            return Err(PacketError::TooShort(bytes.len()));
        }

        let tag = match header.destination_type {
            DestinationType::Link => RoutingTag::Link(
                Hash16::from_slice(&bytes[tag_start..tag_end]).expect("length checked above"),
            ),
            _ => RoutingTag::Destination(
                DestinationHash::from_slice(&bytes[tag_start..tag_end]).expect("length checked above"),
            ),
        };

        let context = Context::from_byte(bytes[context_idx])?;
        let payload = bytes[context_idx + CONTEXT_LEN..].to_vec();

        Ok(Packet { header, hops, tag, context, payload })
    }

    /// Per §6: SHA-256 of the header byte, routing tag, context byte, and
    /// payload, truncated to 16 bytes. The hop count is excluded since it
    /// changes as the packet is relayed and isn't part of its identity.
    pub fn get_hash(&self) -> Hash16 {
        Hash16::of(&[&[self.header.to_byte()], self.tag.as_bytes(), &[self.context.to_byte()], &self.payload])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::header::PacketType;
    use common_types::Hash16 as Hash16Type;

    #[test]
    fn destination_packet_round_trips() {
        let tag = RoutingTag::Destination(DestinationHash::from([0x11u8; 10]));
        let packet = Packet::new(PacketType::Data, tag, Context::None, b"payload bytes".to_vec());

        let bytes = packet.serialize(DEFAULT_MTU).unwrap();
        let parsed = Packet::parse(&bytes).unwrap();

        assert_eq!(parsed.header, packet.header);
        assert_eq!(parsed.tag, packet.tag);
        assert_eq!(parsed.context, packet.context);
        assert_eq!(parsed.payload, packet.payload);
    }

    #[test]
    fn link_packet_carries_a_wider_tag() {
        let tag = RoutingTag::Link(Hash16Type::from([0x22u8; 16]));
        let packet = Packet::new(PacketType::Proof, tag, Context::LinkProof, b"ack".to_vec());

        let bytes = packet.serialize(DEFAULT_MTU).unwrap();
        assert_eq!(bytes[2..18].len(), 16);

        let parsed = Packet::parse(&bytes).unwrap();
        assert_eq!(parsed.tag, packet.tag);
    }

    #[test]
    fn oversize_payload_is_rejected_before_send() {
        let tag = RoutingTag::Destination(DestinationHash::from([0u8; 10]));
        let packet = Packet::new(PacketType::Data, tag, Context::None, vec![0u8; DEFAULT_MTU * 2]);
        assert!(matches!(packet.serialize(DEFAULT_MTU), Err(PacketError::TooLarge { .. })));
    }

    #[test]
    fn hop_count_does_not_affect_hash() {
        let tag = RoutingTag::Destination(DestinationHash::from([0x33u8; 10]));
        let mut packet = Packet::new(PacketType::Data, tag, Context::None, b"x".to_vec());
        let hash_before = packet.get_hash();
        packet.hops = 5;
        assert_eq!(packet.get_hash(), hash_before);
    }

    #[test]
    fn truncated_packet_fails_to_parse() {
        assert!(Packet::parse(&[0u8; 3]).is_err());
    }
}
