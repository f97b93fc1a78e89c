//! The one-byte packet header and the bit fields packed into it.
//!
//! Layout, MSB to LSB:
//! `IFAC_FLAG(1) | HEADER_TYPE(1) | CONTEXT_FLAG(1) | PROPAGATION_TYPE(1) | DESTINATION_TYPE(2) | PACKET_TYPE(2)`

use crate::error::{PacketError, Result};

/// Whether an interface access code precedes the header. Core framing only
/// carries the bit; interpreting/stripping the access code is an interface
/// driver's job and out of scope here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IfacFlag {
    Open,
    Authenticated,
}

/// `Type1` packets carry a single 10-byte destination hash. `Type2` carry an
/// additional leading transport hash for path transport; this crate frames
/// that second hash but does not implement multi-hop forwarding logic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderType {
    Type1,
    Type2,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropagationType {
    Broadcast,
    Transport,
}

/// What kind of 10-byte (or, for `Link`, 16-byte) tag follows the header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DestinationType {
    Single,
    Group,
    Plain,
    /// The tag is a Link id (16 bytes), not a destination hash (10 bytes).
    Link,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketType {
    Data,
    Announce,
    LinkRequest,
    Proof,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub ifac_flag: IfacFlag,
    pub header_type: HeaderType,
    pub context_flag: bool,
    pub propagation_type: PropagationType,
    pub destination_type: DestinationType,
    pub packet_type: PacketType,
}

impl Header {
    pub fn to_byte(self) -> u8 {
        let mut b = 0u8;
        if self.ifac_flag == IfacFlag::Authenticated {
            b |= 0b1000_0000;
        }
        if self.header_type == HeaderType::Type2 {
            b |= 0b0100_0000;
        }
        if self.context_flag {
            b |= 0b0010_0000;
        }
        if self.propagation_type == PropagationType::Transport {
            b |= 0b0001_0000;
        }
        b |= destination_type_bits(self.destination_type) << 2;
        b |= packet_type_bits(self.packet_type);
        b
    }

    pub fn from_byte(b: u8) -> Result<Self> {
        let ifac_flag = if b & 0b1000_0000 != 0 { IfacFlag::Authenticated } else { IfacFlag::Open };
        let header_type = if b & 0b0100_0000 != 0 { HeaderType::Type2 } else { HeaderType::Type1 };
        let context_flag = b & 0b0010_0000 != 0;
        let propagation_type =
            if b & 0b0001_0000 != 0 { PropagationType::Transport } else { PropagationType::Broadcast };
        let destination_type = destination_type_from_bits((b >> 2) & 0b11)?;
        let packet_type = packet_type_from_bits(b & 0b11)?;

        Ok(Header { ifac_flag, header_type, context_flag, propagation_type, destination_type, packet_type })
    }
}

fn destination_type_bits(t: DestinationType) -> u8 {
    match t {
        DestinationType::Single => 0b00,
        DestinationType::Group => 0b01,
        DestinationType::Plain => 0b10,
        DestinationType::Link => 0b11,
    }
}

fn destination_type_from_bits(bits: u8) -> Result<DestinationType> {
    match bits {
        0b00 => Ok(DestinationType::Single),
        0b01 => Ok(DestinationType::Group),
        0b10 => Ok(DestinationType::Plain),
        0b11 => Ok(DestinationType::Link),
        _ => Err(PacketError::UnknownDestinationType(bits)),
    }
}

fn packet_type_bits(t: PacketType) -> u8 {
    match t {
        PacketType::Data => 0b00,
        PacketType::Announce => 0b01,
        PacketType::LinkRequest => 0b10,
        PacketType::Proof => 0b11,
    }
}

fn packet_type_from_bits(bits: u8) -> Result<PacketType> {
    match bits {
        0b00 => Ok(PacketType::Data),
        0b01 => Ok(PacketType::Announce),
        0b10 => Ok(PacketType::LinkRequest),
        0b11 => Ok(PacketType::Proof),
        _ => unreachable!("2-bit field"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_byte_round_trips_every_field() {
        let header = Header {
            ifac_flag: IfacFlag::Authenticated,
            header_type: HeaderType::Type1,
            context_flag: true,
            propagation_type: PropagationType::Transport,
            destination_type: DestinationType::Link,
            packet_type: PacketType::Proof,
        };
        let byte = header.to_byte();
        assert_eq!(Header::from_byte(byte).unwrap(), header);
    }

    #[test]
    fn defaults_pack_to_zero() {
        let header = Header {
            ifac_flag: IfacFlag::Open,
            header_type: HeaderType::Type1,
            context_flag: false,
            propagation_type: PropagationType::Broadcast,
            destination_type: DestinationType::Single,
            packet_type: PacketType::Data,
        };
        assert_eq!(header.to_byte(), 0);
    }
}
