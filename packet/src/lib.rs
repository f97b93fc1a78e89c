//! Packet framing: the one-byte header, the routing tag that follows it,
//! and the context byte that disambiguates Link/Resource control traffic.

pub mod context;
pub mod error;
pub mod header;
pub mod packet;

pub use context::Context;
pub use error::{PacketError, Result};
pub use header::{DestinationType, Header, HeaderType, IfacFlag, PacketType, PropagationType};
pub use packet::{Packet, RoutingTag, DEFAULT_MTU};
