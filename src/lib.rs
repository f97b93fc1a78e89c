//! Reticulum: a cryptographic networking stack for low-bandwidth,
//! high-latency, lossy links (§1). This crate re-exports the per-concern
//! workspace members and wires in the two pieces that only make sense once
//! every component exists together: a unified error type and the minimal
//! inbound-routing seam `Link` needs to be driven without a full,
//! multi-hop Transport.

pub use channel::{self, Channel, ChannelError, ChannelMessage, Envelope, HandlerHandle, HandlerResult};
pub use common_types::{self, DestinationHash, Digest256, Hash16, Truncated};
pub use crypto::{self, CryptoError};
pub use destination::{self, DestinationError};
pub use iface::{self, Interface, InterfaceError, LoopbackInterface, SharedInterface};
pub use identity::{self, Identity, IdentityError, PrivateIdentity};
pub use link::{self, Link, LinkError, LinkEvent, PacketReceipt};
pub use packet::{self, Context as PacketContext, Packet, PacketError};
pub use resource::{self, ResourceError, ResourceRegistry};

mod router;
pub use router::{InboundRouter, LinkTable};

use thiserror::Error;

/// The workspace-wide error type (§7). Each component crate keeps its own
/// minimal, `thiserror`-derived error enum; this just gives callers that
/// hold components from more than one crate (the common case once a
/// caller is past "just Link" into "Link + Channel + Resource") a single
/// type to propagate with `?`.
#[derive(Debug, Error)]
pub enum RnsError {
    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error(transparent)]
    Identity(#[from] IdentityError),

    #[error(transparent)]
    Destination(#[from] DestinationError),

    #[error(transparent)]
    Packet(#[from] PacketError),

    #[error(transparent)]
    Interface(#[from] InterfaceError),

    #[error(transparent)]
    Link(#[from] LinkError),

    #[error(transparent)]
    Channel(#[from] ChannelError),

    #[error(transparent)]
    Resource(#[from] ResourceError),
}

pub type Result<T> = std::result::Result<T, RnsError>;
