//! The Channel: ordered, at-least-once, typed-message delivery multiplexed
//! over a single Link (§4.6). Builds directly on `link::Link`; `resource`
//! builds on this in turn for stream and bulk-transfer semantics.

pub mod channel;
pub mod envelope;
pub mod error;
pub mod message;
pub mod ring;

pub use channel::{Channel, HandlerHandle};
pub use envelope::{Envelope, SYSTEM_MSGTYPE_FLOOR};
pub use error::{ChannelError, Result};
pub use message::{ChannelMessage, HandlerResult};
