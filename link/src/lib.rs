//! The Link session: a two-party authenticated channel built on top of
//! Packet and Destination, providing the ordered delivery and crypto
//! context that Channel and Resource build on.

pub mod error;
pub mod handshake;
pub mod link;
pub mod receipt;
pub mod rtt;
pub mod status;
pub mod timer;

pub use error::{LinkError, Result};
pub use link::{Link, LinkEvent, KEEPALIVE_TIMEOUT, STALE_GRACE};
pub use receipt::{PacketReceipt, ReceiptState};
pub use rtt::RttEstimator;
pub use status::LinkStatus;
pub use timer::RetryScheduler;
