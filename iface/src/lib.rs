//! The Interface abstraction and a loopback implementation for tests.

pub mod error;
pub mod interface;
pub mod loopback;

pub use error::{InterfaceError, Result};
pub use interface::{Interface, ReceiveCallback, SharedInterface};
pub use loopback::LoopbackInterface;
