//! The seam between the Reticulum stack and a physical or virtual carrier.
//!
//! There is deliberately no async here: drivers for real carriers (TCP,
//! serial, LoRa radios, ...) run their own I/O thread and push inbound
//! frames into the registered callback from that thread; `send_raw` is
//! expected to either complete synchronously or hand off to the driver's
//! own send queue. Writing actual carrier drivers is out of scope; this
//! crate only defines the seam and a loopback implementation for tests.

use crate::error::Result;
use std::sync::Arc;

pub type ReceiveCallback = Box<dyn Fn(Vec<u8>) + Send + Sync>;

pub trait Interface: Send + Sync {
    fn name(&self) -> &str;

    /// Maximum data unit this interface can carry in one frame. Packet
    /// serialization uses this instead of the crate-wide default MTU once
    /// an interface is attached.
    fn mdu(&self) -> usize;

    /// Approximate instantaneous throughput in bits per second, when known.
    fn bitrate(&self) -> Option<u64>;

    fn is_online(&self) -> bool;

    /// Hands a fully framed packet to the carrier. Must reject anything
    /// wider than `mdu()` rather than silently fragmenting it; Reticulum
    /// has no packet fragmentation, callers split large payloads via
    /// Resource instead.
    fn send_raw(&self, bytes: &[u8]) -> Result<()>;

    /// Registers the callback invoked with each inbound frame. Drivers call
    /// this exactly once at attach time; later calls replace the callback.
    fn set_receive_callback(&self, callback: ReceiveCallback);
}

pub type SharedInterface = Arc<dyn Interface>;
