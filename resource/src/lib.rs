//! Everything that rides on top of Link and Channel to carry more than one
//! packet's worth of data (§4.7): the system `StreamDataMessage`, the raw
//! and buffered stream reader/writer built on it, and the segment-based
//! `Resource` bulk-transfer primitive.
//!
//! `ResourceRegistry` is the piece that ties both halves to a live
//! `Link`/`Channel` pair: it owns the stream-id → `RawChannelReader` fan-out
//! table for the Channel side, and the resource-id → `SendResource`/
//! `ReceiveResource` tables for the packets that ride directly on `Link`
//! (Resource traffic never goes through Channel; §4.7 notes it's for
//! transfers too large for Channel's one-envelope-at-a-time discipline).

pub mod buffered;
pub mod error;
pub mod raw_channel;
pub mod segment;
pub mod status;
pub mod stream;
pub mod transfer;

pub use buffered::{BufferedReader, BufferedWriter};
pub use error::{Result, ResourceError};
pub use raw_channel::{RawChannelReader, RawChannelWriter};
pub use segment::{Advertise, Proof, Segment};
pub use status::ResourceStatus;
pub use stream::{StreamDataMessage, MAX_STREAM_ID};
pub use transfer::{ReceiveResource, SendResource, DEFAULT_TIMEOUT};

use std::collections::HashMap;
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use channel::{Channel, HandlerResult};
use common_types::Hash16;
use link::Link;
use packet::Context as PacketContext;

/// Owns the fan-out tables a Link/Channel pair needs to run the stream and
/// Resource subsystems: one `StreamDataMessage` system handler on the
/// Channel, dispatching by stream id, and one resource-id keyed table for
/// each direction of in-flight bulk transfers.
pub struct ResourceRegistry {
    link: Arc<Link>,
    channel: Arc<Channel>,
    readers: Mutex<HashMap<u16, Arc<RawChannelReader>>>,
    sending: Mutex<HashMap<Hash16, Arc<SendResource>>>,
    receiving: Mutex<HashMap<Hash16, Arc<ReceiveResource>>>,
    next_stream_id: AtomicU16,
}

impl ResourceRegistry {
    /// Registers the system `StreamDataMessage` handler on `channel` and
    /// returns a registry ready to open streams and drive Resource
    /// transfers over `link`.
    pub fn new(link: Arc<Link>, channel: Arc<Channel>) -> Arc<Self> {
        let registry = Arc::new(ResourceRegistry {
            link,
            channel: Arc::clone(&channel),
            readers: Mutex::new(HashMap::new()),
            sending: Mutex::new(HashMap::new()),
            receiving: Mutex::new(HashMap::new()),
            next_stream_id: AtomicU16::new(0),
        });

        let fanout = Arc::clone(&registry);
        channel.register_system_handler::<StreamDataMessage, _>(move |msg| {
            fanout.dispatch_stream_message(&msg);
            HandlerResult::Consumed
        });

        registry
    }

    /// Allocates a fresh peer-scoped stream id and returns a connected
    /// reader/writer pair for it. The reader is registered in the fan-out
    /// table immediately; inbound `StreamDataMessage`s for this id start
    /// arriving as soon as the peer learns it (out of band — this crate
    /// only carries the bytes, not the negotiation of which id means what).
    pub fn open_stream(self: &Arc<Self>) -> (Arc<RawChannelReader>, RawChannelWriter) {
        let stream_id = self.next_stream_id.fetch_add(1, Ordering::Relaxed) & MAX_STREAM_ID;
        let reader = RawChannelReader::new(stream_id);
        self.readers.lock().expect("resource registry mutex poisoned").insert(stream_id, Arc::clone(&reader));
        let writer = RawChannelWriter::new(stream_id, Arc::clone(&self.channel));
        (reader, writer)
    }

    /// Registers a reader for a specific stream id, for the side that
    /// learns the id from the peer (e.g. an advertise message) rather than
    /// minting it locally.
    pub fn register_stream_reader(&self, stream_id: u16) -> Arc<RawChannelReader> {
        let reader = RawChannelReader::new(stream_id);
        self.readers.lock().expect("resource registry mutex poisoned").insert(stream_id, Arc::clone(&reader));
        reader
    }

    pub fn stream_writer(self: &Arc<Self>, stream_id: u16) -> RawChannelWriter {
        RawChannelWriter::new(stream_id, Arc::clone(&self.channel))
    }

    /// The Channel this registry's streams ride over. Exposed so a driver's
    /// read loop can hand it a decrypted `LinkEvent::Data` payload directly,
    /// without the registry needing its own copy of every Channel method.
    pub fn channel(&self) -> &Arc<Channel> {
        &self.channel
    }

    fn dispatch_stream_message(&self, msg: &StreamDataMessage) {
        let readers = self.readers.lock().expect("resource registry mutex poisoned");
        match readers.get(&msg.stream_id) {
            Some(reader) => reader.on_inbound(msg),
            None => log::debug!("resource registry: no reader registered for stream {}", msg.stream_id),
        }
    }

    /// Starts sending `payload` as a new Resource transfer over the owned
    /// Link, with the default 120s deadline (§4.7).
    pub fn send_resource(
        self: &Arc<Self>,
        payload: Vec<u8>,
        on_complete: impl FnOnce(Result<()>) + Send + 'static,
    ) -> Result<Arc<SendResource>> {
        self.send_resource_with_timeout(payload, DEFAULT_TIMEOUT, on_complete)
    }

    pub fn send_resource_with_timeout(
        self: &Arc<Self>,
        payload: Vec<u8>,
        deadline: Duration,
        on_complete: impl FnOnce(Result<()>) + Send + 'static,
    ) -> Result<Arc<SendResource>> {
        let resource = SendResource::send(Arc::clone(&self.link), payload, deadline, on_complete)?;
        self.sending.lock().expect("resource registry mutex poisoned").insert(resource.id(), Arc::clone(&resource));
        Ok(resource)
    }

    /// Feeds one inbound Resource-context packet (already Token-decrypted
    /// by `Link::handle_packet`, surfaced as `LinkEvent::Resource`) to the
    /// matching transfer, creating a `ReceiveResource` on an advertise.
    pub fn handle_resource_packet(self: &Arc<Self>, context: PacketContext, plaintext: &[u8]) -> Result<()> {
        match context {
            PacketContext::ResourceAdvertise => {
                let advertise = Advertise::unpack(plaintext)?;
                let receiving = ReceiveResource::new(Arc::clone(&self.link), advertise);
                self.receiving.lock().expect("resource registry mutex poisoned").insert(receiving.id(), receiving);
            }
            PacketContext::ResourceSegment => {
                let segment = Segment::unpack(plaintext)?;
                let receiving = self
                    .receiving
                    .lock()
                    .expect("resource registry mutex poisoned")
                    .get(&segment.resource_id)
                    .cloned();
                match receiving {
                    Some(receiving) => receiving.on_segment(segment),
                    None => log::debug!("resource registry: segment for unknown resource {}", segment.resource_id),
                }
            }
            PacketContext::ResourceProof => {
                let proof = Proof::unpack(plaintext)?;
                let sending = self
                    .sending
                    .lock()
                    .expect("resource registry mutex poisoned")
                    .remove(&proof.resource_id);
                match sending {
                    Some(sending) => sending.handle_proof(proof),
                    None => log::debug!("resource registry: proof for unknown resource {}", proof.resource_id),
                }
            }
            _ => log::debug!("resource registry: ignoring non-resource packet context"),
        }
        Ok(())
    }

    /// Sweeps every outstanding send for deadline expiry. Meant to be
    /// driven by the same external periodic sweep that drives
    /// `Link::check_staleness` (§5).
    pub fn check_timeouts(&self) {
        let sending: Vec<_> = self.sending.lock().expect("resource registry mutex poisoned").values().cloned().collect();
        for resource in sending {
            resource.check_timeout();
        }
    }
}
