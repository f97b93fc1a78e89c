use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use link::{Link, PacketReceipt};

use crate::envelope::{Envelope, SYSTEM_MSGTYPE_FLOOR};
use crate::error::{ChannelError, Result};
use crate::message::{ChannelMessage, HandlerResult};
use crate::ring::SequencedRing;

type HandlerFn = Arc<dyn Fn(&[u8]) -> HandlerResult + Send + Sync>;

#[derive(Clone, Copy)]
pub struct HandlerHandle(u64);

struct TxSlot {
    seq: u16,
    receipt: PacketReceipt,
}

struct State {
    tx_seq: u16,
    tx_outstanding: Option<TxSlot>,
    rx_ring: SequencedRing<1>,
    handlers: Vec<(u64, u16, HandlerFn)>,
    closed: bool,
}

/// Ordered, at-least-once, typed-message delivery over one `Link` (§4.6).
/// Outbound traffic is self-serializing: only one envelope may be in
/// flight at a time, since the channel has no sequence window of its own
/// beyond the single packet `Link` is already tracking a receipt for.
pub struct Channel {
    link: Arc<Link>,
    state: Mutex<State>,
    next_handler_id: AtomicU64,
}

impl Channel {
    pub fn new(link: Arc<Link>) -> Arc<Self> {
        Arc::new(Channel {
            link,
            state: Mutex::new(State {
                tx_seq: 0,
                tx_outstanding: None,
                rx_ring: SequencedRing::new(),
                handlers: Vec::new(),
                closed: false,
            }),
            next_handler_id: AtomicU64::new(1),
        })
    }

    /// Registers a handler for `T`. Rejected if `T::MSGTYPE` falls in the
    /// system-reserved range; use `register_system_handler` for those.
    pub fn register_handler<T, F>(&self, handler: F) -> Result<HandlerHandle>
    where
        T: ChannelMessage,
        F: Fn(T) -> HandlerResult + Send + Sync + 'static,
    {
        if T::MSGTYPE >= SYSTEM_MSGTYPE_FLOOR {
            return Err(ChannelError::ReservedMsgType(T::MSGTYPE));
        }
        Ok(self.register_handler_raw(T::MSGTYPE, handler))
    }

    pub fn register_system_handler<T, F>(&self, handler: F) -> HandlerHandle
    where
        T: ChannelMessage,
        F: Fn(T) -> HandlerResult + Send + Sync + 'static,
    {
        self.register_handler_raw(T::MSGTYPE, handler)
    }

    fn register_handler_raw<T, F>(&self, msgtype: u16, handler: F) -> HandlerHandle
    where
        T: ChannelMessage,
        F: Fn(T) -> HandlerResult + Send + Sync + 'static,
    {
        let wrapped: HandlerFn = Arc::new(move |bytes: &[u8]| match T::unpack(bytes) {
            Some(message) => handler(message),
            None => {
                log::warn!("channel: failed to unpack msgtype {:#06x}", msgtype);
                HandlerResult::Ignored
            }
        });

        let id = self.next_handler_id.fetch_add(1, Ordering::Relaxed);
        self.state.lock().expect("channel state mutex poisoned").handlers.push((id, msgtype, wrapped));
        HandlerHandle(id)
    }

    pub fn remove_handler(&self, handle: HandlerHandle) {
        let mut state = self.state.lock().expect("channel state mutex poisoned");
        state.handlers.retain(|(id, _, _)| *id != handle.0);
    }

    /// The Link's MDU: the budget a packed envelope (header + body) must
    /// fit inside. Callers that need the body-only budget subtract the
    /// 6-byte envelope header themselves (see `StreamDataMessage::max_data_len`).
    pub fn mdu(&self) -> usize {
        self.link.mdu()
    }

    /// Packs `message` into an envelope and hands it to the Link. Fails
    /// with `LinkNotReady` if a previous envelope is still unacknowledged.
    pub fn send<T: ChannelMessage>(self: &Arc<Self>, message: &T) -> Result<Envelope> {
        let mdu = self.link.mdu();

        let mut state = self.state.lock().expect("channel state mutex poisoned");
        if state.closed {
            return Err(ChannelError::Closed);
        }
        if state.tx_outstanding.is_some() {
            return Err(ChannelError::LinkNotReady);
        }

        let seq = state.tx_seq;
        let envelope = Envelope { msgtype: T::MSGTYPE, seq, body: message.pack() };
        let packed = envelope.pack();
        if packed.len() > mdu {
            return Err(ChannelError::TooBig { len: packed.len(), mdu });
        }

        let receipt = self.link.send_and_transmit(&packed)?;
        state.tx_seq = state.tx_seq.wrapping_add(1);
        state.tx_outstanding = Some(TxSlot { seq, receipt: receipt.clone() });
        drop(state);

        let delivered = Arc::clone(self);
        receipt.on_delivered(move |_| delivered.tx_resolved(seq));

        let failed = Arc::clone(self);
        receipt.on_timed_out(move |_| failed.tx_exhausted());

        Ok(envelope)
    }

    fn tx_resolved(self: &Arc<Self>, seq: u16) {
        let mut state = self.state.lock().expect("channel state mutex poisoned");
        if state.tx_outstanding.as_ref().map(|slot| slot.seq) == Some(seq) {
            state.tx_outstanding = None;
        }
    }

    /// §4.6: the Link itself enforces the 5-try exponential-backoff limit
    /// on the underlying packet, so by the time a receipt times out the
    /// retry budget for this envelope is already spent. Escalate straight
    /// to channel shutdown and Link teardown, rather than re-counting tries
    /// Link has already counted.
    fn tx_exhausted(self: &Arc<Self>) {
        log::warn!("channel: envelope retries exhausted, tearing down link");
        self.close();
        self.link.close();
    }

    /// Unpacks an inbound raw Link payload, deduplicates/orders it, and
    /// dispatches to registered handlers in registration order.
    pub fn receive(&self, raw: &[u8]) -> Result<()> {
        let envelope = Envelope::unpack(raw)?;

        let matching = {
            let mut state = self.state.lock().expect("channel state mutex poisoned");
            if state.closed {
                return Err(ChannelError::Closed);
            }
            if !state.rx_ring.accept(envelope.seq) {
                log::trace!("channel: discarding duplicate/stale seq {}", envelope.seq);
                return Ok(());
            }
            let matching: Vec<HandlerFn> = state
                .handlers
                .iter()
                .filter(|(_, msgtype, _)| *msgtype == envelope.msgtype)
                .map(|(_, _, handler)| Arc::clone(handler))
                .collect();
            matching
        };

        if matching.is_empty() {
            log::debug!("channel: no handler registered for msgtype {:#06x}, discarding", envelope.msgtype);
            return Ok(());
        }

        for handler in matching {
            if handler(&envelope.body) == HandlerResult::Consumed {
                break;
            }
        }
        Ok(())
    }

    pub fn close(&self) {
        let mut state = self.state.lock().expect("channel state mutex poisoned");
        state.closed = true;
        state.tx_outstanding = None;
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().expect("channel state mutex poisoned").closed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use destination::{DestinationName, ProofStrategy, SingleInputDestination, SingleOutputDestination};
    use ed25519_dalek::SigningKey;
    use iface::LoopbackInterface;
    use identity::PrivateIdentity;
    use link::{Link, LinkEvent};
    use packet::Packet;
    use std::sync::mpsc;
    use std::time::Duration;

    struct Ping(u32);
    impl ChannelMessage for Ping {
        const MSGTYPE: u16 = 1;
        fn pack(&self) -> Vec<u8> {
            self.0.to_be_bytes().to_vec()
        }
        fn unpack(bytes: &[u8]) -> Option<Self> {
            Some(Ping(u32::from_be_bytes(bytes.try_into().ok()?)))
        }
    }

    fn build_active_link_pair() -> (Arc<Link>, Arc<Link>, mpsc::Receiver<Vec<u8>>, mpsc::Receiver<Vec<u8>>) {
        let server_identity = PrivateIdentity::new();
        let signing_key = SigningKey::from_bytes(&server_identity.to_private_bytes()[32..64].try_into().unwrap());
        let name = DestinationName::new("rns_unit_tests", &["channel"]).unwrap();
        let server_input = SingleInputDestination::new(name.clone(), server_identity, ProofStrategy::ProveAll);
        let client_output = SingleOutputDestination::new(name, server_input.identity().public());

        let client_iface = LoopbackInterface::new("client");
        let server_iface = LoopbackInterface::new("server");

        let (to_server_tx, to_server_rx) = mpsc::channel::<Vec<u8>>();
        client_iface.set_receive_callback(Box::new(move |frame| {
            let _ = to_server_tx.send(frame);
        }));
        let (to_client_tx, to_client_rx) = mpsc::channel::<Vec<u8>>();
        server_iface.set_receive_callback(Box::new(move |frame| {
            let _ = to_client_tx.send(frame);
        }));

        let (client_link, request_bytes) =
            Link::initiate(client_output.hash(), client_output.identity().clone(), client_iface.clone());
        client_iface.send_raw(&request_bytes).unwrap();
        let received_request = to_server_rx.recv_timeout(Duration::from_secs(1)).unwrap();
        let request_packet = Packet::parse(&received_request).unwrap();

        let (server_link, proof_bytes) =
            Link::accept_request(&request_packet, &server_input.desc(), signing_key, server_iface.clone()).unwrap();
        server_iface.send_raw(&proof_bytes).unwrap();
        let received_proof = to_client_rx.recv_timeout(Duration::from_secs(1)).unwrap();
        let proof_packet = Packet::parse(&received_proof).unwrap();
        assert!(matches!(client_link.handle_packet(&proof_packet).unwrap(), LinkEvent::Activated));

        (client_link, server_link, to_server_rx, to_client_rx)
    }

    #[test]
    fn message_round_trips_and_dispatches_in_order() {
        let (client_link, server_link, to_server_rx, to_client_rx) = build_active_link_pair();
        let client_channel = Channel::new(client_link);
        let server_channel = Channel::new(server_link.clone());

        let (tx, rx) = mpsc::channel();
        server_channel.register_handler::<Ping, _>(move |ping| {
            tx.send(ping.0).unwrap();
            HandlerResult::Consumed
        }).unwrap();

        client_channel.send(&Ping(42)).unwrap();
        let data_frame = to_server_rx.recv_timeout(Duration::from_secs(1)).unwrap();
        let data_packet = Packet::parse(&data_frame).unwrap();
        let event = server_link.handle_packet(&data_packet).unwrap();
        let plaintext = match event {
            LinkEvent::Data(bytes) => bytes,
            _ => panic!("expected data event"),
        };
        server_channel.receive(&plaintext).unwrap();

        assert_eq!(rx.recv_timeout(Duration::from_secs(1)).unwrap(), 42);

        // drain the proof-of-data packet so the test doesn't leak a warning
        let _ = to_client_rx.recv_timeout(Duration::from_secs(1));
    }

    #[test]
    fn second_send_while_one_outstanding_is_rejected() {
        let (client_link, _server_link, _to_server_rx, _to_client_rx) = build_active_link_pair();
        let channel = Channel::new(client_link);

        channel.send(&Ping(1)).unwrap();
        assert!(matches!(channel.send(&Ping(2)), Err(ChannelError::LinkNotReady)));
    }

    #[test]
    fn duplicate_sequence_is_discarded_without_redispatch() {
        let (client_link, server_link, to_server_rx, _to_client_rx) = build_active_link_pair();
        let client_channel = Channel::new(client_link);
        let server_channel = Channel::new(server_link.clone());

        let count = Arc::new(std::sync::atomic::AtomicU32::new(0));
        let counter = Arc::clone(&count);
        server_channel.register_handler::<Ping, _>(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            HandlerResult::Consumed
        }).unwrap();

        client_channel.send(&Ping(7)).unwrap();
        let data_frame = to_server_rx.recv_timeout(Duration::from_secs(1)).unwrap();
        let data_packet = Packet::parse(&data_frame).unwrap();
        let plaintext = match server_link.handle_packet(&data_packet).unwrap() {
            LinkEvent::Data(bytes) => bytes,
            _ => panic!("expected data event"),
        };

        server_channel.receive(&plaintext).unwrap();
        server_channel.receive(&plaintext).unwrap();

        assert_eq!(count.load(Ordering::SeqCst), 1);
    }
}
