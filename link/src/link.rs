//! The two-party authenticated Link session (§4.5).

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use common_types::{DestinationHash, Hash16};
use crypto::kdf::{hmac_sha256, hmac_sha256_verify};
use crypto::token::{self, KeyMode};
use destination::DestinationDesc;
use ed25519_dalek::SigningKey;
use iface::SharedInterface;
use identity::Identity;
use packet::{Context as PacketContext, Packet, PacketType, RoutingTag};

use crate::error::{LinkError, Result};
use crate::handshake::{self, PendingRequest, ResponderHandshake, SessionKeys};
use crate::receipt::PacketReceipt;
use crate::rtt::RttEstimator;
use crate::status::LinkStatus;
use crate::timer::RetryScheduler;

/// Framing overhead charged against the interface MDU to get the Link's
/// usable payload size: one header byte, one hop byte, a 16-byte link id,
/// one context byte, and the Token envelope's worst-case IV+pad+HMAC.
const LINK_HEADER_OVERHEAD: usize = 1 + 1 + 16 + 1;
const TOKEN_OVERHEAD_MAX: usize = 16 + 16 + 32;

const MAX_RETRIES: u32 = 5;
/// No literal value is specified in §4.5 for the keepalive/stale timers;
/// these mirror Reticulum's own real-world defaults of six minutes.
pub const KEEPALIVE_TIMEOUT: Duration = Duration::from_secs(360);
pub const STALE_GRACE: Duration = Duration::from_secs(360);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Role {
    Initiator,
    Responder,
}

struct State {
    status: LinkStatus,
    pending: Option<PendingRequest>,
    /// Zeroized on drop (via `SessionKeys = Zeroizing<Vec<u8>>`) so that
    /// dropping a closed Link's state doesn't leave derived key material
    /// sitting in freed memory (§3).
    session_keys: Option<SessionKeys>,
    peer_identity: Option<Identity>,
    rtt: RttEstimator,
    request_time: Instant,
    last_activity: Instant,
    tx_seq: u32,
    outstanding: HashMap<Hash16, (PacketReceipt, Vec<u8>)>,
}

/// A live or pending Link session. Always held behind `Arc` once shared
/// with retry timers, since outstanding timeouts must be able to touch the
/// link after the caller has moved on.
pub struct Link {
    id: Hash16,
    destination_hash: DestinationHash,
    role: Role,
    interface: SharedInterface,
    destination_signing: Option<SigningKey>,
    state: Mutex<State>,
    scheduler: RetryScheduler,
}

pub enum LinkEvent {
    Activated,
    Data(Vec<u8>),
    /// A Resource-subsystem packet (§4.7): advertise, segment, or segment
    /// proof. Carries the context byte so the caller can tell which.
    Resource(PacketContext, Vec<u8>),
    KeepAliveRequest,
    /// A packet proof or other control traffic that updated internal state
    /// (a receipt, the keepalive clock) but has nothing for the caller to
    /// act on.
    Noop,
    Closed,
}

impl Link {
    /// Initiator side: builds a LINKREQUEST. `destination_identity` is the
    /// long-term identity already learned from a prior Announce.
    pub fn initiate(
        destination_hash: DestinationHash,
        destination_identity: Identity,
        interface: SharedInterface,
    ) -> (Arc<Link>, Vec<u8>) {
        let pending = PendingRequest::generate();
        let request_payload = pending.request_payload();
        let id = handshake::link_id_from_request(&request_payload);

        let link = Arc::new(Link {
            id,
            destination_hash,
            role: Role::Initiator,
            interface,
            destination_signing: None,
            state: Mutex::new(State {
                status: LinkStatus::Pending,
                pending: Some(pending),
                session_keys: None,
                peer_identity: Some(destination_identity),
                rtt: RttEstimator::new(),
                request_time: Instant::now(),
                last_activity: Instant::now(),
                tx_seq: 0,
                outstanding: HashMap::new(),
            }),
            scheduler: RetryScheduler::new(),
        });

        let packet = Packet::new(
            PacketType::LinkRequest,
            RoutingTag::Destination(destination_hash),
            PacketContext::None,
            request_payload.to_vec(),
        );
        link.state.lock().expect("link state mutex poisoned").status = LinkStatus::Handshake;

        let mtu = link.interface.mdu();
        let bytes = packet.serialize(mtu).expect("handshake payload always fits the mtu");
        (link, bytes)
    }

    /// Responder side: a destination we own has received a LINKREQUEST
    /// packet. Returns the new link and the PROOF packet bytes to send
    /// back; the link is already ACTIVE once this returns, matching §4.5's
    /// "responder ... returns a PROOF packet" with no further wait.
    pub fn accept_request(
        request_packet: &Packet,
        owned: &DestinationDesc,
        destination_signing: SigningKey,
        interface: SharedInterface,
    ) -> Result<(Arc<Link>, Vec<u8>)> {
        let parsed = handshake::parse_request(&request_packet.payload)?;
        let id = handshake::link_id_from_request(&request_packet.payload);
        let responder = ResponderHandshake::derive(&id, &parsed.initiator_x25519_public);
        let proof_payload = responder.proof_payload(&id, &destination_signing);

        let link = Arc::new(Link {
            id,
            destination_hash: owned.address_hash,
            role: Role::Responder,
            interface,
            destination_signing: Some(destination_signing),
            state: Mutex::new(State {
                status: LinkStatus::Active,
                pending: None,
                session_keys: Some(responder.session_keys),
                peer_identity: None,
                rtt: RttEstimator::new(),
                request_time: Instant::now(),
                last_activity: Instant::now(),
                tx_seq: 0,
                outstanding: HashMap::new(),
            }),
            scheduler: RetryScheduler::new(),
        });

        let proof_packet = Packet::new(
            PacketType::Proof,
            RoutingTag::Link(id),
            PacketContext::LinkRequestProof,
            proof_payload,
        );
        let mtu = link.interface.mdu();
        let bytes = proof_packet.serialize(mtu).expect("handshake payload always fits the mtu");
        Ok((link, bytes))
    }

    pub fn id(&self) -> Hash16 {
        self.id
    }

    pub fn destination_hash(&self) -> DestinationHash {
        self.destination_hash
    }

    pub fn status(&self) -> LinkStatus {
        self.state.lock().expect("link state mutex poisoned").status
    }

    pub fn rtt(&self) -> Option<Duration> {
        self.state.lock().expect("link state mutex poisoned").rtt.get()
    }

    /// Interface MDU minus Link framing and the Token envelope's worst-case
    /// overhead (§4.5: "interface MTU minus fixed Link header overhead").
    pub fn mdu(&self) -> usize {
        self.interface.mdu().saturating_sub(LINK_HEADER_OVERHEAD + TOKEN_OVERHEAD_MAX)
    }

    /// Initiator-side completion: called with an inbound PROOF packet whose
    /// context is `LinkRequestProof` and whose tag matches this link's id.
    fn complete_handshake(self: &Arc<Self>, proof_packet: &Packet) -> Result<()> {
        let mut state = self.state.lock().expect("link state mutex poisoned");
        if state.status != LinkStatus::Handshake {
            return Err(LinkError::NotReady);
        }
        let pending = state.pending.as_ref().ok_or(LinkError::NotReady)?;
        let peer_identity = state.peer_identity.clone().ok_or(LinkError::NotReady)?;

        let session_keys = handshake::verify_proof(&self.id, &peer_identity, pending, &proof_packet.payload)?;

        state.rtt.seed(state.request_time.elapsed());
        state.session_keys = Some(session_keys);
        state.pending = None;
        state.status = LinkStatus::Active;
        state.last_activity = Instant::now();
        log::debug!("link {}: activated", self.id);
        Ok(())
    }

    /// Encrypts `payload`, builds the DATA packet, registers a receipt, and
    /// schedules its first retry timer. Returns the wire bytes for the
    /// caller to hand to the interface (the caller already holds the
    /// interface; `Link` doesn't re-send on the initial attempt to keep
    /// this method free of I/O side effects beyond timer scheduling).
    pub fn send(self: &Arc<Self>, payload: &[u8]) -> Result<(PacketReceipt, Vec<u8>)> {
        self.send_with_context(payload, PacketContext::None)
    }

    /// As `send`, but lets Resource stamp its own context byte
    /// (`ResourceAdvertise`/`ResourceSegment`/`ResourceProof`) on the DATA
    /// packet it rides over this Link. The packet hash a proof covers
    /// already includes the context byte (`Packet::get_hash`), so the
    /// existing per-packet receipt/retry machinery works unchanged for
    /// Resource traffic without Resource needing its own ack protocol.
    pub fn send_with_context(
        self: &Arc<Self>,
        payload: &[u8],
        context: PacketContext,
    ) -> Result<(PacketReceipt, Vec<u8>)> {
        let mtu = self.mdu();
        if payload.len() > mtu {
            return Err(LinkError::PayloadTooLarge { mdu: mtu, len: payload.len() });
        }

        let mut state = self.state.lock().expect("link state mutex poisoned");
        if state.status != LinkStatus::Active {
            return Err(LinkError::NotReady);
        }
        let session_keys = state.session_keys.clone().expect("active link always has session keys");
        let ciphertext = token::encrypt(KeyMode::Aes256, &session_keys, payload)?;

        let data_packet = Packet::new(PacketType::Data, RoutingTag::Link(self.id), context, ciphertext);
        let wire = data_packet.serialize(self.interface.mdu()).map_err(LinkError::from)?;
        let packet_hash = data_packet.get_hash();

        let receipt = PacketReceipt::new(packet_hash);
        state.outstanding.insert(packet_hash, (receipt.clone(), wire.clone()));
        state.tx_seq = state.tx_seq.wrapping_add(1);
        let rtt_estimate = state.rtt;
        drop(state);

        self.schedule_retry(packet_hash, 1, rtt_estimate);
        Ok((receipt, wire))
    }

    /// Convenience wrapper used by Channel/Resource: sends `payload` and
    /// immediately hands the wire bytes to the attached interface, so
    /// callers don't need to hold their own handle to it.
    pub fn send_and_transmit(self: &Arc<Self>, payload: &[u8]) -> Result<PacketReceipt> {
        let (receipt, wire) = self.send(payload)?;
        self.interface.send_raw(&wire).map_err(|_| LinkError::NotReady)?;
        Ok(receipt)
    }

    /// As `send_and_transmit`, carrying a Resource context byte.
    pub fn send_and_transmit_with_context(
        self: &Arc<Self>,
        payload: &[u8],
        context: PacketContext,
    ) -> Result<PacketReceipt> {
        let (receipt, wire) = self.send_with_context(payload, context)?;
        self.interface.send_raw(&wire).map_err(|_| LinkError::NotReady)?;
        Ok(receipt)
    }

    fn schedule_retry(self: &Arc<Self>, packet_hash: Hash16, tries: u32, rtt: RttEstimator) {
        let deadline = Instant::now() + rtt.timeout_for(tries);
        let link = Arc::clone(self);
        self.scheduler.schedule(deadline, move || link.on_retry_timeout(packet_hash));
    }

    fn on_retry_timeout(self: Arc<Self>, packet_hash: Hash16) {
        let mut state = self.state.lock().expect("link state mutex poisoned");
        if state.status.is_terminal() {
            return;
        }
        let Some((receipt, wire)) = state.outstanding.get(&packet_hash).cloned() else {
            return;
        };

        let tries = receipt.bump_tries();
        if tries > MAX_RETRIES {
            state.outstanding.remove(&packet_hash);
            drop(state);
            receipt.mark_failed();
            return;
        }

        if let Err(e) = self.interface.send_raw(&wire) {
            log::warn!("link {}: retry send failed: {}", self.id, e);
        }
        let rtt_estimate = state.rtt;
        drop(state);
        self.schedule_retry(packet_hash, tries, rtt_estimate);
    }

    /// HMAC(session_sig_key, packet_hash) proof payload for an inbound DATA
    /// packet, per §4.5's per-packet proof contract.
    fn prove_data_packet(&self, data_packet: &Packet, session_keys: &[u8]) -> Vec<u8> {
        let sig_key = &session_keys[session_keys.len() / 2..];
        let packet_hash = data_packet.get_hash();
        let tag = hmac_sha256(sig_key, packet_hash.as_bytes());

        let mut payload = Vec::with_capacity(Hash16::LEN + 32);
        payload.extend_from_slice(packet_hash.as_bytes());
        payload.extend_from_slice(&tag);
        payload
    }

    /// Dispatches one inbound packet addressed to this link's id (or, for
    /// the initiator's pending handshake, addressed to the destination).
    pub fn handle_packet(self: &Arc<Self>, packet: &Packet) -> Result<LinkEvent> {
        match (packet.header.packet_type, packet.context) {
            (PacketType::Proof, PacketContext::LinkRequestProof) => {
                self.complete_handshake(packet)?;
                Ok(LinkEvent::Activated)
            }
            (PacketType::Proof, PacketContext::LinkProof) => {
                self.handle_packet_proof(packet);
                Ok(LinkEvent::Noop)
            }
            (PacketType::Data, PacketContext::None) => self.handle_data(packet).map(LinkEvent::Data),
            (PacketType::Data, PacketContext::KeepAlive) => self.handle_keep_alive(packet),
            (PacketType::Data, ctx @ (PacketContext::ResourceAdvertise
                | PacketContext::ResourceSegment
                | PacketContext::ResourceProof)) => {
                self.handle_data(packet).map(|plaintext| LinkEvent::Resource(ctx, plaintext))
            }
            _ => {
                log::debug!("link {}: ignoring packet type/context combination", self.id);
                Ok(LinkEvent::Noop)
            }
        }
    }

    fn handle_packet_proof(&self, proof_packet: &Packet) {
        if proof_packet.payload.len() != Hash16::LEN + 32 {
            return;
        }
        let (hash_bytes, tag) = proof_packet.payload.split_at(Hash16::LEN);
        let Some(packet_hash) = Hash16::from_slice(hash_bytes) else { return };

        let mut state = self.state.lock().expect("link state mutex poisoned");
        let Some(session_keys) = state.session_keys.clone() else { return };
        let sig_key = session_keys[session_keys.len() / 2..].to_vec();

        if !hmac_sha256_verify(&sig_key, packet_hash.as_bytes(), tag) {
            log::warn!("link {}: packet proof hmac mismatch", self.id);
            return;
        }

        if let Some((receipt, _)) = state.outstanding.remove(&packet_hash) {
            state.rtt.observe(receipt.elapsed());
            drop(state);
            receipt.mark_delivered();
        }
    }

    fn handle_data(self: &Arc<Self>, data_packet: &Packet) -> Result<Vec<u8>> {
        let mut state = self.state.lock().expect("link state mutex poisoned");
        if state.status != LinkStatus::Active {
            return Err(LinkError::NotReady);
        }
        let session_keys = state.session_keys.clone().expect("active link always has session keys");
        state.last_activity = Instant::now();
        drop(state);

        let plaintext = token::decrypt(KeyMode::Aes256, &session_keys, &data_packet.payload)?;

        let proof_payload = self.prove_data_packet(data_packet, &session_keys);
        let proof = Packet::new(PacketType::Proof, RoutingTag::Link(self.id), PacketContext::LinkProof, proof_payload);
        if let Ok(wire) = proof.serialize(self.interface.mdu()) {
            let _ = self.interface.send_raw(&wire);
        }

        Ok(plaintext)
    }

    fn handle_keep_alive(&self, packet: &Packet) -> Result<LinkEvent> {
        let mut state = self.state.lock().expect("link state mutex poisoned");
        state.last_activity = Instant::now();
        drop(state);

        match packet.payload.first() {
            Some(0xFF) => {
                let pong = Packet::new(
                    PacketType::Data,
                    RoutingTag::Link(self.id),
                    PacketContext::KeepAlive,
                    vec![0xFE],
                );
                if let Ok(wire) = pong.serialize(self.interface.mdu()) {
                    let _ = self.interface.send_raw(&wire);
                }
                Ok(LinkEvent::KeepAliveRequest)
            }
            _ => Ok(LinkEvent::Noop),
        }
    }

    /// Checks whether the link has gone quiet long enough to step down to
    /// STALE, or from STALE to CLOSED. Meant to be driven by an external
    /// periodic sweep (one thread can own many links), not a per-link timer,
    /// since staleness is cheap to poll and doesn't need wheel precision.
    pub fn check_staleness(self: &Arc<Self>) {
        let mut state = self.state.lock().expect("link state mutex poisoned");
        match state.status {
            LinkStatus::Active if state.last_activity.elapsed() > KEEPALIVE_TIMEOUT => {
                state.status = LinkStatus::Stale;
                log::debug!("link {}: went stale", self.id);
            }
            LinkStatus::Stale if state.last_activity.elapsed() > KEEPALIVE_TIMEOUT + STALE_GRACE => {
                drop(state);
                self.close();
            }
            _ => {}
        }
    }

    pub fn close(self: &Arc<Self>) {
        let mut state = self.state.lock().expect("link state mutex poisoned");
        if state.status.is_terminal() {
            return;
        }
        state.status = LinkStatus::Closed;
        let outstanding: Vec<_> = state.outstanding.drain().map(|(_, (r, _))| r).collect();
        drop(state);

        for receipt in outstanding {
            receipt.mark_failed();
        }
        self.scheduler.shutdown();
        log::info!("link {}: closed", self.id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use destination::{DestinationName, ProofStrategy, SingleInputDestination, SingleOutputDestination};
    use identity::PrivateIdentity;
    use iface::LoopbackInterface;
    use std::sync::mpsc;
    use std::time::Duration;

    fn signing_key_of(identity: &PrivateIdentity) -> SigningKey {
        SigningKey::from_bytes(&identity.to_private_bytes()[32..64].try_into().unwrap())
    }

    #[test]
    fn full_handshake_over_loopback_then_data_round_trips() {
        let server_identity = PrivateIdentity::new();
        let name = DestinationName::new("rns_unit_tests", &["link"]).unwrap();
        let server_input = SingleInputDestination::new(name.clone(), server_identity, ProofStrategy::ProveAll);
        let client_output = SingleOutputDestination::new(name, server_input.identity().public());

        let client_iface = LoopbackInterface::new("client");
        let server_iface = LoopbackInterface::new("server");

        // wire the two loopbacks directly to each other's packet parsers
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

        let owned_desc = server_input.desc();
        let (server_link, proof_bytes) = Link::accept_request(
            &request_packet,
            &owned_desc,
            signing_key_of(server_input.identity()),
            server_iface.clone(),
        )
        .unwrap();
        server_iface.send_raw(&proof_bytes).unwrap();

        let received_proof = to_client_rx.recv_timeout(Duration::from_secs(1)).unwrap();
        let proof_packet = Packet::parse(&received_proof).unwrap();
        assert!(matches!(client_link.handle_packet(&proof_packet).unwrap(), LinkEvent::Activated));
        assert_eq!(client_link.status(), LinkStatus::Active);
        assert_eq!(server_link.status(), LinkStatus::Active);

        let (receipt, data_bytes) = client_link.send(b"hello over the link").unwrap();
        client_iface.send_raw(&data_bytes).unwrap();

        let received_data = to_server_rx.recv_timeout(Duration::from_secs(1)).unwrap();
        let data_packet = Packet::parse(&received_data).unwrap();
        let event = server_link.handle_packet(&data_packet).unwrap();
        match event {
            LinkEvent::Data(plaintext) => assert_eq!(plaintext, b"hello over the link"),
            _ => panic!("expected Data event"),
        }

        let received_proof_of_data = to_client_rx.recv_timeout(Duration::from_secs(1)).unwrap();
        let proof_of_data = Packet::parse(&received_proof_of_data).unwrap();
        client_link.handle_packet(&proof_of_data).unwrap();

        assert_eq!(receipt.state(), crate::receipt::ReceiptState::Delivered);
    }
}
