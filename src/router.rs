//! The minimal inbound-routing seam `Link` needs to be driven without a
//! full, multi-hop Transport (§1, §6). A real Transport does path
//! discovery, announce propagation, and multi-hop forwarding; none of that
//! is in scope here. What *is* in scope is the dispatch contract those
//! layers sit on top of: given a raw frame off an `Interface`, decide
//! whether it is a LINKREQUEST addressed to a destination this process
//! owns (mint a responder `Link` and answer with a PROOF) or traffic for
//! an already-established `Link` (hand it `Packet::parse`d bytes and let
//! it sort out handshake completion, data, proofs, and keepalives).
//!
//! `LinkTable` is the process-wide link registry described in §5 ("the
//! destination/link tables are process-wide state ... mutations happen
//! under a Transport lock"); `InboundRouter` adds the destination side of
//! that table and the frame-to-event dispatch logic.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use common_types::{DestinationHash, Hash16};
use destination::{DestinationDesc, ProofStrategy};
use ed25519_dalek::SigningKey;
use iface::SharedInterface;
use link::{Link, LinkEvent};
use packet::{Packet, PacketType, RoutingTag};

/// Process-wide registry of live and pending Links, keyed by link id.
#[derive(Default)]
pub struct LinkTable {
    links: Mutex<HashMap<Hash16, Arc<Link>>>,
}

impl LinkTable {
    pub fn new() -> Self {
        LinkTable { links: Mutex::new(HashMap::new()) }
    }

    pub fn insert(&self, link: Arc<Link>) {
        self.links.lock().expect("link table mutex poisoned").insert(link.id(), link);
    }

    pub fn get(&self, id: Hash16) -> Option<Arc<Link>> {
        self.links.lock().expect("link table mutex poisoned").get(&id).cloned()
    }

    pub fn remove(&self, id: Hash16) -> Option<Arc<Link>> {
        self.links.lock().expect("link table mutex poisoned").remove(&id)
    }

    pub fn len(&self) -> usize {
        self.links.lock().expect("link table mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drives every table entry's staleness check (§4.5, §5) and drops the
    /// ones that have since closed. Meant to be called periodically by
    /// whatever owns the table, alongside `ResourceRegistry::check_timeouts`.
    pub fn sweep(&self) {
        let links: Vec<_> = self.links.lock().expect("link table mutex poisoned").values().cloned().collect();
        for link in &links {
            link.check_staleness();
        }
        self.links.lock().expect("link table mutex poisoned").retain(|_, link| !link.status().is_terminal());
    }
}

struct OwnedDestination {
    desc: DestinationDesc,
    signing_key: SigningKey,
    proof_strategy: ProofStrategy,
}

/// Everything a process needs to answer inbound LINKREQUESTs and keep
/// routing traffic to the Links that result, without a real Transport in
/// front of it: a table of destinations this process holds the private
/// half of, and the live link table those destinations' Links end up in.
pub struct InboundRouter {
    destinations: Mutex<HashMap<DestinationHash, OwnedDestination>>,
    links: LinkTable,
}

impl InboundRouter {
    pub fn new() -> Arc<Self> {
        Arc::new(InboundRouter { destinations: Mutex::new(HashMap::new()), links: LinkTable::new() })
    }

    pub fn links(&self) -> &LinkTable {
        &self.links
    }

    /// Registers a SINGLE destination this process owns the identity for,
    /// so inbound LINKREQUESTs addressed to its hash get answered.
    pub fn register_destination(&self, desc: DestinationDesc, signing_key: SigningKey, proof_strategy: ProofStrategy) {
        let hash = desc.address_hash;
        self.destinations
            .lock()
            .expect("destination table mutex poisoned")
            .insert(hash, OwnedDestination { desc, signing_key, proof_strategy });
    }

    pub fn unregister_destination(&self, hash: DestinationHash) {
        self.destinations.lock().expect("destination table mutex poisoned").remove(&hash);
    }

    /// Parses `frame` and routes it to the right place:
    ///
    /// - A LINKREQUEST addressed to an owned destination mints a responder
    ///   `Link`, registers it in the link table, sends the PROOF back over
    ///   `interface`, and returns `(link, LinkEvent::Activated)`.
    /// - Anything tagged with a known link id is handed to that `Link`;
    ///   `Closed` events evict the link from the table.
    /// - Malformed frames, LINKREQUESTs for destinations this process
    ///   doesn't own, and traffic for unknown link ids are dropped and
    ///   logged at debug level, per §7's "protocol-layer anomalies are
    ///   recovered locally" policy.
    pub fn handle_inbound(&self, frame: &[u8], interface: &SharedInterface) -> Option<(Arc<Link>, LinkEvent)> {
        let packet = match Packet::parse(frame) {
            Ok(packet) => packet,
            Err(e) => {
                log::debug!("router: dropping unparseable frame: {}", e);
                return None;
            }
        };

        match packet.tag {
            RoutingTag::Destination(hash) => {
                if packet.header.packet_type != PacketType::LinkRequest {
                    log::debug!("router: dropping non-linkrequest packet addressed to a destination hash");
                    return None;
                }
                self.accept_link_request(&packet, hash, interface)
            }
            RoutingTag::Link(id) => {
                let link = self.links.get(id)?;
                match link.handle_packet(&packet) {
                    Ok(event) => {
                        if matches!(event, LinkEvent::Closed) {
                            self.links.remove(id);
                        }
                        Some((link, event))
                    }
                    Err(e) => {
                        log::debug!("router: link {} dropped packet: {}", id, e);
                        None
                    }
                }
            }
        }
    }

    fn accept_link_request(
        &self,
        packet: &Packet,
        hash: DestinationHash,
        interface: &SharedInterface,
    ) -> Option<(Arc<Link>, LinkEvent)> {
        let (desc, signing_key, proof_strategy) = {
            let destinations = self.destinations.lock().expect("destination table mutex poisoned");
            let owned = destinations.get(&hash)?;
            (owned.desc.clone(), owned.signing_key.clone(), owned.proof_strategy)
        };

        if proof_strategy == ProofStrategy::ProveNone {
            log::debug!("router: destination {} is configured not to answer linkrequests", hash);
            return None;
        }

        match Link::accept_request(packet, &desc, signing_key, Arc::clone(interface)) {
            Ok((link, proof_bytes)) => {
                self.links.insert(Arc::clone(&link));
                if let Err(e) = interface.send_raw(&proof_bytes) {
                    log::warn!("router: failed to send linkrequest proof: {}", e);
                }
                log::info!("router: accepted link {} on destination {}", link.id(), hash);
                Some((link, LinkEvent::Activated))
            }
            Err(e) => {
                log::debug!("router: rejected linkrequest for {}: {}", hash, e);
                None
            }
        }
    }
}

impl Default for InboundRouter {
    fn default() -> Self {
        InboundRouter { destinations: Mutex::new(HashMap::new()), links: LinkTable::new() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use destination::{DestinationName, SingleInputDestination, SingleOutputDestination};
    use identity::PrivateIdentity;
    use iface::LoopbackInterface;
    use std::sync::mpsc;
    use std::time::Duration;

    #[test]
    fn linkrequest_to_owned_destination_activates_and_registers() {
        let server_identity = PrivateIdentity::new();
        let name = DestinationName::new("rns_unit_tests", &["router"]).unwrap();
        let server_input = SingleInputDestination::new(name.clone(), server_identity, ProofStrategy::ProveAll);
        let client_output = SingleOutputDestination::new(name, server_input.identity().public());

        let client_iface: SharedInterface = LoopbackInterface::new("client");
        let server_iface: SharedInterface = LoopbackInterface::new("server");

        let (to_server_tx, to_server_rx) = mpsc::channel::<Vec<u8>>();
        client_iface.set_receive_callback(Box::new(move |frame| {
            let _ = to_server_tx.send(frame);
        }));
        let (to_client_tx, to_client_rx) = mpsc::channel::<Vec<u8>>();
        server_iface.set_receive_callback(Box::new(move |frame| {
            let _ = to_client_tx.send(frame);
        }));

        let router = InboundRouter::new();
        router.register_destination(
            server_input.desc(),
            server_input.identity().ed25519_signing().clone(),
            server_input.proof_strategy(),
        );

        let (client_link, request_bytes) =
            Link::initiate(client_output.hash(), client_output.identity().clone(), client_iface.clone());
        client_iface.send_raw(&request_bytes).unwrap();

        let received_request = to_server_rx.recv_timeout(Duration::from_secs(1)).unwrap();
        let (_server_link, event) = router.handle_inbound(&received_request, &server_iface).expect("linkrequest should be accepted");
        assert!(matches!(event, LinkEvent::Activated));
        assert_eq!(router.links().len(), 1);

        let received_proof = to_client_rx.recv_timeout(Duration::from_secs(1)).unwrap();
        let proof_packet = Packet::parse(&received_proof).unwrap();
        assert!(matches!(client_link.handle_packet(&proof_packet).unwrap(), LinkEvent::Activated));

        let (_receipt, data_bytes) = client_link.send(b"routed data").unwrap();
        client_iface.send_raw(&data_bytes).unwrap();
        let received_data = to_server_rx.recv_timeout(Duration::from_secs(1)).unwrap();
        let (_server_link, event) = router.handle_inbound(&received_data, &server_iface).expect("data should route to the registered link");
        match event {
            LinkEvent::Data(plaintext) => assert_eq!(plaintext, b"routed data"),
            _ => panic!("expected data event"),
        }
    }

    #[test]
    fn linkrequest_for_unknown_destination_is_dropped() {
        let router = InboundRouter::new();
        let iface: SharedInterface = LoopbackInterface::new("lonely");

        let unrelated_identity = PrivateIdentity::new();
        let name = DestinationName::new("rns_unit_tests", &["router", "unknown"]).unwrap();
        let output = SingleOutputDestination::new(name, unrelated_identity.public());

        let (_client_link, request_bytes) = Link::initiate(output.hash(), output.identity().clone(), iface.clone());
        assert!(router.handle_inbound(&request_bytes, &iface).is_none());
        assert!(router.links().is_empty());
    }

    #[test]
    fn traffic_for_unknown_link_id_is_dropped() {
        let router = InboundRouter::new();
        let iface: SharedInterface = LoopbackInterface::new("solo");

        let tag = RoutingTag::Link(Hash16::from([0x42u8; 16]));
        let packet = Packet::new(PacketType::Data, tag, packet::Context::None, b"nobody home".to_vec());
        let bytes = packet.serialize(iface.mdu()).unwrap();

        assert!(router.handle_inbound(&bytes, &iface).is_none());
    }
}
