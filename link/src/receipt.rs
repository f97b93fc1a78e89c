//! `PacketReceipt`: the handle `Link::send` hands back, resolved by the
//! retry/proof machinery on delivery, timeout, or teardown.

use common_types::Hash16;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiptState {
    InFlight,
    Delivered,
    Failed,
}

type Callback = Box<dyn FnOnce(ReceiptState) + Send>;

struct Inner {
    state: ReceiptState,
    packet_hash: Hash16,
    sent_at: Instant,
    tries: u32,
    on_delivered: Option<Callback>,
    on_timed_out: Option<Callback>,
}

/// Cloneable handle to one outstanding packet's delivery outcome. Cloning
/// shares the same underlying state; only the owning `Channel`/`Link`
/// machinery resolves it.
#[derive(Clone)]
pub struct PacketReceipt {
    inner: Arc<Mutex<Inner>>,
}

impl PacketReceipt {
    pub fn new(packet_hash: Hash16) -> Self {
        PacketReceipt {
            inner: Arc::new(Mutex::new(Inner {
                state: ReceiptState::InFlight,
                packet_hash,
                sent_at: Instant::now(),
                tries: 1,
                on_delivered: None,
                on_timed_out: None,
            })),
        }
    }

    pub fn packet_hash(&self) -> Hash16 {
        self.inner.lock().expect("receipt mutex poisoned").packet_hash
    }

    pub fn state(&self) -> ReceiptState {
        self.inner.lock().expect("receipt mutex poisoned").state
    }

    pub fn tries(&self) -> u32 {
        self.inner.lock().expect("receipt mutex poisoned").tries
    }

    pub fn elapsed(&self) -> Duration {
        self.inner.lock().expect("receipt mutex poisoned").sent_at.elapsed()
    }

    pub fn on_delivered(&self, cb: impl FnOnce(ReceiptState) + Send + 'static) {
        let mut inner = self.inner.lock().expect("receipt mutex poisoned");
        if inner.state == ReceiptState::Delivered {
            drop(inner);
            cb(ReceiptState::Delivered);
        } else {
            inner.on_delivered = Some(Box::new(cb));
        }
    }

    pub fn on_timed_out(&self, cb: impl FnOnce(ReceiptState) + Send + 'static) {
        let mut inner = self.inner.lock().expect("receipt mutex poisoned");
        if inner.state == ReceiptState::Failed {
            drop(inner);
            cb(ReceiptState::Failed);
        } else {
            inner.on_timed_out = Some(Box::new(cb));
        }
    }

    /// Called by the proof-matching path when a Link-context PROOF packet's
    /// HMAC matches this receipt's packet hash.
    pub fn mark_delivered(&self) {
        let cb = {
            let mut inner = self.inner.lock().expect("receipt mutex poisoned");
            if inner.state != ReceiptState::InFlight {
                return;
            }
            inner.state = ReceiptState::Delivered;
            inner.on_delivered.take()
        };
        if let Some(cb) = cb {
            cb(ReceiptState::Delivered);
        }
    }

    /// Called by the retry scheduler when `tries` has hit the maximum.
    pub fn mark_failed(&self) {
        let cb = {
            let mut inner = self.inner.lock().expect("receipt mutex poisoned");
            if inner.state != ReceiptState::InFlight {
                return;
            }
            inner.state = ReceiptState::Failed;
            inner.on_timed_out.take()
        };
        if let Some(cb) = cb {
            cb(ReceiptState::Failed);
        }
    }

    pub fn bump_tries(&self) -> u32 {
        let mut inner = self.inner.lock().expect("receipt mutex poisoned");
        inner.tries += 1;
        inner.tries
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;

    #[test]
    fn delivered_callback_fires_once() {
        let receipt = PacketReceipt::new(Hash16::from([0u8; 16]));
        let (tx, rx) = mpsc::channel();
        receipt.on_delivered(move |state| tx.send(state).unwrap());

        receipt.mark_delivered();
        receipt.mark_delivered();

        assert_eq!(rx.try_recv().unwrap(), ReceiptState::Delivered);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn late_registered_callback_fires_immediately_if_already_resolved() {
        let receipt = PacketReceipt::new(Hash16::from([0u8; 16]));
        receipt.mark_failed();

        let (tx, rx) = mpsc::channel();
        receipt.on_timed_out(move |state| tx.send(state).unwrap());
        assert_eq!(rx.try_recv().unwrap(), ReceiptState::Failed);
    }
}
