//! An in-process interface that hands every sent frame straight back to its
//! own receive callback on a dedicated delivery thread. Used by tests and
//! the loopback demo in place of a real carrier.

use crate::error::{InterfaceError, Result};
use crate::interface::{Interface, ReceiveCallback};
use packet::DEFAULT_MTU;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Sender};
use std::sync::Mutex;
use std::thread;

pub struct LoopbackInterface {
    name: String,
    mdu: usize,
    online: AtomicBool,
    tx: Sender<Vec<u8>>,
    callback: Mutex<Option<ReceiveCallback>>,
}

impl LoopbackInterface {
    /// Spawns the delivery thread and returns an interface ready to attach.
    /// `callback` is usually set right after construction via
    /// `set_receive_callback`, since the delivery thread only starts
    /// invoking it once a callback is present.
    pub fn new(name: impl Into<String>) -> std::sync::Arc<Self> {
        let (tx, rx) = mpsc::channel::<Vec<u8>>();
        let iface = std::sync::Arc::new(LoopbackInterface {
            name: name.into(),
            mdu: DEFAULT_MTU,
            online: AtomicBool::new(true),
            tx,
            callback: Mutex::new(None),
        });

        let worker = std::sync::Arc::clone(&iface);
        thread::Builder::new()
            .name(format!("loopback-{}", worker.name))
            .spawn(move || {
                for frame in rx {
                    let callback = worker.callback.lock().expect("loopback callback mutex poisoned");
                    if let Some(cb) = callback.as_ref() {
                        cb(frame);
                    } else {
                        log::debug!("loopback {}: dropped frame, no receive callback registered", worker.name);
                    }
                }
            })
            .expect("failed to spawn loopback delivery thread");

        iface
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }
}

impl Interface for LoopbackInterface {
    fn name(&self) -> &str {
        &self.name
    }

    fn mdu(&self) -> usize {
        self.mdu
    }

    fn bitrate(&self) -> Option<u64> {
        None
    }

    fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    fn send_raw(&self, bytes: &[u8]) -> Result<()> {
        if !self.is_online() {
            return Err(InterfaceError::Offline(self.name.clone()));
        }
        if bytes.len() > self.mdu {
            return Err(InterfaceError::ExceedsMdu { len: bytes.len(), mdu: self.mdu });
        }
        self.tx.send(bytes.to_vec()).expect("loopback delivery thread died");
        Ok(())
    }

    fn set_receive_callback(&self, callback: ReceiveCallback) {
        *self.callback.lock().expect("loopback callback mutex poisoned") = Some(callback);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::time::Duration;

    #[test]
    fn sent_frames_arrive_at_the_callback() {
        let iface = LoopbackInterface::new("test0");
        let (tx, rx) = mpsc::channel();
        iface.set_receive_callback(Box::new(move |frame| {
            tx.send(frame).unwrap();
        }));

        iface.send_raw(b"hello").unwrap();
        let received = rx.recv_timeout(Duration::from_secs(1)).unwrap();
        assert_eq!(received, b"hello");
    }

    #[test]
    fn offline_interface_rejects_sends() {
        let iface = LoopbackInterface::new("test1");
        iface.set_online(false);
        assert!(iface.send_raw(b"hello").is_err());
    }

    #[test]
    fn oversize_frame_is_rejected() {
        let iface = LoopbackInterface::new("test2");
        assert!(iface.send_raw(&vec![0u8; iface.mdu() + 1]).is_err());
    }
}
