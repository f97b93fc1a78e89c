//! One timer-wheel thread per `Link`, replacing a thread-per-timeout design
//! with a single thread holding a min-heap of pending deadlines. Used for
//! retry scheduling (§4.5's exponential back-off) and the STALE/teardown
//! timeouts.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashSet};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::Instant;

type Action = Box<dyn FnOnce() + Send>;

enum Command {
    Schedule { at: Instant, id: u64, action: Action },
    Cancel(u64),
    Shutdown,
}

pub struct RetryScheduler {
    tx: Sender<Command>,
    next_id: std::sync::atomic::AtomicU64,
}

/// A scheduled timeout. Drop has no effect; call `cancel()` explicitly to
/// suppress a pending action.
#[derive(Clone, Copy)]
pub struct TimerHandle(u64);

impl RetryScheduler {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        spawn_worker(rx);
        RetryScheduler { tx, next_id: std::sync::atomic::AtomicU64::new(1) }
    }

    pub fn schedule(&self, at: Instant, action: impl FnOnce() + Send + 'static) -> TimerHandle {
        let id = self.next_id.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
        let _ = self.tx.send(Command::Schedule { at, id, action: Box::new(action) });
        TimerHandle(id)
    }

    pub fn cancel(&self, handle: TimerHandle) {
        let _ = self.tx.send(Command::Cancel(handle.0));
    }

    pub fn shutdown(&self) {
        let _ = self.tx.send(Command::Shutdown);
    }
}

impl Default for RetryScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for RetryScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn spawn_worker(rx: Receiver<Command>) {
    thread::Builder::new()
        .name("link-timer-wheel".into())
        .spawn(move || {
            let mut heap: BinaryHeap<Reverse<(Instant, u64)>> = BinaryHeap::new();
            let mut actions: std::collections::HashMap<u64, Action> = std::collections::HashMap::new();
            let mut cancelled: HashSet<u64> = HashSet::new();

            loop {
                let timeout = heap.peek().map(|Reverse((at, _))| at.saturating_duration_since(Instant::now()));

                let recv_result = match timeout {
                    Some(d) => rx.recv_timeout(d),
                    None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
                };

                match recv_result {
                    Ok(Command::Schedule { at, id, action }) => {
                        actions.insert(id, action);
                        heap.push(Reverse((at, id)));
                    }
                    Ok(Command::Cancel(id)) => {
                        cancelled.insert(id);
                        actions.remove(&id);
                    }
                    Ok(Command::Shutdown) | Err(RecvTimeoutError::Disconnected) => return,
                    Err(RecvTimeoutError::Timeout) => {}
                }

                let now = Instant::now();
                while let Some(&Reverse((at, id))) = heap.peek() {
                    if at > now {
                        break;
                    }
                    heap.pop();
                    if cancelled.remove(&id) {
                        continue;
                    }
                    if let Some(action) = actions.remove(&id) {
                        action();
                    }
                }
            }
        })
        .expect("failed to spawn link timer-wheel thread");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::mpsc;
    use std::time::Duration;

    #[test]
    fn fires_after_deadline() {
        let scheduler = RetryScheduler::new();
        let (tx, rx) = mpsc::channel();
        scheduler.schedule(Instant::now() + Duration::from_millis(20), move || tx.send(()).unwrap());

        rx.recv_timeout(Duration::from_secs(1)).expect("timer should have fired");
    }

    #[test]
    fn cancelled_timer_never_fires() {
        let scheduler = RetryScheduler::new();
        let (tx, rx) = mpsc::channel();
        let handle = scheduler.schedule(Instant::now() + Duration::from_millis(20), move || tx.send(()).unwrap());
        scheduler.cancel(handle);

        assert!(rx.recv_timeout(Duration::from_millis(200)).is_err());
    }
}
