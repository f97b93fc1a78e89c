//! Timing-inference mitigation for operations whose underlying
//! implementation cannot be trusted to run in constant time.
//!
//! `x25519-dalek`'s scalar multiplication is constant-time, so the ECDH
//! path does not need this. `ed25519-dalek` signing is not guaranteed
//! constant-time against every side channel, so `Identity::sign` pads its
//! wall-clock duration up to a rolling maximum observed over the last few
//! calls, bounded to [MIN_PAD, MAX_PAD] as required by spec.

use std::collections::VecDeque;
use std::thread;
use std::time::{Duration, Instant};

const MIN_PAD: Duration = Duration::from_millis(2);
const MAX_PAD: Duration = Duration::from_millis(500);
const DEFAULT_WINDOW: usize = 16;

/// Rolling maximum of the last `window` observed durations of some
/// operation. `run` executes the closure, measures it, sleeps to bring the
/// total up to the rolling max (clamped), and folds the fresh sample in.
pub struct TimingPad {
    window: usize,
    samples: VecDeque<Duration>,
    enabled: bool,
}

impl TimingPad {
    pub fn new(enabled: bool) -> Self {
        TimingPad { window: DEFAULT_WINDOW, samples: VecDeque::with_capacity(DEFAULT_WINDOW), enabled }
    }

    pub fn with_window(enabled: bool, window: usize) -> Self {
        TimingPad { window: window.max(1), samples: VecDeque::with_capacity(window.max(1)), enabled }
    }

    fn rolling_max(&self) -> Duration {
        self.samples.iter().copied().max().unwrap_or(MIN_PAD).clamp(MIN_PAD, MAX_PAD)
    }

    fn record(&mut self, d: Duration) {
        if self.samples.len() == self.window {
            self.samples.pop_front();
        }
        self.samples.push_back(d);
    }

    pub fn run<T>(&mut self, f: impl FnOnce() -> T) -> T {
        let target = self.rolling_max();
        let start = Instant::now();
        let result = f();
        let elapsed = start.elapsed();

        self.record(elapsed);

        if self.enabled && elapsed < target {
            thread::sleep(target - elapsed);
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pads_up_to_rolling_max() {
        let mut pad = TimingPad::with_window(true, 4);
        pad.run(|| thread::sleep(Duration::from_millis(5)));
        let start = Instant::now();
        pad.run(|| {});
        assert!(start.elapsed() >= Duration::from_millis(4));
    }

    #[test]
    fn disabled_does_not_sleep() {
        let mut pad = TimingPad::new(false);
        pad.run(|| thread::sleep(Duration::from_millis(5)));
        let start = Instant::now();
        pad.run(|| {});
        assert!(start.elapsed() < Duration::from_millis(5));
    }
}
