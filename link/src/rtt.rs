//! EWMA round-trip estimator, seeded on handshake proof arrival (§4.5).

use std::time::Duration;

const ALPHA: f64 = 0.2;

#[derive(Debug, Clone, Copy)]
pub struct RttEstimator {
    estimate: Option<Duration>,
}

impl RttEstimator {
    pub fn new() -> Self {
        RttEstimator { estimate: None }
    }

    pub fn seed(&mut self, sample: Duration) {
        self.estimate = Some(sample);
    }

    pub fn observe(&mut self, sample: Duration) {
        self.estimate = Some(match self.estimate {
            None => sample,
            Some(prev) => {
                let prev_s = prev.as_secs_f64();
                let sample_s = sample.as_secs_f64();
                Duration::from_secs_f64(ALPHA * sample_s + (1.0 - ALPHA) * prev_s)
            }
        });
    }

    pub fn get(&self) -> Option<Duration> {
        self.estimate
    }

    /// Retry timeout for attempt `tries` (1-indexed): the RTT estimate (or a
    /// conservative default before one exists), doubled per attempt, per
    /// §4.5's "exponential back-off, maximum 5 tries".
    pub fn timeout_for(&self, tries: u32) -> Duration {
        let base = self.estimate.unwrap_or(Duration::from_secs(2));
        base * 2u32.saturating_pow(tries.saturating_sub(1).min(5))
    }
}

impl Default for RttEstimator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unseeded_estimator_has_no_value() {
        assert!(RttEstimator::new().get().is_none());
    }

    #[test]
    fn observe_converges_toward_repeated_samples() {
        let mut rtt = RttEstimator::new();
        rtt.seed(Duration::from_millis(100));
        for _ in 0..50 {
            rtt.observe(Duration::from_millis(300));
        }
        let estimate = rtt.get().unwrap();
        assert!(estimate.as_millis() > 290, "estimate should converge near 300ms, got {:?}", estimate);
    }

    #[test]
    fn timeout_backs_off_with_tries() {
        let mut rtt = RttEstimator::new();
        rtt.seed(Duration::from_millis(100));
        let first = rtt.timeout_for(1);
        let third = rtt.timeout_for(3);
        assert!(third > first);
    }
}
