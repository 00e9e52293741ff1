//! Reconnect backoff (§4.2 "Reconnect policy"): exponential with jitter,
//! capped.

use std::time::Duration;

use rand::Rng;

pub struct BackoffPolicy {
    pub base: Duration,
    pub max: Duration,
    pub multiplier: f64,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        BackoffPolicy {
            base: Duration::from_millis(200),
            max: Duration::from_secs(30),
            multiplier: 2.0,
        }
    }
}

pub struct Backoff {
    policy: BackoffPolicy,
    attempt: u32,
}

impl Backoff {
    pub fn new(policy: BackoffPolicy) -> Self {
        Backoff { policy, attempt: 0 }
    }

    /// The delay before the next reconnect attempt, with ±jitter applied
    /// to avoid synchronized reconnect storms across many links.
    pub fn next_delay(&mut self) -> Duration {
        let exp = self.policy.multiplier.powi(self.attempt as i32);
        self.attempt = self.attempt.saturating_add(1);
        let nominal = (self.policy.base.as_secs_f64() * exp).min(self.policy.max.as_secs_f64());
        let jitter_factor = rand::thread_rng().gen_range(0.5..1.5);
        Duration::from_secs_f64((nominal * jitter_factor).min(self.policy.max.as_secs_f64()))
    }

    pub fn reset(&mut self) {
        self.attempt = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_grows_with_attempts_then_is_capped() {
        let mut backoff = Backoff::new(BackoffPolicy {
            base: Duration::from_millis(100),
            max: Duration::from_secs(1),
            multiplier: 2.0,
        });
        for _ in 0..20 {
            assert!(backoff.next_delay() <= Duration::from_secs(2));
        }
    }

    #[test]
    fn reset_restarts_from_the_base_delay() {
        let mut backoff = Backoff::new(BackoffPolicy::default());
        backoff.next_delay();
        backoff.next_delay();
        backoff.reset();
        let delay = backoff.next_delay();
        assert!(delay <= Duration::from_millis(300));
    }
}
