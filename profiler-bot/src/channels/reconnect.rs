//! Reconnect policy for the gateway session: exponential backoff guarded
//! by a circuit breaker.
//!
//! Every failed session doubles the wait up to a cap. After `threshold`
//! consecutive failures the breaker opens and the next attempt waits out the
//! full cooldown; that attempt is a half-open trial, and failing it reopens
//! the breaker immediately.

use std::time::{Duration, Instant};

use crate::config::ReconnectConfig;

#[derive(Debug)]
pub struct Backoff {
    base: Duration,
    max: Duration,
    attempt: u32,
}

impl Backoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self { base, max, attempt: 0 }
    }

    /// Delay before the next attempt; doubles each call until `max`
    pub fn next_delay(&mut self) -> Duration {
        let factor = 2u32.checked_pow(self.attempt).unwrap_or(u32::MAX);
        self.attempt = self.attempt.saturating_add(1);
        self.base.saturating_mul(factor).min(self.max)
    }

    pub fn reset(&mut self) {
        self.attempt = 0;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    Closed,
    Open { until: Instant },
    HalfOpen,
}

#[derive(Debug)]
pub struct CircuitBreaker {
    threshold: u32,
    cooldown: Duration,
    consecutive_failures: u32,
    state: BreakerState,
}

impl CircuitBreaker {
    pub fn new(threshold: u32, cooldown: Duration) -> Self {
        Self {
            threshold: threshold.max(1),
            cooldown,
            consecutive_failures: 0,
            state: BreakerState::Closed,
        }
    }

    /// Current state; an expired open breaker becomes half-open
    pub fn state(&mut self, now: Instant) -> BreakerState {
        if let BreakerState::Open { until } = self.state {
            if now >= until {
                self.state = BreakerState::HalfOpen;
            }
        }
        self.state
    }

    pub fn record_failure(&mut self, now: Instant) {
        let was_half_open = self.state(now) == BreakerState::HalfOpen;
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);

        if was_half_open || self.consecutive_failures >= self.threshold {
            self.state = BreakerState::Open {
                until: now + self.cooldown,
            };
            log::warn!(
                "Discord: Circuit open after {} consecutive failures, cooling down for {}s",
                self.consecutive_failures,
                self.cooldown.as_secs()
            );
        }
    }

    pub fn record_success(&mut self) {
        self.consecutive_failures = 0;
        self.state = BreakerState::Closed;
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }
}

#[derive(Debug)]
pub struct ReconnectPolicy {
    backoff: Backoff,
    breaker: CircuitBreaker,
}

impl ReconnectPolicy {
    pub fn new(config: &ReconnectConfig) -> Self {
        Self {
            backoff: Backoff::new(config.base_delay, config.max_delay),
            breaker: CircuitBreaker::new(config.failure_threshold, config.cooldown),
        }
    }

    /// Record a failed session and return how long to wait before the next one
    pub fn on_failure(&mut self, now: Instant) -> Duration {
        self.breaker.record_failure(now);
        match self.breaker.state(now) {
            BreakerState::Open { until } => {
                self.backoff.reset();
                until.saturating_duration_since(now)
            }
            BreakerState::Closed | BreakerState::HalfOpen => self.backoff.next_delay(),
        }
    }

    /// A session stayed up long enough to count as healthy
    pub fn on_healthy(&mut self) {
        self.backoff.reset();
        self.breaker.record_success();
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.breaker.consecutive_failures()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(threshold: u32) -> ReconnectConfig {
        ReconnectConfig {
            base_delay: Duration::from_secs(5),
            max_delay: Duration::from_secs(60),
            failure_threshold: threshold,
            cooldown: Duration::from_secs(900),
        }
    }

    #[test]
    fn test_backoff_doubles_to_cap() {
        let mut backoff = Backoff::new(Duration::from_secs(5), Duration::from_secs(60));
        let delays: Vec<u64> = (0..6).map(|_| backoff.next_delay().as_secs()).collect();
        assert_eq!(delays, vec![5, 10, 20, 40, 60, 60]);

        backoff.reset();
        assert_eq!(backoff.next_delay(), Duration::from_secs(5));
    }

    #[test]
    fn test_backoff_does_not_overflow() {
        let mut backoff = Backoff::new(Duration::from_secs(1), Duration::from_secs(300));
        for _ in 0..100 {
            assert!(backoff.next_delay() <= Duration::from_secs(300));
        }
    }

    #[test]
    fn test_breaker_opens_at_threshold() {
        let now = Instant::now();
        let mut breaker = CircuitBreaker::new(3, Duration::from_secs(900));
        breaker.record_failure(now);
        breaker.record_failure(now);
        assert_eq!(breaker.state(now), BreakerState::Closed);

        breaker.record_failure(now);
        assert_eq!(
            breaker.state(now),
            BreakerState::Open {
                until: now + Duration::from_secs(900)
            }
        );
        assert_eq!(
            breaker.state(now + Duration::from_secs(900)),
            BreakerState::HalfOpen
        );
    }

    #[test]
    fn test_half_open_failure_reopens() {
        let now = Instant::now();
        let mut breaker = CircuitBreaker::new(1, Duration::from_secs(10));
        breaker.record_failure(now);

        let later = now + Duration::from_secs(11);
        assert_eq!(breaker.state(later), BreakerState::HalfOpen);
        breaker.record_failure(later);
        assert_eq!(
            breaker.state(later),
            BreakerState::Open {
                until: later + Duration::from_secs(10)
            }
        );
    }

    #[test]
    fn test_success_closes_breaker() {
        let now = Instant::now();
        let mut breaker = CircuitBreaker::new(1, Duration::from_secs(10));
        breaker.record_failure(now);
        breaker.record_success();
        assert_eq!(breaker.state(now), BreakerState::Closed);
        assert_eq!(breaker.consecutive_failures(), 0);
    }

    #[test]
    fn test_policy_backs_off_then_cools_down() {
        let now = Instant::now();
        let mut policy = ReconnectPolicy::new(&config(3));

        assert_eq!(policy.on_failure(now), Duration::from_secs(5));
        assert_eq!(policy.on_failure(now), Duration::from_secs(10));
        // Third failure opens the breaker: wait out the cooldown
        assert_eq!(policy.on_failure(now), Duration::from_secs(900));

        // Half-open trial fails: straight back to a full cooldown
        let later = now + Duration::from_secs(900);
        assert_eq!(policy.on_failure(later), Duration::from_secs(900));
        assert_eq!(policy.consecutive_failures(), 4);
    }

    #[test]
    fn test_policy_resets_after_healthy_session() {
        let now = Instant::now();
        let mut policy = ReconnectPolicy::new(&config(5));
        policy.on_failure(now);
        policy.on_failure(now);
        policy.on_healthy();

        assert_eq!(policy.consecutive_failures(), 0);
        assert_eq!(policy.on_failure(now), Duration::from_secs(5));
    }
}
