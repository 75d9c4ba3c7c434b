use std::fmt;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use tracing::{info, warn};

/// Circuit state for one external dependency.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Healthy, calls pass through.
    Closed,
    /// Too many failures, calls are rejected until the recovery timeout.
    Open,
    /// Recovery window: calls are allowed, one failure re-trips.
    HalfOpen,
}

#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures before tripping Closed -> Open.
    pub failure_threshold: u32,
    /// Time in Open before a probe is allowed (Open -> HalfOpen).
    pub recovery_timeout: Duration,
    /// Consecutive successes in HalfOpen required to close again.
    pub success_threshold: u32,
}

/// Rejection returned while the circuit is open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitOpenError {
    pub name: &'static str,
}

impl fmt::Display for CircuitOpenError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "circuit {} is open", self.name)
    }
}

impl std::error::Error for CircuitOpenError {}

#[derive(Debug)]
struct BreakerInner {
    state: CircuitState,
    consecutive_failures: u32,
    consecutive_successes: u32,
    last_failure_at: Option<Instant>,
}

/// Three-state failure gate guarding one failure-prone external service.
#[derive(Debug)]
pub struct CircuitBreaker {
    name: &'static str,
    config: CircuitBreakerConfig,
    inner: Mutex<BreakerInner>,
}

impl CircuitBreaker {
    pub fn new(name: &'static str, config: CircuitBreakerConfig) -> Self {
        Self {
            name,
            config,
            inner: Mutex::new(BreakerInner {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                consecutive_successes: 0,
                last_failure_at: None,
            }),
        }
    }

    /// Breaker in front of the public search endpoint.
    pub fn search() -> Self {
        Self::new(
            "search",
            CircuitBreakerConfig {
                failure_threshold: 5,
                recovery_timeout: Duration::from_secs(60),
                success_threshold: 2,
            },
        )
    }

    /// Breaker in front of general HTTP probing.
    pub fn http() -> Self {
        Self::new(
            "http",
            CircuitBreakerConfig {
                failure_threshold: 10,
                recovery_timeout: Duration::from_secs(30),
                success_threshold: 3,
            },
        )
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Gate one call. In Open state the call is rejected until the recovery
    /// timeout has elapsed, at which point the breaker moves to HalfOpen and
    /// lets the probe through.
    pub fn try_acquire(&self) -> Result<(), CircuitOpenError> {
        let mut inner = self.inner.lock().unwrap();

        match inner.state {
            CircuitState::Closed | CircuitState::HalfOpen => Ok(()),
            CircuitState::Open => {
                let elapsed = inner
                    .last_failure_at
                    .map(|t| t.elapsed())
                    .unwrap_or(Duration::MAX);

                if elapsed >= self.config.recovery_timeout {
                    inner.state = CircuitState::HalfOpen;
                    inner.consecutive_successes = 0;
                    info!("[CIRCUIT] {}: OPEN -> HALF_OPEN (testing recovery)", self.name);
                    Ok(())
                } else {
                    Err(CircuitOpenError { name: self.name })
                }
            }
        }
    }

    pub fn record_success(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.consecutive_failures = 0;

        if inner.state == CircuitState::HalfOpen {
            inner.consecutive_successes += 1;
            if inner.consecutive_successes >= self.config.success_threshold {
                inner.state = CircuitState::Closed;
                info!("[CIRCUIT] {}: HALF_OPEN -> CLOSED (recovered)", self.name);
            }
        }
    }

    pub fn record_failure(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.consecutive_failures += 1;
        inner.last_failure_at = Some(Instant::now());

        match inner.state {
            CircuitState::HalfOpen => {
                // a single failure during recovery re-trips
                inner.state = CircuitState::Open;
                warn!("[CIRCUIT] {}: HALF_OPEN -> OPEN (still failing)", self.name);
            }
            CircuitState::Closed => {
                if inner.consecutive_failures >= self.config.failure_threshold {
                    inner.state = CircuitState::Open;
                    warn!("[CIRCUIT] {}: CLOSED -> OPEN (threshold reached)", self.name);
                }
            }
            CircuitState::Open => {}
        }
    }

    /// Current state without triggering the Open -> HalfOpen transition.
    pub fn state(&self) -> CircuitState {
        self.inner.lock().unwrap().state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_breaker(threshold: u32, recovery: Duration, successes: u32) -> CircuitBreaker {
        CircuitBreaker::new(
            "test",
            CircuitBreakerConfig {
                failure_threshold: threshold,
                recovery_timeout: recovery,
                success_threshold: successes,
            },
        )
    }

    #[test]
    fn stays_closed_below_threshold() {
        let breaker = make_breaker(3, Duration::from_secs(60), 2);
        breaker.record_failure();
        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Closed);
        assert!(breaker.try_acquire().is_ok());
    }

    #[test]
    fn trips_open_at_threshold_and_rejects() {
        let breaker = make_breaker(3, Duration::from_secs(600), 2);
        for _ in 0..3 {
            breaker.record_failure();
        }
        assert_eq!(breaker.state(), CircuitState::Open);

        let err = breaker.try_acquire().unwrap_err();
        assert_eq!(err.name, "test");
    }

    #[test]
    fn open_transitions_to_half_open_after_recovery() {
        let breaker = make_breaker(1, Duration::ZERO, 2);
        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Open);

        assert!(breaker.try_acquire().is_ok());
        assert_eq!(breaker.state(), CircuitState::HalfOpen);
    }

    #[test]
    fn half_open_failure_retrips_immediately() {
        let breaker = make_breaker(3, Duration::ZERO, 2);
        for _ in 0..3 {
            breaker.record_failure();
        }
        let _ = breaker.try_acquire(); // -> HalfOpen
        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Open);
    }

    #[test]
    fn closes_after_enough_half_open_successes() {
        let breaker = make_breaker(1, Duration::ZERO, 2);
        breaker.record_failure();
        let _ = breaker.try_acquire(); // -> HalfOpen

        breaker.record_success();
        assert_eq!(breaker.state(), CircuitState::HalfOpen);
        breaker.record_success();
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[test]
    fn success_resets_consecutive_failures() {
        let breaker = make_breaker(3, Duration::from_secs(60), 2);
        breaker.record_failure();
        breaker.record_failure();
        breaker.record_success();
        // counting starts over
        breaker.record_failure();
        breaker.record_failure();
        assert_eq!(breaker.state(), CircuitState::Closed);
    }

    #[test]
    fn preconfigured_instances() {
        let search = CircuitBreaker::search();
        assert_eq!(search.name(), "search");
        assert_eq!(search.config.failure_threshold, 5);
        assert_eq!(search.config.recovery_timeout, Duration::from_secs(60));
        assert_eq!(search.config.success_threshold, 2);

        let http = CircuitBreaker::http();
        assert_eq!(http.name(), "http");
        assert_eq!(http.config.failure_threshold, 10);
        assert_eq!(http.config.recovery_timeout, Duration::from_secs(30));
        assert_eq!(http.config.success_threshold, 3);
    }
}
