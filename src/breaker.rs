//! Circuit breaker over the external control utility.
//!
//! One breaker per control method, owned by the command worker. Consecutive
//! failures trip the breaker open; while open, calls are rejected without
//! spawning a process. After a cooldown a single half-open probe decides
//! whether to close again or re-open with a doubled cooldown.
//!
//! All transitions take an explicit `now` so the state machine is fully
//! deterministic under test.

use std::time::{Duration, Instant};

use tracing::{info, warn};

use crate::error::HardwareError;

/// Per-method breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half-open",
        };
        f.write_str(s)
    }
}

/// Snapshot for diagnostics display.
#[derive(Debug, Clone, PartialEq)]
pub struct CircuitStatus {
    pub state: CircuitState,
    pub consecutive_failures: u32,
    pub trips: u32,
    pub cooldown_remaining: Option<Duration>,
}

pub struct CircuitBreaker {
    method: &'static str,
    threshold: u32,
    base_cooldown: Duration,
    max_cooldown: Duration,
    state: CircuitState,
    consecutive_failures: u32,
    /// Consecutive trips without an intervening success; drives backoff.
    trips: u32,
    cooldown_until: Option<Instant>,
    probe_in_flight: bool,
}

impl CircuitBreaker {
    pub fn new(
        method: &'static str,
        threshold: u32,
        base_cooldown: Duration,
        max_cooldown: Duration,
    ) -> Self {
        Self {
            method,
            threshold: threshold.max(1),
            base_cooldown,
            max_cooldown,
            state: CircuitState::Closed,
            consecutive_failures: 0,
            trips: 0,
            cooldown_until: None,
            probe_in_flight: false,
        }
    }

    /// Ask permission to issue one command.
    ///
    /// Open -> HalfOpen happens here once the cooldown has elapsed; exactly
    /// one probe is admitted until its result is recorded.
    pub fn admit(&mut self, now: Instant) -> Result<(), HardwareError> {
        match self.state {
            CircuitState::Closed => Ok(()),
            CircuitState::Open => {
                let until = self.cooldown_until.unwrap_or(now);
                if now >= until {
                    self.state = CircuitState::HalfOpen;
                    self.probe_in_flight = true;
                    info!(method = self.method, "circuit half-open, admitting probe");
                    Ok(())
                } else {
                    Err(HardwareError::CircuitOpen {
                        method: self.method,
                        retry_in: until - now,
                    })
                }
            }
            CircuitState::HalfOpen => {
                if self.probe_in_flight {
                    Err(HardwareError::CircuitOpen {
                        method: self.method,
                        retry_in: Duration::ZERO,
                    })
                } else {
                    self.probe_in_flight = true;
                    Ok(())
                }
            }
        }
    }

    /// Record a successful command.
    pub fn record_success(&mut self) {
        match self.state {
            CircuitState::Closed => {
                // Failures must be consecutive to trip the breaker.
                self.consecutive_failures = 0;
            }
            CircuitState::HalfOpen => {
                info!(method = self.method, "probe succeeded, circuit closed");
                self.state = CircuitState::Closed;
                self.consecutive_failures = 0;
                self.trips = 0;
                self.cooldown_until = None;
                self.probe_in_flight = false;
            }
            CircuitState::Open => {}
        }
    }

    /// Record a failed or timed-out command.
    pub fn record_failure(&mut self, now: Instant) {
        match self.state {
            CircuitState::Closed => {
                self.consecutive_failures += 1;
                if self.consecutive_failures >= self.threshold {
                    self.trip(now);
                }
            }
            CircuitState::HalfOpen => {
                self.probe_in_flight = false;
                self.trip(now);
            }
            CircuitState::Open => {}
        }
    }

    fn trip(&mut self, now: Instant) {
        self.trips += 1;
        let cooldown = self.current_cooldown();
        self.state = CircuitState::Open;
        self.cooldown_until = Some(now + cooldown);
        warn!(
            method = self.method,
            failures = self.consecutive_failures,
            cooldown = ?cooldown,
            "circuit opened"
        );
    }

    /// Cooldown for the current trip count: base * 2^(trips-1), capped.
    fn current_cooldown(&self) -> Duration {
        let exp = self.trips.saturating_sub(1).min(16);
        let scaled = self.base_cooldown.saturating_mul(1u32 << exp);
        scaled.min(self.max_cooldown)
    }

    pub fn state(&self) -> CircuitState {
        self.state
    }

    pub fn status(&self, now: Instant) -> CircuitStatus {
        CircuitStatus {
            state: self.state,
            consecutive_failures: self.consecutive_failures,
            trips: self.trips,
            cooldown_remaining: self
                .cooldown_until
                .filter(|_| self.state == CircuitState::Open)
                .map(|until| until.saturating_duration_since(now)),
        }
    }
}
