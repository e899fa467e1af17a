//! Monitoring lifecycle: the Stopped → Starting → Running state machine,
//! the elevated-persistence claim, and the restart policy declaration.
//!
//! Availability is best-effort: the manager declares that the hosting
//! environment should restart the process on kill, but restart is not
//! guaranteed — message delivery can have gaps if the process dies and
//! is not relaunched.

use std::sync::{Arc, Mutex, PoisonError};

use thiserror::Error;

use txnwatch_core::types::WatcherState;
use txnwatch_source_sms::source::{DeliveryHandler, MessageSource, SourceError};

// ─── Presence Claim ──────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum PresenceError {
    #[error("presence claim failed: {0}")]
    Claim(String),

    #[error("presence release failed: {0}")]
    Release(String),
}

/// Elevated-persistence claim against the hosting environment — the
/// long-lived presence (ongoing indicator, raised process priority) that
/// keeps the watcher alive across normal lifecycle pressure.
pub trait PresenceClaim: Send + Sync {
    fn acquire(&self) -> Result<(), PresenceError>;
    fn release(&self) -> Result<(), PresenceError>;
}

// ─── Restart Policy ──────────────────────────────────────────────

/// Declarative restart hint for whatever supervises the daemon process.
///
/// Backoff delays are computed here; applying them is the supervisor's
/// job. This is a hint, not a guarantee.
#[derive(Debug, Clone, PartialEq)]
pub struct RestartPolicy {
    /// Whether the supervisor should relaunch the process after an exit.
    pub restart_on_exit: bool,
    /// Initial backoff delay in milliseconds.
    pub initial_backoff_ms: u64,
    /// Backoff multiplier per attempt.
    pub multiplier: f64,
    /// Maximum backoff delay in milliseconds.
    pub max_backoff_ms: u64,
}

impl Default for RestartPolicy {
    fn default() -> Self {
        Self {
            restart_on_exit: true,
            initial_backoff_ms: 1_000,
            multiplier: 2.0,
            max_backoff_ms: 30_000,
        }
    }
}

impl RestartPolicy {
    /// Backoff delay for a zero-based restart attempt, capped at
    /// `max_backoff_ms`.
    pub fn backoff_ms(&self, attempt: u32) -> u64 {
        let factor = self.multiplier.powi(attempt.min(63) as i32);
        let delay = (self.initial_backoff_ms as f64) * factor;
        if !delay.is_finite() || delay >= self.max_backoff_ms as f64 {
            self.max_backoff_ms
        } else {
            delay as u64
        }
    }
}

// ─── Lifecycle Manager ───────────────────────────────────────────

#[derive(Debug, Error)]
pub enum StartError {
    #[error("watcher registration failed: {0}")]
    Registration(#[from] SourceError),
}

/// Owns the watcher's running state and the start/stop control surface.
///
/// One mutex guards all state transitions: start/stop may be invoked from
/// the host's control thread while deliveries arrive on another.
pub struct LifecycleManager {
    state: Mutex<WatcherState>,
    source: Arc<dyn MessageSource>,
    presence: Arc<dyn PresenceClaim>,
    handler: Arc<dyn DeliveryHandler>,
    restart: RestartPolicy,
}

impl LifecycleManager {
    pub fn new(
        source: Arc<dyn MessageSource>,
        presence: Arc<dyn PresenceClaim>,
        handler: Arc<dyn DeliveryHandler>,
    ) -> Self {
        Self::with_restart_policy(source, presence, handler, RestartPolicy::default())
    }

    pub fn with_restart_policy(
        source: Arc<dyn MessageSource>,
        presence: Arc<dyn PresenceClaim>,
        handler: Arc<dyn DeliveryHandler>,
        restart: RestartPolicy,
    ) -> Self {
        Self {
            state: Mutex::new(WatcherState::Stopped),
            source,
            presence,
            handler,
            restart,
        }
    }

    pub fn state(&self) -> WatcherState {
        *self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn restart_policy(&self) -> &RestartPolicy {
        &self.restart
    }

    /// Start monitoring. Idempotent: a second call while Starting or
    /// Running is a no-op and registration occurs exactly once.
    ///
    /// The presence claim is acquired before registration; a claim
    /// failure is logged but not fatal. Registration failure reverts the
    /// state to Stopped, releases the claim, and is surfaced to the
    /// caller — the one failure category that is.
    pub fn start(&self) -> Result<(), StartError> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if *state != WatcherState::Stopped {
            tracing::debug!(state = %*state, "start ignored, watcher not stopped");
            return Ok(());
        }
        *state = WatcherState::Starting;

        if let Err(e) = self.presence.acquire() {
            tracing::warn!("presence claim not acquired: {e}");
        }

        match self.source.register(self.handler.clone()) {
            Ok(()) => {
                *state = WatcherState::Running;
                tracing::info!("monitoring started");
                Ok(())
            }
            Err(e) => {
                if let Err(release_err) = self.presence.release() {
                    tracing::warn!("presence release after failed start: {release_err}");
                }
                *state = WatcherState::Stopped;
                Err(StartError::Registration(e))
            }
        }
    }

    /// Stop monitoring. Best-effort terminal: deregistration and claim
    /// release failures are logged, and the state always ends Stopped.
    /// A call while already Stopped is a no-op.
    pub fn stop(&self) {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if *state == WatcherState::Stopped {
            tracing::debug!("stop ignored, watcher already stopped");
            return;
        }

        if let Err(e) = self.source.unregister() {
            tracing::warn!("watcher deregistration failed: {e}");
        }
        if let Err(e) = self.presence.release() {
            tracing::warn!("presence release failed: {e}");
        }
        *state = WatcherState::Stopped;
        tracing::info!("monitoring stopped");
    }
}

// ─── Tests ───────────────────────────────────────────────────────
