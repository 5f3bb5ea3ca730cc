//! Betting lifecycle shared by every backend
//!
//! A backend owns one [`BettingSession`]. The session publishes the current
//! [`BettingState`] on a watch channel so UI code can follow progress while
//! `play()` is suspended, keeps the last error, and holds at most one
//! undelivered outcome.
//!
//! Transitions only move forward (`Idle → Simulating → Signing → Processing →
//! Sending → Settling`) and every path, success or failure, ends in `Idle`.

use crate::chains::ChainKind;
use crate::errors::BettingError;
use crate::games::types::{PlayOptions, Settlement};
use alloy::primitives::B256;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::{watch, Mutex, MutexGuard};
use tracing::{debug, warn};

/// Progress of the bet currently in flight
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BettingState {
    #[default]
    Idle,
    Simulating,
    Signing,
    Processing,
    Sending,
    Settling,
}

impl fmt::Display for BettingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BettingState::Idle => "idle",
            BettingState::Simulating => "simulating",
            BettingState::Signing => "signing",
            BettingState::Processing => "processing",
            BettingState::Sending => "sending",
            BettingState::Settling => "settling",
        };
        f.write_str(name)
    }
}

/// Uniform play/result interface over on-chain and simulated backends
#[async_trait]
pub trait BettingBackend: Send + Sync {
    /// Chain this backend bets on
    fn chain(&self) -> ChainKind;

    /// Run one bet through the full lifecycle
    ///
    /// Returns once the bet is settled (or failed); the outcome is collected
    /// with [`BettingBackend::result`].
    async fn play(&self, options: PlayOptions) -> Result<(), BettingError>;

    /// Hand over the outcome of the last `play()`; single use
    async fn result(&self) -> Result<Settlement, BettingError>;

    fn state(&self) -> BettingState;

    /// Error of the last failed `play()`, cleared when the next one starts
    fn error(&self) -> Option<BettingError>;

    /// Watch state transitions as they happen
    fn subscribe(&self) -> watch::Receiver<BettingState>;
}

/// Outcome waiting to be collected by `result()`
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum PendingOutcome {
    /// Outcome known locally (simulation or fallback)
    Result(Settlement),
    /// Bet recorded on-chain; outcome must be read from the contract
    BetId(B256),
}

/// Per-backend session record
#[derive(Debug)]
pub struct BettingSession {
    state: watch::Sender<BettingState>,
    error: watch::Sender<Option<BettingError>>,
    pending: Mutex<Option<PendingOutcome>>,
    last_play: Mutex<Option<PlayOptions>>,
}

impl BettingSession {
    pub fn new() -> Self {
        let (state, _) = watch::channel(BettingState::Idle);
        let (error, _) = watch::channel(None);
        Self {
            state,
            error,
            pending: Mutex::new(None),
            last_play: Mutex::new(None),
        }
    }

    pub fn state(&self) -> BettingState {
        *self.state.borrow()
    }

    pub fn error(&self) -> Option<BettingError> {
        self.error.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<BettingState> {
        self.state.subscribe()
    }

    /// Options of the most recent accepted `play()`
    pub async fn last_play(&self) -> Option<PlayOptions> {
        self.last_play.lock().await.clone()
    }

    /// Claim the session for a new bet
    ///
    /// Fails with `SessionBusy` while a bet is in flight or its outcome is
    /// uncollected, and with `InvalidBet` (recorded as the session error,
    /// state left untouched) when the options do not validate.
    pub(crate) async fn begin(&self, options: &PlayOptions) -> Result<PlayGuard<'_>, BettingError> {
        self.begin_checked(options, |_| Ok(())).await
    }

    /// [`begin`](Self::begin) with a backend specific check run after the
    /// generic validation; its error is handled like any `InvalidBet`
    pub(crate) async fn begin_checked<F>(
        &self,
        options: &PlayOptions,
        check: F,
    ) -> Result<PlayGuard<'_>, BettingError>
    where
        F: FnOnce(&PlayOptions) -> Result<(), BettingError>,
    {
        let pending = self.pending.lock().await;
        if pending.is_some() || self.state() != BettingState::Idle {
            return Err(BettingError::SessionBusy);
        }

        if let Err(err) = options.validate().and_then(|()| check(options)) {
            self.error.send_replace(Some(err.clone()));
            return Err(err);
        }

        let claimed = self.state.send_if_modified(|state| {
            if *state == BettingState::Idle {
                *state = BettingState::Simulating;
                true
            } else {
                false
            }
        });
        if !claimed {
            return Err(BettingError::SessionBusy);
        }
        drop(pending);

        self.error.send_replace(None);
        *self.last_play.lock().await = Some(options.clone());
        debug!(state = %BettingState::Simulating, "Bet session started");

        Ok(PlayGuard {
            session: self,
            finished: false,
        })
    }

    /// Lock the pending outcome slot
    pub(crate) async fn pending(&self) -> MutexGuard<'_, Option<PendingOutcome>> {
        self.pending.lock().await
    }

    /// Refuse `result()` while a bet is still being played
    pub(crate) fn ensure_idle(&self) -> Result<(), BettingError> {
        if self.state() == BettingState::Idle {
            Ok(())
        } else {
            Err(BettingError::SessionBusy)
        }
    }

    /// Take a locally known outcome, if that is what is pending
    pub(crate) fn take_local(slot: &mut Option<PendingOutcome>) -> Option<Settlement> {
        match slot.take() {
            Some(PendingOutcome::Result(settlement)) => Some(settlement),
            other => {
                *slot = other;
                None
            }
        }
    }
}

impl Default for BettingSession {
    fn default() -> Self {
        Self::new()
    }
}

/// Exclusive handle on a session for the duration of one `play()`
///
/// Dropping it without `finish`/`fail` (an abandoned future) puts the session
/// back to `Idle`.
pub(crate) struct PlayGuard<'a> {
    session: &'a BettingSession,
    finished: bool,
}

impl<'a> PlayGuard<'a> {
    pub(crate) fn advance(&self, next: BettingState) {
        let current = self.session.state();
        debug_assert!(next > current, "state must move forward: {} -> {}", current, next);
        self.session.state.send_replace(next);
        debug!(from = %current, to = %next, "Bet state transition");
    }

    pub(crate) async fn store(&self, outcome: PendingOutcome) {
        *self.session.pending.lock().await = Some(outcome);
    }

    pub(crate) fn finish(mut self) {
        self.finished = true;
        self.session.state.send_replace(BettingState::Idle);
    }

    /// Record `err`, return to `Idle` and hand the error back for propagation
    pub(crate) fn fail(mut self, err: BettingError) -> BettingError {
        self.finished = true;
        self.session.error.send_replace(Some(err.clone()));
        self.session.state.send_replace(BettingState::Idle);
        err
    }
}

impl Drop for PlayGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            warn!(state = %self.session.state(), "Bet abandoned mid-flight, resetting session");
            self.session.state.send_replace(BettingState::Idle);
        }
    }
}
