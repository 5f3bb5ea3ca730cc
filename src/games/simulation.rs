//! Simulated betting path
//!
//! Walks the same stages as an on-chain bet with fixed artificial delays and
//! draws the outcome locally. Used for chains without a contract deployment
//! and as the Solana adapter.

use crate::betting::{BettingBackend, BettingSession, BettingState, PendingOutcome, PlayGuard};
use crate::chains::ChainKind;
use crate::config::SimulationConfig;
use crate::errors::BettingError;
use crate::games::selector::select_outcome;
use crate::games::types::{BettingResult, PlayOptions, Settlement};
use async_trait::async_trait;
use tokio::sync::watch;
use tokio::time::sleep;
use tracing::info;
use uuid::Uuid;

/// Drive a claimed session through the simulated stages
///
/// Expects the session in `Simulating`; leaves the drawn result pending and
/// the guard ready to `finish`.
pub(crate) async fn run_simulation(
    guard: &PlayGuard<'_>,
    options: &PlayOptions,
    delays: &SimulationConfig,
) -> BettingResult {
    let bet_id = Uuid::new_v4();
    sleep(delays.simulating()).await;

    guard.advance(BettingState::Signing);
    sleep(delays.signing()).await;

    guard.advance(BettingState::Processing);
    let result_index = select_outcome(&options.bet, &mut rand::thread_rng());
    let result = BettingResult::from_outcome(options, result_index);
    guard
        .store(PendingOutcome::Result(Settlement::Authoritative(result.clone())))
        .await;
    sleep(delays.processing()).await;

    guard.advance(BettingState::Settling);
    sleep(delays.settling()).await;

    info!(
        %bet_id,
        result_index,
        multiplier = result.multiplier(),
        payout = result.payout(),
        metadata = ?options.metadata,
        "Simulated bet settled"
    );
    result
}

/// Backend that never touches a network
pub struct SimulatedBetting {
    chain: ChainKind,
    delays: SimulationConfig,
    session: BettingSession,
}

impl SimulatedBetting {
    pub fn new(chain: ChainKind, delays: SimulationConfig) -> Self {
        Self {
            chain,
            delays,
            session: BettingSession::new(),
        }
    }
}

#[async_trait]
impl BettingBackend for SimulatedBetting {
    fn chain(&self) -> ChainKind {
        self.chain
    }

    async fn play(&self, options: PlayOptions) -> Result<(), BettingError> {
        let guard = self.session.begin(&options).await?;
        run_simulation(&guard, &options, &self.delays).await;
        guard.finish();
        Ok(())
    }

    async fn result(&self) -> Result<Settlement, BettingError> {
        self.session.ensure_idle()?;
        let mut pending = self.session.pending().await;
        BettingSession::take_local(&mut pending).ok_or(BettingError::NoResult)
    }

    fn state(&self) -> BettingState {
        self.session.state()
    }

    fn error(&self) -> Option<BettingError> {
        self.session.error()
    }

    fn subscribe(&self) -> watch::Receiver<BettingState> {
        self.session.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> SimulatedBetting {
        SimulatedBetting::new(ChainKind::Solana, SimulationConfig::instant())
    }

    #[tokio::test]
    async fn test_only_nonzero_outcome_is_selected() {
        let game = backend();
        for _ in 0..50 {
            game.play(PlayOptions::new(1.0, vec![0.0, 2.0, 0.0])).await.expect("play");
            let settlement = game.result().await.expect("result");

            assert!(!settlement.is_approximated());
            let result = settlement.result();
            assert_eq!(result.result_index(), 1);
            assert_eq!(result.multiplier(), 2.0);
            assert_eq!(result.payout(), 2.0);
            assert_eq!(result.wager(), 1.0);
        }
    }

    #[tokio::test]
    async fn test_result_is_single_use() {
        let game = backend();
        game.play(PlayOptions::new(1.0, vec![1.0, 1.0])).await.unwrap();
        assert!(game.result().await.is_ok());
        assert!(matches!(game.result().await, Err(BettingError::NoResult)));
    }

    #[tokio::test]
    async fn test_result_without_play() {
        assert!(matches!(backend().result().await, Err(BettingError::NoResult)));
    }

    #[tokio::test]
    async fn test_zero_weights_fail_without_side_effects() {
        let game = backend();
        let err = game.play(PlayOptions::new(1.0, vec![0.0, 0.0])).await.unwrap_err();

        assert!(matches!(err, BettingError::InvalidBet(_)));
        assert_eq!(game.state(), BettingState::Idle);
        assert!(game.error().is_some());
        assert!(matches!(game.result().await, Err(BettingError::NoResult)));
    }

    #[tokio::test]
    async fn test_play_walks_every_stage() {
        let game = std::sync::Arc::new(SimulatedBetting::new(
            ChainKind::Solana,
            SimulationConfig {
                simulating_ms: 5,
                signing_ms: 5,
                processing_ms: 5,
                settling_ms: 5,
            },
        ));
        let mut rx = game.subscribe();

        let watcher = tokio::spawn(async move {
            let mut seen = Vec::new();
            while rx.changed().await.is_ok() {
                let state = *rx.borrow_and_update();
                seen.push(state);
                if state == BettingState::Idle {
                    break;
                }
            }
            seen
        });

        game.play(PlayOptions::new(0.5, vec![2.0, 0.0])).await.unwrap();
        let seen = watcher.await.unwrap();

        assert_eq!(
            seen,
            vec![
                BettingState::Simulating,
                BettingState::Signing,
                BettingState::Processing,
                BettingState::Settling,
                BettingState::Idle,
            ]
        );
        assert!(game.error().is_none());
    }

    #[tokio::test]
    async fn test_play_again_before_collecting_is_busy() {
        let game = backend();
        game.play(PlayOptions::new(1.0, vec![1.0])).await.unwrap();
        let err = game.play(PlayOptions::new(1.0, vec![1.0])).await.unwrap_err();
        assert_eq!(err, BettingError::SessionBusy);
        assert!(game.result().await.is_ok());
    }
}
