//! On-chain betting for EVM chains
//!
//! A bet is a payable `placeBet` call carrying the wager as value. The bet id
//! comes from the `BetPlaced` event in the receipt; `result()` then reads the
//! settled record back with `getBet`. Chains without a deployment fall back to
//! the simulated path before anything is broadcast.

use crate::betting::{BettingBackend, BettingSession, BettingState, PendingOutcome, PlayGuard};
use crate::chains::{is_deployed, ChainConfig, ChainKind, ChainRegistry, BETTING_CONTRACT};
use crate::config::SimulationConfig;
use crate::errors::{BettingError, TransportError};
use crate::evm::contract::{
    decode_bet_record, encode_get_bet, encode_place_bet, find_bet_id, wire_wager,
};
use crate::evm::transport::{BetTransaction, ChainReader, TransportConnector, WalletTransport};
use crate::games::selector::select_outcome;
use crate::games::simulation::run_simulation;
use crate::games::types::{BettingResult, PlayOptions, Settlement};
use alloy::primitives::{Address, B256};
use async_trait::async_trait;
use once_cell::sync::OnceCell;
use rand::Rng;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{error, info, warn};

/// Fresh random seed submitted with each bet
pub fn random_seed() -> B256 {
    B256::from(rand::thread_rng().gen::<[u8; 32]>())
}

/// Betting backend for Ethereum and BNB Smart Chain
pub struct EvmBetting {
    chain: ChainKind,
    registry: Arc<ChainRegistry>,
    connector: Option<Arc<dyn TransportConnector>>,
    simulation: SimulationConfig,
    wallet: OnceCell<Arc<dyn WalletTransport>>,
    reader: OnceCell<Arc<dyn ChainReader>>,
    session: BettingSession,
}

impl EvmBetting {
    /// `connector` is `None` when no wallet adapter is available; plays then
    /// fail with `WalletUnavailable`.
    pub fn new(
        chain: ChainKind,
        registry: Arc<ChainRegistry>,
        connector: Option<Arc<dyn TransportConnector>>,
        simulation: SimulationConfig,
    ) -> Self {
        Self {
            chain,
            registry,
            connector,
            simulation,
            wallet: OnceCell::new(),
            reader: OnceCell::new(),
            session: BettingSession::new(),
        }
    }

    /// Address the bets of this backend are sent to, or the sentinel
    pub fn contract(&self) -> Address {
        self.registry.resolve(self.chain, BETTING_CONTRACT)
    }

    pub fn session(&self) -> &BettingSession {
        &self.session
    }

    fn chain_config(&self) -> Result<&ChainConfig, TransportError> {
        self.registry
            .chain_config(self.chain)
            .ok_or_else(|| TransportError::Connection(format!("no chain config for {}", self.chain)))
    }

    fn wallet(&self) -> Result<Arc<dyn WalletTransport>, BettingError> {
        let connector = self
            .connector
            .as_ref()
            .ok_or_else(|| BettingError::WalletUnavailable("no wallet adapter".to_string()))?;
        let chain = self
            .chain_config()
            .map_err(|e| BettingError::WalletUnavailable(e.to_string()))?;

        self.wallet
            .get_or_try_init(|| connector.wallet(chain))
            .cloned()
            .map_err(|e| BettingError::WalletUnavailable(e.to_string()))
    }

    fn reader(&self) -> Result<Arc<dyn ChainReader>, TransportError> {
        let connector = self
            .connector
            .as_ref()
            .ok_or_else(|| TransportError::Connection("no chain connector".to_string()))?;
        let chain = self.chain_config()?;

        self.reader.get_or_try_init(|| connector.reader(chain)).cloned()
    }

    fn decimals(&self) -> u8 {
        self.registry
            .chain_config(self.chain)
            .map(|c| c.native_currency.decimals)
            .unwrap_or(18)
    }

    async fn drive(&self, guard: &PlayGuard<'_>, options: &PlayOptions) -> Result<(), BettingError> {
        let wallet = self.wallet()?;
        let accounts = wallet
            .request_accounts()
            .await
            .map_err(|e| BettingError::WalletUnavailable(e.to_string()))?;
        let player = accounts
            .first()
            .copied()
            .ok_or_else(|| BettingError::WalletUnavailable("wallet exposed no accounts".to_string()))?;

        let contract = self.contract();
        if !is_deployed(contract) {
            info!(chain = %self.chain, %player, "No betting contract deployed, simulating bet");
            run_simulation(guard, options, &self.simulation).await;
            return Ok(());
        }

        guard.advance(BettingState::Signing);
        let value = wire_wager(options, self.decimals())?;
        let seed = random_seed();
        let tx = BetTransaction {
            to: contract,
            value,
            input: encode_place_bet(value, &options.bet, seed).into(),
        };

        guard.advance(BettingState::Processing);
        let tx_hash = wallet
            .send_transaction(tx)
            .await
            .map_err(BettingError::TransactionFailed)?;
        info!(chain = %self.chain, %tx_hash, %player, wager = options.wager, "Bet transaction sent");

        guard.advance(BettingState::Sending);
        let confirmation = wallet
            .wait_for_confirmation(tx_hash)
            .await
            .map_err(BettingError::TransactionFailed)?;
        if !confirmation.succeeded {
            return Err(BettingError::TransactionFailed(TransportError::Reverted {
                tx_hash: tx_hash.to_string(),
            }));
        }

        guard.advance(BettingState::Settling);
        match find_bet_id(&confirmation.logs, contract) {
            Some(bet_id) => {
                info!(%bet_id, block = ?confirmation.block_number, "Bet placed on-chain");
                guard.store(PendingOutcome::BetId(bet_id)).await;
            }
            None => {
                warn!(
                    %tx_hash,
                    logs = confirmation.logs.len(),
                    "No BetPlaced event in receipt, approximating result locally"
                );
                let index = select_outcome(&options.bet, &mut rand::thread_rng());
                let result = BettingResult::from_outcome(options, index);
                guard.store(PendingOutcome::Result(Settlement::Approximated(result))).await;
            }
        }

        Ok(())
    }

    async fn fetch_bet(&self, bet_id: B256) -> Result<Settlement, TransportError> {
        let reader = self.reader()?;
        let raw = reader.call(self.contract(), encode_get_bet(bet_id).into()).await?;
        let result = decode_bet_record(&raw, self.decimals())?;
        Ok(Settlement::Authoritative(result))
    }
}

#[async_trait]
impl BettingBackend for EvmBetting {
    fn chain(&self) -> ChainKind {
        self.chain
    }

    async fn play(&self, options: PlayOptions) -> Result<(), BettingError> {
        let deployed = is_deployed(self.contract());
        let decimals = self.decimals();
        let guard = self
            .session
            .begin_checked(&options, |options| {
                if deployed {
                    wire_wager(options, decimals).map(|_| ())
                } else {
                    Ok(())
                }
            })
            .await?;
        match self.drive(&guard, &options).await {
            Ok(()) => {
                guard.finish();
                Ok(())
            }
            Err(err) => {
                error!(chain = %self.chain, error = %err, "Bet failed");
                Err(guard.fail(err))
            }
        }
    }

    async fn result(&self) -> Result<Settlement, BettingError> {
        self.session.ensure_idle()?;
        let mut pending = self.session.pending().await;
        if let Some(settlement) = BettingSession::take_local(&mut pending) {
            return Ok(settlement);
        }

        let bet_id = match pending.as_ref() {
            Some(PendingOutcome::BetId(bet_id)) => *bet_id,
            _ => return Err(BettingError::NoResult),
        };

        match self.fetch_bet(bet_id).await {
            Ok(settlement) => {
                *pending = None;
                Ok(settlement)
            }
            Err(err) => {
                warn!(%bet_id, error = %err, "Could not read bet record, keeping bet id for retry");
                Err(BettingError::ResultFetchFailed(err))
            }
        }
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
    use crate::evm::transport::Confirmation;
    use alloy::primitives::{address, TxHash};
    use std::sync::Mutex;

    struct NoAccounts;

    #[async_trait]
    impl WalletTransport for NoAccounts {
        async fn request_accounts(&self) -> Result<Vec<Address>, TransportError> {
            Ok(Vec::new())
        }

        async fn send_transaction(&self, _tx: BetTransaction) -> Result<TxHash, TransportError> {
            panic!("must not broadcast without an account");
        }

        async fn wait_for_confirmation(&self, _tx_hash: TxHash) -> Result<Confirmation, TransportError> {
            panic!("must not wait without an account");
        }
    }

    struct Connector {
        wallets_opened: Mutex<usize>,
    }

    impl TransportConnector for Connector {
        fn wallet(&self, _chain: &ChainConfig) -> Result<Arc<dyn WalletTransport>, TransportError> {
            *self.wallets_opened.lock().unwrap() += 1;
            Ok(Arc::new(NoAccounts))
        }

        fn reader(&self, _chain: &ChainConfig) -> Result<Arc<dyn ChainReader>, TransportError> {
            Err(TransportError::Connection("offline".to_string()))
        }
    }

    fn registry_with_contract() -> Arc<ChainRegistry> {
        let mut registry = ChainRegistry::builtin();
        registry.register(
            ChainKind::Ethereum,
            BETTING_CONTRACT,
            address!("00000000000000000000000000000000000000b1"),
        );
        Arc::new(registry)
    }

    #[test]
    fn test_random_seeds_differ() {
        assert_ne!(random_seed(), random_seed());
    }

    #[tokio::test]
    async fn test_missing_wallet_adapter() {
        let game = EvmBetting::new(
            ChainKind::Ethereum,
            registry_with_contract(),
            None,
            SimulationConfig::instant(),
        );
        let err = game.play(PlayOptions::new(0.01, vec![2.0, 0.0])).await.unwrap_err();

        assert!(matches!(err, BettingError::WalletUnavailable(_)));
        assert_eq!(game.state(), BettingState::Idle);
        assert_eq!(game.error(), Some(err));
    }

    #[tokio::test]
    async fn test_wallet_opened_once_and_empty_accounts_rejected() {
        let connector = Arc::new(Connector {
            wallets_opened: Mutex::new(0),
        });
        let game = EvmBetting::new(
            ChainKind::Ethereum,
            registry_with_contract(),
            Some(connector.clone() as Arc<dyn TransportConnector>),
            SimulationConfig::instant(),
        );

        for _ in 0..2 {
            let err = game.play(PlayOptions::new(0.01, vec![2.0, 0.0])).await.unwrap_err();
            assert!(matches!(err, BettingError::WalletUnavailable(_)));
        }
        assert_eq!(*connector.wallets_opened.lock().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_result_without_play_and_unreachable_reader() {
        let game = EvmBetting::new(
            ChainKind::Bnb,
            registry_with_contract(),
            Some(Arc::new(Connector {
                wallets_opened: Mutex::new(0),
            })),
            SimulationConfig::instant(),
        );
        assert!(matches!(game.result().await, Err(BettingError::NoResult)));

        *game.session().pending().await = Some(PendingOutcome::BetId(B256::repeat_byte(9)));
        let err = game.result().await.unwrap_err();
        assert!(matches!(err, BettingError::ResultFetchFailed(TransportError::Connection(_))));
        assert!(err.funds_committed());
        assert!(matches!(
            *game.session().pending().await,
            Some(PendingOutcome::BetId(_))
        ));
    }
}
