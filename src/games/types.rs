use crate::errors::BettingError;
use crate::games::selector::total_weight;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A wager on a weighted outcome space
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlayOptions {
    /// Amount staked, in the chain's native unit (ETH, BNB, SOL)
    pub wager: f64,
    /// Multipliers; each one is also the weight of its outcome
    pub bet: Vec<f64>,
    /// Opaque caller data, passed through untouched
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub metadata: Vec<String>,
}

impl PlayOptions {
    pub fn new(wager: f64, bet: Vec<f64>) -> Self {
        Self {
            wager,
            bet,
            metadata: Vec::new(),
        }
    }

    pub fn with_metadata(mut self, metadata: Vec<String>) -> Self {
        self.metadata = metadata;
        self
    }

    /// Reject options that cannot be played; runs before any side effect
    pub fn validate(&self) -> Result<(), BettingError> {
        if !self.wager.is_finite() || self.wager <= 0.0 {
            return Err(BettingError::InvalidBet(format!(
                "wager must be a positive amount, got {}",
                self.wager
            )));
        }

        if self.bet.is_empty() {
            return Err(BettingError::InvalidBet("bet array is empty".to_string()));
        }

        if let Some((index, weight)) = self
            .bet
            .iter()
            .enumerate()
            .find(|(_, w)| !w.is_finite() || **w < 0.0)
        {
            return Err(BettingError::InvalidBet(format!(
                "bet[{}] = {} is not a non-negative number",
                index, weight
            )));
        }

        if total_weight(&self.bet) <= 0.0 {
            return Err(BettingError::InvalidBet(
                "Invalid bet array - total weight is zero".to_string(),
            ));
        }

        Ok(())
    }
}

/// Settled outcome of one wager
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BettingResult {
    result_index: usize,
    payout: f64,
    multiplier: f64,
    wager: f64,
}

impl BettingResult {
    /// Result of `options` landing on `result_index`
    ///
    /// Panics if `result_index` is out of range; callers obtain it from the
    /// outcome selector over the same bet array.
    pub(crate) fn from_outcome(options: &PlayOptions, result_index: usize) -> Self {
        Self::from_parts(result_index, options.bet[result_index], options.wager)
    }

    /// Build from already-converted values (e.g. a decoded on-chain record)
    pub(crate) fn from_parts(result_index: usize, multiplier: f64, wager: f64) -> Self {
        let payout = if multiplier > 0.0 { wager * multiplier } else { 0.0 };
        Self {
            result_index,
            payout,
            multiplier,
            wager,
        }
    }

    pub(crate) fn with_payout(mut self, payout: f64) -> Self {
        self.payout = payout;
        self
    }

    pub fn result_index(&self) -> usize {
        self.result_index
    }

    pub fn payout(&self) -> f64 {
        self.payout
    }

    pub fn multiplier(&self) -> f64 {
        self.multiplier
    }

    pub fn wager(&self) -> f64 {
        self.wager
    }

    pub fn is_win(&self) -> bool {
        self.payout > 0.0
    }
}

/// What `result()` hands back
///
/// `Approximated` means a bet transaction was confirmed but its settlement
/// event could not be read, so the outcome was drawn locally and may differ
/// from the one recorded on-chain.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", content = "result", rename_all = "lowercase")]
pub enum Settlement {
    Authoritative(BettingResult),
    Approximated(BettingResult),
}

impl Settlement {
    pub fn result(&self) -> &BettingResult {
        match self {
            Settlement::Authoritative(r) | Settlement::Approximated(r) => r,
        }
    }

    pub fn into_result(self) -> BettingResult {
        match self {
            Settlement::Authoritative(r) | Settlement::Approximated(r) => r,
        }
    }

    pub fn is_approximated(&self) -> bool {
        matches!(self, Settlement::Approximated(_))
    }
}

impl fmt::Display for Settlement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let r = self.result();
        let kind = if self.is_approximated() { " (approximated)" } else { "" };
        write!(
            f,
            "index {} x{} -> payout {} on wager {}{}",
            r.result_index, r.multiplier, r.payout, r.wager, kind
        )
    }
}
