//! Betting contract ABI and the fixed-point conversions of its wire format
//!
//! Multipliers travel as unsigned integers scaled by [`WEIGHT_SCALE`]; wagers
//! and payouts travel in the chain's smallest unit (wei for ETH/BNB).

use crate::errors::{BettingError, TransportError};
use crate::games::types::{BettingResult, PlayOptions};
use alloy::primitives::utils::{format_units, parse_units};
use alloy::primitives::{Address, Log, B256, U256};
use alloy::sol;
use alloy::sol_types::{SolCall, SolEvent};
use tracing::{debug, warn};

sol! {
    #[allow(missing_docs)]
    #[derive(Debug)]
    contract GambaBetting {
        event BetPlaced(bytes32 indexed betId, address indexed player, address token, uint256 wager);

        function placeBet(address token, uint256 wager, uint256[] calldata bet, bytes32 seed)
            external
            payable
            returns (bytes32 betId);

        function getBet(bytes32 betId)
            external
            view
            returns (
                address player,
                address token,
                uint256 wager,
                uint256[] memory bet,
                uint256 resultIndex,
                uint256 payout,
                bool resolved
            );
    }
}

/// Fixed-point scale applied to multipliers on-chain
pub const WEIGHT_SCALE: u64 = 10_000;

/// Token address the contract uses for the chain's native currency
pub const NATIVE_TOKEN: Address = Address::ZERO;

/// Multipliers as scaled integers, rounded to the nearest unit
pub fn scale_weights(weights: &[f64]) -> Vec<U256> {
    weights
        .iter()
        .map(|w| U256::from((w * WEIGHT_SCALE as f64).round() as u128))
        .collect()
}

pub fn unscale_weight(value: U256) -> Result<f64, TransportError> {
    let raw = u128::try_from(value)
        .map_err(|_| TransportError::Decode(format!("multiplier {} out of range", value)))?;
    Ok(raw as f64 / WEIGHT_SCALE as f64)
}

/// Amount in the smallest unit of a currency with `decimals` places
///
/// Starts from the shortest decimal form of `amount`, so `0.1` is exactly
/// `10^(decimals-1)` units; extra fractional digits are rounded half up.
pub fn to_base_units(amount: f64, decimals: u8) -> Result<U256, BettingError> {
    let invalid = |reason: String| {
        BettingError::InvalidBet(format!("wager {} not representable: {}", amount, reason))
    };
    if !amount.is_finite() || amount < 0.0 {
        return Err(invalid("not a finite non-negative amount".to_string()));
    }

    let text = amount.to_string();
    let (whole, fraction) = text.split_once('.').unwrap_or((text.as_str(), ""));
    let places = decimals as usize;
    let (kept, dropped) = if fraction.len() > places {
        fraction.split_at(places)
    } else {
        (fraction, "")
    };
    let exact = if kept.is_empty() {
        whole.to_string()
    } else {
        format!("{}.{}", whole, kept)
    };

    let units = parse_units(&exact, decimals)
        .map_err(|e| invalid(e.to_string()))?
        .get_absolute();
    if dropped.as_bytes().first().is_some_and(|digit| *digit >= b'5') {
        return units
            .checked_add(U256::from(1u8))
            .ok_or_else(|| invalid("overflow".to_string()));
    }
    Ok(units)
}

/// Wager in base units for `options`, checking that the bet survives the
/// conversion to the contract's fixed-point format
pub fn wire_wager(options: &PlayOptions, decimals: u8) -> Result<U256, BettingError> {
    if scale_weights(&options.bet).iter().all(|w| w.is_zero()) {
        return Err(BettingError::InvalidBet(format!(
            "bet weights round to zero at 1/{} precision",
            WEIGHT_SCALE
        )));
    }

    let value = to_base_units(options.wager, decimals)?;
    if value.is_zero() {
        return Err(BettingError::InvalidBet(format!(
            "wager {} is below the smallest unit",
            options.wager
        )));
    }
    Ok(value)
}

pub fn from_base_units(value: U256, decimals: u8) -> Result<f64, TransportError> {
    let text = format_units(value, decimals).map_err(|e| TransportError::Decode(e.to_string()))?;
    text.parse::<f64>()
        .map_err(|e| TransportError::Decode(format!("amount '{}': {}", text, e)))
}

/// Calldata for `placeBet` on the native token
pub fn encode_place_bet(wager: U256, weights: &[f64], seed: B256) -> Vec<u8> {
    GambaBetting::placeBetCall {
        token: NATIVE_TOKEN,
        wager,
        bet: scale_weights(weights),
        seed,
    }
    .abi_encode()
}

pub fn encode_get_bet(bet_id: B256) -> Vec<u8> {
    GambaBetting::getBetCall { betId: bet_id }.abi_encode()
}

/// Bet id of the first `BetPlaced` event emitted by `contract`
///
/// Logs from other addresses and logs that do not decode are skipped.
pub fn find_bet_id(logs: &[Log], contract: Address) -> Option<B256> {
    for (position, log) in logs.iter().enumerate() {
        if log.address != contract {
            continue;
        }
        match GambaBetting::BetPlaced::decode_log_data(&log.data) {
            Ok(event) => {
                debug!(bet_id = %event.betId, player = %event.player, "Decoded BetPlaced event");
                return Some(event.betId);
            }
            Err(e) => {
                warn!(position, error = %e, "Skipping undecodable contract log");
            }
        }
    }
    None
}

/// Turn a `getBet` return payload back into a [`BettingResult`]
pub fn decode_bet_record(raw: &[u8], decimals: u8) -> Result<BettingResult, TransportError> {
    let record = GambaBetting::getBetCall::abi_decode_returns(raw)
        .map_err(|e| TransportError::Decode(format!("getBet returned malformed data: {}", e)))?;

    if !record.resolved {
        return Err(TransportError::Rpc("bet is not resolved yet".to_string()));
    }

    let index = usize::try_from(record.resultIndex)
        .ok()
        .filter(|i| *i < record.bet.len())
        .ok_or_else(|| {
            TransportError::Decode(format!(
                "result index {} outside bet of {} outcomes",
                record.resultIndex,
                record.bet.len()
            ))
        })?;

    let multiplier = unscale_weight(record.bet[index])?;
    let wager = from_base_units(record.wager, decimals)?;
    let payout = from_base_units(record.payout, decimals)?;

    Ok(BettingResult::from_parts(index, multiplier, wager).with_payout(payout))
}
