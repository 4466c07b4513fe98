// Core data structures for the quote fetcher
// Routes, amounts, and the per-(route, amount) quote records

use alloy::primitives::{Address, U256};
use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One pool hop inside a quote route.
///
/// Direction is encoded by the (token_in, token_out) ordering; `fee` is the
/// pool's fee tier in hundredths of a bip (500 = 0.05%, 3000 = 0.30%).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct V3PoolLeg {
    pub token_in: Address,
    pub token_out: Address,
    pub fee: u32,
}

impl V3PoolLeg {
    pub fn new(token_in: Address, token_out: Address, fee: u32) -> Self {
        Self {
            token_in,
            token_out,
            fee,
        }
    }
}

/// An ordered, non-empty sequence of pool hops forming a directional path
/// between two assets. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteRoute {
    legs: Vec<V3PoolLeg>,
}

impl QuoteRoute {
    /// Build a route from hops, validating that the path is contiguous:
    /// each hop's input token must equal the previous hop's output token.
    pub fn new(legs: Vec<V3PoolLeg>) -> Result<Self> {
        if legs.is_empty() {
            bail!("route must contain at least one pool");
        }
        for window in legs.windows(2) {
            if window[0].token_out != window[1].token_in {
                bail!(
                    "discontinuous route: hop output {} does not feed next hop input {}",
                    window[0].token_out,
                    window[1].token_in
                );
            }
        }
        Ok(Self { legs })
    }

    /// Single-pool route.
    pub fn single(token_in: Address, token_out: Address, fee: u32) -> Self {
        Self {
            legs: vec![V3PoolLeg::new(token_in, token_out, fee)],
        }
    }

    pub fn legs(&self) -> &[V3PoolLeg] {
        &self.legs
    }

    pub fn num_pools(&self) -> usize {
        self.legs.len()
    }

    /// First token of the path.
    pub fn input_token(&self) -> Address {
        self.legs[0].token_in
    }

    /// Last token of the path.
    pub fn output_token(&self) -> Address {
        self.legs[self.legs.len() - 1].token_out
    }
}

impl fmt::Display for QuoteRoute {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.input_token())?;
        for leg in &self.legs {
            write!(f, " -[{}]-> {}", leg.fee, leg.token_out)?;
        }
        Ok(())
    }
}

/// A raw token amount annotated with its asset and decimal scale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenAmount {
    pub token: Address,
    pub decimals: u8,
    pub raw: U256,
}

impl TokenAmount {
    pub fn new(token: Address, decimals: u8, raw: U256) -> Self {
        Self {
            token,
            decimals,
            raw,
        }
    }

    /// Human-readable value (display only; lossy above f64 precision).
    pub fn to_human(&self) -> f64 {
        let raw = if self.raw > U256::from(u128::MAX) {
            u128::MAX as f64
        } else {
            self.raw.to::<u128>() as f64
        };
        raw / 10_f64.powi(self.decimals as i32)
    }
}

impl fmt::Display for TokenAmount {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} ({})", self.raw, self.token)
    }
}

/// Quote direction: ExactIn fixes the input amount, ExactOut fixes the
/// desired output (the path is traversed in reverse on-chain).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeKind {
    ExactIn,
    ExactOut,
}

impl fmt::Display for TradeKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            TradeKind::ExactIn => write!(f, "exactIn"),
            TradeKind::ExactOut => write!(f, "exactOut"),
        }
    }
}

/// Decoded on-chain quoter reply for one (route, amount) input.
///
/// `quoted_amount` is the output amount for ExactIn and the required input
/// amount for ExactOut. The two arrays have one entry per pool in the route.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuoteOutcome {
    pub quoted_amount: U256,
    pub sqrt_price_x96_after: Vec<U256>,
    pub initialized_ticks_crossed: Vec<u32>,
    pub gas_estimate: U256,
}

/// Per-(route, amount) quote record. `outcome` is None when the quoter call
/// for this input failed on-chain (e.g. insufficient liquidity).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteQuote {
    pub amount: TokenAmount,
    pub outcome: Option<QuoteOutcome>,
}

/// Final result of a quote fetch: per-route quote lists aligned with the
/// input route order, all sampled at `block_number`.
#[derive(Debug, Clone, Serialize)]
pub struct QuoteResponse {
    pub routes_with_quotes: Vec<(QuoteRoute, Vec<RouteQuote>)>,
    pub block_number: u64,
    /// Counters for this call (retry loops, provider calls, per-kind retries).
    pub metrics: crate::quoter::MetricsSnapshot,
}
