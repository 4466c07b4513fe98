//! Batched Quoter Calls via Interface Multicall
//!
//! Encodes one QuoterV2 sub-call per (path, amount) input, submits the whole
//! batch as a single gas-limited multicall `eth_call` pinned to a block, and
//! decodes the positional results.
//!
//! The fetch engine depends only on the `QuoteAggregator` trait; the on-chain
//! implementation here is the production collaborator, and tests inject a
//! scripted fake instead.
//!
//! Author: AI-Generated
//! Created: 2026-02-02
//! Modified: 2026-02-03 — approx gas-per-success reporting

use crate::contracts::{IInterfaceMulticall, IQuoterV2};
use crate::registry;
use crate::types::TradeKind;
use anyhow::{anyhow, Context, Result};
use alloy::eips::BlockId;
use alloy::primitives::{Address, Bytes, U256};
use alloy::providers::Provider;
use alloy::sol_types::SolCall;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

/// One encoded quoter input: a packed swap path and the raw amount the
/// quoter should simulate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedQuoteInput {
    pub path: Bytes,
    pub amount: U256,
}

/// Per-batch execution options, adjusted across retry attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregatorCallOptions {
    /// Block the whole batch executes at.
    pub block_number: u64,
    /// Gas ceiling for each quoter sub-call.
    pub gas_limit_per_call: u64,
}

/// Decoded quoter reply for one input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedQuote {
    pub amount: U256,
    pub sqrt_price_x96_after: Vec<U256>,
    pub initialized_ticks_crossed: Vec<u32>,
    pub gas_estimate: U256,
}

/// Per-input result, positionally aligned with the submitted inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteCallResult {
    pub success: bool,
    pub result: Option<DecodedQuote>,
}

/// Outcome of one aggregated batch call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregatedQuotes {
    /// Block height the node reports for the batch.
    pub block_number: u64,
    pub results: Vec<QuoteCallResult>,
    /// Mean gas used across successful sub-calls (0 when none succeeded).
    pub approx_gas_used_per_success_call: u64,
}

impl AggregatedQuotes {
    pub fn successes(&self) -> usize {
        self.results.iter().filter(|r| r.success).count()
    }
}

/// The multicall collaborator the fetch engine runs against.
///
/// Errors returned from `quote_batch` carry the raw provider message so the
/// engine can classify them (missing header, timeout, gas exhaustion, …).
#[async_trait]
pub trait QuoteAggregator: Send + Sync {
    /// Current chain head, used once per call when no block was pinned.
    async fn latest_block_number(&self) -> Result<u64>;

    /// Execute one batch of quoter sub-calls at a pinned block.
    async fn quote_batch(
        &self,
        quoter: Address,
        kind: TradeKind,
        inputs: &[EncodedQuoteInput],
        options: &AggregatorCallOptions,
    ) -> Result<AggregatedQuotes>;
}

#[async_trait]
impl<A: QuoteAggregator> QuoteAggregator for Arc<A> {
    async fn latest_block_number(&self) -> Result<u64> {
        (**self).latest_block_number().await
    }

    async fn quote_batch(
        &self,
        quoter: Address,
        kind: TradeKind,
        inputs: &[EncodedQuoteInput],
        options: &AggregatorCallOptions,
    ) -> Result<AggregatedQuotes> {
        (**self).quote_batch(quoter, kind, inputs, options).await
    }
}

/// Production aggregator: the chain's gas-limited interface multicall.
pub struct OnChainQuoteAggregator<P> {
    provider: P,
    multicall_address: Address,
}

impl<P: Provider + Clone> OnChainQuoteAggregator<P> {
    /// Create an aggregator using the chain's registered multicall address.
    pub fn new(provider: P, chain_id: u64) -> Result<Self> {
        let multicall_address = registry::multicall_address(chain_id)
            .ok_or_else(|| anyhow!("no interface multicall registered for chain {}", chain_id))?;

        info!(
            "OnChainQuoteAggregator initialized: chain={} multicall={}",
            chain_id, multicall_address
        );

        Ok(Self {
            provider,
            multicall_address,
        })
    }

    /// Create an aggregator against an explicit multicall deployment.
    pub fn with_multicall_address(provider: P, multicall_address: Address) -> Self {
        Self {
            provider,
            multicall_address,
        }
    }
}

#[async_trait]
impl<P: Provider + Clone> QuoteAggregator for OnChainQuoteAggregator<P> {
    async fn latest_block_number(&self) -> Result<u64> {
        self.provider
            .get_block_number()
            .await
            .context("Failed to fetch current block number")
    }

    async fn quote_batch(
        &self,
        quoter: Address,
        kind: TradeKind,
        inputs: &[EncodedQuoteInput],
        options: &AggregatorCallOptions,
    ) -> Result<AggregatedQuotes> {
        let calls: Vec<IInterfaceMulticall::Call> = inputs
            .iter()
            .map(|input| IInterfaceMulticall::Call {
                target: quoter,
                gasLimit: U256::from(options.gas_limit_per_call),
                callData: encode_quoter_calldata(kind, input),
            })
            .collect();

        let instance = IInterfaceMulticall::new(self.multicall_address, self.provider.clone());
        let reply = instance
            .multicall(calls)
            .block(BlockId::number(options.block_number))
            .call()
            .await
            .context("interface multicall eth_call failed")?;

        if reply.returnData.len() != inputs.len() {
            return Err(anyhow!(
                "multicall returned {} results, expected {}",
                reply.returnData.len(),
                inputs.len()
            ));
        }

        let mut results = Vec::with_capacity(inputs.len());
        let mut gas_used_sum: u64 = 0;
        let mut success_count: u64 = 0;

        for (i, sub) in reply.returnData.iter().enumerate() {
            let decoded = if sub.success {
                decode_quoter_return(kind, &sub.returnData)
            } else {
                None
            };
            match decoded {
                Some(quote) => {
                    gas_used_sum = gas_used_sum.saturating_add(sub.gasUsed.saturating_to::<u64>());
                    success_count += 1;
                    results.push(QuoteCallResult {
                        success: true,
                        result: Some(quote),
                    });
                }
                None => {
                    if sub.success {
                        // Sub-call succeeded but the return shape was wrong
                        debug!("quoter sub-call {} returned undecodable data", i);
                    }
                    results.push(QuoteCallResult {
                        success: false,
                        result: None,
                    });
                }
            }
        }

        let approx_gas_used_per_success_call = if success_count > 0 {
            gas_used_sum / success_count
        } else {
            0
        };

        Ok(AggregatedQuotes {
            block_number: reply.blockNumber.saturating_to::<u64>(),
            results,
            approx_gas_used_per_success_call,
        })
    }
}

/// Encode one QuoterV2 sub-call for the selected entry point.
fn encode_quoter_calldata(kind: TradeKind, input: &EncodedQuoteInput) -> Bytes {
    let encoded = match kind {
        TradeKind::ExactIn => IQuoterV2::quoteExactInputCall {
            path: input.path.clone(),
            amountIn: input.amount,
        }
        .abi_encode(),
        TradeKind::ExactOut => IQuoterV2::quoteExactOutputCall {
            path: input.path.clone(),
            amountOut: input.amount,
        }
        .abi_encode(),
    };
    Bytes::from(encoded)
}

/// Decode one QuoterV2 return payload. Both entry points share the same
/// four-field shape; only the meaning of the leading amount differs.
fn decode_quoter_return(kind: TradeKind, data: &[u8]) -> Option<DecodedQuote> {
    match kind {
        TradeKind::ExactIn => IQuoterV2::quoteExactInputCall::abi_decode_returns(data)
            .ok()
            .map(|ret| DecodedQuote {
                amount: ret.amountOut,
                sqrt_price_x96_after: ret
                    .sqrtPriceX96AfterList
                    .iter()
                    .map(|p| p.to::<U256>())
                    .collect(),
                initialized_ticks_crossed: ret.initializedTicksCrossedList,
                gas_estimate: ret.gasEstimate,
            }),
        TradeKind::ExactOut => IQuoterV2::quoteExactOutputCall::abi_decode_returns(data)
            .ok()
            .map(|ret| DecodedQuote {
                amount: ret.amountIn,
                sqrt_price_x96_after: ret
                    .sqrtPriceX96AfterList
                    .iter()
                    .map(|p| p.to::<U256>())
                    .collect(),
                initialized_ticks_crossed: ret.initializedTicksCrossedList,
                gas_estimate: ret.gasEstimate,
            }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::address;
    use alloy::primitives::aliases::U160;
    use alloy::sol_types::SolValue;

    fn sample_input() -> EncodedQuoteInput {
        let mut path = Vec::new();
        path.extend_from_slice(address!("2791bca1f2de4661ed88a30c99a7a9449aa84174").as_slice());
        path.extend_from_slice(&[0x00, 0x01, 0xf4]);
        path.extend_from_slice(address!("7ceb23fd6bc0add59e62ac25578270cff1b9f619").as_slice());
        EncodedQuoteInput {
            path: Bytes::from(path),
            amount: U256::from(1_000_000u64),
        }
    }

    #[test]
    fn test_encode_selects_entry_point() {
        let input = sample_input();

        let exact_in = encode_quoter_calldata(TradeKind::ExactIn, &input);
        let exact_out = encode_quoter_calldata(TradeKind::ExactOut, &input);

        assert_eq!(&exact_in[..4], &IQuoterV2::quoteExactInputCall::SELECTOR[..]);
        assert_eq!(&exact_out[..4], &IQuoterV2::quoteExactOutputCall::SELECTOR[..]);
        assert_ne!(exact_in, exact_out);
    }

    #[test]
    fn test_decode_round_trip_exact_in() {
        let payload = (
            U256::from(42u64),
            vec![U160::from(111u64), U160::from(222u64)],
            vec![3u32, 0u32],
            U256::from(90_000u64),
        )
            .abi_encode_sequence();

        let quote = decode_quoter_return(TradeKind::ExactIn, &payload).unwrap();
        assert_eq!(quote.amount, U256::from(42u64));
        assert_eq!(
            quote.sqrt_price_x96_after,
            vec![U256::from(111u64), U256::from(222u64)]
        );
        assert_eq!(quote.initialized_ticks_crossed, vec![3, 0]);
        assert_eq!(quote.gas_estimate, U256::from(90_000u64));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode_quoter_return(TradeKind::ExactIn, &[]).is_none());
        assert!(decode_quoter_return(TradeKind::ExactIn, &[0xde, 0xad, 0xbe, 0xef]).is_none());
    }
}
