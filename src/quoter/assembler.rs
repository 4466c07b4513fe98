//! Result Assembly
//!
//! Reconstructs per-(route, amount) quote records from the flat positional
//! result vector once every batch has succeeded.
//!
//! Author: AI-Generated
//! Created: 2026-02-03

use super::batch::BatchState;
use super::QuoteFetchError;
use crate::multicall::QuoteCallResult;
use crate::types::{QuoteRoute, RouteQuote, TokenAmount};
use tracing::debug;

/// Failed-quote debug lines are grouped to keep log volume bounded.
const FAILED_QUOTE_LOG_CHUNK: usize = 80;

/// Slice the concatenated batch results back into per-route quote lists.
///
/// Batches hold contiguous slices of the planner's route-major sequence, so
/// concatenating successful batches in state order restores the flat layout:
/// entry `route_index × |amounts| + amount_index` belongs to that pair.
pub fn assemble(
    routes: &[QuoteRoute],
    amounts: &[TokenAmount],
    states: &[BatchState],
) -> Result<Vec<(QuoteRoute, Vec<RouteQuote>)>, QuoteFetchError> {
    let flat: Vec<&QuoteCallResult> = states
        .iter()
        .filter_map(|state| match state {
            BatchState::Success { results, .. } => Some(results.iter()),
            _ => None,
        })
        .flatten()
        .collect();

    let expected = routes.len() * amounts.len();
    if flat.len() != expected {
        return Err(QuoteFetchError::PositionalMismatch {
            expected,
            actual: flat.len(),
        });
    }

    let mut routes_with_quotes = Vec::with_capacity(routes.len());
    for (route_index, route) in routes.iter().enumerate() {
        let slice = &flat[route_index * amounts.len()..(route_index + 1) * amounts.len()];

        let mut quotes = Vec::with_capacity(amounts.len());
        let mut failed_labels: Vec<String> = Vec::new();

        for (amount_index, amount) in amounts.iter().enumerate() {
            let entry = slice[amount_index];
            match (&entry.result, entry.success) {
                (Some(decoded), true) => quotes.push(RouteQuote {
                    amount: amount.clone(),
                    outcome: Some(crate::types::QuoteOutcome {
                        quoted_amount: decoded.amount,
                        sqrt_price_x96_after: decoded.sqrt_price_x96_after.clone(),
                        initialized_ticks_crossed: decoded.initialized_ticks_crossed.clone(),
                        gas_estimate: decoded.gas_estimate,
                    }),
                }),
                _ => {
                    // Callers quote at evenly spaced fractions of the trade;
                    // label the failure by its fraction for debuggability
                    let percent = 100.0 / amounts.len() as f64 * (amount_index + 1) as f64;
                    failed_labels.push(format!("{:.0}% ({})", percent, amount));
                    quotes.push(RouteQuote {
                        amount: amount.clone(),
                        outcome: None,
                    });
                }
            }
        }

        if !failed_labels.is_empty() {
            for chunk in failed_labels.chunks(FAILED_QUOTE_LOG_CHUNK) {
                debug!(
                    route = %route,
                    "quoter call failed for amounts: [{}]",
                    chunk.join(", ")
                );
            }
        }

        routes_with_quotes.push((route.clone(), quotes));
    }

    Ok(routes_with_quotes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::multicall::{DecodedQuote, EncodedQuoteInput};
    use alloy::primitives::{address, Address, U256};

    const USDC: Address = address!("2791bca1f2de4661ed88a30c99a7a9449aa84174");
    const WETH: Address = address!("7ceb23fd6bc0add59e62ac25578270cff1b9f619");
    const WMATIC: Address = address!("0d500b1d8e8ef31e21c99d1db9a6444d3adf1270");

    fn quote_result(amount: u64) -> QuoteCallResult {
        QuoteCallResult {
            success: true,
            result: Some(DecodedQuote {
                amount: U256::from(amount),
                sqrt_price_x96_after: vec![U256::from(1u64)],
                initialized_ticks_crossed: vec![0],
                gas_estimate: U256::from(80_000u64),
            }),
        }
    }

    fn failed_result() -> QuoteCallResult {
        QuoteCallResult {
            success: false,
            result: None,
        }
    }

    fn success_batch(results: Vec<QuoteCallResult>) -> BatchState {
        let inputs = results
            .iter()
            .map(|_| EncodedQuoteInput {
                path: alloy::primitives::Bytes::new(),
                amount: U256::ZERO,
            })
            .collect();
        BatchState::Success {
            inputs,
            block_number: 100,
            results,
            approx_gas_per_success: 80_000,
        }
    }

    fn amounts(n: usize) -> Vec<TokenAmount> {
        (1..=n)
            .map(|i| TokenAmount::new(USDC, 6, U256::from(i as u64 * 10)))
            .collect()
    }

    #[test]
    fn test_positional_realignment_across_batches() {
        let routes = vec![
            QuoteRoute::single(USDC, WETH, 500),
            QuoteRoute::single(USDC, WMATIC, 3000),
        ];
        // 2 routes × 2 amounts split across two batches of 2
        let states = vec![
            success_batch(vec![quote_result(11), quote_result(12)]),
            success_batch(vec![quote_result(21), quote_result(22)]),
        ];

        let result = assemble(&routes, &amounts(2), &states).unwrap();
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].1.len(), 2);
        assert_eq!(
            result[0].1[0].outcome.as_ref().unwrap().quoted_amount,
            U256::from(11u64)
        );
        assert_eq!(
            result[1].1[1].outcome.as_ref().unwrap().quoted_amount,
            U256::from(22u64)
        );
    }

    #[test]
    fn test_failed_inputs_keep_amount_but_no_outcome() {
        let routes = vec![QuoteRoute::single(USDC, WETH, 500)];
        let states = vec![success_batch(vec![
            quote_result(11),
            failed_result(),
            quote_result(13),
        ])];

        let result = assemble(&routes, &amounts(3), &states).unwrap();
        let quotes = &result[0].1;
        assert!(quotes[0].outcome.is_some());
        assert!(quotes[1].outcome.is_none());
        assert_eq!(quotes[1].amount.raw, U256::from(20u64));
        assert!(quotes[2].outcome.is_some());
    }

    #[test]
    fn test_count_mismatch_is_an_error() {
        let routes = vec![QuoteRoute::single(USDC, WETH, 500)];
        let states = vec![success_batch(vec![quote_result(11)])];

        let err = assemble(&routes, &amounts(2), &states).unwrap_err();
        match err {
            QuoteFetchError::PositionalMismatch { expected, actual } => {
                assert_eq!(expected, 2);
                assert_eq!(actual, 1);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
