//! Post-Batch Validation
//!
//! Two checks run after every attempt's batches join: successful batches
//! must agree on the block height, and each batch must clear the per-batch
//! success-rate floor.
//!
//! Author: AI-Generated
//! Created: 2026-02-03

use super::batch::BatchState;
use crate::multicall::{AggregatedQuotes, EncodedQuoteInput};
use tracing::{debug, warn};

/// Distinct block heights among successful batches, when they disagree.
///
/// Returns None with fewer than two successes or when all successes agree.
pub fn conflicting_blocks(states: &[BatchState]) -> Option<Vec<u64>> {
    let mut blocks: Vec<u64> = states
        .iter()
        .filter_map(|state| match state {
            BatchState::Success { block_number, .. } => Some(*block_number),
            _ => None,
        })
        .collect();
    if blocks.len() < 2 {
        return None;
    }
    blocks.sort_unstable();
    blocks.dedup();
    if blocks.len() > 1 {
        warn!("successful batches disagree on block height: {:?}", blocks);
        Some(blocks)
    } else {
        None
    }
}

/// Apply the per-batch success-rate floor to an executed batch.
///
/// Below the floor and before the call's first success-rate retry, the batch
/// is failed (keeping its partial results). Once the call has retried for
/// success rate, low-rate batches are accepted as-is: some pools genuinely
/// cannot serve every amount, and retrying forever would never converge.
pub fn apply_success_rate_floor(
    inputs: Vec<EncodedQuoteInput>,
    outcome: AggregatedQuotes,
    min_success_rate: f64,
    already_retried_for_rate: bool,
) -> BatchState {
    let total = outcome.results.len();
    let successes = outcome.successes();
    let rate = if total == 0 {
        1.0
    } else {
        successes as f64 / total as f64
    };

    if rate < min_success_rate && !already_retried_for_rate {
        let detail = format!(
            "batch success rate {:.2} below floor {:.2} ({}/{} quotes succeeded)",
            rate, min_success_rate, successes, total
        );
        debug!("{}", detail);
        return BatchState::Failed {
            inputs,
            kind: super::batch::FailureKind::SuccessRateTooLow,
            detail,
            partial: Some(outcome),
        };
    }

    if rate < min_success_rate {
        debug!(
            "accepting batch below success-rate floor after retry ({}/{} succeeded)",
            successes, total
        );
    }

    BatchState::Success {
        inputs,
        block_number: outcome.block_number,
        approx_gas_per_success: outcome.approx_gas_used_per_success_call,
        results: outcome.results,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::multicall::QuoteCallResult;
    use crate::quoter::batch::FailureKind;

    fn success_state(block_number: u64) -> BatchState {
        BatchState::Success {
            inputs: vec![],
            block_number,
            results: vec![],
            approx_gas_per_success: 0,
        }
    }

    fn outcome(successes: usize, failures: usize, block_number: u64) -> AggregatedQuotes {
        let mut results = Vec::new();
        for _ in 0..successes {
            results.push(QuoteCallResult {
                success: true,
                result: None,
            });
        }
        for _ in 0..failures {
            results.push(QuoteCallResult {
                success: false,
                result: None,
            });
        }
        AggregatedQuotes {
            block_number,
            results,
            approx_gas_used_per_success_call: 0,
        }
    }

    #[test]
    fn test_agreeing_blocks_pass() {
        let states = vec![success_state(100), success_state(100), success_state(100)];
        assert_eq!(conflicting_blocks(&states), None);
    }

    #[test]
    fn test_disagreeing_blocks_conflict() {
        let states = vec![success_state(100), success_state(100), success_state(101)];
        assert_eq!(conflicting_blocks(&states), Some(vec![100, 101]));
    }

    #[test]
    fn test_single_success_never_conflicts() {
        let states = vec![success_state(100)];
        assert_eq!(conflicting_blocks(&states), None);
    }

    #[test]
    fn test_rate_above_floor_accepted() {
        // 2/5 = 0.4 against a 0.2 floor
        let state = apply_success_rate_floor(vec![], outcome(2, 3, 100), 0.2, false);
        assert!(state.is_success());
    }

    #[test]
    fn test_rate_below_floor_rejected_first_time() {
        // 2/5 = 0.4 against a 0.7 floor
        let state = apply_success_rate_floor(vec![], outcome(2, 3, 100), 0.7, false);
        match state {
            BatchState::Failed { kind, partial, .. } => {
                assert_eq!(kind, FailureKind::SuccessRateTooLow);
                assert!(partial.is_some());
            }
            other => panic!("expected Failed, got {:?}", other),
        }
    }

    #[test]
    fn test_rate_below_floor_accepted_after_retry() {
        let state = apply_success_rate_floor(vec![], outcome(2, 3, 100), 0.7, true);
        assert!(state.is_success());
    }
}
