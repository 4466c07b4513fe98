//! Retry Control
//!
//! Per-call bookkeeping across the attempt loop: which failure kinds have
//! already triggered a retry, whether the pinned block was rolled back, and
//! the batching knobs each recovery strategy adjusts.
//!
//! All of this state lives in one struct owned by the call and is never
//! shared across concurrent fetches.
//!
//! Author: AI-Generated
//! Created: 2026-02-03
//! Modified: 2026-02-04 — block rollback gating by attempt number

use super::batch::FailureKind;
use super::metrics::QuoteMetrics;
use crate::config::FetcherConfig;
use tracing::{debug, info};

/// Gas ceiling applied after the first gas-exhaustion failure.
pub const OUT_OF_GAS_GAS_LIMIT: u64 = 1_000_000;

/// Chunk cap applied after the first gas-exhaustion failure.
pub const OUT_OF_GAS_MULTICALL_CHUNK: usize = 140;

/// Batching knobs a recovery strategy may adjust mid-call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallTuning {
    pub gas_limit_per_call: u64,
    pub multicall_chunk: usize,
    /// Block every batch executes at.
    pub block_number: u64,
    /// True when the caller pinned the block; such a pin survives resets
    /// and is only ever changed by the one-shot rollback.
    pub caller_pinned: bool,
    /// When set, the next attempt re-fetches the chain head before running.
    pub refetch_block: bool,
}

/// Which failure kinds this call has already retried for.
#[derive(Debug, Default)]
pub struct RetryFlags {
    pub retried_block_conflict: bool,
    pub retried_block_header: bool,
    /// Attempt number of the most recent missing-header failure.
    pub block_header_last_attempt: Option<u32>,
    pub block_rolled_back: bool,
    pub retried_timeout: bool,
    pub retried_out_of_gas: bool,
    pub retried_success_rate: bool,
    pub retried_unknown: bool,
}

/// What the next attempt should do.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct AttemptDecision {
    /// Re-plan every batch (with the current tuning) instead of re-running
    /// only the failed ones.
    pub retry_all: bool,
}

/// Fold this attempt's failure kinds into the call state and decide how the
/// next attempt runs. Retry metrics latch: each fires once per call.
pub fn apply_failures(
    flags: &mut RetryFlags,
    tuning: &mut CallTuning,
    failures: &[FailureKind],
    attempt: u32,
    config: &FetcherConfig,
    metrics: &QuoteMetrics,
) -> AttemptDecision {
    let mut decision = AttemptDecision::default();

    for kind in failures {
        match kind {
            FailureKind::BlockConflict => {
                if !flags.retried_block_conflict {
                    QuoteMetrics::incr(&metrics.block_conflict_error_retry);
                    flags.retried_block_conflict = true;
                }
                decision.retry_all = true;
                if !tuning.caller_pinned {
                    // Discard the stale engine pin; the next attempt re-pins
                    tuning.refetch_block = true;
                }
            }
            FailureKind::BlockHeaderMissing => {
                if !flags.retried_block_header {
                    QuoteMetrics::incr(&metrics.block_header_not_found_retry);
                    flags.retried_block_header = true;
                } else if config.rollback
                    && !flags.block_rolled_back
                    && flags
                        .block_header_last_attempt
                        .is_some_and(|last| attempt > last)
                {
                    tuning.block_number = tuning.block_number.saturating_sub(1);
                    flags.block_rolled_back = true;
                    decision.retry_all = true;
                    info!(
                        "block header still missing, rolling pinned block back to {}",
                        tuning.block_number
                    );
                }
                flags.block_header_last_attempt = Some(attempt);
            }
            FailureKind::Timeout => {
                if !flags.retried_timeout {
                    QuoteMetrics::incr(&metrics.timeout_retry);
                    flags.retried_timeout = true;
                }
            }
            FailureKind::OutOfGas => {
                if !flags.retried_out_of_gas {
                    QuoteMetrics::incr(&metrics.out_of_gas_exception_retry);
                    flags.retried_out_of_gas = true;
                    tuning.gas_limit_per_call = OUT_OF_GAS_GAS_LIMIT;
                    tuning.multicall_chunk = OUT_OF_GAS_MULTICALL_CHUNK;
                    debug!(
                        "gas exhaustion: lowering gas limit to {} and chunk to {}",
                        OUT_OF_GAS_GAS_LIMIT, OUT_OF_GAS_MULTICALL_CHUNK
                    );
                }
            }
            FailureKind::SuccessRateTooLow => {
                if !flags.retried_success_rate {
                    QuoteMetrics::incr(&metrics.success_rate_retry);
                    flags.retried_success_rate = true;
                    let overrides = &config.success_rate_failure_overrides;
                    tuning.gas_limit_per_call = overrides.gas_limit_override;
                    tuning.multicall_chunk = overrides.multicall_chunk;
                    decision.retry_all = true;
                    debug!(
                        "success rate too low: raising gas limit to {} and lowering chunk to {}",
                        overrides.gas_limit_override, overrides.multicall_chunk
                    );
                }
            }
            FailureKind::Unknown(detail) => {
                if !flags.retried_unknown {
                    QuoteMetrics::incr(&metrics.unknown_reason_retry);
                    flags.retried_unknown = true;
                    debug!("retrying after unclassified provider error: {}", detail);
                }
            }
        }
    }

    decision
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tuning(caller_pinned: bool) -> CallTuning {
        CallTuning {
            gas_limit_per_call: 705_000,
            multicall_chunk: 210,
            block_number: 100,
            caller_pinned,
            refetch_block: false,
        }
    }

    #[test]
    fn test_out_of_gas_adjusts_once() {
        let mut flags = RetryFlags::default();
        let mut t = tuning(true);
        let config = FetcherConfig::default();
        let metrics = QuoteMetrics::default();

        let d = apply_failures(
            &mut flags,
            &mut t,
            &[FailureKind::OutOfGas],
            1,
            &config,
            &metrics,
        );
        assert!(!d.retry_all);
        assert_eq!(t.gas_limit_per_call, OUT_OF_GAS_GAS_LIMIT);
        assert_eq!(t.multicall_chunk, OUT_OF_GAS_MULTICALL_CHUNK);

        // Second sighting leaves tuning alone and does not re-count
        t.gas_limit_per_call = 42;
        apply_failures(
            &mut flags,
            &mut t,
            &[FailureKind::OutOfGas],
            2,
            &config,
            &metrics,
        );
        assert_eq!(t.gas_limit_per_call, 42);
        assert_eq!(metrics.snapshot().out_of_gas_exception_retry, 1);
    }

    #[test]
    fn test_success_rate_applies_overrides_and_replans() {
        let mut flags = RetryFlags::default();
        let mut t = tuning(true);
        let config = FetcherConfig::default();
        let metrics = QuoteMetrics::default();

        let d = apply_failures(
            &mut flags,
            &mut t,
            &[FailureKind::SuccessRateTooLow],
            1,
            &config,
            &metrics,
        );
        assert!(d.retry_all);
        assert_eq!(
            t.gas_limit_per_call,
            config.success_rate_failure_overrides.gas_limit_override
        );
        assert_eq!(
            t.multicall_chunk,
            config.success_rate_failure_overrides.multicall_chunk
        );
    }

    #[test]
    fn test_block_conflict_unpins_engine_block() {
        let mut flags = RetryFlags::default();
        let mut t = tuning(false);
        let config = FetcherConfig::default();
        let metrics = QuoteMetrics::default();

        let d = apply_failures(
            &mut flags,
            &mut t,
            &[FailureKind::BlockConflict],
            1,
            &config,
            &metrics,
        );
        assert!(d.retry_all);
        assert!(t.refetch_block);
    }

    #[test]
    fn test_block_conflict_keeps_caller_pin() {
        let mut flags = RetryFlags::default();
        let mut t = tuning(true);
        let config = FetcherConfig::default();
        let metrics = QuoteMetrics::default();

        apply_failures(
            &mut flags,
            &mut t,
            &[FailureKind::BlockConflict],
            1,
            &config,
            &metrics,
        );
        assert!(!t.refetch_block);
        assert_eq!(t.block_number, 100);
    }

    #[test]
    fn test_header_rollback_fires_on_second_attempt_only() {
        let mut flags = RetryFlags::default();
        let mut t = tuning(true);
        let config = FetcherConfig {
            rollback: true,
            ..FetcherConfig::default()
        };
        let metrics = QuoteMetrics::default();

        // First sighting: latch only
        let d = apply_failures(
            &mut flags,
            &mut t,
            &[FailureKind::BlockHeaderMissing],
            1,
            &config,
            &metrics,
        );
        assert!(!d.retry_all);
        assert_eq!(t.block_number, 100);

        // Second sighting on a later attempt: roll back once
        let d = apply_failures(
            &mut flags,
            &mut t,
            &[FailureKind::BlockHeaderMissing],
            2,
            &config,
            &metrics,
        );
        assert!(d.retry_all);
        assert_eq!(t.block_number, 99);
        assert!(flags.block_rolled_back);

        // Third sighting: the rollback is spent
        let d = apply_failures(
            &mut flags,
            &mut t,
            &[FailureKind::BlockHeaderMissing],
            3,
            &config,
            &metrics,
        );
        assert!(!d.retry_all);
        assert_eq!(t.block_number, 99);
        assert_eq!(metrics.snapshot().block_header_not_found_retry, 1);
    }

    #[test]
    fn test_header_rollback_disabled_by_default() {
        let mut flags = RetryFlags::default();
        let mut t = tuning(true);
        let config = FetcherConfig::default();
        let metrics = QuoteMetrics::default();

        for attempt in 1..=3 {
            apply_failures(
                &mut flags,
                &mut t,
                &[FailureKind::BlockHeaderMissing],
                attempt,
                &config,
                &metrics,
            );
        }
        assert_eq!(t.block_number, 100);
        assert!(!flags.block_rolled_back);
    }

    #[test]
    fn test_timeout_and_unknown_latch_metrics() {
        let mut flags = RetryFlags::default();
        let mut t = tuning(true);
        let config = FetcherConfig::default();
        let metrics = QuoteMetrics::default();

        for attempt in 1..=3 {
            apply_failures(
                &mut flags,
                &mut t,
                &[
                    FailureKind::Timeout,
                    FailureKind::Unknown("boom".to_string()),
                ],
                attempt,
                &config,
                &metrics,
            );
        }
        let s = metrics.snapshot();
        assert_eq!(s.timeout_retry, 1);
        assert_eq!(s.unknown_reason_retry, 1);
    }
}
