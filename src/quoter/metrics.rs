//! Per-Call Quote Metrics
//!
//! Minimal counters for operational visibility into one fetch call. Retry
//! counters fire at most once per call (they latch on the first occurrence
//! of their failure kind); the rest accumulate.
//!
//! Author: AI-Generated
//! Created: 2026-02-03

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::info;

/// Counters for a single fetch call. Shared by reference across the
/// parallel batch tasks of an attempt.
#[derive(Debug, Default)]
pub struct QuoteMetrics {
    pub block_conflict_error_retry: AtomicU64,
    pub block_header_not_found_retry: AtomicU64,
    pub timeout_retry: AtomicU64,
    pub out_of_gas_exception_retry: AtomicU64,
    pub success_rate_retry: AtomicU64,
    pub unknown_reason_retry: AtomicU64,
    pub approx_gas_used_per_successful_call: AtomicU64,
    pub num_retry_loops: AtomicU64,
    pub total_calls_to_provider: AtomicU64,
    pub expected_calls_to_provider: AtomicU64,
    pub num_retried_calls: AtomicU64,
}

impl QuoteMetrics {
    pub fn incr(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn add(counter: &AtomicU64, value: u64) {
        counter.fetch_add(value, Ordering::Relaxed);
    }

    pub fn set(counter: &AtomicU64, value: u64) {
        counter.store(value, Ordering::Relaxed);
    }

    /// Immutable copy for the caller.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            block_conflict_error_retry: self.block_conflict_error_retry.load(Ordering::Relaxed),
            block_header_not_found_retry: self
                .block_header_not_found_retry
                .load(Ordering::Relaxed),
            timeout_retry: self.timeout_retry.load(Ordering::Relaxed),
            out_of_gas_exception_retry: self.out_of_gas_exception_retry.load(Ordering::Relaxed),
            success_rate_retry: self.success_rate_retry.load(Ordering::Relaxed),
            unknown_reason_retry: self.unknown_reason_retry.load(Ordering::Relaxed),
            approx_gas_used_per_successful_call: self
                .approx_gas_used_per_successful_call
                .load(Ordering::Relaxed),
            num_retry_loops: self.num_retry_loops.load(Ordering::Relaxed),
            total_calls_to_provider: self.total_calls_to_provider.load(Ordering::Relaxed),
            expected_calls_to_provider: self.expected_calls_to_provider.load(Ordering::Relaxed),
            num_retried_calls: self.num_retried_calls.load(Ordering::Relaxed),
        }
    }

    /// Dump the counters once at call end, under their canonical names.
    pub fn log_summary(&self) {
        let s = self.snapshot();
        info!(
            QuoteBlockConflictErrorRetry = s.block_conflict_error_retry,
            QuoteBlockHeaderNotFoundRetry = s.block_header_not_found_retry,
            QuoteTimeoutRetry = s.timeout_retry,
            QuoteOutOfGasExceptionRetry = s.out_of_gas_exception_retry,
            QuoteSuccessRateRetry = s.success_rate_retry,
            QuoteUnknownReasonRetry = s.unknown_reason_retry,
            QuoteApproxGasUsedPerSuccessfulCall = s.approx_gas_used_per_successful_call,
            QuoteNumRetryLoops = s.num_retry_loops,
            QuoteTotalCallsToProvider = s.total_calls_to_provider,
            QuoteExpectedCallsToProvider = s.expected_calls_to_provider,
            QuoteNumRetriedCalls = s.num_retried_calls,
            "quote fetch metrics"
        );
    }
}

/// Plain-value copy of `QuoteMetrics`, returned with every fetch result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub block_conflict_error_retry: u64,
    pub block_header_not_found_retry: u64,
    pub timeout_retry: u64,
    pub out_of_gas_exception_retry: u64,
    pub success_rate_retry: u64,
    pub unknown_reason_retry: u64,
    pub approx_gas_used_per_successful_call: u64,
    pub num_retry_loops: u64,
    pub total_calls_to_provider: u64,
    pub expected_calls_to_provider: u64,
    pub num_retried_calls: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_reflects_counters() {
        let metrics = QuoteMetrics::default();
        QuoteMetrics::incr(&metrics.num_retry_loops);
        QuoteMetrics::incr(&metrics.num_retry_loops);
        QuoteMetrics::add(&metrics.total_calls_to_provider, 3);
        QuoteMetrics::set(&metrics.approx_gas_used_per_successful_call, 90_000);

        let s = metrics.snapshot();
        assert_eq!(s.num_retry_loops, 2);
        assert_eq!(s.total_calls_to_provider, 3);
        assert_eq!(s.approx_gas_used_per_successful_call, 90_000);
        assert_eq!(s.timeout_retry, 0);
    }
}
