//! Batched Quote Fetch Engine
//!
//! Turns (routes × amounts) into aggregated quoter calls and retries the
//! parts that fail, with a different recovery strategy per failure kind:
//!
//!   plan → run pending batches in parallel → join → validate →
//!   decide retries → backoff → loop, then assemble per-route records.
//!
//! Every quote of a successful call is sampled at one block height. The
//! engine pins a block up front (the caller's, or the chain head fetched
//! once) and re-pins only when successful batches disagree on their height.
//!
//! The engine suspends in exactly three places per attempt: the optional
//! head fetch, the batch multicalls, and the backoff sleep. Dropping the
//! returned future cancels any in-flight batch with it; no state outlives
//! the call.
//!
//! Author: AI-Generated
//! Created: 2026-02-03
//! Modified: 2026-02-04 — block re-pin on conflict, per-call metrics

pub mod assembler;
pub mod batch;
pub mod metrics;
pub mod planner;
pub mod retry;
pub mod validator;

pub use batch::{BatchState, FailureKind};
pub use metrics::{MetricsSnapshot, QuoteMetrics};
pub use retry::{CallTuning, RetryFlags, OUT_OF_GAS_GAS_LIMIT, OUT_OF_GAS_MULTICALL_CHUNK};

use crate::config::FetcherConfig;
use crate::multicall::{AggregatorCallOptions, EncodedQuoteInput, QuoteAggregator};
use crate::registry;
use crate::types::{QuoteResponse, QuoteRoute, TokenAmount, TradeKind};
use alloy::primitives::Address;
use futures::future;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors surfaced to the caller. Everything retryable is handled inside
/// the attempt loop; these are the terminal conditions.
#[derive(Debug, Error)]
pub enum QuoteFetchError {
    #[error("no quoter contract registered for chain {0} and no override given")]
    MissingQuoterAddress(u64),

    #[error("quote retries exhausted after {attempts} attempts: {kinds}")]
    RetriesExhausted { attempts: u32, kinds: String },

    /// A batch survived the join still pending; a bug, not a provider issue.
    #[error("batch {0} still pending after all tasks joined")]
    PendingAfterJoin(usize),

    /// The reassembled flat result vector does not cover routes × amounts.
    #[error("quote results misaligned: expected {expected} entries, got {actual}")]
    PositionalMismatch { expected: usize, actual: usize },

    #[error(transparent)]
    Provider(#[from] anyhow::Error),
}

/// Batched quote fetcher, generic over the multicall collaborator.
///
/// All mutable state is per call; one fetcher can serve concurrent calls.
pub struct QuoteFetcher<A> {
    aggregator: A,
    chain_id: u64,
    config: FetcherConfig,
}

impl<A: QuoteAggregator> QuoteFetcher<A> {
    pub fn new(aggregator: A, chain_id: u64) -> Self {
        Self::with_config(aggregator, chain_id, FetcherConfig::default())
    }

    pub fn with_config(aggregator: A, chain_id: u64, config: FetcherConfig) -> Self {
        Self {
            aggregator,
            chain_id,
            config,
        }
    }

    /// Quote every (route, amount) pair for fixed input amounts.
    pub async fn get_quotes_many_exact_in(
        &self,
        amounts: &[TokenAmount],
        routes: &[QuoteRoute],
        config: Option<FetcherConfig>,
    ) -> Result<QuoteResponse, QuoteFetchError> {
        self.fetch_quotes(amounts, routes, TradeKind::ExactIn, config)
            .await
    }

    /// Quote every (route, amount) pair for fixed output amounts. Paths are
    /// encoded reversed so the quoter walks back to the required input.
    pub async fn get_quotes_many_exact_out(
        &self,
        amounts: &[TokenAmount],
        routes: &[QuoteRoute],
        config: Option<FetcherConfig>,
    ) -> Result<QuoteResponse, QuoteFetchError> {
        self.fetch_quotes(amounts, routes, TradeKind::ExactOut, config)
            .await
    }

    async fn fetch_quotes(
        &self,
        amounts: &[TokenAmount],
        routes: &[QuoteRoute],
        kind: TradeKind,
        config: Option<FetcherConfig>,
    ) -> Result<QuoteResponse, QuoteFetchError> {
        let config = config.unwrap_or_else(|| self.config.clone());
        let metrics = QuoteMetrics::default();

        if routes.is_empty() || amounts.is_empty() {
            return Ok(QuoteResponse {
                routes_with_quotes: Vec::new(),
                block_number: config.block_number.unwrap_or_default(),
                metrics: metrics.snapshot(),
            });
        }

        let quoter = registry::quoter_address(self.chain_id, config.quoter_address_override)
            .ok_or(QuoteFetchError::MissingQuoterAddress(self.chain_id))?;

        let inputs = planner::plan_inputs(routes, amounts, kind);
        let mut tuning = CallTuning {
            gas_limit_per_call: config.gas_limit_per_call,
            multicall_chunk: config.multicall_chunk,
            block_number: config.block_number.unwrap_or_default(),
            caller_pinned: config.block_number.is_some(),
            refetch_block: config.block_number.is_none(),
        };
        let mut flags = RetryFlags::default();

        let mut states: Vec<BatchState> = planner::chunk_evenly(&inputs, tuning.multicall_chunk)
            .into_iter()
            .map(|inputs| BatchState::Pending { inputs })
            .collect();
        QuoteMetrics::set(&metrics.expected_calls_to_provider, states.len() as u64);

        info!(
            "fetching {} quotes in {} batches ({} routes x {} amounts, {})",
            inputs.len(),
            states.len(),
            routes.len(),
            amounts.len(),
            kind
        );

        let max_attempts = config.retry.retries + 1;
        let mut attempts_used: u32 = 0;

        loop {
            if tuning.refetch_block {
                tuning.block_number = self.aggregator.latest_block_number().await?;
                tuning.refetch_block = false;
                debug!("pinned block {}", tuning.block_number);
            }

            self.run_pending_batches(quoter, kind, &mut states, &tuning, &config, &flags, &metrics)
                .await;

            if let Some(index) = states.iter().position(|state| state.is_pending()) {
                return Err(QuoteFetchError::PendingAfterJoin(index));
            }

            let mut failures: Vec<FailureKind> = states
                .iter()
                .filter_map(|state| match state {
                    BatchState::Failed { kind, .. } => Some(kind.clone()),
                    _ => None,
                })
                .collect();

            if validator::conflicting_blocks(&states).is_some() {
                failures.push(FailureKind::BlockConflict);
            }

            if failures.is_empty() {
                break;
            }

            attempts_used += 1;
            if attempts_used >= max_attempts {
                let mut kinds: Vec<String> =
                    failures.iter().map(|kind| kind.to_string()).collect();
                kinds.sort();
                kinds.dedup();
                metrics.log_summary();
                return Err(QuoteFetchError::RetriesExhausted {
                    attempts: attempts_used,
                    kinds: kinds.join(", "),
                });
            }
            QuoteMetrics::incr(&metrics.num_retry_loops);

            let decision = retry::apply_failures(
                &mut flags,
                &mut tuning,
                &failures,
                attempts_used,
                &config,
                &metrics,
            );

            if decision.retry_all {
                QuoteMetrics::add(&metrics.num_retried_calls, states.len() as u64);
                states = planner::chunk_evenly(&inputs, tuning.multicall_chunk)
                    .into_iter()
                    .map(|inputs| BatchState::Pending { inputs })
                    .collect();
            } else {
                let mut retried = 0u64;
                for state in states.iter_mut() {
                    if state.is_failed() {
                        let inputs = state.inputs().to_vec();
                        *state = BatchState::Pending { inputs };
                        retried += 1;
                    }
                }
                QuoteMetrics::add(&metrics.num_retried_calls, retried);
            }

            tokio::time::sleep(config.retry.backoff_for_attempt(attempts_used - 1)).await;
        }

        // All successful batches agree on the height; report the first
        let block_number = states
            .iter()
            .find_map(|state| match state {
                BatchState::Success { block_number, .. } => Some(*block_number),
                _ => None,
            })
            .unwrap_or(tuning.block_number);

        let gas_figures: Vec<u64> = states
            .iter()
            .filter_map(|state| match state {
                BatchState::Success {
                    approx_gas_per_success,
                    ..
                } => Some(*approx_gas_per_success),
                _ => None,
            })
            .collect();
        if !gas_figures.is_empty() {
            QuoteMetrics::set(
                &metrics.approx_gas_used_per_successful_call,
                gas_figures.iter().sum::<u64>() / gas_figures.len() as u64,
            );
        }

        let routes_with_quotes = assembler::assemble(routes, amounts, &states)?;
        metrics.log_summary();

        Ok(QuoteResponse {
            routes_with_quotes,
            block_number,
            metrics: metrics.snapshot(),
        })
    }

    /// Execute every pending batch of this attempt in parallel and fold the
    /// outcomes back into the state vector. All batches complete (success or
    /// typed failure) before this returns.
    #[allow(clippy::too_many_arguments)]
    async fn run_pending_batches(
        &self,
        quoter: Address,
        kind: TradeKind,
        states: &mut [BatchState],
        tuning: &CallTuning,
        config: &FetcherConfig,
        flags: &RetryFlags,
        metrics: &QuoteMetrics,
    ) {
        let options = AggregatorCallOptions {
            block_number: tuning.block_number,
            gas_limit_per_call: tuning.gas_limit_per_call,
        };

        let pending: Vec<(usize, Vec<EncodedQuoteInput>)> = states
            .iter()
            .enumerate()
            .filter_map(|(index, state)| {
                state
                    .is_pending()
                    .then(|| (index, state.inputs().to_vec()))
            })
            .collect();
        if pending.is_empty() {
            return;
        }

        let min_rate = config.quote_min_success_rate;
        let already_retried_rate = flags.retried_success_rate;

        let tasks = pending.into_iter().map(|(index, inputs)| {
            let aggregator = &self.aggregator;
            async move {
                QuoteMetrics::incr(&metrics.total_calls_to_provider);
                let outcome = aggregator.quote_batch(quoter, kind, &inputs, &options).await;
                (index, inputs, outcome)
            }
        });

        for (index, inputs, outcome) in future::join_all(tasks).await {
            states[index] = match outcome {
                Ok(aggregated) => validator::apply_success_rate_floor(
                    inputs,
                    aggregated,
                    min_rate,
                    already_retried_rate,
                ),
                Err(error) => {
                    let message = format!("{:#}", error);
                    let failure_kind = batch::classify_provider_error(&message);
                    let detail = batch::truncate_detail(&message);
                    warn!("batch {} failed ({}): {}", index, failure_kind, detail);
                    BatchState::Failed {
                        inputs,
                        kind: failure_kind,
                        detail,
                        partial: None,
                    }
                }
            };
        }
    }
}
