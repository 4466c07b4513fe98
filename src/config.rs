//! Configuration management
//! Fetcher tuning knobs plus .env loading for the quote-probe binary

use alloy::primitives::Address;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::time::Duration;

/// Exponential-backoff retry policy for the attempt loop.
#[derive(Debug, Clone, Deserialize)]
pub struct RetryConfig {
    /// Number of retries after the initial attempt.
    pub retries: u32,
    /// Backoff before the first retry.
    pub min_timeout_ms: u64,
    /// Backoff ceiling.
    pub max_timeout_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            retries: 2,
            min_timeout_ms: 25,
            max_timeout_ms: 250,
        }
    }
}

impl RetryConfig {
    /// Backoff duration before retry `attempt` (0-indexed), doubling each
    /// time and capped at `max_timeout_ms`.
    pub fn backoff_for_attempt(&self, attempt: u32) -> Duration {
        let ms = self
            .min_timeout_ms
            .saturating_mul(1u64 << attempt.min(32))
            .min(self.max_timeout_ms);
        Duration::from_millis(ms)
    }
}

/// Tuning applied when a batch first falls below the success-rate floor:
/// more gas per call, smaller batches, and a full re-plan.
#[derive(Debug, Clone, Deserialize)]
pub struct SuccessRateOverrides {
    pub gas_limit_override: u64,
    pub multicall_chunk: usize,
}

impl Default for SuccessRateOverrides {
    fn default() -> Self {
        Self {
            gas_limit_override: 1_300_000,
            multicall_chunk: 110,
        }
    }
}

/// Per-call configuration for the quote fetcher.
///
/// The defaults match the mainline deployment; callers override per call
/// when a chain needs different batching limits.
#[derive(Debug, Clone, Deserialize)]
pub struct FetcherConfig {
    /// Max encoded inputs per aggregator call.
    pub multicall_chunk: usize,
    /// Per-quote gas ceiling inside the aggregator.
    pub gas_limit_per_call: u64,
    /// Per-batch success-rate floor in [0, 1]. A batch below the floor is
    /// failed and retried once with `success_rate_failure_overrides`.
    pub quote_min_success_rate: f64,
    pub success_rate_failure_overrides: SuccessRateOverrides,
    /// When true, a repeated missing-block-header failure rolls the pinned
    /// block back by one (at most once per call).
    pub rollback: bool,
    pub retry: RetryConfig,
    /// Supersedes the chain registry's quoter address.
    pub quoter_address_override: Option<Address>,
    /// Caller-pinned block. When absent the fetcher pins the current block
    /// once at the start of the call.
    pub block_number: Option<u64>,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            multicall_chunk: 210,
            gas_limit_per_call: 705_000,
            quote_min_success_rate: 0.15,
            success_rate_failure_overrides: SuccessRateOverrides::default(),
            rollback: false,
            retry: RetryConfig::default(),
            quoter_address_override: None,
            block_number: None,
        }
    }
}

/// Environment-derived configuration for the quote-probe binary.
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    pub rpc_url: String,
    pub chain_id: u64,
    pub fetcher: FetcherConfig,
}

/// Load probe configuration from the environment (.env supported).
///
/// Required: RPC_URL, CHAIN_ID. Everything else falls back to
/// `FetcherConfig::default()` and can be overridden per variable.
pub fn load_config() -> Result<ProbeConfig> {
    dotenv::dotenv().ok();

    let rpc_url = std::env::var("RPC_URL").context("RPC_URL not set")?;
    let chain_id = std::env::var("CHAIN_ID")
        .context("CHAIN_ID not set")?
        .parse()
        .context("CHAIN_ID is not a number")?;

    let mut fetcher = FetcherConfig::default();
    if let Some(v) = env_parse("MULTICALL_CHUNK")? {
        fetcher.multicall_chunk = v;
    }
    if let Some(v) = env_parse("GAS_LIMIT_PER_CALL")? {
        fetcher.gas_limit_per_call = v;
    }
    if let Some(v) = env_parse("QUOTE_MIN_SUCCESS_RATE")? {
        fetcher.quote_min_success_rate = v;
    }
    if let Some(v) = env_parse("QUOTE_ROLLBACK")? {
        fetcher.rollback = v;
    }
    if let Some(v) = env_parse("QUOTE_RETRIES")? {
        fetcher.retry.retries = v;
    }
    if let Some(v) = env_parse("QUOTE_RETRY_MIN_TIMEOUT_MS")? {
        fetcher.retry.min_timeout_ms = v;
    }
    if let Some(v) = env_parse("QUOTE_RETRY_MAX_TIMEOUT_MS")? {
        fetcher.retry.max_timeout_ms = v;
    }
    if let Some(v) = env_parse::<Address>("QUOTER_ADDRESS_OVERRIDE")? {
        fetcher.quoter_address_override = Some(v);
    }
    if let Some(v) = env_parse("QUOTE_BLOCK_NUMBER")? {
        fetcher.block_number = Some(v);
    }

    Ok(ProbeConfig {
        rpc_url,
        chain_id,
        fetcher,
    })
}

/// Parse an optional env var, erroring only when it is present but invalid.
fn env_parse<T: std::str::FromStr>(name: &str) -> Result<Option<T>>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(name) {
        Ok(raw) => {
            let parsed = raw
                .parse()
                .with_context(|| format!("{} has invalid value: {}", name, raw))?;
            Ok(Some(parsed))
        }
        Err(_) => Ok(None),
    }
}
