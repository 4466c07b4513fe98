//! Router Quoter Library
//!
//! Batched on-chain price discovery for AMM routing: fetches quoter results
//! for many (route, amount) pairs through aggregated multicalls, with typed
//! failure classification and per-kind retry strategies, all pinned to a
//! single block height.
//!
//! Author: AI-Generated
//! Created: 2026-02-02

pub mod config;
pub mod contracts;
pub mod multicall;
pub mod path;
pub mod quoter;
pub mod registry;
pub mod types;

// Re-export commonly used types
pub use config::{load_config, FetcherConfig, RetryConfig, SuccessRateOverrides};
pub use multicall::{OnChainQuoteAggregator, QuoteAggregator};
pub use quoter::{QuoteFetchError, QuoteFetcher};
pub use types::{QuoteResponse, QuoteRoute, RouteQuote, TokenAmount, TradeKind, V3PoolLeg};
