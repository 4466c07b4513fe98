//! Quote Probe Binary
//!
//! One-shot diagnostic: quotes a single pool route at evenly spaced
//! fractions of a trade amount and prints the result as JSON.
//!
//! Usage:
//!   RPC_URL=... CHAIN_ID=137 cargo run --bin quote-probe -- \
//!     --token-in 0x2791... --token-out 0x7ceb... --fee 500 --amount 1000000
//!
//! Author: AI-Generated
//! Created: 2026-02-04

use anyhow::{Context, Result};
use clap::Parser;
use alloy::primitives::{Address, U256};
use alloy::providers::ProviderBuilder;
use router_quoter::config::load_config;
use router_quoter::multicall::OnChainQuoteAggregator;
use router_quoter::quoter::QuoteFetcher;
use router_quoter::types::{QuoteRoute, TokenAmount};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "quote-probe", about = "Fetch batched on-chain quotes for one pool route")]
struct Args {
    /// Input token address
    #[arg(long)]
    token_in: Address,

    /// Output token address
    #[arg(long)]
    token_out: Address,

    /// Pool fee tier in hundredths of a bip (500, 3000, 10000)
    #[arg(long, default_value = "500")]
    fee: u32,

    /// Full trade amount in raw token units
    #[arg(long)]
    amount: U256,

    /// Decimals of the quoted token (display only)
    #[arg(long, default_value = "18")]
    decimals: u8,

    /// Number of evenly spaced sub-amounts to quote
    #[arg(long, default_value = "5")]
    splits: u64,

    /// Quote a fixed output amount instead of a fixed input
    #[arg(long)]
    exact_out: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = load_config()?;
    info!("Quote probe starting | chain={}", config.chain_id);

    let provider = ProviderBuilder::new()
        .connect(&config.rpc_url)
        .await
        .context("Failed to connect to RPC")?;
    let aggregator = OnChainQuoteAggregator::new(provider, config.chain_id)?;
    let fetcher = QuoteFetcher::with_config(aggregator, config.chain_id, config.fetcher.clone());

    let route = QuoteRoute::single(args.token_in, args.token_out, args.fee);
    let amount_token = if args.exact_out {
        args.token_out
    } else {
        args.token_in
    };

    // Quote at 1/n, 2/n, …, n/n of the full amount, the way the routing
    // engine samples a trade before splitting it
    let splits = args.splits.max(1);
    let amounts: Vec<TokenAmount> = (1..=splits)
        .map(|i| {
            TokenAmount::new(
                amount_token,
                args.decimals,
                args.amount * U256::from(i) / U256::from(splits),
            )
        })
        .collect();

    let routes = std::slice::from_ref(&route);
    let response = if args.exact_out {
        fetcher
            .get_quotes_many_exact_out(&amounts, routes, None)
            .await?
    } else {
        fetcher
            .get_quotes_many_exact_in(&amounts, routes, None)
            .await?
    };

    info!(
        "Fetched {} quotes at block {}",
        response
            .routes_with_quotes
            .iter()
            .map(|(_, quotes)| quotes.len())
            .sum::<usize>(),
        response.block_number
    );
    println!("{}", serde_json::to_string_pretty(&response)?);

    Ok(())
}
