//! Per-Chain Contract Address Registry
//!
//! QuoterV2 and gas-limited interface multicall deployments for the chains
//! the fetcher supports. An explicit override always wins over the table;
//! a chain with no entry and no override cannot be quoted.
//!
//! Author: AI-Generated
//! Created: 2026-02-02

use alloy::primitives::{address, Address};
use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Chain ids with known deployments.
pub const ETHEREUM: u64 = 1;
pub const OPTIMISM: u64 = 10;
pub const POLYGON: u64 = 137;
pub const BASE: u64 = 8453;
pub const ARBITRUM: u64 = 42161;

/// QuoterV2 deployments. Uniswap deploys the same address on most chains;
/// Base got its own.
static QUOTER_V2_ADDRESSES: Lazy<HashMap<u64, Address>> = Lazy::new(|| {
    let canonical = address!("61ffe014ba17989e743c5f6cb21bf9697530b21e");
    HashMap::from([
        (ETHEREUM, canonical),
        (OPTIMISM, canonical),
        (POLYGON, canonical),
        (ARBITRUM, canonical),
        (BASE, address!("3d4e44eb1374240ce5f1b871ab261cd16335b76a")),
    ])
});

/// Gas-limited interface multicall deployments.
static INTERFACE_MULTICALL_ADDRESSES: Lazy<HashMap<u64, Address>> = Lazy::new(|| {
    let canonical = address!("1f98415757620b543a52e61c46b32eb19261f984");
    HashMap::from([
        (ETHEREUM, canonical),
        (OPTIMISM, canonical),
        (POLYGON, canonical),
        (ARBITRUM, canonical),
        (BASE, address!("091e99cb1c49331a94dd62755d168e941abd0693")),
    ])
});

/// Resolve the quoter address for a chain. The override supersedes the table.
pub fn quoter_address(chain_id: u64, override_address: Option<Address>) -> Option<Address> {
    override_address.or_else(|| QUOTER_V2_ADDRESSES.get(&chain_id).copied())
}

/// Resolve the interface multicall address for a chain.
pub fn multicall_address(chain_id: u64) -> Option<Address> {
    INTERFACE_MULTICALL_ADDRESSES.get(&chain_id).copied()
}
