//! V3 Swap Path Encoding
//!
//! Packs a route into the byte layout the quoter consumes:
//! `token(20) ‖ fee(3) ‖ token(20) [‖ fee(3) ‖ token(20) …]`.
//!
//! Output-amount quotes walk the path backwards on-chain, so ExactOut
//! callers encode with `reverse = true`.
//!
//! Author: AI-Generated
//! Created: 2026-02-02

use crate::types::QuoteRoute;
use alloy::primitives::{Address, Bytes};

/// Packed size of one token address.
const ADDR_SIZE: usize = 20;

/// Packed size of one fee tier (uint24).
const FEE_SIZE: usize = 3;

/// Encode a route into a packed V3 path.
///
/// `reverse = true` emits the path output-token-first, which the quoter's
/// output-amount entry point requires.
pub fn encode_path(route: &QuoteRoute, reverse: bool) -> Bytes {
    let mut tokens: Vec<Address> = Vec::with_capacity(route.num_pools() + 1);
    tokens.push(route.input_token());
    for leg in route.legs() {
        tokens.push(leg.token_out);
    }
    let mut fees: Vec<u32> = route.legs().iter().map(|leg| leg.fee).collect();

    if reverse {
        tokens.reverse();
        fees.reverse();
    }

    let mut packed = Vec::with_capacity(tokens.len() * ADDR_SIZE + fees.len() * FEE_SIZE);
    for (i, token) in tokens.iter().enumerate() {
        packed.extend_from_slice(token.as_slice());
        if i < fees.len() {
            // uint24 big-endian: low 3 bytes of the u32
            packed.extend_from_slice(&fees[i].to_be_bytes()[1..]);
        }
    }

    Bytes::from(packed)
}
