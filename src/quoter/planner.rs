//! Input Planning
//!
//! Flattens (routes × amounts) into the positional input sequence the
//! aggregator consumes, and splits it into evenly sized chunks under the
//! per-call cap.
//!
//! Author: AI-Generated
//! Created: 2026-02-03

use crate::multicall::EncodedQuoteInput;
use crate::path::encode_path;
use crate::types::{QuoteRoute, TokenAmount, TradeKind};

/// Flatten routes × amounts, route-major and amount-minor: every amount for
/// route 0, then every amount for route 1, and so on. The assembler relies
/// on this layout to re-associate results by index.
///
/// Each route's path is encoded once; ExactOut encodes it reversed so the
/// quoter walks back from the desired output.
pub fn plan_inputs(
    routes: &[QuoteRoute],
    amounts: &[TokenAmount],
    kind: TradeKind,
) -> Vec<EncodedQuoteInput> {
    let mut inputs = Vec::with_capacity(routes.len() * amounts.len());
    for route in routes {
        let path = encode_path(route, kind == TradeKind::ExactOut);
        for amount in amounts {
            inputs.push(EncodedQuoteInput {
                path: path.clone(),
                amount: amount.raw,
            });
        }
    }
    inputs
}

/// Split the input sequence into contiguous chunks that never exceed
/// `multicall_chunk` and differ in size by at most one.
///
/// With N inputs: num_chunks = ⌈N / multicall_chunk⌉, sized ⌈N / num_chunks⌉
/// or one less. 250 inputs at cap 210 become 125 + 125 rather than 210 + 40.
pub fn chunk_evenly(
    inputs: &[EncodedQuoteInput],
    multicall_chunk: usize,
) -> Vec<Vec<EncodedQuoteInput>> {
    if inputs.is_empty() {
        return Vec::new();
    }
    let num_chunks = inputs.len().div_ceil(multicall_chunk.max(1));
    let base = inputs.len() / num_chunks;
    let remainder = inputs.len() % num_chunks;

    let mut chunks = Vec::with_capacity(num_chunks);
    let mut offset = 0;
    for i in 0..num_chunks {
        // The first `remainder` chunks absorb one extra input each
        let size = if i < remainder { base + 1 } else { base };
        chunks.push(inputs[offset..offset + size].to_vec());
        offset += size;
    }
    chunks
}
