//! Batch State and Failure Classification
//!
//! Each chunk of encoded inputs moves through Pending → Success/Failed
//! across retry attempts. Provider errors are classified into a closed set
//! of failure kinds; each kind gets its own recovery strategy.
//!
//! Author: AI-Generated
//! Created: 2026-02-03

use crate::multicall::{AggregatedQuotes, EncodedQuoteInput, QuoteCallResult};
use std::fmt;

/// Provider error messages routinely embed full calldata; cap what we keep.
pub const MAX_FAILURE_DETAIL_LEN: usize = 500;

/// Why a batch (or the whole attempt) failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    /// Node has not seen the pinned block yet ("header not found").
    BlockHeaderMissing,
    /// Provider-side timeout.
    Timeout,
    /// The batch blew the node's per-call gas ceiling.
    OutOfGas,
    /// Too many sub-calls inside one batch failed.
    SuccessRateTooLow,
    /// Successful batches disagreed on the block height.
    BlockConflict,
    /// Anything else, with the (truncated) provider message.
    Unknown(String),
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            FailureKind::BlockHeaderMissing => write!(f, "ProviderBlockHeaderError"),
            FailureKind::Timeout => write!(f, "ProviderTimeoutError"),
            FailureKind::OutOfGas => write!(f, "ProviderGasError"),
            FailureKind::SuccessRateTooLow => write!(f, "SuccessRateError"),
            FailureKind::BlockConflict => write!(f, "BlockConflictError"),
            FailureKind::Unknown(_) => write!(f, "UnknownError"),
        }
    }
}

/// Classify a raw provider error message by substring, in priority order.
pub fn classify_provider_error(message: &str) -> FailureKind {
    if message.contains("header not found") {
        FailureKind::BlockHeaderMissing
    } else if message.contains("timeout") {
        FailureKind::Timeout
    } else if message.contains("out of gas") {
        FailureKind::OutOfGas
    } else {
        FailureKind::Unknown(truncate_detail(message))
    }
}

/// Truncate a provider message to `MAX_FAILURE_DETAIL_LEN` characters.
pub fn truncate_detail(message: &str) -> String {
    message.chars().take(MAX_FAILURE_DETAIL_LEN).collect()
}

/// State of one chunk of inputs within the current call.
#[derive(Debug, Clone)]
pub enum BatchState {
    /// Not yet executed on this attempt.
    Pending { inputs: Vec<EncodedQuoteInput> },
    /// Executed and accepted; skipped on later attempts.
    Success {
        inputs: Vec<EncodedQuoteInput>,
        block_number: u64,
        results: Vec<QuoteCallResult>,
        approx_gas_per_success: u64,
    },
    /// Executed and rejected; re-executed on the next attempt.
    Failed {
        inputs: Vec<EncodedQuoteInput>,
        kind: FailureKind,
        detail: String,
        /// Present when the batch executed but was rejected by validation.
        partial: Option<AggregatedQuotes>,
    },
}

impl BatchState {
    pub fn inputs(&self) -> &[EncodedQuoteInput] {
        match self {
            BatchState::Pending { inputs }
            | BatchState::Success { inputs, .. }
            | BatchState::Failed { inputs, .. } => inputs,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, BatchState::Pending { .. })
    }

    pub fn is_success(&self) -> bool {
        matches!(self, BatchState::Success { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, BatchState::Failed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_known_substrings() {
        assert_eq!(
            classify_provider_error("rpc error: header not found at height 1234"),
            FailureKind::BlockHeaderMissing
        );
        assert_eq!(
            classify_provider_error("request timeout after 10s"),
            FailureKind::Timeout
        );
        assert_eq!(
            classify_provider_error("err: out of gas while executing"),
            FailureKind::OutOfGas
        );
    }

    #[test]
    fn test_classify_priority_order() {
        // "header not found" wins even when the message also mentions a timeout
        assert_eq!(
            classify_provider_error("header not found after timeout"),
            FailureKind::BlockHeaderMissing
        );
    }

    #[test]
    fn test_unknown_carries_truncated_message() {
        let long = "x".repeat(2_000);
        match classify_provider_error(&long) {
            FailureKind::Unknown(detail) => {
                assert_eq!(detail.chars().count(), MAX_FAILURE_DETAIL_LEN)
            }
            other => panic!("expected Unknown, got {:?}", other),
        }
    }

    #[test]
    fn test_display_names() {
        assert_eq!(FailureKind::Timeout.to_string(), "ProviderTimeoutError");
        assert_eq!(FailureKind::OutOfGas.to_string(), "ProviderGasError");
        assert_eq!(
            FailureKind::Unknown("whatever".into()).to_string(),
            "UnknownError"
        );
    }
}
