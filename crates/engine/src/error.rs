//! Engine-level error taxonomy.
//!
//! Cart mutations never fail because of the network; only validation can
//! reject them. Wishlist operations and checkout surface remote failures to the
//! caller, after making sure local state only reflects confirmed changes.

use thiserror::Error;

use crate::remote::ApiError;

/// Which step of checkout reconciliation failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileStage {
    /// Emptying the remote cart.
    ClearRemoteCart,
    /// Replaying a local line item into the remote cart.
    ReplayItem,
}

impl std::fmt::Display for ReconcileStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ClearRemoteCart => f.write_str("clearing remote cart"),
            Self::ReplayItem => f.write_str("replaying cart items"),
        }
    }
}

/// Errors surfaced by engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Input rejected locally; no state changed.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Remote service unreachable or refused the request; no state changed.
    #[error("Network error: {0}")]
    Network(#[source] ApiError),

    /// Checkout could not make the remote cart match the local cart.
    ///
    /// The local cart is untouched. `rolled_back` reports whether the remote
    /// cart was cleared again after a partial replay.
    #[error("Reconciliation failed while {stage}: {source}")]
    Reconciliation {
        stage: ReconcileStage,
        #[source]
        source: ApiError,
        rolled_back: bool,
    },

    /// The service refused to create the order; the local cart is untouched.
    #[error("Order creation failed: {0}")]
    OrderFailed(#[source] ApiError),

    /// The caller cancelled the operation; no state changed.
    #[error("Operation cancelled")]
    Cancelled,
}

impl EngineError {
    /// Whether the shopper can reasonably try again.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Validation(_) => false,
            Self::Network(err) | Self::OrderFailed(err) | Self::Reconciliation { source: err, .. } => {
                err.is_retryable()
            }
            Self::Cancelled => true,
        }
    }

    /// Message suitable for a transient notification.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Validation(msg) => msg.clone(),
            Self::Network(ApiError::Unauthorized) => "Please sign in to continue".to_string(),
            Self::Network(ApiError::Rejected(msg)) => msg.clone(),
            Self::Network(_) => "Could not reach the store, please try again".to_string(),
            Self::Reconciliation { .. } => {
                "We could not prepare your order. Your cart is safe, please try again".to_string()
            }
            Self::OrderFailed(ApiError::Rejected(msg)) => msg.clone(),
            Self::OrderFailed(_) => {
                "We could not place your order. Your cart is safe, please try again".to_string()
            }
            Self::Cancelled => "Cancelled".to_string(),
        }
    }
}

/// Result type alias for `EngineError`.
pub type Result<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_error_display() {
        let err = EngineError::Validation("Your cart is empty".to_string());
        assert_eq!(err.to_string(), "Validation error: Your cart is empty");

        let err = EngineError::Reconciliation {
            stage: ReconcileStage::ReplayItem,
            source: ApiError::Rejected("Out of stock".to_string()),
            rolled_back: true,
        };
        assert_eq!(
            err.to_string(),
            "Reconciliation failed while replaying cart items: Rejected: Out of stock"
        );
    }

    #[test]
    fn test_user_messages_hide_transport_details() {
        let err = EngineError::Network(ApiError::Api {
            status: 500,
            message: "stack trace here".to_string(),
        });
        assert!(!err.user_message().contains("stack trace"));
        assert!(err.is_retryable());

        let err = EngineError::Network(ApiError::Rejected("Coupon expired".to_string()));
        assert_eq!(err.user_message(), "Coupon expired");
        assert!(!err.is_retryable());
    }
}
