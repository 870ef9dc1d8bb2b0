//! Error types for the Orbook venue.
//!
//! All errors use the `OB_ERR_` prefix convention for easy grepping in logs.
//! Error codes are grouped by subsystem:
//! - 1xx: Order parameter errors
//! - 2xx: Ledger balance errors
//! - 3xx: External asset transfer errors
//! - 4xx: Authorization errors
//! - 5xx: Market registry errors
//! - 9xx: Internal / configuration errors

use rust_decimal::Decimal;
use thiserror::Error;

use crate::{AssetId, MarketPair};

/// Central error enum for all Orbook operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OrbookError {
    // =================================================================
    // Order Errors (1xx)
    // =================================================================
    /// Price or quantity is zero, negative, too precise, or overflows.
    #[error("OB_ERR_100: Invalid params: {reason}")]
    InvalidParameters { reason: String },

    // =================================================================
    // Balance Errors (2xx)
    // =================================================================
    /// The ledger does not hold enough available funds.
    #[error("OB_ERR_200: Insufficient balance: need {needed}, have {available}")]
    BalanceInsufficient { needed: Decimal, available: Decimal },

    // =================================================================
    // Asset Transfer Errors (3xx)
    // =================================================================
    /// The upstream pull transfer was not authorized by the owner.
    #[error("OB_ERR_300: Insufficient allowance on {asset}: need {needed}, approved {allowance}")]
    AllowanceInsufficient {
        asset: AssetId,
        needed: Decimal,
        allowance: Decimal,
    },

    /// The upstream push transfer failed.
    #[error("OB_ERR_301: Asset transfer failed: {reason}")]
    TransferFailed { reason: String },

    // =================================================================
    // Authorization Errors (4xx)
    // =================================================================
    /// The caller is not permitted to perform this operation.
    #[error("OB_ERR_400: Not authorised: {reason}")]
    NotAuthorized { reason: String },

    // =================================================================
    // Registry Errors (5xx)
    // =================================================================
    /// No order book exists for the requested pair.
    #[error("OB_ERR_500: Orderbook not found for {0}")]
    MarketNotFound(MarketPair),

    /// An order book already exists for this pair (in either orientation).
    #[error("OB_ERR_501: Orderbook already exists for {0}")]
    MarketAlreadyExists(MarketPair),

    // =================================================================
    // Internal (9xx)
    // =================================================================
    /// A ledger or conservation invariant was broken. Never expected in a
    /// correct build; callers must treat this as fatal.
    #[error("OB_ERR_900: Invariant violation: {reason}")]
    InvariantViolation { reason: String },

    /// Configuration error (invalid config document, bad precision, etc.).
    #[error("OB_ERR_901: Configuration error: {0}")]
    Configuration(String),
}

impl OrbookError {
    /// Shorthand for [`OrbookError::InvalidParameters`].
    pub fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidParameters {
            reason: reason.into(),
        }
    }

    /// Shorthand for [`OrbookError::InvariantViolation`].
    pub fn invariant(reason: impl Into<String>) -> Self {
        Self::InvariantViolation {
            reason: reason.into(),
        }
    }

    /// Whether this error signals a broken internal invariant rather than a
    /// rejected request.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::InvariantViolation { .. })
    }
}

/// Crate-wide `Result` alias.
pub type Result<T> = std::result::Result<T, OrbookError>;

impl From<serde_json::Error> for OrbookError {
    fn from(err: serde_json::Error) -> Self {
        Self::Configuration(err.to_string())
    }
}
