//! Error types for the protocol engine

use thiserror::Error;

/// Result type for protocol operations
pub type Result<T> = std::result::Result<T, Error>;

/// Protocol errors
///
/// Every rejected call leaves state unchanged; no error is fatal to the
/// engine and none is retried internally.
#[derive(Error, Debug)]
pub enum Error {
    /// Caller lacks standing for this operation
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Airline has not reached the activation threshold
    #[error("Airline not funded: {0}")]
    NotFunded(String),

    /// Identity has no registry entry
    #[error("Not registered: {0}")]
    NotRegistered(String),

    /// Airline is already registered
    #[error("Already registered: {0}")]
    AlreadyRegistered(String),

    /// Flight key already present
    #[error("Already exists: {0}")]
    AlreadyExists(String),

    /// Flight status already resolved
    #[error("Already resolved: {0}")]
    AlreadyResolved(String),

    /// Flight key does not match any registered flight
    #[error("Unknown flight: {0}")]
    UnknownFlight(String),

    /// No open oracle request matches the report
    #[error("Unknown request: {0}")]
    UnknownRequest(String),

    /// Reported index is not assigned to the oracle or does not match
    /// the request's target index
    #[error("Index mismatch: {0}")]
    IndexMismatch(String),

    /// Cumulative premium would exceed the per-policy cap
    #[error("Premium exceeds cap: premium {premium} wei, cap {cap} wei")]
    PremiumExceedsCap {
        /// Cumulative premium after the purchase
        premium: u128,
        /// Protocol premium cap
        cap: u128,
    },

    /// Passenger has no payable claims
    #[error("Nothing to withdraw: {0}")]
    NothingToWithdraw(String),

    /// Amount must be positive
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    /// Oracle registration fee below the protocol fee
    #[error("Insufficient fee: paid {paid} wei, required {required} wei")]
    InsufficientFee {
        /// Fee offered by the caller
        paid: u128,
        /// Fixed registration fee
        required: u128,
    },

    /// Administrative gate closed
    #[error("Protocol suspended")]
    ProtocolSuspended,

    /// Invariant violation (reserve accounting, etc.)
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Error taxonomy exposed to callers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Caller lacks standing
    Authorization,
    /// Operation is a no-op against already-settled state
    Conflict,
    /// Malformed or out-of-bound request
    Validation,
    /// Administrative gate closed
    Availability,
    /// Engine-internal failure
    Internal,
}

impl Error {
    /// Category of this error
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Unauthorized(_) | Error::NotFunded(_) | Error::NotRegistered(_) => {
                ErrorCategory::Authorization
            }
            Error::AlreadyRegistered(_) | Error::AlreadyExists(_) | Error::AlreadyResolved(_) => {
                ErrorCategory::Conflict
            }
            Error::UnknownFlight(_)
            | Error::UnknownRequest(_)
            | Error::IndexMismatch(_)
            | Error::PremiumExceedsCap { .. }
            | Error::NothingToWithdraw(_)
            | Error::InvalidAmount(_)
            | Error::InsufficientFee { .. } => ErrorCategory::Validation,
            Error::ProtocolSuspended => ErrorCategory::Availability,
            Error::InvariantViolation(_) | Error::Config(_) | Error::Io(_) => {
                ErrorCategory::Internal
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_categories() {
        assert_eq!(
            Error::Unauthorized("x".into()).category(),
            ErrorCategory::Authorization
        );
        assert_eq!(
            Error::AlreadyResolved("x".into()).category(),
            ErrorCategory::Conflict
        );
        assert_eq!(
            Error::IndexMismatch("x".into()).category(),
            ErrorCategory::Validation
        );
        assert_eq!(Error::ProtocolSuspended.category(), ErrorCategory::Availability);
        assert_eq!(
            Error::InvariantViolation("x".into()).category(),
            ErrorCategory::Internal
        );
    }
}
