//! Error types for the marketplace engine

use market_core::{ContributionStatus, Karma, RequestStatus, UserId};
use thiserror::Error;
use uuid::Uuid;

/// Result type for marketplace operations
pub type Result<T> = std::result::Result<T, Error>;

/// Marketplace errors
#[derive(Error, Debug)]
pub enum Error {
    /// Bounty below the policy minimum
    #[error("Bounty {bounty} is below the minimum of {minimum}")]
    BountyBelowMinimum {
        /// Offered bounty
        bounty: Karma,
        /// Policy minimum
        minimum: Karma,
    },

    /// Targeted audience reference did not resolve to a user
    #[error("Audience target '{0}' does not resolve to a known user")]
    UnknownTarget(String),

    /// Acting user does not own the request
    #[error("User {user} does not own request {request}")]
    NotOwner {
        /// Acting user
        user: UserId,
        /// Addressed request
        request: Uuid,
    },

    /// Owners may not contribute to their own requests
    #[error("Request owners may not contribute to their own requests")]
    OwnContribution,

    /// Targeted request, and the author is not the target
    #[error("Request {request} is not open to contributions from {user}")]
    NotInAudience {
        /// Submitting user
        user: UserId,
        /// Addressed request
        request: Uuid,
    },

    /// Request status forbids the operation
    #[error("Request {request} is {status}; operation requires {required}")]
    InvalidStatus {
        /// Addressed request
        request: Uuid,
        /// Status found
        status: RequestStatus,
        /// Status the operation requires
        required: RequestStatus,
    },

    /// Contribution already decided
    #[error("Contribution {contribution} is already {status}")]
    ContributionSettled {
        /// Addressed contribution
        contribution: Uuid,
        /// Status found
        status: ContributionStatus,
    },

    /// Writer contention: mailbox full, closed, or operation timed out
    #[error("Marketplace writer busy: {0}")]
    Conflict(String),

    /// Core error (ledger, storage, not-found)
    #[error(transparent)]
    Core(#[from] market_core::Error),
}

/// Error classification for API layers
///
/// Lets the transport map errors to user-facing responses without matching
/// on concrete variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed input
    Validation,
    /// Debit exceeds the current balance
    InsufficientFunds,
    /// Referenced record does not exist (including already-deleted)
    NotFound,
    /// Acting user lacks ownership or audience membership
    PermissionDenied,
    /// Operation forbidden in the current lifecycle status
    InvalidState,
    /// Contention prevented serialized execution in time
    Conflict,
    /// Storage or configuration failure
    Internal,
}

impl Error {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::BountyBelowMinimum { .. } | Error::UnknownTarget(_) => ErrorKind::Validation,
            Error::NotOwner { .. } | Error::OwnContribution | Error::NotInAudience { .. } => {
                ErrorKind::PermissionDenied
            }
            Error::InvalidStatus { .. } | Error::ContributionSettled { .. } => {
                ErrorKind::InvalidState
            }
            Error::Conflict(_) => ErrorKind::Conflict,
            Error::Core(core) => match core {
                market_core::Error::InvalidAmount | market_core::Error::BalanceOverflow { .. } => {
                    ErrorKind::Validation
                }
                market_core::Error::InsufficientFunds { .. } => ErrorKind::InsufficientFunds,
                market_core::Error::RequestNotFound(_)
                | market_core::Error::ContributionNotFound(_) => ErrorKind::NotFound,
                _ => ErrorKind::Internal,
            },
        }
    }
}
