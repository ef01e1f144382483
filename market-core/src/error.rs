//! Error types for the marketplace core

use thiserror::Error;
use uuid::Uuid;

/// Result type for core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core errors
#[derive(Error, Debug)]
pub enum Error {
    /// Storage error (RocksDB)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] bincode::Error),

    /// Zero amount passed to a ledger mutation
    #[error("Amount must be a positive integer")]
    InvalidAmount,

    /// Debit exceeds the current balance
    #[error("Insufficient funds: required {required}, balance {balance}")]
    InsufficientFunds {
        /// Amount the operation tried to debit
        required: u64,
        /// Balance at the time of the attempt
        balance: u64,
    },

    /// Credit would overflow the balance
    #[error("Balance overflow: balance {balance}, credit {amount}")]
    BalanceOverflow {
        /// Balance at the time of the attempt
        balance: u64,
        /// Amount the operation tried to credit
        amount: u64,
    },

    /// Request does not exist or was deleted
    #[error("Request not found: {0}")]
    RequestNotFound(Uuid),

    /// Contribution does not exist under the addressed request
    #[error("Contribution not found: {0}")]
    ContributionNotFound(Uuid),

    /// Metrics registration failed
    #[error("Metrics error: {0}")]
    Metrics(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<rocksdb::Error> for Error {
    fn from(err: rocksdb::Error) -> Self {
        Error::Storage(err.to_string())
    }
}

impl From<prometheus::Error> for Error {
    fn from(err: prometheus::Error) -> Self {
        Error::Metrics(err.to_string())
    }
}
