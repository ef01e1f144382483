//! Karma Marketplace Core
//!
//! Domain types, durable storage, and the balance ledger for the bounty
//! marketplace.
//!
//! # Architecture
//!
//! - **Single store**: one RocksDB database holds accounts, requests, and
//!   contributions, so a whole engine operation commits as one `WriteBatch`
//! - **Staged mutations**: the ledger and stores stage writes into a batch;
//!   nothing is visible until the commit, nothing persists if it never comes
//! - **Ledger authority**: only [`Ledger`] reads or writes balances
//!
//! # Invariants
//!
//! - Balances never go negative
//! - Karma is created and destroyed only by explicit credits and debits
//! - Deleted requests are tombstones: never a valid operation target

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod config;
pub mod error;
pub mod ledger;
pub mod metrics;
pub mod storage;
pub mod types;

// Re-exports
pub use config::Config;
pub use error::{Error, Result};
pub use ledger::Ledger;
pub use metrics::Metrics;
pub use storage::{Batch, Storage};
pub use types::{
    Account, Audience, Contribution, ContributionStatus, Karma, Request, RequestStatus, UserId,
};
