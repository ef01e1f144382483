//! Karma Bounty Marketplace
//!
//! The lifecycle engine behind peer requests: users post a request for study
//! material backed by a karma bounty, others submit contributions, and the
//! requester accepts exactly one (paying its author and rejecting the rest).
//! Requests can be deleted (half refund while still active) or reopened
//! (re-escrowing the bounty).
//!
//! # Architecture
//!
//! - **Single Writer**: all mutations flow through one actor task, so
//!   per-account and per-request serialization hold by construction
//! - **Atomic operations**: each operation commits as one storage batch;
//!   partial effects never persist
//! - **Ledger authority**: balances move only through the core ledger
//! - **Fire-and-forget notifications**: emitted after commit, never awaited
//!
//! # Example
//!
//! ```no_run
//! use marketplace::{AudienceSpec, Config, Marketplace, PostRequestParams, StaticDirectory};
//! use market_core::UserId;
//! use notify_gateway::LogNotifier;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> marketplace::Result<()> {
//!     let directory = Arc::new(StaticDirectory::new());
//!     directory.register(UserId::new("alice"), &["Alice Johnson"]);
//!
//!     let market = Marketplace::open(
//!         Config::default(),
//!         Arc::new(LogNotifier),
//!         directory,
//!     )
//!     .await?;
//!
//!     let alice = UserId::new("alice");
//!     market.credit(alice.clone(), 1_000).await?;
//!
//!     let request = market
//!         .post_request(
//!             alice,
//!             PostRequestParams {
//!                 title: "Calc II lecture notes".into(),
//!                 description: "Weeks 3-6".into(),
//!                 subject: "MATH-201".into(),
//!                 bounty: 500,
//!                 audience: AudienceSpec::Public,
//!             },
//!         )
//!         .await?;
//!
//!     println!("posted request {}", request.id);
//!     Ok(())
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod actor;
pub mod config;
pub mod directory;
pub mod engine;
pub mod error;
pub mod market;

// Re-exports
pub use config::{Config, MailboxConfig, PolicyConfig};
pub use directory::{StaticDirectory, UserDirectory};
pub use engine::{AudienceSpec, Engine, PostRequestParams};
pub use error::{Error, ErrorKind, Result};
pub use market::Marketplace;
