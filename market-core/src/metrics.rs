//! Metrics collection for observability
//!
//! # Metrics
//!
//! - `market_requests_posted_total` - Requests posted (bounty escrowed)
//! - `market_requests_deleted_total` - Requests deleted
//! - `market_requests_reopened_total` - Closed requests reopened
//! - `market_contributions_total` - Contributions submitted
//! - `market_bounties_awarded_total` - Contributions accepted and paid
//! - `market_karma_credited_total` - Karma credited across all accounts
//! - `market_karma_debited_total` - Karma debited across all accounts
//! - `market_insufficient_funds_total` - Debits rejected for lack of funds
//! - `market_op_duration_seconds` - Histogram of engine operation latencies

use prometheus::{Histogram, HistogramOpts, IntCounter, Registry};
use std::sync::Arc;

/// Metrics collector
#[derive(Clone)]
pub struct Metrics {
    /// Requests posted
    pub requests_posted: IntCounter,

    /// Requests deleted
    pub requests_deleted: IntCounter,

    /// Requests reopened
    pub requests_reopened: IntCounter,

    /// Contributions submitted
    pub contributions: IntCounter,

    /// Bounties awarded
    pub bounties_awarded: IntCounter,

    /// Karma credited
    pub karma_credited: IntCounter,

    /// Karma debited
    pub karma_debited: IntCounter,

    /// Debits rejected for insufficient funds
    pub insufficient_funds: IntCounter,

    /// Engine operation latency histogram
    pub op_duration: Histogram,

    /// Prometheus registry
    pub registry: Arc<Registry>,
}

impl Metrics {
    /// Create new metrics collector with its own registry
    pub fn new() -> prometheus::Result<Self> {
        let registry = Arc::new(Registry::new());

        let requests_posted = IntCounter::new(
            "market_requests_posted_total",
            "Requests posted (bounty escrowed)",
        )?;
        registry.register(Box::new(requests_posted.clone()))?;

        let requests_deleted =
            IntCounter::new("market_requests_deleted_total", "Requests deleted")?;
        registry.register(Box::new(requests_deleted.clone()))?;

        let requests_reopened =
            IntCounter::new("market_requests_reopened_total", "Closed requests reopened")?;
        registry.register(Box::new(requests_reopened.clone()))?;

        let contributions =
            IntCounter::new("market_contributions_total", "Contributions submitted")?;
        registry.register(Box::new(contributions.clone()))?;

        let bounties_awarded = IntCounter::new(
            "market_bounties_awarded_total",
            "Contributions accepted and paid",
        )?;
        registry.register(Box::new(bounties_awarded.clone()))?;

        let karma_credited = IntCounter::new(
            "market_karma_credited_total",
            "Karma credited across all accounts",
        )?;
        registry.register(Box::new(karma_credited.clone()))?;

        let karma_debited = IntCounter::new(
            "market_karma_debited_total",
            "Karma debited across all accounts",
        )?;
        registry.register(Box::new(karma_debited.clone()))?;

        let insufficient_funds = IntCounter::new(
            "market_insufficient_funds_total",
            "Debits rejected for lack of funds",
        )?;
        registry.register(Box::new(insufficient_funds.clone()))?;

        let op_duration = Histogram::with_opts(
            HistogramOpts::new(
                "market_op_duration_seconds",
                "Histogram of engine operation latencies",
            )
            .buckets(vec![0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.250, 0.500]),
        )?;
        registry.register(Box::new(op_duration.clone()))?;

        Ok(Self {
            requests_posted,
            requests_deleted,
            requests_reopened,
            contributions,
            bounties_awarded,
            karma_credited,
            karma_debited,
            insufficient_funds,
            op_duration,
            registry,
        })
    }

    /// Record an operation latency
    pub fn record_op_duration(&self, duration_seconds: f64) {
        self.op_duration.observe(duration_seconds);
    }

    /// Get metrics registry
    pub fn registry(&self) -> &Registry {
        &self.registry
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new().expect("Failed to create metrics")
    }
}
