//! Marketplace facade
//!
//! Ties storage, ledger, engine, and actor together into the API the
//! surrounding application consumes. Mutations go through the single-writer
//! actor; reads hit storage directly.

use crate::{
    actor::{spawn_market_actor, MarketHandle},
    config::Config,
    directory::UserDirectory,
    engine::{Engine, PostRequestParams},
    error::Result,
};
use market_core::{Contribution, Karma, Ledger, Metrics, Request, Storage, UserId};
use notify_gateway::Notifier;
use std::sync::Arc;
use tokio::time::Duration;
use uuid::Uuid;

/// Main marketplace interface
pub struct Marketplace {
    /// Actor handle for mutations
    handle: MarketHandle,

    /// Direct storage access (for reads)
    storage: Arc<Storage>,

    /// Balance reads
    ledger: Ledger,

    /// Metrics collector (shared with the engine)
    metrics: Metrics,

    /// Configuration
    config: Config,
}

impl Marketplace {
    /// Open marketplace with configuration and collaborators
    pub async fn open(
        config: Config,
        notifier: Arc<dyn Notifier>,
        directory: Arc<dyn UserDirectory>,
    ) -> Result<Self> {
        let storage = Arc::new(Storage::open(&config.core_config())?);
        let ledger = Ledger::new(storage.clone());
        let metrics = Metrics::new().map_err(market_core::Error::from)?;

        let engine = Engine::new(
            storage.clone(),
            ledger.clone(),
            notifier,
            directory,
            config.policy.clone(),
            metrics.clone(),
        );

        let handle = spawn_market_actor(
            engine,
            config.mailbox.capacity,
            Duration::from_millis(config.mailbox.op_timeout_ms),
        );

        tracing::info!(
            data_dir = %config.data_dir.display(),
            minimum_bounty = config.policy.minimum_bounty,
            "marketplace open"
        );

        Ok(Self {
            handle,
            storage,
            ledger,
            metrics,
            config,
        })
    }

    // Mutations

    /// Post a new bounty request, escrowing the bounty from the owner
    pub async fn post_request(&self, owner: UserId, params: PostRequestParams) -> Result<Request> {
        self.handle.post(owner, params).await
    }

    /// Submit a contribution toward an active request
    pub async fn submit_contribution(
        &self,
        request_id: Uuid,
        author: UserId,
        payload_ref: impl Into<String>,
    ) -> Result<Contribution> {
        self.handle
            .submit(request_id, author, payload_ref.into())
            .await
    }

    /// Accept one contribution: pay its author, reject the rest, close the request
    pub async fn accept_contribution(
        &self,
        request_id: Uuid,
        contribution_id: Uuid,
        acting: UserId,
    ) -> Result<()> {
        self.handle.accept(request_id, contribution_id, acting).await
    }

    /// Reject and remove a single pending contribution
    pub async fn reject_contribution(
        &self,
        request_id: Uuid,
        contribution_id: Uuid,
        acting: UserId,
    ) -> Result<()> {
        self.handle.reject(request_id, contribution_id, acting).await
    }

    /// Delete a request, refunding half the bounty if it was still active
    pub async fn delete_request(&self, request_id: Uuid, acting: UserId) -> Result<Karma> {
        self.handle.delete(request_id, acting).await
    }

    /// Reopen a closed request, escrowing the bounty again
    pub async fn reopen_request(&self, request_id: Uuid, acting: UserId) -> Result<()> {
        self.handle.reopen(request_id, acting).await
    }

    /// Count a view on a request, returning the new total
    pub async fn record_view(&self, request_id: Uuid) -> Result<u64> {
        self.handle.record_view(request_id).await
    }

    /// Credit karma to a user, returning the new balance
    pub async fn credit(&self, user: UserId, amount: Karma) -> Result<Karma> {
        self.handle.credit(user, amount).await
    }

    /// Debit karma from a user, returning the new balance
    pub async fn debit(&self, user: UserId, amount: Karma) -> Result<Karma> {
        self.handle.debit(user, amount).await
    }

    // Reads

    /// Current balance for a user (zero for unknown users)
    pub fn balance(&self, user: &UserId) -> Result<Karma> {
        Ok(self.ledger.balance(user)?)
    }

    /// Get request by ID
    pub fn get_request(&self, request_id: Uuid) -> Result<Request> {
        Ok(self.storage.get_request(request_id)?)
    }

    /// Requests owned by a user, newest first
    pub fn list_requests(&self, owner: &UserId) -> Result<Vec<Request>> {
        let mut requests = self.storage.requests_by_owner(owner)?;
        requests.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(requests)
    }

    /// Market feed for a viewer, newest first
    ///
    /// Public requests from other users, plus targeted requests naming the
    /// viewer. The viewer's own requests never appear.
    pub fn list_market(&self, viewer: &UserId) -> Result<Vec<Request>> {
        let mut requests: Vec<Request> = self
            .storage
            .scan_requests()?
            .into_iter()
            .filter(|request| request.is_visible_to(viewer))
            .collect();
        requests.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(requests)
    }

    /// Contributions on a request, in submission order
    pub fn contributions(&self, request_id: Uuid) -> Result<Vec<Contribution>> {
        let request = self.storage.get_request(request_id)?;

        let mut contributions = Vec::with_capacity(request.contribution_ids.len());
        for id in &request.contribution_ids {
            contributions.push(self.storage.get_contribution(*id)?);
        }

        Ok(contributions)
    }

    /// Metrics collector
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Configuration
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Shutdown marketplace
    pub async fn shutdown(self) -> Result<()> {
        self.handle.shutdown().await
    }
}
