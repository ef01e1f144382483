//! Marketplace engine operations
//!
//! Each operation validates its preconditions against the current store,
//! stages every mutation into one batch, and commits once: either the whole
//! operation lands or none of it does. Notifications go out only after the
//! commit succeeds.
//!
//! The engine runs inside the single-writer actor (see [`crate::actor`]),
//! which serializes all mutations. Nothing here takes locks of its own.

use crate::{
    config::PolicyConfig,
    directory::UserDirectory,
    error::{Error, Result},
};
use chrono::Utc;
use market_core::{
    Audience, Batch, Contribution, ContributionStatus, Karma, Ledger, Metrics, Request,
    RequestStatus, Storage, UserId,
};
use notify_gateway::{Notification, NotificationKind, Notifier};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

/// Audience as supplied by the caller, before target resolution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum AudienceSpec {
    /// Open to everyone
    Public,
    /// Open only to the referenced user (id, display name, or email)
    Targeted(String),
}

/// Input to [`Engine::post_request`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostRequestParams {
    /// Short title
    pub title: String,

    /// Full description of the wanted material
    pub description: String,

    /// Subject/course tag
    pub subject: String,

    /// Bounty to escrow, fixed for the request's lifetime
    pub bounty: Karma,

    /// Who may see and fulfill the request
    pub audience: AudienceSpec,
}

/// Marketplace engine
pub struct Engine {
    storage: Arc<Storage>,
    ledger: Ledger,
    notifier: Arc<dyn Notifier>,
    directory: Arc<dyn UserDirectory>,
    policy: PolicyConfig,
    metrics: Metrics,
}

impl Engine {
    /// Create new engine
    pub fn new(
        storage: Arc<Storage>,
        ledger: Ledger,
        notifier: Arc<dyn Notifier>,
        directory: Arc<dyn UserDirectory>,
        policy: PolicyConfig,
        metrics: Metrics,
    ) -> Self {
        Self {
            storage,
            ledger,
            notifier,
            directory,
            policy,
            metrics,
        }
    }

    /// Post a new bounty request, escrowing the bounty from the owner
    pub fn post_request(&self, owner: &UserId, params: PostRequestParams) -> Result<Request> {
        if params.bounty < self.policy.minimum_bounty {
            return Err(Error::BountyBelowMinimum {
                bounty: params.bounty,
                minimum: self.policy.minimum_bounty,
            });
        }

        let audience = match &params.audience {
            AudienceSpec::Public => Audience::Public,
            AudienceSpec::Targeted(reference) => Audience::Targeted(
                self.directory
                    .resolve(reference)
                    .ok_or_else(|| Error::UnknownTarget(reference.clone()))?,
            ),
        };

        let mut batch = Batch::new();
        let remaining = self.stage_debit_tracked(&mut batch, owner, params.bounty)?;

        let now = Utc::now();
        let request = Request {
            id: Uuid::now_v7(),
            owner: owner.clone(),
            title: params.title,
            description: params.description,
            subject: params.subject,
            bounty: params.bounty,
            status: RequestStatus::Active,
            audience,
            contribution_ids: vec![],
            views: 0,
            created_at: now,
            updated_at: now,
        };
        self.storage.stage_request(&mut batch, &request)?;

        self.storage.commit(batch)?;

        self.metrics.requests_posted.inc();
        self.metrics.karma_debited.inc_by(request.bounty);

        tracing::info!(
            request_id = %request.id,
            owner = %owner,
            bounty = request.bounty,
            remaining,
            "bounty request posted"
        );

        Ok(request)
    }

    /// Submit a contribution toward an active request
    pub fn submit_contribution(
        &self,
        request_id: Uuid,
        author: &UserId,
        payload_ref: String,
    ) -> Result<Contribution> {
        let mut request = self.storage.get_request(request_id)?;
        require_active(&request)?;

        if request.owner == *author {
            return Err(Error::OwnContribution);
        }
        if !request.audience.permits(author) {
            return Err(Error::NotInAudience {
                user: author.clone(),
                request: request_id,
            });
        }

        let now = Utc::now();
        let contribution = Contribution {
            id: Uuid::now_v7(),
            request_id,
            author: author.clone(),
            payload_ref,
            status: ContributionStatus::Pending,
            submitted_at: now,
        };

        request.contribution_ids.push(contribution.id);
        request.updated_at = now;

        let mut batch = Batch::new();
        self.storage.stage_contribution(&mut batch, &contribution)?;
        self.storage.stage_request(&mut batch, &request)?;
        self.storage.commit(batch)?;

        self.metrics.contributions.inc();

        tracing::info!(
            request_id = %request_id,
            contribution_id = %contribution.id,
            author = %author,
            "contribution submitted"
        );

        self.notifier.notify(Notification::new(
            request.owner.clone(),
            NotificationKind::ContributionReceived,
            request_id,
            json!({
                "title": request.title,
                "contribution_id": contribution.id,
                "author": contribution.author.as_str(),
            }),
        ));

        Ok(contribution)
    }

    /// Accept one contribution: pay its author, reject the rest, close the request
    pub fn accept_contribution(
        &self,
        request_id: Uuid,
        contribution_id: Uuid,
        acting: &UserId,
    ) -> Result<()> {
        let mut request = self.storage.get_request(request_id)?;
        require_owner(&request, acting)?;
        require_active(&request)?;

        let mut winner = self.load_contribution_of(&request, contribution_id)?;
        if !winner.is_pending() {
            return Err(Error::ContributionSettled {
                contribution: contribution_id,
                status: winner.status,
            });
        }

        let mut batch = Batch::new();
        let winner_balance = self.stage_credit_tracked(&mut batch, &winner.author, request.bounty)?;

        winner.status = ContributionStatus::Accepted;
        self.storage.stage_contribution(&mut batch, &winner)?;

        let mut passed_over = Vec::new();
        for id in &request.contribution_ids {
            if *id == contribution_id {
                continue;
            }
            let mut other = self.storage.get_contribution(*id)?;
            if other.is_pending() {
                other.status = ContributionStatus::Rejected;
                self.storage.stage_contribution(&mut batch, &other)?;
                passed_over.push(other.author);
            }
        }

        request.status = RequestStatus::Closed;
        request.updated_at = Utc::now();
        self.storage.stage_request(&mut batch, &request)?;

        self.storage.commit(batch)?;

        self.metrics.bounties_awarded.inc();

        tracing::info!(
            request_id = %request_id,
            contribution_id = %contribution_id,
            winner = %winner.author,
            bounty = request.bounty,
            winner_balance,
            "bounty awarded"
        );

        self.notifier.notify(Notification::new(
            winner.author.clone(),
            NotificationKind::BountyAwarded,
            request_id,
            json!({
                "title": request.title,
                "bounty": request.bounty,
                "contribution_id": contribution_id,
            }),
        ));
        for author in passed_over {
            self.notifier.notify(Notification::new(
                author,
                NotificationKind::NotSelected,
                request_id,
                json!({ "title": request.title }),
            ));
        }

        Ok(())
    }

    /// Reject and remove a single pending contribution
    pub fn reject_contribution(
        &self,
        request_id: Uuid,
        contribution_id: Uuid,
        acting: &UserId,
    ) -> Result<()> {
        let mut request = self.storage.get_request(request_id)?;
        require_owner(&request, acting)?;
        require_active(&request)?;

        let contribution = self.load_contribution_of(&request, contribution_id)?;
        if !contribution.is_pending() {
            return Err(Error::ContributionSettled {
                contribution: contribution_id,
                status: contribution.status,
            });
        }

        request.contribution_ids.retain(|id| *id != contribution_id);
        request.updated_at = Utc::now();

        let mut batch = Batch::new();
        self.storage.stage_delete_contribution(&mut batch, contribution_id)?;
        self.storage.stage_request(&mut batch, &request)?;
        self.storage.commit(batch)?;

        tracing::info!(
            request_id = %request_id,
            contribution_id = %contribution_id,
            author = %contribution.author,
            "contribution rejected"
        );

        self.notifier.notify(Notification::new(
            contribution.author.clone(),
            NotificationKind::ContributionDeclined,
            request_id,
            json!({
                "title": request.title,
                "contribution_id": contribution_id,
            }),
        ));

        Ok(())
    }

    /// Delete a request, refunding half the bounty if it was still active
    ///
    /// Returns the refund amount for caller display.
    pub fn delete_request(&self, request_id: Uuid, acting: &UserId) -> Result<Karma> {
        let mut request = self.storage.get_request(request_id)?;
        require_owner(&request, acting)?;

        // Active: bounty is still escrowed, half comes back (floor division).
        // Closed: already paid out, nothing to refund.
        let refund = match request.status {
            RequestStatus::Active => request.bounty / 2,
            RequestStatus::Closed => 0,
            RequestStatus::Deleted => return Err(market_core::Error::RequestNotFound(request_id).into()),
        };

        let mut batch = Batch::new();
        if refund > 0 {
            self.stage_credit_tracked(&mut batch, &request.owner, refund)?;
        }

        for id in &request.contribution_ids {
            self.storage.stage_delete_contribution(&mut batch, *id)?;
        }

        request.status = RequestStatus::Deleted;
        request.contribution_ids.clear();
        request.updated_at = Utc::now();
        self.storage.stage_request(&mut batch, &request)?;

        self.storage.commit(batch)?;

        self.metrics.requests_deleted.inc();

        tracing::info!(
            request_id = %request_id,
            owner = %request.owner,
            refund,
            "request deleted"
        );

        Ok(refund)
    }

    /// Reopen a closed request, escrowing the bounty again
    pub fn reopen_request(&self, request_id: Uuid, acting: &UserId) -> Result<()> {
        let mut request = self.storage.get_request(request_id)?;
        require_owner(&request, acting)?;

        if request.status != RequestStatus::Closed {
            return Err(Error::InvalidStatus {
                request: request_id,
                status: request.status,
                required: RequestStatus::Closed,
            });
        }

        let mut batch = Batch::new();
        self.stage_debit_tracked(&mut batch, &request.owner, request.bounty)?;

        for id in &request.contribution_ids {
            self.storage.stage_delete_contribution(&mut batch, *id)?;
        }

        request.contribution_ids.clear();
        request.status = RequestStatus::Active;
        request.updated_at = Utc::now();
        self.storage.stage_request(&mut batch, &request)?;

        self.storage.commit(batch)?;

        self.metrics.requests_reopened.inc();
        self.metrics.karma_debited.inc_by(request.bounty);

        tracing::info!(
            request_id = %request_id,
            owner = %request.owner,
            bounty = request.bounty,
            "request reopened"
        );

        Ok(())
    }

    /// Count a view on a request, returning the new total
    pub fn record_view(&self, request_id: Uuid) -> Result<u64> {
        let mut request = self.storage.get_request(request_id)?;
        request.views += 1;

        let mut batch = Batch::new();
        self.storage.stage_request(&mut batch, &request)?;
        self.storage.commit(batch)?;

        Ok(request.views)
    }

    /// Credit karma to a user, returning the new balance
    pub fn credit(&self, user: &UserId, amount: Karma) -> Result<Karma> {
        let mut batch = Batch::new();
        let balance = self.stage_credit_tracked(&mut batch, user, amount)?;
        self.storage.commit(batch)?;
        Ok(balance)
    }

    /// Debit karma from a user, returning the new balance
    pub fn debit(&self, user: &UserId, amount: Karma) -> Result<Karma> {
        let mut batch = Batch::new();
        let balance = self.stage_debit_tracked(&mut batch, user, amount)?;
        self.storage.commit(batch)?;
        self.metrics.karma_debited.inc_by(amount);
        Ok(balance)
    }

    /// Current balance for a user (zero for unknown users)
    pub fn balance(&self, user: &UserId) -> Result<Karma> {
        Ok(self.ledger.balance(user)?)
    }

    /// Metrics collector
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    // Helpers

    fn stage_debit_tracked(&self, batch: &mut Batch, user: &UserId, amount: Karma) -> Result<Karma> {
        match self.ledger.stage_debit(batch, user, amount) {
            Ok(balance) => Ok(balance),
            Err(err) => {
                if matches!(err, market_core::Error::InsufficientFunds { .. }) {
                    self.metrics.insufficient_funds.inc();
                }
                Err(err.into())
            }
        }
    }

    fn stage_credit_tracked(&self, batch: &mut Batch, user: &UserId, amount: Karma) -> Result<Karma> {
        let balance = self.ledger.stage_credit(batch, user, amount)?;
        self.metrics.karma_credited.inc_by(amount);
        Ok(balance)
    }

    /// Load a contribution and verify it belongs to the request
    fn load_contribution_of(&self, request: &Request, id: Uuid) -> Result<Contribution> {
        let contribution = self.storage.get_contribution(id)?;
        if contribution.request_id != request.id {
            return Err(market_core::Error::ContributionNotFound(id).into());
        }
        Ok(contribution)
    }
}

fn require_owner(request: &Request, acting: &UserId) -> Result<()> {
    if request.owner != *acting {
        return Err(Error::NotOwner {
            user: acting.clone(),
            request: request.id,
        });
    }
    Ok(())
}

fn require_active(request: &Request) -> Result<()> {
    if request.status != RequestStatus::Active {
        return Err(Error::InvalidStatus {
            request: request.id,
            status: request.status,
            required: RequestStatus::Active,
        });
    }
    Ok(())
}
