//! Core types for the karma marketplace
//!
//! All types are designed for:
//! - Deterministic serialization (bincode)
//! - Memory safety (no unsafe code)
//! - Exact arithmetic (whole-unit karma, no fractional amounts)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Karma amount in whole units
///
/// Karma is the site's internal virtual currency. Amounts are always
/// non-negative integers; refund math truncates toward zero.
pub type Karma = u64;

/// Opaque user identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(String);

impl UserId {
    /// Create new user ID
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get as string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-user karma account
///
/// Account records are owned exclusively by the [`Ledger`](crate::Ledger);
/// no other component reads or writes the balance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    /// Account owner
    pub user_id: UserId,

    /// Current balance, never negative
    pub balance: Karma,

    /// Last mutation timestamp
    pub updated_at: DateTime<Utc>,
}

/// Lifecycle status of a request
///
/// Transitions: `Active → Closed` (accept), `Active → Deleted` (delete),
/// `Closed → Active` (reopen), `Closed → Deleted` (delete). There is no
/// transition out of `Deleted`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum RequestStatus {
    /// Open for contributions, bounty escrowed
    Active = 1,
    /// A contribution was accepted and paid out
    Closed = 2,
    /// Withdrawn by the owner; tombstone only
    Deleted = 3,
}

impl fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RequestStatus::Active => "active",
            RequestStatus::Closed => "closed",
            RequestStatus::Deleted => "deleted",
        };
        write!(f, "{}", label)
    }
}

/// Who may see and fulfill a request
///
/// Targeted audiences are resolved to a stable user id when the request is
/// posted; matching never falls back to display names or emails afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Audience {
    /// Visible to everyone except the owner
    Public,
    /// Visible only to the named user
    Targeted(UserId),
}

impl Audience {
    /// Whether the given user may view and contribute to the request
    pub fn permits(&self, user: &UserId) -> bool {
        match self {
            Audience::Public => true,
            Audience::Targeted(target) => target == user,
        }
    }
}

/// A bounty posting
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    /// Unique request ID (UUIDv7 for time-ordering)
    pub id: Uuid,

    /// Posting user; only the owner may accept, reject, delete, or reopen
    pub owner: UserId,

    /// Short title
    pub title: String,

    /// Full description of the wanted material
    pub description: String,

    /// Subject/course tag
    pub subject: String,

    /// Escrowed bounty, fixed at creation
    pub bounty: Karma,

    /// Lifecycle status
    pub status: RequestStatus,

    /// Visibility rule
    pub audience: Audience,

    /// Contribution IDs in submission order
    pub contribution_ids: Vec<Uuid>,

    /// View counter, informational only
    pub views: u64,

    /// Created timestamp
    pub created_at: DateTime<Utc>,

    /// Last lifecycle mutation timestamp
    pub updated_at: DateTime<Utc>,
}

impl Request {
    /// Whether this request shows up in the given user's market feed
    ///
    /// Owners never see their own requests in the market; deleted and closed
    /// requests are not offered for contribution.
    pub fn is_visible_to(&self, viewer: &UserId) -> bool {
        self.status == RequestStatus::Active
            && self.owner != *viewer
            && self.audience.permits(viewer)
    }
}

/// Status of a contribution
///
/// Exactly one contribution per request may ever reach `Accepted`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum ContributionStatus {
    /// Submitted, awaiting the owner's decision
    Pending = 1,
    /// Selected by the owner; bounty paid to the author
    Accepted = 2,
    /// Passed over when another contribution was accepted
    Rejected = 3,
}

impl fmt::Display for ContributionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ContributionStatus::Pending => "pending",
            ContributionStatus::Accepted => "accepted",
            ContributionStatus::Rejected => "rejected",
        };
        write!(f, "{}", label)
    }
}

/// A submission toward fulfilling a request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contribution {
    /// Unique contribution ID (UUIDv7, monotonic within a request)
    pub id: Uuid,

    /// Parent request
    pub request_id: Uuid,

    /// Submitting user
    pub author: UserId,

    /// Opaque reference to the submitted material (upload handle)
    pub payload_ref: String,

    /// Decision status
    pub status: ContributionStatus,

    /// Submission timestamp
    pub submitted_at: DateTime<Utc>,
}

impl Contribution {
    /// Whether the contribution is still awaiting a decision
    pub fn is_pending(&self) -> bool {
        self.status == ContributionStatus::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(owner: &str, status: RequestStatus, audience: Audience) -> Request {
        Request {
            id: Uuid::now_v7(),
            owner: UserId::new(owner),
            title: "Calc II lecture notes".to_string(),
            description: "Weeks 3-6, integration techniques".to_string(),
            subject: "MATH-201".to_string(),
            bounty: 250,
            status,
            audience,
            contribution_ids: vec![],
            views: 0,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_public_audience_permits_everyone() {
        let audience = Audience::Public;
        assert!(audience.permits(&UserId::new("alice")));
        assert!(audience.permits(&UserId::new("bob")));
    }

    #[test]
    fn test_targeted_audience_permits_only_target() {
        let audience = Audience::Targeted(UserId::new("bob"));
        assert!(audience.permits(&UserId::new("bob")));
        assert!(!audience.permits(&UserId::new("alice")));
    }

    #[test]
    fn test_owner_never_sees_own_request_in_market() {
        let req = request("alice", RequestStatus::Active, Audience::Public);
        assert!(!req.is_visible_to(&UserId::new("alice")));
        assert!(req.is_visible_to(&UserId::new("bob")));
    }

    #[test]
    fn test_closed_and_deleted_requests_not_visible() {
        let closed = request("alice", RequestStatus::Closed, Audience::Public);
        assert!(!closed.is_visible_to(&UserId::new("bob")));

        let deleted = request("alice", RequestStatus::Deleted, Audience::Public);
        assert!(!deleted.is_visible_to(&UserId::new("bob")));
    }

    #[test]
    fn test_targeted_request_hidden_from_others() {
        let req = request(
            "alice",
            RequestStatus::Active,
            Audience::Targeted(UserId::new("bob")),
        );
        assert!(req.is_visible_to(&UserId::new("bob")));
        assert!(!req.is_visible_to(&UserId::new("carol")));
    }

    #[test]
    fn test_contribution_pending() {
        let contribution = Contribution {
            id: Uuid::now_v7(),
            request_id: Uuid::now_v7(),
            author: UserId::new("bob"),
            payload_ref: "upload:abc123".to_string(),
            status: ContributionStatus::Pending,
            submitted_at: Utc::now(),
        };
        assert!(contribution.is_pending());
    }
}
