//! User directory boundary
//!
//! Targeted requests are resolved to a stable user id when they are posted;
//! the marketplace never re-matches against mutable display attributes
//! afterwards. The real directory lives in the identity service; tests and
//! demos use the in-memory implementation below.

use dashmap::DashMap;
use market_core::UserId;

/// Resolves user references to stable ids
pub trait UserDirectory: Send + Sync {
    /// Resolve a reference (user id, display name, or email) to a user id
    ///
    /// Matching is case-insensitive. Returns `None` when nothing matches.
    fn resolve(&self, reference: &str) -> Option<UserId>;
}

/// In-memory directory for tests and demos
#[derive(Debug, Default)]
pub struct StaticDirectory {
    // Lowercased id/handle/email -> user id
    entries: DashMap<String, UserId>,
}

impl StaticDirectory {
    /// Create an empty directory
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a user under their id plus any display handles and emails
    pub fn register(&self, user: UserId, handles: &[&str]) {
        self.entries
            .insert(user.as_str().to_lowercase(), user.clone());
        for handle in handles {
            self.entries.insert(handle.to_lowercase(), user.clone());
        }
    }
}

impl UserDirectory for StaticDirectory {
    fn resolve(&self, reference: &str) -> Option<UserId> {
        self.entries
            .get(&reference.to_lowercase())
            .map(|entry| entry.value().clone())
    }
}
