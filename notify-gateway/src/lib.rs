//! Notification boundary for the marketplace
//!
//! The engine informs affected users about marketplace events through this
//! gateway. Delivery is fire-and-forget with a single attempt: the engine
//! never blocks on it, and a failed or dropped notification never changes
//! the outcome of the operation that produced it. Actual push delivery is an
//! external collaborator; this crate defines the call contract and the
//! in-process implementations.

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

use chrono::{DateTime, Utc};
use market_core::UserId;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

/// What happened, from the recipient's point of view
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NotificationKind {
    /// A new contribution arrived on a request you own
    ContributionReceived,
    /// Your contribution was accepted; the bounty is yours
    BountyAwarded,
    /// Another contribution was accepted instead of yours
    NotSelected,
    /// The owner declined your contribution
    ContributionDeclined,
}

impl NotificationKind {
    /// Stable string form for payloads and logs
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::ContributionReceived => "contribution_received",
            NotificationKind::BountyAwarded => "bounty_awarded",
            NotificationKind::NotSelected => "not_selected",
            NotificationKind::ContributionDeclined => "contribution_declined",
        }
    }
}

/// A single notification to a single user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    /// Recipient
    pub target: UserId,

    /// Event kind
    pub kind: NotificationKind,

    /// Request the event concerns
    pub request_id: Uuid,

    /// Display payload for the UI (title, amounts, ids)
    pub payload: serde_json::Value,

    /// When the engine emitted the notification
    pub emitted_at: DateTime<Utc>,
}

impl Notification {
    /// Build a notification stamped with the current time
    pub fn new(
        target: UserId,
        kind: NotificationKind,
        request_id: Uuid,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            target,
            kind,
            request_id,
            payload,
            emitted_at: Utc::now(),
        }
    }
}

/// Outbound notification sink
///
/// Implementations must not block the caller and must swallow delivery
/// failures (logging them is fine). At-most-once-attempt: no retries.
pub trait Notifier: Send + Sync {
    /// Hand off a notification for delivery
    fn notify(&self, notification: Notification);
}

/// Logs notifications instead of delivering them
///
/// Stand-in for the push-delivery collaborator in demos and local runs.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, notification: Notification) {
        tracing::info!(
            target_user = %notification.target,
            kind = notification.kind.as_str(),
            request_id = %notification.request_id,
            "notification"
        );
    }
}

/// Forwards notifications over a bounded channel
///
/// The receiving half belongs to whatever delivers to devices. When the
/// channel is full the notification is dropped with a warning; the sender
/// never waits.
#[derive(Debug)]
pub struct ChannelNotifier {
    sender: mpsc::Sender<Notification>,
}

impl ChannelNotifier {
    /// Create a notifier and the receiver to drain it
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<Notification>) {
        let (sender, receiver) = mpsc::channel(capacity);
        (Self { sender }, receiver)
    }
}

impl Notifier for ChannelNotifier {
    fn notify(&self, notification: Notification) {
        if let Err(err) = self.sender.try_send(notification) {
            tracing::warn!("notification dropped: {}", err);
        }
    }
}

/// Buffers notifications in memory for test assertions
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    /// Create an empty recorder
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far
    pub fn sent(&self) -> Vec<Notification> {
        self.sent.lock().clone()
    }

    /// Drain the recorded notifications
    pub fn take(&self) -> Vec<Notification> {
        std::mem::take(&mut *self.sent.lock())
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notification: Notification) {
        self.sent.lock().push(notification);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn notification(target: &str, kind: NotificationKind) -> Notification {
        Notification::new(
            UserId::new(target),
            kind,
            Uuid::now_v7(),
            json!({ "title": "Linear algebra problem sets" }),
        )
    }

    #[test]
    fn test_kind_strings() {
        assert_eq!(NotificationKind::BountyAwarded.as_str(), "bounty_awarded");
        assert_eq!(NotificationKind::NotSelected.as_str(), "not_selected");
    }

    #[test]
    fn test_recording_notifier_captures_in_order() {
        let recorder = RecordingNotifier::new();
        recorder.notify(notification("alice", NotificationKind::ContributionReceived));
        recorder.notify(notification("bob", NotificationKind::BountyAwarded));

        let sent = recorder.sent();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].target, UserId::new("alice"));
        assert_eq!(sent[1].kind, NotificationKind::BountyAwarded);

        let drained = recorder.take();
        assert_eq!(drained.len(), 2);
        assert!(recorder.sent().is_empty());
    }

    #[tokio::test]
    async fn test_channel_notifier_delivers() {
        let (notifier, mut receiver) = ChannelNotifier::new(8);
        notifier.notify(notification("bob", NotificationKind::BountyAwarded));

        let received = receiver.recv().await.unwrap();
        assert_eq!(received.target, UserId::new("bob"));
        assert_eq!(received.kind, NotificationKind::BountyAwarded);
    }

    #[tokio::test]
    async fn test_channel_notifier_drops_when_full() {
        let (notifier, mut receiver) = ChannelNotifier::new(1);
        notifier.notify(notification("bob", NotificationKind::NotSelected));
        // Second send exceeds capacity and is dropped, not blocked on
        notifier.notify(notification("carol", NotificationKind::NotSelected));

        let first = receiver.recv().await.unwrap();
        assert_eq!(first.target, UserId::new("bob"));
        assert!(receiver.try_recv().is_err());
    }
}
