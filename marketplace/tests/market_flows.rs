//! End-to-end marketplace lifecycle tests
//!
//! Exercises the public facade the way the site does: post, submit, accept,
//! reject, delete, reopen, plus the audience and refund rules.

use market_core::{ContributionStatus, RequestStatus, UserId};
use marketplace::{
    AudienceSpec, Config, ErrorKind, Marketplace, PostRequestParams, StaticDirectory,
};
use notify_gateway::{NotificationKind, RecordingNotifier};
use std::sync::Arc;
use tempfile::TempDir;

async fn open_market() -> (Marketplace, Arc<RecordingNotifier>, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let mut config = Config::default();
    config.data_dir = temp_dir.path().to_path_buf();

    let notifier = Arc::new(RecordingNotifier::new());
    let directory = Arc::new(StaticDirectory::new());
    directory.register(UserId::new("alice"), &["Alice Johnson", "alice@campus.edu"]);
    directory.register(UserId::new("bob"), &["Bob Smith", "bob@campus.edu"]);
    directory.register(UserId::new("carol"), &["Carol Diaz"]);

    let market = Marketplace::open(config, notifier.clone(), directory)
        .await
        .unwrap();
    (market, notifier, temp_dir)
}

fn alice() -> UserId {
    UserId::new("alice")
}

fn bob() -> UserId {
    UserId::new("bob")
}

fn carol() -> UserId {
    UserId::new("carol")
}

fn params(bounty: u64) -> PostRequestParams {
    PostRequestParams {
        title: "Calc II lecture notes".to_string(),
        description: "Weeks 3-6, integration techniques".to_string(),
        subject: "MATH-201".to_string(),
        bounty,
        audience: AudienceSpec::Public,
    }
}

#[tokio::test]
async fn test_post_escrows_bounty() {
    let (market, _notifier, _temp) = open_market().await;

    market.credit(alice(), 1000).await.unwrap();
    let request = market.post_request(alice(), params(500)).await.unwrap();

    assert_eq!(market.balance(&alice()).unwrap(), 500);
    assert_eq!(request.status, RequestStatus::Active);
    assert_eq!(market.get_request(request.id).unwrap().bounty, 500);

    market.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_minimum_bounty_boundary() {
    let (market, _notifier, _temp) = open_market().await;
    market.credit(alice(), 1000).await.unwrap();

    // Exactly the minimum succeeds
    assert!(market.post_request(alice(), params(100)).await.is_ok());

    // One below fails validation
    let err = market.post_request(alice(), params(99)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    market.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_post_whole_balance_reaches_zero() {
    let (market, _notifier, _temp) = open_market().await;
    market.credit(alice(), 300).await.unwrap();

    market.post_request(alice(), params(300)).await.unwrap();
    assert_eq!(market.balance(&alice()).unwrap(), 0);

    market.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_failed_post_is_fully_rolled_back() {
    let (market, _notifier, _temp) = open_market().await;
    market.credit(alice(), 499).await.unwrap();

    let err = market.post_request(alice(), params(500)).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InsufficientFunds);

    // Nothing persisted: balance intact, no request created
    assert_eq!(market.balance(&alice()).unwrap(), 499);
    assert!(market.list_requests(&alice()).unwrap().is_empty());

    market.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_submit_accept_pays_winner_and_rejects_rest() {
    let (market, notifier, _temp) = open_market().await;
    market.credit(alice(), 1000).await.unwrap();

    let request = market.post_request(alice(), params(500)).await.unwrap();

    let from_bob = market
        .submit_contribution(request.id, bob(), "upload:bob-notes")
        .await
        .unwrap();
    let from_carol = market
        .submit_contribution(request.id, carol(), "upload:carol-notes")
        .await
        .unwrap();

    // Two pending contributions, contributors' balances unchanged
    let contributions = market.contributions(request.id).unwrap();
    assert_eq!(contributions.len(), 2);
    assert!(contributions.iter().all(|c| c.is_pending()));
    assert_eq!(market.balance(&bob()).unwrap(), 0);
    assert_eq!(market.balance(&carol()).unwrap(), 0);

    market
        .accept_contribution(request.id, from_bob.id, alice())
        .await
        .unwrap();

    // Winner paid, loser rejected, request closed
    assert_eq!(market.balance(&bob()).unwrap(), 500);
    assert_eq!(market.balance(&carol()).unwrap(), 0);
    assert_eq!(
        market.get_request(request.id).unwrap().status,
        RequestStatus::Closed
    );

    let contributions = market.contributions(request.id).unwrap();
    let winner = contributions.iter().find(|c| c.id == from_bob.id).unwrap();
    let loser = contributions.iter().find(|c| c.id == from_carol.id).unwrap();
    assert_eq!(winner.status, ContributionStatus::Accepted);
    assert_eq!(loser.status, ContributionStatus::Rejected);

    // Notifications: two arrivals to alice, award to bob, not-selected to carol
    let sent = notifier.take();
    let arrivals: Vec<_> = sent
        .iter()
        .filter(|n| n.kind == NotificationKind::ContributionReceived)
        .collect();
    assert_eq!(arrivals.len(), 2);
    assert!(arrivals.iter().all(|n| n.target == alice()));

    assert!(sent
        .iter()
        .any(|n| n.kind == NotificationKind::BountyAwarded && n.target == bob()));
    assert!(sent
        .iter()
        .any(|n| n.kind == NotificationKind::NotSelected && n.target == carol()));

    market.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_accept_guards() {
    let (market, _notifier, _temp) = open_market().await;
    market.credit(alice(), 1000).await.unwrap();

    let request = market.post_request(alice(), params(500)).await.unwrap();
    let from_bob = market
        .submit_contribution(request.id, bob(), "upload:bob-notes")
        .await
        .unwrap();
    let from_carol = market
        .submit_contribution(request.id, carol(), "upload:carol-notes")
        .await
        .unwrap();

    // Only the owner may accept
    let err = market
        .accept_contribution(request.id, from_bob.id, bob())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PermissionDenied);

    market
        .accept_contribution(request.id, from_bob.id, alice())
        .await
        .unwrap();

    // Second accept is forbidden: the request is closed
    let err = market
        .accept_contribution(request.id, from_carol.id, alice())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);

    // Exactly one payout happened
    assert_eq!(market.balance(&bob()).unwrap(), 500);
    assert_eq!(market.balance(&carol()).unwrap(), 0);

    market.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_reject_removes_contribution() {
    let (market, notifier, _temp) = open_market().await;
    market.credit(alice(), 1000).await.unwrap();

    let request = market.post_request(alice(), params(500)).await.unwrap();
    let from_bob = market
        .submit_contribution(request.id, bob(), "upload:bob-notes")
        .await
        .unwrap();
    let from_carol = market
        .submit_contribution(request.id, carol(), "upload:carol-notes")
        .await
        .unwrap();

    market
        .reject_contribution(request.id, from_bob.id, alice())
        .await
        .unwrap();

    // Removed outright, not merely marked
    let contributions = market.contributions(request.id).unwrap();
    assert_eq!(contributions.len(), 1);
    assert_eq!(contributions[0].id, from_carol.id);

    assert!(notifier
        .take()
        .iter()
        .any(|n| n.kind == NotificationKind::ContributionDeclined && n.target == bob()));

    // No ledger movement from a rejection
    assert_eq!(market.balance(&bob()).unwrap(), 0);
    assert_eq!(market.balance(&alice()).unwrap(), 500);

    // The surviving contribution can still win
    market
        .accept_contribution(request.id, from_carol.id, alice())
        .await
        .unwrap();
    assert_eq!(market.balance(&carol()).unwrap(), 500);

    market.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_delete_active_refunds_half() {
    let (market, _notifier, _temp) = open_market().await;
    market.credit(alice(), 300).await.unwrap();

    let request = market.post_request(alice(), params(300)).await.unwrap();
    assert_eq!(market.balance(&alice()).unwrap(), 0);

    let refund = market.delete_request(request.id, alice()).await.unwrap();
    assert_eq!(refund, 150);
    assert_eq!(market.balance(&alice()).unwrap(), 150);

    // Gone for every subsequent operation
    let err = market.get_request(request.id).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    let err = market
        .submit_contribution(request.id, bob(), "upload:late")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    market.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_delete_closed_refunds_nothing() {
    let (market, _notifier, _temp) = open_market().await;
    market.credit(alice(), 1000).await.unwrap();

    let request = market.post_request(alice(), params(500)).await.unwrap();
    let from_bob = market
        .submit_contribution(request.id, bob(), "upload:bob-notes")
        .await
        .unwrap();
    market
        .accept_contribution(request.id, from_bob.id, alice())
        .await
        .unwrap();

    let refund = market.delete_request(request.id, alice()).await.unwrap();
    assert_eq!(refund, 0);
    assert_eq!(market.balance(&alice()).unwrap(), 500);

    // Request and contributions are gone
    assert_eq!(
        market.get_request(request.id).unwrap_err().kind(),
        ErrorKind::NotFound
    );
    assert!(market.list_requests(&alice()).unwrap().is_empty());

    market.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_only_owner_may_delete() {
    let (market, _notifier, _temp) = open_market().await;
    market.credit(alice(), 1000).await.unwrap();

    let request = market.post_request(alice(), params(500)).await.unwrap();
    let err = market.delete_request(request.id, bob()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PermissionDenied);

    market.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_reopen_charges_again_and_clears_contributions() {
    let (market, _notifier, _temp) = open_market().await;
    market.credit(alice(), 1000).await.unwrap();

    let request = market.post_request(alice(), params(500)).await.unwrap();
    let from_bob = market
        .submit_contribution(request.id, bob(), "upload:bob-notes")
        .await
        .unwrap();
    market
        .accept_contribution(request.id, from_bob.id, alice())
        .await
        .unwrap();
    assert_eq!(market.balance(&alice()).unwrap(), 500);

    market.reopen_request(request.id, alice()).await.unwrap();

    let reopened = market.get_request(request.id).unwrap();
    assert_eq!(reopened.status, RequestStatus::Active);
    assert!(reopened.contribution_ids.is_empty());
    assert!(market.contributions(request.id).unwrap().is_empty());
    assert_eq!(market.balance(&alice()).unwrap(), 0);

    market.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_reopen_without_funds_fails_cleanly() {
    let (market, _notifier, _temp) = open_market().await;
    market.credit(alice(), 500).await.unwrap();

    let request = market.post_request(alice(), params(500)).await.unwrap();
    let from_bob = market
        .submit_contribution(request.id, bob(), "upload:bob-notes")
        .await
        .unwrap();
    market
        .accept_contribution(request.id, from_bob.id, alice())
        .await
        .unwrap();

    // Alice has 0 left; reopening a 500 bounty must fail
    let err = market.reopen_request(request.id, alice()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InsufficientFunds);

    // Request remains closed with its contribution intact
    let request = market.get_request(request.id).unwrap();
    assert_eq!(request.status, RequestStatus::Closed);
    assert_eq!(request.contribution_ids.len(), 1);

    market.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_reopen_active_request_is_invalid() {
    let (market, _notifier, _temp) = open_market().await;
    market.credit(alice(), 1000).await.unwrap();

    let request = market.post_request(alice(), params(500)).await.unwrap();
    let err = market.reopen_request(request.id, alice()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);

    market.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_reopen_then_delete_matches_fresh_delete_refund() {
    let (market, _notifier, _temp) = open_market().await;
    market.credit(alice(), 2000).await.unwrap();

    // Path A: post 301, delete while active
    let fresh = market.post_request(alice(), params(301)).await.unwrap();
    let fresh_refund = market.delete_request(fresh.id, alice()).await.unwrap();

    // Path B: post 301, accept, reopen, delete while active
    let reopened = market.post_request(alice(), params(301)).await.unwrap();
    let contribution = market
        .submit_contribution(reopened.id, bob(), "upload:bob-notes")
        .await
        .unwrap();
    market
        .accept_contribution(reopened.id, contribution.id, alice())
        .await
        .unwrap();
    market.reopen_request(reopened.id, alice()).await.unwrap();
    let reopened_refund = market.delete_request(reopened.id, alice()).await.unwrap();

    assert_eq!(fresh_refund, 150);
    assert_eq!(reopened_refund, fresh_refund);

    market.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_targeted_request_audience() {
    let (market, _notifier, _temp) = open_market().await;
    market.credit(alice(), 1000).await.unwrap();

    // Target resolved from a display name at posting time
    let mut p = params(200);
    p.audience = AudienceSpec::Targeted("Bob Smith".to_string());
    let request = market.post_request(alice(), p).await.unwrap();

    // Visible to bob, hidden from carol and from the owner
    assert_eq!(market.list_market(&bob()).unwrap().len(), 1);
    assert!(market.list_market(&carol()).unwrap().is_empty());
    assert!(market.list_market(&alice()).unwrap().is_empty());

    // Only bob may contribute
    market
        .submit_contribution(request.id, bob(), "upload:bob-notes")
        .await
        .unwrap();
    let err = market
        .submit_contribution(request.id, carol(), "upload:carol-notes")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::PermissionDenied);

    market.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_unresolvable_target_fails_validation() {
    let (market, _notifier, _temp) = open_market().await;
    market.credit(alice(), 1000).await.unwrap();

    let mut p = params(200);
    p.audience = AudienceSpec::Targeted("no such person".to_string());
    let err = market.post_request(alice(), p).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(market.balance(&alice()).unwrap(), 1000);

    market.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_market_listing_excludes_owner_and_closed() {
    let (market, _notifier, _temp) = open_market().await;
    market.credit(alice(), 1000).await.unwrap();
    market.credit(bob(), 1000).await.unwrap();

    let from_alice = market.post_request(alice(), params(200)).await.unwrap();
    market.post_request(bob(), params(200)).await.unwrap();

    // Bob sees alice's request but not his own
    let feed = market.list_market(&bob()).unwrap();
    assert_eq!(feed.len(), 1);
    assert_eq!(feed[0].id, from_alice.id);

    // Closing removes it from the market
    let contribution = market
        .submit_contribution(from_alice.id, bob(), "upload:bob-notes")
        .await
        .unwrap();
    market
        .accept_contribution(from_alice.id, contribution.id, alice())
        .await
        .unwrap();
    assert!(market.list_market(&bob()).unwrap().is_empty());

    // But it still shows in the owner's listing
    assert_eq!(market.list_requests(&alice()).unwrap().len(), 1);

    market.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_record_view_counts() {
    let (market, _notifier, _temp) = open_market().await;
    market.credit(alice(), 1000).await.unwrap();

    let request = market.post_request(alice(), params(200)).await.unwrap();
    assert_eq!(market.record_view(request.id).await.unwrap(), 1);
    assert_eq!(market.record_view(request.id).await.unwrap(), 2);
    assert_eq!(market.get_request(request.id).unwrap().views, 2);

    market.delete_request(request.id, alice()).await.unwrap();
    let err = market.record_view(request.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    market.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_concurrent_posts_never_overdraw() {
    let (market, _notifier, _temp) = open_market().await;
    let market = Arc::new(market);
    market.credit(alice(), 500).await.unwrap();

    // Two racing posts against a balance that covers only one
    let m1 = market.clone();
    let m2 = market.clone();
    let (a, b) = tokio::join!(
        m1.post_request(alice(), params(500)),
        m2.post_request(alice(), params(500)),
    );

    let successes = [a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count();
    assert_eq!(successes, 1);
    assert_eq!(market.balance(&alice()).unwrap(), 0);
    assert_eq!(market.list_requests(&alice()).unwrap().len(), 1);
}

#[tokio::test]
async fn test_concurrent_submissions_all_land_in_order() {
    let (market, _notifier, _temp) = open_market().await;
    let market = Arc::new(market);
    market.credit(alice(), 1000).await.unwrap();

    let request = market.post_request(alice(), params(500)).await.unwrap();

    let mut handles = Vec::new();
    for i in 0..8 {
        let market = market.clone();
        let author = UserId::new(format!("contributor-{}", i));
        let request_id = request.id;
        handles.push(tokio::spawn(async move {
            market
                .submit_contribution(request_id, author, format!("upload:{}", i))
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let contributions = market.contributions(request.id).unwrap();
    assert_eq!(contributions.len(), 8);

    // Arrival order is preserved with non-decreasing timestamps
    for pair in contributions.windows(2) {
        assert!(pair[0].submitted_at <= pair[1].submitted_at);
    }
    let mut ids: Vec<_> = contributions.iter().map(|c| c.id).collect();
    ids.dedup();
    assert_eq!(ids.len(), 8);
}
