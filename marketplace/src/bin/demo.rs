//! End-to-end demo of the bounty marketplace
//!
//! Walks one request through its whole lifecycle against a scratch store:
//! post, two contributions, accept, delete. Run with
//! `RUST_LOG=info cargo run --bin market-demo`.

use anyhow::Result;
use market_core::UserId;
use marketplace::{AudienceSpec, Config, Marketplace, PostRequestParams, StaticDirectory};
use notify_gateway::LogNotifier;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Scratch store; wiped on every run
    let data_dir = std::env::temp_dir().join("market-demo");
    let _ = std::fs::remove_dir_all(&data_dir);

    let mut config = Config::default();
    config.data_dir = data_dir;

    let directory = Arc::new(StaticDirectory::new());
    directory.register(UserId::new("alice"), &["Alice Johnson"]);
    directory.register(UserId::new("bob"), &["Bob Smith", "bob@campus.edu"]);
    directory.register(UserId::new("carol"), &["Carol Diaz"]);

    let market = Marketplace::open(config, Arc::new(LogNotifier), directory).await?;

    let alice = UserId::new("alice");
    let bob = UserId::new("bob");
    let carol = UserId::new("carol");

    // Seed balances (the site normally awards karma for uploads)
    market.credit(alice.clone(), 1_000).await?;

    let request = market
        .post_request(
            alice.clone(),
            PostRequestParams {
                title: "Calc II lecture notes".into(),
                description: "Weeks 3-6, integration techniques".into(),
                subject: "MATH-201".into(),
                bounty: 500,
                audience: AudienceSpec::Public,
            },
        )
        .await?;
    tracing::info!(balance = market.balance(&alice)?, "alice posted, bounty escrowed");

    let from_bob = market
        .submit_contribution(request.id, bob.clone(), "upload:bob-notes-pdf")
        .await?;
    market
        .submit_contribution(request.id, carol.clone(), "upload:carol-notes-pdf")
        .await?;
    tracing::info!(
        contributions = market.contributions(request.id)?.len(),
        "two contributions in"
    );

    market
        .accept_contribution(request.id, from_bob.id, alice.clone())
        .await?;
    tracing::info!(
        bob_balance = market.balance(&bob)?,
        carol_balance = market.balance(&carol)?,
        "alice accepted bob's notes"
    );

    let refund = market.delete_request(request.id, alice.clone()).await?;
    tracing::info!(
        refund,
        alice_balance = market.balance(&alice)?,
        "closed request deleted, no refund due"
    );

    market.shutdown().await?;
    Ok(())
}
