mod common;

use common::{seeded_client, BrokenMovers};
use tradepulse_client::dashboard::load_dashboard;
use tradepulse_http::http::v1::Client;

async fn login(client: &impl Client, email: &str, password: &str) -> String {
    client.login(email, password).await.unwrap().access_token
}

#[tokio::test]
async fn test_that_dashboard_combines_all_sections() {
    let client = seeded_client("trader@example.com", "hunter22");
    client.tick_market();
    let token = login(&client, "trader@example.com", "hunter22").await;

    let snapshot = load_dashboard(&client, &token).await;

    assert!(!snapshot.movers.gainers.is_empty() || !snapshot.movers.losers.is_empty());
    assert_eq!(snapshot.indices.len(), 3);
    let summary = snapshot.summary.expect("summary section populated");
    assert_eq!(summary.cash_balance, 100_000.0);
    assert!(!snapshot.news.is_empty());
}

#[tokio::test]
async fn test_that_failed_movers_do_not_poison_the_summary() {
    let client = BrokenMovers {
        inner: seeded_client("trader@example.com", "hunter22"),
    };
    let token = login(&client, "trader@example.com", "hunter22").await;

    let snapshot = load_dashboard(&client, &token).await;

    assert!(snapshot.movers.gainers.is_empty());
    assert!(snapshot.movers.losers.is_empty());
    assert_eq!(snapshot.indices.len(), 3);
    assert!(snapshot.summary.is_some());
}

#[tokio::test]
async fn test_that_missing_summary_leaves_market_sections_intact() {
    let client = seeded_client("trader@example.com", "hunter22");
    client.tick_market();

    // A dead token fails only the authenticated section.
    let snapshot = load_dashboard(&client, "forged-token").await;

    assert!(snapshot.summary.is_none());
    assert_eq!(snapshot.indices.len(), 3);
    assert!(!snapshot.movers.gainers.is_empty() || !snapshot.movers.losers.is_empty());
}
