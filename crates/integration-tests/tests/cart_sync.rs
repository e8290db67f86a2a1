//! Synchronizer behavior: the state machine, refetch-after-mutation, and
//! out-of-order completion handling.

use std::time::Duration;

use wiremock::matchers::{method, path};
use wiremock::{Mock, ResponseTemplate};

use greenmarket_client::sync::{CartError, Phase};
use greenmarket_core::ProductId;
use greenmarket_integration_tests::{TestContext, cart_line_json};

#[tokio::test]
async fn init_without_token_settles_anonymous() {
    let ctx = TestContext::new().await;

    // No GET mock mounted: any remote call would 404 loudly.
    ctx.sync.init().await;

    assert_eq!(ctx.sync.phase(), Phase::Anonymous);
    assert!(ctx.sync.cart().is_empty());
    assert_eq!(ctx.server.received_requests().await.unwrap_or_default().len(), 0);
}

#[tokio::test]
async fn init_with_token_fetches_cart() {
    let ctx = TestContext::new().await;
    ctx.log_in("jwt-abc");

    Mock::given(method("GET"))
        .and(path("/api/cart"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!([cart_line_json(1, 7, 2, 100)])),
        )
        .mount(&ctx.server)
        .await;

    ctx.sync.init().await;

    assert_eq!(ctx.sync.phase(), Phase::Ready);
    assert_eq!(ctx.sync.cart().quantity_of(ProductId::new(7)), 2);
}

#[tokio::test]
async fn add_posts_increment_then_refetches() {
    let ctx = TestContext::new().await;
    ctx.log_in("jwt-abc");

    // First fetch (init) sees quantity 2, every later fetch sees quantity 3.
    Mock::given(method("GET"))
        .and(path("/api/cart"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!([cart_line_json(1, 7, 2, 100)])),
        )
        .up_to_n_times(1)
        .mount(&ctx.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/cart"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!([cart_line_json(1, 7, 3, 100)])),
        )
        .mount(&ctx.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/cart/add/7"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"message": "Added to cart"})),
        )
        .expect(1)
        .mount(&ctx.server)
        .await;

    ctx.sync.init().await;
    assert_eq!(ctx.sync.cart().quantity_of(ProductId::new(7)), 2);

    ctx.sync.add(ProductId::new(7)).await.expect("add succeeds");

    assert_eq!(ctx.sync.phase(), Phase::Ready);
    assert_eq!(ctx.sync.cart().quantity_of(ProductId::new(7)), 3);
}

#[tokio::test]
async fn failed_mutation_still_refetches() {
    let ctx = TestContext::new().await;
    ctx.log_in("jwt-abc");

    Mock::given(method("POST"))
        .and(path("/api/cart/decrease/9"))
        .respond_with(
            ResponseTemplate::new(404).set_body_json(serde_json::json!({"detail": "Item not found"})),
        )
        .mount(&ctx.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/cart"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!([cart_line_json(1, 7, 2, 100)])),
        )
        .expect(1)
        .mount(&ctx.server)
        .await;

    let err = ctx
        .sync
        .remove(ProductId::new(9))
        .await
        .expect_err("decrement fails");
    assert!(matches!(err, CartError::Rejected { status: 404, .. }));

    // The failure is reported, but the display refetched anyway.
    assert_eq!(ctx.sync.phase(), Phase::Ready);
    assert_eq!(ctx.sync.cart().quantity_of(ProductId::new(7)), 2);
}

#[tokio::test]
async fn refresh_is_idempotent_without_mutations() {
    let ctx = TestContext::new().await;
    ctx.log_in("jwt-abc");

    Mock::given(method("GET"))
        .and(path("/api/cart"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!([cart_line_json(1, 7, 2, 100)])),
        )
        .mount(&ctx.server)
        .await;

    ctx.sync.refresh().await;
    let first = ctx.sync.cart();
    ctx.sync.refresh().await;
    let second = ctx.sync.cart();

    assert_eq!(first, second);
}

#[tokio::test]
async fn rejected_token_publishes_empty_cart() {
    let ctx = TestContext::new().await;
    ctx.log_in("expired");

    Mock::given(method("GET"))
        .and(path("/api/cart"))
        .respond_with(
            ResponseTemplate::new(401).set_body_json(serde_json::json!({"detail": "Invalid token"})),
        )
        .mount(&ctx.server)
        .await;

    ctx.sync.refresh().await;

    assert_eq!(ctx.sync.phase(), Phase::Ready);
    assert!(ctx.sync.cart().is_empty());
}

#[tokio::test]
async fn later_issued_refresh_wins_over_slow_earlier_one() {
    let ctx = TestContext::new().await;
    ctx.log_in("jwt-abc");

    // The first fetch is slow and stale; the second is fast and current.
    Mock::given(method("GET"))
        .and(path("/api/cart"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!([cart_line_json(1, 7, 2, 100)]))
                .set_delay(Duration::from_millis(300)),
        )
        .up_to_n_times(1)
        .mount(&ctx.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/cart"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!([cart_line_json(1, 7, 3, 100)])),
        )
        .mount(&ctx.server)
        .await;

    let sync = ctx.sync.clone();
    let slow = tokio::spawn(async move { sync.refresh().await });
    tokio::time::sleep(Duration::from_millis(50)).await;

    ctx.sync.refresh().await;
    assert_eq!(ctx.sync.cart().quantity_of(ProductId::new(7)), 3);

    // The earlier-issued fetch completes last; its stale snapshot is dropped.
    slow.await.expect("refresh task completes");
    assert_eq!(ctx.sync.cart().quantity_of(ProductId::new(7)), 3);
}

#[tokio::test]
async fn add_refetch_wins_over_faster_remove() {
    let ctx = TestContext::new().await;
    ctx.log_in("jwt-abc");

    // The increment is slow and the decrement instant, so the decrement's
    // refetch is issued first while the increment's refetch is issued last.
    Mock::given(method("POST"))
        .and(path("/api/cart/add/7"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!({"message": "Added to cart"}))
                .set_delay(Duration::from_millis(200)),
        )
        .expect(1)
        .mount(&ctx.server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/cart/decrease/7"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(serde_json::json!({"message": "Cart updated"})),
        )
        .expect(1)
        .mount(&ctx.server)
        .await;

    // The decrement's refetch arrives first but resolves slowly and stale;
    // the increment's refetch arrives later and resolves immediately.
    Mock::given(method("GET"))
        .and(path("/api/cart"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!([cart_line_json(1, 7, 1, 100)]))
                .set_delay(Duration::from_millis(500)),
        )
        .up_to_n_times(1)
        .mount(&ctx.server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/cart"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!([cart_line_json(1, 7, 2, 100)])),
        )
        .mount(&ctx.server)
        .await;

    let sync = ctx.sync.clone();
    let add = tokio::spawn(async move { sync.add(ProductId::new(7)).await });
    tokio::time::sleep(Duration::from_millis(50)).await;

    ctx.sync
        .remove(ProductId::new(7))
        .await
        .expect("decrement succeeds");
    add.await
        .expect("add task completes")
        .expect("increment succeeds");

    // By now the stale quantity-1 response has resolved and been dropped:
    // `remove` only returns once its own refetch settles.
    assert_eq!(ctx.sync.phase(), Phase::Ready);
    assert_eq!(ctx.sync.cart().quantity_of(ProductId::new(7)), 2);
}

#[tokio::test]
async fn logout_discards_in_flight_fetch() {
    let ctx = TestContext::new().await;
    ctx.log_in("jwt-abc");

    Mock::given(method("GET"))
        .and(path("/api/cart"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!([cart_line_json(1, 7, 2, 100)]))
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&ctx.server)
        .await;

    let sync = ctx.sync.clone();
    let in_flight = tokio::spawn(async move { sync.refresh().await });
    tokio::time::sleep(Duration::from_millis(50)).await;

    ctx.sync.clear();
    in_flight.await.expect("refresh task completes");

    // The fetch resolved after logout; its result must not be published.
    assert_eq!(ctx.sync.phase(), Phase::Anonymous);
    assert!(ctx.sync.cart().is_empty());
}

#[tokio::test]
async fn subscribers_observe_each_published_snapshot() {
    let ctx = TestContext::new().await;
    ctx.log_in("jwt-abc");

    Mock::given(method("GET"))
        .and(path("/api/cart"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(serde_json::json!([cart_line_json(1, 7, 2, 100)])),
        )
        .mount(&ctx.server)
        .await;

    let mut rx = ctx.sync.subscribe();
    ctx.sync.refresh().await;

    let state = rx
        .wait_for(|state| state.phase == Phase::Ready)
        .await
        .expect("sender alive");
    assert_eq!(state.cart.quantity_of(ProductId::new(7)), 2);

    // A late subscriber sees the latest state immediately.
    let late = ctx.sync.subscribe();
    assert_eq!(late.borrow().cart.quantity_of(ProductId::new(7)), 2);
}
