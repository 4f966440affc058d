//! Order submission against a loopback HTTP endpoint.

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use np_cart::config::OrderEndpointConfig;
use np_cart::storage::MemoryStorage;
use np_cart::{CartContext, CartSettings, CheckoutError, HttpOrderSubmitter, checkout};
use np_cart_core::OrderId;
use np_cart_integration_tests::{OrderResponder, product};
use url::Url;

fn context() -> CartContext<MemoryStorage> {
    CartContext::new(MemoryStorage::new(), &CartSettings::default())
}

#[tokio::test]
async fn test_checkout_posts_order_and_clears_cart() {
    let context = context();
    context.engine().add_item(&product(1, "10"), 2);
    context.engine().add_item(&product(2, "2.50"), 1);

    let responder = OrderResponder::start(201, r#"{"order_id": 5001, "message": "Thanks!"}"#)
        .await
        .unwrap();
    let submitter = HttpOrderSubmitter::new(&responder.config(Some("tok_test"))).unwrap();

    let receipt = checkout(context.engine(), &submitter).await.unwrap();

    assert_eq!(receipt.confirmation.order_id, Some(OrderId::new(5001)));
    assert_eq!(receipt.confirmation.message.as_deref(), Some("Thanks!"));
    assert!(receipt.cart_cleared);
    assert!(context.store().read().is_empty());

    let request = responder.request().await.unwrap();
    assert!(request.head.starts_with("POST /api/orders"));
    assert_eq!(request.header("authorization"), Some("Bearer tok_test"));

    let body: serde_json::Value = serde_json::from_str(&request.body).unwrap();
    assert_eq!(body["items"][0]["product_id"], 1);
    assert_eq!(body["items"][0]["quantity"], 2);
    assert_eq!(body["items"][1]["product_id"], 2);
    assert_eq!(body["total"].as_str().unwrap().parse::<f64>().unwrap(), 22.5);
}

#[tokio::test]
async fn test_rejected_order_keeps_cart() {
    let context = context();
    context.engine().add_item(&product(1, "10"), 1);
    let before = context.store().read();

    let responder = OrderResponder::start(422, r#"{"error": "out of stock"}"#).await.unwrap();
    let submitter = HttpOrderSubmitter::new(&responder.config(None)).unwrap();

    let err = checkout(context.engine(), &submitter).await.unwrap_err();

    match err {
        CheckoutError::Rejected { status, message } => {
            assert_eq!(status, 422);
            assert!(message.contains("out of stock"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(context.store().read(), before);

    let request = responder.request().await.unwrap();
    assert_eq!(request.header("authorization"), None);
}

#[tokio::test]
async fn test_empty_confirmation_body_is_accepted() {
    let context = context();
    context.engine().add_one(&product(1, "1"));

    let responder = OrderResponder::start(200, "").await.unwrap();
    let submitter = HttpOrderSubmitter::new(&responder.config(None)).unwrap();

    let receipt = checkout(context.engine(), &submitter).await.unwrap();

    assert_eq!(receipt.confirmation.order_id, None);
    assert!(context.store().read().is_empty());
}

#[tokio::test]
async fn test_unreachable_endpoint_keeps_cart() {
    let context = context();
    context.engine().add_one(&product(1, "1"));

    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    let config = OrderEndpointConfig {
        url: Url::parse(&format!("http://127.0.0.1:{port}/api/orders")).unwrap(),
        api_token: None,
        timeout: Duration::from_secs(2),
    };

    let submitter = HttpOrderSubmitter::new(&config).unwrap();
    let err = checkout(context.engine(), &submitter).await.unwrap_err();

    assert!(matches!(err, CheckoutError::Http(_)));
    assert_eq!(context.store().read().item_count(), 1);
}
