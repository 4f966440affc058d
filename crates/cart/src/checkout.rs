//! Order submission.
//!
//! The cart hands a finalized snapshot to an [`OrderSubmitter`]. On success
//! the cart is cleared; on failure it is left untouched so the shopper can
//! retry. The submitted total is informational only: the order endpoint
//! recomputes the authoritative amount from its own catalog.

use std::future::Future;

use np_cart_core::{OrderId, OrderRequest};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, instrument, warn};
use url::Url;

use crate::config::OrderEndpointConfig;
use crate::engine::CartEngine;
use crate::storage::StorageArea;

/// Errors that can occur when submitting an order.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// There is nothing to submit.
    #[error("Cart is empty")]
    EmptyCart,

    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The endpoint refused the order.
    #[error("Order rejected: {status} - {message}")]
    Rejected { status: u16, message: String },

    /// The endpoint configuration cannot be used.
    #[error("Invalid order endpoint configuration: {0}")]
    InvalidConfig(String),

    /// The endpoint accepted the order but its reply could not be read.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// The endpoint's acknowledgement of a submitted order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderConfirmation {
    #[serde(default)]
    pub order_id: Option<OrderId>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Result of a successful checkout.
#[derive(Debug, Clone)]
pub struct CheckoutReceipt {
    pub confirmation: OrderConfirmation,
    /// The snapshot that was submitted.
    pub order: OrderRequest,
    /// Whether the cart was removed from storage afterwards.
    pub cart_cleared: bool,
}

/// Something that accepts finalized orders.
pub trait OrderSubmitter {
    /// Submit an order.
    ///
    /// # Errors
    ///
    /// Returns `CheckoutError` if the order could not be placed.
    fn submit(
        &self,
        order: &OrderRequest,
    ) -> impl Future<Output = Result<OrderConfirmation, CheckoutError>> + Send;
}

/// Submit the current cart and clear it once the order is accepted.
///
/// # Errors
///
/// Returns `CheckoutError::EmptyCart` without contacting the submitter when
/// the cart has no lines, or the submitter's error when the order fails. The
/// cart is unchanged in both cases.
#[instrument(skip(engine, submitter))]
pub async fn checkout<S, O>(
    engine: &CartEngine<S>,
    submitter: &O,
) -> Result<CheckoutReceipt, CheckoutError>
where
    S: StorageArea,
    O: OrderSubmitter + Sync,
{
    let cart = engine.read();
    if cart.is_empty() {
        return Err(CheckoutError::EmptyCart);
    }

    let order = OrderRequest::from(&cart);
    info!(lines = order.items.len(), total = %order.total, "submitting order");

    let confirmation = match submitter.submit(&order).await {
        Ok(confirmation) => confirmation,
        Err(e) => {
            warn!(error = %e, "order submission failed, keeping cart");
            return Err(e);
        }
    };

    let cleared = engine.clear();
    if let Some(e) = &cleared.write_error {
        warn!(error = %e, "order placed but cart could not be cleared");
    }
    info!(order_id = ?confirmation.order_id, "order placed");

    Ok(CheckoutReceipt {
        confirmation,
        order,
        cart_cleared: cleared.is_durable(),
    })
}

/// Submits orders as JSON over HTTP.
#[derive(Clone)]
pub struct HttpOrderSubmitter {
    client: reqwest::Client,
    url: Url,
}

impl HttpOrderSubmitter {
    /// Create a submitter for the configured endpoint.
    ///
    /// # Errors
    ///
    /// Returns error if the token is not a valid header value or the HTTP
    /// client fails to build.
    pub fn new(config: &OrderEndpointConfig) -> Result<Self, CheckoutError> {
        let mut headers = HeaderMap::new();

        if let Some(token) = &config.api_token {
            let auth_value = format!("Bearer {}", token.expose_secret());
            let mut value = HeaderValue::from_str(&auth_value).map_err(|e| {
                CheckoutError::InvalidConfig(format!("Invalid API token format: {e}"))
            })?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.timeout)
            .build()?;

        Ok(Self {
            client,
            url: config.url.clone(),
        })
    }

    /// The endpoint orders are posted to.
    #[must_use]
    pub const fn url(&self) -> &Url {
        &self.url
    }
}

impl OrderSubmitter for HttpOrderSubmitter {
    async fn submit(&self, order: &OrderRequest) -> Result<OrderConfirmation, CheckoutError> {
        let response = self
            .client
            .post(self.url.clone())
            .json(order)
            .send()
            .await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(CheckoutError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.text().await?;
        parse_confirmation(&body)
    }
}

/// Read the endpoint's reply. An empty body is a confirmation without an ID.
fn parse_confirmation(body: &str) -> Result<OrderConfirmation, CheckoutError> {
    if body.trim().is_empty() {
        return Ok(OrderConfirmation::default());
    }
    serde_json::from_str(body).map_err(|e| CheckoutError::InvalidResponse(e.to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use np_cart_core::{ProductId, ProductInput};
    use rust_decimal::Decimal;
    use secrecy::SecretString;

    use super::*;
    use crate::bus::NotificationBus;
    use crate::storage::MemoryStorage;
    use crate::store::CartStore;

    /// Submitter that records calls and answers with a fixed result.
    struct FakeSubmitter {
        calls: AtomicUsize,
        accept: bool,
    }

    impl FakeSubmitter {
        fn new(accept: bool) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                accept,
            }
        }
    }

    impl OrderSubmitter for FakeSubmitter {
        async fn submit(&self, order: &OrderRequest) -> Result<OrderConfirmation, CheckoutError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            assert!(!order.items.is_empty());
            if self.accept {
                Ok(OrderConfirmation {
                    order_id: Some(OrderId::new(1001)),
                    message: None,
                })
            } else {
                Err(CheckoutError::Rejected {
                    status: 422,
                    message: "out of stock".to_string(),
                })
            }
        }
    }

    fn engine() -> CartEngine<MemoryStorage> {
        CartEngine::new(
            CartStore::new(Arc::new(MemoryStorage::new()), "cart"),
            NotificationBus::new(16),
        )
    }

    #[tokio::test]
    async fn test_checkout_clears_on_success() {
        let engine = engine();
        engine.add_item(&ProductInput::new(1, "a", 10, ""), 2);
        engine.add_item(&ProductInput::new(2, "b", 5, ""), 3);
        let submitter = FakeSubmitter::new(true);

        let receipt = checkout(&engine, &submitter).await.unwrap();

        assert_eq!(receipt.confirmation.order_id, Some(OrderId::new(1001)));
        assert_eq!(receipt.order.total, Decimal::from(35));
        assert_eq!(receipt.order.items[0].product_id, ProductId::new(1));
        assert!(receipt.cart_cleared);
        assert!(engine.read().is_empty());
    }

    #[tokio::test]
    async fn test_checkout_keeps_cart_on_failure() {
        let engine = engine();
        engine.add_item(&ProductInput::new(1, "a", 10, ""), 2);
        let before = engine.read();

        let err = checkout(&engine, &FakeSubmitter::new(false)).await.unwrap_err();

        assert!(matches!(err, CheckoutError::Rejected { status: 422, .. }));
        assert_eq!(engine.read(), before);
    }

    #[tokio::test]
    async fn test_checkout_refuses_empty_cart() {
        let engine = engine();
        let submitter = FakeSubmitter::new(true);

        let err = checkout(&engine, &submitter).await.unwrap_err();

        assert!(matches!(err, CheckoutError::EmptyCart));
        assert_eq!(submitter.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_checkout_signals_clear_once() {
        let engine = engine();
        engine.add_one(&ProductInput::new(1, "a", 10, ""));
        let mut local = engine.bus().subscribe_local();

        checkout(&engine, &FakeSubmitter::new(true)).await.unwrap();

        assert!(local.try_recv().is_ok());
        assert!(local.try_recv().is_err());
    }

    #[test]
    fn test_parse_confirmation() {
        let confirmation = parse_confirmation(r#"{"order_id": 77, "message": "thanks"}"#).unwrap();
        assert_eq!(confirmation.order_id, Some(OrderId::new(77)));
        assert_eq!(confirmation.message.as_deref(), Some("thanks"));

        assert_eq!(parse_confirmation("  ").unwrap(), OrderConfirmation::default());
        assert!(matches!(
            parse_confirmation("<html>"),
            Err(CheckoutError::InvalidResponse(_))
        ));
    }

    #[test]
    fn test_http_submitter_builds() {
        let config = OrderEndpointConfig {
            url: Url::parse("https://orders.example.test/api/orders").unwrap(),
            api_token: Some(SecretString::from("tok_abc123")),
            timeout: Duration::from_secs(5),
        };

        let submitter = HttpOrderSubmitter::new(&config).unwrap();
        assert_eq!(submitter.url().path(), "/api/orders");
    }

    #[test]
    fn test_http_submitter_rejects_bad_token() {
        let config = OrderEndpointConfig {
            url: Url::parse("https://orders.example.test/").unwrap(),
            api_token: Some(SecretString::from("bad\ntoken")),
            timeout: Duration::from_secs(5),
        };

        assert!(matches!(
            HttpOrderSubmitter::new(&config),
            Err(CheckoutError::InvalidConfig(_))
        ));
    }
}
