//! Order submission command.
//!
//! # Environment Variables
//!
//! - `ORDER_ENDPOINT_URL` - Order submission endpoint (required)
//! - `ORDER_API_TOKEN` - Bearer token for the endpoint
//! - `ORDER_TIMEOUT_SECS` - Request timeout (default: 30)

use np_cart::context::CartContext;
use np_cart::storage::StorageArea;
use np_cart::{CartConfig, Error, HttpOrderSubmitter};

/// Submit the cart and clear it once the order is accepted.
///
/// # Errors
///
/// Returns `Error::Config` if no endpoint is configured, or `Error::Checkout`
/// if the cart is empty or the order fails.
#[allow(clippy::print_stdout)]
pub async fn run<S: StorageArea>(
    context: &CartContext<S>,
    config: &CartConfig,
) -> Result<(), Error> {
    let submitter = HttpOrderSubmitter::new(config.require_order()?)?;
    tracing::info!(endpoint = %submitter.url(), "submitting cart");

    let receipt = np_cart::checkout(context.engine(), &submitter).await?;

    match receipt.confirmation.order_id {
        Some(id) => println!("Order {id} placed"),
        None => println!("Order placed"),
    }
    if let Some(message) = &receipt.confirmation.message {
        println!("{message}");
    }
    if !receipt.cart_cleared {
        tracing::warn!("order placed but the local cart could not be cleared");
    }
    Ok(())
}
