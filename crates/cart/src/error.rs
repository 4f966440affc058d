//! Unified error handling with Sentry integration.
//!
//! Most anomalies in the cart are absorbed where they happen: a corrupt blob
//! reads as an empty cart, a failed write still returns the computed cart.
//! Those paths call [`report_absorbed`] so the failure reaches logs and
//! Sentry without reaching the caller. The [`Error`] enum is for callers that
//! do want a single error type (the CLI, checkout).

use thiserror::Error;

use crate::checkout::CheckoutError;
use crate::config::ConfigError;
use crate::store::StoreError;

/// Top-level error type for the local cart.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration could not be loaded.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// Persisting the cart failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Submitting the order failed.
    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    /// Invalid input from the caller.
    #[error("Bad request: {0}")]
    BadRequest(String),
}

/// Result type alias for [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Log and capture an error that is deliberately not propagated.
pub fn report_absorbed<E>(err: &E, message: &str)
where
    E: std::error::Error + 'static,
{
    let event_id = sentry::capture_error(err);
    tracing::error!(
        error = %err,
        sentry_event_id = %event_id,
        "{message}"
    );
}

/// Add a breadcrumb for cart actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of cart
/// mutations leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Added item", Some(&[("product_id", "123")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::StorageError;

    #[test]
    fn test_error_display() {
        let err = Error::BadRequest("quantity must be a number".to_string());
        assert_eq!(err.to_string(), "Bad request: quantity must be a number");

        let err = Error::Store(StoreError::Storage(StorageError::Unavailable(
            "disk gone".to_string(),
        )));
        assert_eq!(
            err.to_string(),
            "Store error: Storage error: Storage unavailable: disk gone"
        );
    }

    #[test]
    fn test_error_from_checkout() {
        let err: Error = CheckoutError::EmptyCart.into();
        assert!(matches!(err, Error::Checkout(CheckoutError::EmptyCart)));
    }

    #[test]
    fn test_report_absorbed_without_client() {
        // Sentry is a no-op without an initialized client
        report_absorbed(&StorageError::Unavailable("test".to_string()), "absorbed");
        add_breadcrumb("cart", "test", Some(&[("product_id", "1")]));
    }
}
