//! Price coercion and numeric serialization.
//!
//! Catalog data may carry a price as a JSON number (`19.99`) or as text
//! (`"19.99"`). Cart lines only ever hold a [`Decimal`]; [`coerce_price`] is
//! the single conversion point, and [`numeric`] keeps the persisted form a
//! JSON number.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when coercing a price to a number.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PriceError {
    /// The price text was empty or whitespace.
    #[error("price is empty")]
    Empty,

    /// The price could not be parsed as a decimal number.
    #[error("price is not numeric: {0:?}")]
    NotNumeric(String),
}

/// A price as supplied by the catalog, before coercion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PriceInput {
    /// A JSON number.
    Number(serde_json::Number),
    /// A price encoded as text.
    Text(String),
}

impl PriceInput {
    /// Coerce this input into a decimal amount.
    ///
    /// # Errors
    ///
    /// Returns `PriceError` if the value cannot be read as a number.
    pub fn to_decimal(&self) -> Result<Decimal, PriceError> {
        match self {
            Self::Number(n) => parse_decimal(&n.to_string()),
            Self::Text(s) => parse_decimal(s),
        }
    }
}

impl From<Decimal> for PriceInput {
    fn from(amount: Decimal) -> Self {
        Self::Text(amount.to_string())
    }
}

impl From<i64> for PriceInput {
    fn from(amount: i64) -> Self {
        Self::Number(amount.into())
    }
}

impl From<i32> for PriceInput {
    fn from(amount: i32) -> Self {
        Self::Number(amount.into())
    }
}

impl From<u32> for PriceInput {
    fn from(amount: u32) -> Self {
        Self::Number(amount.into())
    }
}

impl From<&str> for PriceInput {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for PriceInput {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

/// Coerce a catalog price into a decimal amount.
///
/// # Errors
///
/// Returns `PriceError` if the value cannot be read as a number.
pub fn coerce_price(input: &PriceInput) -> Result<Decimal, PriceError> {
    input.to_decimal()
}

fn parse_decimal(raw: &str) -> Result<Decimal, PriceError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(PriceError::Empty);
    }

    Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .map(|d| d.normalize())
        .map_err(|_| PriceError::NotNumeric(trimmed.to_string()))
}

/// Serde helpers that persist a [`Decimal`] as a JSON number.
///
/// Deserialization is lenient and also accepts numeric strings, so a blob
/// written by an older client with text prices still loads.
pub mod numeric {
    use rust_decimal::Decimal;
    use serde::{Deserialize, Deserializer, Serializer};

    use super::PriceInput;

    /// Serialize a decimal as a JSON number.
    ///
    /// # Errors
    ///
    /// Returns the serializer's error if the number cannot be written.
    pub fn serialize<S: Serializer>(value: &Decimal, serializer: S) -> Result<S::Ok, S::Error> {
        rust_decimal::serde::float::serialize(value, serializer)
    }

    /// Deserialize a decimal from a JSON number or numeric string.
    ///
    /// # Errors
    ///
    /// Returns a custom error if the value is not numeric.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Decimal, D::Error> {
        let input = PriceInput::deserialize(deserializer)?;
        input.to_decimal().map_err(serde::de::Error::custom)
    }
}
