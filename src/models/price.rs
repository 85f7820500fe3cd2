use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Product name used when a page (or a client) doesn't provide one.
pub const UNKNOWN_PRODUCT: &str = "Unknown Product";

/// A single stored price reading. Append-only per url.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceObservation {
    #[serde(rename = "_id")]
    pub id: String,

    pub url: String,
    pub price: f64,
    pub product_name: String,

    // when the price was observed (client supplied)
    pub timestamp: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Observation as it arrives from a capture path, before validation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewObservation {
    #[serde(default)]
    pub url: String,

    #[serde(default)]
    pub price: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl NewObservation {
    pub fn new(url: impl Into<String>, price: f64, product_name: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            price: Some(price),
            product_name: Some(product_name.into()),
            timestamp: None,
        }
    }

    /// Trimmed product name, or the sentinel when missing/blank.
    pub fn product_name_or_default(&self) -> String {
        self.product_name
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(UNKNOWN_PRODUCT)
            .to_string()
    }
}
