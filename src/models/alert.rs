use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    #[serde(rename = "_id")]
    pub id: String,

    pub url: String,
    pub product_name: String,

    pub target_price: f64,
    pub current_price: f64,

    // soft delete flag; at most one active alert per url
    pub is_active: bool,

    pub last_checked: DateTime<Utc>,
    pub notifications_sent: i64,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Alert {
    /// Inclusive threshold: a price equal to the target triggers.
    pub fn is_hit_by(&self, price: f64) -> bool {
        price <= self.target_price
    }
}

/// Fields written by an alert-set request.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertFields {
    pub product_name: String,
    pub target_price: f64,
    pub current_price: f64,
}
