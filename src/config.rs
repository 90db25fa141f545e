//! Configuration for the booking coordinator.
//!
//! Enumerates every store, collection, and bucket identifier the protocol
//! touches, loaded once from environment variables instead of being read
//! inline at each call site.

use serde::{Deserialize, Serialize};
use std::env;

/// Identifiers and gateway settings for one coordinator instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingConfig {
    /// Hosted database id
    pub database_id: String,
    /// Collection holding event documents
    pub events_collection_id: String,
    /// Collection holding advisory lock documents
    pub lock_collection_id: String,
    /// Collection holding owned ticket records
    pub tickets_collection_id: String,
    /// Collection holding order receipts
    pub orders_collection_id: String,
    /// Collection holding the append-only transaction log
    pub transactions_collection_id: String,
    /// Storage bucket for ticket QR images
    pub qr_bucket_id: String,
    /// Gateway identifier stamped on transaction records
    pub gateway_name: String,
    /// ISO currency code passed to the gateway
    pub currency: String,
}

impl BookingConfig {
    /// Load configuration from environment variables with development
    /// defaults for every field.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            database_id: env::var("BOXOFFICE_DATABASE_ID")
                .unwrap_or_else(|_| "boxoffice".to_string()),
            events_collection_id: env::var("BOXOFFICE_EVENTS_COLLECTION_ID")
                .unwrap_or_else(|_| "events".to_string()),
            lock_collection_id: env::var("BOXOFFICE_LOCK_COLLECTION_ID")
                .unwrap_or_else(|_| "ticket-locks".to_string()),
            tickets_collection_id: env::var("BOXOFFICE_TICKETS_COLLECTION_ID")
                .unwrap_or_else(|_| "tickets".to_string()),
            orders_collection_id: env::var("BOXOFFICE_ORDERS_COLLECTION_ID")
                .unwrap_or_else(|_| "orders".to_string()),
            transactions_collection_id: env::var("BOXOFFICE_TRANSACTIONS_COLLECTION_ID")
                .unwrap_or_else(|_| "transactions".to_string()),
            qr_bucket_id: env::var("BOXOFFICE_QR_BUCKET_ID")
                .unwrap_or_else(|_| "ticket-qrs".to_string()),
            gateway_name: env::var("BOXOFFICE_GATEWAY_NAME")
                .unwrap_or_else(|_| "razorpay".to_string()),
            currency: env::var("BOXOFFICE_CURRENCY").unwrap_or_else(|_| "INR".to_string()),
        }
    }
}

impl Default for BookingConfig {
    fn default() -> Self {
        Self::from_env()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_every_identifier() {
        let config = BookingConfig::from_env();
        assert!(!config.database_id.is_empty());
        assert!(!config.lock_collection_id.is_empty());
        assert!(!config.tickets_collection_id.is_empty());
        assert!(!config.orders_collection_id.is_empty());
        assert!(!config.transactions_collection_id.is_empty());
        assert!(!config.qr_bucket_id.is_empty());
    }
}
