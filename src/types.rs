//! Domain types for the booking engine.
//!
//! Identifiers, the event document as persisted by the hosted document
//! store, and the records the coordinator writes during a checkout attempt
//! (transactions, tickets, orders, locks). Field names on the serialized
//! records mirror the wire format of the existing collections, so receipts
//! written by this crate are interchangeable with existing documents.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

/// Unique identifier for an event document
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId(Uuid);

impl EventId {
    /// Creates a new random `EventId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create an `EventId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl Default for EventId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a ticket record
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TicketId(Uuid);

impl TicketId {
    /// Creates a new random `TicketId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TicketId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TicketId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for an order record
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OrderId(Uuid);

impl OrderId {
    /// Creates a new random `OrderId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for OrderId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for an advisory lock document.
///
/// Generated fresh by the caller for every checkout attempt; the store
/// provides no uniqueness constraint beyond the document id itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LockId(Uuid);

impl LockId {
    /// Creates a new random `LockId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for LockId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for LockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Unique identifier for a buyer
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(Uuid);

impl UserId {
    /// Creates a new random `UserId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for UserId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier for one payment attempt, stamped on transaction records.
///
/// Encodes the attempt's wall-clock start (`TXN-<unix millis>`), matching
/// the format of transaction ids already present in the collection.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransactionId(String);

impl TransactionId {
    /// Creates a `TransactionId` stamped with the given instant
    #[must_use]
    pub fn at(now: DateTime<Utc>) -> Self {
        Self(format!("TXN-{}", now.timestamp_millis()))
    }

    /// Returns the identifier as a string slice
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Buyer
// ============================================================================

/// The authenticated buyer driving a checkout attempt
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Buyer {
    /// Buyer's account id
    pub id: UserId,
    /// Display name
    pub name: String,
    /// Email address, if known
    pub email: Option<String>,
    /// Phone number, if known
    pub phone: Option<String>,
}

// ============================================================================
// Event document
// ============================================================================

/// An event document as stored in the events collection.
///
/// Categories and phases are colon-delimited strings
/// (`name:price:quantity[:phaseTag]` and `phaseId:...`); see
/// [`crate::catalog`] for the parsing rules.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EventDocument {
    /// Event name
    pub name: String,
    /// Secondary title line
    #[serde(default)]
    pub sub_name: String,
    /// Display date
    #[serde(default)]
    pub date: String,
    /// Display time
    #[serde(default)]
    pub time: String,
    /// Venue / location line
    #[serde(default)]
    pub location: String,
    /// File id of the event's poster image
    #[serde(rename = "imageFileId", default)]
    pub image_file_id: String,
    /// Ticket category descriptors, one `name:price:quantity[:phaseTag]` each
    #[serde(default)]
    pub categories: Vec<String>,
    /// Sale phase descriptors, ordered; the last element is the current phase
    #[serde(default)]
    pub phase: Vec<String>,
}

// ============================================================================
// Lock document
// ============================================================================

/// Advisory reservation document for one checkout attempt.
///
/// Created before payment begins and deleted on every terminal transition.
/// The `expires_at` field is advisory only: nothing in the store or in this
/// crate enforces it, so a lock abandoned mid-checkout stays behind until
/// some external process removes it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockDocument {
    /// The event whose category this lock covers
    #[serde(rename = "ticketId")]
    pub ticket_id: EventId,
    /// Advisory expiry, five minutes after creation
    #[serde(rename = "expiresAt")]
    pub expires_at: DateTime<Utc>,
}

// ============================================================================
// Transaction record
// ============================================================================

/// Outcome of one payment attempt
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    /// The gateway confirmed the charge
    Completed,
    /// The gateway reported a failure
    Failed,
}

/// Append-only log entry describing one payment attempt.
///
/// Never mutated after creation; failed attempts are recorded with the
/// gateway's error description.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionRecord {
    /// Buyer who attempted the payment
    #[serde(rename = "userId")]
    pub user_id: UserId,
    /// Event the attempt was for
    #[serde(rename = "ticketId")]
    pub ticket_id: EventId,
    /// Gateway payment reference, or `"none"` when the gateway supplied none
    #[serde(rename = "paymentId")]
    pub payment_id: String,
    /// Total charged (or attempted), formatted with two decimals
    #[serde(rename = "totalAmount")]
    pub total_amount: String,
    /// Gateway identifier (e.g. `"razorpay"`)
    pub gateway: String,
    /// Attempt outcome
    pub status: TransactionStatus,
    /// Gateway order reference, on success
    #[serde(rename = "orderId", skip_serializing_if = "Option::is_none")]
    pub order_id: Option<String>,
    /// Gateway signature, on success
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    /// Gateway error description, on failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

// ============================================================================
// Ticket record
// ============================================================================

/// Suffix appended to a ticket id to name its QR image file
pub const QR_FILENAME_SUFFIX: &str = "_ticket_qr.png";

/// Suffix used in place of a real QR filename when rendering or upload fails
pub const QR_FALLBACK_SUFFIX: &str = "_ticket_qr_fallback";

/// An owned ticket, created only after payment success and the final
/// inventory re-validation.
///
/// Snapshot fields are copied from the event document at purchase time so
/// the ticket stays renderable if the event is later edited. The record is
/// mutated exactly once after creation, to attach the QR filename (or the
/// fallback marker) once the image upload settles.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketRecord {
    /// Owning buyer
    #[serde(rename = "userId")]
    pub user_id: UserId,
    /// Event the ticket admits to
    #[serde(rename = "eventId")]
    pub event_id: EventId,
    /// Event name at purchase time
    #[serde(rename = "eventName")]
    pub event_name: String,
    /// Event sub-name at purchase time
    #[serde(rename = "eventSub_name")]
    pub event_sub_name: String,
    /// Event date at purchase time
    #[serde(rename = "eventDate")]
    pub event_date: String,
    /// Event time at purchase time
    #[serde(rename = "eventTime")]
    pub event_time: String,
    /// Event location at purchase time
    #[serde(rename = "eventLocation")]
    pub event_location: String,
    /// Total paid including taxes and fees, two-decimal string
    #[serde(rename = "totalAmountPaid")]
    pub total_amount_paid: String,
    /// Poster image file id at purchase time
    #[serde(rename = "imageFileId")]
    pub image_file_id: String,
    /// Purchased category name
    pub category: String,
    /// Number of admissions, stored as a string like the rest of the collection
    pub quantity: String,
    /// QR image filename; provisional until the upload settles
    #[serde(rename = "qrCodeFileId")]
    pub qr_code_file_id: String,
    /// Per-unit price, two-decimal string
    #[serde(rename = "pricePerTicket")]
    pub price_per_ticket: String,
    /// Resale listing flag, always created `"false"`
    #[serde(rename = "isListedForSale")]
    pub is_listed_for_sale: String,
    /// Check-in flag, always created `"false"`
    #[serde(rename = "checkedIn")]
    pub checked_in: String,
}

// ============================================================================
// Order record
// ============================================================================

/// Durable receipt for a completed purchase, shown on the confirmation page
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRecord {
    /// Buyer who placed the order
    #[serde(rename = "userId")]
    pub user_id: UserId,
    /// Ticket record this order paid for
    #[serde(rename = "ticketId")]
    pub ticket_id: TicketId,
    /// Purchased category name (display form)
    #[serde(rename = "ticketName")]
    pub ticket_name: String,
    /// Event purchased
    #[serde(rename = "eventId")]
    pub event_id: EventId,
    /// This attempt's transaction id
    #[serde(rename = "transactionId")]
    pub transaction_id: TransactionId,
    /// Number of admissions, stored as a string
    pub quantity: String,
    /// Per-unit price, two-decimal string
    #[serde(rename = "singleTicketPrice")]
    pub single_ticket_price: String,
    /// Subtotal before taxes and fees, two-decimal string
    pub subtotal: String,
    /// GST portion, two-decimal string
    #[serde(rename = "taxGST")]
    pub tax_gst: String,
    /// Handling fee portion, two-decimal string
    #[serde(rename = "internetHandlingFee")]
    pub internet_handling_fee: String,
    /// Grand total, two-decimal string
    #[serde(rename = "totalAmount")]
    pub total_amount: String,
    /// Buyer's display name
    pub name: String,
    /// Purchased category name (raw form)
    #[serde(rename = "ticketCategory")]
    pub ticket_category: String,
    /// Always `"completed"`; failed attempts never produce an order
    #[serde(rename = "paymentStatus")]
    pub payment_status: String,
    /// Gateway payment reference
    #[serde(rename = "gatewayPaymentId")]
    pub gateway_payment_id: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn transaction_id_is_stamped_with_millis() {
        let now = Utc::now();
        let id = TransactionId::at(now);
        assert_eq!(id.as_str(), format!("TXN-{}", now.timestamp_millis()));
    }

    #[test]
    fn event_document_tolerates_missing_optional_fields() {
        let doc: EventDocument = serde_json::from_value(serde_json::json!({
            "name": "Warehouse Sessions"
        }))
        .unwrap();
        assert_eq!(doc.name, "Warehouse Sessions");
        assert!(doc.categories.is_empty());
        assert!(doc.phase.is_empty());
    }

    #[test]
    fn ticket_record_round_trips_wire_field_names() {
        let ticket = TicketRecord {
            user_id: UserId::new(),
            event_id: EventId::new(),
            event_name: "Warehouse Sessions".to_string(),
            event_sub_name: String::new(),
            event_date: "2026-09-01".to_string(),
            event_time: "20:00".to_string(),
            event_location: "Pier 70".to_string(),
            total_amount_paid: "1250.00".to_string(),
            image_file_id: "img-1".to_string(),
            category: "GA".to_string(),
            quantity: "2".to_string(),
            qr_code_file_id: "t_ticket_qr.png".to_string(),
            price_per_ticket: "500.00".to_string(),
            is_listed_for_sale: "false".to_string(),
            checked_in: "false".to_string(),
        };
        let value = serde_json::to_value(&ticket).unwrap();
        assert!(value.get("eventSub_name").is_some());
        assert!(value.get("qrCodeFileId").is_some());
        let back: TicketRecord = serde_json::from_value(value).unwrap();
        assert_eq!(back, ticket);
    }
}
