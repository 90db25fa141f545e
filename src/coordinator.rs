//! The booking-race-control protocol.
//!
//! [`BookingCoordinator`] drives one buyer's checkout attempt for one
//! ticket category from intent to terminal state:
//!
//! 1. Snapshot check against the cached availability
//! 2. Advisory lock creation (no retry on contention)
//! 3. Gateway bootstrap
//! 4. Re-validation against a fresh event read, pre-payment
//! 5. Hosted checkout
//! 6. On success: re-validate again, record the transaction, decrement
//!    inventory, create the ticket, attach its QR image, create the
//!    order, release the lock
//! 7. On failure: record the failed transaction, release the lock
//!
//! Every exit path releases the lock best-effort; no terminal transition
//! may leave it behind. The protocol is honest about what the store can
//! and cannot give it: the lock is advisory (two buyers can both create
//! one), the inventory decrement is an unconditional overwrite, and the
//! window between the final re-validation and that decrement is
//! unguarded. Oversell through that window is an accepted, documented
//! risk, not a bug this module claims to prevent.
//!
//! Once the gateway confirms a charge the money is gone; from then on the
//! coordinator never rolls back. A failure while writing the paid
//! buyer's records surfaces as "completed but confirmation failed" rather
//! than denying the purchase.

use crate::catalog::{TicketSelection, availability_by_category};
use crate::config::BookingConfig;
use crate::gateway::{
    CheckoutOutcome, CheckoutRequest, GatewayError, PaymentConfirmation, PaymentFailure,
    PaymentGateway,
};
use crate::pricing::{PriceBreakdown, format_amount};
use crate::qr::render_ticket_qr;
use crate::store::{DocumentStore, FileStorage, StoreError};
use crate::types::{
    Buyer, EventDocument, EventId, LockDocument, LockId, OrderId, OrderRecord, QR_FALLBACK_SUFFIX,
    QR_FILENAME_SUFFIX, TicketId, TicketRecord, TransactionId, TransactionRecord,
    TransactionStatus,
};
use chrono::{Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

/// Advisory lock lifetime; recorded on the lock document but enforced by
/// nothing
const LOCK_TTL_MINUTES: i64 = 5;

/// Terminal failures of one checkout attempt.
///
/// Each variant maps to one user-visible blocking notice; none of them is
/// retried automatically.
#[derive(Error, Debug)]
pub enum BookingError {
    /// No ticket category was selected
    #[error("select a ticket category before booking")]
    NoSelection,

    /// The buyer is not signed in; checkout must resume at `redirect_to`
    /// after authentication
    #[error("sign in to book tickets")]
    NotAuthenticated {
        /// Destination to return to after authentication
        redirect_to: String,
    },

    /// The cached snapshot shows no remaining tickets
    #[error("this ticket is sold out")]
    SoldOut,

    /// The lock document could not be created; another buyer is likely
    /// mid-checkout on this category
    #[error("this ticket is currently being processed by another user, try again shortly")]
    LockContention(#[source] StoreError),

    /// The gateway client failed to load; nothing was charged
    #[error(transparent)]
    GatewayUnavailable(#[from] GatewayError),

    /// A fresh read showed fewer tickets than requested, before payment
    #[error("only {available} tickets remain, try a smaller quantity")]
    InsufficientAvailability {
        /// Quantity the buyer asked for
        requested: u32,
        /// Quantity the fresh read showed
        available: u32,
    },

    /// The gateway reported payment failure; nothing was charged
    #[error("payment failed: {description}")]
    PaymentFailed {
        /// Gateway's failure description
        description: String,
    },

    /// Inventory ran out between payment and reconciliation. The charge
    /// already settled and this crate triggers no refund; the reported
    /// refund is an operational obligation, not an implemented one.
    #[error("tickets are no longer available; your payment will be refunded")]
    RefundRequired {
        /// The settled payment that now needs manual reconciliation
        payment_id: String,
    },

    /// A write failed after the charge settled. The booking may have
    /// partially persisted; the buyer is told to check their orders. The
    /// paid purchase is never rolled back.
    #[error("booking completed but there was an issue with confirmation, check your orders")]
    ConfirmationIncomplete {
        /// The settled payment
        payment_id: String,
        /// The write that failed
        #[source]
        source: StoreError,
    },

    /// A store failure before any charge was attempted
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// One checkout attempt's inputs, captured at the moment the buyer
/// presses "book".
///
/// `event` and `availability` are the page-render snapshot: the protocol
/// starts from cached data and re-validates against the store twice
/// before committing anything.
#[derive(Clone, Debug)]
pub struct BookingRequest {
    /// Event being booked
    pub event_id: EventId,
    /// Event document as rendered
    pub event: EventDocument,
    /// Availability snapshot keyed by category name
    pub availability: HashMap<String, u32>,
    /// Authenticated buyer, or `None` when signed out
    pub buyer: Option<Buyer>,
    /// Selected category and quantity, or `None` when nothing is selected
    pub selection: Option<TicketSelection>,
}

/// Event fields carried onto the confirmation view
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EventSummary {
    /// Event name
    pub name: String,
    /// Secondary title line
    pub sub_name: String,
    /// Display date
    pub date: String,
    /// Display time
    pub time: String,
    /// Venue / location line
    pub location: String,
    /// Poster image file id
    pub image_file_id: String,
}

impl From<&EventDocument> for EventSummary {
    fn from(event: &EventDocument) -> Self {
        Self {
            name: event.name.clone(),
            sub_name: event.sub_name.clone(),
            date: event.date.clone(),
            time: event.time.clone(),
            location: event.location.clone(),
            image_file_id: event.image_file_id.clone(),
        }
    }
}

/// Terminal success of one checkout attempt, carrying everything the
/// confirmation view renders
#[derive(Clone, Debug)]
pub struct BookingConfirmation {
    /// Created order record id
    pub order_id: OrderId,
    /// Created ticket record id
    pub ticket_id: TicketId,
    /// This attempt's transaction id
    pub transaction_id: TransactionId,
    /// Gateway payment reference
    pub payment_id: String,
    /// Buyer's display name
    pub buyer_name: String,
    /// Purchased category
    pub category: String,
    /// Number of admissions
    pub quantity: u32,
    /// Per-unit price
    pub unit_price: f64,
    /// Itemized totals
    pub breakdown: PriceBreakdown,
    /// Event snapshot for display
    pub event: EventSummary,
}

/// Orchestrates checkout attempts against the external collaborators.
///
/// Holds no state of its own between attempts; all durable state lives in
/// the document store.
pub struct BookingCoordinator {
    store: Arc<dyn DocumentStore>,
    storage: Arc<dyn FileStorage>,
    gateway: Arc<dyn PaymentGateway>,
    config: BookingConfig,
}

impl BookingCoordinator {
    /// Creates a coordinator over the given collaborators
    #[must_use]
    pub fn new(
        store: Arc<dyn DocumentStore>,
        storage: Arc<dyn FileStorage>,
        gateway: Arc<dyn PaymentGateway>,
        config: BookingConfig,
    ) -> Self {
        Self {
            store,
            storage,
            gateway,
            config,
        }
    }

    /// Loads an event document and its availability snapshot, the state a
    /// details page renders from and a [`BookingRequest`] starts from.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::Store`] when the event cannot be read.
    pub async fn load_event(
        &self,
        event_id: EventId,
    ) -> Result<(EventDocument, HashMap<String, u32>), BookingError> {
        let event = self.fetch_event(event_id).await?;
        let availability = availability_by_category(&event.categories);
        Ok((event, availability))
    }

    /// Drives one checkout attempt to a terminal state.
    ///
    /// # Errors
    ///
    /// Returns a [`BookingError`] naming the terminal failure; on every
    /// failure path any lock created by this attempt has been released
    /// best-effort.
    pub async fn book(&self, request: BookingRequest) -> Result<BookingConfirmation, BookingError> {
        let selection = request.selection.ok_or(BookingError::NoSelection)?;
        let buyer = request.buyer.ok_or_else(|| BookingError::NotAuthenticated {
            redirect_to: format!("/events/{}", request.event_id),
        })?;

        let category = selection.option().category.clone();
        let quantity = selection.quantity();
        let unit_price = selection.option().unit_price;
        let breakdown = PriceBreakdown::compute(unit_price, quantity);

        // Stage 1: snapshot check against cached availability.
        let cached = request
            .availability
            .get(&category)
            .copied()
            .unwrap_or_default();
        if cached == 0 {
            return Err(BookingError::SoldOut);
        }

        // Stage 2: advisory lock. One attempt, no retry; the store does
        // not enforce uniqueness per category, so this is cooperative
        // serialization only.
        let lock_id = LockId::new();
        let lock = LockDocument {
            ticket_id: request.event_id,
            expires_at: Utc::now() + Duration::minutes(LOCK_TTL_MINUTES),
        };
        self.store
            .create_document(
                &self.config.lock_collection_id,
                &lock_id.to_string(),
                serde_json::to_value(&lock).map_err(StoreError::from)?,
            )
            .await
            .map_err(BookingError::LockContention)?;
        tracing::info!(
            %lock_id,
            event_id = %request.event_id,
            %category,
            quantity,
            "Advisory lock acquired"
        );

        // Stage 3: gateway bootstrap.
        if let Err(err) = self.gateway.load().await {
            tracing::warn!(%lock_id, error = %err, "Gateway load failed, aborting before checkout");
            self.release_lock(lock_id).await;
            return Err(BookingError::GatewayUnavailable(err));
        }

        // Stage 4: re-validation #1, post-lock pre-payment. Tickets may
        // have been sold between the snapshot and the lock.
        let live = match self.live_availability(request.event_id, &category).await {
            Ok(live) => live,
            Err(err) => {
                self.release_lock(lock_id).await;
                return Err(BookingError::Store(err));
            }
        };
        if live < quantity {
            tracing::info!(
                %lock_id,
                %category,
                requested = quantity,
                available = live,
                "Pre-payment re-validation failed"
            );
            self.release_lock(lock_id).await;
            return Err(BookingError::InsufficientAvailability {
                requested: quantity,
                available: live,
            });
        }

        // Stage 5: hosted checkout. Suspends for arbitrary buyer time;
        // the gateway alone decides whether the charge succeeds.
        let outcome = self
            .gateway
            .checkout(CheckoutRequest {
                amount_minor: breakdown.total_minor_units(),
                currency: self.config.currency.clone(),
                display_name: request.event.name.clone(),
                description: format!("Booking for {}", request.event.name),
                image_file_id: (!request.event.image_file_id.is_empty())
                    .then(|| request.event.image_file_id.clone()),
                buyer_name: buyer.name.clone(),
                buyer_email: buyer.email.clone().unwrap_or_default(),
                buyer_phone: buyer.phone.clone().unwrap_or_default(),
            })
            .await;

        match outcome {
            CheckoutOutcome::Success(confirmation) => {
                self.settle_success(
                    request.event_id,
                    &request.event,
                    &buyer,
                    &category,
                    quantity,
                    unit_price,
                    breakdown,
                    confirmation,
                    lock_id,
                )
                .await
            }
            CheckoutOutcome::Failure(failure) => {
                self.settle_failure(request.event_id, &buyer, &breakdown, &failure)
                    .await;
                self.release_lock(lock_id).await;
                Err(BookingError::PaymentFailed {
                    description: failure.description,
                })
            }
        }
    }

    /// Stage 6: the charge settled; reconcile inventory, records, and the
    /// lock. Nothing in here may undo the payment.
    #[allow(clippy::too_many_arguments, clippy::too_many_lines)]
    async fn settle_success(
        &self,
        event_id: EventId,
        event: &EventDocument,
        buyer: &Buyer,
        category: &str,
        quantity: u32,
        unit_price: f64,
        breakdown: PriceBreakdown,
        confirmation: PaymentConfirmation,
        lock_id: LockId,
    ) -> Result<BookingConfirmation, BookingError> {
        let payment_id = confirmation.payment_id.clone();

        // Stage 6a: re-validation #2. A concurrent buyer may have drained
        // the category while the checkout UI was open.
        let live = match self.live_availability(event_id, category).await {
            Ok(live) => live,
            Err(err) => return Err(self.fail_after_payment(lock_id, payment_id, err).await),
        };
        if live < quantity {
            tracing::error!(
                %payment_id,
                %category,
                requested = quantity,
                available = live,
                "Inventory drained after settled payment, refund required"
            );
            self.release_lock(lock_id).await;
            return Err(BookingError::RefundRequired { payment_id });
        }

        // Stage 6b: append the successful transaction. From here on any
        // failure is reported as incomplete confirmation, never rollback.
        let transaction_id = TransactionId::at(Utc::now());
        let transaction = TransactionRecord {
            user_id: buyer.id,
            ticket_id: event_id,
            payment_id: payment_id.clone(),
            total_amount: format_amount(breakdown.total),
            gateway: self.config.gateway_name.clone(),
            status: TransactionStatus::Completed,
            order_id: confirmation.order_id.clone(),
            signature: confirmation.signature.clone(),
            error: None,
        };
        if let Err(err) = self
            .create_record(
                &self.config.transactions_collection_id,
                transaction_id.as_str(),
                &transaction,
            )
            .await
        {
            return Err(self.fail_after_payment(lock_id, payment_id, err).await);
        }

        // Stage 6c: decrement inventory. Unconditional overwrite; the
        // window since 6a is unguarded, so a concurrent settled buyer can
        // still push the count past zero. Accepted oversell risk.
        if let Err(err) = self.decrement_category(event_id, category, quantity).await {
            return Err(self.fail_after_payment(lock_id, payment_id, err).await);
        }

        // Stage 6d: create the ticket with its provisional QR filename.
        let ticket_id = TicketId::new();
        let qr_filename = format!("{ticket_id}{QR_FILENAME_SUFFIX}");
        let ticket = TicketRecord {
            user_id: buyer.id,
            event_id,
            event_name: event.name.clone(),
            event_sub_name: event.sub_name.clone(),
            event_date: event.date.clone(),
            event_time: event.time.clone(),
            event_location: event.location.clone(),
            total_amount_paid: format_amount(breakdown.total),
            image_file_id: event.image_file_id.clone(),
            category: category.to_string(),
            quantity: quantity.to_string(),
            qr_code_file_id: qr_filename.clone(),
            price_per_ticket: format_amount(unit_price),
            is_listed_for_sale: "false".to_string(),
            checked_in: "false".to_string(),
        };
        if let Err(err) = self
            .create_record(
                &self.config.tickets_collection_id,
                &ticket_id.to_string(),
                &ticket,
            )
            .await
        {
            return Err(self.fail_after_payment(lock_id, payment_id, err).await);
        }

        // Stage 6e: QR image. Non-fatal end to end; ownership is already
        // committed, so any failure patches the fallback marker instead.
        if let Err(err) = self.attach_qr(ticket_id, &qr_filename).await {
            return Err(self.fail_after_payment(lock_id, payment_id, err).await);
        }

        // Stage 6f: order record, the durable receipt.
        let order_id = OrderId::new();
        let order = OrderRecord {
            user_id: buyer.id,
            ticket_id,
            ticket_name: category.to_string(),
            event_id,
            transaction_id: transaction_id.clone(),
            quantity: quantity.to_string(),
            single_ticket_price: format_amount(unit_price),
            subtotal: format_amount(breakdown.subtotal),
            tax_gst: format_amount(breakdown.gst),
            internet_handling_fee: format_amount(breakdown.handling_fee),
            total_amount: format_amount(breakdown.total),
            name: buyer.name.clone(),
            ticket_category: category.to_string(),
            payment_status: "completed".to_string(),
            gateway_payment_id: payment_id.clone(),
        };
        if let Err(err) = self
            .create_record(
                &self.config.orders_collection_id,
                &order_id.to_string(),
                &order,
            )
            .await
        {
            return Err(self.fail_after_payment(lock_id, payment_id, err).await);
        }

        // Stage 6g: terminal success, lock released.
        self.release_lock(lock_id).await;
        tracing::info!(
            %order_id,
            %ticket_id,
            %payment_id,
            %category,
            quantity,
            total = breakdown.total,
            "Booking completed"
        );

        Ok(BookingConfirmation {
            order_id,
            ticket_id,
            transaction_id,
            payment_id,
            buyer_name: buyer.name.clone(),
            category: category.to_string(),
            quantity,
            unit_price,
            breakdown,
            event: EventSummary::from(event),
        })
    }

    /// Stage 7: record the failed attempt. Recording is itself
    /// best-effort; a store failure here is logged, not surfaced over the
    /// gateway's own error.
    async fn settle_failure(
        &self,
        event_id: EventId,
        buyer: &Buyer,
        breakdown: &PriceBreakdown,
        failure: &PaymentFailure,
    ) {
        let transaction_id = TransactionId::at(Utc::now());
        let transaction = TransactionRecord {
            user_id: buyer.id,
            ticket_id: event_id,
            payment_id: failure
                .payment_id
                .clone()
                .unwrap_or_else(|| "none".to_string()),
            total_amount: format_amount(breakdown.total),
            gateway: self.config.gateway_name.clone(),
            status: TransactionStatus::Failed,
            order_id: None,
            signature: None,
            error: Some(failure.description.clone()),
        };
        if let Err(err) = self
            .create_record(
                &self.config.transactions_collection_id,
                transaction_id.as_str(),
                &transaction,
            )
            .await
        {
            tracing::error!(%transaction_id, error = %err, "Failed to record failed transaction");
        }
    }

    /// Renders the ticket's QR PNG, uploads it, and patches the ticket
    /// with the final filename; on any QR failure patches the fallback
    /// marker instead.
    ///
    /// Only a failure of the patch itself propagates: the ticket must not
    /// be left pointing at a file that was never uploaded.
    async fn attach_qr(&self, ticket_id: TicketId, qr_filename: &str) -> Result<(), StoreError> {
        let uploaded = match render_ticket_qr(ticket_id) {
            Ok(png) => {
                match self
                    .storage
                    .upload(&self.config.qr_bucket_id, qr_filename, png)
                    .await
                {
                    Ok(()) => true,
                    Err(err) => {
                        tracing::error!(%ticket_id, error = %err, "QR upload failed");
                        false
                    }
                }
            }
            Err(err) => {
                tracing::error!(%ticket_id, error = %err, "QR rendering failed");
                false
            }
        };
        let final_filename = if uploaded {
            qr_filename.to_string()
        } else {
            format!("{ticket_id}{QR_FALLBACK_SUFFIX}")
        };
        self.store
            .update_document(
                &self.config.tickets_collection_id,
                &ticket_id.to_string(),
                serde_json::json!({ "qrCodeFileId": final_filename }),
            )
            .await
    }

    /// Re-reads the event and recomputes the category's availability.
    async fn live_availability(
        &self,
        event_id: EventId,
        category: &str,
    ) -> Result<u32, StoreError> {
        let event = self.fetch_event(event_id).await?;
        Ok(availability_by_category(&event.categories)
            .get(category)
            .copied()
            .unwrap_or_default())
    }

    /// Rewrites the event's category string with the quantity reduced.
    ///
    /// Plain read-modify-write: there is no compare-and-swap against a
    /// version token, and concurrent writers can lose updates. The
    /// advisory lock is the only thing standing between this write and a
    /// lost update.
    async fn decrement_category(
        &self,
        event_id: EventId,
        category: &str,
        quantity: u32,
    ) -> Result<(), StoreError> {
        let event = self.fetch_event(event_id).await?;
        let categories: Vec<String> = event
            .categories
            .iter()
            .map(|raw| {
                let mut parts: Vec<String> =
                    raw.split(':').map(|part| part.trim().to_string()).collect();
                if parts.len() >= 3 && parts[0] == category {
                    let remaining: u32 = parts[2].parse().unwrap_or_default();
                    parts[2] = remaining.saturating_sub(quantity).to_string();
                    parts.join(":")
                } else {
                    raw.clone()
                }
            })
            .collect();
        self.store
            .update_document(
                &self.config.events_collection_id,
                &event_id.to_string(),
                serde_json::json!({ "categories": categories }),
            )
            .await
    }

    async fn fetch_event(&self, event_id: EventId) -> Result<EventDocument, StoreError> {
        let value = self
            .store
            .get_document(&self.config.events_collection_id, &event_id.to_string())
            .await?;
        Ok(serde_json::from_value(value)?)
    }

    async fn create_record<T: serde::Serialize>(
        &self,
        collection: &str,
        document_id: &str,
        record: &T,
    ) -> Result<(), StoreError> {
        self.store
            .create_document(collection, document_id, serde_json::to_value(record)?)
            .await
    }

    /// Best-effort lock release, used on every terminal transition.
    /// Deletion failures are logged and swallowed; there is nothing
    /// better to do with them at this point.
    async fn release_lock(&self, lock_id: LockId) {
        if let Err(err) = self
            .store
            .delete_document(&self.config.lock_collection_id, &lock_id.to_string())
            .await
        {
            tracing::error!(%lock_id, error = %err, "Failed to delete lock");
        }
    }

    /// Post-payment write failure: release the lock and report the paid
    /// booking as incomplete rather than rolling anything back.
    async fn fail_after_payment(
        &self,
        lock_id: LockId,
        payment_id: String,
        source: StoreError,
    ) -> BookingError {
        tracing::error!(%payment_id, error = %source, "Post-payment processing failed");
        self.release_lock(lock_id).await;
        BookingError::ConfirmationIncomplete { payment_id, source }
    }
}
