//! Boxoffice - booking race control for a ticketing marketplace.
//!
//! This crate implements the checkout protocol of a ticketing
//! marketplace: acquiring a short-lived advisory lock on a ticket
//! category, re-validating inventory at multiple checkpoints around a
//! hosted payment, and reconciling lock, payment, and inventory state on
//! every success, failure, and crash path.
//!
//! # Architecture
//!
//! ```text
//!                    ┌─────────────────────┐
//!                    │ BookingCoordinator  │
//!                    │  (one attempt at a  │
//!                    │   time, stateless)  │
//!                    └──────────┬──────────┘
//!            ┌─────────────────┼──────────────────┐
//!            ▼                 ▼                  ▼
//!   ┌────────────────┐ ┌───────────────┐ ┌───────────────┐
//!   │ DocumentStore  │ │PaymentGateway │ │  FileStorage  │
//!   │ events / locks │ │hosted checkout│ │  QR images    │
//!   │ tickets/orders │ │one tagged     │ │               │
//!   │ transactions   │ │outcome        │ │               │
//!   └────────────────┘ └───────────────┘ └───────────────┘
//! ```
//!
//! # Protocol
//!
//! ```text
//! snapshot check → lock → gateway load → re-validate #1 → checkout
//!   ├─ success → re-validate #2 → transaction → decrement → ticket
//!   │            → QR (non-fatal) → order → release lock → confirm
//!   └─ failure → failed transaction → release lock → report
//! ```
//!
//! # Honest limits
//!
//! The hosted store offers no transactions, conditional writes, or
//! uniqueness constraints, so the guarantees here are bounded:
//!
//! - The lock is **advisory**. Two buyers can both create one for the
//!   same category; the re-validation checkpoints narrow the race but the
//!   window between the final check and the inventory decrement is
//!   unguarded. Oversell through it is an accepted, documented risk.
//! - Abandoned locks are never swept; the `expiresAt` field is advisory.
//! - The post-payment "will be refunded" path reports a refund this crate
//!   does not perform.
//!
//! A store with conditional decrement (decrement-if-≥N) or a real
//! distributed lock with server-enforced uniqueness and TTL would remove
//! all three limits.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod catalog;
pub mod config;
pub mod coordinator;
pub mod gateway;
pub mod pricing;
pub mod qr;
pub mod store;
pub mod types;

pub use catalog::{
    CategoryDescriptor, MAX_TICKETS_PER_ORDER, TicketOption, TicketSelection, cheapest_option,
    current_phase, purchasable_options,
};
pub use config::BookingConfig;
pub use coordinator::{
    BookingConfirmation, BookingCoordinator, BookingError, BookingRequest, EventSummary,
};
pub use gateway::{
    CheckoutOutcome, CheckoutRequest, MockPaymentGateway, PaymentConfirmation, PaymentFailure,
    PaymentGateway,
};
pub use pricing::PriceBreakdown;
pub use store::{DocumentStore, FileStorage, StorageError, StoreError};
pub use types::*;
