//! Contention behavior around the advisory lock.
//!
//! The lock collection carries no uniqueness constraint, so two attempts
//! can hold "the" lock for the same event at once. These tests pin down
//! what the protocol actually guarantees under contention (the
//! re-validation checkpoints stop the double sale before payment) and
//! what it deliberately does not (lock exclusivity).
//!
//! Run with: `cargo test --test oversell_test`

#![allow(clippy::expect_used)]
#![allow(clippy::unwrap_used)]

use boxoffice::catalog::{TicketSelection, purchasable_options};
use boxoffice::gateway::{CheckoutOutcome, CheckoutRequest, GatewayError, PaymentConfirmation};
use boxoffice::store::memory::{InMemoryDocumentStore, InMemoryFileStorage};
use boxoffice::{
    BookingConfig, BookingCoordinator, BookingError, BookingRequest, Buyer, EventDocument,
    EventId, LockDocument, MockPaymentGateway, PaymentGateway, UserId,
};
use chrono::{Duration, Utc};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

fn test_config() -> BookingConfig {
    BookingConfig {
        database_id: "test".to_string(),
        events_collection_id: "events".to_string(),
        lock_collection_id: "locks".to_string(),
        tickets_collection_id: "tickets".to_string(),
        orders_collection_id: "orders".to_string(),
        transactions_collection_id: "transactions".to_string(),
        qr_bucket_id: "qrs".to_string(),
        gateway_name: "razorpay".to_string(),
        currency: "INR".to_string(),
    }
}

fn seed_event(store: &InMemoryDocumentStore, config: &BookingConfig, event_id: EventId, ga: u32) {
    let event = EventDocument {
        name: "Warehouse Sessions".to_string(),
        sub_name: String::new(),
        date: "2026-09-12".to_string(),
        time: "20:00".to_string(),
        location: "Pier 70".to_string(),
        image_file_id: String::new(),
        categories: vec![format!("GA:1000:{ga}")],
        phase: vec![],
    };
    store.seed(
        &config.events_collection_id,
        &event_id.to_string(),
        serde_json::to_value(event).unwrap(),
    );
}

fn buyer(name: &str) -> Buyer {
    Buyer {
        id: UserId::new(),
        name: name.to_string(),
        email: None,
        phone: None,
    }
}

async fn ga_request(
    coordinator: &BookingCoordinator,
    event_id: EventId,
    who: &str,
) -> BookingRequest {
    let (event, availability) = coordinator.load_event(event_id).await.unwrap();
    let option = purchasable_options(&event)
        .into_iter()
        .find(|opt| opt.category == "GA")
        .expect("GA purchasable");
    BookingRequest {
        event_id,
        event,
        availability,
        buyer: Some(buyer(who)),
        selection: Some(TicketSelection::new(option)),
    }
}

/// Gateway that records how many lock documents exist at checkout time.
struct LockCountingGateway {
    store: Arc<InMemoryDocumentStore>,
    lock_collection: String,
    observed: AtomicUsize,
}

impl PaymentGateway for LockCountingGateway {
    fn load(&self) -> Pin<Box<dyn Future<Output = Result<(), GatewayError>> + Send + '_>> {
        Box::pin(async { Ok(()) })
    }

    fn checkout(
        &self,
        _request: CheckoutRequest,
    ) -> Pin<Box<dyn Future<Output = CheckoutOutcome> + Send + '_>> {
        Box::pin(async move {
            self.observed
                .store(self.store.count(&self.lock_collection), Ordering::SeqCst);
            CheckoutOutcome::Success(PaymentConfirmation {
                payment_id: "pay_counted".to_string(),
                order_id: None,
                signature: None,
            })
        })
    }
}

#[tokio::test]
async fn last_ticket_goes_to_exactly_one_of_two_buyers() {
    let config = test_config();
    let store = Arc::new(InMemoryDocumentStore::new());
    let event_id = EventId::new();
    seed_event(&store, &config, event_id, 1);

    let coordinator = BookingCoordinator::new(
        store.clone(),
        Arc::new(InMemoryFileStorage::new()),
        MockPaymentGateway::shared(),
        config.clone(),
    );

    // Both buyers loaded the page while one ticket remained, so both
    // snapshots pass the sold-out check.
    let first = ga_request(&coordinator, event_id, "Asha Verma").await;
    let second = ga_request(&coordinator, event_id, "Ravi Nair").await;
    assert_eq!(first.availability.get("GA"), Some(&1));
    assert_eq!(second.availability.get("GA"), Some(&1));

    coordinator.book(first).await.expect("first buyer wins");

    // The loser is stopped by pre-payment re-validation, not the lock,
    // and is never charged.
    let err = coordinator.book(second).await.unwrap_err();
    match err {
        BookingError::InsufficientAvailability {
            requested,
            available,
        } => {
            assert_eq!(requested, 1);
            assert_eq!(available, 0);
        }
        other => unreachable!("expected InsufficientAvailability, got {other:?}"),
    }

    assert_eq!(store.count(&config.tickets_collection_id), 1);
    assert_eq!(store.count(&config.orders_collection_id), 1);
    assert_eq!(store.count(&config.transactions_collection_id), 1);
    assert_eq!(store.count(&config.lock_collection_id), 0);
}

#[tokio::test]
async fn lock_is_advisory_and_does_not_exclude_a_rival_holder() {
    let config = test_config();
    let store = Arc::new(InMemoryDocumentStore::new());
    let event_id = EventId::new();
    seed_event(&store, &config, event_id, 5);

    // A rival attempt already holds a lock for this event.
    let rival_lock = LockDocument {
        ticket_id: event_id,
        expires_at: Utc::now() + Duration::minutes(5),
    };
    store.seed(
        &config.lock_collection_id,
        "rival-lock",
        serde_json::to_value(&rival_lock).unwrap(),
    );

    let gateway = Arc::new(LockCountingGateway {
        store: store.clone(),
        lock_collection: config.lock_collection_id.clone(),
        observed: AtomicUsize::new(0),
    });
    let coordinator = BookingCoordinator::new(
        store.clone(),
        Arc::new(InMemoryFileStorage::new()),
        gateway.clone(),
        config.clone(),
    );

    let request = ga_request(&coordinator, event_id, "Asha Verma").await;
    coordinator
        .book(request)
        .await
        .expect("rival lock does not block this attempt");

    // Both locks coexisted while this attempt was at checkout.
    assert_eq!(gateway.observed.load(Ordering::SeqCst), 2);
    // Release deletes only this attempt's lock; the rival's remains.
    assert_eq!(store.count(&config.lock_collection_id), 1);
    assert!(store.contains(&config.lock_collection_id, "rival-lock"));
}
