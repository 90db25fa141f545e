//! Booking Engine Demo
//!
//! Simulated end-to-end checkout against in-memory collaborators:
//! - Happy path: lock → checkout → transaction/ticket/QR/order → release
//! - Payment failure: failed transaction recorded, lock released, no
//!   inventory change
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin demo
//! ```

use boxoffice::catalog::{TicketSelection, cheapest_option, purchasable_options};
use boxoffice::store::memory::{InMemoryDocumentStore, InMemoryFileStorage};
use boxoffice::{
    BookingConfig, BookingCoordinator, BookingError, BookingRequest, Buyer, EventDocument,
    EventId, FileStorage, MockPaymentGateway, UserId,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,boxoffice=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    println!("\n🎫 ============================================");
    println!("   Boxoffice Booking Engine - Live Demo");
    println!("============================================\n");

    let config = BookingConfig::from_env();
    let store = Arc::new(InMemoryDocumentStore::new());
    let storage = Arc::new(InMemoryFileStorage::new());
    let gateway = MockPaymentGateway::shared();

    let coordinator = BookingCoordinator::new(
        store.clone(),
        storage.clone(),
        gateway.clone(),
        config.clone(),
    );

    // Seed one event the way the hosted store holds it.
    let event_id = EventId::new();
    store.seed(
        &config.events_collection_id,
        &event_id.to_string(),
        serde_json::to_value(EventDocument {
            name: "Warehouse Sessions".to_string(),
            sub_name: "The Takeover Tour".to_string(),
            date: "2026-09-12".to_string(),
            time: "20:00".to_string(),
            location: "Pier 70, Mumbai".to_string(),
            image_file_id: "poster-01".to_string(),
            categories: vec![
                "VIP:5000:2:PhaseA".to_string(),
                "GA:1000:50".to_string(),
            ],
            phase: vec!["PhaseA:Early bird".to_string()],
        })?,
    );

    println!("📋 Demo Scenario: Warehouse Sessions");
    println!("   Categories: VIP (PhaseA, 2 left), GA (50 left)\n");

    // Step 1: page state. Load the event, pick the cheapest option.
    println!("1️⃣  Loading event and selecting tickets...");
    let (event, availability) = coordinator.load_event(event_id).await?;
    let options = purchasable_options(&event);
    let cheapest = cheapest_option(&options).ok_or("no purchasable categories")?;
    let mut selection = TicketSelection::new(cheapest.clone());
    selection.increment(); // 2 × GA
    println!(
        "   Selected {} × {} @ {:.2}\n",
        selection.quantity(),
        selection.option().category,
        selection.option().unit_price
    );

    let buyer = Buyer {
        id: UserId::new(),
        name: "Asha Verma".to_string(),
        email: Some("asha@example.com".to_string()),
        phone: None,
    };

    // Step 2: happy-path booking.
    println!("2️⃣  Booking (gateway will approve)...");
    let confirmation = coordinator
        .book(BookingRequest {
            event_id,
            event: event.clone(),
            availability: availability.clone(),
            buyer: Some(buyer.clone()),
            selection: Some(selection.clone()),
        })
        .await?;
    println!("   ✓ Order {}", confirmation.order_id);
    println!("   ✓ Ticket {}", confirmation.ticket_id);
    println!(
        "   ✓ Paid {:.2} ({} + GST {:.2} + fee {:.2})",
        confirmation.breakdown.total,
        confirmation.breakdown.subtotal,
        confirmation.breakdown.gst,
        confirmation.breakdown.handling_fee
    );
    let qr_url = storage
        .view_url(
            &config.qr_bucket_id,
            &format!("{}_ticket_qr.png", confirmation.ticket_id),
        )
        .await?;
    println!("   ✓ QR image at {qr_url}");
    println!(
        "   ✓ No lock left behind: {} lock documents\n",
        store.count(&config.lock_collection_id)
    );

    // Step 3: a declined payment.
    println!("3️⃣  Booking again (gateway will decline)...");
    gateway.push_failure("card declined by issuer");
    let (event, availability) = coordinator.load_event(event_id).await?;
    let options = purchasable_options(&event);
    let ga = options
        .iter()
        .find(|opt| opt.category == "GA")
        .ok_or("GA missing")?;
    let result = coordinator
        .book(BookingRequest {
            event_id,
            event,
            availability,
            buyer: Some(buyer),
            selection: Some(TicketSelection::new(ga.clone())),
        })
        .await;
    match result {
        Err(BookingError::PaymentFailed { description }) => {
            println!("   ✓ Declined as scripted: {description}");
        }
        other => println!("   ✗ Unexpected outcome: {other:?}"),
    }
    println!(
        "   ✓ Transactions recorded: {} (1 completed, 1 failed)",
        store.count(&config.transactions_collection_id)
    );
    println!(
        "   ✓ No lock left behind: {} lock documents",
        store.count(&config.lock_collection_id)
    );

    println!("\n✅ Demo complete");
    Ok(())
}
