//! Payment gateway seam.
//!
//! The hosted gateway is a client-side script that opens a checkout UI and
//! later invokes either a success or a failure callback. That callback
//! pair is remodelled here as a single awaited [`CheckoutOutcome`]: the
//! coordinator suspends on `checkout` for however long the buyer takes and
//! resumes with exactly one tagged result, which keeps the protocol's
//! control flow linear without changing its ordering.
//!
//! The gateway offers no escrow or pre-commit. Once the success outcome
//! arrives the charge is final; everything the coordinator does afterwards
//! is reconciliation, not cancellation.

use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;

/// Gateway bootstrap and checkout errors
#[derive(Error, Debug, Clone)]
pub enum GatewayError {
    /// The gateway's client script failed to load
    #[error("payment gateway failed to load: {reason}")]
    ScriptLoad {
        /// Load failure description
        reason: String,
    },
}

/// Everything the hosted checkout UI needs to open
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutRequest {
    /// Amount in minor currency units
    pub amount_minor: u64,
    /// ISO currency code
    pub currency: String,
    /// Display name shown in the checkout UI
    pub display_name: String,
    /// Display description shown in the checkout UI
    pub description: String,
    /// Poster image file id, if any
    pub image_file_id: Option<String>,
    /// Prefilled buyer name
    pub buyer_name: String,
    /// Prefilled buyer email
    pub buyer_email: String,
    /// Prefilled buyer phone
    pub buyer_phone: String,
}

/// Payload of the gateway's success callback
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentConfirmation {
    /// Gateway payment reference
    pub payment_id: String,
    /// Gateway order reference, when the gateway created one
    pub order_id: Option<String>,
    /// Gateway signature over the payment, when provided
    pub signature: Option<String>,
}

/// Payload of the gateway's failure callback
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentFailure {
    /// Human-readable failure description from the gateway
    pub description: String,
    /// Payment reference from the failure metadata, when present
    pub payment_id: Option<String>,
}

/// Terminal result of one hosted checkout interaction
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CheckoutOutcome {
    /// The buyer completed payment; the charge is final
    Success(PaymentConfirmation),
    /// The gateway reported failure; nothing was charged
    Failure(PaymentFailure),
}

/// Payment gateway abstraction.
///
/// `load` models the asynchronous script bootstrap that must succeed
/// before any checkout UI can be shown; `checkout` suspends until the
/// externally-driven interaction completes.
pub trait PaymentGateway: Send + Sync {
    /// Loads the gateway client.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::ScriptLoad`] when the client cannot be
    /// fetched; no checkout may be opened after that.
    fn load(&self) -> Pin<Box<dyn Future<Output = Result<(), GatewayError>> + Send + '_>>;

    /// Opens the hosted checkout and waits for its terminal outcome.
    fn checkout(
        &self,
        request: CheckoutRequest,
    ) -> Pin<Box<dyn Future<Output = CheckoutOutcome> + Send + '_>>;
}

/// Scriptable mock gateway for tests and the demo binary.
///
/// Outcomes queued with [`MockPaymentGateway::push_outcome`] are returned
/// in order; with an empty queue every checkout succeeds with generated
/// references, mirroring a cooperative buyer.
#[derive(Clone, Debug, Default)]
pub struct MockPaymentGateway {
    outcomes: Arc<Mutex<VecDeque<CheckoutOutcome>>>,
    fail_load: Arc<AtomicBool>,
}

impl MockPaymentGateway {
    /// Creates a mock gateway that always succeeds
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an Arc-wrapped instance for sharing
    #[must_use]
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Queue the outcome for the next checkout
    #[allow(clippy::missing_panics_doc)] // mutex poisoning only
    pub fn push_outcome(&self, outcome: CheckoutOutcome) {
        #[allow(clippy::unwrap_used)]
        self.outcomes.lock().unwrap().push_back(outcome);
    }

    /// Queue a failure outcome with the given description
    pub fn push_failure(&self, description: &str) {
        self.push_outcome(CheckoutOutcome::Failure(PaymentFailure {
            description: description.to_string(),
            payment_id: None,
        }));
    }

    /// Make `load` fail, simulating an unreachable gateway script
    pub fn fail_load(&self) {
        self.fail_load.store(true, Ordering::SeqCst);
    }
}

impl PaymentGateway for MockPaymentGateway {
    fn load(&self) -> Pin<Box<dyn Future<Output = Result<(), GatewayError>> + Send + '_>> {
        let fail = self.fail_load.load(Ordering::SeqCst);
        Box::pin(async move {
            if fail {
                return Err(GatewayError::ScriptLoad {
                    reason: "mock gateway script unreachable".to_string(),
                });
            }
            Ok(())
        })
    }

    fn checkout(
        &self,
        request: CheckoutRequest,
    ) -> Pin<Box<dyn Future<Output = CheckoutOutcome> + Send + '_>> {
        #[allow(clippy::unwrap_used)]
        let scripted = self.outcomes.lock().unwrap().pop_front();
        Box::pin(async move {
            let outcome = scripted.unwrap_or_else(|| {
                CheckoutOutcome::Success(PaymentConfirmation {
                    payment_id: format!("mock_pay_{}", uuid::Uuid::new_v4()),
                    order_id: Some(format!("mock_order_{}", uuid::Uuid::new_v4())),
                    signature: None,
                })
            });
            tracing::info!(
                amount_minor = request.amount_minor,
                currency = %request.currency,
                success = matches!(outcome, CheckoutOutcome::Success(_)),
                "Mock checkout settled"
            );
            outcome
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn request() -> CheckoutRequest {
        CheckoutRequest {
            amount_minor: 125_000,
            currency: "INR".to_string(),
            display_name: "Warehouse Sessions".to_string(),
            description: "Booking for Warehouse Sessions".to_string(),
            image_file_id: None,
            buyer_name: "Asha".to_string(),
            buyer_email: String::new(),
            buyer_phone: String::new(),
        }
    }

    #[tokio::test]
    async fn default_checkout_succeeds_with_generated_references() {
        let gateway = MockPaymentGateway::new();
        gateway.load().await.unwrap();
        match gateway.checkout(request()).await {
            CheckoutOutcome::Success(confirmation) => {
                assert!(confirmation.payment_id.starts_with("mock_pay_"));
                assert!(confirmation.order_id.unwrap().starts_with("mock_order_"));
            }
            CheckoutOutcome::Failure(failure) => {
                unreachable!("unexpected failure: {}", failure.description)
            }
        }
    }

    #[tokio::test]
    async fn scripted_outcomes_are_returned_in_order() {
        let gateway = MockPaymentGateway::new();
        gateway.push_failure("card declined");
        match gateway.checkout(request()).await {
            CheckoutOutcome::Failure(failure) => {
                assert_eq!(failure.description, "card declined");
            }
            CheckoutOutcome::Success(_) => unreachable!("expected scripted failure"),
        }
        // Queue drained: back to default success.
        assert!(matches!(
            gateway.checkout(request()).await,
            CheckoutOutcome::Success(_)
        ));
    }

    #[tokio::test]
    async fn load_failure_blocks_checkout_bootstrap() {
        let gateway = MockPaymentGateway::new();
        gateway.fail_load();
        assert!(gateway.load().await.is_err());
    }
}
