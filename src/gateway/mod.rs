//! Payment processor boundary.
//!
//! [`PaymentGateway`] is the seam between the reconciliation core and the
//! hosted checkout provider. [`stripe::StripeGateway`] talks to the real API;
//! tests substitute their own implementation.

pub mod signature;
pub mod stripe;

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::AppError;

/// Minor units per display unit for a two-decimal currency.
pub const MINOR_UNITS: i64 = 100;

pub type GatewayFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, AppError>> + Send + 'a>>;

/// Metadata attached to every checkout session and echoed back on confirmation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionMetadata {
    pub contract_id: Uuid,
    pub milestone_label: String,
    pub payer_id: Uuid,
    pub receiver_id: Uuid,
}

/// Outbound request for a new hosted checkout session.
#[derive(Debug, Clone)]
pub struct NewCheckoutSession {
    pub amount_minor: i64,
    pub metadata: SessionMetadata,
}

/// A created checkout session: where to send the payer.
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutSession {
    pub session_id: String,
    pub url: String,
}

/// A checkout session as reported back by the gateway.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewaySession {
    pub id: String,
    pub payment_status: String,
    pub amount_total: Option<i64>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl GatewaySession {
    pub fn is_paid(&self) -> bool {
        self.payment_status == "paid"
    }

    /// Turn a paid session into the input of reconciliation.
    pub fn confirmed(&self) -> Result<ConfirmedPayment, AppError> {
        if !self.is_paid() {
            return Err(AppError::InvalidState(format!(
                "Checkout session {} is not paid (status: {})",
                self.id, self.payment_status
            )));
        }

        let metadata_value = serde_json::to_value(&self.metadata)
            .map_err(|e| AppError::Internal(format!("Failed to read session metadata: {e}")))?;
        let metadata: SessionMetadata = serde_json::from_value(metadata_value).map_err(|e| {
            AppError::Validation(format!(
                "Checkout session {} has invalid metadata: {e}",
                self.id
            ))
        })?;

        let amount_minor = self.amount_total.ok_or_else(|| {
            AppError::Validation(format!("Checkout session {} has no amount", self.id))
        })?;

        Ok(ConfirmedPayment {
            session_id: self.id.clone(),
            amount: from_minor_units(amount_minor)?,
            metadata,
        })
    }
}

/// A gateway-confirmed payment, in display units. This is what gets
/// reconciled and what a pending marker stores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmedPayment {
    pub session_id: String,
    pub amount: i64,
    pub metadata: SessionMetadata,
}

/// A verified webhook event.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: WebhookEventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct WebhookEventData {
    pub object: serde_json::Value,
}

impl WebhookEvent {
    /// Event types that confirm a checkout payment.
    pub const CONFIRMING_TYPES: [&'static str; 2] = [
        "checkout.session.completed",
        "checkout.session.async_payment_succeeded",
    ];

    /// The paid checkout session carried by this event, if it confirms a payment.
    pub fn paid_session(&self) -> Result<Option<GatewaySession>, AppError> {
        if !Self::CONFIRMING_TYPES.contains(&self.event_type.as_str()) {
            return Ok(None);
        }

        let session: GatewaySession = serde_json::from_value(self.data.object.clone())
            .map_err(|e| {
                AppError::Validation(format!(
                    "Malformed checkout session in event {}: {e}",
                    self.id
                ))
            })?;

        Ok(session.is_paid().then_some(session))
    }
}

pub trait PaymentGateway: Send + Sync {
    /// Create a hosted checkout session and return its redirect URL.
    fn create_checkout_session<'a>(
        &'a self,
        request: &'a NewCheckoutSession,
    ) -> GatewayFuture<'a, CheckoutSession>;

    /// Fetch a checkout session's current state.
    fn retrieve_session<'a>(&'a self, session_id: &'a str) -> GatewayFuture<'a, GatewaySession>;
}

/// Checkout session ids are opaque `[A-Za-z0-9_]` tokens; anything else is
/// refused before it reaches a request path.
pub fn validate_session_id(session_id: &str) -> Result<(), AppError> {
    let well_formed = !session_id.is_empty()
        && session_id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_');
    if !well_formed {
        return Err(AppError::Validation(format!(
            "Malformed checkout session id: {session_id:?}"
        )));
    }
    Ok(())
}

/// Display units to gateway minor units.
pub fn to_minor_units(amount: i64) -> Result<i64, AppError> {
    amount
        .checked_mul(MINOR_UNITS)
        .ok_or_else(|| AppError::Validation(format!("Amount {amount} is too large")))
}

/// Gateway minor units back to display units.
pub fn from_minor_units(amount_minor: i64) -> Result<i64, AppError> {
    if amount_minor <= 0 || amount_minor % MINOR_UNITS != 0 {
        return Err(AppError::Validation(format!(
            "Gateway amount {amount_minor} is not a positive whole amount"
        )));
    }
    Ok(amount_minor / MINOR_UNITS)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata_map(contract_id: Uuid, payer: Uuid, receiver: Uuid) -> HashMap<String, String> {
        HashMap::from([
            ("contractId".to_string(), contract_id.to_string()),
            ("milestoneLabel".to_string(), "Design mockup".to_string()),
            ("payerId".to_string(), payer.to_string()),
            ("receiverId".to_string(), receiver.to_string()),
        ])
    }

    #[test]
    fn minor_unit_conversion() {
        assert_eq!(to_minor_units(5000).unwrap(), 500_000);
        assert_eq!(from_minor_units(500_000).unwrap(), 5000);
        assert!(from_minor_units(500_050).is_err());
        assert!(from_minor_units(0).is_err());
        assert!(to_minor_units(i64::MAX).is_err());
    }

    #[test]
    fn session_ids_must_be_plain_tokens() {
        assert!(validate_session_id("cs_test_a1B2c3").is_ok());
        for bad in ["", "../v1/customers", "cs_test?expand=x", "cs test", "cs%2F1", "cs_é"] {
            assert!(
                matches!(validate_session_id(bad), Err(AppError::Validation(_))),
                "{bad}"
            );
        }
    }

    #[test]
    fn paid_session_converts_to_confirmation() {
        let (contract_id, payer, receiver) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let session = GatewaySession {
            id: "sess_1".to_string(),
            payment_status: "paid".to_string(),
            amount_total: Some(500_000),
            metadata: metadata_map(contract_id, payer, receiver),
        };

        let confirmed = session.confirmed().unwrap();
        assert_eq!(confirmed.session_id, "sess_1");
        assert_eq!(confirmed.amount, 5000);
        assert_eq!(confirmed.metadata.contract_id, contract_id);
        assert_eq!(confirmed.metadata.payer_id, payer);
        assert_eq!(confirmed.metadata.receiver_id, receiver);
        assert_eq!(confirmed.metadata.milestone_label, "Design mockup");
    }

    #[test]
    fn unpaid_session_is_not_confirmed() {
        let session = GatewaySession {
            id: "sess_2".to_string(),
            payment_status: "unpaid".to_string(),
            amount_total: Some(100),
            metadata: HashMap::new(),
        };
        assert!(matches!(session.confirmed(), Err(AppError::InvalidState(_))));
    }

    #[test]
    fn session_without_metadata_is_rejected() {
        let session = GatewaySession {
            id: "sess_3".to_string(),
            payment_status: "paid".to_string(),
            amount_total: Some(100),
            metadata: HashMap::new(),
        };
        assert!(matches!(session.confirmed(), Err(AppError::Validation(_))));
    }

    #[test]
    fn only_checkout_events_carry_a_paid_session() {
        let event: WebhookEvent = serde_json::from_value(serde_json::json!({
            "id": "evt_1",
            "type": "payment_intent.created",
            "data": { "object": {} }
        }))
        .unwrap();
        assert!(event.paid_session().unwrap().is_none());

        let event: WebhookEvent = serde_json::from_value(serde_json::json!({
            "id": "evt_2",
            "type": "checkout.session.completed",
            "data": { "object": {
                "id": "sess_9",
                "payment_status": "paid",
                "amount_total": 300000,
                "metadata": {}
            } }
        }))
        .unwrap();
        let session = event.paid_session().unwrap().unwrap();
        assert_eq!(session.id, "sess_9");
    }
}
