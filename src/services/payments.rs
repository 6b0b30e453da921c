//! Checkout creation and the two confirmation producers.

use sea_orm::DatabaseConnection;
use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use crate::auth::Principal;
use crate::auth::authorization::counterparty_of;
use crate::db::contracts as contract_db;
use crate::db::milestones as milestone_db;
use crate::db::payments as payment_db;
use crate::errors::AppError;
use crate::gateway::{
    CheckoutSession, NewCheckoutSession, PaymentGateway, SessionMetadata, WebhookEvent,
    to_minor_units, validate_session_id,
};
use crate::models::PaginationQuery;
use crate::models::contracts::Status;
use crate::models::payments::{self, CheckoutRequest};
use crate::models::reconciliations::ConfirmationSource;
use crate::services::parse_amount;
use crate::services::reconciliation::{self, ReconcileOutcome};

/// Result of the redirect-side confirmation.
#[derive(Debug, Clone, Serialize)]
pub struct VerifiedPayment {
    pub payment: payments::Model,
    /// False when an earlier webhook or redirect had already reconciled the session.
    pub newly_reconciled: bool,
}

/// Start a hosted checkout for one milestone of a contract.
///
/// The caller pays and the other party receives.
pub async fn create_checkout_session(
    db: &DatabaseConnection,
    gateway: &dyn PaymentGateway,
    principal: &Principal,
    input: CheckoutRequest,
) -> Result<CheckoutSession, AppError> {
    let amount = parse_amount(input.amount)?;

    let contract = contract_db::get_contract_by_id(db, input.contract_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Contract {} not found", input.contract_id)))?;

    let receiver_id = counterparty_of(&contract, principal)?;

    if contract.status == Status::Cancelled {
        return Err(AppError::InvalidState(
            "Cannot pay for a cancelled contract".to_string(),
        ));
    }

    let milestone = milestone_db::find_by_label(db, contract.id, &input.milestone_label)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!(
                "Milestone '{}' not found on contract {}",
                input.milestone_label.trim(),
                contract.id
            ))
        })?;

    if milestone.is_paid() {
        return Err(AppError::InvalidState(format!(
            "Milestone '{}' is already paid",
            milestone.label
        )));
    }
    if milestone.amount != amount {
        return Err(AppError::Validation(format!(
            "Amount {amount} does not match milestone amount {}",
            milestone.amount
        )));
    }

    let request = NewCheckoutSession {
        amount_minor: to_minor_units(amount)?,
        metadata: SessionMetadata {
            contract_id: contract.id,
            milestone_label: milestone.label.clone(),
            payer_id: principal.id,
            receiver_id,
        },
    };

    let session = gateway.create_checkout_session(&request).await?;

    info!(
        session_id = %session.session_id,
        contract_id = %contract.id,
        label = %milestone.label,
        payer_id = %principal.id,
        receiver_id = %receiver_id,
        amount,
        "Checkout session created"
    );

    Ok(session)
}

/// Redirect fallback: confirm a session the payer just returned from.
pub async fn verify_payment_success(
    db: &DatabaseConnection,
    gateway: &dyn PaymentGateway,
    principal: &Principal,
    session_id: &str,
) -> Result<VerifiedPayment, AppError> {
    let session_id = session_id.trim();
    if session_id.is_empty() {
        return Err(AppError::Validation("session_id is required".to_string()));
    }
    validate_session_id(session_id)?;

    let session = gateway.retrieve_session(session_id).await?;
    let confirmed = session.confirmed()?;

    let metadata = &confirmed.metadata;
    if principal.id != metadata.payer_id && principal.id != metadata.receiver_id {
        return Err(AppError::Forbidden(
            "You are not a party to this payment".to_string(),
        ));
    }

    let outcome =
        reconciliation::confirm_payment(db, &confirmed, ConfirmationSource::Redirect).await?;

    match outcome {
        ReconcileOutcome::Reconciled(payment) => Ok(VerifiedPayment {
            payment,
            newly_reconciled: true,
        }),
        ReconcileOutcome::AlreadyReconciled => {
            let payment = payment_db::get_payment_by_session_id(db, &confirmed.session_id)
                .await?
                .ok_or_else(|| {
                    AppError::Internal(format!(
                        "Session {} reconciled but no payment found",
                        confirmed.session_id
                    ))
                })?;
            Ok(VerifiedPayment {
                payment,
                newly_reconciled: false,
            })
        }
    }
}

/// Apply a verified webhook event. Returns `None` for events that do not
/// confirm a payment.
pub async fn handle_webhook_event(
    db: &DatabaseConnection,
    event: &WebhookEvent,
) -> Result<Option<ReconcileOutcome>, AppError> {
    let Some(session) = event.paid_session()? else {
        debug!(event_id = %event.id, event_type = %event.event_type, "Ignoring webhook event");
        return Ok(None);
    };

    let confirmed = session.confirmed()?;
    let outcome =
        reconciliation::confirm_payment(db, &confirmed, ConfirmationSource::Webhook).await?;
    Ok(Some(outcome))
}

/// Payments the caller paid or received.
pub async fn list_payments(
    db: &DatabaseConnection,
    user_id: Uuid,
    query: &PaginationQuery,
) -> Result<Vec<payments::Model>, AppError> {
    Ok(payment_db::get_payments_for_user(db, user_id, query.page(), query.limit()).await?)
}
