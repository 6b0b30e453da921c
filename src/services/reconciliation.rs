//! Payment reconciliation: the single place that creates a Payment or
//! credits a wallet.
//!
//! The webhook, the redirect fallback and the retry sweep all call
//! [`confirm_payment`]. Idempotency rests on the unique index over
//! `payments.stripe_session_id`: the first transaction to insert wins and
//! every other attempt for the same session becomes a no-op.

use std::time::Duration;

use sea_orm::{DatabaseConnection, TransactionTrait};
use tracing::{debug, error, info, warn};

use crate::db::contracts as contract_db;
use crate::db::milestones as milestone_db;
use crate::db::payments as payment_db;
use crate::db::reconciliations as reconciliation_db;
use crate::db::wallet as wallet_db;
use crate::errors::AppError;
use crate::gateway::ConfirmedPayment;
use crate::models::contracts::Status;
use crate::models::payments::{self, CreatePayment};
use crate::models::reconciliations::ConfirmationSource;

/// Markers examined per sweep.
const RETRY_BATCH: u64 = 50;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// This call recorded the payment.
    Reconciled(payments::Model),
    /// The session had already been reconciled; nothing changed.
    AlreadyReconciled,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetrySummary {
    pub attempted: usize,
    pub resolved: usize,
    pub failed: usize,
}

/// Converge a gateway-confirmed payment into Payment, Milestone and Wallet state.
///
/// A pending marker is written first. It is resolved when the confirmation is
/// applied or found already applied; on failure it keeps the error for the
/// retry sweep and the error is returned.
pub async fn confirm_payment(
    db: &DatabaseConnection,
    confirmed: &ConfirmedPayment,
    source: ConfirmationSource,
) -> Result<ReconcileOutcome, AppError> {
    let session_id = confirmed.session_id.as_str();
    let payload = serde_json::to_string(confirmed)
        .map_err(|e| AppError::Internal(format!("Failed to serialize confirmation: {e}")))?;

    reconciliation_db::record_pending(db, session_id, source, payload).await?;

    match apply_confirmation(db, confirmed).await {
        Ok(outcome) => {
            if let Err(e) = reconciliation_db::mark_resolved(db, session_id).await {
                warn!(session_id, error = %e, "Failed to resolve reconciliation marker");
            }
            Ok(outcome)
        }
        Err(err) => {
            error!(
                session_id,
                source = ?source,
                contract_id = %confirmed.metadata.contract_id,
                amount = confirmed.amount,
                error = %err,
                "Payment reconciliation failed; left pending for retry"
            );
            let recorded =
                reconciliation_db::record_failure(db, session_id, &err.to_string()).await;
            if let Err(e) = recorded {
                error!(session_id, error = %e, "Failed to record reconciliation failure");
            }
            Err(err)
        }
    }
}

async fn apply_confirmation(
    db: &DatabaseConnection,
    confirmed: &ConfirmedPayment,
) -> Result<ReconcileOutcome, AppError> {
    let metadata = &confirmed.metadata;

    if payment_db::get_payment_by_session_id(db, &confirmed.session_id)
        .await?
        .is_some()
    {
        debug!(session_id = %confirmed.session_id, "Session already reconciled");
        return Ok(ReconcileOutcome::AlreadyReconciled);
    }

    let txn = db.begin().await?;

    let contract = contract_db::get_contract_by_id(&txn, metadata.contract_id)
        .await?
        .ok_or_else(|| {
            AppError::NotFound(format!("Contract {} not found", metadata.contract_id))
        })?;

    if contract.counterparty(metadata.payer_id) != Some(metadata.receiver_id) {
        return Err(AppError::Validation(format!(
            "Payer {} and receiver {} are not the two parties of contract {}",
            metadata.payer_id, metadata.receiver_id, contract.id
        )));
    }

    // Insert-if-absent: a concurrent attempt that committed first makes this fail.
    let payment = match payment_db::insert_completed_payment(
        &txn,
        CreatePayment {
            id: uuid::Uuid::new_v4(),
            contract_id: contract.id,
            payer_id: metadata.payer_id,
            receiver_id: metadata.receiver_id,
            amount: confirmed.amount,
            stripe_session_id: confirmed.session_id.clone(),
            milestone_label: metadata.milestone_label.trim().to_string(),
        },
    )
    .await
    {
        Ok(payment) => payment,
        Err(e) if AppError::is_unique_violation(&e) => {
            txn.rollback().await?;
            debug!(
                session_id = %confirmed.session_id,
                "Lost reconciliation race; already reconciled"
            );
            return Ok(ReconcileOutcome::AlreadyReconciled);
        }
        Err(e) => return Err(e.into()),
    };

    let credit = match milestone_db::find_by_label(&txn, contract.id, &metadata.milestone_label)
        .await?
    {
        None => {
            warn!(
                payment_id = %payment.id,
                contract_id = %contract.id,
                label = %metadata.milestone_label,
                "No milestone matches the paid label; payment recorded, milestone left unpaid"
            );
            true
        }
        Some(milestone) => {
            if milestone_db::mark_paid(&txn, milestone.id, payment.id).await? {
                true
            } else {
                warn!(
                    payment_id = %payment.id,
                    contract_id = %contract.id,
                    label = %milestone.label,
                    paid_by = ?milestone.payment_id,
                    "Milestone already paid by another session; payment held for refund"
                );
                false
            }
        }
    };

    let payment = if credit {
        wallet_db::credit(&txn, payment.receiver_id, payment.amount, payment.id).await?;
        payment
    } else {
        payment_db::hold_payment(&txn, payment.id).await?
    };

    if credit
        && contract.status == Status::Active
        && milestone_db::count_unpaid(&txn, contract.id).await? == 0
        && contract_db::transition_status(&txn, contract.id, Status::Active, Status::Completed)
            .await?
    {
        info!(contract_id = %contract.id, "All milestones paid; contract completed");
    }

    txn.commit().await?;

    info!(
        payment_id = %payment.id,
        session_id = %payment.stripe_session_id,
        contract_id = %payment.contract_id,
        receiver_id = %payment.receiver_id,
        amount = payment.amount,
        status = ?payment.status,
        "Payment reconciled"
    );

    Ok(ReconcileOutcome::Reconciled(payment))
}

/// Re-run confirmations whose marker is still unresolved.
pub async fn retry_pending(
    db: &DatabaseConnection,
    max_attempts: i32,
) -> Result<RetrySummary, AppError> {
    let markers = reconciliation_db::get_unresolved(db, max_attempts, RETRY_BATCH).await?;
    let mut summary = RetrySummary::default();

    for marker in markers {
        summary.attempted += 1;

        let confirmed: ConfirmedPayment = match serde_json::from_str(&marker.payload) {
            Ok(confirmed) => confirmed,
            Err(e) => {
                error!(
                    session_id = %marker.session_id,
                    error = %e,
                    "Unreadable reconciliation payload"
                );
                reconciliation_db::record_failure(db, &marker.session_id, &e.to_string()).await?;
                summary.failed += 1;
                continue;
            }
        };

        match confirm_payment(db, &confirmed, ConfirmationSource::Retry).await {
            Ok(_) => summary.resolved += 1,
            Err(_) => summary.failed += 1,
        }
    }

    Ok(summary)
}

/// Shortest pause between two retry sweeps.
pub const MIN_RETRY_INTERVAL: Duration = Duration::from_secs(1);

/// Sweep unresolved markers every `interval` (at least [`MIN_RETRY_INTERVAL`]), forever.
pub async fn run_retry_loop(db: DatabaseConnection, interval: Duration, max_attempts: i32) {
    let mut ticker = tokio::time::interval(interval.max(MIN_RETRY_INTERVAL));
    loop {
        ticker.tick().await;
        match retry_pending(&db, max_attempts).await {
            Ok(summary) if summary.attempted > 0 => {
                info!(
                    attempted = summary.attempted,
                    resolved = summary.resolved,
                    failed = summary.failed,
                    "Reconciliation retry sweep finished"
                );
            }
            Ok(_) => {}
            Err(e) => error!(error = %e, "Reconciliation retry sweep failed"),
        }
    }
}
