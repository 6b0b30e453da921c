//! Withdrawal processor.
//!
//! Claiming payments, debiting the wallet and fixing the withdrawal amount
//! happen in one transaction. Payments are claimed with a conditional update
//! on `status = 'completed'`, so two overlapping requests can never both
//! claim the same payment.

use std::collections::HashSet;

use sea_orm::{DatabaseConnection, TransactionTrait};
use tracing::{info, warn};
use uuid::Uuid;

use crate::db::payments as payment_db;
use crate::db::wallet as wallet_db;
use crate::db::withdrawals as withdrawal_db;
use crate::errors::AppError;
use crate::models::withdrawals::{self, WithdrawalRequest, WithdrawalResponse};

async fn replay(
    db: &DatabaseConnection,
    freelancer_id: Uuid,
    existing: withdrawals::Model,
) -> Result<WithdrawalResponse, AppError> {
    if existing.freelancer_id != freelancer_id {
        return Err(AppError::Conflict(
            "request_id is already used by another withdrawal".to_string(),
        ));
    }

    let payment_ids = payment_db::get_payments_by_withdrawal(db, existing.id)
        .await?
        .into_iter()
        .map(|p| p.id)
        .collect();

    info!(withdrawal_id = %existing.id, "Replaying withdrawal for repeated request_id");
    Ok(WithdrawalResponse {
        withdrawal: existing,
        payment_ids,
        replayed: true,
    })
}

/// Withdraw the listed payments received by `freelancer_id`.
///
/// Ids that are not the caller's or are no longer `completed` are skipped.
/// If none remain the request fails and nothing changes.
pub async fn request_withdrawal(
    db: &DatabaseConnection,
    freelancer_id: Uuid,
    input: WithdrawalRequest,
) -> Result<WithdrawalResponse, AppError> {
    let requested = input.payment_ids.unwrap_or_default();
    if requested.is_empty() {
        return Err(AppError::Validation(
            "payment_ids must list at least one payment".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    let payment_ids: Vec<Uuid> = requested.into_iter().filter(|id| seen.insert(*id)).collect();

    if let Some(key) = input.request_id {
        if let Some(existing) = withdrawal_db::get_by_request_key(db, key).await? {
            return replay(db, freelancer_id, existing).await;
        }
    }

    let txn = db.begin().await?;

    let withdrawal = match withdrawal_db::insert_withdrawal(&txn, freelancer_id, input.request_id)
        .await
    {
        Ok(withdrawal) => withdrawal,
        Err(e) if AppError::is_unique_violation(&e) => {
            txn.rollback().await?;
            let key = input.request_id.unwrap_or_default();
            let existing = withdrawal_db::get_by_request_key(db, key)
                .await?
                .ok_or_else(|| {
                    AppError::Internal(format!("Withdrawal for request {key} vanished"))
                })?;
            return replay(db, freelancer_id, existing).await;
        }
        Err(e) => return Err(e.into()),
    };

    let claimed =
        payment_db::claim_for_withdrawal(&txn, &payment_ids, freelancer_id, withdrawal.id).await?;
    if claimed == 0 {
        txn.rollback().await?;
        return Err(AppError::Validation(
            "None of the listed payments can be withdrawn".to_string(),
        ));
    }

    let claimed_payments = payment_db::get_payments_by_withdrawal(&txn, withdrawal.id).await?;
    let total: i64 = claimed_payments.iter().map(|p| p.amount).sum();

    if !wallet_db::debit(&txn, freelancer_id, total, withdrawal.id).await? {
        let available = wallet_db::balance(&txn, freelancer_id).await?.unwrap_or(0);
        txn.rollback().await?;
        warn!(
            freelancer_id = %freelancer_id,
            requested = total,
            available,
            "Withdrawal rejected: insufficient balance"
        );
        return Err(AppError::InsufficientBalance {
            requested: total,
            available,
        });
    }

    withdrawal_db::set_amount(&txn, withdrawal.id, total).await?;
    txn.commit().await?;

    let skipped = payment_ids.len() - claimed_payments.len();
    info!(
        withdrawal_id = %withdrawal.id,
        freelancer_id = %freelancer_id,
        amount = total,
        payments = claimed_payments.len(),
        skipped,
        "Withdrawal processed"
    );

    Ok(WithdrawalResponse {
        withdrawal: withdrawals::Model {
            amount: total,
            ..withdrawal
        },
        payment_ids: claimed_payments.into_iter().map(|p| p.id).collect(),
        replayed: false,
    })
}

/// A freelancer's withdrawals, newest first.
pub async fn list_withdrawals(
    db: &DatabaseConnection,
    freelancer_id: Uuid,
) -> Result<Vec<withdrawals::Model>, AppError> {
    Ok(withdrawal_db::get_withdrawals_by_freelancer(db, freelancer_id).await?)
}
