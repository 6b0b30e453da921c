use sea_orm::prelude::Expr;
use sea_orm::*;
use uuid::Uuid;

use crate::models::payments::{self, CreatePayment, PaymentStatus};

/// Insert a `Completed` payment.
///
/// Fails with a unique-constraint violation when a payment for the same
/// gateway session already exists; callers treat that as "already reconciled".
pub async fn insert_completed_payment<C: ConnectionTrait>(
    db: &C,
    input: CreatePayment,
) -> Result<payments::Model, DbErr> {
    let new_payment = payments::ActiveModel {
        id: Set(input.id),
        contract_id: Set(input.contract_id),
        payer_id: Set(input.payer_id),
        receiver_id: Set(input.receiver_id),
        amount: Set(input.amount),
        stripe_session_id: Set(input.stripe_session_id),
        milestone_label: Set(input.milestone_label),
        status: Set(PaymentStatus::Completed),
        withdrawal_id: Set(None),
        withdrawn_at: Set(None),
        created_at: Set(chrono::Utc::now()),
    };

    new_payment.insert(db).await
}

/// Fetch a payment by its gateway checkout session id.
pub async fn get_payment_by_session_id<C: ConnectionTrait>(
    db: &C,
    session_id: &str,
) -> Result<Option<payments::Model>, DbErr> {
    payments::Entity::find()
        .filter(payments::Column::StripeSessionId.eq(session_id))
        .one(db)
        .await
}

/// Put a payment on hold (`Pending`) so it is neither credited nor withdrawable.
pub async fn hold_payment<C: ConnectionTrait>(
    db: &C,
    id: Uuid,
) -> Result<payments::Model, DbErr> {
    let payment = payments::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or(DbErr::RecordNotFound("Payment not found".to_string()))?;

    let mut active: payments::ActiveModel = payment.into();
    active.status = Set(PaymentStatus::Pending);

    active.update(db).await
}

/// Payments the user paid or received, newest first, paginated.
pub async fn get_payments_for_user<C: ConnectionTrait>(
    db: &C,
    user_id: Uuid,
    page: u64,
    limit: u64,
) -> Result<Vec<payments::Model>, DbErr> {
    payments::Entity::find()
        .filter(
            Condition::any()
                .add(payments::Column::PayerId.eq(user_id))
                .add(payments::Column::ReceiverId.eq(user_id)),
        )
        .order_by_desc(payments::Column::CreatedAt)
        .paginate(db, limit)
        .fetch_page(page - 1)
        .await
}

/// Completed payments received by the user that have not been withdrawn.
pub async fn get_withdrawable<C: ConnectionTrait>(
    db: &C,
    receiver_id: Uuid,
) -> Result<Vec<payments::Model>, DbErr> {
    payments::Entity::find()
        .filter(payments::Column::ReceiverId.eq(receiver_id))
        .filter(payments::Column::Status.eq(PaymentStatus::Completed))
        .order_by_asc(payments::Column::CreatedAt)
        .all(db)
        .await
}

/// Mark the listed payments `Withdrawn` under `withdrawal_id`.
///
/// Only rows received by `receiver_id` and still `Completed` are touched, so
/// a payment can be claimed by at most one withdrawal. Returns the number of
/// rows claimed.
pub async fn claim_for_withdrawal<C: ConnectionTrait>(
    db: &C,
    payment_ids: &[Uuid],
    receiver_id: Uuid,
    withdrawal_id: Uuid,
) -> Result<u64, DbErr> {
    let result = payments::Entity::update_many()
        .col_expr(
            payments::Column::Status,
            Expr::value(PaymentStatus::Withdrawn.to_value()),
        )
        .col_expr(payments::Column::WithdrawalId, Expr::value(withdrawal_id))
        .col_expr(payments::Column::WithdrawnAt, Expr::value(chrono::Utc::now()))
        .filter(payments::Column::Id.is_in(payment_ids.to_vec()))
        .filter(payments::Column::ReceiverId.eq(receiver_id))
        .filter(payments::Column::Status.eq(PaymentStatus::Completed))
        .exec(db)
        .await?;

    Ok(result.rows_affected)
}

/// Payments settled by a withdrawal.
pub async fn get_payments_by_withdrawal<C: ConnectionTrait>(
    db: &C,
    withdrawal_id: Uuid,
) -> Result<Vec<payments::Model>, DbErr> {
    payments::Entity::find()
        .filter(payments::Column::WithdrawalId.eq(withdrawal_id))
        .all(db)
        .await
}
