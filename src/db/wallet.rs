//! Wallet ledger: the only code that changes `users.wallet_balance`.
//!
//! Each change updates the running total and appends a `wallet_entries` row
//! on the same connection, so callers run both inside their transaction.

use sea_orm::prelude::Expr;
use sea_orm::sea_query::ExprTrait;
use sea_orm::*;
use uuid::Uuid;

use crate::models::users;
use crate::models::wallet_entries::{self, EntryKind};

async fn append_entry<C: ConnectionTrait>(
    db: &C,
    user_id: Uuid,
    kind: EntryKind,
    amount: i64,
    reference_id: Uuid,
) -> Result<wallet_entries::Model, DbErr> {
    let entry = wallet_entries::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        kind: Set(kind),
        amount: Set(amount),
        reference_id: Set(reference_id),
        created_at: Set(chrono::Utc::now()),
    };

    entry.insert(db).await
}

/// Credit `amount` to the user for `payment_id`.
///
/// A second credit for the same payment violates the ledger's unique index.
pub async fn credit<C: ConnectionTrait>(
    db: &C,
    user_id: Uuid,
    amount: i64,
    payment_id: Uuid,
) -> Result<(), DbErr> {
    append_entry(db, user_id, EntryKind::Credit, amount, payment_id).await?;

    let result = users::Entity::update_many()
        .col_expr(
            users::Column::WalletBalance,
            Expr::col(users::Column::WalletBalance).add(amount),
        )
        .filter(users::Column::Id.eq(user_id))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        return Err(DbErr::RecordNotFound(format!("User {user_id} not found")));
    }
    Ok(())
}

/// Debit `amount` from the user for `withdrawal_id`.
///
/// Returns `false`, writing nothing, when the balance is below `amount`.
pub async fn debit<C: ConnectionTrait>(
    db: &C,
    user_id: Uuid,
    amount: i64,
    withdrawal_id: Uuid,
) -> Result<bool, DbErr> {
    let result = users::Entity::update_many()
        .col_expr(
            users::Column::WalletBalance,
            Expr::col(users::Column::WalletBalance).sub(amount),
        )
        .filter(users::Column::Id.eq(user_id))
        .filter(users::Column::WalletBalance.gte(amount))
        .exec(db)
        .await?;

    if result.rows_affected == 0 {
        return Ok(false);
    }

    append_entry(db, user_id, EntryKind::Debit, -amount, withdrawal_id).await?;
    Ok(true)
}

/// Current running balance, or `None` if the user does not exist.
pub async fn balance<C: ConnectionTrait>(db: &C, user_id: Uuid) -> Result<Option<i64>, DbErr> {
    Ok(users::Entity::find_by_id(user_id)
        .one(db)
        .await?
        .map(|u| u.wallet_balance))
}

/// Ledger entries for a user, oldest first.
pub async fn get_entries<C: ConnectionTrait>(
    db: &C,
    user_id: Uuid,
) -> Result<Vec<wallet_entries::Model>, DbErr> {
    wallet_entries::Entity::find()
        .filter(wallet_entries::Column::UserId.eq(user_id))
        .order_by_asc(wallet_entries::Column::CreatedAt)
        .all(db)
        .await
}

/// Balance re-derived by replaying the ledger.
pub async fn ledger_balance<C: ConnectionTrait>(db: &C, user_id: Uuid) -> Result<i64, DbErr> {
    Ok(get_entries(db, user_id).await?.iter().map(|e| e.amount).sum())
}
