use sea_orm::DatabaseConnection;
use tracing::warn;
use uuid::Uuid;

use crate::db::payments as payment_db;
use crate::db::wallet as wallet_db;
use crate::errors::AppError;
use crate::models::wallet_entries::WalletSummary;

/// Balance, ledger replay and withdrawable payments for a user.
pub async fn wallet_summary(
    db: &DatabaseConnection,
    user_id: Uuid,
) -> Result<WalletSummary, AppError> {
    let balance = wallet_db::balance(db, user_id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("User {user_id} not found")))?;
    let ledger_balance = wallet_db::ledger_balance(db, user_id).await?;

    let consistent = balance == ledger_balance;
    if !consistent {
        warn!(
            user_id = %user_id,
            balance,
            ledger_balance,
            "Wallet balance does not match its ledger"
        );
    }

    let withdrawable = payment_db::get_withdrawable(db, user_id).await?;

    Ok(WalletSummary {
        user_id,
        balance,
        ledger_balance,
        consistent,
        withdrawable,
    })
}
