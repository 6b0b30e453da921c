use actix_web::{HttpResponse, web};
use sea_orm::DatabaseConnection;

use crate::auth::middleware::AuthenticatedUser;
use crate::errors::AppError;
use crate::models::withdrawals::WithdrawalRequest;
use crate::services::withdrawals as withdrawal_service;

/// POST /api/withdrawals: withdraw completed payments into one payout.
///
/// Body: `{ "payment_ids": [...], "request_id": "<uuid>"? }`. Repeating a
/// `request_id` returns the original withdrawal.
pub async fn create_withdrawal(
    user: AuthenticatedUser,
    db: web::Data<DatabaseConnection>,
    body: web::Json<WithdrawalRequest>,
) -> Result<HttpResponse, AppError> {
    let response =
        withdrawal_service::request_withdrawal(db.get_ref(), user.0.id, body.into_inner()).await?;

    if response.replayed {
        Ok(HttpResponse::Ok().json(response))
    } else {
        Ok(HttpResponse::Created().json(response))
    }
}

/// GET /api/withdrawals
pub async fn get_withdrawals(
    user: AuthenticatedUser,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    let withdrawals = withdrawal_service::list_withdrawals(db.get_ref(), user.0.id).await?;
    Ok(HttpResponse::Ok().json(withdrawals))
}
