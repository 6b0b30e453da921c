use actix_web::{HttpResponse, web};
use sea_orm::DatabaseConnection;

use crate::auth::middleware::AuthenticatedUser;
use crate::errors::AppError;
use crate::services::wallet as wallet_service;

/// GET /api/wallet: balance, ledger check and withdrawable payments.
pub async fn get_wallet(
    user: AuthenticatedUser,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    let summary = wallet_service::wallet_summary(db.get_ref(), user.0.id).await?;
    Ok(HttpResponse::Ok().json(summary))
}
