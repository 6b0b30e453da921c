use std::sync::Arc;

use actix_web::{HttpRequest, HttpResponse, web};
use sea_orm::DatabaseConnection;
use tracing::{error, warn};

use crate::auth::middleware::AuthenticatedUser;
use crate::errors::AppError;
use crate::gateway::PaymentGateway;
use crate::gateway::signature::{SIGNATURE_HEADER, WebhookVerifier};
use crate::models::PaginationQuery;
use crate::models::payments::{CheckoutRequest, VerifyQuery};
use crate::services::payments as payment_service;
use crate::services::reconciliation::ReconcileOutcome;

/// POST /api/payments/checkout: start a hosted checkout for a milestone.
///
/// Returns `{ session_id, url }`; the caller redirects the payer to `url`.
pub async fn create_checkout(
    user: AuthenticatedUser,
    db: web::Data<DatabaseConnection>,
    gateway: web::Data<Arc<dyn PaymentGateway>>,
    body: web::Json<CheckoutRequest>,
) -> Result<HttpResponse, AppError> {
    let session = payment_service::create_checkout_session(
        db.get_ref(),
        gateway.get_ref().as_ref(),
        &user.principal(),
        body.into_inner(),
    )
    .await?;
    Ok(HttpResponse::Ok().json(session))
}

/// GET /api/payments/verify?session_id=...: confirm a payment on return from checkout.
pub async fn verify_payment(
    user: AuthenticatedUser,
    db: web::Data<DatabaseConnection>,
    gateway: web::Data<Arc<dyn PaymentGateway>>,
    query: web::Query<VerifyQuery>,
) -> Result<HttpResponse, AppError> {
    let verified = payment_service::verify_payment_success(
        db.get_ref(),
        gateway.get_ref().as_ref(),
        &user.principal(),
        &query.session_id,
    )
    .await?;
    Ok(HttpResponse::Ok().json(verified))
}

/// GET /api/payments: payments the caller paid or received.
pub async fn get_payments(
    user: AuthenticatedUser,
    db: web::Data<DatabaseConnection>,
    query: web::Query<PaginationQuery>,
) -> Result<HttpResponse, AppError> {
    let payments = payment_service::list_payments(db.get_ref(), user.0.id, &query).await?;
    Ok(HttpResponse::Ok().json(payments))
}

/// POST /api/payments/webhook: gateway event delivery. Not JWT-protected.
///
/// A bad signature is rejected with 400 and nothing is processed. A failed
/// reconciliation answers 500 so the gateway redelivers the event.
pub async fn webhook(
    req: HttpRequest,
    db: web::Data<DatabaseConnection>,
    verifier: web::Data<WebhookVerifier>,
    body: web::Bytes,
) -> Result<HttpResponse, AppError> {
    let header = req
        .headers()
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::InvalidSignature("missing signature header".to_string()))?;

    let event = verifier.construct_event(&body, header).inspect_err(|e| {
        warn!(error = %e, "Rejected webhook delivery");
    })?;

    match payment_service::handle_webhook_event(db.get_ref(), &event).await {
        Ok(outcome) => Ok(HttpResponse::Ok().json(serde_json::json!({
            "received": true,
            "reconciled": matches!(outcome, Some(ReconcileOutcome::Reconciled(_))),
        }))),
        Err(e) => {
            error!(event_id = %event.id, error = %e, "Webhook processing failed");
            Ok(HttpResponse::InternalServerError().json(serde_json::json!({
                "error": e.to_string(),
            })))
        }
    }
}
