use actix_web::{HttpResponse, web};
use sea_orm::DatabaseConnection;
use uuid::Uuid;

use crate::auth::middleware::AuthenticatedUser;
use crate::errors::AppError;
use crate::models::contracts::{CompleteMilestone, ProposalAccepted, UpdateContractStatus};
use crate::services::contracts as contract_service;

/// POST /api/contracts: the job's client accepts a freelancer's proposal.
///
/// Creates a `pending` contract with the proposal's milestone schedule.
pub async fn create_contract(
    user: AuthenticatedUser,
    db: web::Data<DatabaseConnection>,
    body: web::Json<ProposalAccepted>,
) -> Result<HttpResponse, AppError> {
    let contract =
        contract_service::accept_proposal(db.get_ref(), &user.principal(), body.into_inner())
            .await?;
    Ok(HttpResponse::Created().json(contract))
}

/// GET /api/contracts: contracts where the caller is the client or the freelancer.
pub async fn get_contracts(
    user: AuthenticatedUser,
    db: web::Data<DatabaseConnection>,
) -> Result<HttpResponse, AppError> {
    let contracts = contract_service::list_contracts(db.get_ref(), &user.principal()).await?;
    Ok(HttpResponse::Ok().json(contracts))
}

/// GET /api/contracts/{id}
pub async fn get_contract(
    user: AuthenticatedUser,
    db: web::Data<DatabaseConnection>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let contract =
        contract_service::get_contract(db.get_ref(), &user.principal(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(contract))
}

/// PUT /api/contracts/{id}/status: the freelancer accepts or declines a pending contract.
///
/// Body: `{ "status": "active" }` or `{ "status": "cancelled" }`.
pub async fn update_status(
    user: AuthenticatedUser,
    db: web::Data<DatabaseConnection>,
    path: web::Path<Uuid>,
    body: web::Json<UpdateContractStatus>,
) -> Result<HttpResponse, AppError> {
    let contract = contract_service::update_status(
        db.get_ref(),
        &user.principal(),
        path.into_inner(),
        body.status,
    )
    .await?;
    Ok(HttpResponse::Ok().json(contract))
}

/// PUT /api/contracts/{id}/milestones/complete: the freelancer marks a milestone delivered.
pub async fn complete_milestone(
    user: AuthenticatedUser,
    db: web::Data<DatabaseConnection>,
    path: web::Path<Uuid>,
    body: web::Json<CompleteMilestone>,
) -> Result<HttpResponse, AppError> {
    let milestone = contract_service::complete_milestone(
        db.get_ref(),
        &user.principal(),
        path.into_inner(),
        &body.label,
    )
    .await?;
    Ok(HttpResponse::Ok().json(milestone))
}
