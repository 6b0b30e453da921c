//! Contract store and milestone state machine.
//!
//! Contract: `pending → active | cancelled` by the freelancer, and
//! `active → completed` when reconciliation pays the last milestone.
//! Milestone: `completed_by_freelancer` and `paid_at` are each set once.

use std::collections::HashSet;

use sea_orm::{DatabaseConnection, TransactionTrait};
use tracing::{debug, info};
use uuid::Uuid;

use crate::auth::Principal;
use crate::auth::authorization::{ensure_can_view, ensure_freelancer};
use crate::db::contracts::{self as contract_db, NewContract};
use crate::db::jobs as job_db;
use crate::db::milestones::{self as milestone_db, NewMilestone};
use crate::db::users as user_db;
use crate::errors::AppError;
use crate::models::contracts::{self, ContractResponse, ProposalAccepted, Status};
use crate::models::jobs::CreateJob;
use crate::models::milestones::{MilestoneResponse, label_key};
use crate::services::parse_amount;

/// Check and normalize a proposal's milestone schedule.
fn validate_schedule(input: &ProposalAccepted) -> Result<Vec<NewMilestone>, AppError> {
    if input.milestones.is_empty() {
        return Err(AppError::Validation(
            "A contract needs at least one milestone".to_string(),
        ));
    }

    let mut seen = HashSet::new();
    let mut schedule = Vec::with_capacity(input.milestones.len());

    for milestone in &input.milestones {
        let label = milestone.label.trim();
        if label.is_empty() {
            return Err(AppError::Validation(
                "Milestone labels must not be empty".to_string(),
            ));
        }
        if !seen.insert(label_key(label)) {
            return Err(AppError::Validation(format!(
                "Milestone label '{label}' is used more than once"
            )));
        }
        schedule.push(NewMilestone {
            label: label.to_string(),
            amount: parse_amount(milestone.amount)?,
        });
    }

    Ok(schedule)
}

async fn load_contract(db: &DatabaseConnection, id: Uuid) -> Result<contracts::Model, AppError> {
    contract_db::get_contract_by_id(db, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Contract {id} not found")))
}

async fn with_milestones(
    db: &DatabaseConnection,
    contract: contracts::Model,
) -> Result<ContractResponse, AppError> {
    let milestones = milestone_db::get_milestones_by_contract(db, contract.id).await?;
    Ok(ContractResponse::new(contract, milestones))
}

/// Create a `pending` contract from an accepted proposal.
///
/// The caller is the job's client. A job unknown to this service is
/// registered to the caller; a known job must belong to the caller. A job
/// gets at most one contract.
pub async fn accept_proposal(
    db: &DatabaseConnection,
    client: &Principal,
    input: ProposalAccepted,
) -> Result<ContractResponse, AppError> {
    let schedule = validate_schedule(&input)?;

    if input.freelancer_id == client.id {
        return Err(AppError::Validation(
            "You cannot create a contract with yourself".to_string(),
        ));
    }
    if let (Some(start), Some(end)) = (input.start_date, input.end_date) {
        if end < start {
            return Err(AppError::Validation(
                "end_date must not be before start_date".to_string(),
            ));
        }
    }

    let title = input
        .job_title
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("Job {}", input.job_id));

    let job = job_db::find_or_register_job(
        db,
        CreateJob {
            id: input.job_id,
            client_id: client.id,
            title,
        },
    )
    .await?;

    if job.client_id != client.id {
        return Err(AppError::Forbidden(
            "Only the client who posted the job can accept proposals for it".to_string(),
        ));
    }

    if user_db::get_user_by_id(db, input.freelancer_id).await?.is_none() {
        return Err(AppError::NotFound(format!(
            "Freelancer {} not found",
            input.freelancer_id
        )));
    }

    if contract_db::get_contract_by_job_id(db, job.id).await?.is_some() {
        return Err(AppError::Conflict(format!(
            "Job {} already has a contract",
            job.id
        )));
    }

    let txn = db.begin().await?;

    let contract = match contract_db::insert_contract(
        &txn,
        NewContract {
            job_id: job.id,
            client_id: client.id,
            freelancer_id: input.freelancer_id,
            start_date: input.start_date,
            end_date: input.end_date,
        },
    )
    .await
    {
        Ok(contract) => contract,
        Err(e) if AppError::is_unique_violation(&e) => {
            txn.rollback().await?;
            return Err(AppError::Conflict(format!(
                "Job {} already has a contract",
                job.id
            )));
        }
        Err(e) => return Err(e.into()),
    };

    let milestones = milestone_db::insert_milestones(&txn, contract.id, schedule).await?;
    txn.commit().await?;

    info!(
        contract_id = %contract.id,
        job_id = %job.id,
        freelancer_id = %contract.freelancer_id,
        milestones = milestones.len(),
        "Contract created from accepted proposal"
    );

    Ok(ContractResponse::new(contract, milestones))
}

/// A single contract with its milestones, visible to its parties and admins.
pub async fn get_contract(
    db: &DatabaseConnection,
    principal: &Principal,
    id: Uuid,
) -> Result<ContractResponse, AppError> {
    let contract = load_contract(db, id).await?;
    ensure_can_view(&contract, principal)?;
    with_milestones(db, contract).await
}

/// Every contract the caller is a party to.
pub async fn list_contracts(
    db: &DatabaseConnection,
    principal: &Principal,
) -> Result<Vec<ContractResponse>, AppError> {
    let contracts = contract_db::get_contracts_for_party(db, principal.id).await?;

    let mut response = Vec::with_capacity(contracts.len());
    for contract in contracts {
        response.push(with_milestones(db, contract).await?);
    }
    Ok(response)
}

/// Freelancer accepts (`active`) or declines (`cancelled`) a pending contract.
pub async fn update_status(
    db: &DatabaseConnection,
    principal: &Principal,
    id: Uuid,
    target: Status,
) -> Result<ContractResponse, AppError> {
    let contract = load_contract(db, id).await?;
    ensure_freelancer(&contract, principal)?;

    if !matches!(target, Status::Active | Status::Cancelled) {
        return Err(AppError::Validation(format!(
            "A contract can only be set to active or cancelled, not {target:?}"
        )));
    }

    if contract.status != Status::Pending {
        return Err(AppError::InvalidState(format!(
            "Contract is already {:?}. Only pending contracts can be updated.",
            contract.status
        )));
    }

    if !contract_db::transition_status(db, id, Status::Pending, target).await? {
        // Lost a race against another transition.
        let current = load_contract(db, id).await?;
        return Err(AppError::InvalidState(format!(
            "Contract is already {:?}. Only pending contracts can be updated.",
            current.status
        )));
    }

    info!(contract_id = %id, status = ?target, "Contract status updated");
    with_milestones(db, load_contract(db, id).await?).await
}

/// Freelancer marks a milestone as delivered.
///
/// Marking an already-delivered milestone is a no-op. A paid milestone is
/// final and cannot be marked.
pub async fn complete_milestone(
    db: &DatabaseConnection,
    principal: &Principal,
    contract_id: Uuid,
    label: &str,
) -> Result<MilestoneResponse, AppError> {
    let contract = load_contract(db, contract_id).await?;
    ensure_freelancer(&contract, principal)?;

    if contract.status == Status::Cancelled {
        return Err(AppError::InvalidState(
            "Milestones of a cancelled contract cannot be updated".to_string(),
        ));
    }

    let not_found = || {
        AppError::NotFound(format!(
            "Milestone '{}' not found on contract {contract_id}",
            label.trim()
        ))
    };

    let milestone = milestone_db::find_by_label(db, contract_id, label)
        .await?
        .ok_or_else(not_found)?;

    if milestone.is_paid() {
        return Err(AppError::InvalidState(format!(
            "Milestone '{}' is already paid",
            milestone.label
        )));
    }

    if milestone.completed_by_freelancer {
        debug!(contract_id = %contract_id, label = %milestone.label, "Milestone already completed");
        return Ok(milestone.into());
    }

    let marked = milestone_db::mark_completed(db, milestone.id).await?;
    let milestone = milestone_db::find_by_label(db, contract_id, label)
        .await?
        .ok_or_else(not_found)?;

    if !marked && milestone.is_paid() {
        // Paid between the check and the update.
        return Err(AppError::InvalidState(format!(
            "Milestone '{}' is already paid",
            milestone.label
        )));
    }

    if marked {
        info!(
            contract_id = %contract_id,
            label = %milestone.label,
            "Milestone completed by freelancer"
        );
    }
    Ok(milestone.into())
}
