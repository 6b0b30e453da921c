use sea_orm::prelude::Expr;
use sea_orm::*;
use uuid::Uuid;

use crate::models::contracts::{self, Status};

#[derive(Debug, Clone)]
pub struct NewContract {
    pub job_id: Uuid,
    pub client_id: Uuid,
    pub freelancer_id: Uuid,
    pub start_date: Option<chrono::DateTime<chrono::Utc>>,
    pub end_date: Option<chrono::DateTime<chrono::Utc>>,
}

/// Insert a new contract in `Pending` status.
pub async fn insert_contract<C: ConnectionTrait>(
    db: &C,
    input: NewContract,
) -> Result<contracts::Model, DbErr> {
    let new_contract = contracts::ActiveModel {
        id: Set(Uuid::new_v4()),
        job_id: Set(input.job_id),
        client_id: Set(input.client_id),
        freelancer_id: Set(input.freelancer_id),
        status: Set(Status::Pending),
        start_date: Set(input.start_date),
        end_date: Set(input.end_date),
        created_at: Set(chrono::Utc::now()),
        updated_at: Set(None),
    };

    new_contract.insert(db).await
}

/// Fetch a single contract by ID.
pub async fn get_contract_by_id<C: ConnectionTrait>(
    db: &C,
    id: Uuid,
) -> Result<Option<contracts::Model>, DbErr> {
    contracts::Entity::find_by_id(id).one(db).await
}

/// Fetch the contract for a job, if one was created.
pub async fn get_contract_by_job_id<C: ConnectionTrait>(
    db: &C,
    job_id: Uuid,
) -> Result<Option<contracts::Model>, DbErr> {
    contracts::Entity::find()
        .filter(contracts::Column::JobId.eq(job_id))
        .one(db)
        .await
}

/// Fetch all contracts where the user is the client or the freelancer, newest first.
pub async fn get_contracts_for_party<C: ConnectionTrait>(
    db: &C,
    user_id: Uuid,
) -> Result<Vec<contracts::Model>, DbErr> {
    contracts::Entity::find()
        .filter(
            Condition::any()
                .add(contracts::Column::ClientId.eq(user_id))
                .add(contracts::Column::FreelancerId.eq(user_id)),
        )
        .order_by_desc(contracts::Column::CreatedAt)
        .all(db)
        .await
}

/// Move a contract from `from` to `to` only if it is still in `from`.
///
/// Returns `false` when another request changed the status first.
pub async fn transition_status<C: ConnectionTrait>(
    db: &C,
    id: Uuid,
    from: Status,
    to: Status,
) -> Result<bool, DbErr> {
    let result = contracts::Entity::update_many()
        .col_expr(contracts::Column::Status, Expr::value(to.to_value()))
        .col_expr(
            contracts::Column::UpdatedAt,
            Expr::value(chrono::Utc::now()),
        )
        .filter(contracts::Column::Id.eq(id))
        .filter(contracts::Column::Status.eq(from))
        .exec(db)
        .await?;

    Ok(result.rows_affected == 1)
}
