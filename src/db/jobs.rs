use sea_orm::*;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::jobs::{self, CreateJob};

/// Insert a job posting as published by the registry.
pub async fn insert_job<C: ConnectionTrait>(
    db: &C,
    input: CreateJob,
) -> Result<jobs::Model, DbErr> {
    let new_job = jobs::ActiveModel {
        id: Set(input.id),
        client_id: Set(input.client_id),
        title: Set(input.title),
        created_at: Set(chrono::Utc::now()),
    };

    new_job.insert(db).await
}

/// Fetch a single job by ID.
pub async fn get_job_by_id<C: ConnectionTrait>(
    db: &C,
    id: Uuid,
) -> Result<Option<jobs::Model>, DbErr> {
    jobs::Entity::find_by_id(id).one(db).await
}

/// Fetch the job, registering it first if this service has not seen it yet.
///
/// An existing row is returned unchanged, whoever owns it.
pub async fn find_or_register_job<C: ConnectionTrait>(
    db: &C,
    input: CreateJob,
) -> Result<jobs::Model, DbErr> {
    if let Some(existing) = get_job_by_id(db, input.id).await? {
        return Ok(existing);
    }

    let id = input.id;
    match insert_job(db, input).await {
        Ok(job) => Ok(job),
        // Registered concurrently by another acceptance.
        Err(e) if AppError::is_unique_violation(&e) => get_job_by_id(db, id)
            .await?
            .ok_or(DbErr::RecordNotFound(format!("Job {id} not found"))),
        Err(e) => Err(e),
    }
}
