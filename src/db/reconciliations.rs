use sea_orm::prelude::Expr;
use sea_orm::sea_query::ExprTrait;
use sea_orm::*;
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::reconciliations::{self, ConfirmationSource};

/// Persist a pending marker for `session_id` unless one already exists.
pub async fn record_pending<C: ConnectionTrait>(
    db: &C,
    session_id: &str,
    source: ConfirmationSource,
    payload: String,
) -> Result<(), DbErr> {
    if get_marker(db, session_id).await?.is_some() {
        return Ok(());
    }

    let now = chrono::Utc::now();
    let marker = reconciliations::ActiveModel {
        id: Set(Uuid::new_v4()),
        session_id: Set(session_id.to_string()),
        source: Set(source),
        payload: Set(payload),
        attempts: Set(0),
        last_error: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
        resolved_at: Set(None),
    };

    match marker.insert(db).await {
        Ok(_) => Ok(()),
        // A concurrent producer wrote it first.
        Err(e) if AppError::is_unique_violation(&e) => Ok(()),
        Err(e) => Err(e),
    }
}

pub async fn get_marker<C: ConnectionTrait>(
    db: &C,
    session_id: &str,
) -> Result<Option<reconciliations::Model>, DbErr> {
    reconciliations::Entity::find()
        .filter(reconciliations::Column::SessionId.eq(session_id))
        .one(db)
        .await
}

/// Mark the session's marker resolved (idempotent).
pub async fn mark_resolved<C: ConnectionTrait>(db: &C, session_id: &str) -> Result<(), DbErr> {
    let now = chrono::Utc::now();
    reconciliations::Entity::update_many()
        .col_expr(reconciliations::Column::ResolvedAt, Expr::value(now))
        .col_expr(reconciliations::Column::UpdatedAt, Expr::value(now))
        .col_expr(
            reconciliations::Column::Attempts,
            Expr::col(reconciliations::Column::Attempts).add(1),
        )
        .col_expr(
            reconciliations::Column::LastError,
            Expr::value(Option::<String>::None),
        )
        .filter(reconciliations::Column::SessionId.eq(session_id))
        .filter(reconciliations::Column::ResolvedAt.is_null())
        .exec(db)
        .await?;
    Ok(())
}

/// Record a failed attempt so the retry sweep picks the session up again.
pub async fn record_failure<C: ConnectionTrait>(
    db: &C,
    session_id: &str,
    error: &str,
) -> Result<(), DbErr> {
    reconciliations::Entity::update_many()
        .col_expr(
            reconciliations::Column::Attempts,
            Expr::col(reconciliations::Column::Attempts).add(1),
        )
        .col_expr(
            reconciliations::Column::LastError,
            Expr::value(error.to_string()),
        )
        .col_expr(
            reconciliations::Column::UpdatedAt,
            Expr::value(chrono::Utc::now()),
        )
        .filter(reconciliations::Column::SessionId.eq(session_id))
        .exec(db)
        .await?;
    Ok(())
}

/// Unresolved markers with fewer than `max_attempts` attempts, oldest first.
pub async fn get_unresolved<C: ConnectionTrait>(
    db: &C,
    max_attempts: i32,
    limit: u64,
) -> Result<Vec<reconciliations::Model>, DbErr> {
    reconciliations::Entity::find()
        .filter(reconciliations::Column::ResolvedAt.is_null())
        .filter(reconciliations::Column::Attempts.lt(max_attempts))
        .order_by_asc(reconciliations::Column::CreatedAt)
        .limit(limit)
        .all(db)
        .await
}
