use sea_orm::prelude::Expr;
use sea_orm::*;
use uuid::Uuid;

use crate::models::milestones::{self, label_key};

#[derive(Debug, Clone)]
pub struct NewMilestone {
    pub label: String,
    pub amount: i64,
}

/// Insert a contract's milestone schedule, preserving the given order.
pub async fn insert_milestones<C: ConnectionTrait>(
    db: &C,
    contract_id: Uuid,
    schedule: Vec<NewMilestone>,
) -> Result<Vec<milestones::Model>, DbErr> {
    let mut inserted = Vec::with_capacity(schedule.len());

    for (position, milestone) in schedule.into_iter().enumerate() {
        let label = milestone.label.trim().to_string();
        let row = milestones::ActiveModel {
            id: Set(Uuid::new_v4()),
            contract_id: Set(contract_id),
            position: Set(position as i32),
            label_key: Set(label_key(&label)),
            label: Set(label),
            amount: Set(milestone.amount),
            completed_by_freelancer: Set(false),
            completed_at: Set(None),
            paid_at: Set(None),
            payment_id: Set(None),
        };
        inserted.push(row.insert(db).await?);
    }

    Ok(inserted)
}

/// Fetch a contract's milestones in business order.
pub async fn get_milestones_by_contract<C: ConnectionTrait>(
    db: &C,
    contract_id: Uuid,
) -> Result<Vec<milestones::Model>, DbErr> {
    milestones::Entity::find()
        .filter(milestones::Column::ContractId.eq(contract_id))
        .order_by_asc(milestones::Column::Position)
        .all(db)
        .await
}

/// Find a milestone by label, trimmed and case-insensitive.
pub async fn find_by_label<C: ConnectionTrait>(
    db: &C,
    contract_id: Uuid,
    label: &str,
) -> Result<Option<milestones::Model>, DbErr> {
    milestones::Entity::find()
        .filter(milestones::Column::ContractId.eq(contract_id))
        .filter(milestones::Column::LabelKey.eq(label_key(label)))
        .one(db)
        .await
}

/// Set `completed_by_freelancer` on an unpaid milestone unless already set.
/// Returns whether this call set it.
pub async fn mark_completed<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<bool, DbErr> {
    let result = milestones::Entity::update_many()
        .col_expr(milestones::Column::CompletedByFreelancer, Expr::value(true))
        .col_expr(milestones::Column::CompletedAt, Expr::value(chrono::Utc::now()))
        .filter(milestones::Column::Id.eq(id))
        .filter(milestones::Column::CompletedByFreelancer.eq(false))
        .filter(milestones::Column::PaidAt.is_null())
        .exec(db)
        .await?;

    Ok(result.rows_affected == 1)
}

/// Compare-and-set `paid_at` from NULL. Returns `false` if the milestone was already paid.
pub async fn mark_paid<C: ConnectionTrait>(
    db: &C,
    id: Uuid,
    payment_id: Uuid,
) -> Result<bool, DbErr> {
    let result = milestones::Entity::update_many()
        .col_expr(milestones::Column::PaidAt, Expr::value(chrono::Utc::now()))
        .col_expr(milestones::Column::PaymentId, Expr::value(payment_id))
        .filter(milestones::Column::Id.eq(id))
        .filter(milestones::Column::PaidAt.is_null())
        .exec(db)
        .await?;

    Ok(result.rows_affected == 1)
}

/// Number of milestones on a contract that are still unpaid.
pub async fn count_unpaid<C: ConnectionTrait>(db: &C, contract_id: Uuid) -> Result<u64, DbErr> {
    milestones::Entity::find()
        .filter(milestones::Column::ContractId.eq(contract_id))
        .filter(milestones::Column::PaidAt.is_null())
        .count(db)
        .await
}
