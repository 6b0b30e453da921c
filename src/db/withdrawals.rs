use sea_orm::prelude::Expr;
use sea_orm::*;
use uuid::Uuid;

use crate::models::withdrawals;

/// Insert a withdrawal with a zero amount; the amount is set once payments are claimed.
pub async fn insert_withdrawal<C: ConnectionTrait>(
    db: &C,
    freelancer_id: Uuid,
    request_key: Option<Uuid>,
) -> Result<withdrawals::Model, DbErr> {
    let new_withdrawal = withdrawals::ActiveModel {
        id: Set(Uuid::new_v4()),
        freelancer_id: Set(freelancer_id),
        amount: Set(0),
        request_key: Set(request_key),
        created_at: Set(chrono::Utc::now()),
    };

    new_withdrawal.insert(db).await
}

pub async fn set_amount<C: ConnectionTrait>(db: &C, id: Uuid, amount: i64) -> Result<(), DbErr> {
    withdrawals::Entity::update_many()
        .col_expr(withdrawals::Column::Amount, Expr::value(amount))
        .filter(withdrawals::Column::Id.eq(id))
        .exec(db)
        .await?;
    Ok(())
}

/// Fetch a withdrawal by its client-supplied request key.
pub async fn get_by_request_key<C: ConnectionTrait>(
    db: &C,
    request_key: Uuid,
) -> Result<Option<withdrawals::Model>, DbErr> {
    withdrawals::Entity::find()
        .filter(withdrawals::Column::RequestKey.eq(request_key))
        .one(db)
        .await
}

/// A freelancer's withdrawals, newest first.
pub async fn get_withdrawals_by_freelancer<C: ConnectionTrait>(
    db: &C,
    freelancer_id: Uuid,
) -> Result<Vec<withdrawals::Model>, DbErr> {
    withdrawals::Entity::find()
        .filter(withdrawals::Column::FreelancerId.eq(freelancer_id))
        .order_by_desc(withdrawals::Column::CreatedAt)
        .all(db)
        .await
}
