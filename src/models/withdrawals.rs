use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// SeaORM entity for the `withdrawals` table.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "withdrawals")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub freelancer_id: Uuid,
    pub amount: i64,
    #[sea_orm(unique)]
    pub request_key: Option<Uuid>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::FreelancerId",
        to = "super::users::Column::Id"
    )]
    Freelancer,
    #[sea_orm(has_many = "super::payments::Entity")]
    Payments,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Freelancer.def()
    }
}

impl Related<super::payments::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Payments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

// ── DTOs ──

/// Request body for POST /api/withdrawals.
///
/// `payment_ids` is optional on the wire so a missing list reports the same
/// validation error as an empty one.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct WithdrawalRequest {
    #[serde(default)]
    pub payment_ids: Option<Vec<Uuid>>,
    pub request_id: Option<Uuid>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WithdrawalResponse {
    pub withdrawal: Model,
    pub payment_ids: Vec<Uuid>,
    /// True when `request_id` matched an earlier withdrawal and nothing was applied.
    pub replayed: bool,
}
