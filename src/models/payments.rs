use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Payment status stored as a lowercase string in the database.
///
/// `Pending` marks a confirmed charge that could not be applied to its
/// milestone (already paid by another session). It is held for manual
/// refund and never credited or withdrawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "withdrawn")]
    Withdrawn,
}

/// SeaORM entity for the `payments` table.
///
/// One row per money movement confirmed by the gateway. `stripe_session_id`
/// is uniquely indexed and is what makes reconciliation idempotent.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "payments")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub contract_id: Uuid,
    pub payer_id: Uuid,
    pub receiver_id: Uuid,
    pub amount: i64,
    #[sea_orm(unique)]
    pub stripe_session_id: String,
    pub milestone_label: String,
    pub status: PaymentStatus,
    pub withdrawal_id: Option<Uuid>,
    pub withdrawn_at: Option<DateTimeUtc>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::contracts::Entity",
        from = "Column::ContractId",
        to = "super::contracts::Column::Id"
    )]
    Contract,
    #[sea_orm(
        belongs_to = "super::withdrawals::Entity",
        from = "Column::WithdrawalId",
        to = "super::withdrawals::Column::Id"
    )]
    Withdrawal,
}

impl Related<super::contracts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Contract.def()
    }
}

impl Related<super::withdrawals::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Withdrawal.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

// ── DTOs ──

#[derive(Debug, Clone)]
pub struct CreatePayment {
    pub id: Uuid,
    pub contract_id: Uuid,
    pub payer_id: Uuid,
    pub receiver_id: Uuid,
    pub amount: i64,
    pub stripe_session_id: String,
    pub milestone_label: String,
}

/// Request body for POST /api/payments/checkout.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutRequest {
    pub contract_id: Uuid,
    pub milestone_label: String,
    pub amount: f64,
}

/// Query string for GET /api/payments/verify.
#[derive(Debug, Clone, Deserialize)]
pub struct VerifyQuery {
    pub session_id: String,
}
