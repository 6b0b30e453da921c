use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

use super::milestones::MilestoneResponse;

/// Contract status stored as a lowercase string in the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

/// SeaORM entity for the `contracts` table.
///
/// `job_id`, `client_id` and `freelancer_id` never change after insert.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "contracts")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub job_id: Uuid,
    pub client_id: Uuid,
    pub freelancer_id: Uuid,
    pub status: Status,
    pub start_date: Option<DateTimeUtc>,
    pub end_date: Option<DateTimeUtc>,
    pub created_at: DateTimeUtc,
    pub updated_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::jobs::Entity",
        from = "Column::JobId",
        to = "super::jobs::Column::Id"
    )]
    Job,
    #[sea_orm(has_many = "super::milestones::Entity")]
    Milestones,
    #[sea_orm(has_many = "super::payments::Entity")]
    Payments,
}

impl Related<super::jobs::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Job.def()
    }
}

impl Related<super::milestones::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Milestones.def()
    }
}

impl Related<super::payments::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Payments.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Whether `user_id` is the client or the freelancer on this contract.
    pub fn is_party(&self, user_id: Uuid) -> bool {
        self.client_id == user_id || self.freelancer_id == user_id
    }

    /// The other party on the contract, if `user_id` is one of them.
    pub fn counterparty(&self, user_id: Uuid) -> Option<Uuid> {
        if user_id == self.client_id {
            Some(self.freelancer_id)
        } else if user_id == self.freelancer_id {
            Some(self.client_id)
        } else {
            None
        }
    }
}

// ── DTOs ──

/// One milestone in an accepted proposal.
#[derive(Debug, Clone, Deserialize)]
pub struct MilestoneInput {
    pub label: String,
    pub amount: f64,
}

/// The "accepted proposal" event from the job registry.
#[derive(Debug, Clone, Deserialize)]
pub struct ProposalAccepted {
    pub job_id: Uuid,
    /// Title to register the job under the first time it is seen.
    #[serde(default)]
    pub job_title: Option<String>,
    pub freelancer_id: Uuid,
    pub milestones: Vec<MilestoneInput>,
    pub start_date: Option<DateTimeUtc>,
    pub end_date: Option<DateTimeUtc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateContractStatus {
    pub status: Status,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CompleteMilestone {
    pub label: String,
}

/// A contract together with its ordered milestone schedule.
#[derive(Debug, Clone, Serialize)]
pub struct ContractResponse {
    pub id: Uuid,
    pub job_id: Uuid,
    pub client_id: Uuid,
    pub freelancer_id: Uuid,
    pub status: Status,
    pub start_date: Option<DateTimeUtc>,
    pub end_date: Option<DateTimeUtc>,
    pub milestone_payments: Vec<MilestoneResponse>,
    pub created_at: DateTimeUtc,
    pub updated_at: Option<DateTimeUtc>,
}

impl ContractResponse {
    pub fn new(contract: Model, milestones: Vec<super::milestones::Model>) -> Self {
        Self {
            id: contract.id,
            job_id: contract.job_id,
            client_id: contract.client_id,
            freelancer_id: contract.freelancer_id,
            status: contract.status,
            start_date: contract.start_date,
            end_date: contract.end_date,
            milestone_payments: milestones.into_iter().map(MilestoneResponse::from).collect(),
            created_at: contract.created_at,
            updated_at: contract.updated_at,
        }
    }
}
