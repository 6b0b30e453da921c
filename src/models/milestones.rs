use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// SeaORM entity for the `milestones` table.
///
/// A milestone is identified on the wire by its label. `label_key` holds the
/// normalized label and is unique per contract. `paid_at` is the only source
/// of truth for "is this milestone paid" and is written once.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "milestones")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub contract_id: Uuid,
    pub position: i32,
    pub label: String,
    pub label_key: String,
    pub amount: i64,
    pub completed_by_freelancer: bool,
    pub completed_at: Option<DateTimeUtc>,
    pub paid_at: Option<DateTimeUtc>,
    pub payment_id: Option<Uuid>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::contracts::Entity",
        from = "Column::ContractId",
        to = "super::contracts::Column::Id"
    )]
    Contract,
}

impl Related<super::contracts::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Contract.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    pub fn is_paid(&self) -> bool {
        self.paid_at.is_some()
    }
}

/// Normalize a milestone label for matching: trimmed and lowercased.
pub fn label_key(label: &str) -> String {
    label.trim().to_lowercase()
}

#[derive(Debug, Clone, Serialize)]
pub struct MilestoneResponse {
    pub label: String,
    pub amount: i64,
    pub completed_by_freelancer: bool,
    pub completed_at: Option<DateTimeUtc>,
    pub paid_at: Option<DateTimeUtc>,
    pub payment_id: Option<Uuid>,
}

impl From<Model> for MilestoneResponse {
    fn from(m: Model) -> Self {
        Self {
            label: m.label,
            amount: m.amount,
            completed_by_freelancer: m.completed_by_freelancer,
            completed_at: m.completed_at,
            paid_at: m.paid_at,
            payment_id: m.payment_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::label_key;

    #[test]
    fn label_key_ignores_case_and_surrounding_whitespace() {
        assert_eq!(label_key("  Design Mockup "), "design mockup");
        assert_eq!(label_key("design mockup"), label_key("DESIGN MOCKUP"));
    }

    #[test]
    fn label_key_keeps_inner_whitespace() {
        assert_ne!(label_key("design  mockup"), label_key("design mockup"));
    }
}
