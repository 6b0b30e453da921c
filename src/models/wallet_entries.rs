use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    #[sea_orm(string_value = "credit")]
    Credit,
    #[sea_orm(string_value = "debit")]
    Debit,
}

/// SeaORM entity for the append-only `wallet_entries` ledger.
///
/// `amount` is signed. `reference_id` is the payment id for credits and the
/// withdrawal id for debits; `(kind, reference_id)` is unique.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "wallet_entries")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub user_id: Uuid,
    pub kind: EntryKind,
    pub amount: i64,
    pub reference_id: Uuid,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id"
    )]
    User,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Wallet view returned by GET /api/wallet.
#[derive(Debug, Clone, Serialize)]
pub struct WalletSummary {
    pub user_id: Uuid,
    pub balance: i64,
    /// Balance re-derived from the ledger entries.
    pub ledger_balance: i64,
    pub consistent: bool,
    pub withdrawable: Vec<super::payments::Model>,
}
