use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Which producer delivered a payment confirmation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumIter, DeriveActiveEnum)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "lowercase")]
pub enum ConfirmationSource {
    #[sea_orm(string_value = "webhook")]
    Webhook,
    #[sea_orm(string_value = "redirect")]
    Redirect,
    #[sea_orm(string_value = "retry")]
    Retry,
}

/// SeaORM entity for `reconciliation_markers`.
///
/// A marker is written before a confirmation is applied and resolved after
/// it commits, so a failed attempt is never lost. `payload` is the JSON of
/// the confirmed session.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "reconciliation_markers")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub session_id: String,
    pub source: ConfirmationSource,
    #[sea_orm(column_type = "Text")]
    pub payload: String,
    pub attempts: i32,
    #[sea_orm(column_type = "Text", nullable)]
    pub last_error: Option<String>,
    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
    pub resolved_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
