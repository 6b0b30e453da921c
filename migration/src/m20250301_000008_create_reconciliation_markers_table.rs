use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

/// Identifiers for the `reconciliation_markers` table and its columns.
#[derive(DeriveIden)]
enum ReconciliationMarkers {
    Table,
    Id,
    SessionId,
    Source,
    Payload,
    Attempts,
    LastError,
    CreatedAt,
    UpdatedAt,
    ResolvedAt,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ReconciliationMarkers::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ReconciliationMarkers::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(ReconciliationMarkers::SessionId)
                            .string()
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(ReconciliationMarkers::Source).string().not_null())
                    .col(ColumnDef::new(ReconciliationMarkers::Payload).text().not_null())
                    .col(
                        ColumnDef::new(ReconciliationMarkers::Attempts)
                            .integer()
                            .not_null()
                            .default(0),
                    )
                    .col(ColumnDef::new(ReconciliationMarkers::LastError).text().null())
                    .col(
                        ColumnDef::new(ReconciliationMarkers::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ReconciliationMarkers::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ReconciliationMarkers::ResolvedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(
                Table::drop()
                    .table(ReconciliationMarkers::Table)
                    .to_owned(),
            )
            .await
    }
}
