use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

/// Identifiers for the `milestones` table and its columns.
#[derive(DeriveIden)]
enum Milestones {
    Table,
    Id,
    ContractId,
    Position,
    Label,
    LabelKey,
    Amount,
    CompletedByFreelancer,
    CompletedAt,
    PaidAt,
    PaymentId,
}

#[derive(DeriveIden)]
enum Contracts {
    Table,
    Id,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(Milestones::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Milestones::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Milestones::ContractId).uuid().not_null())
                    .col(ColumnDef::new(Milestones::Position).integer().not_null())
                    .col(ColumnDef::new(Milestones::Label).string().not_null())
                    .col(ColumnDef::new(Milestones::LabelKey).string().not_null())
                    .col(ColumnDef::new(Milestones::Amount).big_integer().not_null())
                    .col(
                        ColumnDef::new(Milestones::CompletedByFreelancer)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(Milestones::CompletedAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .col(
                        ColumnDef::new(Milestones::PaidAt)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    // Denormalized pointer; `payments` owns the truth, so no FK here.
                    .col(ColumnDef::new(Milestones::PaymentId).uuid().null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_milestones_contract_id")
                            .from(Milestones::Table, Milestones::ContractId)
                            .to(Contracts::Table, Contracts::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_milestones_contract_label_unique")
                    .table(Milestones::Table)
                    .col(Milestones::ContractId)
                    .col(Milestones::LabelKey)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Milestones::Table).to_owned())
            .await
    }
}
