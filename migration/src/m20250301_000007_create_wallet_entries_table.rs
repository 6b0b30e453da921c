use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

/// Identifiers for the append-only `wallet_entries` ledger.
#[derive(DeriveIden)]
enum WalletEntries {
    Table,
    Id,
    UserId,
    Kind,
    Amount,
    ReferenceId,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Users {
    Table,
    Id,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(WalletEntries::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(WalletEntries::Id)
                            .uuid()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(WalletEntries::UserId).uuid().not_null())
                    .col(ColumnDef::new(WalletEntries::Kind).string().not_null())
                    .col(ColumnDef::new(WalletEntries::Amount).big_integer().not_null())
                    .col(ColumnDef::new(WalletEntries::ReferenceId).uuid().not_null())
                    .col(
                        ColumnDef::new(WalletEntries::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_wallet_entries_user_id")
                            .from(WalletEntries::Table, WalletEntries::UserId)
                            .to(Users::Table, Users::Id)
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // A payment can be credited once; a withdrawal can be debited once.
        manager
            .create_index(
                Index::create()
                    .name("idx_wallet_entries_kind_reference_unique")
                    .table(WalletEntries::Table)
                    .col(WalletEntries::Kind)
                    .col(WalletEntries::ReferenceId)
                    .unique()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(WalletEntries::Table).to_owned())
            .await
    }
}
