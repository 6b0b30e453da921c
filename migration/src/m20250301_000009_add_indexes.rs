use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[derive(DeriveIden)]
enum Contracts {
    Table,
    ClientId,
    FreelancerId,
}

#[derive(DeriveIden)]
enum Payments {
    Table,
    ReceiverId,
    PayerId,
    Status,
}

#[derive(DeriveIden)]
enum WalletEntries {
    Table,
    UserId,
}

#[derive(DeriveIden)]
enum ReconciliationMarkers {
    Table,
    ResolvedAt,
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Contracts listed by either party
        manager
            .create_index(
                Index::create()
                    .name("idx_contracts_client_id")
                    .table(Contracts::Table)
                    .col(Contracts::ClientId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_contracts_freelancer_id")
                    .table(Contracts::Table)
                    .col(Contracts::FreelancerId)
                    .to_owned(),
            )
            .await?;

        // Withdrawable payments are looked up by receiver and status
        manager
            .create_index(
                Index::create()
                    .name("idx_payments_receiver_status")
                    .table(Payments::Table)
                    .col(Payments::ReceiverId)
                    .col(Payments::Status)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_payments_payer_id")
                    .table(Payments::Table)
                    .col(Payments::PayerId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_wallet_entries_user_id")
                    .table(WalletEntries::Table)
                    .col(WalletEntries::UserId)
                    .to_owned(),
            )
            .await?;

        // The retry sweep scans unresolved markers
        manager
            .create_index(
                Index::create()
                    .name("idx_reconciliation_markers_resolved_at")
                    .table(ReconciliationMarkers::Table)
                    .col(ReconciliationMarkers::ResolvedAt)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(Index::drop().name("idx_contracts_client_id").to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_contracts_freelancer_id").to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_payments_receiver_status").to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_payments_payer_id").to_owned())
            .await?;
        manager
            .drop_index(Index::drop().name("idx_wallet_entries_user_id").to_owned())
            .await?;
        manager
            .drop_index(
                Index::drop()
                    .name("idx_reconciliation_markers_resolved_at")
                    .to_owned(),
            )
            .await?;

        Ok(())
    }
}
