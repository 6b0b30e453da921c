pub use sea_orm_migration::prelude::*;

mod m20250301_000001_create_users_table;
mod m20250301_000002_create_jobs_table;
mod m20250301_000003_create_contracts_table;
mod m20250301_000004_create_milestones_table;
mod m20250301_000005_create_withdrawals_table;
mod m20250301_000006_create_payments_table;
mod m20250301_000007_create_wallet_entries_table;
mod m20250301_000008_create_reconciliation_markers_table;
mod m20250301_000009_add_indexes;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250301_000001_create_users_table::Migration),
            Box::new(m20250301_000002_create_jobs_table::Migration),
            Box::new(m20250301_000003_create_contracts_table::Migration),
            Box::new(m20250301_000004_create_milestones_table::Migration),
            Box::new(m20250301_000005_create_withdrawals_table::Migration),
            Box::new(m20250301_000006_create_payments_table::Migration),
            Box::new(m20250301_000007_create_wallet_entries_table::Migration),
            Box::new(m20250301_000008_create_reconciliation_markers_table::Migration),
            Box::new(m20250301_000009_add_indexes::Migration),
        ]
    }
}
