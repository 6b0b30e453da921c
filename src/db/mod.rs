pub mod contracts;
pub mod jobs;
pub mod milestones;
pub mod payments;
pub mod reconciliations;
pub mod users;
pub mod wallet;
pub mod withdrawals;

use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};

/// Create a SeaORM database connection pool for `database_url`.
pub async fn create_pool(database_url: &str) -> Result<DatabaseConnection, DbErr> {
    let mut options = ConnectOptions::new(database_url);
    options.sqlx_logging(false);
    Database::connect(options).await
}
