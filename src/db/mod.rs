pub mod entities;
pub mod schema;
pub mod services;

#[cfg(test)]
pub(crate) mod test_support;

use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};

/// Opens the connection pool used by every service function.
pub async fn connect(database_url: &str, max_connections: u32) -> Result<DatabaseConnection, DbErr> {
    let mut opt = ConnectOptions::new(database_url.to_owned());
    opt.max_connections(max_connections).sqlx_logging(false);
    Database::connect(opt).await
}
