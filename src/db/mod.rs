pub mod history;
pub mod models;

use std::time::Duration;

use anyhow::{Context, Result};
use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::info;

/// How long a consumer waits for a pooled connection before the archive
/// write fails and the message is left for redelivery.
pub const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(5);

fn pool_options(max_connections: u32) -> PgPoolOptions {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(ACQUIRE_TIMEOUT)
}

pub async fn create_pool(database_url: &str, max_connections: u32) -> Result<PgPool> {
    let pool = pool_options(max_connections)
        .connect(database_url)
        .await
        .context("failed to connect to the history database")?;
    info!(max_connections, "History database pool ready");
    Ok(pool)
}

/// Applies the embedded `sensor_data_history` migrations.
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("failed to run history migrations")?;
    info!("History migrations applied");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_options_bound_connections_and_waits() {
        let options = pool_options(4);
        assert_eq!(options.get_max_connections(), 4);
        assert_eq!(options.get_acquire_timeout(), ACQUIRE_TIMEOUT);
    }
}
