//! Database bootstrap.
//!
//! SYSTEM CONTEXT
//! ==============
//! Every mutation event the relay accepts turns into a single-statement
//! read or write against the scene tables, so the pool is created and the
//! schema migrated once here, before the websocket endpoint accepts its
//! first upgrade. Pool sizing is a startup decision and comes in from the
//! caller rather than being read from the environment here.

use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

/// Connect to Postgres and bring the schema up to date.
///
/// # Errors
///
/// Returns an error if the connection or a migration fails.
pub async fn init_pool(database_url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await?;

    sqlx::migrate!("src/db/migrations").run(&pool).await?;

    Ok(pool)
}
