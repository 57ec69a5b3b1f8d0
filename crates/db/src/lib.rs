//! `jobsweep-db` -- Postgres persistence for scraped job batches.
//!
//! One table, `jobs`, shared by every source. The only write path is
//! the full-replace batch in [`repositories::JobRepo`]: all rows tagged
//! with a source are deleted and the fresh batch inserted in a single
//! transaction. [`backup`] provides the flat-file fallback used when
//! that write fails.

pub mod backup;
pub mod models;
pub mod repositories;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

/// Default connection pool size.
const MAX_CONNECTIONS: u32 = 5;

/// Connect to Postgres with the default pool configuration.
pub async fn connect(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .connect(database_url)
        .await
}

/// Create the `jobs` table if it does not exist.
///
/// The schema is owned by the scrapers themselves (there is no separate
/// migration pipeline), so every run is allowed to bootstrap an empty
/// database.
pub async fn ensure_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS jobs ( \
            id BIGSERIAL PRIMARY KEY, \
            job_title VARCHAR(255) NOT NULL, \
            company_name VARCHAR(255) NOT NULL, \
            company_logo TEXT, \
            salary VARCHAR(100), \
            posted_date DATE NOT NULL, \
            experience VARCHAR(100), \
            location VARCHAR(255), \
            apply_link TEXT NOT NULL, \
            description TEXT, \
            data_source VARCHAR(180) NOT NULL \
        )",
    )
    .execute(pool)
    .await?;
    Ok(())
}
