//! Repository for the `jobs` table.
//!
//! The write path is full-replace per source: a batch for one
//! `data_source` tag deletes every existing row with that tag and
//! inserts the fresh batch, atomically. There is no incremental merge.

use jobsweep_core::job::{DataSource, JobRecord};
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::models::JobRow;

/// Column list for `jobs` queries.
const COLUMNS: &str = "\
    id, job_title, company_name, company_logo, salary, posted_date, \
    experience, location, apply_link, description, data_source";

/// Rows per bulk INSERT statement. Ten binds per row keeps this well
/// under the Postgres parameter limit.
const INSERT_CHUNK: usize = 1000;

/// Result of a full-replace batch write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplaceOutcome {
    /// Rows deleted for the source before inserting.
    pub deleted: u64,
    /// Rows inserted from the new batch.
    pub inserted: u64,
}

/// Provides batch write and verification reads for scraped jobs.
pub struct JobRepo;

impl JobRepo {
    /// Replace all rows for `source` with the given batch.
    ///
    /// Runs inside one transaction: if any insert chunk fails, the
    /// delete rolls back and the previous batch stays intact. Records
    /// are defaulted via [`JobRecord::fill_defaults`] before binding so
    /// NOT NULL columns always receive a value.
    pub async fn replace_source(
        pool: &PgPool,
        source: DataSource,
        jobs: &[JobRecord],
    ) -> Result<ReplaceOutcome, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let deleted = sqlx::query("DELETE FROM jobs WHERE data_source = $1")
            .bind(source.tag())
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let mut inserted: u64 = 0;
        for chunk in jobs.chunks(INSERT_CHUNK) {
            let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
                "INSERT INTO jobs (job_title, company_name, company_logo, salary, \
                 posted_date, experience, location, apply_link, description, data_source) ",
            );
            builder.push_values(chunk, |mut row, job| {
                let mut job = job.clone();
                job.fill_defaults();
                row.push_bind(job.job_title)
                    .push_bind(job.company_name)
                    .push_bind(job.company_logo)
                    .push_bind(job.salary)
                    .push_bind(job.posted_date)
                    .push_bind(job.experience)
                    .push_bind(job.location)
                    .push_bind(job.apply_link)
                    .push_bind(job.description)
                    .push_bind(source.tag());
            });
            inserted += builder.build().execute(&mut *tx).await?.rows_affected();
        }

        tx.commit().await?;

        tracing::info!(
            source = %source,
            deleted,
            inserted,
            "Replaced job batch"
        );

        Ok(ReplaceOutcome { deleted, inserted })
    }

    /// Count rows currently stored for a source.
    pub async fn count_by_source(pool: &PgPool, source: DataSource) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM jobs WHERE data_source = $1")
                .bind(source.tag())
                .fetch_one(pool)
                .await?;
        Ok(count)
    }

    /// Fetch all rows for a source, newest posted first.
    pub async fn fetch_by_source(
        pool: &PgPool,
        source: DataSource,
    ) -> Result<Vec<JobRow>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM jobs WHERE data_source = $1 ORDER BY posted_date DESC, id ASC"
        );
        sqlx::query_as::<_, JobRow>(&query)
            .bind(source.tag())
            .fetch_all(pool)
            .await
    }
}
