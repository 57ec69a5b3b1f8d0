//! Per-board pipeline: scrape, filter, persist, notify.

use std::path::Path;
use std::time::Instant;

use jobsweep_core::job::{dedup_by_apply_link, DataSource, JobRecord};
use jobsweep_core::salary::parse_salary;
use jobsweep_db::backup::write_backup;
use jobsweep_db::repositories::JobRepo;
use jobsweep_notify::telegram::{RunStats, TelegramNotifier};
use jobsweep_sources::{
    CvLibrarySource, GlassdoorSource, JobSource, LinkedinSource, NhsSource, ReedSource,
    ScrapeContext, SimplyHiredSource, TotalJobsSource,
};
use sqlx::PgPool;

/// Batches smaller than this are logged loudly; a near-empty batch
/// usually means a board changed its markup rather than a quiet day.
const LOW_COUNT_WARNING: usize = 5;

/// Scraper registry.
pub fn build_source(source: DataSource) -> Box<dyn JobSource> {
    match source {
        DataSource::CvLibrary => Box::new(CvLibrarySource::new()),
        DataSource::Reed => Box::new(ReedSource::new()),
        DataSource::Linkedin => Box::new(LinkedinSource::new()),
        DataSource::Glassdoor => Box::new(GlassdoorSource::new()),
        DataSource::Nhs => Box::new(NhsSource::new()),
        DataSource::SimplyHired => Box::new(SimplyHiredSource::new()),
        DataSource::TotalJobs => Box::new(TotalJobsSource::new()),
    }
}

/// Drop jobs whose parsed salary falls under the annual floor.
///
/// Unparseable or missing salaries are kept; boards filtered by their
/// own search query report salaries in too many shapes to risk false
/// negatives.
pub fn apply_salary_floor(jobs: &mut Vec<JobRecord>, floor: u32) {
    jobs.retain(|job| {
        match job.salary.as_deref().and_then(parse_salary) {
            Some(range) => range.meets_annual_floor(floor),
            None => true,
        }
    });
}

/// Run one board end to end. Returns whether the batch was persisted.
pub async fn run_source(
    pool: &PgPool,
    notifier: &TelegramNotifier,
    ctx: &ScrapeContext<'_>,
    backup_dir: &Path,
    scraper: &dyn JobSource,
) -> bool {
    let source = scraper.source();
    notifier.notify_start(source).await;
    let started = Instant::now();

    let mut jobs = match scraper.fetch(ctx).await {
        Ok(jobs) => jobs,
        Err(e) => {
            tracing::error!(source = %source, error = %e, "Scrape failed");
            notifier
                .notify_failure(&format!("{source} scraper"), &e.to_string())
                .await;
            return false;
        }
    };

    let scraped = jobs.len();
    apply_salary_floor(&mut jobs, ctx.min_annual_salary);
    for job in &mut jobs {
        job.fill_defaults();
    }
    let jobs = dedup_by_apply_link(jobs);

    // An empty batch would wipe the source's stored rows and insert
    // nothing; keep the previous batch instead.
    if jobs.is_empty() {
        tracing::warn!(
            source = %source,
            scraped,
            "Empty batch after filtering, keeping existing rows"
        );
        notifier
            .notify_failure(
                &format!("{source} scraper"),
                "batch was empty after filtering, existing rows kept",
            )
            .await;
        return false;
    }

    if jobs.len() < LOW_COUNT_WARNING {
        tracing::warn!(
            source = %source,
            scraped,
            matched = jobs.len(),
            "Very small batch, the board markup may have changed"
        );
    }

    match JobRepo::replace_source(pool, source, &jobs).await {
        Ok(outcome) => {
            let stats = RunStats {
                scraped,
                deleted: outcome.deleted,
                inserted: outcome.inserted,
                duration_secs: started.elapsed().as_secs_f64(),
            };
            tracing::info!(
                source = %source,
                scraped,
                deleted = outcome.deleted,
                inserted = outcome.inserted,
                "Source batch persisted"
            );
            notifier.notify_success(source, &stats).await;
            true
        }
        Err(e) => {
            tracing::error!(source = %source, error = %e, "Database write failed");
            match write_backup(backup_dir, source, &jobs) {
                Ok(path) => {
                    tracing::info!(source = %source, path = %path.display(), "Batch saved to backup file")
                }
                Err(backup_err) => {
                    tracing::error!(source = %source, error = %backup_err, "Backup write failed")
                }
            }
            notifier
                .notify_failure(&format!("{source} database write"), &e.to_string())
                .await;
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn job(salary: Option<&str>) -> JobRecord {
        JobRecord {
            job_title: "Engineer".to_string(),
            company_name: "Acme".to_string(),
            company_logo: None,
            salary: salary.map(str::to_string),
            posted_date: NaiveDate::from_ymd_opt(2025, 4, 22).unwrap(),
            experience: None,
            location: None,
            apply_link: "https://example.com/job/1".to_string(),
            description: None,
            source: DataSource::Reed,
        }
    }

    #[test]
    fn salary_floor_drops_underpaying_jobs() {
        let mut jobs = vec![
            job(Some("£25,000 per annum")),
            job(Some("£45,000 - £55,000")),
            job(None),
            job(Some("Competitive")),
        ];
        apply_salary_floor(&mut jobs, 30_000);
        assert_eq!(jobs.len(), 3, "only the parseable under-floor job is dropped");
    }

    #[test]
    fn registry_covers_every_board() {
        for source in DataSource::ALL {
            assert_eq!(build_source(source).source(), source);
        }
    }

    struct EmptyBoard;

    #[async_trait::async_trait]
    impl JobSource for EmptyBoard {
        fn source(&self) -> DataSource {
            DataSource::Reed
        }

        async fn fetch(
            &self,
            _ctx: &ScrapeContext<'_>,
        ) -> Result<Vec<JobRecord>, jobsweep_sources::SourceError> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn empty_batch_keeps_existing_rows() {
        // Lazy pool against an unreachable port: any query attempt
        // would fail and write a backup file, so a clean backup dir
        // proves the guard returned before touching the database.
        let pool = sqlx::postgres::PgPoolOptions::new()
            .connect_lazy("postgres://localhost:1/jobsweep_unreachable")
            .unwrap();
        let allowlist = jobsweep_core::allowlist::CompanyAllowlist::from_names(["Acme"]);
        let ctx = ScrapeContext {
            allowlist: &allowlist,
            min_annual_salary: 30_000,
            max_pages: None,
        };
        let notifier = TelegramNotifier::new(None);
        let backup_dir = std::env::temp_dir().join("jobsweep_empty_batch_guard");
        std::fs::remove_dir_all(&backup_dir).ok();

        let persisted = run_source(&pool, &notifier, &ctx, &backup_dir, &EmptyBoard).await;

        assert!(!persisted);
        assert!(!backup_dir.exists(), "nothing should be written on skip");
    }
}
