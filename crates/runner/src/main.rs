//! `jobsweep-runner` -- scrape every configured job board and replace
//! its batch in the database.
//!
//! Each board runs in turn: scrape, filter against the sponsor
//! allowlist and salary floor, then swap the board's rows inside one
//! transaction. A failed board never blocks the others; failed batches
//! land in a flat-file backup instead.
//!
//! # Environment variables
//!
//! | Variable             | Required | Default       | Description                                  |
//! |----------------------|----------|---------------|----------------------------------------------|
//! | `DATABASE_URL`       | yes      | --            | Postgres connection string                   |
//! | `ALLOWLIST_CSV`      | yes      | --            | Sponsor register CSV (`Organisation Name`)   |
//! | `SOURCES`            | no       | all           | Comma-separated board tags, e.g. `reed,nhs`  |
//! | `MIN_ANNUAL_SALARY`  | no       | `30000`       | Annual salary floor in GBP                   |
//! | `MAX_PAGES`          | no       | --            | Cap on result pages per board                |
//! | `BACKUP_DIR`         | no       | `data/backup` | Directory for failed-batch JSON files        |
//! | `TELEGRAM_BOT_TOKEN` | no       | --            | Enables Telegram run notifications           |

mod config;
mod run;

use jobsweep_core::allowlist::CompanyAllowlist;
use jobsweep_notify::telegram::TelegramNotifier;
use jobsweep_sources::ScrapeContext;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use config::RunnerConfig;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "jobsweep_runner=info,jobsweep_sources=info,jobsweep_db=info,jobsweep_notify=info"
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = RunnerConfig::from_env().unwrap_or_else(|e| {
        tracing::error!(error = %e, "Invalid configuration");
        std::process::exit(1);
    });

    let allowlist = CompanyAllowlist::from_csv(&config.allowlist_csv).unwrap_or_else(|e| {
        tracing::error!(path = %config.allowlist_csv.display(), error = %e, "Failed to load allowlist");
        std::process::exit(1);
    });
    tracing::info!(companies = allowlist.len(), "Loaded sponsor allowlist");

    let pool = jobsweep_db::connect(&config.database_url)
        .await
        .unwrap_or_else(|e| {
            tracing::error!(error = %e, "Failed to connect to database");
            std::process::exit(1);
        });
    if let Err(e) = jobsweep_db::ensure_schema(&pool).await {
        tracing::error!(error = %e, "Failed to ensure database schema");
        std::process::exit(1);
    }

    let notifier = TelegramNotifier::new(config.telegram_bot_token.clone());
    if !notifier.is_enabled() {
        tracing::info!("Telegram notifications disabled (no bot token)");
    }

    let ctx = ScrapeContext {
        allowlist: &allowlist,
        min_annual_salary: config.min_annual_salary,
        max_pages: config.max_pages,
    };

    tracing::info!(
        sources = config.sources.len(),
        min_annual_salary = config.min_annual_salary,
        "Starting run"
    );

    let mut succeeded = 0usize;
    for source in &config.sources {
        let scraper = run::build_source(*source);
        if run::run_source(&pool, &notifier, &ctx, &config.backup_dir, scraper.as_ref()).await {
            succeeded += 1;
        }
    }

    tracing::info!(
        succeeded,
        failed = config.sources.len() - succeeded,
        "Run complete"
    );

    if succeeded == 0 {
        std::process::exit(1);
    }
}
