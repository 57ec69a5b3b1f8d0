//! `jobsweep-sources` -- one scraper per UK job board.
//!
//! Every board implements the same loop: paginate a search result set
//! (plain HTTP for JSON/HTML endpoints, a headless browser for
//! infinite-scroll boards), parse listings into
//! [`jobsweep_core::job::JobRecord`], and filter against the sponsor
//! allowlist. Board differences live entirely inside their modules:
//! selectors, endpoint shapes, and anti-bot workarounds.

pub mod browser;
pub mod cvlibrary;
pub mod fetch;
pub mod glassdoor;
pub mod linkedin;
pub mod nhs;
pub mod reed;
pub mod simplyhired;
pub mod totaljobs;

use jobsweep_core::allowlist::CompanyAllowlist;
use jobsweep_core::job::{DataSource, JobRecord};

pub use cvlibrary::CvLibrarySource;
pub use glassdoor::GlassdoorSource;
pub use linkedin::LinkedinSource;
pub use nhs::NhsSource;
pub use reed::ReedSource;
pub use simplyhired::SimplyHiredSource;
pub use totaljobs::TotalJobsSource;

/// Errors from a board scrape.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// The HTTP request itself failed (network, DNS, TLS, timeout).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The board returned a non-2xx status code.
    #[error("Board returned HTTP {status} for {url}")]
    Status { status: u16, url: String },

    /// The page content indicates a captcha or IP block.
    #[error("Captcha or IP block detected at {0}")]
    Blocked(String),

    /// Headless-browser automation failed.
    #[error("Browser automation failed: {0}")]
    Browser(String),

    /// The page structure did not match the expected selectors.
    #[error("Failed to parse listings: {0}")]
    Parse(String),
}

/// Inputs shared by every source fetch.
pub struct ScrapeContext<'a> {
    /// Sponsor company allowlist; only matching employers are kept.
    pub allowlist: &'a CompanyAllowlist,
    /// Annual salary floor applied where the board query cannot.
    pub min_annual_salary: u32,
    /// Optional cap on result pages, for bounded runs.
    pub max_pages: Option<u32>,
}

/// A scraper for one job board.
#[async_trait::async_trait]
pub trait JobSource: Send + Sync {
    /// The tag this scraper's records carry.
    fn source(&self) -> DataSource;

    /// Scrape the board and return allowlist-matched records.
    ///
    /// Implementations tolerate individual bad pages and listings
    /// (logged and skipped); they only fail when the board as a whole is
    /// unreachable or blocking.
    async fn fetch(&self, ctx: &ScrapeContext<'_>) -> Result<Vec<JobRecord>, SourceError>;
}
