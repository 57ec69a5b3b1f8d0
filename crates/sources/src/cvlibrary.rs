//! CV-Library scraper.
//!
//! The search results are server-rendered HTML with every listing field
//! exposed as `data-*` attributes on the card's `article`, so the whole
//! board is plain HTTP: read the total job count from the search header,
//! fan out over result pages with bounded concurrency, then pull
//! descriptions for allowlist-matched jobs from the detail page's
//! JSON-LD `JobPosting` block.

use std::sync::OnceLock;

use chrono::{NaiveDate, Utc};
use futures::{stream, StreamExt};
use jobsweep_core::dates::parse_posted_date;
use jobsweep_core::job::{DataSource, JobRecord};
use jobsweep_core::salary::is_non_annual_rate;
use regex::Regex;
use scraper::{Html, Selector};
use url::Url;

use crate::fetch::PageClient;
use crate::{JobSource, ScrapeContext, SourceError};

const BASE_URL: &str = "https://www.cv-library.co.uk";

/// Listings per result page (`perpage` query parameter).
const JOBS_PER_PAGE: u32 = 100;

/// Concurrent result-page fetches.
const MAX_CONCURRENT_PAGES: usize = 15;

/// Concurrent detail-page fetches for descriptions.
const MAX_CONCURRENT_DETAILS: usize = 5;

/// Annual salary bands 3-8 on the search form; the board has no free
/// minimum-salary parameter.
const SALARY_BAND_QUERY: &str =
    "salary_annual=3&salary_annual=4&salary_annual=5&salary_annual=6&salary_annual=7&salary_annual=8";

fn total_jobs_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"Search ([\d,]+) jobs").expect("static regex"))
}

fn sel(selector: &str) -> Selector {
    Selector::parse(selector).expect("static selector")
}

/// Read the total job count from the search header ("Search N jobs").
pub fn parse_total_jobs(html: &str) -> Option<u32> {
    let document = Html::parse_document(html);
    let header = document
        .select(&sel("div.search-nav-actions__left p"))
        .next()?;
    let text: String = header.text().collect();
    let caps = total_jobs_pattern().captures(&text)?;
    caps[1].replace(',', "").parse().ok()
}

/// Truncate an apply link at its `/apply` path segment, keeping the
/// listing URL itself (`.../job/12345/apply/...` -> `.../job/12345/`).
fn normalize_apply_link(href: &str) -> String {
    let absolute = if href.starts_with('/') {
        format!("{BASE_URL}{href}")
    } else {
        href.to_string()
    };

    let Ok(parsed) = Url::parse(&absolute) else {
        return absolute;
    };
    let segments: Vec<&str> = parsed.path().split('/').collect();
    let Some(apply_index) = segments.iter().position(|s| *s == "apply") else {
        return absolute;
    };
    let path = segments[..apply_index].join("/");
    format!(
        "{}://{}{}/",
        parsed.scheme(),
        parsed.host_str().unwrap_or_default(),
        path
    )
}

/// Parse one result page into records (descriptions come later).
///
/// Listings priced per hour or per day are dropped here; everything else
/// is returned and the caller applies the allowlist.
pub fn parse_listing_page(html: &str, today: NaiveDate) -> Vec<JobRecord> {
    let document = Html::parse_document(html);
    let card_sel = sel("ol#searchResults li.results__item");
    let article_sel = sel("article");
    let logo_sel = sel("img.job__logo");
    let apply_sel = sel(r#"a.cvl-btn[href*="/apply"]"#);

    let mut jobs = Vec::new();
    for card in document.select(&card_sel) {
        let Some(article) = card.select(&article_sel).next() else {
            continue;
        };
        let attr = |name: &str| article.value().attr(name).unwrap_or("").trim().to_string();

        let title = attr("data-job-title");
        let company = attr("data-company-name");
        let location = attr("data-job-location");
        let salary = attr("data-job-salary");
        let job_type = attr("data-job-type");
        let posted = attr("data-job-posted");
        let job_id = attr("data-job-id");

        if is_non_annual_rate(&salary) {
            continue;
        }

        let job_url = if job_id.is_empty() {
            String::new()
        } else {
            format!("{BASE_URL}/job/{job_id}")
        };

        let apply_link = card
            .select(&apply_sel)
            .next()
            .and_then(|a| a.value().attr("href"))
            .map(normalize_apply_link)
            .unwrap_or_else(|| job_url.clone());
        if apply_link.is_empty() {
            continue;
        }

        let company_logo = card
            .select(&logo_sel)
            .next()
            .and_then(|img| img.value().attr("data-src"))
            .map(str::to_string);

        jobs.push(JobRecord {
            job_title: title,
            company_name: company,
            company_logo,
            salary: if salary.is_empty() { None } else { Some(salary) },
            posted_date: parse_posted_date(&posted, today),
            experience: if job_type.is_empty() { None } else { Some(job_type) },
            location: if location.is_empty() { None } else { Some(location) },
            apply_link,
            description: None,
            source: DataSource::CvLibrary,
        });
    }
    jobs
}

/// Pull the job description out of a detail page's JSON-LD blocks.
pub fn extract_jobposting_description(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let script_sel = sel(r#"script[type="application/ld+json"]"#);

    for script in document.select(&script_sel) {
        let raw: String = script.text().collect();
        let Ok(data) = serde_json::from_str::<serde_json::Value>(&raw) else {
            continue;
        };
        if data.get("@type").and_then(|t| t.as_str()) == Some("JobPosting") {
            if let Some(description) = data.get("description").and_then(|d| d.as_str()) {
                if !description.is_empty() {
                    return Some(description.to_string());
                }
            }
        }
    }
    None
}

/// Scraper for cv-library.co.uk.
pub struct CvLibrarySource {
    client: PageClient,
}

impl CvLibrarySource {
    pub fn new() -> Self {
        Self {
            client: PageClient::desktop(),
        }
    }

    fn search_url(page: u32) -> String {
        format!(
            "{BASE_URL}/permanent-jobs-in-uk?perpage={JOBS_PER_PAGE}&page={page}&distance=750&us=1&{SALARY_BAND_QUERY}"
        )
    }

    /// Fetch and parse one result page; failures log and yield nothing
    /// so one bad page never sinks the run.
    async fn scrape_page(&self, page: u32, today: NaiveDate) -> Vec<JobRecord> {
        let url = Self::search_url(page);
        match self.client.get_html(&url).await {
            Ok(html) => {
                let jobs = parse_listing_page(&html, today);
                tracing::debug!(page, count = jobs.len(), "Scraped cv-library page");
                jobs
            }
            Err(e) => {
                tracing::warn!(page, error = %e, "Failed to scrape cv-library page");
                Vec::new()
            }
        }
    }

    /// Fetch the detail page and attach a description, best effort.
    async fn fill_description(&self, mut job: JobRecord) -> JobRecord {
        match self.client.get_html(&job.apply_link).await {
            Ok(html) => job.description = extract_jobposting_description(&html),
            Err(e) => {
                tracing::debug!(url = %job.apply_link, error = %e, "No description for listing")
            }
        }
        job
    }
}

impl Default for CvLibrarySource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl JobSource for CvLibrarySource {
    fn source(&self) -> DataSource {
        DataSource::CvLibrary
    }

    async fn fetch(&self, ctx: &ScrapeContext<'_>) -> Result<Vec<JobRecord>, SourceError> {
        let today = Utc::now().date_naive();

        let first = self.client.get_html(&format!("{BASE_URL}/jobs-in-uk")).await?;
        let total = parse_total_jobs(&first).ok_or_else(|| {
            SourceError::Parse("could not read the total job count from the search header".into())
        })?;

        let mut pages = total.div_ceil(JOBS_PER_PAGE);
        if let Some(cap) = ctx.max_pages {
            pages = pages.min(cap);
        }
        tracing::info!(total, pages, "Starting cv-library scrape");

        let page_results: Vec<Vec<JobRecord>> = stream::iter(1..=pages)
            .map(|page| self.scrape_page(page, today))
            .buffer_unordered(MAX_CONCURRENT_PAGES)
            .collect()
            .await;

        let matched: Vec<JobRecord> = page_results
            .into_iter()
            .flatten()
            .filter(|job| ctx.allowlist.matches_exact(&job.company_name))
            .collect();

        let jobs: Vec<JobRecord> = stream::iter(matched)
            .map(|job| self.fill_description(job))
            .buffer_unordered(MAX_CONCURRENT_DETAILS)
            .collect()
            .await;

        Ok(jobs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 4, 22).unwrap()
    }

    const LISTING_PAGE: &str = r##"
        <html><body>
        <ol id="searchResults">
          <li class="results__item">
            <article data-job-title="Software Engineer" data-company-name="Acme Widgets Ltd"
                     data-job-location="Leeds" data-job-salary="&#163;40,000 - &#163;50,000"
                     data-job-type="Permanent" data-job-posted="19/04/2025" data-job-id="223344">
            </article>
            <img class="job__logo" data-src="https://cdn.example.com/acme.png">
            <a class="cvl-btn" href="/job/223344/apply/?hl=1">Apply</a>
          </li>
          <li class="results__item">
            <article data-job-title="Warehouse Operative" data-company-name="Picker Co"
                     data-job-location="Hull" data-job-salary="&#163;12.50/hour"
                     data-job-type="Temporary" data-job-posted="" data-job-id="555">
            </article>
          </li>
        </ol>
        </body></html>
    "##;

    #[test]
    fn parses_cards_from_article_attributes() {
        let jobs = parse_listing_page(LISTING_PAGE, today());
        assert_eq!(jobs.len(), 1, "hourly listing should be dropped");

        let job = &jobs[0];
        assert_eq!(job.job_title, "Software Engineer");
        assert_eq!(job.company_name, "Acme Widgets Ltd");
        assert_eq!(job.location.as_deref(), Some("Leeds"));
        assert_eq!(
            job.company_logo.as_deref(),
            Some("https://cdn.example.com/acme.png")
        );
        assert_eq!(
            job.posted_date,
            NaiveDate::from_ymd_opt(2025, 4, 19).unwrap()
        );
    }

    #[test]
    fn apply_link_is_truncated_at_apply_segment() {
        let jobs = parse_listing_page(LISTING_PAGE, today());
        assert_eq!(
            jobs[0].apply_link,
            "https://www.cv-library.co.uk/job/223344/"
        );
    }

    #[test]
    fn normalize_apply_link_keeps_links_without_apply() {
        assert_eq!(
            normalize_apply_link("/job/99/"),
            "https://www.cv-library.co.uk/job/99/"
        );
    }

    #[test]
    fn parses_total_jobs_from_header() {
        let html = r#"<div class="search-nav-actions__left"><p>Search 187,210 jobs</p></div>"#;
        assert_eq!(parse_total_jobs(html), Some(187_210));
        assert_eq!(parse_total_jobs("<p>no jobs here</p>"), None);
    }

    #[test]
    fn extracts_description_from_jobposting_jsonld() {
        let html = r#"
            <script type="application/ld+json">{"@type":"BreadcrumbList"}</script>
            <script type="application/ld+json">
              {"@type":"JobPosting","title":"SE","description":"Build things."}
            </script>
        "#;
        assert_eq!(
            extract_jobposting_description(html).as_deref(),
            Some("Build things.")
        );
        assert_eq!(extract_jobposting_description("<p>none</p>"), None);
    }
}
