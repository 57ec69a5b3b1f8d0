//! Totaljobs scraper.
//!
//! The desktop site sits behind an aggressive bot wall, but the mobile
//! markup is served to a mobile Chrome profile with ordinary headers.
//! Cards carry stable `data-at` attributes, so parsing ignores the
//! obfuscated utility classes. Pages are walked until one comes back
//! empty.

use std::time::Duration;

use chrono::{NaiveDate, Utc};
use jobsweep_core::dates::parse_posted_date;
use jobsweep_core::job::{DataSource, JobRecord};
use jobsweep_core::salary::is_non_annual_rate;
use scraper::{ElementRef, Html, Selector};

use crate::fetch::PageClient;
use crate::{JobSource, ScrapeContext, SourceError};

const BASE_URL: &str = "https://www.totaljobs.com";

/// Delay between result pages; the bot wall is quick to anger.
const PAGE_DELAY: Duration = Duration::from_secs(2);

/// Safety cap when no page limit is configured.
const DEFAULT_MAX_PAGES: u32 = 200;

/// Extra headers that make the mobile profile look like a real visit.
const MOBILE_HEADERS: [(&str, &str); 4] = [
    ("accept-language", "en-GB,en;q=0.9"),
    ("referer", "https://www.totaljobs.com/"),
    (
        "sec-ch-ua",
        "\"Chromium\";v=\"135\", \"Not-A.Brand\";v=\"8\", \"Google Chrome\";v=\"135\"",
    ),
    ("sec-ch-ua-mobile", "?1"),
];

fn sel(selector: &str) -> Selector {
    Selector::parse(selector).expect("static selector")
}

fn text_of(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

/// Whether the response body is the bot-check interstitial.
pub fn is_blocked(html: &str) -> bool {
    let lower = html.to_lowercase();
    lower.contains("are you a robot") || lower.contains("captcha")
}

/// Parse one result page into records.
pub fn parse_listing_page(html: &str, today: NaiveDate) -> Vec<JobRecord> {
    let document = Html::parse_document(html);
    let card_sel = sel(r#"article[data-at="job-item"]"#);
    let title_sel = sel(r#"a[data-at="job-item-title"]"#);
    let company_sel = sel(r#"span[data-at="job-item-company-name"]"#);
    let location_sel = sel(r#"span[data-at="job-item-location"]"#);
    let salary_sel = sel(r#"span[data-at="job-item-salary-info"]"#);
    let posted_sel = sel(r#"span[data-at="job-item-timeago"]"#);
    let logo_sel = sel(r#"img[data-at="company-logo"]"#);

    let mut jobs = Vec::new();
    for card in document.select(&card_sel) {
        let Some(title_el) = card.select(&title_sel).next() else {
            continue;
        };
        let title = text_of(title_el);
        let Some(href) = title_el.value().attr("href") else {
            continue;
        };
        let apply_link = if href.starts_with('/') {
            format!("{BASE_URL}{href}")
        } else {
            href.to_string()
        };

        let salary = card
            .select(&salary_sel)
            .next()
            .map(text_of)
            .filter(|s| !s.is_empty());
        if salary.as_deref().is_some_and(is_non_annual_rate) {
            continue;
        }

        let posted = card
            .select(&posted_sel)
            .next()
            .map(text_of)
            .unwrap_or_default();

        jobs.push(JobRecord {
            job_title: title,
            company_name: card
                .select(&company_sel)
                .next()
                .map(text_of)
                .unwrap_or_default(),
            company_logo: card
                .select(&logo_sel)
                .next()
                .and_then(|img| img.value().attr("src"))
                .map(str::to_string),
            salary,
            posted_date: parse_posted_date(&posted, today),
            experience: None,
            location: card.select(&location_sel).next().map(text_of),
            apply_link,
            description: None,
            source: DataSource::TotalJobs,
        });
    }
    jobs
}

/// Scraper for totaljobs.com.
pub struct TotalJobsSource {
    client: PageClient,
}

impl TotalJobsSource {
    pub fn new() -> Self {
        Self {
            client: PageClient::mobile(),
        }
    }

    fn search_url(min_salary: u32, page: u32) -> String {
        format!(
            "{BASE_URL}/jobs/sponsorship/in-united-kingdom?salary={min_salary}&salarytypeid=1&page={page}"
        )
    }
}

impl Default for TotalJobsSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl JobSource for TotalJobsSource {
    fn source(&self) -> DataSource {
        DataSource::TotalJobs
    }

    async fn fetch(&self, ctx: &ScrapeContext<'_>) -> Result<Vec<JobRecord>, SourceError> {
        let today = Utc::now().date_naive();
        let max_pages = ctx.max_pages.unwrap_or(DEFAULT_MAX_PAGES);

        let mut jobs = Vec::new();
        for page in 1..=max_pages {
            let url = Self::search_url(ctx.min_annual_salary, page);
            let html = self
                .client
                .get_html_with_headers(&url, &MOBILE_HEADERS)
                .await?;
            if is_blocked(&html) {
                return Err(SourceError::Blocked(url));
            }

            let page_jobs = parse_listing_page(&html, today);
            if page_jobs.is_empty() {
                tracing::debug!(page, "Empty totaljobs page, stopping walk");
                break;
            }
            tracing::debug!(page, count = page_jobs.len(), "Scraped totaljobs page");
            jobs.extend(page_jobs);
            tokio::time::sleep(PAGE_DELAY).await;
        }

        jobs.retain(|job| ctx.allowlist.matches_exact(&job.company_name));
        tracing::info!(count = jobs.len(), "Finished totaljobs scrape");
        Ok(jobs)
    }
}
