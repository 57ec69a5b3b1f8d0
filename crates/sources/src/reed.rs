//! Reed scraper.
//!
//! Reed accepts the salary floor directly in the search URL, so the
//! query does most of the filtering. Pages are walked sequentially with
//! a polite delay; the site fronts with a captcha wall when it decides
//! the client is a bot, which surfaces as [`SourceError::Blocked`].

use std::time::Duration;

use chrono::{NaiveDate, Utc};
use jobsweep_core::dates::parse_posted_date;
use jobsweep_core::job::{DataSource, JobRecord};
use jobsweep_core::salary::is_non_annual_rate;
use rand::Rng;
use scraper::{ElementRef, Html, Selector};

use crate::fetch::PageClient;
use crate::{JobSource, ScrapeContext, SourceError};

const BASE_URL: &str = "https://www.reed.co.uk";

/// Base delay between result pages; random jitter on top keeps the
/// cadence from being perfectly regular.
const PAGE_DELAY_BASE_MS: u64 = 1000;
const PAGE_DELAY_JITTER_MS: u64 = 1000;

/// Consecutive empty or failed pages before the walk stops early.
const MAX_CONSECUTIVE_FAILURES: u32 = 3;

/// Keywords that mark a card metadata entry as a contract type rather
/// than a location.
const CONTRACT_KEYWORDS: [&str; 6] = [
    "permanent",
    "contract",
    "temporary",
    "full-time",
    "part-time",
    "apprenticeship",
];

fn page_delay() -> Duration {
    let jitter = rand::rng().random_range(0..=PAGE_DELAY_JITTER_MS);
    Duration::from_millis(PAGE_DELAY_BASE_MS + jitter)
}

fn sel(selector: &str) -> Selector {
    Selector::parse(selector).expect("static selector")
}

fn text_of(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

/// Whether the response body is Reed's captcha / block interstitial.
pub fn is_blocked(html: &str) -> bool {
    let lower = html.to_lowercase();
    lower.contains("captcha") || lower.contains("access blocked")
}

/// Highest page number visible in the pagination strip, if any.
pub fn parse_last_page(html: &str) -> Option<u32> {
    let document = Html::parse_document(html);
    document
        .select(&sel(".pagination .page-item .page-link"))
        .filter_map(|link| text_of(link).parse::<u32>().ok())
        .max()
}

/// Classify one card metadata entry as salary, contract type, or
/// location. Reed renders all three in the same options list.
fn classify_option(text: &str, job: &mut JobRecord) {
    if text.contains('£') || text.contains('$') || text.contains('€') {
        job.salary = Some(text.to_string());
    } else if CONTRACT_KEYWORDS
        .iter()
        .any(|kw| text.to_lowercase().contains(kw))
    {
        job.experience = Some(text.to_string());
    } else if job.location.is_none() && !text.is_empty() {
        job.location = Some(text.to_string());
    }
}

/// Parse one result page into records.
pub fn parse_listing_page(html: &str, today: NaiveDate) -> Vec<JobRecord> {
    let document = Html::parse_document(html);
    let card_sel = sel(r#"article[data-qa="job-card"]"#);
    let title_sel = sel(r#"[data-qa="job-card-title"]"#);
    let logo_sel = sel(r#"img[data-qa="company-logo-image"]"#);
    let options_sel = sel(r#"ul[data-qa="job-card-options"] > li"#);
    let posted_by_sel = sel(r#"[class*="postedBy"]"#);
    let posted_by_link_sel = sel(r#"[class*="postedBy"] a"#);

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

        let company = card
            .select(&posted_by_link_sel)
            .next()
            .map(text_of)
            .unwrap_or_default();

        // "Posted 3 days ago by Acme Ltd" -> "3 days ago"
        let posted_text = card
            .select(&posted_by_sel)
            .next()
            .map(text_of)
            .unwrap_or_default();
        let posted = posted_text
            .split(" by ")
            .next()
            .unwrap_or("")
            .trim_start_matches("Posted ")
            .trim()
            .to_string();

        let company_logo = card
            .select(&logo_sel)
            .next()
            .and_then(|img| img.value().attr("src"))
            .map(str::to_string);

        let mut job = JobRecord {
            job_title: title,
            company_name: company,
            company_logo,
            salary: None,
            posted_date: parse_posted_date(&posted, today),
            experience: None,
            location: None,
            apply_link,
            description: None,
            source: DataSource::Reed,
        };

        for option in card.select(&options_sel) {
            let text = text_of(option);
            classify_option(&text, &mut job);
        }

        if job
            .salary
            .as_deref()
            .is_some_and(is_non_annual_rate)
        {
            continue;
        }

        jobs.push(job);
    }
    jobs
}

/// Scraper for reed.co.uk.
pub struct ReedSource {
    client: PageClient,
}

impl ReedSource {
    pub fn new() -> Self {
        Self {
            client: PageClient::desktop(),
        }
    }

    fn search_url(min_salary: u32, page: u32) -> String {
        format!("{BASE_URL}/jobs/jobs-in-united-kingdom?salaryFrom={min_salary}&pageno={page}")
    }
}

impl Default for ReedSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl JobSource for ReedSource {
    fn source(&self) -> DataSource {
        DataSource::Reed
    }

    async fn fetch(&self, ctx: &ScrapeContext<'_>) -> Result<Vec<JobRecord>, SourceError> {
        let today = Utc::now().date_naive();

        let first_url = Self::search_url(ctx.min_annual_salary, 1);
        let first = self.client.get_html(&first_url).await?;
        if is_blocked(&first) {
            return Err(SourceError::Blocked(first_url));
        }

        let mut last_page = parse_last_page(&first).unwrap_or(1);
        if let Some(cap) = ctx.max_pages {
            last_page = last_page.min(cap);
        }
        tracing::info!(last_page, "Starting reed scrape");

        let mut jobs = parse_listing_page(&first, today);
        let mut consecutive_failures = 0u32;

        for page in 2..=last_page {
            tokio::time::sleep(page_delay()).await;

            let url = Self::search_url(ctx.min_annual_salary, page);
            let page_jobs = match self.client.get_html(&url).await {
                Ok(html) if is_blocked(&html) => {
                    return Err(SourceError::Blocked(url));
                }
                Ok(html) => parse_listing_page(&html, today),
                Err(e) => {
                    tracing::warn!(page, error = %e, "Failed to fetch reed page");
                    Vec::new()
                }
            };

            if page_jobs.is_empty() {
                consecutive_failures += 1;
                if consecutive_failures >= MAX_CONSECUTIVE_FAILURES {
                    tracing::warn!(page, "Stopping reed walk after repeated empty pages");
                    break;
                }
            } else {
                consecutive_failures = 0;
                tracing::debug!(page, count = page_jobs.len(), "Scraped reed page");
                jobs.extend(page_jobs);
            }
        }

        jobs.retain(|job| ctx.allowlist.matches_exact(&job.company_name));
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
        <article data-qa="job-card">
          <a data-qa="job-card-title" href="/jobs/platform-engineer/55001">Platform Engineer</a>
          <img data-qa="company-logo-image" src="https://cdn.example.com/nimbus.png">
          <div class="job-card_postedBy__x1">Posted 2 days ago by <a href="/co/1">Nimbus Systems</a></div>
          <ul data-qa="job-card-options">
            <li>&#163;55,000 - &#163;65,000 per annum</li>
            <li>Permanent</li>
            <li>Manchester</li>
          </ul>
        </article>
        <article data-qa="job-card">
          <a data-qa="job-card-title" href="/jobs/driver/55002">Delivery Driver</a>
          <div class="job-card_postedBy__x1">Posted Yesterday by <a href="/co/2">Vans R Us</a></div>
          <ul data-qa="job-card-options">
            <li>&#163;14.20 per hour</li>
            <li>Temporary</li>
            <li>Bristol</li>
          </ul>
        </article>
        </body></html>
    "##;

    #[test]
    fn parses_cards_and_classifies_options() {
        let jobs = parse_listing_page(LISTING_PAGE, today());
        assert_eq!(jobs.len(), 1, "hourly listing should be dropped");

        let job = &jobs[0];
        assert_eq!(job.job_title, "Platform Engineer");
        assert_eq!(job.company_name, "Nimbus Systems");
        assert_eq!(
            job.salary.as_deref(),
            Some("£55,000 - £65,000 per annum")
        );
        assert_eq!(job.experience.as_deref(), Some("Permanent"));
        assert_eq!(job.location.as_deref(), Some("Manchester"));
        assert_eq!(
            job.apply_link,
            "https://www.reed.co.uk/jobs/platform-engineer/55001"
        );
        assert_eq!(
            job.posted_date,
            NaiveDate::from_ymd_opt(2025, 4, 20).unwrap()
        );
    }

    #[test]
    fn parses_last_page_from_pagination() {
        let html = r#"
            <ul class="pagination">
              <li class="page-item"><a class="page-link">1</a></li>
              <li class="page-item"><a class="page-link">2</a></li>
              <li class="page-item"><a class="page-link">17</a></li>
              <li class="page-item"><a class="page-link">Next</a></li>
            </ul>
        "#;
        assert_eq!(parse_last_page(html), Some(17));
        assert_eq!(parse_last_page("<p>no pager</p>"), None);
    }

    #[test]
    fn page_delay_is_jittered_within_bounds() {
        let floor = Duration::from_millis(PAGE_DELAY_BASE_MS);
        let ceiling = Duration::from_millis(PAGE_DELAY_BASE_MS + PAGE_DELAY_JITTER_MS);
        for _ in 0..50 {
            let delay = page_delay();
            assert!(delay >= floor && delay <= ceiling);
        }
    }

    #[test]
    fn detects_captcha_wall() {
        assert!(is_blocked("<html><title>Captcha check</title></html>"));
        assert!(!is_blocked("<html><title>Jobs</title></html>"));
    }
}
