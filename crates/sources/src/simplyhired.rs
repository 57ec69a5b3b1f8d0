//! SimplyHired scraper.
//!
//! SimplyHired is a Next.js app, so instead of scraping HTML the search
//! is read from the `_next/data` JSON endpoint the frontend itself
//! calls. Pagination is cursor-based: each response carries a
//! `pageCursors` map and the walk follows it until no new cursor
//! appears, tracking visited cursors because the map sometimes points
//! back at an earlier page.

use std::collections::{HashMap, HashSet};
use std::sync::OnceLock;
use std::time::Duration;

use chrono::Utc;
use jobsweep_core::dates::parse_posted_date;
use jobsweep_core::job::{DataSource, JobRecord};
use jobsweep_core::salary::is_non_annual_rate;
use percent_encoding::percent_decode_str;
use regex::Regex;
use serde::Deserialize;

use crate::fetch::PageClient;
use crate::{JobSource, ScrapeContext, SourceError};

const BASE_URL: &str = "https://www.simplyhired.co.uk";

/// Fallback Next.js build id; the live one is discovered from the
/// homepage at the start of each run because it rotates with deploys.
const FALLBACK_BUILD_ID: &str = "pYbJoPNBfMzlDAOCqsHs0";

/// Delay between search requests.
const PAGE_DELAY: Duration = Duration::from_secs(2);

/// Safety cap when no page limit is configured.
const DEFAULT_MAX_PAGES: u32 = 100;

fn build_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r#""buildId"\s*:\s*"([^"]+)""#).expect("static regex"))
}

// ---- wire types ----

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(rename = "pageProps")]
    page_props: PageProps,
}

#[derive(Debug, Default, Deserialize)]
struct PageProps {
    #[serde(default)]
    jobs: Vec<Listing>,
    #[serde(rename = "pageCursors", default)]
    page_cursors: HashMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct Listing {
    #[serde(default)]
    title: String,
    #[serde(default)]
    company: String,
    #[serde(rename = "companyLogoUrl")]
    company_logo_url: Option<String>,
    #[serde(rename = "salaryInfo")]
    salary_info: Option<String>,
    location: Option<String>,
    #[serde(rename = "dateOnIndeed")]
    date_on_indeed: Option<String>,
    #[serde(rename = "encodedJobClickPingUrl")]
    encoded_ping_url: Option<String>,
    #[serde(rename = "botUrl")]
    bot_url: Option<String>,
}

/// Pull the Next.js build id out of the homepage's `__NEXT_DATA__`.
pub fn extract_build_id(html: &str) -> Option<String> {
    build_id_pattern()
        .captures(html)
        .map(|caps| caps[1].to_string())
}

/// Percent-decode a listing link and anchor it to the site.
fn decode_listing_url(raw: &str) -> String {
    let decoded = percent_decode_str(raw).decode_utf8_lossy().to_string();
    if decoded.starts_with('/') {
        format!("{BASE_URL}{decoded}")
    } else {
        decoded
    }
}

/// The cursor for the next request, trying the next page number first,
/// then the highest known page, then a literal `next` key.
fn next_cursor(cursors: &HashMap<String, String>, current_page: u32) -> Option<&String> {
    cursors
        .get(&(current_page + 1).to_string())
        .or_else(|| cursors.get(&cursors.len().to_string()))
        .or_else(|| cursors.get("next"))
}

impl Listing {
    fn into_record(self, today: chrono::NaiveDate) -> Option<JobRecord> {
        let raw_link = self.bot_url.or(self.encoded_ping_url)?;
        let posted = self.date_on_indeed.unwrap_or_default();
        Some(JobRecord {
            job_title: self.title,
            company_name: self.company,
            company_logo: self.company_logo_url,
            salary: self.salary_info.filter(|s| !s.is_empty()),
            posted_date: parse_posted_date(&posted, today),
            experience: None,
            location: self.location,
            apply_link: decode_listing_url(&raw_link),
            description: None,
            source: DataSource::SimplyHired,
        })
    }
}

/// Scraper for simplyhired.co.uk.
pub struct SimplyHiredSource {
    client: PageClient,
}

impl SimplyHiredSource {
    pub fn new() -> Self {
        Self {
            client: PageClient::desktop(),
        }
    }

    async fn discover_build_id(&self) -> String {
        match self.client.get_html(BASE_URL).await {
            Ok(html) => extract_build_id(&html).unwrap_or_else(|| {
                tracing::warn!("No buildId in simplyhired homepage, using fallback");
                FALLBACK_BUILD_ID.to_string()
            }),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load simplyhired homepage, using fallback buildId");
                FALLBACK_BUILD_ID.to_string()
            }
        }
    }

    async fn fetch_page(
        &self,
        build_id: &str,
        min_salary: u32,
        cursor: Option<&str>,
    ) -> Result<SearchResponse, SourceError> {
        let url = format!("{BASE_URL}/_next/data/{build_id}/en-GB/search.json");
        let mut query = vec![
            ("l", "united kingdom".to_string()),
            ("mip", min_salary.to_string()),
        ];
        if let Some(cursor) = cursor {
            query.push(("cursor", cursor.to_string()));
        }
        self.client.get_json(&url, &query, &[]).await
    }
}

impl Default for SimplyHiredSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl JobSource for SimplyHiredSource {
    fn source(&self) -> DataSource {
        DataSource::SimplyHired
    }

    async fn fetch(&self, ctx: &ScrapeContext<'_>) -> Result<Vec<JobRecord>, SourceError> {
        let today = Utc::now().date_naive();
        let build_id = self.discover_build_id().await;
        let max_pages = ctx.max_pages.unwrap_or(DEFAULT_MAX_PAGES);

        let mut jobs = Vec::new();
        let mut cursor: Option<String> = None;
        let mut visited: HashSet<String> = HashSet::new();

        for page in 1..=max_pages {
            let response = self
                .fetch_page(&build_id, ctx.min_annual_salary, cursor.as_deref())
                .await?;
            let props = response.page_props;
            if props.jobs.is_empty() {
                tracing::debug!(page, "Empty simplyhired page, stopping walk");
                break;
            }
            tracing::debug!(page, count = props.jobs.len(), "Scraped simplyhired page");

            jobs.extend(
                props
                    .jobs
                    .into_iter()
                    .filter_map(|listing| listing.into_record(today)),
            );

            let Some(next) = next_cursor(&props.page_cursors, page) else {
                break;
            };
            if !visited.insert(next.clone()) {
                tracing::debug!(page, "Cursor already visited, stopping walk");
                break;
            }
            cursor = Some(next.clone());
            tokio::time::sleep(PAGE_DELAY).await;
        }

        jobs.retain(|job| {
            !job.salary.as_deref().is_some_and(is_non_annual_rate)
                && ctx.allowlist.matches_fuzzy(&job.company_name)
        });
        tracing::info!(count = jobs.len(), "Finished simplyhired scrape");
        Ok(jobs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn deserializes_search_response() {
        let raw = r#"{
            "pageProps": {
                "jobs": [{
                    "title": "Data Engineer",
                    "company": "Meridian Analytics",
                    "companyLogoUrl": "https://cdn.example.com/meridian.png",
                    "salaryInfo": "£45,000 a year",
                    "location": "Remote in London",
                    "dateOnIndeed": "5 days ago",
                    "encodedJobClickPingUrl": "%2Fjob%2Fdata-engineer-abc123"
                }],
                "pageCursors": {"2": "cur_two"}
            }
        }"#;
        let response: SearchResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(response.page_props.jobs.len(), 1);
        assert_eq!(response.page_props.page_cursors["2"], "cur_two");

        let today = NaiveDate::from_ymd_opt(2025, 4, 22).unwrap();
        let record = response
            .page_props
            .jobs
            .into_iter()
            .next()
            .unwrap()
            .into_record(today)
            .unwrap();
        assert_eq!(record.company_name, "Meridian Analytics");
        assert_eq!(
            record.apply_link,
            "https://www.simplyhired.co.uk/job/data-engineer-abc123"
        );
        assert_eq!(
            record.posted_date,
            NaiveDate::from_ymd_opt(2025, 4, 17).unwrap()
        );
    }

    #[test]
    fn listing_without_any_link_is_dropped() {
        let listing: Listing = serde_json::from_str(r#"{"title": "X", "company": "Y"}"#).unwrap();
        let today = NaiveDate::from_ymd_opt(2025, 4, 22).unwrap();
        assert!(listing.into_record(today).is_none());
    }

    #[test]
    fn next_cursor_prefers_the_following_page() {
        let mut cursors = HashMap::new();
        cursors.insert("2".to_string(), "two".to_string());
        cursors.insert("3".to_string(), "three".to_string());
        assert_eq!(next_cursor(&cursors, 1).map(String::as_str), Some("two"));
        assert_eq!(next_cursor(&cursors, 2).map(String::as_str), Some("three"));
        // Page 4 is unknown; fall back to the highest known page (len == 2).
        assert_eq!(next_cursor(&cursors, 3).map(String::as_str), Some("two"));
    }

    #[test]
    fn extracts_build_id_from_next_data() {
        let html = r#"<script id="__NEXT_DATA__">{"buildId":"abC123xyz","page":"/search"}</script>"#;
        assert_eq!(extract_build_id(html).as_deref(), Some("abC123xyz"));
        assert_eq!(extract_build_id("<html></html>"), None);
    }
}
