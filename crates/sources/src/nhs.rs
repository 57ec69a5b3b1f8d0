//! NHS Jobs scraper.
//!
//! The candidate search is plain server-rendered HTML with no total
//! count, so pages are walked until one comes back empty. NHS trust
//! names rarely match the sponsor register word for word, so employers
//! are matched by allowlist substring rather than exact name.

use std::time::Duration;

use chrono::{NaiveDate, Utc};
use jobsweep_core::dates::parse_posted_date;
use jobsweep_core::job::{DataSource, JobRecord};
use scraper::{ElementRef, Html, Selector};

use crate::fetch::PageClient;
use crate::{JobSource, ScrapeContext, SourceError};

const BASE_URL: &str = "https://www.jobs.nhs.uk";
const SEARCH_URL: &str = "https://www.jobs.nhs.uk/candidate/search/results";

/// Delay between result pages.
const PAGE_DELAY: Duration = Duration::from_secs(1);

/// Safety cap when no page limit is configured.
const DEFAULT_MAX_PAGES: u32 = 500;

fn sel(selector: &str) -> Selector {
    Selector::parse(selector).expect("static selector")
}

fn text_of(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

/// Strip a labelled field down to its value ("Salary: £30k a year" ->
/// "£30k").
fn strip_label<'a>(text: &'a str, label: &str, cut: Option<&str>) -> String {
    let mut value = text.trim_start_matches(label).trim();
    if let Some(cut) = cut {
        if let Some(idx) = value.find(cut) {
            value = value[..idx].trim_end();
        }
    }
    value.to_string()
}

/// Parse one result page into records.
pub fn parse_listing_page(html: &str, today: NaiveDate) -> Vec<JobRecord> {
    let document = Html::parse_document(html);
    let card_sel = sel("li.search-result");
    let title_sel = sel(r#"a[data-test="search-result-job-title"]"#);
    let employer_sel = sel("h3.nhsuk-u-font-weight-bold");
    let location_sel = sel("div.location-font-size");
    let salary_sel = sel(r#"li[data-test="search-result-salary"]"#);
    let date_sel = sel(r#"li[data-test="search-result-publicationDate"]"#);
    let job_type_sel = sel(r#"li[data-test="search-result-jobType"]"#);

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

        let employer = card
            .select(&employer_sel)
            .next()
            .map(text_of)
            .unwrap_or_default();

        let location = card.select(&location_sel).next().map(text_of);

        let salary = card
            .select(&salary_sel)
            .next()
            .map(|el| strip_label(&text_of(el), "Salary:", Some("a year")))
            .filter(|s| !s.is_empty());

        let posted = card
            .select(&date_sel)
            .next()
            .map(|el| strip_label(&text_of(el), "Date posted:", None))
            .unwrap_or_default();

        let experience = card
            .select(&job_type_sel)
            .next()
            .map(|el| strip_label(&text_of(el), "Job type:", None))
            .filter(|s| !s.is_empty());

        jobs.push(JobRecord {
            job_title: title,
            company_name: employer,
            company_logo: None,
            salary,
            posted_date: parse_posted_date(&posted, today),
            experience,
            location,
            apply_link,
            description: None,
            source: DataSource::Nhs,
        });
    }
    jobs
}

/// Scraper for jobs.nhs.uk.
pub struct NhsSource {
    client: PageClient,
}

impl NhsSource {
    pub fn new() -> Self {
        Self {
            client: PageClient::desktop(),
        }
    }

    async fn fetch_page(&self, page: u32) -> Result<String, SourceError> {
        let url = format!(
            "{SEARCH_URL}?searchFormType=main&searchByLocationOnly=true&language=en&page={page}"
        );
        self.client.get_html(&url).await
    }
}

impl Default for NhsSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl JobSource for NhsSource {
    fn source(&self) -> DataSource {
        DataSource::Nhs
    }

    async fn fetch(&self, ctx: &ScrapeContext<'_>) -> Result<Vec<JobRecord>, SourceError> {
        let today = Utc::now().date_naive();
        let max_pages = ctx.max_pages.unwrap_or(DEFAULT_MAX_PAGES);

        let mut jobs = Vec::new();
        for page in 1..=max_pages {
            let html = self.fetch_page(page).await?;
            let page_jobs = parse_listing_page(&html, today);
            if page_jobs.is_empty() {
                tracing::debug!(page, "Empty NHS page, stopping walk");
                break;
            }
            tracing::debug!(page, count = page_jobs.len(), "Scraped NHS page");
            jobs.extend(page_jobs);
            tokio::time::sleep(PAGE_DELAY).await;
        }

        // Trust names rarely match the register word for word; accept a
        // substring hit or an overlap on a distinctive word.
        jobs.retain(|job| {
            ctx.allowlist.matches_substring(&job.company_name)
                || ctx.allowlist.matches_word_overlap(&job.company_name)
        });
        tracing::info!(count = jobs.len(), "Finished NHS scrape");
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
        <ul>
          <li class="search-result">
            <a data-test="search-result-job-title" href="/candidate/jobadvert/C9001-25-0001">
              Clinical Data Engineer
            </a>
            <h3 class="nhsuk-u-font-weight-bold">Leeds Teaching Hospitals NHS Trust</h3>
            <div class="location-font-size">Leeds, LS1 3EX</div>
            <ul>
              <li data-test="search-result-salary">Salary: &#163;46,148 to &#163;52,809 a year</li>
              <li data-test="search-result-jobType">Job type: Permanent</li>
              <li data-test="search-result-publicationDate">Date posted: 15 April 2025</li>
            </ul>
          </li>
        </ul>
        </body></html>
    "##;

    #[test]
    fn parses_search_result_cards() {
        let jobs = parse_listing_page(LISTING_PAGE, today());
        assert_eq!(jobs.len(), 1);

        let job = &jobs[0];
        assert_eq!(job.job_title, "Clinical Data Engineer");
        assert_eq!(job.company_name, "Leeds Teaching Hospitals NHS Trust");
        assert_eq!(job.location.as_deref(), Some("Leeds, LS1 3EX"));
        assert_eq!(job.salary.as_deref(), Some("£46,148 to £52,809"));
        assert_eq!(job.experience.as_deref(), Some("Permanent"));
        assert_eq!(
            job.apply_link,
            "https://www.jobs.nhs.uk/candidate/jobadvert/C9001-25-0001"
        );
        assert_eq!(
            job.posted_date,
            NaiveDate::from_ymd_opt(2025, 4, 15).unwrap()
        );
    }

    #[test]
    fn empty_page_parses_to_no_jobs() {
        assert!(parse_listing_page("<html><body></body></html>", today()).is_empty());
    }

    #[test]
    fn strips_field_labels() {
        assert_eq!(
            strip_label("Salary: £30,000 a year", "Salary:", Some("a year")),
            "£30,000"
        );
        assert_eq!(
            strip_label("Date posted: 01 May 2025", "Date posted:", None),
            "01 May 2025"
        );
    }
}
