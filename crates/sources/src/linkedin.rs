//! LinkedIn scraper.
//!
//! The guest (logged-out) job search renders real cards but hides
//! pagination behind JavaScript and interrupts with sign-in modals, so
//! the search itself runs in a headless browser: dismiss modals, scroll,
//! snapshot the DOM, advance with the next-page button, repeat. The
//! snapshots are parsed offline, and detail pages (description,
//! seniority, logo) are fetched over plain HTTP because guest listing
//! pages are served without a session.

use std::collections::HashSet;

use chrono::{NaiveDate, Utc};
use futures::{stream, StreamExt};
use jobsweep_core::dates::parse_posted_date;
use jobsweep_core::job::{DataSource, JobRecord};
use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::browser;
use crate::fetch::PageClient;
use crate::{JobSource, ScrapeContext, SourceError};

const SEARCH_URL: &str = "https://www.linkedin.com/jobs/search";

/// geoId for the United Kingdom.
const UK_GEO_ID: &str = "101165590";

const DEFAULT_KEYWORDS: &str = "software engineer";
const DEFAULT_LOCATION: &str = "United Kingdom";

/// Hard cap on page snapshots per browser session.
const MAX_PAGE_SNAPSHOTS: u32 = 25;

/// Concurrent detail-page fetches.
const MAX_CONCURRENT_DETAILS: usize = 5;

/// Sign-in and contextual modals that cover the results list.
const MODAL_SELECTORS: [&str; 3] = [
    "button.modal__dismiss",
    "button.contextual-sign-in-modal__modal-dismiss",
    r#"button[aria-label="Dismiss"]"#,
];

/// Next-page controls, in preference order.
const NEXT_SELECTORS: [&str; 2] = [
    "button.artdeco-pagination__button--next:not([disabled])",
    r#"button[aria-label="View next page"]"#,
];

fn sel(selector: &str) -> Selector {
    Selector::parse(selector).expect("static selector")
}

fn text_of(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

/// Detail-page fields that the search card does not carry.
#[derive(Debug, Default)]
pub struct ListingDetail {
    pub description: Option<String>,
    pub experience: Option<String>,
    pub logo: Option<String>,
}

/// Parse one search-results snapshot into records.
pub fn parse_search_page(html: &str, today: NaiveDate) -> Vec<JobRecord> {
    let document = Html::parse_document(html);
    let card_sel = sel("div.job-search-card, li div.base-search-card");
    let title_sel = sel(".base-search-card__title");
    let company_sel = sel(".base-search-card__subtitle");
    let location_sel = sel(".job-search-card__location");
    let link_sel = sel("a.base-card__full-link");
    let time_sel = sel("time[datetime]");

    let mut jobs = Vec::new();
    for card in document.select(&card_sel) {
        let Some(link) = card.select(&link_sel).next() else {
            continue;
        };
        let Some(href) = link.value().attr("href") else {
            continue;
        };
        // Strip tracking query parameters so the URL can be deduped.
        let apply_link = href.split('?').next().unwrap_or(href).to_string();

        let posted_date = card
            .select(&time_sel)
            .next()
            .and_then(|t| t.value().attr("datetime"))
            .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
            .unwrap_or_else(|| {
                let text = card.select(&time_sel).next().map(text_of).unwrap_or_default();
                parse_posted_date(&text, today)
            });

        jobs.push(JobRecord {
            job_title: card.select(&title_sel).next().map(text_of).unwrap_or_default(),
            company_name: card
                .select(&company_sel)
                .next()
                .map(text_of)
                .unwrap_or_default(),
            company_logo: None,
            salary: None,
            posted_date,
            experience: None,
            location: card.select(&location_sel).next().map(text_of),
            apply_link,
            description: None,
            source: DataSource::Linkedin,
        });
    }
    jobs
}

/// Parse a guest listing page for description, seniority, and logo.
pub fn parse_detail_page(html: &str) -> ListingDetail {
    let document = Html::parse_document(html);
    let markup_sel = sel(".show-more-less-html__markup");
    let fallback_sel = sel(".description__text");
    let criteria_sel = sel("li.description__job-criteria-item");
    let criteria_header_sel = sel("h3.description__job-criteria-subheader");
    let criteria_value_sel = sel("span.description__job-criteria-text");
    let logo_sel = sel("img.artdeco-entity-image");

    let description = document
        .select(&markup_sel)
        .next()
        .or_else(|| document.select(&fallback_sel).next())
        .map(text_of)
        .filter(|d| !d.is_empty());

    let mut experience = None;
    for item in document.select(&criteria_sel) {
        let header = item
            .select(&criteria_header_sel)
            .next()
            .map(text_of)
            .unwrap_or_default();
        if header.eq_ignore_ascii_case("seniority level") {
            experience = item
                .select(&criteria_value_sel)
                .next()
                .map(text_of)
                .filter(|v| !v.is_empty());
            break;
        }
    }

    let logo = document.select(&logo_sel).next().and_then(|img| {
        img.value()
            .attr("data-delayed-url")
            .or_else(|| img.value().attr("src"))
            .map(str::to_string)
    });

    ListingDetail {
        description,
        experience,
        logo,
    }
}

/// Scraper for linkedin.com guest job search.
pub struct LinkedinSource {
    client: PageClient,
    keywords: String,
    location: String,
}

impl LinkedinSource {
    pub fn new() -> Self {
        Self::with_query(DEFAULT_KEYWORDS, DEFAULT_LOCATION)
    }

    /// Scraper for a specific keyword and location search.
    pub fn with_query(keywords: &str, location: &str) -> Self {
        Self {
            client: PageClient::desktop(),
            keywords: keywords.to_string(),
            location: location.to_string(),
        }
    }

    /// Full-time roles at the senior level, posted in the last 24 hours.
    fn search_url(&self) -> String {
        let mut url = Url::parse(SEARCH_URL).expect("static URL");
        url.query_pairs_mut()
            .append_pair("keywords", &self.keywords)
            .append_pair("location", &self.location)
            .append_pair("geoId", UK_GEO_ID)
            .append_pair("f_JT", "F")
            .append_pair("f_TPR", "r86400")
            .append_pair("f_E", "4");
        url.to_string()
    }

    /// Fetch the listing page and merge in detail fields, best effort.
    async fn fill_detail(&self, mut job: JobRecord) -> JobRecord {
        match self.client.get_html(&job.apply_link).await {
            Ok(html) => {
                let detail = parse_detail_page(&html);
                job.description = detail.description;
                job.experience = detail.experience;
                job.company_logo = detail.logo;
            }
            Err(e) => {
                tracing::debug!(url = %job.apply_link, error = %e, "No detail page for listing")
            }
        }
        job
    }
}

impl Default for LinkedinSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl JobSource for LinkedinSource {
    fn source(&self) -> DataSource {
        DataSource::Linkedin
    }

    async fn fetch(&self, ctx: &ScrapeContext<'_>) -> Result<Vec<JobRecord>, SourceError> {
        let today = Utc::now().date_naive();
        let url = self.search_url();
        let max_snapshots = ctx.max_pages.unwrap_or(MAX_PAGE_SNAPSHOTS);

        let snapshots: Vec<String> = browser::with_tab(url, move |tab| {
            let mut pages = Vec::new();
            for _ in 0..max_snapshots {
                browser::dismiss_popups(tab, &MODAL_SELECTORS);
                browser::scroll_page(tab, 3)?;
                pages.push(tab.get_content().map_err(|e| anyhow::anyhow!("{e}"))?);

                let advanced = NEXT_SELECTORS
                    .iter()
                    .any(|selector| browser::click_if_present(tab, selector));
                if !advanced {
                    break;
                }
                std::thread::sleep(std::time::Duration::from_millis(2500));
            }
            Ok(pages)
        })
        .await?;

        let mut seen = HashSet::new();
        let matched: Vec<JobRecord> = snapshots
            .iter()
            .flat_map(|html| parse_search_page(html, today))
            .filter(|job| seen.insert(job.apply_link.clone()))
            .filter(|job| {
                ctx.allowlist.matches_exact(&job.company_name)
                    || ctx.allowlist.matches_fuzzy(&job.company_name)
            })
            .collect();
        tracing::info!(count = matched.len(), "Matched linkedin cards, fetching details");

        let jobs: Vec<JobRecord> = stream::iter(matched)
            .map(|job| self.fill_detail(job))
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

    const SEARCH_PAGE: &str = r##"
        <html><body>
        <ul>
          <li>
            <div class="base-card job-search-card">
              <a class="base-card__full-link" href="https://uk.linkedin.com/jobs/view/staff-engineer-4100?refId=abc&trackingId=def">
                Staff Engineer
              </a>
              <h3 class="base-search-card__title">Staff Engineer</h3>
              <h4 class="base-search-card__subtitle">Harbour Digital Ltd</h4>
              <span class="job-search-card__location">Edinburgh, Scotland</span>
              <time datetime="2025-04-21">1 day ago</time>
            </div>
          </li>
        </ul>
        </body></html>
    "##;

    #[test]
    fn parses_guest_search_cards() {
        let jobs = parse_search_page(SEARCH_PAGE, today());
        assert_eq!(jobs.len(), 1);

        let job = &jobs[0];
        assert_eq!(job.job_title, "Staff Engineer");
        assert_eq!(job.company_name, "Harbour Digital Ltd");
        assert_eq!(job.location.as_deref(), Some("Edinburgh, Scotland"));
        assert_eq!(
            job.apply_link,
            "https://uk.linkedin.com/jobs/view/staff-engineer-4100",
            "tracking parameters are stripped"
        );
        assert_eq!(
            job.posted_date,
            NaiveDate::from_ymd_opt(2025, 4, 21).unwrap()
        );
    }

    #[test]
    fn parses_detail_page_fields() {
        let html = r#"
            <div class="show-more-less-html__markup">We build harbour software.</div>
            <ul>
              <li class="description__job-criteria-item">
                <h3 class="description__job-criteria-subheader">Seniority level</h3>
                <span class="description__job-criteria-text">Mid-Senior level</span>
              </li>
              <li class="description__job-criteria-item">
                <h3 class="description__job-criteria-subheader">Employment type</h3>
                <span class="description__job-criteria-text">Full-time</span>
              </li>
            </ul>
            <img class="artdeco-entity-image" data-delayed-url="https://cdn.example.com/harbour.png">
        "#;
        let detail = parse_detail_page(html);
        assert_eq!(
            detail.description.as_deref(),
            Some("We build harbour software.")
        );
        assert_eq!(detail.experience.as_deref(), Some("Mid-Senior level"));
        assert_eq!(
            detail.logo.as_deref(),
            Some("https://cdn.example.com/harbour.png")
        );
    }

    #[test]
    fn search_url_encodes_query_and_filters() {
        let source = LinkedinSource::with_query("data engineer", "United Kingdom");
        let url = source.search_url();
        assert!(url.contains("keywords=data+engineer"));
        assert!(url.contains("geoId=101165590"));
        assert!(url.contains("f_TPR=r86400"));
    }
}
