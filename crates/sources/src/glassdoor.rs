//! Glassdoor scraper.
//!
//! Glassdoor renders its results list client-side behind a "show more
//! jobs" button and throws signup modals at anonymous visitors, so each
//! of the four UK region searches runs in a headless browser: dismiss
//! the modal, keep clicking load-more until the list stops growing, and
//! parse the final DOM snapshot. Class names are build-hashed
//! (`JobCard_jobTitle__abc12`), so selectors match on class prefixes.

use chrono::{Days, NaiveDate, Utc};
use jobsweep_core::job::{DataSource, JobRecord};
use jobsweep_core::salary::is_non_annual_rate;
use scraper::{ElementRef, Html, Selector};

use crate::browser;
use crate::{JobSource, ScrapeContext, SourceError};

const BASE_URL: &str = "https://www.glassdoor.co.uk";

/// Upper bound for the salary filter in the search URL.
const MAX_SALARY_QUERY: u32 = 200_000;

/// UK region searches, walked one browser session each.
const REGIONS: [(&str, &str); 4] = [
    ("england", "/Job/uk-england-jobs-SRCH_IL.0,10_IS7287.htm"),
    ("scotland", "/Job/uk-scotland-jobs-SRCH_IL.0,11_IS7289.htm"),
    ("wales", "/Job/uk-wales-jobs-SRCH_IL.0,8_IS7290.htm"),
    (
        "northern-ireland",
        "/Job/uk-northern-ireland-jobs-SRCH_IL.0,19_IS7288.htm",
    ),
];

const ITEM_SELECTOR: &str = r#"ul[class^="JobsList_jobsList"] li"#;
const LOAD_MORE_SELECTOR: &str = r#"button[data-test="load-more"]"#;
const POPUP_SELECTORS: [&str; 2] = ["button.CloseButton", r#"button[data-test="modal-close"]"#];

fn sel(selector: &str) -> Selector {
    Selector::parse(selector).expect("static selector")
}

fn text_of(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

/// Resolve Glassdoor's compact listing age ("24h", "5d", "30d+") to a
/// date.
fn parse_listing_age(text: &str, today: NaiveDate) -> NaiveDate {
    let trimmed = text.trim().trim_end_matches('+');
    if let Some(days) = trimmed.strip_suffix('d') {
        if let Ok(days) = days.parse::<u64>() {
            return today.checked_sub_days(Days::new(days)).unwrap_or(today);
        }
    }
    if trimmed.ends_with('h') {
        return today;
    }
    today
}

/// Parse a results snapshot into records.
pub fn parse_results_page(html: &str, today: NaiveDate) -> Vec<JobRecord> {
    let document = Html::parse_document(html);
    let item_sel = sel(ITEM_SELECTOR);
    let title_sel = sel(r#"a[class^="JobCard_jobTitle"]"#);
    let employer_sel = sel(r#"span[class^="EmployerProfile_compactEmployerName"]"#);
    let location_sel = sel(r#"div[class^="JobCard_location"]"#);
    let salary_sel = sel(r#"div[class^="JobCard_salaryEstimate"]"#);
    let age_sel = sel(r#"div[class^="JobCard_listingAge"]"#);
    let easy_apply_sel = sel(r#"div[class*="JobCard_easyApply"]"#);
    let logo_sel = sel(r#"img[class^="EmployerLogo"]"#);

    let mut jobs = Vec::new();
    for item in document.select(&item_sel) {
        let Some(title_el) = item.select(&title_sel).next() else {
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

        let salary = item
            .select(&salary_sel)
            .next()
            .map(text_of)
            .filter(|s| !s.is_empty());
        if salary.as_deref().is_some_and(is_non_annual_rate) {
            continue;
        }

        let age = item.select(&age_sel).next().map(text_of).unwrap_or_default();
        let easy_apply = item.select(&easy_apply_sel).next().is_some();

        jobs.push(JobRecord {
            job_title: title,
            company_name: item
                .select(&employer_sel)
                .next()
                .map(text_of)
                .unwrap_or_default(),
            company_logo: item
                .select(&logo_sel)
                .next()
                .and_then(|img| img.value().attr("src"))
                .map(str::to_string),
            salary,
            posted_date: parse_listing_age(&age, today),
            experience: easy_apply.then(|| "Easy Apply".to_string()),
            location: item.select(&location_sel).next().map(text_of),
            apply_link,
            description: None,
            source: DataSource::Glassdoor,
        });
    }
    jobs
}

/// Scraper for glassdoor.co.uk.
pub struct GlassdoorSource;

impl GlassdoorSource {
    pub fn new() -> Self {
        Self
    }

    fn region_url(path: &str, min_salary: u32) -> String {
        format!("{BASE_URL}{path}?minSalary={min_salary}&maxSalary={MAX_SALARY_QUERY}")
    }
}

impl Default for GlassdoorSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl JobSource for GlassdoorSource {
    fn source(&self) -> DataSource {
        DataSource::Glassdoor
    }

    async fn fetch(&self, ctx: &ScrapeContext<'_>) -> Result<Vec<JobRecord>, SourceError> {
        let today = Utc::now().date_naive();

        let mut jobs = Vec::new();
        let mut last_error: Option<SourceError> = None;

        for (region, path) in REGIONS {
            let url = Self::region_url(path, ctx.min_annual_salary);
            tracing::info!(region, "Starting glassdoor region");

            let snapshot = browser::with_tab(url, |tab| {
                browser::expand_until_stable(
                    tab,
                    ITEM_SELECTOR,
                    LOAD_MORE_SELECTOR,
                    &POPUP_SELECTORS,
                )
            })
            .await;

            match snapshot {
                Ok(html) => {
                    let region_jobs = parse_results_page(&html, today);
                    tracing::info!(region, count = region_jobs.len(), "Parsed glassdoor region");
                    jobs.extend(region_jobs);
                }
                Err(e) => {
                    tracing::warn!(region, error = %e, "Glassdoor region failed");
                    last_error = Some(e);
                }
            }
        }

        if jobs.is_empty() {
            if let Some(e) = last_error {
                return Err(e);
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

    const RESULTS_PAGE: &str = r##"
        <html><body>
        <ul class="JobsList_jobsList__lqjTr">
          <li>
            <a class="JobCard_jobTitle__GLyJ1" href="/job-listing/site-reliability-engineer-vortex-JV_KO0,25.htm">
              Site Reliability Engineer
            </a>
            <span class="EmployerProfile_compactEmployerName__9MGcV">Vortex Computing</span>
            <div class="JobCard_location__Ds1fM">London, England</div>
            <div class="JobCard_salaryEstimate__QpbTW">&#163;60K - &#163;75K (Employer est.)</div>
            <div class="JobCard_listingAge__jJsuc">5d</div>
            <div class="JobCard_easyApplyTag__5vlo5">Easy Apply</div>
            <img class="EmployerLogo_logo__9a1bc" src="https://cdn.example.com/vortex.png">
          </li>
          <li><div class="spacer"></div></li>
        </ul>
        </body></html>
    "##;

    #[test]
    fn parses_hashed_class_cards_by_prefix() {
        let jobs = parse_results_page(RESULTS_PAGE, today());
        assert_eq!(jobs.len(), 1, "non-card list items are skipped");

        let job = &jobs[0];
        assert_eq!(job.job_title, "Site Reliability Engineer");
        assert_eq!(job.company_name, "Vortex Computing");
        assert_eq!(job.location.as_deref(), Some("London, England"));
        assert_eq!(
            job.salary.as_deref(),
            Some("£60K - £75K (Employer est.)")
        );
        assert_eq!(job.experience.as_deref(), Some("Easy Apply"));
        assert_eq!(
            job.posted_date,
            NaiveDate::from_ymd_opt(2025, 4, 17).unwrap()
        );
    }

    #[test]
    fn listing_age_variants_resolve_to_dates() {
        let today = today();
        assert_eq!(
            parse_listing_age("3d", today),
            NaiveDate::from_ymd_opt(2025, 4, 19).unwrap()
        );
        assert_eq!(parse_listing_age("24h", today), today);
        assert_eq!(
            parse_listing_age("30d+", today),
            NaiveDate::from_ymd_opt(2025, 3, 23).unwrap()
        );
        assert_eq!(parse_listing_age("", today), today);
    }

    #[test]
    fn region_urls_carry_the_salary_filter() {
        let url = GlassdoorSource::region_url(REGIONS[0].1, 35_000);
        assert!(url.contains("minSalary=35000"));
        assert!(url.contains("uk-england-jobs"));
    }
}
