//! The normalized job record and the source tag it carries.
//!
//! Every board-specific scraper produces [`JobRecord`] values; the
//! persistence layer only ever sees this shape.

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Placeholder title for listings scraped without one.
pub const DEFAULT_TITLE: &str = "Untitled Position";

/// Placeholder employer for listings scraped without one.
pub const DEFAULT_COMPANY: &str = "Unknown Company";

/// Placeholder for missing salary / location text.
pub const NOT_SPECIFIED: &str = "Not specified";

/// Placeholder for listings whose detail page yielded no description.
pub const DEFAULT_DESCRIPTION: &str = "No description available";

/// Identifies which job board a record was scraped from.
///
/// The string tag is stored in the `data_source` column and drives the
/// full-replace write: a batch for one tag deletes exactly the rows
/// carrying that tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    CvLibrary,
    Reed,
    Linkedin,
    Glassdoor,
    Nhs,
    SimplyHired,
    TotalJobs,
}

impl DataSource {
    /// All sources, in the order a full run visits them.
    pub const ALL: [DataSource; 7] = [
        DataSource::CvLibrary,
        DataSource::Reed,
        DataSource::Linkedin,
        DataSource::Glassdoor,
        DataSource::Nhs,
        DataSource::SimplyHired,
        DataSource::TotalJobs,
    ];

    /// Stable tag stored in the `data_source` column.
    pub fn tag(self) -> &'static str {
        match self {
            DataSource::CvLibrary => "cv_library",
            DataSource::Reed => "reed",
            DataSource::Linkedin => "linkedin",
            DataSource::Glassdoor => "glassdoor",
            DataSource::Nhs => "nhs",
            DataSource::SimplyHired => "simplyhired",
            DataSource::TotalJobs => "totaljobs",
        }
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Error returned when parsing an unknown source tag.
#[derive(Debug, thiserror::Error)]
#[error("Unknown data source: {0}")]
pub struct UnknownSource(pub String);

impl FromStr for DataSource {
    type Err = UnknownSource;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cv_library" | "cvlibrary" => Ok(DataSource::CvLibrary),
            "reed" => Ok(DataSource::Reed),
            "linkedin" => Ok(DataSource::Linkedin),
            "glassdoor" => Ok(DataSource::Glassdoor),
            "nhs" => Ok(DataSource::Nhs),
            "simplyhired" => Ok(DataSource::SimplyHired),
            "totaljobs" => Ok(DataSource::TotalJobs),
            other => Err(UnknownSource(other.to_string())),
        }
    }
}

/// A normalized job listing, common across every board.
///
/// Free-text fields are kept as scraped; [`JobRecord::fill_defaults`]
/// substitutes placeholders for anything mandatory that came back empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    pub job_title: String,
    pub company_name: String,
    pub company_logo: Option<String>,
    /// Salary exactly as displayed on the board, e.g. `£38,000 - £42,000`.
    pub salary: Option<String>,
    pub posted_date: NaiveDate,
    /// Experience / contract text (full-time, permanent, ...).
    pub experience: Option<String>,
    pub location: Option<String>,
    pub apply_link: String,
    pub description: Option<String>,
    pub source: DataSource,
}

impl JobRecord {
    /// Substitute placeholders for mandatory fields that came back empty.
    ///
    /// Mirrors the defaulting applied just before the batch insert: a
    /// record is never dropped for a missing title or company, it is
    /// stored with a placeholder instead.
    pub fn fill_defaults(&mut self) {
        if self.job_title.trim().is_empty() {
            self.job_title = DEFAULT_TITLE.to_string();
        }
        if self.company_name.trim().is_empty() {
            self.company_name = DEFAULT_COMPANY.to_string();
        }
        if self
            .salary
            .as_deref()
            .map(|s| s.trim().is_empty())
            .unwrap_or(true)
        {
            self.salary = Some(NOT_SPECIFIED.to_string());
        }
        if self
            .location
            .as_deref()
            .map(|s| s.trim().is_empty())
            .unwrap_or(true)
        {
            self.location = Some(NOT_SPECIFIED.to_string());
        }
        if self
            .description
            .as_deref()
            .map(|s| s.trim().is_empty())
            .unwrap_or(true)
        {
            self.description = Some(DEFAULT_DESCRIPTION.to_string());
        }
    }
}

/// Drop records whose apply link was already seen, keeping the first.
///
/// Boards repeat listings across pages and regions; the apply link is the
/// only stable identity a record carries.
pub fn dedup_by_apply_link(jobs: Vec<JobRecord>) -> Vec<JobRecord> {
    let mut seen: HashSet<String> = HashSet::with_capacity(jobs.len());
    jobs.into_iter()
        .filter(|job| seen.insert(job.apply_link.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn record(apply_link: &str) -> JobRecord {
        JobRecord {
            job_title: "Data Engineer".to_string(),
            company_name: "Acme Ltd".to_string(),
            company_logo: None,
            salary: Some("£45,000".to_string()),
            posted_date: NaiveDate::from_ymd_opt(2025, 4, 19).unwrap(),
            experience: None,
            location: Some("London".to_string()),
            apply_link: apply_link.to_string(),
            description: Some("desc".to_string()),
            source: DataSource::Reed,
        }
    }

    #[test]
    fn data_source_tags_round_trip() {
        for source in DataSource::ALL {
            let parsed: DataSource = source.tag().parse().expect("tag should parse");
            assert_eq!(parsed, source);
        }
    }

    #[test]
    fn data_source_rejects_unknown_tag() {
        let err = "monster".parse::<DataSource>().unwrap_err();
        assert_eq!(err.to_string(), "Unknown data source: monster");
    }

    #[test]
    fn fill_defaults_replaces_empty_mandatory_fields() {
        let mut job = record("https://example.com/job/1");
        job.job_title = "  ".to_string();
        job.company_name = String::new();
        job.salary = None;
        job.location = Some(String::new());
        job.description = None;

        job.fill_defaults();

        assert_eq!(job.job_title, DEFAULT_TITLE);
        assert_eq!(job.company_name, DEFAULT_COMPANY);
        assert_eq!(job.salary.as_deref(), Some(NOT_SPECIFIED));
        assert_eq!(job.location.as_deref(), Some(NOT_SPECIFIED));
        assert_eq!(job.description.as_deref(), Some(DEFAULT_DESCRIPTION));
    }

    #[test]
    fn fill_defaults_keeps_populated_fields() {
        let mut job = record("https://example.com/job/2");
        job.fill_defaults();

        assert_eq!(job.job_title, "Data Engineer");
        assert_eq!(job.salary.as_deref(), Some("£45,000"));
    }

    #[test]
    fn dedup_keeps_first_occurrence() {
        let mut second = record("https://example.com/job/a");
        second.job_title = "Duplicate".to_string();
        let jobs = vec![
            record("https://example.com/job/a"),
            second,
            record("https://example.com/job/b"),
        ];

        let deduped = dedup_by_apply_link(jobs);

        assert_eq!(deduped.len(), 2);
        assert_eq!(deduped[0].job_title, "Data Engineer");
        assert_eq!(deduped[1].apply_link, "https://example.com/job/b");
    }
}
