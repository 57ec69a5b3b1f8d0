//! Sponsor company allowlist and the name-matching modes used against it.
//!
//! The allowlist is the UK sponsor register CSV (one `Organisation Name`
//! per row). Scraped employer names are noisy -- punctuation, suffixes,
//! casing -- so each board picks the matching mode that fits how it
//! renders employer names: exact cleaned membership, bidirectional
//! substring containment, word overlap, or fuzzy similarity.

use std::collections::HashSet;
use std::path::Path;

/// CSV column holding the sponsor organisation name.
pub const ORGANISATION_COLUMN: &str = "Organisation Name";

/// Minimum normalized similarity for a fuzzy match to count.
pub const FUZZY_MATCH_THRESHOLD: f64 = 0.8;

/// Generic company words ignored by word-overlap matching. A name that
/// only shares these with an allowlist entry is not a match.
const COMMON_COMPANY_WORDS: [&str; 10] = [
    "ltd",
    "limited",
    "llc",
    "inc",
    "incorporated",
    "the",
    "and",
    "company",
    "group",
    "services",
];

/// Errors loading the allowlist CSV.
#[derive(Debug, thiserror::Error)]
pub enum AllowlistError {
    /// The CSV could not be read or parsed.
    #[error("Failed to read allowlist CSV: {0}")]
    Csv(#[from] csv::Error),

    /// The expected organisation-name column is missing.
    #[error("Allowlist CSV has no '{0}' column")]
    MissingColumn(&'static str),

    /// The CSV parsed but produced no usable names.
    #[error("Allowlist CSV contained no company names")]
    Empty,
}

/// Normalize a company name for comparison: lowercase, strip everything
/// that is not alphanumeric or whitespace, collapse runs of whitespace.
pub fn clean_company_name(name: &str) -> String {
    let lowered = name.trim().to_lowercase();
    let stripped: String = lowered
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || c.is_whitespace() {
                c
            } else {
                ' '
            }
        })
        .collect();
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// The set of target companies, cleaned once at load time.
#[derive(Debug, Clone)]
pub struct CompanyAllowlist {
    /// Cleaned names in load order, for fuzzy scans.
    names: Vec<String>,
    /// Cleaned names for O(1) exact membership.
    index: HashSet<String>,
}

impl CompanyAllowlist {
    /// Load the allowlist from the sponsor register CSV.
    ///
    /// Rows with an empty organisation name are dropped. Returns
    /// [`AllowlistError::Empty`] if nothing survives cleaning, which
    /// would otherwise silently turn every scrape into a no-op.
    pub fn from_csv(path: &Path) -> Result<Self, AllowlistError> {
        let mut reader = csv::Reader::from_path(path)?;
        let headers = reader.headers()?.clone();
        let column = headers
            .iter()
            .position(|h| h == ORGANISATION_COLUMN)
            .ok_or(AllowlistError::MissingColumn(ORGANISATION_COLUMN))?;

        let mut names = Vec::new();
        for record in reader.records() {
            let record = record?;
            if let Some(raw) = record.get(column) {
                let cleaned = clean_company_name(raw);
                if !cleaned.is_empty() {
                    names.push(cleaned);
                }
            }
        }
        if names.is_empty() {
            return Err(AllowlistError::Empty);
        }
        Ok(Self::from_cleaned(names))
    }

    /// Build an allowlist from raw names. Used by tests and callers that
    /// already hold the register in memory.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let cleaned = names
            .into_iter()
            .map(|n| clean_company_name(n.as_ref()))
            .filter(|n| !n.is_empty())
            .collect();
        Self::from_cleaned(cleaned)
    }

    fn from_cleaned(names: Vec<String>) -> Self {
        let index = names.iter().cloned().collect();
        Self { names, index }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Exact membership of the cleaned employer name.
    pub fn matches_exact(&self, employer: &str) -> bool {
        self.index.contains(&clean_company_name(employer))
    }

    /// Bidirectional substring containment: the employer contains an
    /// allowlist entry or vice versa. Catches "Barts Health NHS Trust"
    /// vs the register's "Barts Health".
    pub fn matches_substring(&self, employer: &str) -> bool {
        let cleaned = clean_company_name(employer);
        if cleaned.is_empty() {
            return false;
        }
        self.names
            .iter()
            .any(|name| cleaned.contains(name.as_str()) || name.contains(&cleaned))
    }

    /// Word-overlap match after dropping generic company words.
    pub fn matches_word_overlap(&self, employer: &str) -> bool {
        let cleaned = clean_company_name(employer);
        let employer_words: HashSet<&str> = cleaned
            .split_whitespace()
            .filter(|w| !COMMON_COMPANY_WORDS.contains(w))
            .collect();
        if employer_words.is_empty() {
            return false;
        }
        self.names.iter().any(|name| {
            name.split_whitespace()
                .filter(|w| !COMMON_COMPANY_WORDS.contains(w))
                .any(|w| employer_words.contains(w))
        })
    }

    /// Best fuzzy match over the whole register, as (entry, similarity).
    ///
    /// Similarity is normalized Levenshtein over cleaned names, in
    /// `0.0..=1.0`.
    pub fn best_fuzzy_match(&self, employer: &str) -> Option<(&str, f64)> {
        let cleaned = clean_company_name(employer);
        if cleaned.is_empty() {
            return None;
        }
        self.names
            .iter()
            .map(|name| (name.as_str(), strsim::normalized_levenshtein(&cleaned, name)))
            .max_by(|a, b| a.1.total_cmp(&b.1))
    }

    /// Whether the best fuzzy match clears [`FUZZY_MATCH_THRESHOLD`].
    pub fn matches_fuzzy(&self, employer: &str) -> bool {
        self.best_fuzzy_match(employer)
            .map(|(_, score)| score > FUZZY_MATCH_THRESHOLD)
            .unwrap_or(false)
    }
}
