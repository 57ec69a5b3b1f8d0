//! Environment-driven runner configuration.

use std::path::PathBuf;

use jobsweep_core::job::DataSource;

/// Annual salary floor applied when `MIN_ANNUAL_SALARY` is unset.
pub const DEFAULT_MIN_ANNUAL_SALARY: u32 = 30_000;

/// Backup directory used when `BACKUP_DIR` is unset.
pub const DEFAULT_BACKUP_DIR: &str = "data/backup";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    MissingVar(&'static str),

    #[error("{name} has invalid value {value:?}")]
    InvalidVar { name: &'static str, value: String },

    #[error("SOURCES names an unknown board: {0}")]
    UnknownSource(String),
}

/// Everything a run needs, resolved once at startup.
#[derive(Debug)]
pub struct RunnerConfig {
    pub database_url: String,
    pub allowlist_csv: PathBuf,
    pub sources: Vec<DataSource>,
    pub min_annual_salary: u32,
    pub max_pages: Option<u32>,
    pub backup_dir: PathBuf,
    pub telegram_bot_token: Option<String>,
}

impl RunnerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url =
            std::env::var("DATABASE_URL").map_err(|_| ConfigError::MissingVar("DATABASE_URL"))?;
        let allowlist_csv = std::env::var("ALLOWLIST_CSV")
            .map_err(|_| ConfigError::MissingVar("ALLOWLIST_CSV"))?
            .into();

        let sources = match std::env::var("SOURCES") {
            Ok(raw) => parse_sources(&raw)?,
            Err(_) => DataSource::ALL.to_vec(),
        };

        let min_annual_salary = parse_optional("MIN_ANNUAL_SALARY")?
            .unwrap_or(DEFAULT_MIN_ANNUAL_SALARY);
        let max_pages = parse_optional("MAX_PAGES")?;

        let backup_dir = std::env::var("BACKUP_DIR")
            .unwrap_or_else(|_| DEFAULT_BACKUP_DIR.to_string())
            .into();

        let telegram_bot_token = std::env::var("TELEGRAM_BOT_TOKEN")
            .ok()
            .filter(|t| !t.is_empty());

        Ok(Self {
            database_url,
            allowlist_csv,
            sources,
            min_annual_salary,
            max_pages,
            backup_dir,
            telegram_bot_token,
        })
    }
}

/// Parse a comma-separated board list; `all` expands to every board.
pub fn parse_sources(raw: &str) -> Result<Vec<DataSource>, ConfigError> {
    if raw.trim().eq_ignore_ascii_case("all") {
        return Ok(DataSource::ALL.to_vec());
    }

    let mut sources = Vec::new();
    for part in raw.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let source = part
            .parse::<DataSource>()
            .map_err(|_| ConfigError::UnknownSource(part.to_string()))?;
        if !sources.contains(&source) {
            sources.push(source);
        }
    }

    if sources.is_empty() {
        return Err(ConfigError::UnknownSource(raw.to_string()));
    }
    Ok(sources)
}

fn parse_optional(name: &'static str) -> Result<Option<u32>, ConfigError> {
    match std::env::var(name) {
        Ok(value) => value
            .parse::<u32>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidVar { name, value }),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_comma_separated_sources() {
        let sources = parse_sources("reed, nhs,cv_library").unwrap();
        assert_eq!(
            sources,
            vec![DataSource::Reed, DataSource::Nhs, DataSource::CvLibrary]
        );
    }

    #[test]
    fn all_expands_to_every_board() {
        assert_eq!(parse_sources("all").unwrap().len(), DataSource::ALL.len());
        assert_eq!(parse_sources(" ALL ").unwrap().len(), DataSource::ALL.len());
    }

    #[test]
    fn duplicate_sources_collapse() {
        let sources = parse_sources("reed,reed,reed").unwrap();
        assert_eq!(sources, vec![DataSource::Reed]);
    }

    #[test]
    fn unknown_source_is_an_error() {
        let err = parse_sources("reed,monster").unwrap_err();
        assert!(matches!(err, ConfigError::UnknownSource(s) if s == "monster"));
    }

    #[test]
    fn empty_list_is_an_error() {
        assert!(parse_sources(" , ,").is_err());
    }
}
