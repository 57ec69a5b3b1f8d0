//! Flat-file fallback for failed batch writes.
//!
//! When the database rejects a batch, the scraped records are serialized
//! to a timestamped JSON file so a run's output is never lost outright.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use jobsweep_core::job::{DataSource, JobRecord};

/// Errors writing a backup file.
#[derive(Debug, thiserror::Error)]
pub enum BackupError {
    #[error("Failed to write backup file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize backup batch: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Write a failed batch to `<dir>/failed_db_insert_<source>_<ts>.json`.
///
/// Creates the directory if needed and returns the path written.
pub fn write_backup(
    dir: &Path,
    source: DataSource,
    jobs: &[JobRecord],
) -> Result<PathBuf, BackupError> {
    fs::create_dir_all(dir)?;

    let timestamp = Utc::now().format("%Y%m%d_%H%M%S");
    let path = dir.join(format!("failed_db_insert_{}_{timestamp}.json", source.tag()));

    let file = fs::File::create(&path)?;
    serde_json::to_writer_pretty(file, jobs)?;

    tracing::warn!(path = %path.display(), count = jobs.len(), "Wrote batch backup file");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn sample_job() -> JobRecord {
        JobRecord {
            job_title: "Nurse".to_string(),
            company_name: "Barts Health NHS Trust".to_string(),
            company_logo: None,
            salary: Some("£35,000".to_string()),
            posted_date: NaiveDate::from_ymd_opt(2025, 4, 20).unwrap(),
            experience: None,
            location: Some("London".to_string()),
            apply_link: "https://www.jobs.nhs.uk/candidate/jobadvert/1".to_string(),
            description: None,
            source: DataSource::Nhs,
        }
    }

    #[test]
    fn writes_batch_and_returns_path() {
        let dir = std::env::temp_dir().join("jobsweep_backup_test");
        let path = write_backup(&dir, DataSource::Nhs, &[sample_job()]).unwrap();

        assert!(path.exists());
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("failed_db_insert_nhs_"));
        assert!(name.ends_with(".json"));

        let contents = std::fs::read_to_string(&path).unwrap();
        let parsed: Vec<JobRecord> = serde_json::from_str(&contents).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].company_name, "Barts Health NHS Trust");

        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn empty_batch_still_writes_a_file() {
        let dir = std::env::temp_dir().join("jobsweep_backup_empty_test");
        let path = write_backup(&dir, DataSource::Reed, &[]).unwrap();
        assert!(path.exists());
        std::fs::remove_dir_all(&dir).ok();
    }
}
