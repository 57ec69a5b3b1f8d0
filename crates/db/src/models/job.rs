//! Row model for the `jobs` table.

use chrono::NaiveDate;
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `jobs` table.
///
/// Mirrors [`jobsweep_core::job::JobRecord`] plus the surrogate key;
/// `data_source` is the raw tag string as stored.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct JobRow {
    pub id: i64,
    pub job_title: String,
    pub company_name: String,
    pub company_logo: Option<String>,
    pub salary: Option<String>,
    pub posted_date: NaiveDate,
    pub experience: Option<String>,
    pub location: Option<String>,
    pub apply_link: String,
    pub description: Option<String>,
    pub data_source: String,
}
