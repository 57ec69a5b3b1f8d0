//! `jobsweep-core` -- shared domain logic for the job-board scrapers.
//!
//! Pure functions and types only: the normalized job record, the sponsor
//! company allowlist with its matching modes, salary text handling, and
//! posted-date parsing. No I/O beyond loading the allowlist CSV, and no
//! internal dependencies, so every source crate can use it freely.

pub mod allowlist;
pub mod dates;
pub mod job;
pub mod salary;
