//! `jobsweep-notify` -- the Telegram side channel for scrape runs.
//!
//! Every scraper reports the same three things: that it started, that it
//! finished with counts, or that it failed somewhere. This crate
//! centralizes that boilerplate behind one best-effort notifier.

pub mod telegram;

pub use telegram::{RunStats, TelegramNotifier};
