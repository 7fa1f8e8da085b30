//! One scrape run end to end: search discovery, platform scraping, recency
//! matching and the snapshot write, plus the periodic trigger around it.

mod report;
mod service;


pub use report::{PlatformReport, RunReport};
pub use service::{RunState, ScrapeService};
