//! Crawler module for visiting sources and filling the outbox
//!
//! This module contains the sweep side of the relay, including:
//! - The retry ledger and watermark handling ([`Scheduler`])
//! - Page fetching and article extraction ([`Fetcher`], [`HttpFetcher`])
//! - The sweep itself ([`SweepRunner`])
//! - Importing configured sources into the store

mod coordinator;
mod fetcher;
mod import;
mod parser;
mod scheduler;

pub use coordinator::{SweepReport, SweepRunner, VisitError};
pub use fetcher::{build_http_client, FetchError, Fetcher, HttpFetcher};
pub use import::import_sources;
pub use parser::{extract_articles, ExtractError, ExtractedArticle};
pub use scheduler::Scheduler;
