//! URL handling module for Feedrelay
//!
//! Article identity is the article's absolute URL, so links extracted from a
//! source page are resolved here before they reach the outbox.

mod resolve;

pub use resolve::{is_absolute_http, resolve_detail_url};
