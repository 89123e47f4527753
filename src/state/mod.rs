//! In-process delivery state
//!
//! Everything about sources and articles lives in the store. The only state
//! kept in memory is the delivery backoff deadline.

mod backoff;

pub use backoff::BackoffState;
