//! Loading configured sources into the store

use crate::config::Config;
use crate::storage::SourceStore;

/// Upserts every configured source, returning how many were stored
///
/// A source that cannot be stored is logged and skipped. Existing sources keep
/// their visit stamp and retry count; only their settings are replaced.
pub fn import_sources<S: SourceStore + ?Sized>(store: &S, config: &Config) -> usize {
    let mut imported = 0;

    for entry in &config.sources {
        let settings = match entry.settings().to_json() {
            Ok(json) => json,
            Err(e) => {
                tracing::error!("Failed to encode settings for {}: {}", entry.name, e);
                continue;
            }
        };

        match store.upsert_source(&entry.name, &entry.url, &settings) {
            Ok(id) => {
                tracing::debug!("Imported source {} as id {}", entry.name, id);
                imported += 1;
            }
            Err(e) => tracing::error!("Failed to import source {}: {}", entry.name, e),
        }
    }

    tracing::info!("Imported {}/{} sources", imported, config.sources.len());
    imported
}
