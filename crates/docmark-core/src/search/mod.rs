//! Keyword lookup across persisted chunk text
//!
//! Matching policy: case-insensitive substring containment of the trimmed
//! query. Results are ordered by `doc_id`, then `chunk_id`, which makes
//! the output deterministic without any ranking. The scan reads only
//! durably saved records, so a chunk becomes searchable exactly when its
//! owning record's save completes.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::store::MetadataStore;

/// A chunk whose text contains the query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchMatch {
    pub doc_id: String,
    pub chunk_id: usize,
    pub page_number: u32,
    /// Full text of the matching chunk
    pub text: String,
}

/// Keyword index over every record in a metadata store
#[derive(Debug, Clone)]
pub struct SearchIndex {
    store: MetadataStore,
}

impl SearchIndex {
    pub fn new(store: MetadataStore) -> Self {
        Self { store }
    }

    /// All chunks containing `query`, case-insensitively
    ///
    /// An empty (or all-whitespace) query matches nothing. Records that
    /// fail to load are skipped so one bad entry cannot hide the rest.
    pub fn search(&self, query: &str) -> Result<Vec<SearchMatch>> {
        let needle = query.trim().to_lowercase();
        if needle.is_empty() {
            return Ok(Vec::new());
        }

        let mut matches = Vec::new();
        for doc_id in self.store.list_ids()? {
            let record = match self.store.get(&doc_id) {
                Ok(record) => record,
                Err(e) => {
                    tracing::warn!(doc_id = %doc_id, error = %e, "Skipping unreadable record");
                    continue;
                }
            };
            for chunk in &record.chunks {
                if chunk.text.to_lowercase().contains(&needle) {
                    matches.push(SearchMatch {
                        doc_id: chunk.doc_id.clone(),
                        chunk_id: chunk.chunk_id,
                        page_number: chunk.page_number,
                        text: chunk.text.clone(),
                    });
                }
            }
        }

        tracing::debug!(query = %query, hits = matches.len(), "Search completed");
        Ok(matches)
    }
}
