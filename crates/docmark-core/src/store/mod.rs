//! Durable metadata persistence, one JSON record per document
//!
//! Records are published atomically: `save` serializes to a temp file in
//! the metadata directory and renames it over the destination, so a
//! concurrent reader observes either the complete record or none. Writes
//! for different documents touch different files and never interfere.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::models::MetadataRecord;

/// File-backed store of [`MetadataRecord`]s keyed by `doc_id`
#[derive(Debug, Clone)]
pub struct MetadataStore {
    dir: PathBuf,
}

impl MetadataStore {
    /// Open (creating if needed) a store rooted at the given directory
    pub fn open(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    /// Persist a record; overwrites any previous record for the same id
    pub fn save(&self, record: &MetadataRecord) -> Result<()> {
        validate_doc_id(&record.doc_id)?;

        let path = self.record_path(&record.doc_id);
        let tmp = self.dir.join(format!(".{}.json.tmp", record.doc_id));

        let content = serde_json::to_vec_pretty(record)?;
        std::fs::write(&tmp, content)?;
        // Rename publishes the record in one step; readers never see a
        // partially written file
        std::fs::rename(&tmp, &path)?;

        tracing::debug!(
            doc_id = %record.doc_id,
            chunk_count = record.chunk_count,
            "Saved metadata record"
        );
        Ok(())
    }

    /// Fetch a record, or `Error::NotFound` for an unknown id
    pub fn get(&self, doc_id: &str) -> Result<MetadataRecord> {
        validate_doc_id(doc_id)?;

        let path = self.record_path(doc_id);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::NotFound(doc_id.to_string()));
            }
            Err(e) => return Err(e.into()),
        };
        Ok(serde_json::from_str(&content)?)
    }

    /// Whether a record exists for the given id
    pub fn exists(&self, doc_id: &str) -> bool {
        validate_doc_id(doc_id).is_ok() && self.record_path(doc_id).is_file()
    }

    /// All stored document ids, sorted for deterministic iteration
    pub fn list_ids(&self) -> Result<Vec<String>> {
        let mut ids = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                    ids.push(stem.to_string());
                }
            }
        }
        ids.sort();
        Ok(ids)
    }

    fn record_path(&self, doc_id: &str) -> PathBuf {
        self.dir.join(format!("{doc_id}.json"))
    }
}

/// Ids become file names; reject anything that could escape the store
/// directory
fn validate_doc_id(doc_id: &str) -> Result<()> {
    if doc_id.is_empty()
        || doc_id == "."
        || doc_id == ".."
        || doc_id.contains('/')
        || doc_id.contains('\\')
    {
        return Err(Error::StorageFailure(format!(
            "invalid document id: {doc_id:?}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BoundingBox, Chunk};

    fn record(doc_id: &str, texts: &[&str]) -> MetadataRecord {
        let chunks: Vec<Chunk> = texts
            .iter()
            .enumerate()
            .map(|(i, text)| Chunk {
                chunk_id: i,
                doc_id: doc_id.to_string(),
                page_number: 1,
                bounding_box: BoundingBox::new(10.0, 10.0, 200.0, 30.0),
                text: text.to_string(),
                order: i,
            })
            .collect();
        MetadataRecord {
            doc_id: doc_id.to_string(),
            source_path: format!("/data/uploads/{doc_id}.pdf"),
            pdf_hash: "hash".to_string(),
            page_count: 1,
            title: None,
            chunk_count: chunks.len(),
            chunks,
            created_at: "2024-01-01T00:00:00Z".to_string(),
        }
    }

    #[test]
    fn test_save_then_get_round_trips() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = MetadataStore::open(temp_dir.path()).unwrap();

        let saved = record("doc-1", &["alpha", "beta"]);
        store.save(&saved).unwrap();

        let loaded = store.get("doc-1").unwrap();
        assert_eq!(loaded, saved);
    }

    #[test]
    fn test_get_unknown_id_is_not_found() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = MetadataStore::open(temp_dir.path()).unwrap();

        let err = store.get("missing").unwrap_err();
        assert!(matches!(err, Error::NotFound(id) if id == "missing"));
    }

    #[test]
    fn test_save_is_overwrite_idempotent() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = MetadataStore::open(temp_dir.path()).unwrap();

        let first = record("doc-1", &["old text"]);
        store.save(&first).unwrap();
        let second = record("doc-1", &["new text"]);
        store.save(&second).unwrap();
        store.save(&second).unwrap();

        assert_eq!(store.get("doc-1").unwrap(), second);
        assert_eq!(store.list_ids().unwrap(), vec!["doc-1"]);
    }

    #[test]
    fn test_exists_tracks_saved_records() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = MetadataStore::open(temp_dir.path()).unwrap();

        assert!(!store.exists("doc-1"));
        store.save(&record("doc-1", &["text"])).unwrap();
        assert!(store.exists("doc-1"));
    }

    #[test]
    fn test_list_ids_is_sorted() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = MetadataStore::open(temp_dir.path()).unwrap();

        store.save(&record("zeta", &[])).unwrap();
        store.save(&record("alpha", &[])).unwrap();
        store.save(&record("mid", &[])).unwrap();

        assert_eq!(store.list_ids().unwrap(), vec!["alpha", "mid", "zeta"]);
    }

    #[test]
    fn test_no_temp_files_left_behind() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = MetadataStore::open(temp_dir.path()).unwrap();
        store.save(&record("doc-1", &["text"])).unwrap();

        let leftovers: Vec<_> = std::fs::read_dir(temp_dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.path().extension().is_some_and(|ext| ext == "tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_path_escaping_ids_are_rejected() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = MetadataStore::open(temp_dir.path()).unwrap();

        for bad in ["", "..", "a/b", "a\\b"] {
            let err = store.save(&record(bad, &[])).unwrap_err();
            assert!(matches!(err, Error::StorageFailure(_)), "id {bad:?}");
        }
    }
}
