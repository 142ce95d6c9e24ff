use std::path::PathBuf;

/// Storage layout configuration
///
/// Root paths for original uploads, derived artifacts, and the metadata
/// backend. Injected into the pipeline rather than read from ambient
/// globals.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Root data directory
    pub data_dir: PathBuf,
    /// Original uploaded PDFs, named `{doc_id}.pdf`
    pub uploads_dir: PathBuf,
    /// Derived artifacts, named `{doc_id}_highlighted.pdf`
    pub outputs_dir: PathBuf,
    /// Metadata records, one JSON file per document
    pub metadata_dir: PathBuf,
}

impl StorageConfig {
    /// Build a configuration rooted at the given data directory
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        Self {
            uploads_dir: data_dir.join("uploads"),
            outputs_dir: data_dir.join("outputs"),
            metadata_dir: data_dir.join("metadata"),
            data_dir,
        }
    }

    /// Default configuration under the platform data directory
    /// (~/.local/share/docmark)
    pub fn load_or_default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("docmark");
        Self::new(data_dir)
    }

    /// Ensure all required directories exist
    pub fn ensure_dirs(&self) -> std::io::Result<()> {
        std::fs::create_dir_all(&self.data_dir)?;
        std::fs::create_dir_all(&self.uploads_dir)?;
        std::fs::create_dir_all(&self.outputs_dir)?;
        std::fs::create_dir_all(&self.metadata_dir)?;
        Ok(())
    }

    /// Path of the stored original for a document
    pub fn upload_path(&self, doc_id: &str) -> PathBuf {
        self.uploads_dir.join(format!("{doc_id}.pdf"))
    }

    /// Path of the highlighted artifact for a document
    pub fn highlight_path(&self, doc_id: &str) -> PathBuf {
        self.outputs_dir.join(format!("{doc_id}_highlighted.pdf"))
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use super::*;

    #[test]
    fn test_paths_derive_from_data_dir() {
        let config = StorageConfig::new("/tmp/docmark-test");
        assert_eq!(config.uploads_dir, Path::new("/tmp/docmark-test/uploads"));
        assert_eq!(config.outputs_dir, Path::new("/tmp/docmark-test/outputs"));
        assert_eq!(
            config.metadata_dir,
            Path::new("/tmp/docmark-test/metadata")
        );
    }

    #[test]
    fn test_artifact_naming() {
        let config = StorageConfig::new("/data");
        assert_eq!(
            config.upload_path("invoice-1a2b3c4d"),
            Path::new("/data/uploads/invoice-1a2b3c4d.pdf")
        );
        assert_eq!(
            config.highlight_path("invoice-1a2b3c4d"),
            Path::new("/data/outputs/invoice-1a2b3c4d_highlighted.pdf")
        );
    }

    #[test]
    fn test_ensure_dirs_creates_tree() {
        let temp_dir = tempfile::tempdir().unwrap();
        let config = StorageConfig::new(temp_dir.path().join("data"));
        config.ensure_dirs().unwrap();
        assert!(config.uploads_dir.is_dir());
        assert!(config.outputs_dir.is_dir());
        assert!(config.metadata_dir.is_dir());
    }
}
