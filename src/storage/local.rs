//! Local JSON backup of the published result set.
//!
//! The file holds a plain JSON array of active schemes and is replaced
//! atomically (temp file, then rename) on every run.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use crate::error::Result;
use crate::models::ResultSet;
use crate::storage::{Publication, ResultSink};

/// Backup file sink.
#[derive(Debug, Clone)]
pub struct JsonBackup {
    path: PathBuf,
}

impl JsonBackup {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Ensure parent directory exists.
    async fn ensure_dir(&self) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, bytes: &[u8]) -> Result<()> {
        self.ensure_dir().await?;

        let tmp = self.path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl ResultSink for JsonBackup {
    fn name(&self) -> &str {
        "backup"
    }

    async fn publish(&self, results: &ResultSet) -> Result<Publication> {
        let bytes = serde_json::to_vec_pretty(results)?;
        self.write_bytes(&bytes).await?;

        Ok(Publication::Written {
            count: results.len(),
            location: self.path.display().to_string(),
            replaced: None,
        })
    }
}
