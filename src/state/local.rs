//! Local file-based document store.

use async_trait::async_trait;
use serde_yaml::Value;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::config::DocumentParser;
use crate::error::{DocumentError, GorcError, Result};
use crate::models::DesiredState;

use super::store::DocumentStore;

/// Document store backed by a YAML file.
#[derive(Debug)]
pub struct LocalDocumentStore {
    /// Path to the document.
    path: PathBuf,
    /// Parser used for reading and writing.
    parser: DocumentParser,
}

impl LocalDocumentStore {
    /// Creates a store for the document at `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            parser: DocumentParser::new(),
        }
    }

    /// Returns the document path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Ensures the parent directory exists.
    async fn ensure_dir(&self) -> Result<()> {
        if let Some(dir) = self.path.parent().filter(|d| !d.as_os_str().is_empty()) {
            if !dir.exists() {
                debug!("Creating document directory: {}", dir.display());
                fs::create_dir_all(dir).await?;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for LocalDocumentStore {
    async fn load(&self) -> Result<Value> {
        if !self.path.exists() {
            debug!("Document does not exist: {}", self.path.display());
            return self.parser.parse_value("", None);
        }

        info!("Loading document from: {}", self.path.display());

        let content = fs::read_to_string(&self.path).await.map_err(|e| {
            GorcError::Document(DocumentError::parse(
                format!("Failed to read file: {e}"),
                Some(self.path.display().to_string()),
            ))
        })?;

        self.parser.parse_value(&content, Some(&self.path))
    }

    async fn save(&self, state: &DesiredState) -> Result<()> {
        self.ensure_dir().await?;

        info!("Saving document to: {}", self.path.display());

        let content = self.parser.to_yaml(state)?;

        // Write to a temporary file first, then rename for atomicity
        let temp_path = self.path.with_extension("tmp");
        let mut file = fs::File::create(&temp_path).await?;
        file.write_all(content.as_bytes()).await?;
        file.sync_all().await?;
        fs::rename(&temp_path, &self.path).await?;

        debug!("Document saved successfully");
        Ok(())
    }

    async fn exists(&self) -> Result<bool> {
        Ok(self.path.exists())
    }

    fn location(&self) -> String {
        self.path.display().to_string()
    }
}
