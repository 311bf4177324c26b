//! Template Store — reads the base LaTeX resume from disk.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum TemplateError {
    #[error("Resume template not found at {}", .0.display())]
    NotFound(PathBuf),

    #[error("Failed to read resume template {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone)]
pub struct TemplateStore {
    path: PathBuf,
}

impl TemplateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the whole template. Called once per analysis cycle so edits to the
    /// template on disk are picked up without a restart.
    pub async fn read(&self) -> Result<String, TemplateError> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => {
                debug!("Read resume template {} ({} bytes)", self.path.display(), text.len());
                Ok(text)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Err(TemplateError::NotFound(self.path.clone())),
            Err(source) => Err(TemplateError::Io {
                path: self.path.clone(),
                source,
            }),
        }
    }
}
