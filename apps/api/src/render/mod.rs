// Document rendering: LaTeX source → PDF via an external compiler binary.
// The compiler runs as a subprocess; nothing here parses LaTeX.

pub mod pdflatex;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;

pub use pdflatex::PdfLatexCompiler;

#[derive(Debug, Error)]
pub enum CompileError {
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("PDF conversion failed on pass {pass} (exit code {code:?}): {stderr}")]
    Failed {
        pass: u8,
        code: Option<i32>,
        stderr: String,
    },

    #[error("Compiler pass {pass} timed out after {secs}s")]
    Timeout { pass: u8, secs: u64 },

    #[error("Compiler reported success but {} was not created", .0.display())]
    MissingArtifact(PathBuf),

    #[error("'{0}' is not a single directory name")]
    InvalidSubdir(String),
}

impl CompileError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        CompileError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Turns document source text into a rendered artifact on disk.
///
/// `subdir` is a single path component below the compiler's output root, so
/// callers rendering the same `stem` into different subdirectories never share files.
///
/// Carried in `AppState` as `Arc<dyn DocumentCompiler>`.
#[async_trait]
pub trait DocumentCompiler: Send + Sync {
    /// Writes `<subdir>/<stem>.<source ext>` and renders it, returning the rendered file's path.
    async fn render(&self, source_text: &str, subdir: &str, stem: &str) -> Result<PathBuf, CompileError>;

    /// Path the source text for `stem` in `subdir` is written to.
    fn source_path(&self, subdir: &str, stem: &str) -> PathBuf;
}
