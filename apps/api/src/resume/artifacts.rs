//! Artifact Pair — the `.tex` / `.pdf` files written when a proposal is accepted.
//!
//! Files are named `{company}_{yyyyMMdd}_resume.{ext}` and land in a
//! subdirectory of the output root owned by one session, so two sessions
//! accepting the same company on the same day never share files. They are owned
//! by the filesystem afterwards; nothing here tracks or deletes them.

use std::path::PathBuf;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::info;

use crate::errors::AppError;
use crate::render::{CompileError, DocumentCompiler};

#[derive(Debug, Clone, Serialize)]
pub struct ArtifactPair {
    pub tex_file: String,
    pub pdf_file: String,
    #[serde(skip)]
    pub tex_path: PathBuf,
    #[serde(skip)]
    pub pdf_path: PathBuf,
}

/// Company identifier reduced to characters safe for a file name.
///
/// Letters, digits, `-` and `_` are kept; anything else becomes `_`.
pub fn sanitize_company(company: &str) -> Result<String, AppError> {
    let trimmed = company.trim();
    if trimmed.is_empty() {
        return Err(AppError::Validation("company_name cannot be empty".to_string()));
    }
    Ok(trimmed
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect())
}

/// `{company}_{yyyyMMdd}_resume`
pub fn artifact_stem(company: &str, date: NaiveDate) -> Result<String, AppError> {
    Ok(format!(
        "{}_{}_resume",
        sanitize_company(company)?,
        date.format("%Y%m%d")
    ))
}

/// Writes the accepted source text into `subdir` and renders it, returning both file locations.
pub async fn create_artifacts(
    compiler: &dyn DocumentCompiler,
    source_text: &str,
    company: &str,
    date: NaiveDate,
    subdir: &str,
) -> Result<ArtifactPair, AppError> {
    let stem = artifact_stem(company, date)?;
    let pdf_path = compiler.render(source_text.trim(), subdir, &stem).await?;
    let tex_path = compiler.source_path(subdir, &stem);

    let tex_exists = tokio::fs::try_exists(&tex_path)
        .await
        .map_err(|e| CompileError::io(&tex_path, e))?;
    if !tex_exists {
        return Err(CompileError::MissingArtifact(tex_path).into());
    }

    let pair = ArtifactPair {
        tex_file: file_name(&tex_path),
        pdf_file: file_name(&pdf_path),
        tex_path,
        pdf_path,
    };
    info!("Created artifacts {} and {}", pair.tex_file, pair.pdf_file);
    Ok(pair)
}

fn file_name(path: &std::path::Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::Mutex;

    use async_trait::async_trait;

    use super::*;

    /// Compiler that writes both files into a directory without invoking LaTeX.
    /// With `skip_source` it reports success but leaves the `.tex` unwritten.
    struct RecordingCompiler {
        dir: PathBuf,
        seen: Mutex<Vec<String>>,
        skip_source: bool,
    }

    impl RecordingCompiler {
        fn new(dir: &Path) -> Self {
            Self {
                dir: dir.to_path_buf(),
                seen: Mutex::new(Vec::new()),
                skip_source: false,
            }
        }
    }

    #[async_trait]
    impl DocumentCompiler for RecordingCompiler {
        async fn render(&self, source_text: &str, subdir: &str, stem: &str) -> Result<PathBuf, CompileError> {
            self.seen.lock().unwrap().push(source_text.to_string());
            std::fs::create_dir_all(self.dir.join(subdir)).unwrap();
            if !self.skip_source {
                std::fs::write(self.source_path(subdir, stem), source_text).unwrap();
            }
            let pdf = self.dir.join(subdir).join(format!("{stem}.pdf"));
            std::fs::write(&pdf, b"%PDF-1.5").unwrap();
            Ok(pdf)
        }

        fn source_path(&self, subdir: &str, stem: &str) -> PathBuf {
            self.dir.join(subdir).join(format!("{stem}.tex"))
        }
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 7).unwrap()
    }

    #[test]
    fn test_artifact_stem_format() {
        assert_eq!(artifact_stem("Acme", date()).unwrap(), "Acme_20240307_resume");
    }

    #[test]
    fn test_company_is_sanitized() {
        assert_eq!(sanitize_company("  Acme Corp. ").unwrap(), "Acme_Corp_");
        assert_eq!(sanitize_company("../etc/passwd").unwrap(), "___etc_passwd");
        assert_eq!(sanitize_company("data-dog_2").unwrap(), "data-dog_2");
    }

    #[test]
    fn test_blank_company_is_rejected() {
        assert!(matches!(sanitize_company("   "), Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_create_artifacts_trims_and_names_files() {
        let dir = tempfile::tempdir().unwrap();
        let compiler = RecordingCompiler::new(dir.path());

        let pair = create_artifacts(&compiler, "\n\\documentclass{article}\n\n", "Acme", date(), "s1")
            .await
            .unwrap();

        assert_eq!(pair.tex_file, "Acme_20240307_resume.tex");
        assert_eq!(pair.pdf_file, "Acme_20240307_resume.pdf");
        assert_eq!(pair.tex_path, dir.path().join("s1").join("Acme_20240307_resume.tex"));
        assert!(Path::new(&pair.pdf_path).exists());
        assert_eq!(
            compiler.seen.lock().unwrap().as_slice(),
            ["\\documentclass{article}".to_string()]
        );
    }

    #[tokio::test]
    async fn test_unwritten_source_is_missing_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let compiler = RecordingCompiler {
            skip_source: true,
            ..RecordingCompiler::new(dir.path())
        };

        let err = create_artifacts(&compiler, "x", "Acme", date(), "s1").await.unwrap_err();
        assert!(matches!(err, AppError::Compile(CompileError::MissingArtifact(_))));
    }

    /// Reports the source file underneath a regular file, so checking for it fails
    /// with `NotADirectory` rather than `NotFound`.
    struct MisplacedSourceCompiler(RecordingCompiler);

    #[async_trait]
    impl DocumentCompiler for MisplacedSourceCompiler {
        async fn render(&self, source_text: &str, subdir: &str, stem: &str) -> Result<PathBuf, CompileError> {
            self.0.render(source_text, subdir, stem).await
        }

        fn source_path(&self, subdir: &str, stem: &str) -> PathBuf {
            self.0.source_path(subdir, stem).join("nested.tex")
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_source_check_failure_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let compiler = MisplacedSourceCompiler(RecordingCompiler::new(dir.path()));

        let err = create_artifacts(&compiler, "x", "Acme", date(), "s1").await.unwrap_err();
        assert!(matches!(err, AppError::Compile(CompileError::Io { .. })), "{err:?}");
    }
}
