//! pdflatex-backed `DocumentCompiler`.
//!
//! The source file is compiled twice so cross-references resolve. By-products
//! (`.aux`, `.log`, `.out`) are deleted only after a successful run; on failure
//! they stay in the output directory for diagnosis.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info, warn};

use crate::render::{CompileError, DocumentCompiler};

const PASSES: u8 = 2;
const BY_PRODUCT_EXTENSIONS: [&str; 3] = ["aux", "log", "out"];

/// One gate per source file currently being rendered.
type RenderGates = Arc<Mutex<HashMap<PathBuf, Arc<Mutex<()>>>>>;

#[derive(Debug, Clone)]
pub struct PdfLatexCompiler {
    program: String,
    output_dir: PathBuf,
    timeout_secs: u64,
    gates: RenderGates,
}

impl PdfLatexCompiler {
    pub fn new(program: impl Into<String>, output_dir: impl Into<PathBuf>, timeout_secs: u64) -> Self {
        Self {
            program: program.into(),
            output_dir: output_dir.into(),
            timeout_secs,
            gates: RenderGates::default(),
        }
    }

    fn work_dir(&self, subdir: &str) -> Result<PathBuf, CompileError> {
        let mut components = Path::new(subdir).components();
        match (components.next(), components.next()) {
            (Some(Component::Normal(_)), None) => Ok(self.output_dir.join(subdir)),
            _ => Err(CompileError::InvalidSubdir(subdir.to_string())),
        }
    }

    /// Serializes renders of the same source file; different files run in parallel.
    async fn enter_gate(&self, tex_path: &Path) -> OwnedMutexGuard<()> {
        let gate = self
            .gates
            .lock()
            .await
            .entry(tex_path.to_path_buf())
            .or_default()
            .clone();
        gate.lock_owned().await
    }

    async fn prune_gates(&self) {
        self.gates
            .lock()
            .await
            .retain(|_, gate| Arc::strong_count(gate) > 1);
    }

    async fn compile(&self, work_dir: &Path, source_text: &str, stem: &str) -> Result<PathBuf, CompileError> {
        tokio::fs::create_dir_all(work_dir)
            .await
            .map_err(|e| CompileError::io(work_dir, e))?;

        let tex_path = work_dir.join(format!("{stem}.tex"));
        tokio::fs::write(&tex_path, source_text)
            .await
            .map_err(|e| CompileError::io(&tex_path, e))?;
        info!("Wrote {}", tex_path.display());

        let tex_name = format!("{stem}.tex");
        for pass in 1..=PASSES {
            self.run_pass(pass, work_dir, &tex_name).await?;
        }

        let pdf_path = work_dir.join(format!("{stem}.pdf"));
        if !exists(&pdf_path).await? {
            return Err(CompileError::MissingArtifact(pdf_path));
        }

        remove_by_products(work_dir, stem).await;
        info!("Rendered {}", pdf_path.display());
        Ok(pdf_path)
    }

    async fn run_pass(&self, pass: u8, work_dir: &Path, tex_name: &str) -> Result<(), CompileError> {
        let child = Command::new(&self.program)
            .arg("-interaction=nonstopmode")
            .arg(tex_name)
            .current_dir(work_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| CompileError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        let output = tokio::time::timeout(
            Duration::from_secs(self.timeout_secs),
            child.wait_with_output(),
        )
        .await
        .map_err(|_| CompileError::Timeout {
            pass,
            secs: self.timeout_secs,
        })?
        .map_err(|e| CompileError::io(work_dir, e))?;

        if !output.status.success() {
            debug!(
                "{} pass {pass} stdout:\n{}",
                self.program,
                String::from_utf8_lossy(&output.stdout)
            );
            return Err(CompileError::Failed {
                pass,
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        debug!("{} pass {pass}/{PASSES} succeeded for {tex_name}", self.program);
        Ok(())
    }
}

async fn remove_by_products(work_dir: &Path, stem: &str) {
    for ext in BY_PRODUCT_EXTENSIONS {
        let path = work_dir.join(format!("{stem}.{ext}"));
        match tokio::fs::remove_file(&path).await {
            Ok(()) => debug!("Removed {}", path.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => warn!("Could not remove {}: {e}", path.display()),
        }
    }
}

#[async_trait]
impl DocumentCompiler for PdfLatexCompiler {
    async fn render(&self, source_text: &str, subdir: &str, stem: &str) -> Result<PathBuf, CompileError> {
        let work_dir = self.work_dir(subdir)?;
        let gate = self.enter_gate(&work_dir.join(format!("{stem}.tex"))).await;
        let result = self.compile(&work_dir, source_text, stem).await;
        drop(gate);
        self.prune_gates().await;
        result
    }

    fn source_path(&self, subdir: &str, stem: &str) -> PathBuf {
        self.output_dir.join(subdir).join(format!("{stem}.tex"))
    }
}

async fn exists(path: &Path) -> Result<bool, CompileError> {
    tokio::fs::try_exists(path)
        .await
        .map_err(|e| CompileError::io(path, e))
}

#[cfg(all(test, unix))]
mod tests {
    use std::os::unix::fs::PermissionsExt;

    use super::*;

    /// Writes an executable shell script standing in for pdflatex.
    /// `$2` is the `.tex` file name; the script runs inside the output directory.
    fn fake_compiler(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("fake-latex");
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    const SUCCEEDS: &str = r#"stem="${2%.tex}"
echo pdf > "$stem.pdf"
echo aux > "$stem.aux"
echo log > "$stem.log"
echo out > "$stem.out"
echo pass >> passes.txt"#;

    #[tokio::test]
    async fn test_render_runs_two_passes_and_cleans_up() {
        let bin = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let program = fake_compiler(bin.path(), SUCCEEDS);
        let compiler = PdfLatexCompiler::new(program.to_string_lossy(), out.path(), 10);

        let pdf = compiler
            .render("\\documentclass{article}", "s1", "Acme_20240101_resume")
            .await
            .unwrap();

        let work = out.path().join("s1");
        assert_eq!(pdf, work.join("Acme_20240101_resume.pdf"));
        assert!(pdf.exists());
        assert_eq!(compiler.source_path("s1", "Acme_20240101_resume"), work.join("Acme_20240101_resume.tex"));
        assert_eq!(
            std::fs::read_to_string(work.join("Acme_20240101_resume.tex")).unwrap(),
            "\\documentclass{article}"
        );
        let passes = std::fs::read_to_string(work.join("passes.txt")).unwrap();
        assert_eq!(passes.lines().count(), 2);
        for ext in BY_PRODUCT_EXTENSIONS {
            assert!(!work.join(format!("Acme_20240101_resume.{ext}")).exists());
        }
    }

    #[tokio::test]
    async fn test_failure_surfaces_stderr_and_keeps_by_products() {
        let bin = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let program = fake_compiler(
            bin.path(),
            r#"stem="${2%.tex}"
echo log > "$stem.log"
echo "! Undefined control sequence." >&2
exit 1"#,
        );
        let compiler = PdfLatexCompiler::new(program.to_string_lossy(), out.path(), 10);

        let err = compiler.render("\\badcommand", "s1", "doc").await.unwrap_err();

        match err {
            CompileError::Failed { pass, code, stderr } => {
                assert_eq!(pass, 1);
                assert_eq!(code, Some(1));
                assert_eq!(stderr, "! Undefined control sequence.\n");
            }
            other => panic!("expected Failed, got {other:?}"),
        }
        assert!(out.path().join("s1").join("doc.log").exists());
    }

    #[tokio::test]
    async fn test_missing_pdf_is_reported() {
        let bin = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let program = fake_compiler(bin.path(), "exit 0");
        let compiler = PdfLatexCompiler::new(program.to_string_lossy(), out.path(), 10);

        let err = compiler.render("x", "s1", "doc").await.unwrap_err();
        assert!(matches!(err, CompileError::MissingArtifact(ref p) if p.ends_with("doc.pdf")));
    }

    #[tokio::test]
    async fn test_missing_binary_is_spawn_error() {
        let out = tempfile::tempdir().unwrap();
        let compiler = PdfLatexCompiler::new("/nonexistent/pdflatex", out.path(), 10);

        let err = compiler.render("x", "s1", "doc").await.unwrap_err();
        assert!(matches!(err, CompileError::Spawn { ref program, .. } if program == "/nonexistent/pdflatex"));
    }

    #[tokio::test]
    async fn test_slow_compiler_times_out() {
        let bin = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let program = fake_compiler(bin.path(), "sleep 30");
        let compiler = PdfLatexCompiler::new(program.to_string_lossy(), out.path(), 1);

        let err = compiler.render("x", "s1", "doc").await.unwrap_err();
        assert!(matches!(err, CompileError::Timeout { pass: 1, secs: 1 }));
    }

    #[tokio::test]
    async fn test_same_stem_in_different_subdirs_is_kept_apart() {
        let bin = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let program = fake_compiler(bin.path(), r#"stem="${2%.tex}"
cp "$2" "$stem.pdf""#);
        let compiler = PdfLatexCompiler::new(program.to_string_lossy(), out.path(), 10);

        let (a, b) = tokio::join!(
            compiler.render("first", "a", "Acme_20240101_resume"),
            compiler.render("second", "b", "Acme_20240101_resume"),
        );

        assert_eq!(std::fs::read_to_string(a.unwrap()).unwrap(), "first");
        assert_eq!(std::fs::read_to_string(b.unwrap()).unwrap(), "second");
    }

    #[tokio::test]
    async fn test_renders_of_one_file_do_not_overlap() {
        let bin = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let program = fake_compiler(
            bin.path(),
            r#"stem="${2%.tex}"
if [ -e busy ]; then echo "overlapping run" >&2; exit 1; fi
touch busy
sleep 0.2
cp "$2" "$stem.pdf"
rm busy"#,
        );
        let compiler = PdfLatexCompiler::new(program.to_string_lossy(), out.path(), 10);

        let (a, b) = tokio::join!(
            compiler.render("first", "s1", "doc"),
            compiler.render("second", "s1", "doc"),
        );

        assert!(a.is_ok(), "{a:?}");
        assert!(b.is_ok(), "{b:?}");
        assert!(compiler.gates.lock().await.is_empty());
    }

    #[tokio::test]
    async fn test_subdir_must_be_one_component() {
        let out = tempfile::tempdir().unwrap();
        let compiler = PdfLatexCompiler::new("pdflatex", out.path(), 10);

        for subdir in ["../escape", "a/b", "", "/abs"] {
            let err = compiler.render("x", subdir, "doc").await.unwrap_err();
            assert!(matches!(err, CompileError::InvalidSubdir(_)), "{subdir}: {err:?}");
        }
    }
}
