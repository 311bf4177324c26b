//! Resume tailoring analysis — orchestrates one analysis cycle.
//!
//! Flow: analyze base resume → analyze JD against resume → generate tailored
//!       LaTeX → strip fences / trim → section match against the base.
//!
//! Generation calls run strictly in sequence and are never retried here.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::AppError;
use crate::llm_client::{strip_code_fences, GenerationService};
use crate::resume::sections::{section_diff, ChangeKind, SectionChange, SectionMatcher};
use crate::tailoring::prompts::{build, PromptKind};

/// Request body for an analysis cycle.
#[derive(Debug, Clone, Deserialize)]
pub struct AnalyzeRequest {
    pub company_name: String,
    pub job_description: String,
}

impl AnalyzeRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.company_name.trim().is_empty() || self.job_description.trim().is_empty() {
            return Err(AppError::Validation(
                "Both company_name and job_description are required".to_string(),
            ));
        }
        Ok(())
    }
}

/// The outcome of an analysis cycle, awaiting accept or reject.
#[derive(Debug, Clone, Serialize)]
pub struct Proposal {
    pub company_name: String,
    pub job_description: String,
    pub resume_analysis: String,
    pub job_analysis: String,
    /// Complete tailored LaTeX document, ready to compile.
    pub modified_latex: String,
    pub changes: Vec<SectionChange>,
    /// Markdown review summary of `changes`.
    pub summary: String,
    pub generated_at: DateTime<Utc>,
}

impl Proposal {
    pub fn changed_sections(&self) -> Vec<&str> {
        self.changes.iter().map(|c| c.name.as_str()).collect()
    }
}

/// Runs the three generation calls and compares the result with `base_resume`.
pub async fn analyze(
    generator: &dyn GenerationService,
    matcher: &SectionMatcher,
    base_resume: &str,
    request: &AnalyzeRequest,
) -> Result<Proposal, AppError> {
    request.validate()?;

    let company_name = request.company_name.trim();
    let job_description = request.job_description.trim();
    let fields = HashMap::from([
        ("resume_content", base_resume),
        ("job_description", job_description),
        ("company_name", company_name),
    ]);

    info!("Analyzing base resume for {company_name}");
    let resume_analysis = generator
        .complete(&build(PromptKind::AnalyzeResume, &fields)?)
        .await?;

    info!("Comparing job requirements for {company_name}");
    let job_analysis = generator
        .complete(&build(PromptKind::AnalyzeJobDescription, &fields)?)
        .await?;

    info!("Generating tailored LaTeX for {company_name}");
    let generated = generator
        .complete(&build(PromptKind::TailorLatex, &fields)?)
        .await?;
    let modified_latex = strip_code_fences(&generated).to_string();

    // The accepted text is written trimmed, so the base is compared the same way;
    // otherwise the last section would always differ by its trailing newline.
    let base = base_resume.trim();
    let changes = matcher.compare(base, &modified_latex)?;
    info!(
        "Tailored resume for {company_name} changes {} section(s)",
        changes.len()
    );
    let summary = changes_summary(base, &modified_latex, &changes);

    Ok(Proposal {
        company_name: company_name.to_string(),
        job_description: job_description.to_string(),
        resume_analysis,
        job_analysis,
        modified_latex,
        changes,
        summary,
        generated_at: Utc::now(),
    })
}

/// Markdown summary of section changes for user review, with a diff per section.
pub fn changes_summary(base: &str, modified: &str, changes: &[SectionChange]) -> String {
    let mut md = String::from("### Proposed Changes Summary\n\n");

    if changes.is_empty() {
        md.push_str("No significant changes detected in sections.\n");
        return md;
    }

    md.push_str("The following sections will be changed in your resume:\n\n");
    for change in changes {
        let label = match change.kind {
            ChangeKind::Added => "Added section",
            ChangeKind::Modified => "Modified section",
        };
        md.push_str(&format!("- {label}: `{}`\n", change.name));
    }

    // Repeated names are reported per occurrence but diffed once.
    let mut diffed: Vec<&str> = Vec::new();
    for change in changes {
        if diffed.contains(&change.name.as_str()) {
            continue;
        }
        diffed.push(&change.name);
        md.push_str(&format!("\n#### {}\n\n```diff\n", change.name));
        md.push_str(&section_diff(base, modified, &change.name));
        md.push_str("```\n");
    }

    md.push_str("\nPlease review these changes carefully before accepting.\n");
    md
}
