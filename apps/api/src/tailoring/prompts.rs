//! Prompt Builder — fills the fixed prompt templates sent to the generation service.
//!
//! Placeholders are `{name}` tokens. Substitution is a single left-to-right pass,
//! so a field value that happens to contain `{company_name}` is inserted verbatim
//! and never expanded a second time.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::llm_client::prompts::LATEX_PRESERVATION_INSTRUCTION;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PromptError {
    #[error("Prompt {kind:?} requires field '{field}' but it was not supplied")]
    MissingField { kind: PromptKind, field: &'static str },
}

/// The fixed prompt templates known to the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromptKind {
    AnalyzeResume,
    AnalyzeJobDescription,
    TailorLatex,
    DraftCv,
}

/// Resume analysis. Replace: {resume_content}
const ANALYZE_RESUME_TEMPLATE: &str = r#"Analyze the following LaTeX resume and extract the key information it contains:
1. Skills
2. Experience
3. Projects
4. Education
5. Achievements

RESUME CONTENT:
{resume_content}

Provide a structured analysis of the current resume content."#;

/// Job description analysis and comparison.
/// Replace: {job_description}, {company_name}, {resume_content}
const ANALYZE_JOB_DESCRIPTION_TEMPLATE: &str = r#"Analyze the following job description and extract:
1. Required skills
2. Required experience
3. Key responsibilities
4. Nice-to-have qualifications

JOB DESCRIPTION:
{job_description}

COMPANY NAME: {company_name}

Compare these requirements with the candidate's current resume:
{resume_content}

Provide:
1. A list of matching qualifications
2. A list of missing qualifications or areas needing enhancement
3. Specific suggestions for resume modifications in LaTeX format
4. Sections that should be prioritized or reordered based on the job requirements"#;

/// Full LaTeX rewrite. Replace: {latex_rules}, {resume_content}, {job_description}
const TAILOR_LATEX_TEMPLATE: &str = r#"You will receive a base LaTeX resume and the requirements of a job the candidate is applying for.

{latex_rules}

BASE LATEX RESUME:
{resume_content}

JOB REQUIREMENTS:
{job_description}

Instructions:
- Analyze the job requirements
- Identify the modifications that make the resume a stronger match
- Make sure every LaTeX command remains intact and all packages are kept
- Return the complete modified LaTeX code"#;

/// Standalone CV draft in Markdown. Replace: {job_description}
const DRAFT_CV_TEMPLATE: &str = r#"Based on the following job description, create a tailored CV that highlights relevant skills and experience.

JOB DESCRIPTION:
{job_description}

Create the CV in Markdown format with these sections:
1. Personal Information (use placeholder data)
2. Professional Summary
3. Key Skills relevant to the job
4. Work Experience (relevant to the job requirements)
5. Education (relevant to the job requirements)
6. Certifications (if applicable)

Make sure the CV is well-structured, professional, and specifically tailored to the job description."#;

impl PromptKind {
    pub fn template(self) -> &'static str {
        match self {
            PromptKind::AnalyzeResume => ANALYZE_RESUME_TEMPLATE,
            PromptKind::AnalyzeJobDescription => ANALYZE_JOB_DESCRIPTION_TEMPLATE,
            PromptKind::TailorLatex => TAILOR_LATEX_TEMPLATE,
            PromptKind::DraftCv => DRAFT_CV_TEMPLATE,
        }
    }

    /// Caller-supplied fields the template needs, in the order they appear.
    pub fn required_fields(self) -> &'static [&'static str] {
        match self {
            PromptKind::AnalyzeResume => &["resume_content"],
            PromptKind::AnalyzeJobDescription => {
                &["job_description", "company_name", "resume_content"]
            }
            PromptKind::TailorLatex => &["resume_content", "job_description"],
            PromptKind::DraftCv => &["job_description"],
        }
    }

    /// Placeholders filled from shared constants rather than caller input.
    fn fixed_fragments(self) -> &'static [(&'static str, &'static str)] {
        match self {
            PromptKind::TailorLatex => &[("latex_rules", LATEX_PRESERVATION_INSTRUCTION)],
            _ => &[],
        }
    }
}

/// Builds the request text for `kind` from `fields`.
///
/// Fails with `MissingField` naming the first required field absent from the map.
/// Fields the template does not use are ignored.
pub fn build(kind: PromptKind, fields: &HashMap<&str, &str>) -> Result<String, PromptError> {
    if let Some(field) = kind
        .required_fields()
        .iter()
        .copied()
        .find(|name| !fields.contains_key(name))
    {
        return Err(PromptError::MissingField { kind, field });
    }

    let template = kind.template();
    let mut out = String::with_capacity(template.len() + fields.values().map(|v| v.len()).sum::<usize>());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let value = after.find('}').and_then(|close| {
            let name = &after[..close];
            lookup(kind, fields, name).map(|value| (value, close))
        });
        match value {
            Some((value, close)) => {
                out.push_str(value);
                rest = &after[close + 1..];
            }
            None => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);

    Ok(out)
}

fn lookup<'a>(kind: PromptKind, fields: &HashMap<&str, &'a str>, name: &str) -> Option<&'a str> {
    if let Some((_, fragment)) = kind.fixed_fragments().iter().find(|(n, _)| *n == name) {
        return Some(*fragment);
    }
    if kind.required_fields().iter().any(|f| *f == name) {
        return fields.get(name).copied();
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_KINDS: [PromptKind; 4] = [
        PromptKind::AnalyzeResume,
        PromptKind::AnalyzeJobDescription,
        PromptKind::TailorLatex,
        PromptKind::DraftCv,
    ];

    fn fields_for(kind: PromptKind) -> HashMap<&'static str, &'static str> {
        kind.required_fields().iter().map(|f| (*f, "VALUE")).collect()
    }

    #[test]
    fn test_every_required_field_appears_in_its_template() {
        for kind in ALL_KINDS {
            for field in kind.required_fields() {
                assert!(
                    kind.template().contains(&format!("{{{field}}}")),
                    "{kind:?} template is missing placeholder {field}"
                );
            }
        }
    }

    #[test]
    fn test_build_leaves_no_placeholders() {
        for kind in ALL_KINDS {
            let prompt = build(kind, &fields_for(kind)).unwrap();
            for field in kind.required_fields() {
                assert!(!prompt.contains(&format!("{{{field}}}")));
            }
            assert!(!prompt.contains("{latex_rules}"));
        }
    }

    #[test]
    fn test_build_substitutes_all_fields() {
        let fields = HashMap::from([
            ("job_description", "Rust backend engineer"),
            ("company_name", "Acme"),
            ("resume_content", "\\section*{Skills}\nGo"),
        ]);
        let prompt = build(PromptKind::AnalyzeJobDescription, &fields).unwrap();
        assert!(prompt.contains("JOB DESCRIPTION:\nRust backend engineer"));
        assert!(prompt.contains("COMPANY NAME: Acme"));
        assert!(prompt.contains("\\section*{Skills}\nGo"));
    }

    #[test]
    fn test_build_reports_missing_field() {
        let fields = HashMap::from([("resume_content", "x")]);
        let err = build(PromptKind::TailorLatex, &fields).unwrap_err();
        assert_eq!(
            err,
            PromptError::MissingField {
                kind: PromptKind::TailorLatex,
                field: "job_description"
            }
        );
    }

    #[test]
    fn test_build_ignores_extra_fields() {
        let fields = HashMap::from([("job_description", "SRE"), ("unused", "zzz")]);
        let prompt = build(PromptKind::DraftCv, &fields).unwrap();
        assert!(prompt.contains("SRE"));
        assert!(!prompt.contains("zzz"));
    }

    #[test]
    fn test_field_values_are_not_reexpanded() {
        // LaTeX braces and placeholder-looking text in a value must survive untouched.
        let fields = HashMap::from([
            ("resume_content", "\\section*{Skills} {job_description}"),
            ("job_description", "JD"),
        ]);
        let prompt = build(PromptKind::TailorLatex, &fields).unwrap();
        assert!(prompt.contains("\\section*{Skills} {job_description}"));
    }

    #[test]
    fn test_tailor_prompt_includes_latex_rules() {
        let prompt = build(PromptKind::TailorLatex, &fields_for(PromptKind::TailorLatex)).unwrap();
        assert!(prompt.contains(LATEX_PRESERVATION_INSTRUCTION));
    }
}
