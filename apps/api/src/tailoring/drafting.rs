//! CV drafting — a Markdown CV generated from a job description alone,
//! without the base LaTeX template.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::errors::AppError;
use crate::llm_client::{strip_code_fences, GenerationService};
use crate::tailoring::prompts::{build, PromptKind};

#[derive(Debug, Clone, Deserialize)]
pub struct DraftCvRequest {
    pub job_description: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DraftCvResponse {
    pub cv_markdown: String,
}

pub async fn draft_cv(
    generator: &dyn GenerationService,
    job_description: &str,
) -> Result<String, AppError> {
    let job_description = job_description.trim();
    if job_description.is_empty() {
        return Err(AppError::Validation(
            "job_description cannot be empty".to_string(),
        ));
    }

    let fields = HashMap::from([("job_description", job_description)]);
    let prompt = build(PromptKind::DraftCv, &fields)?;

    info!("Drafting CV ({} chars of job description)", job_description.len());
    let generated = generator.complete(&prompt).await?;
    Ok(strip_code_fences(&generated).to_string())
}
