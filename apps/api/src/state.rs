use std::sync::Arc;

use crate::llm_client::GenerationService;
use crate::render::DocumentCompiler;
use crate::resume::sections::SectionMatcher;
use crate::resume::template_store::TemplateStore;
use crate::tailoring::session::SessionStore;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Remote text generation. Default: `LlmClient`; tests swap in a scripted fake.
    pub generator: Arc<dyn GenerationService>,
    /// LaTeX → PDF. Default: `PdfLatexCompiler`.
    pub compiler: Arc<dyn DocumentCompiler>,
    pub templates: TemplateStore,
    pub sessions: SessionStore,
    pub matcher: SectionMatcher,
}
