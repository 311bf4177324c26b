// Resume tailoring workflow: analyze → propose → accept / reject.
// All generation goes through llm_client::GenerationService.

pub mod analyzer;
pub mod drafting;
pub mod handlers;
pub mod prompts;
pub mod session;
