// The LaTeX resume itself: base template, section structure, output artifacts.

pub mod artifacts;
pub mod sections;
pub mod template_store;
