// Shared prompt constants used on every generation call.
// Task-specific templates live in tailoring::prompts.

/// System prompt sent with every completion request.
pub const RESUME_ASSISTANT_SYSTEM: &str = "You are a professional resume writer and LaTeX expert. \
    Answer with the requested content only. \
    Do NOT add greetings, apologies, or commentary about what you are doing.";

/// Appended to prompts whose answer is LaTeX source that will be compiled as-is.
pub const LATEX_PRESERVATION_INSTRUCTION: &str = "\
    CRITICAL: Keep the EXACT same LaTeX structure and formatting. \
    Do NOT remove or rename any \\section*{...} heading, command, package, or environment. \
    Only ADD or MODIFY content within existing sections. \
    Return the COMPLETE LaTeX document, from \\documentclass to \\end{document}, and nothing else.";
