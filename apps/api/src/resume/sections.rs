//! Section Matcher — reports which `\section*{...}` sections a generated resume
//! added or changed relative to the base template.
//!
//! # Marker convention
//! - Any occurrence of `\section` is a boundary: it ends the section before it.
//! - A named section starts at `\section*{Name}`; the closing brace must be on
//!   the same line, otherwise the marker is malformed.
//! - A section's content runs from its marker up to the next boundary or the end
//!   of the document, marker included.
//!
//! # Comparison
//! - Names are taken in candidate document order, duplicates included.
//! - A name absent from the base is `Added`.
//! - Otherwise the FIRST section of that name in each document is compared by
//!   exact string equality; any difference is `Modified`.
//! - Output is not deduplicated: a name repeated in the candidate is reported
//!   once per occurrence.

use serde::{Deserialize, Serialize};
use similar::TextDiff;
use thiserror::Error;
use tracing::{debug, warn};

/// Token that ends the preceding section, whatever follows it.
const BOUNDARY: &str = "\\section";
/// Token that opens a named section.
pub const SECTION_MARKER: &str = "\\section*{";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MatchError {
    #[error("Malformed section marker on line {line}: missing closing brace")]
    MalformedMarker { line: usize },

    #[error("Section '{name}' appears more than once")]
    DuplicateSection { name: String },
}

/// A named section located within a document, as byte offsets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionSpan {
    pub name: String,
    pub start: usize,
    pub end: usize,
}

/// Result of tokenizing one document in a single pass.
#[derive(Debug)]
pub struct SectionIndex<'a> {
    text: &'a str,
    sections: Vec<SectionSpan>,
    /// Byte offsets of `\section*{` markers whose name never closed.
    malformed: Vec<usize>,
}

impl<'a> SectionIndex<'a> {
    pub fn parse(text: &'a str) -> Self {
        let boundaries: Vec<usize> = text.match_indices(BOUNDARY).map(|(i, _)| i).collect();

        let mut sections = Vec::new();
        let mut malformed = Vec::new();

        for (i, &start) in boundaries.iter().enumerate() {
            let Some(after) = text[start..].strip_prefix(SECTION_MARKER) else {
                continue;
            };
            let line = after.split('\n').next().unwrap_or_default();
            let Some(close) = line.find('}') else {
                malformed.push(start);
                continue;
            };
            let end = boundaries.get(i + 1).copied().unwrap_or(text.len());
            sections.push(SectionSpan {
                name: line[..close].to_string(),
                start,
                end,
            });
        }

        Self {
            text,
            sections,
            malformed,
        }
    }

    pub fn sections(&self) -> &[SectionSpan] {
        &self.sections
    }

    /// Section names in document order, duplicates included.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.sections.iter().map(|s| s.name.as_str())
    }

    /// First section with this name; later duplicates are never returned.
    pub fn first(&self, name: &str) -> Option<&SectionSpan> {
        self.sections.iter().find(|s| s.name == name)
    }

    pub fn content(&self, span: &SectionSpan) -> &'a str {
        &self.text[span.start..span.end]
    }

    /// Content of the first section with this name.
    pub fn first_content(&self, name: &str) -> Option<&'a str> {
        self.first(name).map(|span| self.content(span))
    }

    /// 1-based line numbers of malformed markers.
    pub fn malformed_lines(&self) -> Vec<usize> {
        self.malformed
            .iter()
            .map(|&offset| line_of(self.text, offset))
            .collect()
    }

    fn first_duplicate(&self) -> Option<&str> {
        self.sections.iter().enumerate().find_map(|(i, s)| {
            self.sections[..i]
                .iter()
                .any(|prev| prev.name == s.name)
                .then_some(s.name.as_str())
        })
    }
}

fn line_of(text: &str, offset: usize) -> usize {
    text[..offset].matches('\n').count() + 1
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    /// The section name does not exist in the base document.
    Added,
    /// The section exists in both but its content differs.
    Modified,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionChange {
    pub name: String,
    pub kind: ChangeKind,
}

/// How strictly marker irregularities are treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MatchMode {
    /// Malformed markers are skipped and duplicate names use first-match lookup.
    #[default]
    Permissive,
    /// Malformed markers and duplicate names in either document are errors.
    Strict,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SectionMatcher {
    mode: MatchMode,
}

impl SectionMatcher {
    pub fn new(mode: MatchMode) -> Self {
        Self { mode }
    }

    pub fn strict() -> Self {
        Self::new(MatchMode::Strict)
    }

    /// Returns the sections of `candidate` that are new or differ from `base`.
    pub fn compare(&self, base: &str, candidate: &str) -> Result<Vec<SectionChange>, MatchError> {
        let base_index = SectionIndex::parse(base);
        let candidate_index = SectionIndex::parse(candidate);

        for index in [&base_index, &candidate_index] {
            self.check(index)?;
        }
        debug!(
            "Comparing sections {:?} against {:?}",
            candidate_index.names().collect::<Vec<_>>(),
            base_index.names().collect::<Vec<_>>()
        );

        let mut changes = Vec::new();
        for span in candidate_index.sections() {
            let kind = match base_index.first_content(&span.name) {
                None => Some(ChangeKind::Added),
                Some(original) => {
                    let modified = candidate_index.first_content(&span.name);
                    (modified != Some(original)).then_some(ChangeKind::Modified)
                }
            };
            if let Some(kind) = kind {
                changes.push(SectionChange {
                    name: span.name.clone(),
                    kind,
                });
            }
        }

        Ok(changes)
    }

    fn check(&self, index: &SectionIndex<'_>) -> Result<(), MatchError> {
        let malformed = index.malformed_lines();
        match self.mode {
            MatchMode::Permissive => {
                if !malformed.is_empty() {
                    warn!("Skipping malformed section markers on lines {malformed:?}");
                }
                Ok(())
            }
            MatchMode::Strict => {
                if let Some(&line) = malformed.first() {
                    return Err(MatchError::MalformedMarker { line });
                }
                if let Some(name) = index.first_duplicate() {
                    return Err(MatchError::DuplicateSection {
                        name: name.to_string(),
                    });
                }
                Ok(())
            }
        }
    }
}

/// Unified line diff of the first section named `name` in each document.
/// A section missing from one side diffs against empty text.
pub fn section_diff(base: &str, candidate: &str, name: &str) -> String {
    let old = SectionIndex::parse(base).first_content(name).unwrap_or("");
    let new = SectionIndex::parse(candidate)
        .first_content(name)
        .unwrap_or("");

    TextDiff::from_lines(old, new)
        .unified_diff()
        .context_radius(2)
        .header(&format!("a/{name}"), &format!("b/{name}"))
        .to_string()
}
