//! Target list parsing. The list is a plain text file: one identifier per line,
//! `## Heading` lines set the category for the entries below them.

use domainwatch_core::TargetEntry;
use std::path::PathBuf;

/// Reads the target list from disk on every call; nothing is cached.
#[derive(Debug, Clone)]
pub struct TargetRegistry {
    path: PathBuf,
}

impl TargetRegistry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        TargetRegistry { path: path.into() }
    }

    /// Current entries in file order. An unreadable file yields an empty list.
    pub fn list(&self) -> Vec<TargetEntry> {
        match std::fs::read_to_string(&self.path) {
            Ok(text) => parse_targets(&text),
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "cannot read target list");
                Vec::new()
            }
        }
    }

    pub fn identifiers(&self) -> Vec<String> {
        self.list().into_iter().map(|e| e.identifier).collect()
    }
}

pub fn parse_targets(text: &str) -> Vec<TargetEntry> {
    let mut entries = Vec::new();
    let mut category: Option<String> = None;
    for line in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
        if let Some(heading) = line.strip_prefix("##") {
            let heading = heading.trim();
            category = if heading.is_empty() { None } else { Some(heading.to_string()) };
            continue;
        }
        entries.push(TargetEntry { identifier: line.to_string(), category: category.clone() });
    }
    entries
}
