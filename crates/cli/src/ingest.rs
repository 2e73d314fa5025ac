//! Collects plain-text documents for the local keyword index.

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

pub fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        builder.add(Glob::new(pat).with_context(|| format!("invalid glob {:?}", pat))?);
    }
    Ok(builder.build()?)
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.starts_with('.'))
        .unwrap_or(false)
}

/// Document id for a file: its name without extension.
pub fn document_id(path: &Path) -> Option<String> {
    path.file_stem()
        .and_then(|s| s.to_str())
        .map(str::to_string)
}

/// `(document id, content)` pairs, one per matching non-empty file under
/// `roots`. A root may also be a single file.
pub fn collect_documents(roots: &[PathBuf], include: &[String]) -> Result<Vec<(String, String)>> {
    let include = build_globset(include)?;
    let mut docs = Vec::new();
    for root in roots {
        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = match entry {
                Ok(e) => e,
                Err(e) => {
                    warn!("Skipping unreadable entry under {:?}: {}", root, e);
                    continue;
                }
            };
            let path = entry.path();
            if !entry.file_type().is_file() || is_hidden(path) {
                continue;
            }
            if !include.is_match(entry.file_name()) {
                continue;
            }
            let Some(id) = document_id(path) else {
                continue;
            };
            let text = match fs::read_to_string(path) {
                Ok(t) => t,
                Err(e) => {
                    warn!("Skipping {:?}: {}", path, e);
                    continue;
                }
            };
            let content = text.trim();
            if content.is_empty() {
                debug!("{:?} is empty, skipping", path);
                continue;
            }
            debug!("{:?} as document {}", path, id);
            docs.push((id, content.to_string()));
        }
    }
    Ok(docs)
}
