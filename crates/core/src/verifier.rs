//! Exact alias counting over retrieved content.
//!
//! An occurrence must be flanked by non-alphanumeric characters (or the
//! edges of the text), so `java` never counts inside `javascript`. Matching is
//! case-insensitive and occurrences do not overlap.

use regex::Regex;
use std::collections::HashMap;
use tracing::warn;

/// Verified occurrences of one alias in one content block. `exact` counts
/// only occurrences spelled with the alias's own casing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AliasMatch {
    pub alias: String,
    pub count: u32,
    pub exact: u32,
}

struct AliasPattern {
    alias: String,
    folded: Regex,
    exact: Regex,
}

/// Patterns compiled once for an alias batch and reused for every content
/// block of that batch.
pub struct MatchVerifier {
    patterns: Vec<AliasPattern>,
}

impl MatchVerifier {
    pub fn new(aliases: &[String]) -> Self {
        let mut patterns = Vec::with_capacity(aliases.len());
        for alias in aliases {
            let needle = alias.to_lowercase();
            if needle.is_empty() {
                continue;
            }
            let compiled = Regex::new(&regex::escape(&needle))
                .and_then(|folded| Ok((folded, Regex::new(&regex::escape(alias))?)));
            match compiled {
                Ok((folded, exact)) => patterns.push(AliasPattern {
                    alias: alias.clone(),
                    folded,
                    exact,
                }),
                Err(e) => warn!("Skipping alias {:?}: {}", alias, e),
            }
        }
        Self { patterns }
    }

    /// Every alias of the batch that occurs in `content`.
    pub fn matches(&self, content: &str) -> Vec<AliasMatch> {
        let haystack = content.to_lowercase();
        let mut out = Vec::new();
        for p in &self.patterns {
            let count = count_bounded(&p.folded, &haystack);
            if count > 0 {
                out.push(AliasMatch {
                    alias: p.alias.clone(),
                    count,
                    exact: count_bounded(&p.exact, content),
                });
            }
        }
        out
    }

    /// Occurrence count per alias; aliases that do not occur are omitted.
    pub fn verify(&self, content: &str) -> HashMap<String, u32> {
        self.matches(content)
            .into_iter()
            .map(|m| (m.alias, m.count))
            .collect()
    }
}

pub fn verify(content: &str, aliases: &[String]) -> HashMap<String, u32> {
    MatchVerifier::new(aliases).verify(content)
}

fn count_bounded(pattern: &Regex, haystack: &str) -> u32 {
    let mut count = 0;
    let mut pos = 0;
    while let Some(m) = pattern.find_at(haystack, pos) {
        let before = haystack[..m.start()].chars().next_back();
        let after = haystack[m.end()..].chars().next();
        if is_boundary(before) && is_boundary(after) {
            count += 1;
            pos = m.end();
        } else {
            // retry one character further so a rejected match does not hide
            // a valid one that starts inside it
            pos = m.start()
                + haystack[m.start()..]
                    .chars()
                    .next()
                    .map(char::len_utf8)
                    .unwrap_or(1);
        }
    }
    count
}

fn is_boundary(c: Option<char>) -> bool {
    c.map(|c| !c.is_alphanumeric()).unwrap_or(true)
}

#[derive(Debug, Default)]
struct FormTally {
    count: u32,
    // alias spelling -> verbatim occurrences over all blocks
    exact: HashMap<String, u32>,
}

/// Collects verified matches across batches and content blocks. Aliases of
/// the same node that differ only by case describe the same text, so they
/// are counted once and reported under a single spelling. Case variants that
/// belong to different nodes stay separate.
#[derive(Debug, Default)]
pub struct AliasTally {
    // (owning node, lowercase alias) -> tally
    forms: HashMap<(String, String), FormTally>,
}

impl AliasTally {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `m` for the node named `owner`.
    pub fn add(&mut self, owner: &str, m: AliasMatch) {
        let key = (owner.to_string(), m.alias.to_lowercase());
        let form = self.forms.entry(key).or_default();
        form.count = form.count.max(m.count);
        *form.exact.entry(m.alias).or_insert(0) += m.exact;
    }

    /// One `(alias, count)` per node and case-insensitive form. The spelling
    /// found verbatim most often wins; ties go to the lowest `rank`.
    pub fn resolve<F>(self, rank: F) -> Vec<(String, u32)>
    where
        F: Fn(&str) -> usize,
    {
        self.forms
            .into_values()
            .filter_map(|form| {
                let count = form.count;
                form.exact
                    .into_iter()
                    .min_by(|(a, a_exact), (b, b_exact)| {
                        b_exact.cmp(a_exact).then_with(|| rank(a).cmp(&rank(b)))
                    })
                    .map(|(alias, _)| (alias, count))
            })
            .collect()
    }
}
