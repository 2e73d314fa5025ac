use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeSet, HashMap};
use std::hash::{Hash, Hasher};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeRole {
    /// A concrete named thing; parents are its declared categories.
    Individual,
    /// A category; parents are all transitive super-categories.
    Class,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillNode {
    pub namespace_uri: Option<String>,
    pub name: String,
    pub role: NodeRole,
    pub labels: Vec<String>,
    pub parents: Vec<String>,
    pub difficulty: i32,
    pub keyword_only: bool,
}

impl SkillNode {
    pub fn new(namespace_uri: Option<String>, name: impl Into<String>, role: NodeRole) -> Self {
        Self {
            namespace_uri,
            name: name.into(),
            role,
            labels: Vec::new(),
            parents: Vec::new(),
            difficulty: 0,
            keyword_only: false,
        }
    }

    pub fn with_labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for label in labels {
            let label = label.into();
            if !self.labels.contains(&label) {
                self.labels.push(label);
            }
        }
        self
    }

    pub fn with_parents<I, S>(mut self, parents: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.parents = parents.into_iter().map(Into::into).collect();
        self
    }

    /// Own name followed by labels.
    pub fn aliases(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str()).chain(self.labels.iter().map(String::as_str))
    }
}

impl std::fmt::Display for SkillNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.labels.is_empty() {
            write!(f, "{}", self.name)
        } else {
            write!(f, "{} ({})", self.name, self.labels.join(", "))
        }
    }
}

/// A folded skill found in a document. Identity is `(name, matched_alias)`;
/// the count does not take part in equality, ordering or hashing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillExtract {
    pub name: String,
    pub matched_alias: String,
    pub occurrence_count: u32,
}

impl SkillExtract {
    pub fn new(name: impl Into<String>, matched_alias: impl Into<String>, count: u32) -> Self {
        Self {
            name: name.into(),
            matched_alias: matched_alias.into(),
            occurrence_count: count,
        }
    }

    fn key(&self) -> (&str, &str) {
        (&self.name, &self.matched_alias)
    }
}

impl PartialEq for SkillExtract {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for SkillExtract {}

impl Hash for SkillExtract {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl PartialOrd for SkillExtract {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SkillExtract {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key().cmp(&other.key())
    }
}

/// Accumulator for one extraction run. Records with the same key keep the
/// highest count seen.
#[derive(Debug, Default, Clone)]
pub struct SkillSet {
    counts: HashMap<(String, String), u32>,
}

impl SkillSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn merge(&mut self, extract: SkillExtract) {
        let count = self
            .counts
            .entry((extract.name, extract.matched_alias))
            .or_insert(0);
        *count = (*count).max(extract.occurrence_count);
    }

    pub fn extend<I: IntoIterator<Item = SkillExtract>>(&mut self, extracts: I) {
        for extract in extracts {
            self.merge(extract);
        }
    }

    pub fn into_set(self) -> BTreeSet<SkillExtract> {
        self.counts
            .into_iter()
            .map(|((name, alias), count)| SkillExtract::new(name, alias, count))
            .collect()
    }
}

/// Distinct folded skill names, for display or persistence by the caller.
pub fn skill_names<'a, I>(extracts: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = &'a SkillExtract>,
{
    extracts.into_iter().map(|e| e.name.clone()).collect()
}
