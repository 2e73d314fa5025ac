use crate::models::SkillNode;
use crate::ontology::Ontology;
use std::collections::HashMap;
use std::sync::Arc;

/// Alias -> owning node. Built in graph order; when two nodes share an alias
/// the later node wins.
#[derive(Debug, Default, Clone)]
pub struct SkillIndex {
    by_alias: HashMap<String, Arc<SkillNode>>,
    vocabulary: Vec<String>,
    ranks: HashMap<String, usize>,
}

impl SkillIndex {
    pub fn build(ontology: &Ontology) -> Self {
        let mut index = Self::default();
        for node in ontology.nodes() {
            for alias in node.aliases() {
                if alias.is_empty() {
                    continue;
                }
                if index
                    .by_alias
                    .insert(alias.to_string(), Arc::clone(node))
                    .is_none()
                {
                    index.ranks.insert(alias.to_string(), index.vocabulary.len());
                    index.vocabulary.push(alias.to_string());
                }
            }
        }
        index
    }

    /// Exact, case-sensitive lookup.
    pub fn resolve(&self, alias: &str) -> Option<&SkillNode> {
        self.by_alias.get(alias).map(Arc::as_ref)
    }

    /// Distinct aliases in first-seen order.
    pub fn aliases(&self) -> &[String] {
        &self.vocabulary
    }

    /// Position of `alias` in the vocabulary; unknown aliases rank last.
    pub fn rank(&self, alias: &str) -> usize {
        self.ranks.get(alias).copied().unwrap_or(usize::MAX)
    }

    pub fn len(&self) -> usize {
        self.vocabulary.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vocabulary.is_empty()
    }
}
