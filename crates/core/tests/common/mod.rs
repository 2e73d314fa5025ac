#![allow(dead_code)]

use providers::{ContentHit, SearchBackend, SearchBackendError};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

pub const SKILLS_TTL: &str = r#"
@prefix : <http://example.org/skills#> .
@prefix owl: <http://www.w3.org/2002/07/owl#> .
@prefix rdf: <http://www.w3.org/1999/02/22-rdf-syntax-ns#> .
@prefix rdfs: <http://www.w3.org/2000/01/rdf-schema#> .

<http://example.org/skills> rdf:type owl:Ontology .

:ProgrammingLanguage rdf:type owl:Class .

:Java rdf:type owl:NamedIndividual , :ProgrammingLanguage ;
    rdfs:label "java" , "Java language" .
"#;

/// In-memory documents; a document is a hit when any phrase occurs in it,
/// ignoring case and word boundaries, like a loose full-text engine would.
#[derive(Default)]
pub struct MemoryBackend {
    documents: HashMap<String, Vec<String>>,
    pub calls: AtomicUsize,
    pub completed: AtomicUsize,
    pub fail_after: Option<usize>,
    pub delay: Option<Duration>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(mut self, id: &str, content: &str) -> Self {
        self.documents
            .entry(id.to_string())
            .or_default()
            .push(content.to_string());
        self
    }

    pub fn failing_after(mut self, calls: usize) -> Self {
        self.fail_after = Some(calls);
        self
    }

    pub fn responding_after(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Calls that ran to the end, delay included.
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl SearchBackend for MemoryBackend {
    async fn find_phrases(
        &self,
        document_id: &str,
        phrases: &[String],
    ) -> Result<Vec<ContentHit>, SearchBackendError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.completed.fetch_add(1, Ordering::SeqCst);
        if let Some(limit) = self.fail_after {
            if call >= limit {
                return Err(SearchBackendError::Unreachable("connection refused".into()));
            }
        }
        let Some(blocks) = self.documents.get(document_id) else {
            return Ok(Vec::new());
        };
        Ok(blocks
            .iter()
            .filter(|content| {
                let lower = content.to_lowercase();
                phrases.iter().any(|p| lower.contains(&p.to_lowercase()))
            })
            .map(|content| ContentHit {
                document_id: document_id.to_string(),
                content: content.clone(),
            })
            .collect())
    }
}

pub fn write_taxonomy(dir: &Path, name: &str, ttl: &str) {
    std::fs::create_dir_all(dir).unwrap();
    std::fs::write(dir.join(name), ttl).unwrap();
}
