//! Search backend abstractions used for candidate retrieval.

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod elastic;
pub mod noop;

#[derive(Debug, Error)]
pub enum SearchBackendError {
    #[error("search backend unreachable: {0}")]
    Unreachable(String),
    #[error("search backend returned status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("invalid search response: {0}")]
    Decode(String),
    #[error("search query failed: {0}")]
    Query(String),
    #[error("unknown search backend: {0}")]
    UnknownBackend(String),
}

/// One stored content block returned for a matched document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentHit {
    pub document_id: String,
    pub content: String,
}

#[async_trait::async_trait]
pub trait SearchBackend: Send + Sync {
    /// Returns the content of `document_id` when it contains any of `phrases`
    /// as an exact phrase. Recall only: callers re-verify the content.
    async fn find_phrases(
        &self,
        document_id: &str,
        phrases: &[String],
    ) -> Result<Vec<ContentHit>, SearchBackendError>;
}

/// Wraps `phrase` in double quotes for a Lucene-style query string,
/// escaping backslashes and embedded quotes.
pub fn quote_phrase(phrase: &str) -> String {
    let mut quoted = String::with_capacity(phrase.len() + 2);
    quoted.push('"');
    for c in phrase.chars() {
        if c == '"' || c == '\\' {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}

/// Joins quoted phrases with `OR`.
pub fn any_phrase_query(phrases: &[String]) -> String {
    phrases
        .iter()
        .filter(|p| !p.is_empty())
        .map(|p| quote_phrase(p))
        .collect::<Vec<_>>()
        .join(" OR ")
}
