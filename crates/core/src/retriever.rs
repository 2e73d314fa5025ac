//! Recall phase: asks the search backend which alias batches may occur in a
//! document and collects the content it returns. Precision is left to the
//! verifier.

use providers::{SearchBackend, SearchBackendError};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::debug;

pub const DEFAULT_BATCH_SIZE: usize = 100;
pub const DEFAULT_MAX_IN_FLIGHT: usize = 4;

/// Content blocks returned for one alias batch.
#[derive(Debug, Clone)]
pub struct CandidateBatch {
    pub aliases: Vec<String>,
    pub contents: Vec<String>,
}

#[derive(Clone)]
pub struct CandidateRetriever {
    backend: Arc<dyn SearchBackend>,
    batch_size: usize,
    max_in_flight: usize,
}

impl CandidateRetriever {
    pub fn new(backend: Arc<dyn SearchBackend>) -> Self {
        Self {
            backend,
            batch_size: DEFAULT_BATCH_SIZE,
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
        }
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_max_in_flight(mut self, max_in_flight: usize) -> Self {
        self.max_in_flight = max_in_flight.max(1);
        self
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn batches<'a>(&self, vocabulary: &'a [String]) -> std::slice::Chunks<'a, String> {
        vocabulary.chunks(self.batch_size)
    }

    /// Starts one retrieval per batch, at most `max_in_flight` at a time.
    /// Dropping the returned stream aborts whatever is still running.
    pub fn spawn_all(&self, document_id: &str, vocabulary: &[String]) -> CandidateStream {
        let permits = Arc::new(Semaphore::new(self.max_in_flight));
        let mut tasks = JoinSet::new();
        for batch in self.batches(vocabulary) {
            let backend = Arc::clone(&self.backend);
            let permits = Arc::clone(&permits);
            let document_id = document_id.to_string();
            let aliases = batch.to_vec();
            tasks.spawn(async move {
                let _permit = permits
                    .acquire_owned()
                    .await
                    .map_err(|e| SearchBackendError::Query(e.to_string()))?;
                fetch(backend.as_ref(), &document_id, aliases).await
            });
        }
        CandidateStream { tasks }
    }

    /// Every batch, in completion order. The first failure fails the lot.
    pub async fn retrieve_all(
        &self,
        document_id: &str,
        vocabulary: &[String],
    ) -> Result<Vec<CandidateBatch>, SearchBackendError> {
        let mut stream = self.spawn_all(document_id, vocabulary);
        let mut batches = Vec::new();
        while let Some(batch) = stream.next().await {
            batches.push(batch?);
        }
        Ok(batches)
    }
}

pub struct CandidateStream {
    tasks: JoinSet<Result<CandidateBatch, SearchBackendError>>,
}

impl CandidateStream {
    pub async fn next(&mut self) -> Option<Result<CandidateBatch, SearchBackendError>> {
        let joined = self.tasks.join_next().await?;
        Some(joined.unwrap_or_else(|e| {
            Err(SearchBackendError::Query(format!(
                "retrieval task failed: {e}"
            )))
        }))
    }

    pub fn abort(&mut self) {
        self.tasks.abort_all();
    }
}

async fn fetch(
    backend: &dyn SearchBackend,
    document_id: &str,
    aliases: Vec<String>,
) -> Result<CandidateBatch, SearchBackendError> {
    let hits = backend.find_phrases(document_id, &aliases).await?;
    debug!(
        document_id,
        aliases = aliases.len(),
        hits = hits.len(),
        "retrieved candidate batch"
    );
    Ok(CandidateBatch {
        aliases,
        contents: hits.into_iter().map(|h| h.content).collect(),
    })
}
