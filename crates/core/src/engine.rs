//! Per-document extraction: ontology → candidate retrieval → verification →
//! folding, merged into one deduplicated skill set.

use crate::config::AppConfig;
use crate::folder::fold;
use crate::models::{SkillExtract, SkillSet};
use crate::ontology::OntologyLoadError;
use crate::repository::OntologyRepository;
use crate::retriever::CandidateRetriever;
use crate::verifier::{AliasTally, MatchVerifier};
use providers::{SearchBackend, SearchBackendError};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error(transparent)]
    OntologyLoad(#[from] OntologyLoadError),
    #[error(transparent)]
    SearchBackend(#[from] SearchBackendError),
    #[error("extraction stopped in state {0}")]
    Interrupted(&'static str),
}

#[derive(Debug)]
pub enum ExtractionState {
    NotStarted,
    OntologyReady,
    Retrieving,
    Verifying,
    Folding,
    Done(BTreeSet<SkillExtract>),
    Failed(ExtractError),
}

impl ExtractionState {
    pub fn label(&self) -> &'static str {
        match self {
            ExtractionState::NotStarted => "not_started",
            ExtractionState::OntologyReady => "ontology_ready",
            ExtractionState::Retrieving => "retrieving",
            ExtractionState::Verifying => "verifying",
            ExtractionState::Folding => "folding",
            ExtractionState::Done(_) => "done",
            ExtractionState::Failed(_) => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ExtractionState::Done(_) | ExtractionState::Failed(_))
    }
}

/// One extraction call and the states it went through.
#[derive(Debug)]
pub struct ExtractionRun {
    pub document_id: String,
    state: ExtractionState,
    history: Vec<&'static str>,
}

impl ExtractionRun {
    fn new(document_id: &str) -> Self {
        let state = ExtractionState::NotStarted;
        Self {
            document_id: document_id.to_string(),
            history: vec![state.label()],
            state,
        }
    }

    fn advance(&mut self, next: ExtractionState) {
        if self.state.is_terminal() {
            return;
        }
        debug!(
            document_id = %self.document_id,
            "{} -> {}",
            self.state.label(),
            next.label()
        );
        self.history.push(next.label());
        self.state = next;
    }

    fn fail(&mut self, err: impl Into<ExtractError>) {
        let err = err.into();
        warn!(document_id = %self.document_id, "extraction failed: {}", err);
        self.advance(ExtractionState::Failed(err));
    }

    pub fn state(&self) -> &ExtractionState {
        &self.state
    }

    pub fn history(&self) -> &[&'static str] {
        &self.history
    }

    pub fn into_result(self) -> Result<BTreeSet<SkillExtract>, ExtractError> {
        match self.state {
            ExtractionState::Done(skills) => Ok(skills),
            ExtractionState::Failed(err) => Err(err),
            other => Err(ExtractError::Interrupted(other.label())),
        }
    }
}

pub struct ExtractionEngine {
    repository: Arc<OntologyRepository>,
    location: PathBuf,
    retriever: CandidateRetriever,
}

impl ExtractionEngine {
    pub fn new(
        repository: Arc<OntologyRepository>,
        location: impl Into<PathBuf>,
        backend: Arc<dyn SearchBackend>,
    ) -> Self {
        Self {
            repository,
            location: location.into(),
            retriever: CandidateRetriever::new(backend),
        }
    }

    pub fn from_config(
        config: &AppConfig,
        repository: Arc<OntologyRepository>,
        backend: Arc<dyn SearchBackend>,
    ) -> Self {
        Self::new(repository, &config.ontology.path, backend)
            .with_batch_size(config.extraction.batch_size)
            .with_max_in_flight(config.extraction.max_in_flight)
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.retriever = self.retriever.with_batch_size(batch_size);
        self
    }

    pub fn with_max_in_flight(mut self, max_in_flight: usize) -> Self {
        self.retriever = self.retriever.with_max_in_flight(max_in_flight);
        self
    }

    pub async fn extract(&self, document_id: &str) -> Result<BTreeSet<SkillExtract>, ExtractError> {
        self.run(document_id).await.into_result()
    }

    /// Runs one extraction to a terminal state. Matches from every batch are
    /// tallied per owning node first and folded once all batches are in; a failed batch
    /// discards the tally and aborts the batches still running.
    pub async fn run(&self, document_id: &str) -> ExtractionRun {
        let mut run = ExtractionRun::new(document_id);

        let snapshot = match self.repository.load(&self.location).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                run.fail(e);
                return run;
            }
        };
        run.advance(ExtractionState::OntologyReady);

        if snapshot.is_empty() {
            info!("There is no skill to query for document {}", document_id);
            run.advance(ExtractionState::Done(BTreeSet::new()));
            return run;
        }

        run.advance(ExtractionState::Retrieving);
        let mut batches = self
            .retriever
            .spawn_all(document_id, snapshot.index.aliases());
        let mut tally = AliasTally::new();
        while let Some(batch) = batches.next().await {
            let batch = match batch {
                Ok(batch) => batch,
                Err(e) => {
                    batches.abort();
                    run.fail(e);
                    return run;
                }
            };
            if batch.contents.is_empty() {
                continue;
            }

            run.advance(ExtractionState::Verifying);
            let verifier = MatchVerifier::new(&batch.aliases);
            for content in &batch.contents {
                for m in verifier.matches(content) {
                    let owner = match snapshot.index.resolve(&m.alias) {
                        Some(node) => node.name.clone(),
                        None => m.alias.clone(),
                    };
                    tally.add(&owner, m);
                }
            }
            run.advance(ExtractionState::Retrieving);
        }

        run.advance(ExtractionState::Folding);
        let mut skills = SkillSet::new();
        for (alias, count) in tally.resolve(|alias| snapshot.index.rank(alias)) {
            skills.extend(fold(&snapshot.index, &alias, count));
        }
        let skills = skills.into_set();
        info!(
            "Extracted {} skill(s) from document {}: {:?}",
            skills.len(),
            document_id,
            crate::models::skill_names(&skills)
        );
        run.advance(ExtractionState::Done(skills));
        run
    }
}
