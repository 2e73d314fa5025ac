use crate::config::{AppConfig, SearchConfig};
use crate::engine::{ExtractError, ExtractionEngine};
use crate::models::{skill_names, SkillExtract};
use crate::repository::OntologyRepository;
use providers::elastic::{ElasticClient, ElasticConfig};
use providers::noop::NoopBackend;
use providers::{SearchBackend, SearchBackendError};
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::info;

/// Per-document outcome of a multi-document run.
#[derive(Debug, Serialize)]
pub struct DocumentSkills {
    pub document_id: String,
    pub skills: Vec<SkillExtract>,
    pub names: BTreeSet<String>,
}

pub fn build_backend(config: &SearchConfig) -> Result<Arc<dyn SearchBackend>, SearchBackendError> {
    match config.backend.as_str() {
        "elasticsearch" => {
            let url = config.url.clone().ok_or_else(|| {
                SearchBackendError::UnknownBackend("elasticsearch requires search.url".into())
            })?;
            Ok(Arc::new(ElasticClient::new(ElasticConfig {
                url,
                index: config.index.clone(),
                id_field: config.id_field.clone(),
                content_field: config.content_field.clone(),
                doc_type: config.doc_type.clone(),
                max_hits: config.max_hits,
            })))
        }
        "noop" => Ok(Arc::new(NoopBackend)),
        other => Err(SearchBackendError::UnknownBackend(other.to_string())),
    }
}

pub fn build_engine(config: &AppConfig, backend: Arc<dyn SearchBackend>) -> ExtractionEngine {
    let repository = Arc::new(OntologyRepository::new(config.ontology.include.clone()));
    ExtractionEngine::from_config(config, repository, backend)
}

/// Extracts each document in turn; the first failure stops the run.
pub async fn extract_documents(
    engine: &ExtractionEngine,
    document_ids: &[String],
) -> Result<Vec<DocumentSkills>, ExtractError> {
    let mut out = Vec::with_capacity(document_ids.len());
    for id in document_ids {
        let skills = engine.extract(id).await?;
        let names = skill_names(&skills);
        info!("Document {}: {} skill name(s)", id, names.len());
        out.push(DocumentSkills {
            document_id: id.clone(),
            skills: skills.into_iter().collect(),
            names,
        });
    }
    Ok(out)
}
