//! Shared, read-only ontology handle.
//!
//! The first successful `load` publishes a snapshot that every later `load`
//! returns, whatever location it is given. `reload` rebuilds from disk and
//! replaces the snapshot only when the new load succeeds.

use crate::index::SkillIndex;
use crate::ontology::{self, Ontology, OntologyLoadError};
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::info;

#[derive(Debug)]
pub struct OntologySnapshot {
    pub ontology: Ontology,
    pub index: SkillIndex,
    pub files: Vec<PathBuf>,
    pub fingerprint: String,
    pub loaded_at: DateTime<Utc>,
}

impl OntologySnapshot {
    pub fn from_ontology(ontology: Ontology) -> Self {
        let index = SkillIndex::build(&ontology);
        Self {
            ontology,
            index,
            files: Vec::new(),
            fingerprint: String::new(),
            loaded_at: Utc::now(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.ontology.is_empty()
    }
}

pub struct OntologyRepository {
    include: Vec<String>,
    current: RwLock<Option<Arc<OntologySnapshot>>>,
    // serializes loads so racing first callers wait for one parse
    loading: Mutex<()>,
}

impl OntologyRepository {
    pub fn new(include: Vec<String>) -> Self {
        Self {
            include,
            current: RwLock::new(None),
            loading: Mutex::new(()),
        }
    }

    /// A repository that already holds `snapshot`.
    pub fn with_snapshot(snapshot: OntologySnapshot) -> Self {
        Self {
            include: Vec::new(),
            current: RwLock::new(Some(Arc::new(snapshot))),
            loading: Mutex::new(()),
        }
    }

    pub async fn current(&self) -> Option<Arc<OntologySnapshot>> {
        self.current.read().await.clone()
    }

    pub async fn load(&self, location: &Path) -> Result<Arc<OntologySnapshot>, OntologyLoadError> {
        if let Some(snapshot) = self.current().await {
            return Ok(snapshot);
        }
        let _guard = self.loading.lock().await;
        if let Some(snapshot) = self.current().await {
            return Ok(snapshot);
        }
        self.build_and_publish(location).await
    }

    pub async fn reload(&self, location: &Path) -> Result<Arc<OntologySnapshot>, OntologyLoadError> {
        let _guard = self.loading.lock().await;
        self.build_and_publish(location).await
    }

    async fn build_and_publish(
        &self,
        location: &Path,
    ) -> Result<Arc<OntologySnapshot>, OntologyLoadError> {
        let root = location.to_path_buf();
        let include = self.include.clone();
        let loaded = tokio::task::spawn_blocking(move || ontology::load_dir(&root, &include))
            .await
            .map_err(|e| OntologyLoadError::Task(e.to_string()))??;
        let index = SkillIndex::build(&loaded.ontology);
        let snapshot = Arc::new(OntologySnapshot {
            ontology: loaded.ontology,
            index,
            files: loaded.files,
            fingerprint: loaded.fingerprint,
            loaded_at: Utc::now(),
        });
        info!(
            "Ontology loaded from {:?}: {} node(s), {} alias(es), fingerprint {}",
            location,
            snapshot.ontology.len(),
            snapshot.index.len(),
            snapshot.fingerprint
        );
        *self.current.write().await = Some(Arc::clone(&snapshot));
        Ok(snapshot)
    }
}
