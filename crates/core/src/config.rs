use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub ontology: OntologyConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OntologyConfig {
    pub path: String,
    /// File-name globs selecting taxonomy files under `path`.
    pub include: Vec<String>,
}

impl Default for OntologyConfig {
    fn default() -> Self {
        Self {
            path: "resources/ontologies".to_string(),
            include: default_include(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// elasticsearch | keyword-index | noop
    pub backend: String,
    pub url: Option<String>,
    pub index: String,
    pub id_field: String,
    pub content_field: String,
    pub doc_type: Option<String>,
    /// Hits per backend request; retrieval pages until every hit is read.
    pub max_hits: u64,
    pub keyword_index_path: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            backend: "elasticsearch".to_string(),
            url: Some("http://localhost:9200".to_string()),
            index: "prod-index".to_string(),
            id_field: "id".to_string(),
            content_field: "content".to_string(),
            doc_type: None,
            max_hits: 10,
            keyword_index_path: "data/keyword-index".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    pub batch_size: usize,
    pub max_in_flight: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            batch_size: crate::retriever::DEFAULT_BATCH_SIZE,
            max_in_flight: crate::retriever::DEFAULT_MAX_IN_FLIGHT,
        }
    }
}

fn default_include() -> Vec<String> {
    vec!["*.ttl".to_string()]
}

/// Reads `path` (or the optional `config/default`) and `SKILLS__*`
/// environment overrides, e.g. `SKILLS__SEARCH__URL`.
pub fn load(path: Option<&str>) -> anyhow::Result<AppConfig> {
    let mut settings = config::Config::builder();
    if let Some(p) = path {
        settings = settings.add_source(config::File::with_name(p));
    } else {
        settings = settings.add_source(config::File::with_name("config/default").required(false));
    }
    settings = settings.add_source(
        config::Environment::with_prefix("SKILLS")
            .prefix_separator("__")
            .separator("__"),
    );
    let cfg = settings.build()?;
    Ok(cfg.try_deserialize()?)
}
