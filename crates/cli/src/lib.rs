//! Public library modules for the CLI crate
pub mod ingest;
pub mod keyword_index;

use anyhow::Result;
use providers::SearchBackend;
use skills_core::config::SearchConfig;
use skills_core::pipeline;
use std::path::Path;
use std::sync::Arc;

/// Backend named by `search.backend`. The local keyword index lives in this
/// crate; every other backend comes from the core pipeline.
pub fn build_backend(cfg: &SearchConfig) -> Result<Arc<dyn SearchBackend>> {
    match cfg.backend.as_str() {
        "keyword-index" => keyword_index::enabled::open_backend(
            Path::new(&cfg.keyword_index_path),
            cfg.max_hits as usize,
        ),
        _ => Ok(pipeline::build_backend(cfg)?),
    }
}
