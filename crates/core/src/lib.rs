//! Core library: taxonomy loading, alias indexing, candidate retrieval,
//! match verification, skill folding and per-document extraction.

pub mod config;
pub mod engine;
pub mod folder;
pub mod index;
pub mod models;
pub mod ontology;
pub mod pipeline;
pub mod repository;
pub mod retriever;
pub mod verifier;

pub use engine::{ExtractError, ExtractionEngine, ExtractionRun, ExtractionState};
pub use models::{NodeRole, SkillExtract, SkillNode};
pub use repository::{OntologyRepository, OntologySnapshot};
