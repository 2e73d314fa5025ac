use anyhow::Result;
use clap::{Parser, Subcommand};
use cli::{build_backend, ingest, keyword_index};
use serde::Serialize;
use skills_core::config;
use skills_core::config::AppConfig;
use skills_core::pipeline;
use skills_core::{NodeRole, OntologyRepository};
use std::path::{Path, PathBuf};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let mut cfg = config::load(cli.config.as_deref())?;
    if let Some(path) = cli.ontology {
        cfg.ontology.path = path;
    }

    match cli.command {
        Commands::Ontology { json } => run_ontology(cfg, json).await,
        Commands::Extract {
            ids,
            json,
            batch_size,
            backend,
        } => {
            if let Some(size) = batch_size {
                cfg.extraction.batch_size = size;
            }
            if let Some(name) = backend {
                cfg.search.backend = name;
            }
            run_extract(cfg, &ids, json).await
        }
        Commands::Index {
            paths,
            include,
            append,
        } => run_index(cfg, &paths, &include, append),
    }
}

#[derive(Parser)]
#[command(name = "skill-extractor")]
#[command(about = "Ontology-driven skill extraction for indexed documents", long_about = None)]
struct Cli {
    /// Path to config TOML
    #[arg(short, long)]
    config: Option<String>,

    /// Override the taxonomy directory
    #[arg(long)]
    ontology: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the taxonomy and print a summary
    Ontology {
        /// Output JSON with every node
        #[arg(long)]
        json: bool,
    },
    /// Extract skills from one or more indexed documents
    Extract {
        /// Document ids
        #[arg(required = true, num_args = 1..)]
        ids: Vec<String>,
        /// Output JSON
        #[arg(long)]
        json: bool,
        /// Aliases per backend query
        #[arg(long)]
        batch_size: Option<usize>,
        /// Search backend: elasticsearch|keyword-index|noop
        #[arg(long)]
        backend: Option<String>,
    },
    /// Index plain-text files into the local keyword index
    Index {
        /// Files or directories to index
        #[arg(required = true, num_args = 1..)]
        paths: Vec<PathBuf>,
        /// File-name globs to include (comma-separated)
        #[arg(long, value_delimiter = ',', default_value = "*.txt")]
        include: Vec<String>,
        /// Keep existing documents and replace only re-indexed ids
        #[arg(long, default_value_t = false)]
        append: bool,
    },
}

#[derive(Serialize)]
struct OntologySummary<'a> {
    location: &'a str,
    files: Vec<String>,
    fingerprint: &'a str,
    loaded_at: String,
    classes: usize,
    individuals: usize,
    aliases: usize,
}

async fn run_ontology(cfg: AppConfig, json: bool) -> Result<()> {
    let repository = OntologyRepository::new(cfg.ontology.include.clone());
    let snapshot = repository.load(Path::new(&cfg.ontology.path)).await?;
    let summary = OntologySummary {
        location: &cfg.ontology.path,
        files: snapshot
            .files
            .iter()
            .map(|p| p.display().to_string())
            .collect(),
        fingerprint: &snapshot.fingerprint,
        loaded_at: snapshot.loaded_at.to_rfc3339(),
        classes: snapshot.ontology.count_role(NodeRole::Class),
        individuals: snapshot.ontology.count_role(NodeRole::Individual),
        aliases: snapshot.index.len(),
    };

    if json {
        let nodes: Vec<_> = snapshot.ontology.nodes().map(|n| n.as_ref()).collect();
        let out = serde_json::json!({
            "summary": summary,
            "nodes": nodes,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!(
            "Ontology {} ({} file(s), fingerprint {})",
            summary.location,
            summary.files.len(),
            summary.fingerprint
        );
        println!(
            "  classes: {}  individuals: {}  aliases: {}",
            summary.classes, summary.individuals, summary.aliases
        );
        for node in snapshot.ontology.nodes() {
            println!("  {}", node);
        }
    }
    Ok(())
}

async fn run_extract(cfg: AppConfig, ids: &[String], json: bool) -> Result<()> {
    let backend = build_backend(&cfg.search)?;
    let engine = pipeline::build_engine(&cfg, backend);
    let results = pipeline::extract_documents(&engine, ids).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }
    for doc in &results {
        if doc.skills.is_empty() {
            println!("{}: no skills", doc.document_id);
            continue;
        }
        println!("{}:", doc.document_id);
        for skill in &doc.skills {
            println!(
                "  {:<32} {:<32} {}",
                skill.name, skill.matched_alias, skill.occurrence_count
            );
        }
    }
    Ok(())
}

fn run_index(cfg: AppConfig, paths: &[PathBuf], include: &[String], append: bool) -> Result<()> {
    let docs = ingest::collect_documents(paths, include)?;
    let target = Path::new(&cfg.search.keyword_index_path);
    if append {
        keyword_index::enabled::upsert_docs(target, &docs)?;
    } else {
        keyword_index::enabled::build_index(target, &docs)?;
    }
    println!("Indexed {} content block(s) into {}", docs.len(), target.display());
    Ok(())
}
