//! Taxonomy graph: parses Turtle resources into [`SkillNode`]s.
//!
//! Each file is parsed into its own triple graph. Subjects typed
//! `owl:NamedIndividual` or `owl:Class` become nodes; individuals take their
//! other declared types as parents, classes take the transitive closure of
//! `rdfs:subClassOf`. Two datatype properties in the file's own namespace,
//! `difficulty` and `keywordOnly`, are read onto the node when well formed.

use crate::models::{NodeRole, SkillNode};
use globset::{Glob, GlobSet, GlobSetBuilder};
use oxrdf::{Subject, Term};
use oxttl::TurtleParser;
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

const RDF_TYPE: &str = "http://www.w3.org/1999/02/22-rdf-syntax-ns#type";
const RDFS_LABEL: &str = "http://www.w3.org/2000/01/rdf-schema#label";
const RDFS_SUB_CLASS_OF: &str = "http://www.w3.org/2000/01/rdf-schema#subClassOf";
const OWL_NAMED_INDIVIDUAL: &str = "http://www.w3.org/2002/07/owl#NamedIndividual";
const OWL_CLASS: &str = "http://www.w3.org/2002/07/owl#Class";
const OWL_ONTOLOGY: &str = "http://www.w3.org/2002/07/owl#Ontology";

const DIFFICULTY: &str = "difficulty";
const KEYWORD_ONLY: &str = "keywordOnly";

#[derive(Debug, Error)]
pub enum OntologyLoadError {
    #[error("failed to read taxonomy resource {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse taxonomy file {path}: {message}")]
    Parse { path: PathBuf, message: String },
    #[error("subclass cycle in {path}: {}", .cycle.join(" -> "))]
    Cycle { path: PathBuf, cycle: Vec<String> },
    #[error("invalid taxonomy file pattern {pattern}: {message}")]
    Pattern { pattern: String, message: String },
    #[error("ontology load task failed: {0}")]
    Task(String),
}

/// Immutable skill graph. Node names are unique; construction order is kept.
#[derive(Debug, Default, Clone)]
pub struct Ontology {
    nodes: Vec<Arc<SkillNode>>,
    positions: HashMap<String, usize>,
}

impl Ontology {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_nodes<I: IntoIterator<Item = SkillNode>>(nodes: I) -> Self {
        let mut ontology = Self::new();
        for node in nodes {
            ontology.insert(node);
        }
        ontology
    }

    /// Appends `node`. A node with the same name is removed and returned, so
    /// the replacement counts as constructed last.
    pub fn insert(&mut self, node: SkillNode) -> Option<Arc<SkillNode>> {
        let previous = self.positions.remove(&node.name).map(|pos| {
            for p in self.positions.values_mut() {
                if *p > pos {
                    *p -= 1;
                }
            }
            self.nodes.remove(pos)
        });
        self.positions.insert(node.name.clone(), self.nodes.len());
        self.nodes.push(Arc::new(node));
        previous
    }

    pub fn get(&self, name: &str) -> Option<&Arc<SkillNode>> {
        self.positions.get(name).map(|&pos| &self.nodes[pos])
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Arc<SkillNode>> {
        self.nodes.iter()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn count_role(&self, role: NodeRole) -> usize {
        self.nodes.iter().filter(|n| n.role == role).count()
    }
}

/// Result of parsing a taxonomy directory.
#[derive(Debug)]
pub struct LoadedOntology {
    pub ontology: Ontology,
    pub files: Vec<PathBuf>,
    /// blake3 over file paths and contents, in load order.
    pub fingerprint: String,
}

pub fn build_globset(patterns: &[String]) -> Result<GlobSet, OntologyLoadError> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = Glob::new(pat).map_err(|e| OntologyLoadError::Pattern {
            pattern: pat.clone(),
            message: e.to_string(),
        })?;
        builder.add(glob);
    }
    builder.build().map_err(|e| OntologyLoadError::Pattern {
        pattern: patterns.join(","),
        message: e.to_string(),
    })
}

/// Taxonomy files under `root` whose file name matches `include`, in
/// file-name order. A missing root yields no files.
pub fn taxonomy_files(root: &Path, include: &GlobSet) -> Result<Vec<PathBuf>, OntologyLoadError> {
    if !root.exists() {
        info!("Taxonomy location {:?} does not exist", root);
        return Ok(Vec::new());
    }
    let mut files = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(|e| OntologyLoadError::Io {
            path: e.path().map(Path::to_path_buf).unwrap_or_else(|| root.to_path_buf()),
            source: e.into(),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        if include.is_match(entry.file_name()) {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// Parses every taxonomy file under `root`. Any failing file fails the
/// whole load.
pub fn load_dir(root: &Path, include: &[String]) -> Result<LoadedOntology, OntologyLoadError> {
    let globs = build_globset(include)?;
    let files = taxonomy_files(root, &globs)?;
    if files.is_empty() {
        warn!("No taxonomy files found under {:?}", root);
    } else {
        info!("Loading {} taxonomy file(s) from {:?}", files.len(), root);
    }

    let mut ontology = Ontology::new();
    let mut hasher = blake3::Hasher::new();
    for path in &files {
        let bytes = std::fs::read(path).map_err(|source| OntologyLoadError::Io {
            path: path.clone(),
            source,
        })?;
        hasher.update(path.to_string_lossy().as_bytes());
        hasher.update(&bytes);
        let nodes = parse_turtle(&bytes, path)?;
        debug!("{:?}: {} node(s)", path, nodes.len());
        for node in nodes {
            if let Some(previous) = ontology.insert(node) {
                warn!(
                    "Skill {} declared more than once; keeping the declaration from {:?}",
                    previous.name, path
                );
            }
        }
    }

    Ok(LoadedOntology {
        ontology,
        files,
        fingerprint: hasher.finalize().to_hex().to_string(),
    })
}

/// Parses one Turtle document. `origin` is only used in errors and logs.
pub fn parse_turtle(source: &[u8], origin: &Path) -> Result<Vec<SkillNode>, OntologyLoadError> {
    let graph = FileGraph::parse(source, origin)?;
    graph.skill_nodes()
}

/// Splits an absolute web IRI on its first `#` into `(namespace, local name)`.
/// Anything else is a bare local name.
pub fn split_iri(iri: &str) -> (Option<String>, String) {
    if iri.starts_with("http://") || iri.starts_with("https://") {
        if let Some((namespace, name)) = iri.split_once('#') {
            return (Some(namespace.to_string()), name.to_string());
        }
    }
    (None, iri.to_string())
}

fn local_name(iri: &str) -> String {
    split_iri(iri).1
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Object {
    Iri(String),
    Blank,
    Literal(String),
}

struct FileGraph<'a> {
    origin: &'a Path,
    /// subject IRI -> (predicate IRI, object), in document order
    by_subject: HashMap<String, Vec<(String, Object)>>,
    /// (subject, role) for each node declaration, in document order
    declarations: Vec<(String, NodeRole)>,
    namespace: Option<String>,
}

impl<'a> FileGraph<'a> {
    fn parse(source: &[u8], origin: &'a Path) -> Result<Self, OntologyLoadError> {
        let mut parser = TurtleParser::new().for_reader(source);
        let mut by_subject: HashMap<String, Vec<(String, Object)>> = HashMap::new();
        let mut declarations = Vec::new();
        let mut ontology_iri = None;

        for triple in parser.by_ref() {
            let triple = triple.map_err(|e| OntologyLoadError::Parse {
                path: origin.to_path_buf(),
                message: e.to_string(),
            })?;
            let subject = match triple.subject {
                Subject::NamedNode(node) => node.into_string(),
                // Restrictions and other anonymous resources never become skills.
                #[allow(unreachable_patterns)]
                _ => continue,
            };
            let object = match triple.object {
                Term::NamedNode(node) => Object::Iri(node.into_string()),
                Term::Literal(literal) => Object::Literal(literal.value().to_string()),
                #[allow(unreachable_patterns)]
                _ => Object::Blank,
            };
            let predicate = triple.predicate.into_string();

            if predicate == RDF_TYPE {
                match &object {
                    Object::Iri(o) if o == OWL_NAMED_INDIVIDUAL => {
                        declarations.push((subject.clone(), NodeRole::Individual))
                    }
                    Object::Iri(o) if o == OWL_CLASS => {
                        declarations.push((subject.clone(), NodeRole::Class))
                    }
                    Object::Iri(o) if o == OWL_ONTOLOGY && ontology_iri.is_none() => {
                        ontology_iri = Some(subject.clone())
                    }
                    _ => {}
                }
            }
            by_subject.entry(subject).or_default().push((predicate, object));
        }

        let default_prefix = parser
            .prefixes()
            .find(|(prefix, _)| prefix.is_empty())
            .map(|(_, iri)| iri.to_string());
        let namespace = default_prefix.or_else(|| ontology_iri.map(|iri| format!("{iri}#")));

        Ok(Self {
            origin,
            by_subject,
            declarations,
            namespace,
        })
    }

    fn objects<'s>(&'s self, subject: &str, predicate: &'s str) -> impl Iterator<Item = &'s Object> {
        self.by_subject
            .get(subject)
            .into_iter()
            .flatten()
            .filter(move |(p, _)| p == predicate)
            .map(|(_, o)| o)
    }

    fn iris<'s>(&'s self, subject: &str, predicate: &'s str) -> impl Iterator<Item = &'s str> {
        self.objects(subject, predicate).filter_map(|o| match o {
            Object::Iri(iri) => Some(iri.as_str()),
            _ => None,
        })
    }

    fn skill_nodes(&self) -> Result<Vec<SkillNode>, OntologyLoadError> {
        let mut nodes = Vec::with_capacity(self.declarations.len());
        for (subject, role) in &self.declarations {
            let (namespace, name) = split_iri(subject);
            let labels = self.objects(subject, RDFS_LABEL).filter_map(|o| match o {
                Object::Literal(value) => Some(value.clone()),
                Object::Iri(iri) => Some(local_name(iri)),
                Object::Blank => None,
            });
            let parents = match role {
                NodeRole::Individual => self
                    .iris(subject, RDF_TYPE)
                    .filter(|iri| *iri != OWL_NAMED_INDIVIDUAL)
                    .map(local_name)
                    .collect(),
                NodeRole::Class => self.superclasses(subject)?,
            };
            let mut node = SkillNode::new(namespace, name, *role).with_labels(labels);
            node.parents = dedup(parents, &node.name);
            self.apply_custom_properties(subject, &mut node);
            nodes.push(node);
        }
        Ok(nodes)
    }

    /// Transitive `rdfs:subClassOf` closure of `start` as local names, in
    /// discovery order. Reflexive edges are ignored; any longer cycle is an
    /// error.
    fn superclasses(&self, start: &str) -> Result<Vec<String>, OntologyLoadError> {
        let mut order = Vec::new();
        let mut seen = HashSet::new();
        let mut path = vec![start.to_string()];
        self.visit_superclasses(start, &mut path, &mut seen, &mut order)?;
        Ok(order.iter().map(|iri| local_name(iri)).collect())
    }

    fn visit_superclasses(
        &self,
        class: &str,
        path: &mut Vec<String>,
        seen: &mut HashSet<String>,
        order: &mut Vec<String>,
    ) -> Result<(), OntologyLoadError> {
        for parent in self.iris(class, RDFS_SUB_CLASS_OF) {
            if parent == class {
                warn!(
                    "{:?}: {} is declared a subclass of itself; ignoring the edge",
                    self.origin,
                    local_name(class)
                );
                continue;
            }
            if let Some(pos) = path.iter().position(|p| p == parent) {
                let mut cycle: Vec<String> = path[pos..].iter().map(|p| local_name(p)).collect();
                cycle.push(local_name(parent));
                return Err(OntologyLoadError::Cycle {
                    path: self.origin.to_path_buf(),
                    cycle,
                });
            }
            if !seen.insert(parent.to_string()) {
                continue;
            }
            order.push(parent.to_string());
            path.push(parent.to_string());
            self.visit_superclasses(parent, path, seen, order)?;
            path.pop();
        }
        Ok(())
    }

    fn apply_custom_properties(&self, subject: &str, node: &mut SkillNode) {
        let Some(namespace) = &self.namespace else {
            return;
        };
        let difficulty = format!("{namespace}{DIFFICULTY}");
        for value in self.objects(subject, &difficulty) {
            match literal_text(value).trim().parse::<i32>() {
                Ok(v) => node.difficulty = v,
                Err(_) => warn!(
                    "difficulty {:?} of {} is not an integer, keeping {}",
                    literal_text(value),
                    node.name,
                    node.difficulty
                ),
            }
        }
        let keyword_only = format!("{namespace}{KEYWORD_ONLY}");
        for value in self.objects(subject, &keyword_only) {
            match parse_bool(literal_text(value)) {
                Some(v) => node.keyword_only = v,
                None => warn!(
                    "keywordOnly {:?} of {} is not a boolean, keeping {}",
                    literal_text(value),
                    node.name,
                    node.keyword_only
                ),
            }
        }
    }
}

fn literal_text(object: &Object) -> &str {
    match object {
        Object::Literal(value) | Object::Iri(value) => value,
        Object::Blank => "",
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
}

fn dedup(names: Vec<String>, own: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    names
        .into_iter()
        .filter(|n| n != own && seen.insert(n.clone()))
        .collect()
}
