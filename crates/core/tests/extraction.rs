mod common;

use common::{write_taxonomy, MemoryBackend, SKILLS_TTL};
use providers::SearchBackendError;
use skills_core::models::{SkillExtract, SkillNode};
use skills_core::ontology::Ontology;
use skills_core::{
    ExtractError, ExtractionEngine, ExtractionState, NodeRole, OntologyRepository,
    OntologySnapshot,
};
use std::collections::BTreeSet;
use std::sync::Arc;
use std::time::Duration;

fn triples(skills: &BTreeSet<SkillExtract>) -> Vec<(String, String, u32)> {
    skills
        .iter()
        .map(|s| (s.name.clone(), s.matched_alias.clone(), s.occurrence_count))
        .collect()
}

fn engine_over(dir: &std::path::Path, backend: Arc<MemoryBackend>) -> ExtractionEngine {
    let repository = Arc::new(OntologyRepository::new(vec!["*.ttl".into()]));
    ExtractionEngine::new(repository, dir, backend)
}

fn engine_with_nodes(nodes: Vec<SkillNode>, backend: Arc<MemoryBackend>) -> ExtractionEngine {
    let snapshot = OntologySnapshot::from_ontology(Ontology::from_nodes(nodes));
    let repository = Arc::new(OntologyRepository::with_snapshot(snapshot));
    ExtractionEngine::new(repository, "unused", backend)
}

#[tokio::test]
async fn document_without_aliases_yields_nothing() {
    let dir = tempfile::tempdir().unwrap();
    write_taxonomy(dir.path(), "skills.ttl", SKILLS_TTL);
    let backend = Arc::new(MemoryBackend::new().with_document("1", "Gardening and cooking."));
    let skills = engine_over(dir.path(), backend).extract("1").await.unwrap();
    assert!(skills.is_empty());
}

#[tokio::test]
async fn javascript_is_not_java() {
    let dir = tempfile::tempdir().unwrap();
    write_taxonomy(dir.path(), "skills.ttl", SKILLS_TTL);
    let backend = Arc::new(MemoryBackend::new().with_document("1", "Senior JavaScript developer"));
    let skills = engine_over(dir.path(), backend).extract("1").await.unwrap();
    assert!(skills.is_empty());
}

#[tokio::test]
async fn individual_folds_into_its_category() {
    let dir = tempfile::tempdir().unwrap();
    write_taxonomy(dir.path(), "skills.ttl", SKILLS_TTL);
    let backend = Arc::new(
        MemoryBackend::new().with_document("1", "This is a file for java developer. You should see skill java"),
    );
    let skills = engine_over(dir.path(), backend).extract("1").await.unwrap();
    assert_eq!(
        triples(&skills),
        vec![("ProgrammingLanguage".into(), "java".into(), 2)]
    );
}

#[tokio::test]
async fn class_alias_names_itself() {
    let dir = tempfile::tempdir().unwrap();
    write_taxonomy(dir.path(), "skills.ttl", SKILLS_TTL);
    let backend = Arc::new(MemoryBackend::new().with_document(
        "1",
        "ProgrammingLanguage, ProgrammingLanguage and again ProgrammingLanguage.",
    ));
    let skills = engine_over(dir.path(), backend).extract("1").await.unwrap();
    assert_eq!(
        triples(&skills),
        vec![(
            "ProgrammingLanguage".into(),
            "ProgrammingLanguage".into(),
            3
        )]
    );
}

#[tokio::test]
async fn same_finding_from_two_paths_keeps_the_highest_count() {
    // "y" is a label of two individuals that both belong to X; the backend
    // returns two content blocks with different counts.
    let nodes = vec![
        SkillNode::new(None, "A", NodeRole::Individual)
            .with_labels(["y"])
            .with_parents(["X"]),
        SkillNode::new(None, "B", NodeRole::Individual)
            .with_labels(["y"])
            .with_parents(["X"]),
        SkillNode::new(None, "X", NodeRole::Class),
    ];
    let backend = Arc::new(
        MemoryBackend::new()
            .with_document("1", "y and y")
            .with_document("1", "y y y y y"),
    );
    let skills = engine_with_nodes(nodes, backend).extract("1").await.unwrap();
    assert_eq!(triples(&skills), vec![("X".into(), "y".into(), 5)]);
}

#[tokio::test]
async fn batch_size_does_not_change_the_result() {
    let nodes = vec![
        SkillNode::new(None, "ProgrammingLanguage", NodeRole::Class),
        SkillNode::new(None, "Database", NodeRole::Class).with_labels(["database", "DB"]),
        SkillNode::new(None, "Java", NodeRole::Individual)
            .with_labels(["java", "Java language"])
            .with_parents(["ProgrammingLanguage"]),
        SkillNode::new(None, "Rust", NodeRole::Individual)
            .with_labels(["rust"])
            .with_parents(["ProgrammingLanguage"]),
        SkillNode::new(None, "PostgreSQL", NodeRole::Individual)
            .with_labels(["postgres", "Postgres"])
            .with_parents(["Database"]),
    ];
    let content = "Java and Rust services on Postgres; java, rust, postgres. \
                   Any database knowledge helps. Knows the Java language.";
    let mut results = Vec::new();
    for batch_size in [1, 2, 3, 100] {
        let backend = Arc::new(MemoryBackend::new().with_document("7", content));
        let engine = engine_with_nodes(nodes.clone(), backend).with_batch_size(batch_size);
        results.push(triples(&engine.extract("7").await.unwrap()));
    }
    assert!(!results[0].is_empty());
    for r in &results[1..] {
        assert_eq!(r, &results[0]);
    }
    assert!(results[0].contains(&("Database".into(), "database".into(), 1)));
    assert!(results[0].contains(&("ProgrammingLanguage".into(), "Java language".into(), 1)));
}

#[tokio::test]
async fn empty_ontology_never_queries_the_backend() {
    let dir = tempfile::tempdir().unwrap();
    let backend = Arc::new(MemoryBackend::new().with_document("1", "java"));
    let engine = engine_over(&dir.path().join("missing"), backend.clone());
    let run = engine.run("1").await;
    assert_eq!(run.history(), &["not_started", "ontology_ready", "done"]);
    assert!(run.into_result().unwrap().is_empty());
    assert_eq!(backend.calls(), 0);
}

#[tokio::test]
async fn repeated_extraction_is_stable() {
    let dir = tempfile::tempdir().unwrap();
    write_taxonomy(dir.path(), "skills.ttl", SKILLS_TTL);
    let backend = Arc::new(MemoryBackend::new().with_document("1", "java, Java language"));
    let engine = engine_over(dir.path(), backend);
    let first = engine.extract("1").await.unwrap();
    let second = engine.extract("1").await.unwrap();
    assert_eq!(triples(&first), triples(&second));
    assert_eq!(first.len(), 2);
}

#[tokio::test]
async fn backend_failure_fails_the_whole_call() {
    let dir = tempfile::tempdir().unwrap();
    write_taxonomy(dir.path(), "skills.ttl", SKILLS_TTL);
    let backend = Arc::new(
        MemoryBackend::new()
            .with_document("1", "java java")
            .failing_after(1),
    );
    let engine = engine_over(dir.path(), backend).with_batch_size(1).with_max_in_flight(1);
    let run = engine.run("1").await;
    assert!(matches!(run.state(), ExtractionState::Failed(_)));
    match run.into_result() {
        Err(ExtractError::SearchBackend(SearchBackendError::Unreachable(_))) => {}
        other => panic!("expected backend error, got {:?}", other),
    }
}

#[tokio::test]
async fn unparseable_taxonomy_fails_extraction() {
    let dir = tempfile::tempdir().unwrap();
    write_taxonomy(dir.path(), "good.ttl", SKILLS_TTL);
    write_taxonomy(dir.path(), "broken.ttl", "@prefix : <http://x#> .\n:A a ");
    let backend = Arc::new(MemoryBackend::new().with_document("1", "java"));
    let err = engine_over(dir.path(), backend.clone())
        .extract("1")
        .await
        .unwrap_err();
    assert!(matches!(err, ExtractError::OntologyLoad(_)));
    assert_eq!(backend.calls(), 0);
}

#[tokio::test]
async fn unknown_document_yields_nothing() {
    let dir = tempfile::tempdir().unwrap();
    write_taxonomy(dir.path(), "skills.ttl", SKILLS_TTL);
    let backend = Arc::new(MemoryBackend::new().with_document("1", "java"));
    let run = engine_over(dir.path(), backend).run("2").await;
    assert_eq!(
        run.history(),
        &["not_started", "ontology_ready", "retrieving", "folding", "done"]
    );
    assert!(run.into_result().unwrap().is_empty());
}

#[tokio::test]
async fn concurrent_documents_share_one_ontology() {
    let dir = tempfile::tempdir().unwrap();
    write_taxonomy(dir.path(), "skills.ttl", SKILLS_TTL);
    let backend = Arc::new(
        MemoryBackend::new()
            .with_document("1", "java")
            .with_document("2", "ProgrammingLanguage"),
    );
    let engine = Arc::new(engine_over(dir.path(), backend));
    let a = tokio::spawn({
        let engine = Arc::clone(&engine);
        async move { engine.extract("1").await }
    });
    let b = tokio::spawn({
        let engine = Arc::clone(&engine);
        async move { engine.extract("2").await }
    });
    let a = a.await.unwrap().unwrap();
    let b = b.await.unwrap().unwrap();
    assert_eq!(triples(&a), vec![("ProgrammingLanguage".into(), "java".into(), 1)]);
    assert_eq!(
        triples(&b),
        vec![("ProgrammingLanguage".into(), "ProgrammingLanguage".into(), 1)]
    );
}

#[tokio::test]
async fn case_variants_of_different_skills_are_both_reported() {
    let nodes = vec![
        SkillNode::new(None, "ProgrammingLanguage", NodeRole::Class),
        SkillNode::new(None, "PaymentNetwork", NodeRole::Class),
        SkillNode::new(None, "Swift", NodeRole::Individual).with_parents(["ProgrammingLanguage"]),
        SkillNode::new(None, "SWIFT", NodeRole::Individual).with_parents(["PaymentNetwork"]),
    ];
    let backend = Arc::new(
        MemoryBackend::new().with_document("1", "Swift developer integrating SWIFT payments"),
    );
    for batch_size in [1, 100] {
        let engine = engine_with_nodes(nodes.clone(), backend.clone()).with_batch_size(batch_size);
        let skills = engine.extract("1").await.unwrap();
        assert_eq!(
            triples(&skills),
            vec![
                ("PaymentNetwork".into(), "SWIFT".into(), 2),
                ("ProgrammingLanguage".into(), "Swift".into(), 2),
            ]
        );
    }
}

#[tokio::test]
async fn cancelled_extraction_aborts_running_batches() {
    let nodes: Vec<_> = (0..8)
        .map(|i| SkillNode::new(None, format!("Skill{i}"), NodeRole::Class))
        .collect();
    let backend = Arc::new(
        MemoryBackend::new()
            .with_document("1", "Skill0 Skill7")
            .responding_after(Duration::from_millis(300)),
    );
    let engine = engine_with_nodes(nodes, backend.clone())
        .with_batch_size(1)
        .with_max_in_flight(8);

    let outcome = tokio::time::timeout(Duration::from_millis(50), engine.extract("1")).await;
    assert!(outcome.is_err());
    let started = backend.calls();
    assert!(started > 0);

    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(backend.completed(), 0);
    assert_eq!(backend.calls(), started);
}
