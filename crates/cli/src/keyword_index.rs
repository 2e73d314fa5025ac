#[cfg(feature = "keyword-index")]
pub mod enabled {
    use anyhow::{anyhow, Result};
    use async_trait::async_trait;
    use providers::{ContentHit, SearchBackend, SearchBackendError};
    use std::path::Path;
    use std::sync::Arc;
    use tantivy::collector::TopDocs;
    use tantivy::doc;
    use tantivy::query::{BooleanQuery, Occur, PhraseQuery, Query, TermQuery};
    use tantivy::schema::{Field, IndexRecordOption, Schema, STORED, STRING, TEXT};
    use tantivy::tokenizer::TokenStream;
    use tantivy::{Index, IndexReader, IndexWriter, ReloadPolicy, Term};

    fn fields(index: &Index) -> Result<(Field, Field)> {
        let schema = index.schema();
        let id_field = schema
            .get_field("id")
            .map_err(|_| anyhow!("id field missing in index schema"))?;
        let content_field = schema
            .get_field("content")
            .map_err(|_| anyhow!("content field missing in index schema"))?;
        Ok((id_field, content_field))
    }

    fn open_or_create(path: &Path) -> Result<Index> {
        std::fs::create_dir_all(path)?;
        let index = Index::open_in_dir(path).or_else(|_| {
            let mut schema_builder = Schema::builder();
            schema_builder.add_text_field("id", STRING | STORED);
            schema_builder.add_text_field("content", TEXT | STORED);
            let schema = schema_builder.build();
            Index::create_in_dir(path, schema)
        })?;
        Ok(index)
    }

    /// Replaces the whole index with `docs` (`(document id, content)` pairs).
    pub fn build_index(path: &Path, docs: &[(String, String)]) -> Result<()> {
        let index = open_or_create(path)?;
        let (id_field, content_field) = fields(&index)?;
        let mut writer: IndexWriter = index.writer(50_000_000)?;
        writer.delete_all_documents()?;
        for (id, content) in docs {
            writer.add_document(doc!(id_field=>id.as_str(), content_field=>content.as_str()))?;
        }
        writer.commit()?;
        index.directory().sync_directory()?;
        Ok(())
    }

    /// Adds `docs`, replacing every stored block of the same document ids.
    pub fn upsert_docs(path: &Path, docs: &[(String, String)]) -> Result<()> {
        let index = open_or_create(path)?;
        let (id_field, content_field) = fields(&index)?;
        let mut writer: IndexWriter = index.writer(50_000_000)?;
        for (id, _) in docs {
            writer.delete_term(Term::from_field_text(id_field, id));
        }
        for (id, content) in docs {
            writer.add_document(doc!(id_field=>id.as_str(), content_field=>content.as_str()))?;
        }
        writer.commit()?;
        index.directory().sync_directory()?;
        Ok(())
    }

    /// Local full-text backend: one document id may own several content
    /// blocks, each stored as its own tantivy document. Every matching block
    /// is returned, fetched `page_size` hits at a time.
    pub struct KeywordIndex {
        index: Index,
        reader: IndexReader,
        id_field: Field,
        content_field: Field,
        page_size: usize,
    }

    impl KeywordIndex {
        pub fn open(path: &Path, page_size: usize) -> Result<Self> {
            let index = Index::open_in_dir(path)
                .map_err(|e| anyhow!("cannot open keyword index at {:?}: {}", path, e))?;
            let (id_field, content_field) = fields(&index)?;
            let reader = index
                .reader_builder()
                .reload_policy(ReloadPolicy::OnCommit)
                .try_into()?;
            Ok(Self {
                index,
                reader,
                id_field,
                content_field,
                page_size: page_size.max(1),
            })
        }

        /// Tokens of `phrase` as the content field indexes them.
        fn phrase_terms(&self, phrase: &str) -> Result<Vec<Term>, SearchBackendError> {
            let mut analyzer = self
                .index
                .tokenizer_for_field(self.content_field)
                .map_err(|e| SearchBackendError::Query(e.to_string()))?;
            let mut stream = analyzer.token_stream(phrase);
            let mut terms = Vec::new();
            while stream.advance() {
                terms.push(Term::from_field_text(
                    self.content_field,
                    &stream.token().text,
                ));
            }
            Ok(terms)
        }

        /// `id == document_id AND (phrase_1 OR phrase_2 ...)`.
        pub fn build_query(
            &self,
            document_id: &str,
            phrases: &[String],
        ) -> Result<Option<BooleanQuery>, SearchBackendError> {
            let mut any: Vec<(Occur, Box<dyn Query>)> = Vec::new();
            for phrase in phrases {
                let mut terms = self.phrase_terms(phrase)?;
                match terms.len() {
                    0 => continue,
                    1 => {
                        if let Some(term) = terms.pop() {
                            any.push((
                                Occur::Should,
                                Box::new(TermQuery::new(term, IndexRecordOption::Basic)),
                            ));
                        }
                    }
                    _ => any.push((Occur::Should, Box::new(PhraseQuery::new(terms)))),
                }
            }
            if any.is_empty() {
                return Ok(None);
            }
            let id = Term::from_field_text(self.id_field, document_id);
            Ok(Some(BooleanQuery::new(vec![
                (
                    Occur::Must,
                    Box::new(TermQuery::new(id, IndexRecordOption::Basic)),
                ),
                (Occur::Must, Box::new(BooleanQuery::new(any))),
            ])))
        }

        fn search(
            &self,
            document_id: &str,
            phrases: &[String],
        ) -> Result<Vec<ContentHit>, SearchBackendError> {
            let Some(query) = self.build_query(document_id, phrases)? else {
                return Ok(Vec::new());
            };
            let searcher = self.reader.searcher();
            let mut hits = Vec::new();
            let mut offset = 0;
            loop {
                let page = searcher
                    .search(
                        &query,
                        &TopDocs::with_limit(self.page_size).and_offset(offset),
                    )
                    .map_err(|e| SearchBackendError::Query(e.to_string()))?;
                let fetched = page.len();
                for (_score, addr) in page {
                    let doc = searcher
                        .doc(addr)
                        .map_err(|e| SearchBackendError::Decode(e.to_string()))?;
                    if let Some(text) = doc.get_first(self.content_field).and_then(|v| v.as_text()) {
                        hits.push(ContentHit {
                            document_id: document_id.to_string(),
                            content: text.to_string(),
                        });
                    }
                }
                if fetched < self.page_size {
                    break;
                }
                offset += fetched;
            }
            Ok(hits)
        }
    }

    #[async_trait]
    impl SearchBackend for KeywordIndex {
        async fn find_phrases(
            &self,
            document_id: &str,
            phrases: &[String],
        ) -> Result<Vec<ContentHit>, SearchBackendError> {
            self.search(document_id, phrases)
        }
    }

    pub fn open_backend(path: &Path, page_size: usize) -> Result<Arc<dyn SearchBackend>> {
        Ok(Arc::new(KeywordIndex::open(path, page_size)?))
    }
}

#[cfg(not(feature = "keyword-index"))]
pub mod enabled {
    use anyhow::{bail, Result};
    use providers::SearchBackend;
    use std::path::Path;
    use std::sync::Arc;

    const DISABLED: &str =
        "keyword index support is not compiled in; rebuild with --features keyword-index";

    pub fn build_index(_path: &Path, _docs: &[(String, String)]) -> Result<()> {
        bail!(DISABLED)
    }
    pub fn upsert_docs(_path: &Path, _docs: &[(String, String)]) -> Result<()> {
        bail!(DISABLED)
    }
    pub fn open_backend(_path: &Path, _page_size: usize) -> Result<Arc<dyn SearchBackend>> {
        bail!(DISABLED)
    }
}
