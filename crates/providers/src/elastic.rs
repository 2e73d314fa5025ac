use crate::{any_phrase_query, ContentHit, SearchBackend, SearchBackendError};
use bytes::Bytes;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

#[derive(Clone, Debug)]
pub struct ElasticConfig {
    pub url: String,
    pub index: String,
    pub id_field: String,
    pub content_field: String,
    /// Legacy mapping type filter (`_type`), only for pre-7 clusters.
    pub doc_type: Option<String>,
    /// Hits per `_search` request; results are paged until exhausted.
    pub max_hits: u64,
}

#[derive(Clone)]
pub struct ElasticClient {
    client: Client,
    cfg: ElasticConfig,
}

impl ElasticClient {
    pub fn new(cfg: ElasticConfig) -> Self {
        Self {
            client: Client::new(),
            cfg,
        }
    }

    pub fn config(&self) -> &ElasticConfig {
        &self.cfg
    }

    /// Builds the `_search` body for the page starting at `from`: document id
    /// filter AND any quoted phrase.
    pub fn build_query(&self, document_id: &str, phrases: &[String], from: u64) -> Value {
        let mut bool_query = json!({
            "must": [
                { "terms": { self.cfg.id_field.as_str(): [document_id] } },
                { "query_string": {
                    "default_field": self.cfg.content_field.as_str(),
                    "query": any_phrase_query(phrases),
                } }
            ]
        });
        if let Some(doc_type) = &self.cfg.doc_type {
            bool_query["filter"] = json!([{ "term": { "_type": doc_type } }]);
        }
        json!({
            "from": from,
            "size": self.cfg.max_hits.max(1),
            "_source": [self.cfg.content_field.as_str()],
            "query": { "bool": bool_query },
        })
    }

    pub async fn search(&self, body: &Value) -> Result<ElasticSearchResponse, SearchBackendError> {
        let url = format!(
            "{}/{}/_search",
            self.cfg.url.trim_end_matches('/'),
            self.cfg.index
        );
        let resp = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| SearchBackendError::Unreachable(e.to_string()))?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.bytes().await.unwrap_or(Bytes::from_static(b""));
            return Err(SearchBackendError::Status {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }
        let parsed: ElasticSearchResponse = resp
            .json()
            .await
            .map_err(|e| SearchBackendError::Decode(e.to_string()))?;
        Ok(parsed)
    }
}

#[async_trait::async_trait]
impl SearchBackend for ElasticClient {
    async fn find_phrases(
        &self,
        document_id: &str,
        phrases: &[String],
    ) -> Result<Vec<ContentHit>, SearchBackendError> {
        if phrases.iter().all(|p| p.is_empty()) {
            return Ok(Vec::new());
        }
        let page_size = self.cfg.max_hits.max(1);
        let mut out = Vec::new();
        let mut from = 0;
        loop {
            let body = self.build_query(document_id, phrases, from);
            let resp = self.search(&body).await?;
            let fetched = resp.hits.hits.len() as u64;
            tracing::debug!(
                document_id,
                phrases = phrases.len(),
                from,
                hits = fetched,
                "elasticsearch page"
            );
            out.extend(contents_of(&resp, &self.cfg.content_field));
            match next_page(from, fetched, page_size, resp.hits.total()) {
                Some(next) => from = next,
                None => break,
            }
        }
        Ok(out)
    }
}

/// Offset of the page after `from`, or `None` once every hit has been read.
pub fn next_page(from: u64, fetched: u64, page_size: u64, total: Option<u64>) -> Option<u64> {
    let next = from + fetched;
    if fetched < page_size || total.map_or(false, |t| next >= t) {
        None
    } else {
        Some(next)
    }
}

/// Flattens the content field of every hit; array-valued fields yield one
/// block per string element.
pub fn contents_of(resp: &ElasticSearchResponse, content_field: &str) -> Vec<ContentHit> {
    let mut out = Vec::new();
    for hit in &resp.hits.hits {
        let Some(value) = hit.source.as_ref().and_then(|s| s.get(content_field)) else {
            continue;
        };
        match value {
            Value::String(s) => out.push(ContentHit {
                document_id: hit.id.clone(),
                content: s.clone(),
            }),
            Value::Array(items) => {
                for item in items {
                    if let Some(s) = item.as_str() {
                        out.push(ContentHit {
                            document_id: hit.id.clone(),
                            content: s.to_string(),
                        });
                    }
                }
            }
            _ => {}
        }
    }
    out
}

#[derive(Debug, Deserialize)]
pub struct ElasticSearchResponse {
    pub hits: ElasticHits,
}

#[derive(Debug, Deserialize)]
pub struct ElasticHits {
    #[serde(default)]
    pub total: Option<ElasticTotal>,
    #[serde(default)]
    pub hits: Vec<ElasticHit>,
}

impl ElasticHits {
    pub fn total(&self) -> Option<u64> {
        match self.total.as_ref()? {
            ElasticTotal::Count(n) => Some(*n),
            ElasticTotal::Object { value } => Some(*value),
        }
    }
}

/// `hits.total` is a number before 7.x and `{ "value": n, ... }` after.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ElasticTotal {
    Count(u64),
    Object { value: u64 },
}

#[derive(Debug, Deserialize)]
pub struct ElasticHit {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "_source")]
    pub source: Option<Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(doc_type: Option<&str>) -> ElasticClient {
        ElasticClient::new(ElasticConfig {
            url: "http://localhost:9200".into(),
            index: "prod-index".into(),
            id_field: "id".into(),
            content_field: "content".into(),
            doc_type: doc_type.map(str::to_string),
            max_hits: 10,
        })
    }

    #[test]
    fn query_scopes_to_document_and_quotes_phrases() {
        let body = client(None).build_query("65", &["java".into(), "c++".into()], 0);
        let must = &body["query"]["bool"]["must"];
        assert_eq!(must[0]["terms"]["id"][0], "65");
        assert_eq!(must[1]["query_string"]["query"], "\"java\" OR \"c++\"");
        assert_eq!(must[1]["query_string"]["default_field"], "content");
        assert!(body["query"]["bool"].get("filter").is_none());
        assert_eq!(body["_source"][0], "content");
        assert_eq!(body["from"], 0);
        assert_eq!(body["size"], 10);
    }

    #[test]
    fn legacy_type_filter_is_optional() {
        let body = client(Some("document")).build_query("1", &["rust".into()], 20);
        assert_eq!(body["query"]["bool"]["filter"][0]["term"]["_type"], "document");
        assert_eq!(body["from"], 20);
    }

    #[test]
    fn pages_until_every_hit_is_read() {
        // full pages continue, short or empty pages stop
        assert_eq!(next_page(0, 10, 10, None), Some(10));
        assert_eq!(next_page(10, 10, 10, Some(35)), Some(20));
        assert_eq!(next_page(30, 5, 10, Some(35)), None);
        assert_eq!(next_page(0, 0, 10, None), None);
        // total reached on a full page
        assert_eq!(next_page(10, 10, 10, Some(20)), None);
    }

    #[test]
    fn reads_both_total_shapes() {
        let old: ElasticHits = serde_json::from_value(json!({ "total": 12, "hits": [] })).unwrap();
        let new: ElasticHits =
            serde_json::from_value(json!({ "total": { "value": 40, "relation": "eq" } })).unwrap();
        let missing: ElasticHits = serde_json::from_value(json!({})).unwrap();
        assert_eq!(old.total(), Some(12));
        assert_eq!(new.total(), Some(40));
        assert_eq!(missing.total(), None);
    }

    #[test]
    fn collects_string_and_array_contents() {
        let resp: ElasticSearchResponse = serde_json::from_value(json!({
            "hits": { "hits": [
                { "_id": "1", "_source": { "content": "knows java" } },
                { "_id": "1", "_source": { "content": ["page one", 3, "page two"] } },
                { "_id": "2", "_source": {} }
            ] }
        }))
        .unwrap();
        let hits = contents_of(&resp, "content");
        let texts: Vec<&str> = hits.iter().map(|h| h.content.as_str()).collect();
        assert_eq!(texts, vec!["knows java", "page one", "page two"]);
    }

    #[tokio::test]
    async fn unreachable_cluster_is_an_error() {
        let backend = ElasticClient::new(ElasticConfig {
            url: "http://127.0.0.1:1".into(),
            ..client(None).config().clone()
        });
        let err = backend
            .find_phrases("1", &["java".into()])
            .await
            .unwrap_err();
        assert!(matches!(err, SearchBackendError::Unreachable(_)));
    }
}
