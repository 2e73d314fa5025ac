use crate::{ContentHit, SearchBackend, SearchBackendError};

/// Backend that never finds anything.
#[derive(Debug, Default)]
pub struct NoopBackend;

#[async_trait::async_trait]
impl SearchBackend for NoopBackend {
    async fn find_phrases(
        &self,
        _document_id: &str,
        _phrases: &[String],
    ) -> Result<Vec<ContentHit>, SearchBackendError> {
        Ok(Vec::new())
    }
}
