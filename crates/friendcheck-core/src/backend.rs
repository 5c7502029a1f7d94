//! Contract for the external face-recognition service.
//!
//! Implementations talk to a real service (see `friendcheck-rekognition`)
//! or are scripted stubs in tests. Every call is remote and may fail.

use crate::types::{CollectionId, FaceMatch, FaceRecord};
use async_trait::async_trait;
use thiserror::Error;

/// Upper bound on listing pages followed in one `list_collections` call.
pub const MAX_LIST_PAGES: usize = 10_000;

#[derive(Error, Debug, Clone)]
pub enum BackendError {
    #[error("request failed: {0}")]
    Transport(String),
    #[error("credentials unavailable: {0}")]
    Credentials(String),
    #[error("{code}: {message}")]
    Service { code: String, message: String },
    #[error("malformed response: {0}")]
    MalformedResponse(String),
}

impl BackendError {
    /// Service error code (e.g. `ResourceNotFoundException`), if any.
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Service { code, .. } => Some(code),
            _ => None,
        }
    }
}

/// One page of a collection listing.
#[derive(Debug, Clone, Default)]
pub struct CollectionPage {
    pub ids: Vec<CollectionId>,
    /// Continuation token; `None` on the last page.
    pub next_token: Option<String>,
}

#[async_trait]
pub trait RecognitionBackend: Send + Sync {
    /// Create an empty collection. Not idempotent.
    async fn create_collection(&self, id: &CollectionId) -> Result<(), BackendError>;

    /// Delete a collection. Missing collections are an error.
    async fn delete_collection(&self, id: &CollectionId) -> Result<(), BackendError>;

    /// Fetch one page of live collection ids.
    async fn list_collections_page(
        &self,
        next_token: Option<&str>,
    ) -> Result<CollectionPage, BackendError>;

    /// Detect faces in `image` and add them to the collection.
    /// An empty result means no usable face was found.
    async fn enroll_face(
        &self,
        id: &CollectionId,
        image: &[u8],
    ) -> Result<Vec<FaceRecord>, BackendError>;

    /// Search the largest face in `image` against the collection.
    /// Matches come back by descending similarity; empty means no match.
    async fn search_face(
        &self,
        id: &CollectionId,
        image: &[u8],
        max_results: u32,
    ) -> Result<Vec<FaceMatch>, BackendError>;

    /// All live collection ids, following continuation tokens.
    ///
    /// Listing order is preserved across pages.
    async fn list_collections(&self) -> Result<Vec<CollectionId>, BackendError> {
        let mut ids = Vec::new();
        let mut token: Option<String> = None;

        for page_no in 0..MAX_LIST_PAGES {
            let page = self.list_collections_page(token.as_deref()).await?;
            tracing::debug!(page = page_no, count = page.ids.len(), "listed collections page");
            ids.extend(page.ids);

            match page.next_token {
                None => return Ok(ids),
                Some(next) if token.as_deref() == Some(next.as_str()) => {
                    return Err(BackendError::MalformedResponse(format!(
                        "listing repeated continuation token {next:?}"
                    )));
                }
                Some(next) => token = Some(next),
            }
        }

        Err(BackendError::MalformedResponse(format!(
            "listing did not terminate after {MAX_LIST_PAGES} pages"
        )))
    }
}
