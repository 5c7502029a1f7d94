//! Scripted backend used by the unit tests.

use crate::backend::{BackendError, CollectionPage, RecognitionBackend};
use crate::types::{CollectionId, FaceMatch, FaceRecord};
use async_trait::async_trait;
use std::collections::{HashSet, VecDeque};
use std::sync::Mutex;

pub(crate) fn service_error(code: &str) -> BackendError {
    BackendError::Service {
        code: code.to_string(),
        message: "scripted failure".to_string(),
    }
}

pub(crate) fn ids(n: usize) -> Vec<CollectionId> {
    (0..n)
        .map(|i| CollectionId::parse(&format!("c{i}")).unwrap())
        .collect()
}

pub(crate) fn faces(n: usize) -> Vec<FaceRecord> {
    (0..n)
        .map(|i| FaceRecord {
            face_id: Some(format!("face-{i}")),
            image_id: None,
            confidence: Some(99.0),
            bounding_box: None,
        })
        .collect()
}

pub(crate) fn hit(similarity: Option<f32>) -> FaceMatch {
    FaceMatch {
        similarity,
        face_id: Some("face-0".into()),
    }
}

#[derive(Default)]
pub(crate) struct StubBackend {
    fail_create: bool,
    fail_list: bool,
    pages: Vec<CollectionPage>,
    failing_deletes: HashSet<String>,
    hanging_deletes: HashSet<String>,
    enroll_script: Mutex<VecDeque<Result<Vec<FaceRecord>, BackendError>>>,
    search_script: Mutex<VecDeque<Result<Vec<FaceMatch>, BackendError>>>,
    created: Mutex<Vec<CollectionId>>,
    deleted: Mutex<Vec<CollectionId>>,
    enroll_calls: Mutex<usize>,
    search_calls: Mutex<Vec<u32>>,
}

impl StubBackend {
    pub(crate) fn failing_create(mut self) -> Self {
        self.fail_create = true;
        self
    }

    pub(crate) fn failing_list(mut self) -> Self {
        self.fail_list = true;
        self
    }

    /// Single-page listing.
    pub(crate) fn with_collections(self, ids: Vec<CollectionId>) -> Self {
        self.with_pages(vec![CollectionPage {
            ids,
            next_token: None,
        }])
    }

    pub(crate) fn with_pages(mut self, pages: Vec<CollectionPage>) -> Self {
        self.pages = pages;
        self
    }

    pub(crate) fn failing_delete(mut self, id: &str) -> Self {
        self.failing_deletes.insert(id.to_string());
        self
    }

    /// Deletion of `id` never completes.
    pub(crate) fn hanging_delete(mut self, id: &str) -> Self {
        self.hanging_deletes.insert(id.to_string());
        self
    }

    pub(crate) fn enroll_returns(self, result: Result<Vec<FaceRecord>, BackendError>) -> Self {
        self.enroll_script.lock().unwrap().push_back(result);
        self
    }

    pub(crate) fn search_returns(self, result: Result<Vec<FaceMatch>, BackendError>) -> Self {
        self.search_script.lock().unwrap().push_back(result);
        self
    }

    pub(crate) fn created(&self) -> Vec<CollectionId> {
        self.created.lock().unwrap().clone()
    }

    pub(crate) fn create_calls(&self) -> usize {
        self.created.lock().unwrap().len()
    }

    pub(crate) fn deleted(&self) -> Vec<CollectionId> {
        self.deleted.lock().unwrap().clone()
    }

    pub(crate) fn enroll_calls(&self) -> usize {
        *self.enroll_calls.lock().unwrap()
    }

    pub(crate) fn search_calls(&self) -> Vec<u32> {
        self.search_calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl RecognitionBackend for StubBackend {
    async fn create_collection(&self, id: &CollectionId) -> Result<(), BackendError> {
        self.created.lock().unwrap().push(id.clone());
        if self.fail_create {
            Err(service_error("ServiceUnavailableException"))
        } else {
            Ok(())
        }
    }

    async fn delete_collection(&self, id: &CollectionId) -> Result<(), BackendError> {
        self.deleted.lock().unwrap().push(id.clone());
        if self.hanging_deletes.contains(id.as_str()) {
            std::future::pending::<()>().await;
        }
        if self.failing_deletes.contains(id.as_str()) {
            Err(service_error("ResourceNotFoundException"))
        } else {
            Ok(())
        }
    }

    async fn list_collections_page(
        &self,
        next_token: Option<&str>,
    ) -> Result<CollectionPage, BackendError> {
        if self.fail_list {
            return Err(service_error("AccessDeniedException"));
        }
        let index = match next_token {
            None => 0,
            Some(t) => t
                .parse::<usize>()
                .map_err(|_| BackendError::MalformedResponse(t.to_string()))?,
        };
        Ok(self.pages.get(index).cloned().unwrap_or_default())
    }

    async fn enroll_face(
        &self,
        _id: &CollectionId,
        _image: &[u8],
    ) -> Result<Vec<FaceRecord>, BackendError> {
        *self.enroll_calls.lock().unwrap() += 1;
        let next = self.enroll_script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Ok(faces(1)))
    }

    async fn search_face(
        &self,
        _id: &CollectionId,
        _image: &[u8],
        max_results: u32,
    ) -> Result<Vec<FaceMatch>, BackendError> {
        self.search_calls.lock().unwrap().push(max_results);
        let next = self.search_script.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Ok(Vec::new()))
    }
}
