//! Per-session collection lifecycle.
//!
//! A [`Session`] owns one generated collection id and walks
//! `Uninitialized → Creating → Ready`, or lands in the terminal `Error`
//! state if the backend refuses the collection. There is no teardown
//! call: abandoned collections are reclaimed by the retention sweeper.

use crate::backend::{BackendError, RecognitionBackend};
use crate::image_input::{InputReadError, DEFAULT_MAX_IMAGE_BYTES};
use crate::types::CollectionId;
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::RwLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    Uninitialized,
    Creating,
    Ready,
    Error,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Uninitialized => "uninitialized",
            Self::Creating => "creating",
            Self::Ready => "ready",
            Self::Error => "error",
        };
        f.write_str(s)
    }
}

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("session is {0}, not ready")]
    NotReady(LifecycleState),
    #[error("session already started ({0})")]
    AlreadyStarted(LifecycleState),
    #[error("session failed to start and must be restarted")]
    Terminated,
    #[error("could not create collection: {0}")]
    Create(#[source] BackendError),
}

impl SessionError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::NotReady(_) => "Start a session before adding or checking photos.",
            Self::AlreadyStarted(_) => "This session has already been started.",
            Self::Terminated | Self::Create(_) => {
                "Something went wrong setting things up. Please start a new session."
            }
        }
    }
}

/// Failure of an enrollment or verification step.
///
/// All variants are recoverable: the session stays usable unless it was
/// never ready in the first place.
#[derive(Error, Debug)]
pub enum WorkflowError {
    #[error(transparent)]
    Input(#[from] InputReadError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("backend call failed: {0}")]
    Backend(#[from] BackendError),
}

impl WorkflowError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Input(_) => "Could not read that photo. Please try another one.",
            Self::Session(e) => e.user_message(),
            Self::Backend(_) => "Something went wrong talking to the robot. Please try again.",
        }
    }
}

/// One user's friend collection.
pub struct Session {
    backend: Arc<dyn RecognitionBackend>,
    id: CollectionId,
    state: RwLock<LifecycleState>,
    /// Advisory: overlapping enrollments may interleave.
    enrolled: AtomicU32,
    pub(crate) max_image_bytes: usize,
}

impl Session {
    /// New session with a freshly generated collection id. No backend
    /// call is made until [`start`](Self::start).
    pub fn new(backend: Arc<dyn RecognitionBackend>) -> Self {
        Self {
            backend,
            id: CollectionId::generate(),
            state: RwLock::new(LifecycleState::Uninitialized),
            enrolled: AtomicU32::new(0),
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
        }
    }

    /// Cap applied when workflows read images from disk.
    pub fn with_max_image_bytes(mut self, max: usize) -> Self {
        self.max_image_bytes = max;
        self
    }

    /// Create the backend collection. Valid only once, from `Uninitialized`.
    ///
    /// A failed create is never retried with the same id; the session
    /// moves to `Error` and the caller must begin a new one.
    pub async fn start(&self) -> Result<(), SessionError> {
        {
            let mut state = self.state.write().await;
            match *state {
                LifecycleState::Uninitialized => *state = LifecycleState::Creating,
                LifecycleState::Error => return Err(SessionError::Terminated),
                other => return Err(SessionError::AlreadyStarted(other)),
            }
        }
        tracing::info!(collection = %self.id, "creating collection");

        match self.backend.create_collection(&self.id).await {
            Ok(()) => {
                *self.state.write().await = LifecycleState::Ready;
                tracing::info!(collection = %self.id, "session ready");
                Ok(())
            }
            Err(e) => {
                *self.state.write().await = LifecycleState::Error;
                tracing::error!(collection = %self.id, error = %e, "collection creation failed");
                Err(SessionError::Create(e))
            }
        }
    }

    pub async fn state(&self) -> LifecycleState {
        *self.state.read().await
    }

    pub fn collection_id(&self) -> &CollectionId {
        &self.id
    }

    /// Successful enrollment calls so far.
    pub fn enrolled_count(&self) -> u32 {
        self.enrolled.load(Ordering::Relaxed)
    }

    pub(crate) fn backend(&self) -> &dyn RecognitionBackend {
        self.backend.as_ref()
    }

    /// Collection id, if the session may issue workflow calls.
    pub(crate) async fn ready_id(&self) -> Result<&CollectionId, SessionError> {
        match *self.state.read().await {
            LifecycleState::Ready => Ok(&self.id),
            LifecycleState::Error => Err(SessionError::Terminated),
            other => Err(SessionError::NotReady(other)),
        }
    }

    pub(crate) fn record_enrollment(&self) -> u32 {
        self.enrolled.fetch_add(1, Ordering::Relaxed) + 1
    }
}
