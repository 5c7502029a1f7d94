//! friendcheck-core — friend collections, enrollment, verification and retention.
//!
//! The face recognition itself is delegated to a [`RecognitionBackend`];
//! this crate owns the session lifecycle and the policy around it.

pub mod backend;
pub mod enrollment;
pub mod image_input;
pub mod session;
pub mod sweeper;
pub mod types;
pub mod verification;

#[cfg(test)]
mod testing;

pub use backend::{BackendError, CollectionPage, RecognitionBackend};
pub use image_input::{ImageInput, InputReadError, DEFAULT_MAX_IMAGE_BYTES};
pub use session::{LifecycleState, Session, SessionError, WorkflowError};
pub use sweeper::{
    RetentionPolicy, SettledDeletions, Stragglers, SweepError, SweepReport, Sweeper,
    DEFAULT_RETENTION_FLOOR,
};
pub use types::{
    enrollment_progress, tier, AnomalousScore, BoundingBox, CollectionId, ConfidenceTier,
    EnrollmentResult, FaceMatch, FaceRecord, VerificationOutcome,
};
