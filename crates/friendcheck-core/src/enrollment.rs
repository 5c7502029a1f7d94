//! Enrollment: add a friend's face to the session collection.

use crate::image_input::ImageInput;
use crate::session::{Session, WorkflowError};
use crate::types::EnrollmentResult;
use std::path::Path;

impl Session {
    /// Submit one image for enrollment.
    ///
    /// The enrolled count goes up by exactly one when the backend indexes
    /// at least one face, however many faces the photo held.
    pub async fn enroll(&self, image: &ImageInput) -> Result<EnrollmentResult, WorkflowError> {
        let id = self.ready_id().await?;

        let records = match self.backend().enroll_face(id, image.bytes()).await {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!(collection = %id, error = %e, "enroll failed; session unchanged");
                return Err(e.into());
            }
        };

        if records.is_empty() {
            tracing::info!(collection = %id, "enroll: no face detected");
            return Ok(EnrollmentResult::NoFaceDetected);
        }

        let count = self.record_enrollment();
        tracing::info!(
            collection = %id,
            faces = records.len(),
            enrolled = count,
            "enroll: faces indexed"
        );
        Ok(EnrollmentResult::FacesIndexed(records.len()))
    }

    /// Read, validate and enroll an image file.
    pub async fn enroll_path(
        &self,
        path: impl AsRef<Path>,
    ) -> Result<EnrollmentResult, WorkflowError> {
        let image = ImageInput::read(path, self.max_image_bytes).await?;
        self.enroll(&image).await
    }
}
