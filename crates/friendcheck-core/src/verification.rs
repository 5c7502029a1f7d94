//! Verification: is the person in this photo an enrolled friend?

use crate::image_input::ImageInput;
use crate::session::{Session, WorkflowError};
use crate::types::{tier, AnomalousScore, FaceMatch, VerificationOutcome};
use std::path::Path;

/// Only the best match is ever requested.
const SEARCH_MAX_RESULTS: u32 = 1;

/// Interpret a search result list. Pure; never indexes an empty list.
pub fn interpret_matches(matches: &[FaceMatch]) -> VerificationOutcome {
    let Some(best) = matches.first() else {
        return VerificationOutcome::NoMatch;
    };
    let Some(similarity) = best.similarity else {
        return VerificationOutcome::Anomalous(AnomalousScore { score: None });
    };
    match tier(similarity) {
        Ok(tier) => VerificationOutcome::Match {
            tier,
            similarity,
            face_id: best.face_id.clone(),
        },
        Err(anomalous) => VerificationOutcome::Anomalous(anomalous),
    }
}

impl Session {
    /// Search a probe image against the session collection.
    pub async fn verify(&self, probe: &ImageInput) -> Result<VerificationOutcome, WorkflowError> {
        let id = self.ready_id().await?;

        let matches = match self
            .backend()
            .search_face(id, probe.bytes(), SEARCH_MAX_RESULTS)
            .await
        {
            Ok(matches) => matches,
            Err(e) => {
                tracing::warn!(collection = %id, error = %e, "verify failed; session unchanged");
                return Err(e.into());
            }
        };

        let outcome = interpret_matches(&matches);
        match &outcome {
            VerificationOutcome::NoMatch => {
                tracing::info!(collection = %id, "verify: no match");
            }
            VerificationOutcome::Match {
                tier, similarity, ..
            } => {
                tracing::info!(collection = %id, similarity, tier = %tier, "verify: match");
            }
            VerificationOutcome::Anomalous(a) => {
                tracing::warn!(collection = %id, score = ?a.score, "verify: anomalous score");
            }
        }
        Ok(outcome)
    }

    /// Read, validate and verify a probe image file.
    pub async fn verify_path(
        &self,
        path: impl AsRef<Path>,
    ) -> Result<VerificationOutcome, WorkflowError> {
        let probe = ImageInput::read(path, self.max_image_bytes).await?;
        self.verify(&probe).await
    }
}
