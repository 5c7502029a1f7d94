use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Longest collection identifier the backend accepts.
const MAX_COLLECTION_ID_LEN: usize = 255;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid collection id {0:?}: expected 1-255 chars of [A-Za-z0-9_.-]")]
pub struct InvalidCollectionId(pub String);

/// Identifier of a backend face collection.
///
/// Session collections are always generated with [`CollectionId::generate`];
/// [`CollectionId::parse`] exists for ids read back from a listing or typed
/// by an operator.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CollectionId(String);

impl CollectionId {
    /// Fresh random identifier (UUID v4).
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn parse(raw: &str) -> Result<Self, InvalidCollectionId> {
        let valid = !raw.is_empty()
            && raw.len() <= MAX_COLLECTION_ID_LEN
            && raw
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'));
        if valid {
            Ok(Self(raw.to_string()))
        } else {
            Err(InvalidCollectionId(raw.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CollectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Face bounding box as ratios of the overall image size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

/// A face the backend indexed into a collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaceRecord {
    pub face_id: Option<String>,
    pub image_id: Option<String>,
    /// Detection confidence in [0, 100].
    pub confidence: Option<f32>,
    pub bounding_box: Option<BoundingBox>,
}

/// One search hit against an enrolled face.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaceMatch {
    /// Similarity in [0, 100]. `None` only for malformed responses.
    pub similarity: Option<f32>,
    pub face_id: Option<String>,
}

/// Outcome of one enrollment call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "faces", rename_all = "snake_case")]
pub enum EnrollmentResult {
    NoFaceDetected,
    FacesIndexed(usize),
}

impl EnrollmentResult {
    pub fn message(&self) -> &'static str {
        match self {
            Self::NoFaceDetected => {
                "Woops, no face was registered in that photo. Can you try a different one?"
            }
            Self::FacesIndexed(_) => "Photo added.",
        }
    }
}

/// Heading shown after `count` successful enrollments.
pub fn enrollment_progress(count: u32) -> String {
    match count {
        0 => "Provide a photo of at least one friend. To add multiple friends, upload multiple \
              photos or a group photo."
            .to_string(),
        1 => "One photo added. You can now try the friend-checker or add more photos.".to_string(),
        n => format!("{n} photos added. You can now try the friend-checker or add more photos."),
    }
}

/// Discrete confidence bucket for a similarity score, lowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfidenceTier {
    VeryLow,
    Low,
    Medium,
    High,
    Certain,
}

impl ConfidenceTier {
    /// Short label: "probably not" ... "definitely".
    pub fn label(&self) -> &'static str {
        match self {
            Self::VeryLow => "probably not",
            Self::Low => "could be, probably not",
            Self::Medium => "probably is",
            Self::High => "almost certainly",
            Self::Certain => "definitely",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            Self::VeryLow => "This is probably not your friend (less than 50% similarity)",
            Self::Low => {
                "This could be, but probably is not, your friend (less than 75% similarity) - \
                 worth a go?"
            }
            Self::Medium => {
                "This is probably your friend (greater than 75% similarity)! Say hello!"
            }
            Self::High => {
                "This is almost certainly your friend (greater than 90% similarity)! Say hello!"
            }
            Self::Certain => "This is DEFINITELY your friend (100% similarity score)!",
        }
    }
}

impl fmt::Display for ConfidenceTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Raised for a similarity outside [0, 100], NaN, or missing entirely.
#[derive(Error, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[error("anomalous similarity score: {score:?}")]
pub struct AnomalousScore {
    pub score: Option<f32>,
}

/// Map a similarity score in [0, 100] to its confidence tier.
///
/// Bounds are inclusive below and exclusive above, except `Certain`
/// which also includes 100.
pub fn tier(score: f32) -> Result<ConfidenceTier, AnomalousScore> {
    if !(0.0..=100.0).contains(&score) {
        return Err(AnomalousScore { score: Some(score) });
    }
    Ok(if score < 50.0 {
        ConfidenceTier::VeryLow
    } else if score < 75.0 {
        ConfidenceTier::Low
    } else if score < 90.0 {
        ConfidenceTier::Medium
    } else if score < 99.5 {
        ConfidenceTier::High
    } else {
        ConfidenceTier::Certain
    })
}

/// Outcome of one verification call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum VerificationOutcome {
    NoMatch,
    Match {
        tier: ConfidenceTier,
        similarity: f32,
        face_id: Option<String>,
    },
    Anomalous(AnomalousScore),
}

impl VerificationOutcome {
    pub fn message(&self) -> &'static str {
        match self {
            Self::NoMatch => "This is definitely not your friend. Abort!",
            Self::Match { tier, .. } => tier.message(),
            Self::Anomalous(_) => "Something went wrong, sorry!",
        }
    }
}
