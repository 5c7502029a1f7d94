//! JSON-1.1 wire types and transport for Rekognition and Cognito Identity.

use crate::credentials::Credentials;
use crate::sigv4::{self, SigningInput};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use friendcheck_core::{BackendError, BoundingBox, FaceMatch, FaceRecord};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

pub const CONTENT_TYPE: &str = "application/x-amz-json-1.1";

/// Signing context for one request. `None` sends the request unsigned.
pub struct Signer<'a> {
    pub credentials: &'a Credentials,
    pub host: &'a str,
    pub region: &'a str,
    pub service: &'a str,
}

/// POST a JSON-1.1 request and decode the response body.
pub async fn post_json<Req, Resp>(
    http: &reqwest::Client,
    url: &str,
    target: &str,
    body: &Req,
    signer: Option<Signer<'_>>,
) -> Result<Resp, BackendError>
where
    Req: Serialize,
    Resp: DeserializeOwned,
{
    let payload = serde_json::to_vec(body)
        .map_err(|e| BackendError::Transport(format!("encode {target}: {e}")))?;

    let mut request = http
        .post(url)
        .header("Content-Type", CONTENT_TYPE)
        .header("X-Amz-Target", target);

    if let Some(signer) = signer {
        let signed = sigv4::sign(
            signer.credentials,
            &SigningInput {
                host: signer.host,
                target,
                content_type: CONTENT_TYPE,
                payload: &payload,
                region: signer.region,
                service: signer.service,
                time: Utc::now(),
            },
        )
        .map_err(|e| BackendError::Credentials(e.to_string()))?;
        request = request
            .header("X-Amz-Date", signed.amz_date)
            .header("Authorization", signed.authorization);
        if let Some(token) = signed.security_token {
            request = request.header("X-Amz-Security-Token", token);
        }
    }

    tracing::debug!(operation = target, bytes = payload.len(), "sending request");
    let resp = request
        .body(payload)
        .send()
        .await
        .map_err(|e| BackendError::Transport(e.to_string()))?;

    let status = resp.status();
    let bytes = resp
        .bytes()
        .await
        .map_err(|e| BackendError::Transport(e.to_string()))?;

    if !status.is_success() {
        return Err(parse_error(status.as_u16(), &bytes));
    }

    serde_json::from_slice(&bytes)
        .map_err(|e| BackendError::MalformedResponse(format!("{target}: {e}")))
}

#[derive(Deserialize)]
struct ErrorBody {
    #[serde(rename = "__type")]
    kind: Option<String>,
    #[serde(alias = "Message")]
    message: Option<String>,
}

/// Turn an error response into a `BackendError::Service`.
///
/// `__type` may carry a namespace prefix (`ns#Code`); only the code is kept.
pub fn parse_error(status: u16, body: &[u8]) -> BackendError {
    match serde_json::from_slice::<ErrorBody>(body) {
        Ok(ErrorBody {
            kind: Some(kind),
            message,
        }) => BackendError::Service {
            code: kind.rsplit('#').next().unwrap_or(&kind).to_string(),
            message: message.unwrap_or_default(),
        },
        _ => BackendError::Service {
            code: format!("HTTP{status}"),
            message: String::from_utf8_lossy(body).into_owned(),
        },
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct CollectionRequest<'a> {
    pub collection_id: &'a str,
}

/// Create/delete acknowledgement; only checked for well-formed JSON.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StatusResponse {
    pub status_code: Option<u16>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ListCollectionsRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_token: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_results: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ListCollectionsResponse {
    #[serde(default)]
    pub collection_ids: Vec<String>,
    pub next_token: Option<String>,
}

/// Inline image, base64-encoded on the wire.
#[derive(Debug)]
pub struct ImageBytes<'a>(pub &'a [u8]);

impl Serialize for ImageBytes<'_> {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        #[derive(Serialize)]
        #[serde(rename_all = "PascalCase")]
        struct Image {
            bytes: String,
        }
        Image {
            bytes: STANDARD.encode(self.0),
        }
        .serialize(serializer)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct IndexFacesRequest<'a> {
    pub collection_id: &'a str,
    pub image: ImageBytes<'a>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct IndexFacesResponse {
    #[serde(default)]
    pub face_records: Vec<WireFaceRecord>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WireFaceRecord {
    pub face: Option<WireFace>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WireFace {
    pub face_id: Option<String>,
    pub image_id: Option<String>,
    pub confidence: Option<f32>,
    pub bounding_box: Option<WireBoundingBox>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WireBoundingBox {
    pub left: Option<f32>,
    pub top: Option<f32>,
    pub width: Option<f32>,
    pub height: Option<f32>,
}

impl From<WireBoundingBox> for BoundingBox {
    fn from(b: WireBoundingBox) -> Self {
        Self {
            left: b.left.unwrap_or_default(),
            top: b.top.unwrap_or_default(),
            width: b.width.unwrap_or_default(),
            height: b.height.unwrap_or_default(),
        }
    }
}

impl From<WireFaceRecord> for FaceRecord {
    fn from(r: WireFaceRecord) -> Self {
        let face = r.face;
        Self {
            face_id: face.as_ref().and_then(|f| f.face_id.clone()),
            image_id: face.as_ref().and_then(|f| f.image_id.clone()),
            confidence: face.as_ref().and_then(|f| f.confidence),
            bounding_box: face.and_then(|f| f.bounding_box).map(BoundingBox::from),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct SearchFacesByImageRequest<'a> {
    pub collection_id: &'a str,
    pub image: ImageBytes<'a>,
    pub max_faces: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SearchFacesByImageResponse {
    #[serde(default)]
    pub face_matches: Vec<WireFaceMatch>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WireFaceMatch {
    pub similarity: Option<f32>,
    pub face: Option<WireFace>,
}

impl From<WireFaceMatch> for FaceMatch {
    fn from(m: WireFaceMatch) -> Self {
        Self {
            similarity: m.similarity,
            face_id: m.face.and_then(|f| f.face_id),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct GetIdRequest {
    pub identity_pool_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GetIdResponse {
    pub identity_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct GetCredentialsRequest {
    pub identity_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GetCredentialsResponse {
    pub credentials: Option<WireCredentials>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WireCredentials {
    pub access_key_id: Option<String>,
    pub secret_key: Option<String>,
    pub session_token: Option<String>,
    /// Seconds since the epoch.
    pub expiration: Option<f64>,
}

impl GetCredentialsResponse {
    pub fn into_credentials(self) -> Result<Credentials, BackendError> {
        let missing =
            |field: &str| BackendError::MalformedResponse(format!("credentials missing {field}"));
        let wire = self.credentials.ok_or_else(|| missing("Credentials"))?;
        Ok(Credentials {
            access_key_id: wire.access_key_id.ok_or_else(|| missing("AccessKeyId"))?,
            secret_access_key: wire.secret_key.ok_or_else(|| missing("SecretKey"))?,
            session_token: wire.session_token,
            expiration: wire
                .expiration
                .and_then(|secs| DateTime::<Utc>::from_timestamp(secs as i64, 0)),
        })
    }
}
