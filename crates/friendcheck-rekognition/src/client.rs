//! Amazon Rekognition implementation of [`RecognitionBackend`].

use crate::config::{ConfigError, CredentialSource, RekognitionConfig};
use crate::credentials::{CognitoCredentials, CredentialProvider, Credentials};
use crate::wire::{
    self, CollectionRequest, ImageBytes, IndexFacesRequest, IndexFacesResponse,
    ListCollectionsRequest, ListCollectionsResponse, SearchFacesByImageRequest,
    SearchFacesByImageResponse, Signer, StatusResponse,
};
use async_trait::async_trait;
use friendcheck_core::{
    BackendError, CollectionId, CollectionPage, FaceMatch, FaceRecord, RecognitionBackend,
};
use serde::de::DeserializeOwned;
use serde::Serialize;

const SERVICE: &str = "rekognition";

pub struct RekognitionClient {
    http: reqwest::Client,
    endpoint: String,
    host: String,
    region: String,
    credentials: CredentialProvider,
    list_page_size: u32,
}

impl RekognitionClient {
    /// Build a client from validated configuration.
    ///
    /// With the `env` credential source the `AWS_*` variables are read here,
    /// so a missing key fails at startup instead of on the first call.
    pub fn new(config: &RekognitionConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let http = reqwest::Client::builder()
            .user_agent(concat!("friendcheck/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ConfigError::Http(e.to_string()))?;

        let credentials = match config.credential_source() {
            CredentialSource::Env => {
                CredentialProvider::Static(Credentials::from_lookup(|k| std::env::var(k).ok())?)
            }
            CredentialSource::Cognito => {
                let pool = config
                    .identity_pool_id
                    .clone()
                    .ok_or(ConfigError::MissingIdentityPool)?;
                CredentialProvider::Cognito(CognitoCredentials::new(
                    http.clone(),
                    config.identity_endpoint(),
                    pool,
                ))
            }
        };

        Self::with_credentials(config, http, credentials)
    }

    /// Build a client with an explicit credential provider.
    pub fn with_credentials(
        config: &RekognitionConfig,
        http: reqwest::Client,
        credentials: CredentialProvider,
    ) -> Result<Self, ConfigError> {
        let endpoint = config.rekognition_endpoint();
        let host = signing_host(&endpoint)?;
        tracing::info!(
            endpoint = %endpoint,
            region = %config.region,
            credentials = ?config.credential_source(),
            "rekognition client configured"
        );
        Ok(Self {
            http,
            endpoint,
            host,
            region: config.region.clone(),
            credentials,
            list_page_size: config.list_page_size,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn call<Req, Resp>(&self, operation: &str, body: &Req) -> Result<Resp, BackendError>
    where
        Req: Serialize + Sync,
        Resp: DeserializeOwned,
    {
        let credentials = self.credentials.credentials().await?;
        let target = format!("RekognitionService.{operation}");
        wire::post_json(
            &self.http,
            &self.endpoint,
            &target,
            body,
            Some(Signer {
                credentials: &credentials,
                host: &self.host,
                region: &self.region,
                service: SERVICE,
            }),
        )
        .await
    }
}

/// `Host` header value for an endpoint URL, port included when non-default.
pub fn signing_host(endpoint: &str) -> Result<String, ConfigError> {
    let url = reqwest::Url::parse(endpoint)
        .map_err(|_| ConfigError::InvalidEndpoint(endpoint.to_string()))?;
    let host = url
        .host_str()
        .ok_or_else(|| ConfigError::InvalidEndpoint(endpoint.to_string()))?;
    Ok(match url.port() {
        Some(port) => format!("{host}:{port}"),
        None => host.to_string(),
    })
}

#[async_trait]
impl RecognitionBackend for RekognitionClient {
    async fn create_collection(&self, id: &CollectionId) -> Result<(), BackendError> {
        let _: StatusResponse = self
            .call(
                "CreateCollection",
                &CollectionRequest {
                    collection_id: id.as_str(),
                },
            )
            .await?;
        Ok(())
    }

    async fn delete_collection(&self, id: &CollectionId) -> Result<(), BackendError> {
        let _: StatusResponse = self
            .call(
                "DeleteCollection",
                &CollectionRequest {
                    collection_id: id.as_str(),
                },
            )
            .await?;
        Ok(())
    }

    async fn list_collections_page(
        &self,
        next_token: Option<&str>,
    ) -> Result<CollectionPage, BackendError> {
        let resp: ListCollectionsResponse = self
            .call(
                "ListCollections",
                &ListCollectionsRequest {
                    next_token,
                    max_results: Some(self.list_page_size),
                },
            )
            .await?;
        let ids = resp
            .collection_ids
            .iter()
            .map(|raw| {
                CollectionId::parse(raw).map_err(|e| BackendError::MalformedResponse(e.to_string()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(CollectionPage {
            ids,
            next_token: resp.next_token.filter(|t| !t.is_empty()),
        })
    }

    async fn enroll_face(
        &self,
        id: &CollectionId,
        image: &[u8],
    ) -> Result<Vec<FaceRecord>, BackendError> {
        let resp: IndexFacesResponse = self
            .call(
                "IndexFaces",
                &IndexFacesRequest {
                    collection_id: id.as_str(),
                    image: ImageBytes(image),
                },
            )
            .await?;
        Ok(resp.face_records.into_iter().map(FaceRecord::from).collect())
    }

    async fn search_face(
        &self,
        id: &CollectionId,
        image: &[u8],
        max_results: u32,
    ) -> Result<Vec<FaceMatch>, BackendError> {
        let resp: SearchFacesByImageResponse = self
            .call(
                "SearchFacesByImage",
                &SearchFacesByImageRequest {
                    collection_id: id.as_str(),
                    image: ImageBytes(image),
                    max_faces: max_results,
                },
            )
            .await?;
        Ok(resp.face_matches.into_iter().map(FaceMatch::from).collect())
    }
}
