//! Backend credentials.
//!
//! Interactive sessions use short-lived anonymous credentials from a
//! Cognito identity pool. The scheduled job runs under a role and takes
//! its keys from the standard `AWS_*` environment variables.

use crate::config::ConfigError;
use crate::wire::{self, GetCredentialsRequest, GetCredentialsResponse, GetIdRequest, GetIdResponse};
use chrono::{DateTime, Duration, Utc};
use friendcheck_core::BackendError;
use std::fmt;
use tokio::sync::{Mutex, RwLock};

/// Credentials expiring within this window are refreshed early.
const REFRESH_MARGIN_SECS: i64 = 60;

#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub access_key_id: String,
    pub secret_access_key: String,
    pub session_token: Option<String>,
    pub expiration: Option<DateTime<Utc>>,
}

impl Credentials {
    /// Read `AWS_ACCESS_KEY_ID`, `AWS_SECRET_ACCESS_KEY` and the optional
    /// `AWS_SESSION_TOKEN` via `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let access_key_id =
            lookup("AWS_ACCESS_KEY_ID").ok_or(ConfigError::MissingEnv("AWS_ACCESS_KEY_ID"))?;
        let secret_access_key = lookup("AWS_SECRET_ACCESS_KEY")
            .ok_or(ConfigError::MissingEnv("AWS_SECRET_ACCESS_KEY"))?;
        Ok(Self {
            access_key_id,
            secret_access_key,
            session_token: lookup("AWS_SESSION_TOKEN").filter(|t| !t.is_empty()),
            expiration: None,
        })
    }

    /// Usable at `now` with the refresh margin applied.
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        match self.expiration {
            None => true,
            Some(exp) => exp - Duration::seconds(REFRESH_MARGIN_SECS) > now,
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("session_token", &self.session_token.as_ref().map(|_| "<redacted>"))
            .field("expiration", &self.expiration)
            .finish()
    }
}

/// Anonymous identity-pool credentials, cached until close to expiry.
pub struct CognitoCredentials {
    http: reqwest::Client,
    endpoint: String,
    identity_pool_id: String,
    identity_id: Mutex<Option<String>>,
    cached: RwLock<Option<Credentials>>,
}

impl CognitoCredentials {
    pub fn new(http: reqwest::Client, endpoint: String, identity_pool_id: String) -> Self {
        Self {
            http,
            endpoint,
            identity_pool_id,
            identity_id: Mutex::new(None),
            cached: RwLock::new(None),
        }
    }

    pub async fn credentials(&self) -> Result<Credentials, BackendError> {
        let now = Utc::now();
        if let Some(creds) = self.cached.read().await.as_ref() {
            if creds.is_fresh(now) {
                return Ok(creds.clone());
            }
        }

        let mut cached = self.cached.write().await;
        if let Some(creds) = cached.as_ref() {
            if creds.is_fresh(now) {
                return Ok(creds.clone());
            }
        }

        let identity_id = self.identity_id().await?;
        let response: GetCredentialsResponse = wire::post_json(
            &self.http,
            &self.endpoint,
            "AWSCognitoIdentityService.GetCredentialsForIdentity",
            &GetCredentialsRequest {
                identity_id: identity_id.clone(),
            },
            None,
        )
        .await
        .map_err(|e| BackendError::Credentials(e.to_string()))?;

        let creds = response.into_credentials()?;
        tracing::info!(
            identity = %identity_id,
            expires = ?creds.expiration,
            "obtained anonymous credentials"
        );
        *cached = Some(creds.clone());
        Ok(creds)
    }

    async fn identity_id(&self) -> Result<String, BackendError> {
        let mut slot = self.identity_id.lock().await;
        if let Some(id) = slot.as_ref() {
            return Ok(id.clone());
        }
        let response: GetIdResponse = wire::post_json(
            &self.http,
            &self.endpoint,
            "AWSCognitoIdentityService.GetId",
            &GetIdRequest {
                identity_pool_id: self.identity_pool_id.clone(),
            },
            None,
        )
        .await
        .map_err(|e| BackendError::Credentials(e.to_string()))?;
        tracing::debug!(identity = %response.identity_id, "resolved identity id");
        *slot = Some(response.identity_id.clone());
        Ok(response.identity_id)
    }
}

/// Where request-signing credentials come from.
pub enum CredentialProvider {
    Static(Credentials),
    Cognito(CognitoCredentials),
}

impl CredentialProvider {
    pub async fn credentials(&self) -> Result<Credentials, BackendError> {
        match self {
            Self::Static(creds) => Ok(creds.clone()),
            Self::Cognito(cognito) => cognito.credentials().await,
        }
    }
}
