use friendcheck_core::DEFAULT_MAX_IMAGE_BYTES;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    #[error("invalid region {0:?}")]
    InvalidRegion(String),
    #[error("invalid endpoint {0:?}")]
    InvalidEndpoint(String),
    #[error("unknown credential source {0:?} (expected \"cognito\" or \"env\")")]
    UnknownCredentialSource(String),
    #[error("cognito credentials need FRIENDCHECK_IDENTITY_POOL_ID")]
    MissingIdentityPool,
    #[error("missing environment variable {0}")]
    MissingEnv(&'static str),
    #[error("http client: {0}")]
    Http(String),
}

/// Where signing credentials come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialSource {
    /// Anonymous identity-pool credentials.
    Cognito,
    /// `AWS_ACCESS_KEY_ID` / `AWS_SECRET_ACCESS_KEY` / `AWS_SESSION_TOKEN`.
    Env,
}

impl FromStr for CredentialSource {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "cognito" => Ok(Self::Cognito),
            "env" => Ok(Self::Env),
            _ => Err(ConfigError::UnknownCredentialSource(s.to_string())),
        }
    }
}

/// Backend client configuration.
///
/// Built once at startup and passed to the client; nothing here is global.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RekognitionConfig {
    /// AWS region for both the recognition and identity services.
    pub region: String,
    /// Rekognition endpoint override (default derived from region).
    pub endpoint: Option<String>,
    /// Cognito Identity endpoint override (default derived from region).
    pub identity_endpoint: Option<String>,
    pub identity_pool_id: Option<String>,
    /// Explicit credential source; inferred from `identity_pool_id` when unset.
    pub credentials: Option<CredentialSource>,
    /// `MaxResults` for each listing page.
    pub list_page_size: u32,
    /// Largest image accepted for upload.
    pub max_image_bytes: usize,
}

impl Default for RekognitionConfig {
    fn default() -> Self {
        Self {
            region: "eu-west-1".to_string(),
            endpoint: None,
            identity_endpoint: None,
            identity_pool_id: None,
            credentials: None,
            list_page_size: 1000,
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
        }
    }
}

impl RekognitionConfig {
    /// Defaults, then the TOML file named by `FRIENDCHECK_CONFIG`, then
    /// `FRIENDCHECK_*` environment overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match std::env::var("FRIENDCHECK_CONFIG") {
            Ok(path) => Self::from_file(Path::new(&path))?,
            Err(_) => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply `FRIENDCHECK_*` overrides read through `lookup`.
    ///
    /// Numeric values that fail to parse keep their previous value.
    pub fn apply_env(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(region) = lookup("FRIENDCHECK_REGION") {
            self.region = region;
        }
        if let Some(endpoint) = lookup("FRIENDCHECK_ENDPOINT") {
            self.endpoint = Some(endpoint);
        }
        if let Some(endpoint) = lookup("FRIENDCHECK_IDENTITY_ENDPOINT") {
            self.identity_endpoint = Some(endpoint);
        }
        if let Some(pool) = lookup("FRIENDCHECK_IDENTITY_POOL_ID") {
            self.identity_pool_id = Some(pool);
        }
        if let Some(source) = lookup("FRIENDCHECK_CREDENTIALS") {
            self.credentials = Some(source.parse()?);
        }
        self.list_page_size = parse_or(&lookup, "FRIENDCHECK_LIST_PAGE_SIZE", self.list_page_size);
        self.max_image_bytes = parse_or(&lookup, "FRIENDCHECK_MAX_IMAGE_BYTES", self.max_image_bytes);
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let region_ok = !self.region.is_empty()
            && self
                .region
                .chars()
                .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
        if !region_ok {
            return Err(ConfigError::InvalidRegion(self.region.clone()));
        }
        for endpoint in [&self.endpoint, &self.identity_endpoint].into_iter().flatten() {
            reqwest::Url::parse(endpoint)
                .map_err(|_| ConfigError::InvalidEndpoint(endpoint.clone()))?;
        }
        if self.credential_source() == CredentialSource::Cognito && self.identity_pool_id.is_none() {
            return Err(ConfigError::MissingIdentityPool);
        }
        Ok(())
    }

    pub fn credential_source(&self) -> CredentialSource {
        match (self.credentials, &self.identity_pool_id) {
            (Some(source), _) => source,
            (None, Some(_)) => CredentialSource::Cognito,
            (None, None) => CredentialSource::Env,
        }
    }

    pub fn rekognition_endpoint(&self) -> String {
        self.endpoint
            .clone()
            .unwrap_or_else(|| format!("https://rekognition.{}.amazonaws.com", self.region))
    }

    pub fn identity_endpoint(&self) -> String {
        self.identity_endpoint
            .clone()
            .unwrap_or_else(|| format!("https://cognito-identity.{}.amazonaws.com", self.region))
    }
}

fn parse_or<T: FromStr + Copy>(lookup: &impl Fn(&str) -> Option<String>, key: &str, current: T) -> T {
    match lookup(key) {
        None => current,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            tracing::warn!(key, value = %raw, "ignoring unparsable override");
            current
        }),
    }
}
