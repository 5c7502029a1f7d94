//! friendcheck-rekognition — Amazon Rekognition backend.
//!
//! Talks the JSON-1.1 protocol directly: SigV4-signed requests with
//! credentials from a Cognito identity pool or the environment.

pub mod client;
pub mod config;
pub mod credentials;
pub mod sigv4;
pub mod wire;

#[cfg(test)]
mod testing;

pub use client::RekognitionClient;
pub use config::{ConfigError, CredentialSource, RekognitionConfig};
pub use credentials::{CredentialProvider, Credentials};
