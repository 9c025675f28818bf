//! Already-resolved connection and credential parameters.
//!
//! Queue implementations backed by a real transport consume these on open;
//! the memory queue accepts and ignores them.

use std::collections::HashMap;
use std::fmt;

use serde::Deserialize;

use crate::core::error::QueueError;

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ConnectionParams {
    #[serde(default)]
    pub protocol: Option<String>,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub uri: Option<String>,
    #[serde(default)]
    pub discovery_key: Option<String>,
    #[serde(default, flatten)]
    pub extra: HashMap<String, String>,
}

impl ConnectionParams {
    pub fn from_uri(uri: impl Into<String>) -> Self {
        Self {
            uri: Some(uri.into()),
            ..Self::default()
        }
    }

    /// `uri` when set, otherwise `protocol://host:port` from whatever is present.
    pub fn endpoint(&self) -> Option<String> {
        if let Some(uri) = &self.uri {
            return Some(uri.clone());
        }
        let host = self.host.as_deref()?;
        let mut endpoint = match &self.protocol {
            Some(protocol) => format!("{protocol}://{host}"),
            None => host.to_string(),
        };
        if let Some(port) = self.port {
            endpoint.push_str(&format!(":{port}"));
        }
        Some(endpoint)
    }
}

#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CredentialParams {
    #[serde(default)]
    pub store_key: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub access_id: Option<String>,
    #[serde(default)]
    pub access_key: Option<String>,
}

// Secrets stay out of logs.
impl fmt::Debug for CredentialParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialParams")
            .field("store_key", &self.store_key)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("access_id", &self.access_id)
            .field("access_key", &self.access_key.as_ref().map(|_| "***"))
            .finish()
    }
}

/// A connection that can enumerate the queues reachable through it.
pub trait QueueConnection: Send + Sync {
    fn queue_names(&self) -> Result<Vec<String>, QueueError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_prefers_uri() {
        let params = ConnectionParams {
            uri: Some("amqp://broker:5672".into()),
            host: Some("ignored".into()),
            ..ConnectionParams::default()
        };
        assert_eq!(params.endpoint().as_deref(), Some("amqp://broker:5672"));
    }

    #[test]
    fn endpoint_from_parts() {
        let params = ConnectionParams {
            protocol: Some("tcp".into()),
            host: Some("localhost".into()),
            port: Some(8080),
            ..ConnectionParams::default()
        };
        assert_eq!(params.endpoint().as_deref(), Some("tcp://localhost:8080"));
        assert_eq!(ConnectionParams::default().endpoint(), None);
    }

    #[test]
    fn credential_debug_masks_secrets() {
        let creds = CredentialParams {
            username: Some("svc".into()),
            password: Some("hunter2".into()),
            ..CredentialParams::default()
        };
        let rendered = format!("{creds:?}");
        assert!(rendered.contains("svc"));
        assert!(!rendered.contains("hunter2"));
    }
}
