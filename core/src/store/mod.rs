use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use mockall::automock;
use serde_json::Value;
use thiserror::Error;

use crate::{
    config::{StoreConfig, StoreKind},
    credential::{CredentialError, CredentialStore, OAuthClient},
    types::{ObjectId, ObjectName},
};

pub mod directory;
pub mod drive;

#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("Connection error")]
    ConnectionError,
    #[error("Timeout error")]
    TimeoutError,
    #[error("Authentication error: `{0}`")]
    AuthenticationError(String),
    #[error("Object `{0}` not found")]
    NotFound(String),
    #[error("Invalid object name `{0}`")]
    InvalidName(String),
    #[error("Unexpected response: `{0}`")]
    UnexpectedResponse(String),
    #[error("Invalid response: `{0}` (`{1}`)")]
    InvalidResponse(String, Value),
    #[error("Local file {0} error: {1}")]
    FileError(PathBuf, String),
    #[error("Unknown error: `{0}`")]
    Unknown(String),
}

impl From<reqwest::Error> for StoreError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_connect() {
            return Self::ConnectionError;
        }

        if error.is_timeout() {
            return Self::TimeoutError;
        }

        Self::Unknown(error.to_string())
    }
}

impl From<CredentialError> for StoreError {
    fn from(error: CredentialError) -> Self {
        Self::AuthenticationError(error.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteObject {
    pub id: ObjectId,
    pub name: ObjectName,
    pub modified: Option<DateTime<Utc>>,
}

/// Remote object CRUD. There is no atomic "create if absent": callers which need
/// exclusivity must look up then create, and accept the race.
#[automock]
pub trait ObjectStore {
    fn create(&self, name: &ObjectName, path: &Path) -> Result<RemoteObject, StoreError>;
    fn find_by_name(&self, name: &ObjectName) -> Result<Option<RemoteObject>, StoreError>;
    fn download(&self, id: &ObjectId, destination: &Path) -> Result<(), StoreError>;
    fn delete(&self, id: &ObjectId) -> Result<(), StoreError>;
    /// Most recently modified object with this name
    fn latest_by_name(&self, name: &ObjectName) -> Result<Option<RemoteObject>, StoreError>;
}

pub fn from_config(
    config: &StoreConfig,
    credentials: &CredentialStore,
) -> Result<Box<dyn ObjectStore + Send>, StoreError> {
    match config.kind {
        StoreKind::Drive => {
            let oauth = match (&config.client_id, &config.client_secret) {
                (Some(client_id), Some(client_secret)) => Some(OAuthClient {
                    client_id: client_id.clone(),
                    client_secret: client_secret.clone(),
                }),
                _ => None,
            };
            Ok(Box::new(drive::DriveStore::new(
                credentials.clone(),
                oauth,
                config.folder.clone(),
            )?))
        }
        StoreKind::Directory => {
            let folder = config
                .folder
                .as_ref()
                .ok_or(StoreError::Unknown(
                    "Directory store requires a folder".to_string(),
                ))?;
            Ok(Box::new(directory::DirectoryStore::new(PathBuf::from(
                folder,
            ))?))
        }
    }
}
