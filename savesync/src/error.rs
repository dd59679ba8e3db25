use std::{io, path::PathBuf};

use savesync_core::{
    config::ConfigError, credential::CredentialError, store::StoreError, types::ObjectName,
};
use thiserror::Error;

use crate::archive::ArchiveError;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Config file not created yet, create a new one first")]
    ConfigMissing,
    #[error("Config file is corrupted, please create a new one : {0}")]
    ConfigCorrupt(String),
    #[error("Not authenticated, please authenticate first")]
    NotAuthenticated,
    #[error("World folder {0} not found on local machine (most likely this is the device you are syncing to)")]
    ReplicaMissing(PathBuf),
    #[error("Another machine is pushing its world (lock '{0}' present)")]
    LockHeld(ObjectName),
    #[error("World upload in progress from another machine, try again soon")]
    PushInProgress,
    #[error("No remote snapshot named '{0}' yet")]
    NoRemoteSnapshot(ObjectName),
    #[error("Transfer failed : {0}")]
    TransferFailed(String),
    #[error("Fingerprint unavailable : {0}")]
    FingerprintUnavailable(String),
    #[error("Unexpected error : {0:#}")]
    Unexpected(#[from] anyhow::Error),
}

impl SyncError {
    /// First pull on a fresh machine is not a failure
    pub fn is_fatal(&self) -> bool {
        !matches!(self, SyncError::NoRemoteSnapshot(_))
    }
}

impl From<StoreError> for SyncError {
    fn from(error: StoreError) -> Self {
        Self::TransferFailed(error.to_string())
    }
}

impl From<ArchiveError> for SyncError {
    fn from(error: ArchiveError) -> Self {
        Self::TransferFailed(error.to_string())
    }
}

impl From<io::Error> for SyncError {
    fn from(error: io::Error) -> Self {
        Self::TransferFailed(format!("{:?}", error))
    }
}

impl From<ConfigError> for SyncError {
    fn from(error: ConfigError) -> Self {
        match error {
            ConfigError::Missing(_) => Self::ConfigMissing,
            error => Self::ConfigCorrupt(error.to_string()),
        }
    }
}

impl From<CredentialError> for SyncError {
    fn from(error: CredentialError) -> Self {
        match error {
            CredentialError::NotAuthenticated => Self::NotAuthenticated,
            error => Self::TransferFailed(error.to_string()),
        }
    }
}
