//! Cheap "are local and remote the same save" check.
//!
//! Only the canary file (the save metadata file, rewritten by the game on every
//! meaningful change) is digested, on both sides. Remote side downloads the canary
//! copy pushed next to the snapshot, never the snapshot itself.
use std::fmt::Display;

use savesync_core::{store::ObjectStore, utils::md5_file};

use crate::{context::Context, error::SyncError};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Digest(pub String);

impl Display for Digest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Comparison {
    Equal(Digest),
    Different { local: Digest, remote: Digest },
    /// One side can't be digested, considered as not in sync
    Unavailable(String),
}

impl Comparison {
    pub fn is_equal(&self) -> bool {
        matches!(self, Comparison::Equal(_))
    }
}

pub fn local_digest(context: &Context) -> Result<Digest, SyncError> {
    let canary_path = context.local_canary_path();
    if !canary_path.is_file() {
        return Err(SyncError::FingerprintUnavailable(format!(
            "local canary file {} not found",
            canary_path.display()
        )));
    }
    md5_file(&canary_path).map(Digest).map_err(|error| {
        SyncError::FingerprintUnavailable(format!(
            "unable to read {} : {}",
            canary_path.display(),
            error
        ))
    })
}

pub fn remote_digest(context: &Context, store: &dyn ObjectStore) -> Result<Digest, SyncError> {
    let canary_name = context.canary_object_name();
    let canary = store
        .find_by_name(&canary_name)
        .map_err(|error| SyncError::FingerprintUnavailable(error.to_string()))?
        .ok_or_else(|| {
            SyncError::FingerprintUnavailable(format!("remote canary '{}' not found", canary_name))
        })?;

    let scratch = tempfile::Builder::new()
        .prefix("savesync-canary")
        .tempdir()
        .map_err(|error| SyncError::FingerprintUnavailable(error.to_string()))?;
    let scratch_path = scratch.path().join(&canary_name.0);
    store
        .download(&canary.id, &scratch_path)
        .map_err(|error| SyncError::FingerprintUnavailable(error.to_string()))?;

    md5_file(&scratch_path)
        .map(Digest)
        .map_err(|error| SyncError::FingerprintUnavailable(error.to_string()))
}

pub fn equal(a: &Digest, b: &Digest) -> bool {
    a == b
}

pub fn compare(context: &Context, store: &dyn ObjectStore) -> Comparison {
    let local = match local_digest(context) {
        Ok(digest) => digest,
        Err(error) => return Comparison::Unavailable(error.to_string()),
    };
    let remote = match remote_digest(context, store) {
        Ok(digest) => digest,
        Err(error) => return Comparison::Unavailable(error.to_string()),
    };

    if equal(&local, &remote) {
        Comparison::Equal(local)
    } else {
        Comparison::Different { local, remote }
    }
}
