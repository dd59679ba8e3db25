use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use savesync_core::config::SyncConfig;
use savesync_core::types::{ObjectName, WorldName};

use crate::error::SyncError;

#[derive(Clone)]
pub struct Context {
    pub launcher_path: String,
    pub replica_path: PathBuf,
    pub world_name: WorldName,
    pub canary_file: PathBuf,
    pub poll_interval: Duration,
}

impl Context {
    pub fn new(
        launcher_path: String,
        replica_root: &Path,
        world_name: WorldName,
        canary_file: PathBuf,
        poll_interval: Duration,
    ) -> Self {
        Self {
            launcher_path,
            replica_path: replica_root.join(&world_name.0),
            world_name,
            canary_file,
            poll_interval,
        }
    }

    pub fn from_config(config: &SyncConfig) -> Result<Self, SyncError> {
        let replica_path = config.replica_path()?;
        Ok(Self {
            launcher_path: config.launcher_path.clone(),
            replica_path,
            world_name: config.world_name.clone(),
            canary_file: config.canary_file.clone(),
            poll_interval: config.poll_interval,
        })
    }

    /// Folder containing the replica, where pulled worlds are unpacked before
    /// taking the replica place
    pub fn replica_root(&self) -> PathBuf {
        self.replica_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn local_canary_path(&self) -> PathBuf {
        self.replica_path.join(&self.canary_file)
    }

    pub fn snapshot_name(&self) -> ObjectName {
        self.world_name.snapshot_name()
    }

    pub fn canary_object_name(&self) -> ObjectName {
        self.world_name.canary_name(&self.canary_file)
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("launcher_path", &self.launcher_path)
            .field("replica_path", &self.replica_path)
            .field("canary_file", &self.canary_file)
            .finish()
    }
}
