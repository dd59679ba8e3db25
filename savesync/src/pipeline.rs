use std::{fs, path::Path};

use anyhow::Context as AnyhowContext;
use savesync_core::{
    status::StatusSender,
    store::{ObjectStore, RemoteObject},
    types::ObjectName,
};
use walkdir::WalkDir;

use crate::{
    archive::ArchiveCodec,
    context::Context,
    error::SyncError,
    lock::{Acquisition, LockCoordinator},
    replica::Replica,
};

/// One push or one pull, as a single unit of work. A failing step stops the
/// following ones.
pub struct Pipeline<'a> {
    context: &'a Context,
    store: &'a dyn ObjectStore,
    codec: &'a dyn ArchiveCodec,
    status: &'a StatusSender,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        context: &'a Context,
        store: &'a dyn ObjectStore,
        codec: &'a dyn ArchiveCodec,
        status: &'a StatusSender,
    ) -> Self {
        Self {
            context,
            store,
            codec,
            status,
        }
    }

    pub fn push(&self) -> Result<RemoteObject, SyncError> {
        let lock = LockCoordinator::new(self.store);
        let token = match lock.acquire()? {
            Acquisition::Acquired(token) => token,
            Acquisition::AlreadyHeld(_) => return Err(SyncError::LockHeld(lock.name().clone())),
        };

        let result = self.upload();

        // Lock is advisory: a failed release doesn't undo the upload
        if let Err(error) = lock.release(token) {
            self.status.warning(format!(
                "Unable to remove lock '{}', remove it manually : {}",
                lock.name(),
                error
            ));
        }

        result
    }

    fn upload(&self) -> Result<RemoteObject, SyncError> {
        let replica_path = &self.context.replica_path;
        if !replica_path.is_dir() {
            return Err(SyncError::ReplicaMissing(replica_path.clone()));
        }

        let scratch = tempfile::Builder::new()
            .prefix("savesync-push")
            .tempdir()?;
        self.status.info("Compressing world ...");
        let archive = self.codec.pack(replica_path, scratch.path())?;

        // Remote canary must describe the current snapshot or be absent: it is
        // removed first and uploaded back only once the snapshot is in place
        let canary_name = self.context.canary_object_name();
        self.remove(&canary_name)?;

        self.status.info("Uploading world ...");
        let snapshot = self.overwrite(&self.context.snapshot_name(), &archive)?;

        let canary_path = self.context.local_canary_path();
        if canary_path.is_file() {
            self.store.create(&canary_name, &canary_path)?;
        } else {
            self.status.warning(format!(
                "No {} in world folder, next syncs can't be skipped",
                self.context.canary_file.display()
            ));
        }

        fs::remove_file(&archive)?;
        Ok(snapshot)
    }

    /// There is at most one object per name: previous one is removed first
    fn overwrite(&self, name: &ObjectName, path: &Path) -> Result<RemoteObject, SyncError> {
        self.remove(name)?;
        Ok(self.store.create(name, path)?)
    }

    fn remove(&self, name: &ObjectName) -> Result<(), SyncError> {
        if let Some(existing) = self.store.find_by_name(name)? {
            log::debug!("Delete previous '{}' ({})", name, existing.id);
            self.store.delete(&existing.id)?;
        }
        Ok(())
    }

    pub fn pull(&self) -> Result<Replica, SyncError> {
        if LockCoordinator::new(self.store).is_held()? {
            return Err(SyncError::PushInProgress);
        }

        let snapshot_name = self.context.snapshot_name();
        let snapshot = self
            .store
            .find_by_name(&snapshot_name)?
            .ok_or_else(|| SyncError::NoRemoteSnapshot(snapshot_name.clone()))?;

        // Scratch next to the replica so the final move is a rename
        let replica_root = self.context.replica_root();
        fs::create_dir_all(&replica_root)?;
        let scratch = tempfile::Builder::new()
            .prefix(".savesync-pull")
            .tempdir_in(&replica_root)?;

        self.status.info("Downloading world ...");
        let archive = scratch.path().join(&snapshot_name.0);
        self.store.download(&snapshot.id, &archive)?;

        self.status.info("Extracting world ...");
        let unpacked = self
            .codec
            .unpack(&archive, &scratch.path().join("unpacked"))?;
        let unpacked_replica = unpacked.join(&self.context.world_name.0);
        if !unpacked_replica.is_dir() {
            return Err(SyncError::TransferFailed(format!(
                "Snapshot '{}' doesn't contain a '{}' folder",
                snapshot_name, self.context.world_name
            )));
        }

        replace_directory(&unpacked_replica, &self.context.replica_path)?;
        Ok(Replica::scan(
            &self.context.replica_path,
            self.context.world_name.clone(),
        )?)
    }
}

/// Remove `destination` then move `source` at its place
fn replace_directory(source: &Path, destination: &Path) -> anyhow::Result<()> {
    if destination.exists() {
        fs::remove_dir_all(destination)
            .context(format!("Remove previous replica {}", destination.display()))?;
    }

    if let Err(error) = fs::rename(source, destination) {
        log::debug!(
            "Unable to rename {} to {} ({}), copy it",
            source.display(),
            destination.display(),
            error
        );
        copy_directory(source, destination)?;
        fs::remove_dir_all(source).context(format!("Remove {}", source.display()))?;
    }

    Ok(())
}

fn copy_directory(source: &Path, destination: &Path) -> anyhow::Result<()> {
    for entry in WalkDir::new(source) {
        let entry = entry.context(format!("Read disk entry in {}", source.display()))?;
        let relative_path = entry
            .path()
            .strip_prefix(source)
            .expect("Walked paths are in the source folder");
        let target = destination.join(relative_path);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).context(format!("Create {}", target.display()))?;
        } else {
            fs::copy(entry.path(), &target)
                .context(format!("Copy {} to {}", entry.path().display(), target.display()))?;
        }
    }

    Ok(())
}
