use std::{
    fs, io,
    path::{Path, PathBuf},
};

use crate::{
    types::{ObjectId, ObjectName},
    utils::last_modified,
};

use super::{ObjectStore, RemoteObject, StoreError};

/// Object store backed by a shared folder (network share, synced cloud folder, ...).
/// Object ids are the object file names.
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    pub fn new(root: PathBuf) -> Result<Self, StoreError> {
        fs::create_dir_all(&root)
            .map_err(|error| StoreError::FileError(root.clone(), error.to_string()))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn object_path(&self, raw_name: &str) -> Result<PathBuf, StoreError> {
        if raw_name.is_empty()
            || raw_name.starts_with('.')
            || raw_name.contains(['/', '\\'])
        {
            return Err(StoreError::InvalidName(raw_name.to_string()));
        }
        Ok(self.root.join(raw_name))
    }

    fn object(&self, name: &ObjectName) -> Result<Option<RemoteObject>, StoreError> {
        let path = self.object_path(&name.0)?;
        if !path.is_file() {
            return Ok(None);
        }
        let modified = last_modified(&path).map_err(|error| file_error(&path, error))?;

        Ok(Some(RemoteObject {
            id: ObjectId(name.0.clone()),
            name: name.clone(),
            modified: Some(modified),
        }))
    }
}

fn file_error(path: &Path, error: io::Error) -> StoreError {
    StoreError::FileError(path.to_path_buf(), error.to_string())
}

impl ObjectStore for DirectoryStore {
    fn create(&self, name: &ObjectName, path: &Path) -> Result<RemoteObject, StoreError> {
        let object_path = self.object_path(&name.0)?;
        // Readers never see a partially written object
        let partial_path = self.root.join(format!(".{}.partial", name.0));
        fs::copy(path, &partial_path).map_err(|error| file_error(path, error))?;
        fs::rename(&partial_path, &object_path).map_err(|error| file_error(&object_path, error))?;
        log::debug!("Created object '{}' in '{}'", name, self.root.display());

        self.object(name)?
            .ok_or_else(|| StoreError::NotFound(name.0.clone()))
    }

    fn find_by_name(&self, name: &ObjectName) -> Result<Option<RemoteObject>, StoreError> {
        self.object(name)
    }

    fn download(&self, id: &ObjectId, destination: &Path) -> Result<(), StoreError> {
        let object_path = self.object_path(&id.0)?;
        if !object_path.is_file() {
            return Err(StoreError::NotFound(id.0.clone()));
        }
        fs::copy(&object_path, destination).map_err(|error| file_error(destination, error))?;
        Ok(())
    }

    fn delete(&self, id: &ObjectId) -> Result<(), StoreError> {
        let object_path = self.object_path(&id.0)?;
        match fs::remove_file(&object_path) {
            Ok(_) => {
                log::debug!("Deleted object '{}' from '{}'", id, self.root.display());
                Ok(())
            }
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                Err(StoreError::NotFound(id.0.clone()))
            }
            Err(error) => Err(file_error(&object_path, error)),
        }
    }

    fn latest_by_name(&self, name: &ObjectName) -> Result<Option<RemoteObject>, StoreError> {
        // One file per name in a folder, it is the latest one
        self.object(name)
    }
}
