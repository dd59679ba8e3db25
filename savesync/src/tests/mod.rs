use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use savesync_core::credential::Authenticator;
use savesync_core::store::{directory::DirectoryStore, ObjectStore, RemoteObject, StoreError};
use savesync_core::types::{ObjectId, ObjectName, WorldName};
use testdir::testdir;
use uuid::Uuid;
use walkdir::WalkDir;

use crate::context::Context;

pub fn tmpdir() -> PathBuf {
    let path = testdir!().join(PathBuf::from(Uuid::new_v4().to_string()));
    fs::create_dir_all(&path).unwrap();
    path
}

pub fn write_files(root: &Path, files: &[(&str, &str)]) {
    for (relative_path, content) in files {
        let path = root.join(relative_path);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }
}

/// Relative paths (files and folders) found under `root`, sorted
pub fn disk_files(root: &Path) -> Vec<String> {
    let mut files: Vec<String> = WalkDir::new(root)
        .min_depth(1)
        .into_iter()
        .map(|entry| {
            entry
                .unwrap()
                .path()
                .strip_prefix(root)
                .unwrap()
                .to_string_lossy()
                .replace('\\', "/")
        })
        .collect();
    files.sort();
    files
}

/// Relative file paths with their bytes, sorted
pub fn disk_contents(root: &Path) -> Vec<(String, Vec<u8>)> {
    disk_files(root)
        .into_iter()
        .filter(|relative_path| root.join(relative_path).is_file())
        .map(|relative_path| {
            let content = fs::read(root.join(&relative_path)).unwrap();
            (relative_path, content)
        })
        .collect()
}

/// Context of "Survival" world in `<tmpdir>/saves`
pub fn context(tmpdir: &Path) -> Context {
    Context::new(
        "minecraft-launcher".to_string(),
        &tmpdir.join("saves"),
        WorldName("Survival".to_string()),
        PathBuf::from("level.dat"),
        Duration::from_millis(10),
    )
}

pub fn remote_object(id: &str, name: &str) -> RemoteObject {
    RemoteObject {
        id: ObjectId(id.to_string()),
        name: ObjectName::from(name),
        modified: None,
    }
}

/// Write an object in `store` with given content
pub fn put_object(store: &dyn ObjectStore, name: &str, content: &[u8]) -> RemoteObject {
    let source = tmpdir().join(name);
    fs::write(&source, content).unwrap();
    store.create(&ObjectName::from(name), &source).unwrap()
}

pub struct FixedAuthenticator(pub bool);

impl Authenticator for FixedAuthenticator {
    fn is_authenticated(&self) -> bool {
        self.0
    }
}

/// `DirectoryStore` which records calls as "<operation> <name or id>"
pub struct RecordingStore {
    inner: DirectoryStore,
    calls: Arc<Mutex<Vec<String>>>,
    fail_deletes: bool,
}

impl RecordingStore {
    pub fn new(root: PathBuf) -> Self {
        Self {
            inner: DirectoryStore::new(root).unwrap(),
            calls: Arc::new(Mutex::new(vec![])),
            fail_deletes: false,
        }
    }

    pub fn failing_deletes(mut self) -> Self {
        self.fail_deletes = true;
        self
    }

    pub fn calls(&self) -> Arc<Mutex<Vec<String>>> {
        self.calls.clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call)
    }
}

impl ObjectStore for RecordingStore {
    fn create(&self, name: &ObjectName, path: &Path) -> Result<RemoteObject, StoreError> {
        self.record(format!("create {}", name));
        self.inner.create(name, path)
    }

    fn find_by_name(&self, name: &ObjectName) -> Result<Option<RemoteObject>, StoreError> {
        self.record(format!("find {}", name));
        self.inner.find_by_name(name)
    }

    fn download(&self, id: &ObjectId, destination: &Path) -> Result<(), StoreError> {
        self.record(format!("download {}", id));
        self.inner.download(id, destination)
    }

    fn delete(&self, id: &ObjectId) -> Result<(), StoreError> {
        self.record(format!("delete {}", id));
        if self.fail_deletes {
            return Err(StoreError::ConnectionError);
        }
        self.inner.delete(id)
    }

    fn latest_by_name(&self, name: &ObjectName) -> Result<Option<RemoteObject>, StoreError> {
        self.record(format!("latest {}", name));
        self.inner.latest_by_name(name)
    }
}

pub fn count_calls(calls: &Arc<Mutex<Vec<String>>>, call: &str) -> usize {
    calls
        .lock()
        .unwrap()
        .iter()
        .filter(|recorded| recorded.as_str() == call)
        .count()
}
