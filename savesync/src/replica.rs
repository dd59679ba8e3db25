use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use savesync_core::{types::WorldName, utils::last_modified};
use walkdir::WalkDir;

/// Local save directory, as observed now
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replica {
    path: PathBuf,
    world_name: WorldName,
    last_modified: Option<DateTime<Utc>>,
}

impl Replica {
    pub fn scan(path: &Path, world_name: WorldName) -> Result<Self> {
        let last_modified = newest_modification(path)
            .context(format!("Scan replica {}", path.display()))?;
        Ok(Self {
            path: path.to_path_buf(),
            world_name,
            last_modified,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn world_name(&self) -> &WorldName {
        &self.world_name
    }

    /// Most recent modification over all contained files, `None` when no file
    pub fn last_modified(&self) -> Option<DateTime<Utc>> {
        self.last_modified
    }
}

pub fn newest_modification(path: &Path) -> Result<Option<DateTime<Utc>>> {
    let mut newest: Option<DateTime<Utc>> = None;

    for entry in WalkDir::new(path) {
        let entry = entry.context(format!("Read disk entry in {}", path.display()))?;
        // Directories modification time change on children creation only
        if !entry.file_type().is_file() {
            continue;
        }
        let modified = last_modified(entry.path())
            .context(format!("Get modification time of {}", entry.path().display()))?;
        if newest.map_or(true, |newest| modified > newest) {
            newest = Some(modified);
        }
    }

    Ok(newest)
}
