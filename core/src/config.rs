use std::{
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

use chrono::{SecondsFormat, Utc};
use ini::Ini;
use strum_macros::{Display, EnumString};
use thiserror::Error;

use crate::{types::WorldName, DEFAULT_CANARY_FILE, DEFAULT_POLL_INTERVAL};

const SYNC_SECTION: &str = "sync";
const STORE_SECTION: &str = "store";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not created yet at '{0}', create a new one first")]
    Missing(PathBuf),
    #[error("Config file is corrupted, please create a new one : '{0}'")]
    Corrupt(String),
    #[error("Unable to determine user home folder")]
    UnableToFindHomeUser,
    #[error("Unable to write config file '{0}' : '{1}'")]
    WriteError(PathBuf, String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum StoreKind {
    Drive,
    Directory,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub kind: StoreKind,
    /// Drive parent folder id, or shared folder path for directory stores
    pub folder: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            kind: StoreKind::Drive,
            folder: None,
            client_id: None,
            client_secret: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    pub launcher_path: String,
    pub replica_root: PathBuf,
    pub world_name: WorldName,
    pub canary_file: PathBuf,
    pub poll_interval: Duration,
    pub store: StoreConfig,
}

impl SyncConfig {
    pub fn new(launcher_path: String, replica_root: PathBuf, world_name: WorldName) -> Self {
        Self {
            launcher_path,
            replica_root,
            world_name,
            canary_file: PathBuf::from(DEFAULT_CANARY_FILE),
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL),
            store: StoreConfig::default(),
        }
    }

    /// Relative replica roots are relative to the user home folder.
    pub fn replica_root_in(&self, home: &Path) -> PathBuf {
        if self.replica_root.is_absolute() {
            self.replica_root.clone()
        } else {
            home.join(&self.replica_root)
        }
    }

    pub fn replica_path_in(&self, home: &Path) -> PathBuf {
        self.replica_root_in(home).join(&self.world_name.0)
    }

    pub fn replica_path(&self) -> Result<PathBuf, ConfigError> {
        let home = dirs::home_dir().ok_or(ConfigError::UnableToFindHomeUser)?;
        Ok(self.replica_path_in(&home))
    }

    pub fn from_ini(config_ini: &Ini) -> Result<Self, ConfigError> {
        let sync = config_ini
            .section(Some(SYNC_SECTION))
            .ok_or(ConfigError::Corrupt(format!(
                "Missing \"{}\" section in config",
                SYNC_SECTION
            )))?;
        let required = |key: &str| -> Result<String, ConfigError> {
            match sync.get(key).map(|value| value.trim()) {
                Some(value) if !value.is_empty() => Ok(value.to_string()),
                _ => Err(ConfigError::Corrupt(format!(
                    "Unable to read {} config from {} section",
                    key, SYNC_SECTION
                ))),
            }
        };

        let launcher_path = required("launcher_path")?;
        let replica_root = PathBuf::from(required("replica_root")?);
        let world_name = WorldName(required("world_name")?);
        if !world_name.is_valid() {
            return Err(ConfigError::Corrupt(format!(
                "World name '{}' is not a folder name",
                world_name
            )));
        }
        let canary_file = PathBuf::from(sync.get("canary_file").unwrap_or(DEFAULT_CANARY_FILE));
        if canary_file.is_absolute() {
            return Err(ConfigError::Corrupt(format!(
                "Canary file '{}' must be relative to the world folder",
                canary_file.display()
            )));
        }
        let poll_interval = Duration::from_secs(
            sync.get("poll_interval")
                .unwrap_or(&DEFAULT_POLL_INTERVAL.to_string())
                .parse::<u64>()
                .map_err(|_| {
                    ConfigError::Corrupt(format!(
                        "Unable to read poll_interval config from {} section",
                        SYNC_SECTION
                    ))
                })?,
        );
        if poll_interval.is_zero() {
            return Err(ConfigError::Corrupt(
                "poll_interval must be greater than zero".to_string(),
            ));
        }

        let store = match config_ini.section(Some(STORE_SECTION)) {
            Some(section) => {
                let kind = match section.get("kind") {
                    Some(raw) => StoreKind::from_str(raw.trim()).map_err(|_| {
                        ConfigError::Corrupt(format!("Unknown store kind '{}'", raw))
                    })?,
                    None => StoreKind::Drive,
                };
                let optional = |key: &str| {
                    section
                        .get(key)
                        .map(|value| value.trim().to_string())
                        .filter(|value| !value.is_empty())
                };
                let folder = optional("folder");
                if kind == StoreKind::Directory && folder.is_none() {
                    return Err(ConfigError::Corrupt(
                        "A directory store requires a folder".to_string(),
                    ));
                }
                StoreConfig {
                    kind,
                    folder,
                    client_id: optional("client_id"),
                    client_secret: optional("client_secret"),
                }
            }
            None => StoreConfig::default(),
        };

        Ok(Self {
            launcher_path,
            replica_root,
            world_name,
            canary_file,
            poll_interval,
            store,
        })
    }

    pub fn to_ini(&self) -> Ini {
        let mut config_ini = Ini::new();
        config_ini
            .with_section(Some(SYNC_SECTION))
            .set("launcher_path", self.launcher_path.clone())
            .set("replica_root", self.replica_root.display().to_string())
            .set("world_name", self.world_name.0.clone())
            .set("canary_file", self.canary_file.display().to_string())
            .set("poll_interval", self.poll_interval.as_secs().to_string())
            .set(
                "last_updated",
                Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            );

        config_ini
            .with_section(Some(STORE_SECTION))
            .set("kind", self.store.kind.to_string());
        for (key, value) in [
            ("folder", &self.store.folder),
            ("client_id", &self.store.client_id),
            ("client_secret", &self.store.client_secret),
        ] {
            if let Some(value) = value {
                config_ini
                    .with_section(Some(STORE_SECTION))
                    .set(key, value.clone());
            }
        }

        config_ini
    }
}

/// Local persistence of the [`SyncConfig`]
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        let user_home_folder_path = dirs::home_dir().ok_or(ConfigError::UnableToFindHomeUser)?;
        let config_file_path = if cfg!(target_os = "windows") {
            user_home_folder_path
                .join("AppData")
                .join("Local")
                .join("savesync.conf")
        } else {
            user_home_folder_path.join(".savesync.conf")
        };
        Ok(Self::new(config_file_path))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<SyncConfig, ConfigError> {
        if !self.path.exists() {
            return Err(ConfigError::Missing(self.path.clone()));
        }

        let config_ini = Ini::load_from_file(&self.path).map_err(|error| {
            ConfigError::Corrupt(format!(
                "Error when loading config file at '{}' : {}",
                self.path.display(),
                error
            ))
        })?;
        SyncConfig::from_ini(&config_ini)
    }

    pub fn save(&self, config: &SyncConfig) -> Result<(), ConfigError> {
        log::info!("Save config into '{}'", self.path.display());
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|error| ConfigError::WriteError(self.path.clone(), error.to_string()))?;
        }
        config
            .to_ini()
            .write_to_file(&self.path)
            .map_err(|error| ConfigError::WriteError(self.path.clone(), error.to_string()))
    }
}
