use std::path::Path;

use savesync_core::{
    config::{ConfigStore, SyncConfig},
    credential::{Authenticator, CredentialStore},
    status::StatusSender,
    store::{self, RemoteObject},
};

use crate::{
    archive::ZipCodec,
    context::Context,
    engine::{Engine, StatusReport},
    error::SyncError,
    monitor::{Monitor, MonitorHandle},
    process::{ProcessMonitor, SysinfoTable},
    replica::Replica,
    session::SyncSession,
};

/// Entry points used by a shell (the command line, or any other front)
pub struct App {
    config_store: ConfigStore,
    credentials: CredentialStore,
    status: StatusSender,
}

impl App {
    pub fn new(
        config_store: ConfigStore,
        credentials: CredentialStore,
        status: StatusSender,
    ) -> Self {
        Self {
            config_store,
            credentials,
            status,
        }
    }

    pub fn from_env(status: StatusSender) -> Result<Self, SyncError> {
        Ok(Self::new(
            ConfigStore::from_env()?,
            CredentialStore::from_env()?,
            status,
        ))
    }

    pub fn check_authenticated(&self) -> bool {
        self.credentials.is_authenticated()
    }

    pub fn login(&self, token_file: &Path) -> Result<(), SyncError> {
        self.credentials.import(token_file)?;
        self.status.success(format!(
            "Authentication saved in {}",
            self.credentials.path().display()
        ));
        Ok(())
    }

    pub fn load_config(&self) -> Result<SyncConfig, SyncError> {
        Ok(self.config_store.load()?)
    }

    pub fn save_config(&self, config: &SyncConfig) -> Result<(), SyncError> {
        self.config_store.save(config)?;
        self.status.success(format!(
            "Configuration saved in {}",
            self.config_store.path().display()
        ));
        Ok(())
    }

    pub fn engine(&self, config: &SyncConfig) -> Result<Engine, SyncError> {
        Ok(Engine::new(
            Context::from_config(config)?,
            store::from_config(&config.store, &self.credentials)?,
            Box::new(ZipCodec),
            Box::new(self.credentials.clone()),
            self.status.clone(),
        ))
    }

    /// `None` when there is no configuration yet: nothing to monitor
    pub fn start_monitor(&self) -> Result<Option<MonitorHandle>, SyncError> {
        let config = match self.load_config() {
            Ok(config) => config,
            Err(SyncError::ConfigMissing) => {
                self.status
                    .warning("No configuration yet, monitoring not started");
                return Ok(None);
            }
            Err(error) => {
                self.status
                    .error(format!("Monitoring not started : {}", error));
                return Err(error);
            }
        };

        let engine = self.engine(&config)?;
        let process = ProcessMonitor::new(
            Box::new(SysinfoTable::new()),
            config.launcher_path.clone(),
        );
        Ok(Some(
            Monitor::new(process, engine).start(SyncSession::new()),
        ))
    }

    fn authenticated_engine(&self) -> Result<Engine, SyncError> {
        if !self.check_authenticated() {
            return Err(SyncError::NotAuthenticated);
        }
        self.engine(&self.load_config()?)
    }

    pub fn push_now(&self) -> Result<RemoteObject, SyncError> {
        let snapshot = self
            .authenticated_engine()?
            .push(&mut SyncSession::new())?;
        self.status
            .success(format!("World uploaded as '{}'", snapshot.name));
        Ok(snapshot)
    }

    pub fn pull_now(&self) -> Result<Replica, SyncError> {
        let replica = self
            .authenticated_engine()?
            .pull(&mut SyncSession::new())?;
        self.status.success(format!(
            "World '{}' downloaded into {}",
            replica.world_name(),
            replica.path().display()
        ));
        Ok(replica)
    }

    pub fn report(&self) -> Result<StatusReport, SyncError> {
        self.engine(&self.load_config()?)?.report()
    }
}
