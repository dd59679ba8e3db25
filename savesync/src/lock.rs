//! Remote push lock.
//!
//! The lock is a marker object with a well known name. Acquisition is a lookup
//! followed by a create, which is NOT atomic: two machines can both see no marker
//! and both create one. The store offers no "create if absent", so this lock only
//! deters concurrent pushes, it does not prevent them.
use std::io::Write;

use chrono::{SecondsFormat, Utc};
use savesync_core::{
    store::{ObjectStore, RemoteObject, StoreError},
    types::{ObjectId, ObjectName},
    LOCK_OBJECT_NAME,
};
use uuid::Uuid;

/// Identifier of the marker created by this machine. Only its owner deletes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockToken(pub ObjectId);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Acquisition {
    Acquired(LockToken),
    /// A marker exists, maybe from another machine, maybe a leftover
    AlreadyHeld(RemoteObject),
}

pub struct LockCoordinator<'a> {
    store: &'a dyn ObjectStore,
    name: ObjectName,
}

impl<'a> LockCoordinator<'a> {
    pub fn new(store: &'a dyn ObjectStore) -> Self {
        Self {
            store,
            name: ObjectName::from(LOCK_OBJECT_NAME),
        }
    }

    pub fn name(&self) -> &ObjectName {
        &self.name
    }

    pub fn acquire(&self) -> Result<Acquisition, StoreError> {
        if let Some(existing) = self.store.find_by_name(&self.name)? {
            log::info!("Lock '{}' already present ({})", self.name, existing.id);
            return Ok(Acquisition::AlreadyHeld(existing));
        }

        // Window between lookup and create is where two machines can race
        let marker = self.marker()?;
        let created = self.store.create(&self.name, marker.path())?;
        log::info!("Lock '{}' acquired ({})", self.name, created.id);
        Ok(Acquisition::Acquired(LockToken(created.id)))
    }

    pub fn release(&self, token: LockToken) -> Result<(), StoreError> {
        self.store.delete(&token.0)?;
        log::info!("Lock '{}' released ({})", self.name, token.0);
        Ok(())
    }

    pub fn is_held(&self) -> Result<bool, StoreError> {
        Ok(self.store.find_by_name(&self.name)?.is_some())
    }

    /// Marker content is informative only: who and when
    fn marker(&self) -> Result<tempfile::NamedTempFile, StoreError> {
        let file_error =
            |error: std::io::Error| StoreError::FileError("lock marker".into(), error.to_string());
        let mut marker = tempfile::NamedTempFile::new().map_err(file_error)?;
        write!(
            marker,
            "host={}\nacquired={}\nid={}\n",
            whoami::hostname(),
            Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            Uuid::new_v4(),
        )
        .map_err(file_error)?;
        marker.flush().map_err(file_error)?;
        Ok(marker)
    }
}
