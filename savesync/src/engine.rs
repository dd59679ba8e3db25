use std::path::PathBuf;

use chrono::{DateTime, Utc};
use savesync_core::{
    credential::Authenticator,
    status::StatusSender,
    store::{ObjectStore, RemoteObject},
    types::WorldName,
};

use crate::{
    archive::ArchiveCodec,
    context::Context,
    error::SyncError,
    fingerprint::{self, Comparison},
    lock::LockCoordinator,
    pipeline::Pipeline,
    process::ProcessEvent,
    replica::{newest_modification, Replica},
    session::{EngineState, SyncSession},
};

/// Outcome of one engine step, also reported as status line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    NotAuthenticated,
    InSync,
    /// A transfer is already running, event ignored
    Busy,
    Pulled,
    Pushed,
    NothingToPull,
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusReport {
    pub authenticated: bool,
    pub world_name: WorldName,
    pub replica_path: PathBuf,
    pub comparison: Comparison,
    pub local_modified: Option<DateTime<Utc>>,
    pub remote_modified: Option<DateTime<Utc>>,
    pub lock_held: bool,
}

/// Local is ahead only if strictly more recent than remote. Missing local
/// replica is never ahead, missing remote snapshot is always behind.
pub fn is_ahead(local: Option<DateTime<Utc>>, remote: Option<DateTime<Utc>>) -> bool {
    match (local, remote) {
        (None, _) => false,
        (Some(_), None) => true,
        (Some(local), Some(remote)) => local > remote,
    }
}

pub struct Engine {
    context: Context,
    store: Box<dyn ObjectStore + Send>,
    codec: Box<dyn ArchiveCodec + Send>,
    authenticator: Box<dyn Authenticator + Send>,
    status: StatusSender,
}

impl Engine {
    pub fn new(
        context: Context,
        store: Box<dyn ObjectStore + Send>,
        codec: Box<dyn ArchiveCodec + Send>,
        authenticator: Box<dyn Authenticator + Send>,
        status: StatusSender,
    ) -> Self {
        Self {
            context,
            store,
            codec,
            authenticator,
            status,
        }
    }

    pub fn context(&self) -> &Context {
        &self.context
    }

    pub fn status(&self) -> &StatusSender {
        &self.status
    }

    fn pipeline(&self) -> Pipeline {
        Pipeline::new(
            &self.context,
            self.store.as_ref(),
            self.codec.as_ref(),
            &self.status,
        )
    }

    /// Pull on game start, push on game stop, unless saves are already the same
    pub fn handle(&self, session: &mut SyncSession, event: ProcessEvent) -> Decision {
        if !session.is_idle() {
            log::info!("Ignore {} event, engine is {}", event, session.state());
            return Decision::Busy;
        }
        if !self.authenticator.is_authenticated() {
            self.status
                .warning("Not authenticated, world will not be synchronized");
            return Decision::NotAuthenticated;
        }

        match fingerprint::compare(&self.context, self.store.as_ref()) {
            Comparison::Equal(digest) => {
                log::debug!("Local and remote canary digest are {}", digest);
                self.status
                    .info(format!("World '{}' already in sync", self.context.world_name));
                return Decision::InSync;
            }
            Comparison::Different { local, remote } => {
                log::debug!("Local canary digest {} != remote {}", local, remote)
            }
            Comparison::Unavailable(reason) => {
                self.status
                    .info(format!("Unable to compare saves ({}), sync anyway", reason));
            }
        }

        match event {
            ProcessEvent::Started => {
                let result = self.pull(session);
                self.pulled(result)
            }
            ProcessEvent::Stopped => {
                let result = self.push(session);
                self.pushed(result)
            }
        }
    }

    /// Push if local save has been modified while not monitoring
    pub fn reconcile(&self, session: &mut SyncSession) -> Decision {
        if !session.is_idle() {
            return Decision::Busy;
        }
        if !self.authenticator.is_authenticated() {
            self.status
                .warning("Not authenticated, world will not be synchronized");
            return Decision::NotAuthenticated;
        }

        let (local, remote) = match self.timestamps() {
            Ok(timestamps) => timestamps,
            Err(error) => {
                self.status
                    .error(format!("Unable to compare save dates : {}", error));
                return Decision::Failed(error.to_string());
            }
        };

        if is_ahead(local, remote) {
            self.status.info(format!(
                "Local world '{}' is more recent than remote one",
                self.context.world_name
            ));
            let result = self.push(session);
            self.pushed(result)
        } else {
            self.status
                .info(format!("World '{}' is in sync", self.context.world_name));
            Decision::InSync
        }
    }

    /// Local replica newest file and remote snapshot modification dates
    fn timestamps(
        &self,
    ) -> Result<(Option<DateTime<Utc>>, Option<DateTime<Utc>>), SyncError> {
        let local = if self.context.replica_path.is_dir() {
            newest_modification(&self.context.replica_path)?
        } else {
            None
        };

        let snapshot_name = self.context.snapshot_name();
        let remote = match self.store.latest_by_name(&snapshot_name)? {
            Some(snapshot) => Some(snapshot.modified.ok_or_else(|| {
                SyncError::TransferFailed(format!(
                    "Remote snapshot '{}' has no modification date",
                    snapshot_name
                ))
            })?),
            None => None,
        };

        Ok((local, remote))
    }

    pub fn push(&self, session: &mut SyncSession) -> Result<RemoteObject, SyncError> {
        session.enter(EngineState::SyncingPush);
        let result = self.pipeline().push();
        session.leave();
        result
    }

    pub fn pull(&self, session: &mut SyncSession) -> Result<Replica, SyncError> {
        session.enter(EngineState::SyncingPull);
        let result = self.pipeline().pull();
        session.leave();
        result
    }

    fn pushed(&self, result: Result<RemoteObject, SyncError>) -> Decision {
        match result {
            Ok(snapshot) => {
                self.status
                    .success(format!("World uploaded as '{}'", snapshot.name));
                Decision::Pushed
            }
            Err(error) => {
                self.status.error(format!("Upload failed : {}", error));
                Decision::Failed(error.to_string())
            }
        }
    }

    fn pulled(&self, result: Result<Replica, SyncError>) -> Decision {
        match result {
            Ok(replica) => {
                self.status.success(format!(
                    "World '{}' downloaded into {}",
                    replica.world_name(),
                    replica.path().display()
                ));
                Decision::Pulled
            }
            Err(error) if !error.is_fatal() => {
                self.status.info(error.to_string());
                Decision::NothingToPull
            }
            Err(error) => {
                self.status.error(format!("Download failed : {}", error));
                Decision::Failed(error.to_string())
            }
        }
    }

    /// Synchronization state, without any transfer except the remote canary
    pub fn report(&self) -> Result<StatusReport, SyncError> {
        let (local_modified, remote_modified) = self.timestamps()?;
        Ok(StatusReport {
            authenticated: self.authenticator.is_authenticated(),
            world_name: self.context.world_name.clone(),
            replica_path: self.context.replica_path.clone(),
            comparison: fingerprint::compare(&self.context, self.store.as_ref()),
            local_modified,
            remote_modified,
            lock_held: LockCoordinator::new(self.store.as_ref()).is_held()?,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::archive::ZipCodec;
    use crate::tests::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use rstest::*;
    use savesync_core::store::{directory::DirectoryStore, MockObjectStore};
    use savesync_core::utils::md5_file;
    use std::fs;

    fn engine(context: &Context, store: Box<dyn ObjectStore + Send>, authenticated: bool) -> Engine {
        Engine::new(
            context.clone(),
            store,
            Box::new(ZipCodec),
            Box::new(FixedAuthenticator(authenticated)),
            StatusSender::default(),
        )
    }

    fn utc(raw: &str) -> Option<DateTime<Utc>> {
        Some(DateTime::parse_from_rfc3339(raw).unwrap().with_timezone(&Utc))
    }

    #[rstest]
    #[case(utc("2024-01-02T10:00:00Z"), None, true)]
    #[case(utc("2024-01-02T23:00:00Z"), utc("2024-01-03T00:00:00Z"), false)]
    #[case(utc("2024-01-03T00:00:01Z"), utc("2024-01-03T00:00:00Z"), true)]
    #[case(utc("2024-01-03T00:00:00Z"), utc("2024-01-03T00:00:00Z"), false)]
    #[case(utc("2024-01-03T01:00:00+01:00"), utc("2024-01-03T00:00:00Z"), false)]
    #[case(None, None, false)]
    #[case(None, utc("2024-01-03T00:00:00Z"), false)]
    fn test_is_ahead(
        #[case] local: Option<DateTime<Utc>>,
        #[case] remote: Option<DateTime<Utc>>,
        #[case] expected: bool,
    ) {
        assert_eq!(is_ahead(local, remote), expected)
    }

    #[test]
    fn test_reconcile_without_remote_pushes() {
        let tmpdir_ = tmpdir();
        let context = context(&tmpdir_);
        write_files(&context.replica_path, &[("level.dat", "tick 42")]);
        let engine = engine(
            &context,
            Box::new(DirectoryStore::new(tmpdir_.join("remote")).unwrap()),
            true,
        );
        let mut session = SyncSession::new();

        assert_eq!(engine.reconcile(&mut session), Decision::Pushed);
        assert!(tmpdir_.join("remote").join("Survival.zip").is_file());
        assert!(session.is_idle());
    }

    #[test]
    fn test_reconcile_with_more_recent_remote() {
        let tmpdir_ = tmpdir();
        let context = context(&tmpdir_);
        write_files(&context.replica_path, &[("level.dat", "tick 42")]);
        let mut store = MockObjectStore::new();
        store.expect_latest_by_name().times(1).returning(|name| {
            Ok(Some(RemoteObject {
                modified: Some(Utc.with_ymd_and_hms(2099, 1, 3, 0, 0, 0).unwrap()),
                ..remote_object("snapshot-id", &name.0)
            }))
        });
        store.expect_create().never();
        store.expect_download().never();
        let engine = engine(&context, Box::new(store), true);

        assert_eq!(engine.reconcile(&mut SyncSession::new()), Decision::InSync);
    }

    #[test]
    fn test_reconcile_without_local_replica() {
        let tmpdir_ = tmpdir();
        let context = context(&tmpdir_);
        let mut store = MockObjectStore::new();
        store.expect_latest_by_name().returning(|_| Ok(None));
        store.expect_create().never();
        let engine = engine(&context, Box::new(store), true);

        assert_eq!(engine.reconcile(&mut SyncSession::new()), Decision::InSync);
    }

    #[test]
    fn test_reconcile_remote_without_date_fails() {
        let tmpdir_ = tmpdir();
        let context = context(&tmpdir_);
        write_files(&context.replica_path, &[("level.dat", "tick 42")]);
        let mut store = MockObjectStore::new();
        store
            .expect_latest_by_name()
            .returning(|name| Ok(Some(remote_object("snapshot-id", &name.0))));
        store.expect_create().never();
        let engine = engine(&context, Box::new(store), true);

        assert!(matches!(
            engine.reconcile(&mut SyncSession::new()),
            Decision::Failed(_)
        ));
    }

    #[test]
    fn test_not_authenticated_does_nothing() {
        let tmpdir_ = tmpdir();
        let context = context(&tmpdir_);
        let mut store = MockObjectStore::new();
        store.expect_find_by_name().never();
        store.expect_latest_by_name().never();
        let engine = engine(&context, Box::new(store), false);
        let mut session = SyncSession::new();

        assert_eq!(
            engine.handle(&mut session, ProcessEvent::Started),
            Decision::NotAuthenticated
        );
        assert_eq!(engine.reconcile(&mut session), Decision::NotAuthenticated);
    }

    #[test]
    fn test_busy_engine_ignores_events() {
        let tmpdir_ = tmpdir();
        let context = context(&tmpdir_);
        let mut store = MockObjectStore::new();
        store.expect_find_by_name().never();
        let engine = engine(&context, Box::new(store), true);
        let mut session = SyncSession::new();
        session.enter(EngineState::SyncingPush);

        assert_eq!(
            engine.handle(&mut session, ProcessEvent::Started),
            Decision::Busy
        );
        assert_eq!(session.state(), EngineState::SyncingPush);
    }

    #[rstest]
    #[case(ProcessEvent::Started)]
    #[case(ProcessEvent::Stopped)]
    fn test_equal_fingerprints_skip_transfer(#[case] event: ProcessEvent) {
        let tmpdir_ = tmpdir();
        let context = context(&tmpdir_);
        write_files(&context.replica_path, &[("level.dat", "tick 42")]);
        let store = RecordingStore::new(tmpdir_.join("remote"));
        put_object(&store, "Survival.level.dat", b"tick 42");
        put_object(&store, "Survival.zip", b"archive");
        let calls = store.calls();
        calls.lock().unwrap().clear();
        let engine = engine(&context, Box::new(store), true);

        assert_eq!(
            engine.handle(&mut SyncSession::new(), event),
            Decision::InSync
        );
        let calls = calls.lock().unwrap().clone();
        assert!(!calls.iter().any(|call| call.starts_with("create")));
        assert!(!calls.iter().any(|call| call.starts_with("delete")));
        assert!(!calls.iter().any(|call| call == "download Survival.zip"));
    }

    #[test]
    fn test_started_with_different_canary_pulls() {
        let tmpdir_ = tmpdir();
        let remote = tmpdir_.join("remote");
        let other_machine = context(&tmpdir_.join("other"));
        let this_machine = context(&tmpdir_.join("this"));
        write_files(
            &other_machine.replica_path,
            &[("level.dat", "tick 99"), ("region/r.0.0.mca", "new blocks")],
        );
        write_files(
            &this_machine.replica_path,
            &[("level.dat", "tick 42"), ("region/r.0.0.mca", "old blocks")],
        );
        engine(
            &other_machine,
            Box::new(DirectoryStore::new(remote.clone()).unwrap()),
            true,
        )
        .push(&mut SyncSession::new())
        .unwrap();
        let engine = engine(
            &this_machine,
            Box::new(DirectoryStore::new(remote.clone()).unwrap()),
            true,
        );
        let mut session = SyncSession::new();

        assert_eq!(
            engine.handle(&mut session, ProcessEvent::Started),
            Decision::Pulled
        );
        assert!(session.is_idle());
        assert_eq!(
            md5_file(&this_machine.local_canary_path()).unwrap(),
            md5_file(&remote.join("Survival.level.dat")).unwrap()
        );
        assert_eq!(
            fs::read_to_string(this_machine.replica_path.join("region/r.0.0.mca")).unwrap(),
            "new blocks"
        );
    }

    #[test]
    fn test_push_without_canary_forces_next_pull() {
        let tmpdir_ = tmpdir();
        let remote = tmpdir_.join("remote");
        let machine_a = context(&tmpdir_.join("a"));
        let machine_b = context(&tmpdir_.join("b"));
        write_files(
            &machine_a.replica_path,
            &[("level.dat", "tick 1"), ("region/r.0.0.mca", "old")],
        );
        let engine_a = engine(
            &machine_a,
            Box::new(DirectoryStore::new(remote.clone()).unwrap()),
            true,
        );
        let engine_b = engine(
            &machine_b,
            Box::new(DirectoryStore::new(remote.clone()).unwrap()),
            true,
        );
        engine_a.push(&mut SyncSession::new()).unwrap();
        engine_b.pull(&mut SyncSession::new()).unwrap();
        fs::remove_file(machine_a.local_canary_path()).unwrap();
        fs::write(machine_a.replica_path.join("region/r.0.0.mca"), "new").unwrap();
        engine_a.push(&mut SyncSession::new()).unwrap();

        assert_eq!(
            engine_b.handle(&mut SyncSession::new(), ProcessEvent::Started),
            Decision::Pulled
        );
        assert_eq!(
            fs::read_to_string(machine_b.replica_path.join("region/r.0.0.mca")).unwrap(),
            "new"
        );
    }

    #[test]
    fn test_stopped_with_different_canary_pushes() {
        let tmpdir_ = tmpdir();
        let context = context(&tmpdir_);
        write_files(&context.replica_path, &[("level.dat", "tick 43")]);
        let store = DirectoryStore::new(tmpdir_.join("remote")).unwrap();
        put_object(&store, "Survival.level.dat", b"tick 42");
        let engine = engine(&context, Box::new(store), true);

        assert_eq!(
            engine.handle(&mut SyncSession::new(), ProcessEvent::Stopped),
            Decision::Pushed
        );
        assert_eq!(
            fs::read_to_string(tmpdir_.join("remote/Survival.level.dat")).unwrap(),
            "tick 43"
        );
    }

    #[test]
    fn test_started_without_remote_snapshot() {
        let tmpdir_ = tmpdir();
        let context = context(&tmpdir_);
        let engine = engine(
            &context,
            Box::new(DirectoryStore::new(tmpdir_.join("remote")).unwrap()),
            true,
        );

        assert_eq!(
            engine.handle(&mut SyncSession::new(), ProcessEvent::Started),
            Decision::NothingToPull
        );
    }

    #[test]
    fn test_failed_push_returns_to_idle() {
        let tmpdir_ = tmpdir();
        let context = context(&tmpdir_);
        let store = DirectoryStore::new(tmpdir_.join("remote")).unwrap();
        put_object(&store, "savesync.lock", b"other machine");
        let engine = engine(&context, Box::new(store), true);
        let mut session = SyncSession::new();

        assert!(matches!(
            engine.handle(&mut session, ProcessEvent::Stopped),
            Decision::Failed(_)
        ));
        assert!(session.is_idle());
    }

    #[test]
    fn test_report() {
        let tmpdir_ = tmpdir();
        let context = context(&tmpdir_);
        write_files(&context.replica_path, &[("level.dat", "tick 42")]);
        let engine = engine(
            &context,
            Box::new(DirectoryStore::new(tmpdir_.join("remote")).unwrap()),
            true,
        );
        engine.push(&mut SyncSession::new()).unwrap();

        let report = engine.report().unwrap();

        assert!(report.authenticated);
        assert!(report.comparison.is_equal());
        assert!(report.local_modified.is_some());
        assert!(report.remote_modified.is_some());
        assert!(!report.lock_held);
    }
}
