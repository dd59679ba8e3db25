use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use crate::{
    engine::{Decision, Engine},
    process::ProcessMonitor,
    session::SyncSession,
};

const STOP_CHECK_INTERVAL: Duration = Duration::from_millis(250);

/// Poll loop: process edges are given to the engine, which runs the transfer
/// before next poll. Edges happening during a transfer are seen at next poll.
pub struct Monitor {
    process: ProcessMonitor,
    engine: Engine,
    interval: Duration,
    stop_signal: Arc<AtomicBool>,
}

impl Monitor {
    pub fn new(process: ProcessMonitor, engine: Engine) -> Self {
        let interval = engine.context().poll_interval;
        Self {
            process,
            engine,
            interval,
            stop_signal: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn stop_signal(&self) -> Arc<AtomicBool> {
        self.stop_signal.clone()
    }

    pub fn tick(&mut self, session: &mut SyncSession) -> Option<Decision> {
        let state = match self.process.poll() {
            Ok(state) => state,
            Err(error) => {
                log::error!("Unable to poll processes, skip this tick : {}", error);
                return None;
            }
        };
        match session.observe(state) {
            Some(event) => {
                self.engine.status().info(format!(
                    "Game {}",
                    event.to_string().to_lowercase()
                ));
                Some(self.engine.handle(session, event))
            }
            None => {
                log::debug!("No process change (running: {})", state.running);
                None
            }
        }
    }

    /// Reconcile once, then poll until stop signal
    pub fn run(&mut self, mut session: SyncSession) -> SyncSession {
        log::info!(
            "Start monitoring '{}' for world '{}'",
            self.engine.context().launcher_path,
            self.engine.context().world_name
        );
        self.engine.reconcile(&mut session);

        while !self.stopped() {
            self.tick(&mut session);
            self.sleep();
        }

        log::info!("Finished monitoring (on stop signal)");
        session
    }

    pub fn start(mut self, session: SyncSession) -> MonitorHandle {
        let stop_signal = self.stop_signal();
        let handle = thread::spawn(move || self.run(session));
        MonitorHandle {
            stop_signal,
            handle,
        }
    }

    fn stopped(&self) -> bool {
        self.stop_signal.load(Ordering::Relaxed)
    }

    fn sleep(&self) {
        let started = Instant::now();
        while !self.stopped() {
            let elapsed = started.elapsed();
            if elapsed >= self.interval {
                break;
            }
            thread::sleep(STOP_CHECK_INTERVAL.min(self.interval - elapsed));
        }
    }
}

pub struct MonitorHandle {
    stop_signal: Arc<AtomicBool>,
    handle: JoinHandle<SyncSession>,
}

impl MonitorHandle {
    pub fn stop_signal(&self) -> Arc<AtomicBool> {
        self.stop_signal.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Ask the loop to stop, and wait for it (a running transfer is finished first)
    pub fn stop(self) -> thread::Result<SyncSession> {
        self.stop_signal.store(true, Ordering::Relaxed);
        self.join()
    }

    pub fn join(self) -> thread::Result<SyncSession> {
        self.handle.join()
    }
}
