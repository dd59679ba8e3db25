use strum_macros::Display;

use crate::process::{ProcessEvent, RunningState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum EngineState {
    Idle,
    SyncingPull,
    SyncingPush,
}

/// Monitoring state, owned by the single loop which polls processes and
/// drives the engine. A fresh session considers the game as not running.
#[derive(Debug)]
pub struct SyncSession {
    was_running: bool,
    state: EngineState,
}

impl Default for SyncSession {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncSession {
    pub fn new() -> Self {
        Self {
            was_running: false,
            state: EngineState::Idle,
        }
    }

    /// Produce an event on edges only
    pub fn observe(&mut self, state: RunningState) -> Option<ProcessEvent> {
        let event = match (self.was_running, state.running) {
            (false, true) => Some(ProcessEvent::Started),
            (true, false) => Some(ProcessEvent::Stopped),
            _ => None,
        };
        self.was_running = state.running;
        event
    }

    pub fn was_running(&self) -> bool {
        self.was_running
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == EngineState::Idle
    }

    pub fn enter(&mut self, state: EngineState) {
        log::debug!("Engine state {} -> {}", self.state, state);
        self.state = state;
    }

    pub fn leave(&mut self) {
        self.enter(EngineState::Idle)
    }
}
