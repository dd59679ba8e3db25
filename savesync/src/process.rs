use std::path::PathBuf;

use mockall::automock;
use sysinfo::System;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProcessTableError {
    #[error("Unable to enumerate processes : {0}")]
    Enumeration(String),
}

/// Executable paths of live processes
#[automock]
pub trait ProcessTable {
    fn executables(&mut self) -> Result<Vec<PathBuf>, ProcessTableError>;
}

pub struct SysinfoTable {
    system: System,
}

impl SysinfoTable {
    pub fn new() -> Self {
        Self {
            system: System::new(),
        }
    }
}

impl Default for SysinfoTable {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcessTable for SysinfoTable {
    fn executables(&mut self) -> Result<Vec<PathBuf>, ProcessTableError> {
        self.system.refresh_processes();
        let processes = self.system.processes();
        // At least this process must be visible
        if processes.is_empty() {
            return Err(ProcessTableError::Enumeration(
                "process table is empty".to_string(),
            ));
        }

        Ok(processes
            .values()
            .filter_map(|process| process.exe().map(|exe| exe.to_path_buf()))
            .collect())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunningState {
    pub running: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
pub enum ProcessEvent {
    Started,
    Stopped,
}

/// Case insensitive, partial, match of `fragment` in one of `executables`
pub fn is_running(executables: &[PathBuf], fragment: &str) -> bool {
    let fragment = fragment.to_lowercase();
    executables.iter().any(|executable| {
        executable
            .to_string_lossy()
            .to_lowercase()
            .contains(&fragment)
    })
}

pub struct ProcessMonitor {
    table: Box<dyn ProcessTable + Send>,
    fragment: String,
}

impl ProcessMonitor {
    pub fn new(table: Box<dyn ProcessTable + Send>, fragment: String) -> Self {
        Self { table, fragment }
    }

    /// A failed enumeration tells nothing about the game: it is not "stopped"
    pub fn poll(&mut self) -> Result<RunningState, ProcessTableError> {
        let executables = self.table.executables()?;
        Ok(RunningState {
            running: is_running(&executables, &self.fragment),
        })
    }
}
