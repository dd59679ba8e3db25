use std::fmt;

use chrono::{DateTime, Local, Utc};
use crossbeam_channel::Sender;
use strum_macros::Display;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum StatusLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// Human readable status line, as displayed by a shell
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusLine {
    pub at: DateTime<Utc>,
    pub level: StatusLevel,
    pub message: String,
}

impl fmt::Display for StatusLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}",
            self.at.with_timezone(&Local).format("%H:%M:%S"),
            self.message
        )
    }
}

/// Every status is logged. When a shell listens, it is also sent to it.
#[derive(Debug, Clone, Default)]
pub struct StatusSender {
    sender: Option<Sender<StatusLine>>,
}

impl StatusSender {
    pub fn new(sender: Sender<StatusLine>) -> Self {
        Self {
            sender: Some(sender),
        }
    }

    pub fn info(&self, message: impl Into<String>) {
        self.emit(StatusLevel::Info, message.into())
    }

    pub fn success(&self, message: impl Into<String>) {
        self.emit(StatusLevel::Success, message.into())
    }

    pub fn warning(&self, message: impl Into<String>) {
        self.emit(StatusLevel::Warning, message.into())
    }

    pub fn error(&self, message: impl Into<String>) {
        self.emit(StatusLevel::Error, message.into())
    }

    fn emit(&self, level: StatusLevel, message: String) {
        match level {
            StatusLevel::Info | StatusLevel::Success => log::info!("{}", message),
            StatusLevel::Warning => log::warn!("{}", message),
            StatusLevel::Error => log::error!("{}", message),
        }

        if let Some(sender) = &self.sender {
            let line = StatusLine {
                at: Utc::now(),
                level,
                message,
            };
            // Error means shell is gone, status stay in logs
            if sender.send(line).is_err() {
                log::debug!("Status channel closed");
            }
        }
    }
}
