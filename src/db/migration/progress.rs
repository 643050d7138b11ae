use std::fmt;
use std::sync::Mutex;

/// Messages emitted while a migration runs.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MigrationMessage {
    /// A progress line, e.g. "updating database version: 1 -> 2".
    Progress { message: String },
    /// An error occurred during migration.
    Error { message: String },
    /// The run finished and the database is current.
    Complete,
    /// The run stopped on a fatal error.
    Failed { message: String },
}

impl fmt::Display for MigrationMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MigrationMessage::Progress { message } => write!(f, "{}", message),
            MigrationMessage::Error { message } => write!(f, "ERROR: {}", message),
            MigrationMessage::Complete => write!(f, "migration complete"),
            MigrationMessage::Failed { message } => write!(f, "FATAL: {}", message),
        }
    }
}

/// Collects migration messages and optionally echoes them to the console.
///
/// The history is kept so callers can inspect exactly which steps ran.
#[derive(Debug, Default)]
pub struct MigrationProgress {
    console: bool,
    history: Mutex<Vec<MigrationMessage>>,
}

impl MigrationProgress {
    /// Echo every message to stdout/stderr as it is recorded.
    pub fn console() -> Self {
        Self {
            console: true,
            history: Mutex::new(Vec::new()),
        }
    }

    pub fn silent() -> Self {
        Self::default()
    }

    pub fn send(&self, msg: &str) {
        self.record(MigrationMessage::Progress {
            message: msg.to_string(),
        });
    }

    pub fn send_error(&self, msg: &str) {
        self.record(MigrationMessage::Error {
            message: msg.to_string(),
        });
    }

    pub fn send_complete(&self) {
        self.record(MigrationMessage::Complete);
    }

    pub fn send_failed(&self, msg: &str) {
        self.record(MigrationMessage::Failed {
            message: msg.to_string(),
        });
    }

    /// Everything recorded so far, oldest first.
    pub fn history(&self) -> Vec<MigrationMessage> {
        match self.history.lock() {
            Ok(history) => history.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn record(&self, msg: MigrationMessage) {
        if self.console {
            match msg {
                MigrationMessage::Error { .. } | MigrationMessage::Failed { .. } => {
                    eprintln!("{}", msg)
                }
                _ => println!("{}", msg),
            }
        }
        match self.history.lock() {
            Ok(mut history) => history.push(msg),
            Err(poisoned) => poisoned.into_inner().push(msg),
        }
    }
}
