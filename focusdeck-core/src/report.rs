//! User-facing status sink.

use parking_lot::Mutex;
use tracing::{info, warn};

/// Receives messages meant for the user. Implementations must not fail.
pub trait Reporter: Send + Sync {
    fn error(&self, message: &str);
    fn info(&self, message: &str);
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StatusMessage {
    Info(String),
    Error(String),
}

impl StatusMessage {
    pub fn text(&self) -> &str {
        match self {
            StatusMessage::Info(s) | StatusMessage::Error(s) => s,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, StatusMessage::Error(_))
    }
}

/// Keeps the last message for the status bar and counts errors.
#[derive(Debug, Default)]
pub struct StatusLine {
    last: Mutex<Option<StatusMessage>>,
    errors: Mutex<usize>,
}

impl StatusLine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last(&self) -> Option<StatusMessage> {
        self.last.lock().clone()
    }

    pub fn error_count(&self) -> usize {
        *self.errors.lock()
    }

    pub fn clear(&self) {
        *self.last.lock() = None;
    }
}

impl Reporter for StatusLine {
    fn error(&self, message: &str) {
        warn!(text = message, "reported error");
        *self.errors.lock() += 1;
        *self.last.lock() = Some(StatusMessage::Error(message.to_string()));
    }

    fn info(&self, message: &str) {
        info!(text = message, "status");
        *self.last.lock() = Some(StatusMessage::Info(message.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_line_keeps_last_message() {
        let status = StatusLine::new();
        assert!(status.last().is_none());

        status.info("Fetching");
        status.error("Cannot remove the main worktree");
        let last = status.last().unwrap();
        assert!(last.is_error());
        assert_eq!(last.text(), "Cannot remove the main worktree");
        assert_eq!(status.error_count(), 1);

        status.clear();
        assert!(status.last().is_none());
        assert_eq!(status.error_count(), 1);
    }
}
