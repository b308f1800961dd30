use std::sync::{Arc, Mutex};

use tracing::{error, info, warn};

/// Severity of a user-facing notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Info,
    /// Something went wrong but the session continues.
    Advisory,
    /// The session cannot continue.
    Destructive,
}

/// A toast-style message for the learner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub title: String,
    pub message: String,
}

impl Notice {
    #[must_use]
    pub fn info(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(NoticeKind::Info, title, message)
    }

    #[must_use]
    pub fn advisory(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(NoticeKind::Advisory, title, message)
    }

    #[must_use]
    pub fn destructive(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(NoticeKind::Destructive, title, message)
    }

    fn new(kind: NoticeKind, title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind,
            title: title.into(),
            message: message.into(),
        }
    }
}

/// Sink for learner-facing notices.
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// Writes notices to the log; the default for headless front ends.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notice: Notice) {
        match notice.kind {
            NoticeKind::Info => info!(title = %notice.title, "{}", notice.message),
            NoticeKind::Advisory => warn!(title = %notice.title, "{}", notice.message),
            NoticeKind::Destructive => error!(title = %notice.title, "{}", notice.message),
        }
    }
}

/// Keeps every notice in memory for later inspection.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    notices: Arc<Mutex<Vec<Notice>>>,
}

impl RecordingNotifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().map(|n| n.clone()).unwrap_or_default()
    }

    #[must_use]
    pub fn count(&self, kind: NoticeKind) -> usize {
        self.notices().iter().filter(|n| n.kind == kind).count()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        if let Ok(mut notices) = self.notices.lock() {
            notices.push(notice);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_notifier_counts_by_kind() {
        let notifier = RecordingNotifier::new();
        notifier.notify(Notice::info("Lesson completed", "Nice work"));
        notifier.notify(Notice::advisory("Progress not saved", "offline"));
        notifier.notify(Notice::advisory("Progress not saved", "offline"));
        assert_eq!(notifier.count(NoticeKind::Info), 1);
        assert_eq!(notifier.count(NoticeKind::Advisory), 2);
        assert_eq!(notifier.count(NoticeKind::Destructive), 0);
    }
}
