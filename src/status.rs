//! Progress reporting for an acquisition.
//!
//! The orchestrator is the only writer; any number of observers hold a
//! [`tokio::sync::watch::Receiver`] and either poll [`borrow`](tokio::sync::watch::Receiver::borrow)
//! or await [`changed`](tokio::sync::watch::Receiver::changed).

use std::fmt;
use tokio::sync::watch;

/// Stage of the acquisition workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Status {
    /// No acquisition running, or the last one completed successfully.
    #[default]
    Idle,
    /// Cloning BestiaPop and installing its requirements.
    Installing,
    /// The generator process is running.
    Running,
    /// The last acquisition ended with an error.
    Failed,
}

impl Status {
    pub fn is_idle(self) -> bool {
        self == Status::Idle
    }
}

/// Human readable form, empty when idle.
///
/// ```
/// use bestiapop::Status;
///
/// assert_eq!(Status::Idle.to_string(), "");
/// assert_eq!(Status::Running.to_string(), "Running bestiapop");
/// ```
impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Idle => Ok(()),
            Status::Installing => write!(f, "Installing bestiapop"),
            Status::Running => write!(f, "Running bestiapop"),
            Status::Failed => write!(f, "bestiapop failed"),
        }
    }
}

#[derive(Debug)]
pub(crate) struct StatusReporter {
    sender: watch::Sender<Status>,
}

impl StatusReporter {
    pub(crate) fn new() -> Self {
        let (sender, _) = watch::channel(Status::Idle);
        Self { sender }
    }

    pub(crate) fn subscribe(&self) -> watch::Receiver<Status> {
        self.sender.subscribe()
    }

    pub(crate) fn current(&self) -> Status {
        *self.sender.borrow()
    }

    /// Starts tracking one acquisition. Whatever happens, the guard leaves a terminal
    /// status behind: `Idle` after [`StatusGuard::finish`], `Failed` otherwise.
    pub(crate) fn begin(&self) -> StatusGuard<'_> {
        StatusGuard {
            reporter: self,
            finished: false,
        }
    }

    fn set(&self, status: Status) {
        self.sender.send_replace(status);
    }
}

pub(crate) struct StatusGuard<'a> {
    reporter: &'a StatusReporter,
    finished: bool,
}

impl StatusGuard<'_> {
    pub(crate) fn set(&self, status: Status) {
        self.reporter.set(status);
    }

    pub(crate) fn finish(mut self) {
        self.finished = true;
        self.reporter.set(Status::Idle);
    }
}

impl Drop for StatusGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.reporter.set(Status::Failed);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finish_resets_to_idle() {
        let reporter = StatusReporter::new();
        let observer = reporter.subscribe();
        let guard = reporter.begin();
        guard.set(Status::Running);
        assert_eq!(*observer.borrow(), Status::Running);
        guard.finish();
        assert_eq!(*observer.borrow(), Status::Idle);
    }

    #[test]
    fn test_drop_without_finish_marks_failed() {
        let reporter = StatusReporter::new();
        {
            let guard = reporter.begin();
            guard.set(Status::Installing);
        }
        assert_eq!(reporter.current(), Status::Failed);
        assert!(!reporter.current().is_idle());
    }

    #[test]
    fn test_updates_without_observers() {
        let reporter = StatusReporter::new();
        reporter.begin().set(Status::Running);
        // Guard dropped on the same line.
        assert_eq!(reporter.current(), Status::Failed);
    }

    #[tokio::test]
    async fn test_observer_sees_changes() {
        let reporter = StatusReporter::new();
        let mut observer = reporter.subscribe();
        let guard = reporter.begin();
        guard.set(Status::Running);
        observer.changed().await.unwrap();
        assert_eq!(*observer.borrow_and_update(), Status::Running);
        guard.finish();
        observer.changed().await.unwrap();
        assert_eq!(*observer.borrow_and_update(), Status::Idle);
    }
}
