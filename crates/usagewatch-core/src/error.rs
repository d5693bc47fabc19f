//! Error type for monitor lifecycle operations.

use thiserror::Error;

/// Errors returned by [`UsageMonitor`](crate::monitor::UsageMonitor) lifecycle calls.
///
/// Capture failures never surface here; they are folded into
/// [`UsageState`](crate::usage::UsageState).
#[derive(Debug, Error)]
pub enum MonitorError {
    /// The screen source cannot run at all (e.g. tmux is not installed)
    #[error("{message}")]
    ScreenSourceUnavailable { message: String },

    /// The loops are already running; use `refresh()` to restart them
    #[error("monitor already started")]
    AlreadyStarted,

    /// `stop()` was called; the monitor cannot be restarted
    #[error("monitor stopped")]
    Stopped,
}
