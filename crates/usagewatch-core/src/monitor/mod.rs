//! Polling state machine that keeps a [`UsageView`](crate::usage::UsageView)
//! current from periodic screen captures.

mod machine;
pub mod state;

pub use machine::{UsageMonitor, UsageViewReceiver};
pub use state::{derive_display, last_updated_label, CaptureOutcome, MonitorState};

/// Loading message before the first capture and while a session is created
pub const MSG_STARTING: &str = "Starting Claude\u{2026}";
/// Loading message while `refresh()` restarts the session
pub const MSG_RESTARTING: &str = "Restarting Claude\u{2026}";
/// Loading message while captures do not parse yet
pub const MSG_WAITING: &str = "Waiting for usage data\u{2026}";
/// Error message once the loading timeout has elapsed
pub const MSG_UNAVAILABLE: &str = "Usage data not available\u{2026}";
