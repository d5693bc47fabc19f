//! Core of usagewatch: scrape Claude Code's `/usage` screen from a hidden
//! tmux session and keep an observable usage state up to date.

pub mod config;
pub mod error;
pub mod monitor;
pub mod tmux;
pub mod usage;

pub use config::MonitorSettings;
pub use error::MonitorError;
pub use monitor::{UsageMonitor, UsageViewReceiver};
pub use tmux::{ScreenSource, TmuxScreenSource};
