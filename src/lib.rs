//! usagewatch: Claude Code usage limits on the command line and in status bars.

pub mod config;
pub mod format;
pub mod report;
