//! Monitor settings: timings and the tmux session the usage screen lives in.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Settings for the usage monitor (`[monitor]` table of the config file)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorSettings {
    /// tmux session that hosts the Claude Code instance
    #[serde(default = "default_session_name")]
    pub session_name: String,

    /// Command started inside the session
    #[serde(default = "default_command")]
    pub command: String,

    /// Width of the detached pane
    #[serde(default = "default_pane_width")]
    pub pane_width: u16,

    /// Height of the detached pane
    #[serde(default = "default_pane_height")]
    pub pane_height: u16,

    /// Seconds between screen captures
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Settle delay between the refresh keystrokes and the capture (ms)
    #[serde(default = "default_refresh_delay_ms")]
    pub refresh_delay_ms: u64,

    /// Delay between the "Left" and "Right" refresh keys (ms)
    #[serde(default = "default_key_delay_ms")]
    pub key_delay_ms: u64,

    /// Seconds without a usable capture before reporting an error
    #[serde(default = "default_loading_timeout_secs")]
    pub loading_timeout_secs: u64,

    /// How long to wait for Claude Code to come up in a new session (seconds)
    #[serde(default = "default_ready_timeout_secs")]
    pub ready_timeout_secs: u64,

    /// Poll interval while waiting for Claude Code to come up (ms)
    #[serde(default = "default_ready_poll_ms")]
    pub ready_poll_ms: u64,

    /// Pause between killing the session and restarting the loops (ms)
    #[serde(default = "default_restart_delay_ms")]
    pub restart_delay_ms: u64,

    /// Countdown recomputation period (ms)
    #[serde(default = "default_countdown_interval_ms")]
    pub countdown_interval_ms: u64,
}

fn default_session_name() -> String {
    "claude-usage-widget".to_string()
}

fn default_command() -> String {
    "claude".to_string()
}

fn default_pane_width() -> u16 {
    120
}

fn default_pane_height() -> u16 {
    40
}

fn default_poll_interval_secs() -> u64 {
    10
}

fn default_refresh_delay_ms() -> u64 {
    2000
}

fn default_key_delay_ms() -> u64 {
    300
}

fn default_loading_timeout_secs() -> u64 {
    60
}

fn default_ready_timeout_secs() -> u64 {
    30
}

fn default_ready_poll_ms() -> u64 {
    1000
}

fn default_restart_delay_ms() -> u64 {
    500
}

fn default_countdown_interval_ms() -> u64 {
    1000
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            session_name: default_session_name(),
            command: default_command(),
            pane_width: default_pane_width(),
            pane_height: default_pane_height(),
            poll_interval_secs: default_poll_interval_secs(),
            refresh_delay_ms: default_refresh_delay_ms(),
            key_delay_ms: default_key_delay_ms(),
            loading_timeout_secs: default_loading_timeout_secs(),
            ready_timeout_secs: default_ready_timeout_secs(),
            ready_poll_ms: default_ready_poll_ms(),
            restart_delay_ms: default_restart_delay_ms(),
            countdown_interval_ms: default_countdown_interval_ms(),
        }
    }
}

impl MonitorSettings {
    /// Validate and normalize settings values
    ///
    /// Zero intervals would turn the loops into busy spins.
    pub fn validate(&mut self) {
        const MIN_POLL_INTERVAL_SECS: u64 = 1;
        const MIN_TICK_MS: u64 = 100;

        if self.poll_interval_secs < MIN_POLL_INTERVAL_SECS {
            self.poll_interval_secs = MIN_POLL_INTERVAL_SECS;
        }
        if self.countdown_interval_ms < MIN_TICK_MS {
            self.countdown_interval_ms = MIN_TICK_MS;
        }
        if self.ready_poll_ms < MIN_TICK_MS {
            self.ready_poll_ms = MIN_TICK_MS;
        }
        if self.session_name.trim().is_empty() {
            self.session_name = default_session_name();
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn refresh_delay(&self) -> Duration {
        Duration::from_millis(self.refresh_delay_ms)
    }

    pub fn key_delay(&self) -> Duration {
        Duration::from_millis(self.key_delay_ms)
    }

    pub fn loading_timeout(&self) -> Duration {
        Duration::from_secs(self.loading_timeout_secs)
    }

    pub fn ready_timeout(&self) -> Duration {
        Duration::from_secs(self.ready_timeout_secs)
    }

    pub fn ready_poll(&self) -> Duration {
        Duration::from_millis(self.ready_poll_ms)
    }

    pub fn restart_delay(&self) -> Duration {
        Duration::from_millis(self.restart_delay_ms)
    }

    pub fn countdown_interval(&self) -> Duration {
        Duration::from_millis(self.countdown_interval_ms)
    }
}
