//! The screen source the monitor polls: a hidden tmux session running Claude Code.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::client::{find_tmux_path, TmuxClient};
use crate::config::MonitorSettings;
use crate::error::MonitorError;

/// Claude Code shows this glyph in its banner once it is interactive
const READY_GLYPH: char = '\u{273B}';

/// Workspace trust dialog shown on first launch in a directory
const TRUST_PROMPT: &str = "Yes, I trust this folder";

/// Pause between typing `/usage` and confirming it
const SLASH_COMMAND_DELAY: Duration = Duration::from_millis(500);

/// Something that can host the monitored session and hand back its screen.
///
/// Implementations swallow their own failures: a broken capture is an empty
/// `Vec`, a failed command is silently skipped. The monitor never issues two
/// calls concurrently against the same source.
#[async_trait]
pub trait ScreenSource: Send + Sync + 'static {
    /// One-shot environment check made by `start()`
    fn check_available(&self) -> Result<(), MonitorError>;

    /// Whether the monitored session is running
    async fn session_exists(&self) -> bool;

    /// Launch the session and navigate to the usage screen (best effort)
    async fn create_session(&self);

    /// Visible screen, top to bottom; empty on failure
    async fn capture_lines(&self) -> Vec<String>;

    /// Force a redraw of the usage screen without changing anything
    async fn send_refresh_keystrokes(&self);

    /// Tear the session down
    async fn terminate_session(&self);
}

/// Whether a captured screen shows an interactive Claude Code instance
pub fn is_ready_screen(text: &str) -> bool {
    text.contains(READY_GLYPH) || text.to_lowercase().contains("claude code")
}

/// [`ScreenSource`] backed by a detached tmux session.
///
/// Every operation goes through one mutex so tmux commands against the
/// session are strictly serialized.
pub struct TmuxScreenSource {
    client: Mutex<TmuxClient>,
    available: bool,
    settings: MonitorSettings,
}

impl TmuxScreenSource {
    /// Create a source for `settings.session_name`.
    ///
    /// Fails only on an invalid session name; a missing tmux binary is
    /// reported later by [`ScreenSource::check_available`].
    pub fn new(settings: MonitorSettings) -> Result<Self> {
        let tmux_path = find_tmux_path();
        let available = tmux_path.is_some();
        let client = TmuxClient::new(
            tmux_path.unwrap_or_else(|| PathBuf::from("tmux")),
            &settings.session_name,
        )?;

        if available {
            debug!("Using tmux at {}", client.tmux_path().display());
        }

        Ok(Self {
            client: Mutex::new(client),
            available,
            settings,
        })
    }

    /// Poll until Claude Code appears ready.
    /// Automatically confirms the "trust this folder?" prompt.
    async fn wait_for_ready(&self, client: &TmuxClient) -> bool {
        let timeout = self.settings.ready_timeout();
        let poll_interval = self.settings.ready_poll();
        let start = tokio::time::Instant::now();
        let mut trust_confirmed = false;

        while start.elapsed() < timeout {
            if let Ok(content) = client.capture_pane_plain() {
                if is_ready_screen(&content) {
                    debug!("Session {}: Claude Code is ready", client.session());
                    return true;
                }

                if !trust_confirmed && content.contains(TRUST_PROMPT) {
                    debug!("Session {}: auto-confirming trust prompt", client.session());
                    let _ = client.send_keys("Enter");
                    trust_confirmed = true;
                }
            }
            tokio::time::sleep(poll_interval).await;
        }

        warn!(
            "Session {}: timed out waiting for Claude Code to start",
            client.session()
        );
        false
    }
}

#[async_trait]
impl ScreenSource for TmuxScreenSource {
    fn check_available(&self) -> Result<(), MonitorError> {
        if self.available {
            Ok(())
        } else {
            Err(MonitorError::ScreenSourceUnavailable {
                message: "tmux not found. Install it with:\nbrew install tmux (macOS) or your package manager"
                    .to_string(),
            })
        }
    }

    async fn session_exists(&self) -> bool {
        self.client.lock().await.has_session()
    }

    async fn create_session(&self) {
        let client = self.client.lock().await;

        // Home directory is trusted by Claude Code more often than the cwd
        let home = dirs::home_dir();
        if let Err(e) = client.new_session(
            self.settings.pane_width,
            self.settings.pane_height,
            home.as_deref(),
        ) {
            warn!("Failed to create usage session: {:#}", e);
            return;
        }
        info!("Created tmux session {}", client.session());

        if let Err(e) = client.run_command(&self.settings.command) {
            warn!("Failed to start {}: {:#}", self.settings.command, e);
            return;
        }

        if !self.wait_for_ready(&client).await {
            return;
        }

        if let Err(e) = client.send_keys_literal("/usage") {
            debug!("Failed to type /usage: {:#}", e);
            return;
        }
        tokio::time::sleep(SLASH_COMMAND_DELAY).await;
        if let Err(e) = client.send_keys("Enter") {
            debug!("Failed to confirm /usage: {:#}", e);
        }
    }

    async fn capture_lines(&self) -> Vec<String> {
        let client = self.client.lock().await;
        match client.capture_pane_plain() {
            Ok(text) => text.lines().map(str::to_string).collect(),
            Err(e) => {
                debug!("Capture failed: {:#}", e);
                Vec::new()
            }
        }
    }

    async fn send_refresh_keystrokes(&self) {
        // Cycling the settings tabs away and back repaints the usage numbers
        let client = self.client.lock().await;
        if let Err(e) = client.send_keys("Left") {
            debug!("Failed to send Left: {:#}", e);
        }
        tokio::time::sleep(self.settings.key_delay()).await;
        if let Err(e) = client.send_keys("Right") {
            debug!("Failed to send Right: {:#}", e);
        }
    }

    async fn terminate_session(&self) {
        let client = self.client.lock().await;
        match client.kill_session() {
            Ok(()) => info!("Killed tmux session {}", client.session()),
            Err(e) => debug!("kill-session: {:#}", e),
        }
    }
}
