use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

/// Regex pattern for validating tmux session names
static SESSION_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_.-]+$").expect("Invalid SESSION_PATTERN regex"));

/// Locations checked after `$PATH` (GUI launchers often run with a bare PATH)
const FALLBACK_DIRS: &[&str] = &["/opt/homebrew/bin", "/usr/local/bin", "/usr/bin"];

/// Validate a session name to prevent target injection
/// (`:` and `.` after a session name select windows and panes)
fn validate_session(name: &str) -> Result<()> {
    if !SESSION_PATTERN.is_match(name) {
        anyhow::bail!("Invalid tmux session name: {}", name);
    }
    Ok(())
}

/// Locate the tmux binary
pub fn find_tmux_path() -> Option<PathBuf> {
    let from_env = std::env::var_os("PATH")
        .map(|paths| std::env::split_paths(&paths).collect::<Vec<_>>())
        .unwrap_or_default();

    from_env
        .into_iter()
        .chain(FALLBACK_DIRS.iter().map(PathBuf::from))
        .map(|dir| dir.join("tmux"))
        .find(|candidate| candidate.is_file())
}

/// Client for one tmux session
pub struct TmuxClient {
    /// Path to the tmux binary
    tmux: PathBuf,
    /// Session this client operates on
    session: String,
}

impl TmuxClient {
    /// Creates a client for `session` using the tmux binary at `tmux`
    pub fn new(tmux: impl Into<PathBuf>, session: &str) -> Result<Self> {
        validate_session(session)?;
        Ok(Self {
            tmux: tmux.into(),
            session: session.to_string(),
        })
    }

    /// Session name
    pub fn session(&self) -> &str {
        &self.session
    }

    /// Path of the tmux binary in use
    pub fn tmux_path(&self) -> &Path {
        &self.tmux
    }

    /// Check whether the session exists
    pub fn has_session(&self) -> bool {
        Command::new(&self.tmux)
            .args(["has-session", "-t", &self.session])
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    /// Create the detached session with a fixed pane size
    pub fn new_session(&self, width: u16, height: u16, cwd: Option<&Path>) -> Result<()> {
        let width = width.to_string();
        let height = height.to_string();
        let mut cmd = Command::new(&self.tmux);
        cmd.args([
            "new-session",
            "-d",
            "-s",
            &self.session,
            "-x",
            &width,
            "-y",
            &height,
        ]);
        if let Some(cwd) = cwd {
            cmd.arg("-c").arg(cwd);
        }

        let output = cmd.output().context("Failed to execute tmux new-session")?;
        check(output, "new-session", &self.session)?;
        Ok(())
    }

    /// Captures the visible screen of the session without ANSI codes
    pub fn capture_pane_plain(&self) -> Result<String> {
        let output = Command::new(&self.tmux)
            .args(["capture-pane", "-p", "-t", &self.session])
            .output()
            .context("Failed to execute tmux capture-pane")?;

        let output = check(output, "capture-pane", &self.session)?;
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    /// Sends keys (tmux key names such as "Enter" or "Left")
    pub fn send_keys(&self, keys: &str) -> Result<()> {
        let output = Command::new(&self.tmux)
            .args(["send-keys", "-t", &self.session, keys])
            .output()
            .context("Failed to execute tmux send-keys")?;

        check(output, "send-keys", &self.session)?;
        Ok(())
    }

    /// Sends literal text (with -l flag)
    pub fn send_keys_literal(&self, text: &str) -> Result<()> {
        let output = Command::new(&self.tmux)
            .args(["send-keys", "-t", &self.session, "-l", text])
            .output()
            .context("Failed to execute tmux send-keys")?;

        check(output, "send-keys", &self.session)?;
        Ok(())
    }

    /// Type a command and press Enter
    pub fn run_command(&self, command: &str) -> Result<()> {
        self.send_keys_literal(command)?;
        self.send_keys("Enter")?;
        Ok(())
    }

    /// Kill the session
    pub fn kill_session(&self) -> Result<()> {
        let output = Command::new(&self.tmux)
            .args(["kill-session", "-t", &self.session])
            .output()
            .context("Failed to execute tmux kill-session")?;

        check(output, "kill-session", &self.session)?;
        Ok(())
    }
}

/// Turn a non-zero exit into an error carrying stderr
fn check(output: Output, subcommand: &str, session: &str) -> Result<Output> {
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        anyhow::bail!(
            "tmux {} failed for {}: {}",
            subcommand,
            session,
            stderr.trim()
        );
    }
    Ok(output)
}
