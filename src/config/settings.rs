use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::format::StatusBarStyle;
use usagewatch_core::MonitorSettings;

/// Command line arguments
#[derive(Parser, Debug)]
#[command(author, version, about = "Claude Code usage monitor for status bars")]
pub struct Config {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub debug: bool,

    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Seconds between screen captures
    #[arg(short = 'i', long)]
    pub poll_interval: Option<u64>,

    /// tmux session hosting the Claude Code instance
    #[arg(short = 's', long)]
    pub session_name: Option<String>,

    /// Status line template, e.g. "S:{s}({sr}) W:{w}({wr})"
    #[arg(short, long)]
    pub format: Option<String>,

    /// Status line preset (ignored when a format is given)
    #[arg(long, value_enum)]
    pub style: Option<StatusBarStyle>,

    /// Colour percentages with tmux #[fg=...] markup
    #[arg(long)]
    pub tmux_colors: bool,

    /// Subcommand (defaults to `watch`)
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// Subcommands
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Keep a hidden Claude Code session and print a status line on every change
    Watch {
        /// Print the first settled status line and exit
        #[arg(long)]
        once: bool,
    },
    /// Parse a saved usage screen capture and print it as JSON
    Parse {
        /// Capture file (reads stdin when omitted)
        path: Option<PathBuf>,
    },
}

impl Config {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Subcommand to run, `watch` when none was given
    pub fn command(&self) -> Command {
        self.command
            .clone()
            .unwrap_or(Command::Watch { once: false })
    }
}

/// Application settings (from config file)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Session and polling settings
    #[serde(default)]
    pub monitor: MonitorSettings,

    /// Status line settings
    #[serde(default)]
    pub display: DisplaySettings,
}

/// Status line settings (`[display]` table)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplaySettings {
    /// Preset layout
    #[serde(default)]
    pub style: StatusBarStyle,

    /// Custom template; overrides `style`
    #[serde(default)]
    pub format: Option<String>,

    /// Wrap percentages in tmux colour markup
    #[serde(default)]
    pub tmux_colors: bool,
}

impl Settings {
    /// Load settings from the config file.
    ///
    /// An explicit `path` must exist. Otherwise the default locations are
    /// tried in order and defaults are used when none exists.
    pub fn load(path: Option<&PathBuf>) -> Result<Self> {
        if let Some(p) = path {
            return Self::from_file(p);
        }

        let default_paths = [
            dirs::config_dir().map(|p| p.join("usagewatch/config.toml")),
            dirs::home_dir().map(|p| p.join(".config/usagewatch/config.toml")),
            dirs::home_dir().map(|p| p.join(".usagewatch.toml")),
        ];

        for path in default_paths.iter().flatten() {
            if path.exists() {
                return Self::from_file(path);
            }
        }

        Ok(Self::default())
    }

    fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    /// Merge CLI config into settings (CLI takes precedence)
    pub fn merge_cli(&mut self, cli: &Config) {
        if let Some(poll_interval) = cli.poll_interval {
            self.monitor.poll_interval_secs = poll_interval;
        }
        if let Some(session_name) = &cli.session_name {
            self.monitor.session_name = session_name.clone();
        }
        if let Some(format) = &cli.format {
            self.display.format = Some(format.clone());
        }
        if let Some(style) = cli.style {
            self.display.style = style;
            // an explicit preset beats a template from the config file
            if cli.format.is_none() {
                self.display.format = None;
            }
        }
        if cli.tmux_colors {
            self.display.tmux_colors = true;
        }
    }

    /// Validate and normalize settings values
    pub fn validate(&mut self) {
        self.monitor.validate();

        if self
            .display
            .format
            .as_deref()
            .is_some_and(|f| f.trim().is_empty())
        {
            self.display.format = None;
        }
    }
}
