use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use usagewatch::config::{Command, Config, Settings};
use usagewatch::format::StatusLine;
use usagewatch::report::ParseReport;
use usagewatch_core::usage::UsageState;
use usagewatch_core::{TmuxScreenSource, UsageMonitor};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Config::parse_args();

    // Setup logging
    setup_logging(cli.debug);

    // Load settings
    let mut settings = Settings::load(cli.config.as_ref())?;
    settings.merge_cli(&cli);
    settings.validate();

    match cli.command() {
        Command::Watch { once } => watch(settings, once).await,
        Command::Parse { path } => parse(path.as_deref()),
    }
}

fn setup_logging(debug: bool) {
    let filter = if debug {
        EnvFilter::new("usagewatch=debug,usagewatch_core=debug")
    } else {
        EnvFilter::new("usagewatch=info,usagewatch_core=info")
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();
}

/// Print a status line whenever it changes, until Ctrl-C.
///
/// With `once`, exit after the first non-loading state and leave the session
/// running for the next invocation.
async fn watch(settings: Settings, once: bool) -> Result<()> {
    let line = StatusLine::new(
        settings.display.style,
        settings.display.format.as_deref(),
        settings.display.tmux_colors,
    );
    let source = Arc::new(TmuxScreenSource::new(settings.monitor.clone())?);
    let monitor = UsageMonitor::new(source, settings.monitor);
    let mut rx = monitor.subscribe();

    if let Err(e) = monitor.start().await {
        println!("{}", line.render(&monitor.snapshot()));
        return Err(e).context("Failed to start usage monitor");
    }
    info!("Watching usage (template {:?})", line.template());

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let mut last = String::new();
    loop {
        let view = rx.borrow_and_update().clone();
        let settled = !matches!(view.state, UsageState::Loading(_));
        let text = line.render(&view);

        if (!once || settled) && text != last {
            println!("{}", text);
            last = text;
        }
        if once && settled {
            return Ok(());
        }

        tokio::select! {
            changed = rx.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            _ = &mut ctrl_c => {
                info!("Interrupted");
                break;
            }
        }
    }

    if let Some(handle) = monitor.stop() {
        if let Err(e) = handle.await {
            warn!("Session cleanup failed: {}", e);
        }
    }
    Ok(())
}

/// Parse a saved capture (file or stdin) and print the result as JSON
fn parse(path: Option<&Path>) -> Result<()> {
    let text = match path {
        Some(p) => std::fs::read_to_string(p)
            .with_context(|| format!("Failed to read capture file: {:?}", p))?,
        None => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("Failed to read capture from stdin")?;
            text
        }
    };

    let report = ParseReport::from_capture(&text, Utc::now());
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
