mod client;
mod source;

pub use client::{find_tmux_path, TmuxClient};
pub use source::{is_ready_screen, ScreenSource, TmuxScreenSource};
