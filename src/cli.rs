use std::path::PathBuf;

use clap::Parser;
use lazyview::config::AppConfig;

#[derive(Parser, Debug)]
#[command(name = "lazyview", version, about = "Keyboard-driven demo view for the lazyview core")]
pub struct Args {
    /// Config file to use instead of the default location
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Do not attach call stacks to errors
    #[arg(long)]
    pub no_stack_trace: bool,

    /// Number of dispatched events kept in history
    #[arg(long)]
    pub max_history: Option<usize>,
}

impl Args {
    /// Apply command-line overrides on top of the loaded config.
    pub fn apply(&self, config: &mut AppConfig) {
        if self.no_stack_trace {
            config.errors.capture_stack = false;
        }
        if let Some(max_history) = self.max_history {
            config.events.max_history = max_history;
        }
    }
}
