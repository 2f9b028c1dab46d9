use std::path::PathBuf;

use clap::Parser;

use crate::logging::Verbosity;

/// Record-keeping sidecar for free-work sessions, courses and feedback.
///
/// Reads one JSON request per line on stdin and answers one JSON response
/// per line on stdout. Logs go to stderr.
#[derive(Debug, Parser)]
#[command(name = "freiarbeitd", version, about)]
pub struct Cli {
    /// Workspace directory to open at start-up
    #[arg(short, long, value_name = "DIR")]
    pub workspace: Option<PathBuf>,

    /// Path to the configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress all log output except errors
    #[arg(short, long)]
    pub quiet: bool,
}

impl Cli {
    #[must_use]
    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_flags(self.quiet, self.verbose)
    }
}
