//! CLI entry point — argument parsing, logging setup, and the top-level
//! spawn/react/wait dispatch.

mod args;

use args::Args;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::config::load_config;
use crate::pty::{PtySession, RawModeGuard};
use crate::reactor::Reactor;
use crate::types::Result;

/// Parse arguments, load the configuration, spawn the child on a PTY, and
/// drive the reactor to completion. Returns the child's exit code on a clean
/// run.
pub fn run() -> Result<i32> {
    let args = Args::parse();
    init_logging(args.verbose);

    let (reactives, errors) = load_config(&args.config);
    errors.fail_if_nonempty()?;

    let session = PtySession::spawn(&args.child_argv)?;
    let _raw_mode = RawModeGuard::enable().ok();

    let reactor = Reactor::new(args.chunk_size);
    reactor.run(session, reactives)
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
