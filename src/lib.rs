//! # Ashier
//!
//! Template-driven terminal scripting for interactive programs. A script is
//! a sequence of directives — templates with embedded markers (`>`), regex
//! overrides (`?`), and sends (`!`) — that are compiled into reactive
//! pattern/action pairs and matched incrementally against a child process's
//! PTY output.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ashier::config::load_config;
//!
//! let (reactives, errors) = load_config("session.ash");
//! errors.fail_if_nonempty()?;
//! println!("compiled {} reactive(s)", reactives.len());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod buffer;
pub mod channels;
pub mod config;
pub mod directive;
pub mod pattern;
pub mod pty;
pub mod reactive;
pub mod reactor;
pub mod types;

#[cfg(feature = "cli")]
pub mod cli;

pub use config::load_config;
pub use reactor::Reactor;
pub use types::{AshierError, ErrorSink, Result, SourceLine};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get the library version.
pub fn version() -> &'static str {
    VERSION
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!version().is_empty());
    }
}
