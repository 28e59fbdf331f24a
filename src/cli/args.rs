//! Command-line argument grammar: `ashier <config-file> -- <child-argv>...`.

use clap::Parser;

/// Drive a child process through a pseudo-terminal according to a
/// declarative template/marker/send configuration script.
#[derive(Parser, Debug)]
#[command(name = "ashier")]
#[command(about = "Template-driven terminal scripting", long_about = None)]
#[command(version)]
pub(crate) struct Args {
    /// Path to the Ashier configuration script.
    pub(crate) config: String,

    /// The child program and its arguments, following a literal `--`.
    #[arg(last = true, required = true)]
    pub(crate) child_argv: Vec<String>,

    /// Bytes read from the PTY per reactor wakeup.
    #[arg(long, default_value_t = 1024)]
    pub(crate) chunk_size: usize,

    /// Increase log verbosity (`-v` for debug, `-vv` for trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub(crate) verbose: u8,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_config_and_trailing_child_argv() {
        let args = Args::parse_from(["ashier", "session.ash", "--", "ssh", "host"]);
        assert_eq!(args.config, "session.ash");
        assert_eq!(args.child_argv, vec!["ssh".to_string(), "host".to_string()]);
        assert_eq!(args.chunk_size, 1024);
        assert_eq!(args.verbose, 0);
    }

    #[test]
    fn parses_chunk_size_and_verbosity() {
        let args = Args::parse_from([
            "ashier",
            "--chunk-size",
            "256",
            "-vv",
            "session.ash",
            "--",
            "bash",
        ]);
        assert_eq!(args.chunk_size, 256);
        assert_eq!(args.verbose, 2);
        assert_eq!(args.child_argv, vec!["bash".to_string()]);
    }

    #[test]
    fn missing_separator_is_a_usage_error() {
        let result = Args::try_parse_from(["ashier", "session.ash"]);
        assert!(result.is_err());
    }

    #[test]
    fn missing_config_is_a_usage_error() {
        let result = Args::try_parse_from(["ashier"]);
        assert!(result.is_err());
    }
}
