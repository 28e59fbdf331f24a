//! Binary entry point for the `ashier` CLI.

#[cfg(feature = "cli")]
fn main() {
    use ashier::AshierError;

    let code = match ashier::cli::run() {
        Ok(code) => code,
        Err(AshierError::Usage(message)) => {
            eprintln!("usage error: {message}");
            2
        }
        Err(AshierError::ConfigInvalid(_)) => 252,
        Err(err) => {
            eprintln!("ashier: {err}");
            1
        }
    };
    std::process::exit(code);
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("CLI feature not enabled. Rebuild with --features cli");
    std::process::exit(1);
}
