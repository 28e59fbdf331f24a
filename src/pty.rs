//! PTY session management: spawning the child on a pseudo-terminal, putting
//! the invoking terminal into raw mode for the session's duration, and
//! forwarding window-size changes onto the PTY.

use std::io::{Read, Write};

use portable_pty::{native_pty_system, Child, CommandBuilder, MasterPty, PtySize};
use rustix::termios::{
    self, ControlModes, InputModes, LocalModes, OptionalActions, OutputModes, SpecialCodeIndex,
    Termios,
};

use crate::types::{AshierError, Result};

/// Owns the spawned child and its PTY master handle for the process lifetime.
pub struct PtySession {
    child: Box<dyn Child + Send + Sync>,
    master: Box<dyn MasterPty + Send>,
}

impl PtySession {
    /// Open a PTY pair and spawn `argv[0]` with the remaining elements as
    /// arguments, its standard streams and controlling terminal wired to the
    /// slave end.
    pub fn spawn(argv: &[String]) -> Result<Self> {
        let program = argv
            .first()
            .ok_or_else(|| AshierError::Usage("child argv must not be empty".into()))?;

        let pty_system = native_pty_system();
        let size = terminal_size().unwrap_or(PtySize {
            rows: 24,
            cols: 80,
            pixel_width: 0,
            pixel_height: 0,
        });
        let pair = pty_system
            .openpty(size)
            .map_err(|err| AshierError::PtySpawn(err.to_string()))?;

        let mut command = CommandBuilder::new(program);
        command.args(&argv[1..]);

        let child = pair
            .slave
            .spawn_command(command)
            .map_err(|err| AshierError::PtySpawn(err.to_string()))?;
        // The slave end is only needed to spawn the child; drop it so the
        // master side observes EOF when the child exits.
        drop(pair.slave);

        Ok(Self {
            child,
            master: pair.master,
        })
    }

    /// A cloned, non-blocking-capable reader over the PTY master's output.
    pub fn try_clone_reader(&self) -> Result<Box<dyn Read + Send>> {
        self.master
            .try_clone_reader()
            .map_err(|err| AshierError::PtySpawn(err.to_string()))
    }

    /// A writer over the PTY master's input (the child's stdin).
    pub fn take_writer(&self) -> Result<Box<dyn Write + Send>> {
        self.master
            .take_writer()
            .map_err(|err| AshierError::PtySpawn(err.to_string()))
    }

    /// Copy `size` onto the PTY, e.g. in response to a SIGWINCH.
    pub fn resize(&self, size: PtySize) {
        let _ = self.master.resize(size);
    }

    /// The PTY master's raw file descriptor, for registering with a poller.
    pub fn as_raw_fd(&self) -> Option<std::os::fd::RawFd> {
        self.master.as_raw_fd()
    }

    /// Block until the child exits, returning its exit status.
    pub fn wait(&mut self) -> Result<portable_pty::ExitStatus> {
        self.child
            .wait()
            .map_err(|err| AshierError::PtySpawn(err.to_string()))
    }
}

/// The invoking terminal's current size, or `None` if stdout is not a TTY.
pub fn terminal_size() -> Option<PtySize> {
    let winsize = termios::tcgetwinsize(std::io::stdout()).ok()?;
    Some(PtySize {
        rows: winsize.ws_row,
        cols: winsize.ws_col,
        pixel_width: winsize.ws_xpixel,
        pixel_height: winsize.ws_ypixel,
    })
}

/// Puts a terminal file descriptor into raw (cbreak, no-echo) mode for as
/// long as the guard is alive, restoring the prior settings on drop —
/// including on an early return or panic unwind.
pub struct RawModeGuard {
    original: Termios,
}

impl RawModeGuard {
    /// Enable raw mode on stdin.
    pub fn enable() -> Result<Self> {
        let stdin = std::io::stdin();
        let original = termios::tcgetattr(&stdin)
            .map_err(|err| AshierError::PtySpawn(format!("failed to read terminal attributes: {err}")))?;

        let mut raw = original.clone();
        raw.input_modes.remove(
            InputModes::IGNBRK
                | InputModes::BRKINT
                | InputModes::PARMRK
                | InputModes::ISTRIP
                | InputModes::INLCR
                | InputModes::IGNCR
                | InputModes::ICRNL
                | InputModes::IXON,
        );
        raw.output_modes.remove(OutputModes::OPOST);
        raw.local_modes.remove(
            LocalModes::ECHO
                | LocalModes::ECHONL
                | LocalModes::ICANON
                | LocalModes::ISIG
                | LocalModes::IEXTEN,
        );
        raw.control_modes.remove(ControlModes::CSIZE | ControlModes::PARENB);
        raw.control_modes.insert(ControlModes::CS8);
        raw.special_codes[SpecialCodeIndex::VMIN] = 1;
        raw.special_codes[SpecialCodeIndex::VTIME] = 0;

        termios::tcsetattr(&stdin, OptionalActions::Now, &raw)
            .map_err(|err| AshierError::PtySpawn(format!("failed to set terminal attributes: {err}")))?;

        Ok(Self { original })
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        let stdin = std::io::stdin();
        let _ = termios::tcsetattr(&stdin, OptionalActions::Now, &self.original);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spawn_rejects_empty_argv() {
        match PtySession::spawn(&[]) {
            Err(AshierError::Usage(_)) => {}
            Err(other) => panic!("expected a usage error, got {other}"),
            Ok(_) => panic!("expected spawning an empty argv to fail"),
        }
    }

    #[test]
    fn spawn_and_wait_true() {
        let mut session = PtySession::spawn(&["true".to_string()]).expect("spawn true");
        let status = session.wait().expect("wait");
        assert!(status.success());
    }
}
