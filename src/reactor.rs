//! Single-threaded, readiness-based event loop driving the PTY master,
//! controller stdio, and window-size change notifications.

use std::io::Read;
use std::os::fd::AsRawFd;

use mio::unix::SourceFd;
use mio::{Events, Interest, Poll, Token};
use signal_hook::consts::SIGWINCH;
use signal_hook_mio::v1_0::Signals;

use crate::buffer::LineBuffer;
use crate::channels::Channels;
use crate::pty::PtySession;
use crate::reactive::{MatchState, Reactive};
use crate::types::{AshierError, Result};

const PTY_TOKEN: Token = Token(0);
const CONTROLLER_TOKEN: Token = Token(1);
const SIGNAL_TOKEN: Token = Token(2);

/// The cooperative event loop: polls PTY-master readability, controller
/// stdin readability (present for EOF/graceful-shutdown detection, not fed
/// into the line buffer — see the design notes on single-producer intake),
/// and SIGWINCH notifications, dispatching bounded reads into the
/// [`LineBuffer`] followed synchronously by one match-driver pass.
pub struct Reactor {
    chunk_size: usize,
}

impl Reactor {
    /// Build a reactor with the given PTY read chunk size.
    pub fn new(chunk_size: usize) -> Self {
        Self { chunk_size }
    }

    /// Run the loop to completion: spawns `session`'s child, drives
    /// `reactives` against its output until the child exits or the
    /// controller's stdin hits EOF.
    pub fn run(&self, mut session: PtySession, reactives: Vec<Reactive>) -> Result<i32> {
        let mut poll = Poll::new().map_err(|err| AshierError::PtySpawn(err.to_string()))?;

        let mut pty_reader = session.try_clone_reader()?;
        let pty_fd = session
            .as_raw_fd()
            .ok_or_else(|| AshierError::PtySpawn("PTY master has no raw descriptor".into()))?;
        let mut pty_source = SourceFd(&pty_fd);
        poll.registry()
            .register(&mut pty_source, PTY_TOKEN, Interest::READABLE)
            .map_err(|err| AshierError::PtySpawn(err.to_string()))?;

        let controller_fd = std::io::stdin().as_raw_fd();
        let mut controller_source = SourceFd(&controller_fd);
        poll.registry()
            .register(&mut controller_source, CONTROLLER_TOKEN, Interest::READABLE)
            .map_err(|err| AshierError::PtySpawn(err.to_string()))?;

        let mut signals =
            Signals::new([SIGWINCH]).map_err(|err| AshierError::PtySpawn(err.to_string()))?;
        poll.registry()
            .register(&mut signals, SIGNAL_TOKEN, Interest::READABLE)
            .map_err(|err| AshierError::PtySpawn(err.to_string()))?;

        let mut buf = LineBuffer::new();
        let mut state = MatchState::default();
        let mut channels = Channels::new(Box::new(std::io::stdout()), session.take_writer()?);
        let mut read_buf = vec![0u8; self.chunk_size];
        let mut events = Events::with_capacity(16);

        tracing::info!("reactor starting");
        loop {
            match poll.poll(&mut events, None) {
                Ok(()) => {}
                Err(err) if err.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(err) => return Err(AshierError::PtySpawn(err.to_string())),
            }

            let mut child_done = false;
            for event in events.iter() {
                match event.token() {
                    PTY_TOKEN => match pty_reader.read(&mut read_buf) {
                        Ok(0) => child_done = true,
                        Ok(n) => {
                            tracing::trace!(bytes = n, "pty chunk read");
                            let text = String::from_utf8_lossy(&read_buf[..n]);
                            buf.append_raw(&text);
                            let advance = drive(&reactives, &mut state, &buf, &mut channels);
                            apply_advance(&mut buf, advance);
                        }
                        Err(err) if err.kind() == std::io::ErrorKind::Interrupted => {}
                        Err(err) if err.kind() == std::io::ErrorKind::WouldBlock => {}
                        Err(_) => child_done = true,
                    },
                    CONTROLLER_TOKEN => {
                        let mut probe = [0u8; 1];
                        if matches!(std::io::stdin().read(&mut probe), Ok(0)) {
                            tracing::debug!("controller stdin reached EOF");
                        }
                    }
                    SIGNAL_TOKEN => {
                        for signal in signals.pending() {
                            if signal == SIGWINCH
                                && let Some(size) = crate::pty::terminal_size()
                            {
                                tracing::debug!("forwarding window size change");
                                session.resize(size);
                            }
                        }
                    }
                    _ => {}
                }
            }

            if child_done {
                break;
            }
        }

        let status = session.wait()?;
        tracing::info!(code = status.exit_code(), "child exited");
        Ok(status.exit_code() as i32)
    }
}

fn drive(reactives: &[Reactive], state: &mut MatchState, buf: &LineBuffer, channels: &mut Channels) -> isize {
    let bound = buf.bound();
    reactives
        .iter()
        .map(|r| r.react(state, buf, bound, channels))
        .min()
        .unwrap_or(bound as isize)
}

fn apply_advance(buf: &mut LineBuffer, advance: isize) {
    let new_baseline = if advance < 0 {
        (-advance) as usize
    } else {
        advance as usize
    };
    let new_baseline = new_baseline.clamp(buf.baseline(), buf.bound());
    buf.update_baseline(new_baseline);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directive::parse_directive;
    use crate::reactive::compile_all;
    use crate::types::{ErrorSink, SourceLine};

    fn compile(lines: &[&str]) -> Vec<Reactive> {
        let mut sink = ErrorSink::new();
        let directives = lines
            .iter()
            .enumerate()
            .filter_map(|(i, l)| parse_directive(SourceLine::new("t", i + 1, *l), &mut sink))
            .collect();
        compile_all(directives, &mut sink)
    }

    fn no_channels() -> Channels {
        Channels::new(Box::new(Vec::new()), Box::new(Vec::new()))
    }

    #[test]
    fn drive_aggregates_minimum_across_reactives() {
        let reactives = compile(&[">Foo\n", ">B\n"]);
        let mut buf = LineBuffer::new();
        buf.append_raw("Foo\nBar");
        let mut state = MatchState::default();
        let mut channels = no_channels();
        let advance = drive(&reactives, &mut state, &buf, &mut channels);
        assert_eq!(advance, -3);
    }

    #[test]
    fn apply_advance_clamps_mandatory_flush() {
        let mut buf = LineBuffer::new();
        buf.append_raw("Foo\nBar");
        apply_advance(&mut buf, -3);
        assert_eq!(buf.baseline(), 3);
    }

    #[test]
    fn apply_advance_permissive_value_advances_up_to_hint() {
        let mut buf = LineBuffer::new();
        buf.append_raw("Foo\nBar");
        apply_advance(&mut buf, 2);
        assert_eq!(buf.baseline(), 2);
    }
}
