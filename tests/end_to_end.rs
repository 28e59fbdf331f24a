//! Integration coverage driving the match pipeline against canned PTY-style
//! byte chunks, with no real pseudo-terminal involved.

use std::io::Write;
use std::sync::{Arc, Mutex};

use ashier::buffer::LineBuffer;
use ashier::channels::Channels;
use ashier::config::load_config;
use ashier::reactive::MatchState;

#[derive(Clone, Default)]
struct Recording(Arc<Mutex<Vec<u8>>>);

impl Write for Recording {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().write(buf)
    }
    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

fn write_script(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

/// Mirrors the reactor's own drive/apply-advance loop: run every reactive
/// once, take the minimum advance directive, and fold it into the buffer.
fn pump(reactives: &[ashier::reactive::Reactive], state: &mut MatchState, buf: &mut LineBuffer, channels: &mut Channels) {
    let bound = buf.bound();
    let advance = reactives
        .iter()
        .map(|r| r.react(state, buf, bound, channels))
        .min()
        .unwrap_or(bound as isize);
    let new_baseline = if advance < 0 { (-advance) as usize } else { advance as usize };
    buf.update_baseline(new_baseline.clamp(buf.baseline(), buf.bound()));
}

#[test]
fn login_password_prompt_exchange_fires_both_sends() {
    let script = write_script(concat!(
        ">login: \n",
        "! terminal \"admin\"\n",
        "    >password: \n",
        "    ! terminal \"hunter2\"\n",
    ));
    let (reactives, errors) = load_config(script.path());
    assert!(!errors.has_errors(), "{errors}");
    assert_eq!(reactives.len(), 2);

    let terminal = Recording::default();
    let mut channels = Channels::new(Box::new(Vec::new()), Box::new(terminal.clone()));
    let mut state = MatchState::default();
    let mut buf = LineBuffer::new();

    buf.append_raw("login: ");
    pump(&reactives, &mut state, &mut buf, &mut channels);
    assert_eq!(terminal.0.lock().unwrap().as_slice(), b"admin\n");

    // The child echoes the typed credentials back, including the newline
    // that terminates the "login: " line before "password: " starts.
    buf.append_raw("admin\npassword: ");
    pump(&reactives, &mut state, &mut buf, &mut channels);
    assert_eq!(terminal.0.lock().unwrap().as_slice(), b"admin\nhunter2\n".as_slice());
}

#[test]
fn unmatched_prefix_does_not_fire_and_is_not_discarded() {
    let script = write_script(">login: \n! terminal \"admin\\n\"\n");
    let (reactives, errors) = load_config(script.path());
    assert!(!errors.has_errors(), "{errors}");

    let mut channels = Channels::new(Box::new(Vec::new()), Box::new(Vec::new()));
    let mut state = MatchState::default();
    let mut buf = LineBuffer::new();

    buf.append_raw("please wait");
    pump(&reactives, &mut state, &mut buf, &mut channels);
    assert_eq!(buf.get_line(buf.bound() - 1), "please wait");

    buf.append_raw("\nlogin: ");
    pump(&reactives, &mut state, &mut buf, &mut channels);
}

#[test]
fn malformed_script_fails_closed_with_recorded_errors() {
    let script = write_script(">abc\n? not-dots\n");
    let (reactives, errors) = load_config(script.path());
    assert!(errors.has_errors());
    assert!(errors.fail_if_nonempty().is_err());
    assert!(reactives.is_empty() || reactives.iter().all(|r| !r.nesting().is_empty()));
}

#[test]
fn chunked_arrival_of_a_single_line_matches_once_complete() {
    let script = write_script(">Ready\n");
    let (reactives, errors) = load_config(script.path());
    assert!(!errors.has_errors(), "{errors}");

    let mut channels = Channels::new(Box::new(Vec::new()), Box::new(Vec::new()));
    let mut state = MatchState::default();
    let mut buf = LineBuffer::new();

    for chunk in ["Re", "a"] {
        buf.append_raw(chunk);
        pump(&reactives, &mut state, &mut buf, &mut channels);
        assert_eq!(buf.baseline(), 1, "must not flush on a partial match of {chunk:?}");
    }

    buf.append_raw("dy");
    pump(&reactives, &mut state, &mut buf, &mut channels);
    assert_eq!(buf.baseline(), 2, "completing the line should flush it");
}
