//! Named output channels: `controller` (process stdout) and `terminal`
//! (the PTY master).

use std::collections::HashMap;
use std::io::Write;

use crate::directive::Channel;

/// A writable byte sink for one channel.
pub type ChannelSink = dyn Write + Send;

/// The runtime mapping from [`Channel`] to its writable sink.
pub struct Channels {
    sinks: HashMap<Channel, Box<ChannelSink>>,
}

impl Channels {
    /// Build a channel table from explicit sinks.
    pub fn new(controller: Box<ChannelSink>, terminal: Box<ChannelSink>) -> Self {
        let mut sinks: HashMap<Channel, Box<ChannelSink>> = HashMap::new();
        sinks.insert(Channel::Controller, controller);
        sinks.insert(Channel::Terminal, terminal);
        Self { sinks }
    }

    /// Write `payload` followed by a newline to `channel`. Write errors are
    /// swallowed — the controller or child may have gone away at any time,
    /// and a broken channel is not a program error.
    pub fn write(&mut self, channel: Channel, payload: &str) {
        if let Some(sink) = self.sinks.get_mut(&channel) {
            let _ = sink.write_all(payload.as_bytes());
            let _ = sink.write_all(b"\n");
            let _ = sink.flush();
            tracing::trace!(channel = ?channel, "sent");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().write(buf)
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn write_appends_newline() {
        let terminal = SharedBuf::default();
        let controller = SharedBuf::default();
        let mut channels = Channels::new(Box::new(controller.clone()), Box::new(terminal.clone()));
        channels.write(Channel::Terminal, "a FOO b");
        assert_eq!(terminal.0.lock().unwrap().as_slice(), b"a FOO b\n");
        assert!(controller.0.lock().unwrap().is_empty());
    }
}
