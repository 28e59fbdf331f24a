//! Configuration loader: reads an Ashier script into [`SourceLine`]s and
//! compiles it into the list of [`Reactive`]s the reactor drives.

use std::io::BufRead;
use std::path::Path;

use crate::reactive::{compile_all, Reactive};
use crate::types::{ErrorSink, SourceLine};

/// Read the configuration file at `path`, parse every directive, group by
/// indentation, and compile each group into a Reactive.
///
/// A file that cannot be opened is recorded as a user error rather than
/// propagated as a hard I/O failure, so the normal fail-closed path (an
/// exit-252 summary) applies uniformly whether the problem is a missing
/// file or a malformed directive inside it.
pub fn load_config(path: impl AsRef<Path>) -> (Vec<Reactive>, ErrorSink) {
    let path = path.as_ref();
    let mut sink = ErrorSink::new();

    let file = match std::fs::File::open(path) {
        Ok(file) => file,
        Err(err) => {
            sink.report(format!("cannot open configuration file: {err}"));
            return (Vec::new(), sink);
        }
    };

    let file_name = path.to_string_lossy().to_string();
    let reader = std::io::BufReader::new(file);
    let mut directives = Vec::new();

    for (idx, line) in reader.lines().enumerate() {
        let content = match line {
            Ok(content) => content,
            Err(err) => {
                sink.report(format!("cannot open configuration file: {err}"));
                return (Vec::new(), sink);
            }
        };
        let source = SourceLine::new(file_name.clone(), idx + 1, content);
        if let Some(directive) = crate::directive::parse_directive(source, &mut sink) {
            directives.push(directive);
        }
    }

    let reactives = compile_all(directives, &mut sink);
    tracing::info!(path = %file_name, reactives = reactives.len(), errors = sink.len(), "configuration loaded");
    for message in sink.iter() {
        tracing::warn!("{message}");
    }
    (reactives, sink)
}
