//! Pattern compiler: weaves one template's skip- and marker-regexes into a
//! single compiled regex with ordered capture-group bindings.

use regex::Regex;

use crate::directive::{Marker, Template};
use crate::types::ErrorSink;

/// One compiled matcher built from a Template and its Markers.
#[derive(Debug, Clone)]
pub struct Pattern {
    regex: Regex,
    source: String,
    /// Binding name for the i-th capturing group, in left-to-right order.
    bound_names: Vec<Option<String>>,
}

impl Pattern {
    /// Compile `template` and its (unordered) `markers` into a Pattern.
    ///
    /// Markers are sorted by `start`; out-of-range, overlapping, or
    /// past-the-end markers are reported to `sink` and skipped.
    pub fn compile(template: &Template, markers: &mut [Marker], sink: &mut ErrorSink) -> Self {
        markers.sort_by_key(|m| m.start);

        let sample = &template.sample;
        let sample_chars = sample.chars().count();
        let mut regex = String::new();
        let mut bound_names = Vec::new();
        let mut i = 0usize;

        for marker in markers.iter_mut() {
            if marker.finish > sample_chars {
                sink.report_at(&marker.line, "marker extends beyond template");
                continue;
            }
            if i < marker.start {
                regex.push_str(&template.infer_skip(i, marker.start, sink));
            } else if i > marker.start {
                sink.report_at(&marker.line, "overlap with another marker");
                i = marker.finish;
                continue;
            }
            let marker_regex = marker.infer_regex(sample, sink);
            regex.push('(');
            regex.push_str(&marker_regex);
            regex.push(')');
            bound_names.push(marker.name.clone());
            i = marker.finish;
        }
        if i < sample_chars {
            regex.push_str(&template.infer_skip(i, sample_chars, sink));
        }

        let compiled = Regex::new(&format!("^(?:{regex})")).unwrap_or_else(|err| {
            panic!("{}", template.line.with_header(format!("ill-formed pattern regex: {err}")))
        });

        Self {
            regex: compiled,
            source: regex,
            bound_names,
        }
    }

    /// The woven regex source, before the `^(?:...)`/`$` wrapping — empty
    /// only for a bare `>` template with no sample text.
    pub fn regex_source(&self) -> &str {
        &self.source
    }

    /// Binding name for the i-th capturing group, in left-to-right order.
    pub fn bound_names(&self) -> &[Option<String>] {
        &self.bound_names
    }

    /// Re-compile with a trailing `$` end-of-line anchor.
    pub fn attach_eol(&mut self) {
        self.regex = Regex::new(&format!("^(?:{})$", self.source))
            .expect("already-compiled source remains well-formed with a $ suffix");
    }

    /// Attempt an anchored-at-start match against `text`, binding matched
    /// groups with non-null names into `bindings`. Returns whether it matched.
    pub fn matches(&self, text: &str, bindings: &mut std::collections::HashMap<String, String>) -> bool {
        let Some(caps) = self.regex.captures(text) else {
            return false;
        };
        for (idx, name) in self.bound_names.iter().enumerate() {
            if let Some(name) = name
                && let Some(group) = caps.get(idx + 1)
            {
                bindings.insert(name.clone(), group.as_str().to_string());
            }
        }
        true
    }
}
