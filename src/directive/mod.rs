//! Configuration directives: the `>`/`?`/`!` lines of an Ashier script.
//!
//! This module owns the directive parser (classifying one [`SourceLine`]
//! into a [`Directive`]) and the regex-inference heuristics that turn a
//! template's sample text and its markers into the regex fragments the
//! pattern compiler weaves together.

use regex::Regex;
use std::sync::OnceLock;

use crate::types::{ErrorSink, SourceLine};

/// One configuration-file directive: a template, a marker, or a send.
#[derive(Debug, Clone)]
pub enum Directive {
    /// A `>` directive: an example line of terminal output to match.
    Template(Template),
    /// A `?` directive: a variable-column marker on the preceding template.
    Marker(Marker),
    /// A `!` directive: a side-effect send to a channel.
    Send(Send),
}

impl Directive {
    /// The source line this directive was parsed from.
    pub fn line(&self) -> &SourceLine {
        match self {
            Directive::Template(t) => &t.line,
            Directive::Marker(m) => &m.line,
            Directive::Send(s) => &s.line,
        }
    }
}

/// The template directive: a concrete example of terminal output.
#[derive(Debug, Clone)]
pub struct Template {
    /// The line the template directive was parsed from.
    pub line: SourceLine,
    /// The example terminal output string, i.e. everything after the `>`
    /// with no trimming of internal or trailing spaces.
    pub sample: String,
}

impl Template {
    /// Compute a regex that skips a fixed string in `sample[start..finish]`,
    /// tolerating growth/shrinkage of consecutive whitespace.
    ///
    /// Reports `"invalid boundary at column {finish}"` if the inferred
    /// regex over-matches into the following text (a marker boundary placed
    /// mid-whitespace, most likely). Under-matching or an ill-formed regex
    /// is a program bug, not a user error.
    pub fn infer_skip(&self, start: usize, finish: usize, sink: &mut ErrorSink) -> String {
        let start_byte = char_byte_index(&self.sample, start);
        let finish_byte = char_byte_index(&self.sample, finish);
        let slice = &self.sample[start_byte..finish_byte];
        let collapsed = collapse_whitespace(slice);

        let mut regex = String::new();
        for ch in collapsed.chars() {
            if ch == ' ' {
                regex.push_str(r"\s+");
            } else {
                regex.push_str(&regex::escape(&ch.to_string()));
            }
        }

        let rest = &self.sample[start_byte..];
        let compiled = Regex::new(&format!("^(?:{regex})")).unwrap_or_else(|err| {
            panic!(
                "{}",
                self.line.with_header(format!("ill-formed skip regex: {err}"))
            )
        });
        let matched_len = compiled
            .find(rest)
            .unwrap_or_else(|| {
                panic!(
                    "{}",
                    self.line
                        .with_header("skip pattern matches too few characters")
                )
            })
            .end();

        let span_bytes = finish_byte - start_byte;
        assert!(
            matched_len >= span_bytes,
            "{}",
            self.line
                .with_header("skip pattern matches too few characters")
        );
        if matched_len > span_bytes {
            sink.report_at(
                &self.line,
                format!("invalid boundary at column {finish}"),
            );
        }

        regex
    }
}

/// The marker directive: labels a column range of the preceding template as
/// "variable", optionally naming it and/or constraining it with a regex.
#[derive(Debug, Clone)]
pub struct Marker {
    /// The line the marker directive was parsed from.
    pub line: SourceLine,
    /// 0-based start column (inclusive) within the template's sample.
    pub start: usize,
    /// 0-based finish column (exclusive) within the template's sample.
    pub finish: usize,
    /// Optional binding name for the matched substring.
    pub name: Option<String>,
    /// User-supplied regex (capture groups already neutralised), or empty
    /// if inference is requested.
    regex: String,
}

impl Marker {
    /// Construct a marker directly, bypassing directive parsing. Used by the
    /// pattern compiler's own tests to build markers without round-tripping
    /// through configuration text.
    #[cfg(test)]
    pub(crate) fn new_for_test(
        line: SourceLine,
        start: usize,
        finish: usize,
        name: Option<String>,
        regex: String,
    ) -> Self {
        Self {
            line,
            start,
            finish,
            name,
            regex,
        }
    }

    /// Infer (or validate a user-supplied) regex for this marker's
    /// substring of `sample`. Returns an empty string if inference or
    /// validation failed and an error was reported.
    pub fn infer_regex(&mut self, sample: &str, sink: &mut ErrorSink) -> String {
        let sample_chars = sample.chars().count();
        debug_assert!(self.finish <= sample_chars, "marker extends beyond template");

        let start_byte = char_byte_index(sample, self.start);
        let finish_byte = char_byte_index(sample, self.finish);

        if self.regex.is_empty() {
            if sample_chars == self.finish {
                self.regex = ".+".to_string();
            } else {
                let delimiter = sample[finish_byte..]
                    .chars()
                    .next()
                    .expect("finish < sample_chars");
                let marked = &sample[start_byte..finish_byte];
                if marked.contains(delimiter) {
                    sink.report_at(
                        &self.line,
                        "delimiter appears in the marker",
                    );
                    return String::new();
                }
                self.regex = if delimiter.is_whitespace() {
                    r"[^\s]+".to_string()
                } else {
                    format!("[^{}]+", regex::escape(&delimiter.to_string()))
                };
            }
        }

        if !self.regex.is_empty() {
            match Regex::new(&format!("^(?:{})", self.regex)) {
                Ok(compiled) => {
                    let rest = &sample[start_byte..];
                    let matched = compiled.find(rest).map(|m| m.end());
                    if matched != Some(finish_byte - start_byte) {
                        sink.report_at(&self.line, "regex does not match marker");
                    }
                }
                Err(_) => {
                    sink.report_at(
                        &self.line,
                        "ill-formed regular expression",
                    );
                }
            }
        }

        self.regex.clone()
    }
}

/// The send action directive: requests Ashier write a formatted message to
/// the controller process or to the child's terminal.
#[derive(Debug, Clone)]
pub struct Send {
    /// The line the send directive was parsed from.
    pub line: SourceLine,
    /// Raw channel name as written in the configuration (validated
    /// separately; see [`Send::channel`]).
    pub channel_name: String,
    /// The message template, with `$name` variable references.
    pub message: String,
}

/// The two channels Ashier recognises.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    /// Writes go to the controller's stdout.
    Controller,
    /// Writes go to the PTY master (the child's terminal).
    Terminal,
}

impl Send {
    /// The parsed channel, or `None` if `channel_name` was not one of the
    /// two recognised channels (an error was already reported for this at
    /// parse time; a `Send` with an unrecognised channel is still
    /// constructed, matching the original implementation, so that a single
    /// bad directive does not also hide unrelated "unbound name" errors
    /// about the same send).
    pub fn channel(&self) -> Option<Channel> {
        match self.channel_name.as_str() {
            "controller" => Some(Channel::Controller),
            "terminal" => Some(Channel::Terminal),
            _ => None,
        }
    }

    /// Variable names (without the leading `$`) referenced in the message.
    ///
    /// Splits on `\$\w+`; note that `$$def` is *not* a literal-dollar
    /// escape for `$def` — it is a reference to the name `$def`'s tail
    /// `def`, same as a bare `$def` would be. This is intentional and
    /// observable (see Open Questions in the design doc).
    pub fn references(&self) -> std::collections::BTreeSet<String> {
        variable_regex()
            .find_iter(&self.message)
            .map(|m| m.as_str()[1..].to_string())
            .collect()
    }

    /// Expand `$name` references in the message using `bindings`.
    ///
    /// Panics if a referenced name is missing from `bindings`; this should
    /// never happen at runtime because the reactive compiler's free-name
    /// check rejects any such directive before the program starts.
    pub fn expand(&self, bindings: &std::collections::HashMap<String, String>) -> String {
        let mut out = String::with_capacity(self.message.len());
        let mut last = 0;
        for m in variable_regex().find_iter(&self.message) {
            out.push_str(&self.message[last..m.start()]);
            let name = &m.as_str()[1..];
            out.push_str(
                bindings
                    .get(name)
                    .unwrap_or_else(|| panic!("unbound name '{name}' at send time")),
            );
            last = m.end();
        }
        out.push_str(&self.message[last..]);
        out
    }
}

fn variable_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\$\w+").unwrap())
}

/// Translate a 0-based character index into `s` to the byte offset of that
/// character, so that character-column positions (as markers are specified
/// in columns, not bytes) can be used to slice a `str` without landing
/// mid-codepoint. An index at or beyond the character count maps to
/// `s.len()`.
fn char_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(byte_idx, _)| byte_idx)
        .unwrap_or(s.len())
}

/// Collapse runs of whitespace in `s` to a single space.
fn collapse_whitespace(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_ws = false;
    for ch in s.chars() {
        if ch.is_whitespace() {
            if !in_ws {
                out.push(' ');
            }
            in_ws = true;
        } else {
            out.push(ch);
            in_ws = false;
        }
    }
    out
}

/// Replace every non-escaped `(` in `regex` with a non-binding `(?:`.
///
/// Walks the string tracking an `escaped` flag: a `\` toggles it
/// (consecutive backslashes alternate), any other character clears it. Used
/// on user-supplied marker regexes so the pattern compiler controls capture
/// group numbering.
pub fn remove_regex_binding_groups(regex: &str) -> String {
    let mut out = String::with_capacity(regex.len());
    let mut escaped = false;
    for ch in regex.chars() {
        if ch == '(' && !escaped {
            out.push_str("(?:");
        } else {
            out.push(ch);
        }
        escaped = ch == '\\' && !escaped;
    }
    out
}

fn marker_grammar() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^ *(\.+) *(\w+)? *(?:/(.+)/)? *$").unwrap())
}

fn send_grammar() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"^ *(\w+) +"(.*)" *$"#).unwrap())
}

/// Classify one [`SourceLine`] into a [`Directive`], reporting any error to
/// `sink`. Blank lines and comments yield `None` with no error.
pub fn parse_directive(line: SourceLine, sink: &mut ErrorSink) -> Option<Directive> {
    let source = line.stripped().to_string();

    if source.is_empty() || source.starts_with('#') {
        return None;
    }

    if source.contains('\t') {
        sink.report_at(&line, "unexpected TAB in directive");
        return None;
    }

    if let Some(sample) = source.strip_prefix('>') {
        return Some(Directive::Template(Template {
            line,
            sample: sample.to_string(),
        }));
    }

    if let Some(payload) = source.strip_prefix('?') {
        if payload.is_empty() {
            sink.report_at(&line, "empty marker directive");
            return None;
        }
        return match marker_grammar().captures(payload) {
            Some(caps) => {
                let dots = caps.get(1).unwrap();
                let start = dots.start();
                let finish = dots.end();
                let name = caps.get(2).map(|m| m.as_str().to_string());
                let regex = caps
                    .get(3)
                    .map(|m| remove_regex_binding_groups(m.as_str()))
                    .unwrap_or_default();
                Some(Directive::Marker(Marker {
                    line,
                    start,
                    finish,
                    name,
                    regex,
                }))
            }
            None => {
                sink.report_at(&line, "malformed marker directive");
                None
            }
        };
    }

    if let Some(payload) = source.strip_prefix('!') {
        if payload.is_empty() {
            sink.report_at(&line, "empty action directive");
            return None;
        }
        return match send_grammar().captures(payload) {
            Some(caps) => {
                let channel_name = caps.get(1).unwrap().as_str().to_string();
                let message = caps.get(2).unwrap().as_str().to_string();
                if channel_name != "controller" && channel_name != "terminal" {
                    sink.report_at(
                        &line,
                        format!("invalid channel name: {channel_name}"),
                    );
                }
                Some(Directive::Send(Send {
                    line,
                    channel_name,
                    message,
                }))
            }
            None => {
                sink.report_at(&line, "malformed action directive");
                None
            }
        };
    }

    sink.report_at(&line, "unrecognized directive syntax");
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(content: &str) -> SourceLine {
        SourceLine::new("test.ash", 1, content)
    }

    fn parse(content: &str) -> (Option<Directive>, ErrorSink) {
        let mut sink = ErrorSink::new();
        let directive = parse_directive(line(content), &mut sink);
        (directive, sink)
    }

    #[test]
    fn blank_line_is_none_without_error() {
        let (d, sink) = parse("   \n");
        assert!(d.is_none());
        assert!(!sink.has_errors());
    }

    #[test]
    fn comment_is_none_without_error() {
        let (d, sink) = parse("# a comment\n");
        assert!(d.is_none());
        assert!(!sink.has_errors());
    }

    #[test]
    fn tab_in_directive_is_an_error() {
        let (d, sink) = parse(">foo\tbar\n");
        assert!(d.is_none());
        assert!(sink.has_errors());
        assert!(sink.iter().next().unwrap().contains("unexpected TAB"));
    }

    #[test]
    fn template_keeps_sample_untrimmed() {
        let (d, sink) = parse(">  Foo   \n");
        assert!(!sink.has_errors());
        match d {
            Some(Directive::Template(t)) => assert_eq!(t.sample, "  Foo   "),
            other => panic!("expected Template, got {other:?}"),
        }
    }

    #[test]
    fn empty_marker_directive_is_an_error() {
        let (d, sink) = parse("?\n");
        assert!(d.is_none());
        assert!(sink.iter().next().unwrap().contains("empty marker directive"));
    }

    #[test]
    fn malformed_marker_directive_is_an_error() {
        let (d, sink) = parse("? not-dots\n");
        assert!(d.is_none());
        assert!(sink.iter().next().unwrap().contains("malformed marker directive"));
    }

    #[test]
    fn named_marker_with_regex() {
        let (d, sink) = parse("?    ....  title  /[^:]+/\n");
        assert!(!sink.has_errors());
        match d {
            Some(Directive::Marker(m)) => {
                assert_eq!(m.start, 4);
                assert_eq!(m.finish, 8);
                assert_eq!(m.name.as_deref(), Some("title"));
                assert_eq!(m.regex, "[^:]+");
            }
            other => panic!("expected Marker, got {other:?}"),
        }
    }

    #[test]
    fn marker_regex_neutralises_capture_groups() {
        let (d, _) = parse("? .... /(a)(b)/\n");
        match d {
            Some(Directive::Marker(m)) => assert_eq!(m.regex, "(?:a)(?:b)"),
            other => panic!("expected Marker, got {other:?}"),
        }
    }

    #[test]
    fn empty_action_directive_is_an_error() {
        let (d, sink) = parse("!\n");
        assert!(d.is_none());
        assert!(sink.iter().next().unwrap().contains("empty action directive"));
    }

    #[test]
    fn malformed_action_directive_is_an_error() {
        let (d, sink) = parse("! terminal missing-quotes\n");
        assert!(d.is_none());
        assert!(sink.iter().next().unwrap().contains("malformed action directive"));
    }

    #[test]
    fn invalid_channel_name_is_reported_but_directive_still_parses() {
        let (d, sink) = parse("! bogus \"hi\"\n");
        assert!(sink.iter().next().unwrap().contains("invalid channel name: bogus"));
        match d {
            Some(Directive::Send(s)) => {
                assert_eq!(s.channel_name, "bogus");
                assert_eq!(s.channel(), None);
            }
            other => panic!("expected Send, got {other:?}"),
        }
    }

    #[test]
    fn send_references_treats_double_dollar_as_reference() {
        let send = Send {
            line: line(""),
            channel_name: "controller".into(),
            message: "$$def and $abc".into(),
        };
        let refs = send.references();
        assert!(refs.contains("def"));
        assert!(refs.contains("abc"));
    }

    #[test]
    fn send_expand_substitutes_bindings() {
        let send = Send {
            line: line(""),
            channel_name: "terminal".into(),
            message: "a $x b".into(),
        };
        let mut bindings = std::collections::HashMap::new();
        bindings.insert("x".to_string(), "FOO".to_string());
        assert_eq!(send.expand(&bindings), "a FOO b");
    }

    #[test]
    fn unrecognized_directive_syntax_is_an_error() {
        let (d, sink) = parse("@weird\n");
        assert!(d.is_none());
        assert!(sink.iter().next().unwrap().contains("unrecognized directive syntax"));
    }

    #[test]
    fn infer_skip_handles_multibyte_characters_before_the_boundary() {
        // "café: " has a two-byte 'é', so a char-column boundary at 6 lands
        // on a byte offset that is not a char boundary if treated as a raw
        // byte index.
        let template = Template {
            line: line(">café: x\n"),
            sample: "café: x".to_string(),
        };
        let mut sink = ErrorSink::new();
        let skip = template.infer_skip(0, 6, &mut sink);
        assert!(!sink.has_errors(), "{sink}");
        assert!(regex::Regex::new(&format!("^(?:{skip})")).unwrap().is_match("café: "));
    }

    #[test]
    fn marker_infer_regex_handles_multibyte_characters_before_the_marker() {
        // "café: xyz": chars are c,a,f,é,:,' ',x,y,z. Marking chars 6..8
        // ("xy") requires translating those char-column indices past the
        // two-byte 'é' into byte offsets before slicing the sample.
        let mut marker = Marker::new_for_test(line("?\n"), 6, 8, None, String::new());
        let mut sink = ErrorSink::new();
        let regex = marker.infer_regex("café: xyz", &mut sink);
        assert!(!sink.has_errors(), "{sink}");
        let compiled = Regex::new(&format!("^(?:{regex})")).unwrap();
        assert_eq!(compiled.find("xyz").unwrap().as_str(), "xy");
    }

    #[test]
    fn remove_regex_binding_groups_is_idempotent() {
        // Escaped parens are literal characters, not capture groups, so they
        // pass through untouched on every application.
        let once = remove_regex_binding_groups(r"a\(b\)");
        assert_eq!(once, r"a\(b\)");
        let twice = remove_regex_binding_groups(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn remove_regex_binding_groups_rewrites_unescaped_parens() {
        assert_eq!(remove_regex_binding_groups("(a)(b)"), "(?:a)(?:b)");
    }
}
