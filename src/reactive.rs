//! Reactive compiler (grouping directives by indentation into pattern+action
//! units) and the match driver that runs a compiled Reactive against the
//! live line buffer.

use std::collections::HashMap;

use crate::buffer::LineBuffer;
use crate::channels::Channels;
use crate::directive::{Directive, Marker, Send, Template};
use crate::pattern::Pattern;
use crate::types::ErrorSink;

/// One `(indent, lineno)` pair in a reactive's ancestry.
pub type NestingEntry = (usize, usize);

/// One compiled template with its markers, paired up during structural split.
type TemplateGroup = (Template, Vec<Marker>);

/// Shared, mutable ancestry state threaded through one pass of the match
/// driver over every configured Reactive.
#[derive(Debug, Default, Clone)]
pub struct MatchState {
    /// Stack of `(indent, lineno)` ancestry, most recently satisfied nesting last.
    pub nesting: Vec<NestingEntry>,
}

/// A group of Patterns followed by Sends sharing one indentation level.
#[derive(Debug)]
pub struct Reactive {
    patterns: Vec<Pattern>,
    actions: Vec<Send>,
    nesting: Vec<NestingEntry>,
}

impl Reactive {
    /// Compile one contiguous, uniform-indent group of directives into a
    /// Reactive, pushing onto (and snapshotting) the shared `nesting` stack.
    ///
    /// `group` must be non-empty. Returns `None` if structural errors make
    /// the group uncompilable (no templates, directives out of order).
    pub fn compile(
        group: &[Directive],
        nesting_stack: &mut Vec<NestingEntry>,
        sink: &mut ErrorSink,
    ) -> Option<Self> {
        let first_line = group[0].line().clone();
        let indent = first_line.indent();
        for directive in group {
            if directive.line().indent() != indent {
                sink.report_at(directive.line(), "indentation change in a group");
                return None;
            }
        }

        while let Some(&(top_indent, _)) = nesting_stack.last() {
            if top_indent >= indent {
                nesting_stack.pop();
            } else {
                break;
            }
        }
        nesting_stack.push((indent, first_line.lineno));
        let nesting = nesting_stack.clone();

        let (templates_and_markers, actions) = split_structure(group, sink)?;
        if templates_and_markers.is_empty() {
            sink.report_at(&first_line, "group has no templates");
            return None;
        }

        let mut patterns: Vec<Pattern> = templates_and_markers
            .into_iter()
            .map(|(template, mut markers)| Pattern::compile(&template, &mut markers, sink))
            .collect();
        let last = patterns.len() - 1;
        for pattern in patterns.iter_mut().take(last) {
            pattern.attach_eol();
        }

        let bound: std::collections::BTreeSet<String> = patterns
            .iter()
            .flat_map(|p| p.bound_names())
            .filter_map(|n| n.clone())
            .collect();
        for action in &actions {
            for name in action.references() {
                if !bound.contains(&name) {
                    sink.report_at(&action.line, format!("unbound name: {name}"));
                }
            }
        }

        Some(Self {
            patterns,
            actions,
            nesting,
        })
    }

    /// This reactive's ancestry snapshot, outermost first.
    pub fn nesting(&self) -> &[NestingEntry] {
        &self.nesting
    }

    /// Run this reactive against `buf` at index `bound`, mutating `state`
    /// and firing sends on success. Returns the signed advance directive
    /// (see module docs on [`crate::reactive`]).
    pub fn react(&self, state: &mut MatchState, buf: &LineBuffer, bound: usize, channels: &mut Channels) -> isize {
        let ancestry = &self.nesting[..self.nesting.len() - 1];
        let observed = if state.nesting.len() >= ancestry.len() {
            &state.nesting[..ancestry.len()]
        } else {
            &state.nesting[..]
        };
        if observed != ancestry {
            return buf.bound() as isize;
        }

        let start = bound as isize - self.patterns.len() as isize;
        if start < buf.baseline() as isize {
            return buf.baseline() as isize;
        }
        let start = start as usize;

        let mut bindings = HashMap::new();
        for (offset, pattern) in self.patterns.iter().enumerate() {
            let i = start + offset;
            let line = buf.get_line(i);
            if !pattern.matches(line, &mut bindings) {
                return if i < buf.bound() - 1 {
                    (start + 1) as isize
                } else {
                    start as isize
                };
            }
        }

        for action in &self.actions {
            if let Some(channel) = action.channel() {
                let payload = action.expand(&bindings);
                channels.write(channel, &payload);
            }
        }
        state.nesting = self.nesting.clone();

        let final_pattern = self.patterns.last().expect("patterns is non-empty");
        if final_pattern.regex_source().is_empty() {
            1 - bound as isize
        } else {
            -(bound as isize)
        }
    }
}

/// Split a flat directive stream into maximal indent-uniform groups and
/// compile each into a Reactive, threading one shared nesting stack.
///
/// A run boundary is any directive whose indent differs from its
/// predecessor's in this already-filtered (blank/comment-free) sequence.
pub fn compile_all(directives: Vec<Directive>, sink: &mut ErrorSink) -> Vec<Reactive> {
    let mut stack: Vec<NestingEntry> = Vec::new();
    let mut reactives = Vec::new();
    let mut current: Vec<Directive> = Vec::new();
    let mut current_indent = None;

    for directive in directives {
        let indent = directive.line().indent();
        if current_indent.is_some() && current_indent != Some(indent) {
            if let Some(reactive) = Reactive::compile(&current, &mut stack, sink) {
                reactives.push(reactive);
            }
            current.clear();
        }
        current_indent = Some(indent);
        current.push(directive);
    }
    if !current.is_empty()
        && let Some(reactive) = Reactive::compile(&current, &mut stack, sink)
    {
        reactives.push(reactive);
    }

    reactives
}

/// Split a structurally-valid group into `(template, markers)` pairs
/// followed by a trailing run of sends. Any other shape is a user error.
fn split_structure(
    group: &[Directive],
    sink: &mut ErrorSink,
) -> Option<(Vec<TemplateGroup>, Vec<Send>)> {
    let mut templates: Vec<TemplateGroup> = Vec::new();
    let mut actions: Vec<Send> = Vec::new();
    let mut seen_action = false;

    for directive in group {
        match directive {
            Directive::Template(t) => {
                if seen_action {
                    sink.report_at(&t.line, "template/marker after action");
                    return None;
                }
                templates.push((t.clone(), Vec::new()));
            }
            Directive::Marker(m) => {
                if seen_action {
                    sink.report_at(&m.line, "template/marker after action");
                    return None;
                }
                match templates.last_mut() {
                    Some((_, markers)) => markers.push(m.clone()),
                    None => {
                        sink.report_at(&m.line, "template/marker after action");
                        return None;
                    }
                }
            }
            Directive::Send(s) => {
                seen_action = true;
                actions.push(s.clone());
            }
        }
    }

    Some((templates, actions))
}
