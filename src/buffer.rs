//! Incremental line buffer fed by raw PTY output.
//!
//! Lines are addressed by a monotonically increasing index. `baseline` is
//! the smallest index still retained; `bound()` is one past the largest
//! retrievable index, and the line at `bound() - 1` is always the partial,
//! not-yet-newline-terminated tail.

use std::collections::VecDeque;

/// Sliding window of terminal output lines, indexed `[baseline, bound)`.
#[derive(Debug, Default)]
pub struct LineBuffer {
    baseline: usize,
    completed: VecDeque<String>,
    tail: String,
}

impl LineBuffer {
    /// A fresh buffer: `baseline = 1`, `bound = 2`, empty partial tail.
    pub fn new() -> Self {
        Self {
            baseline: 1,
            completed: VecDeque::new(),
            tail: String::new(),
        }
    }

    /// Current lower bound (smallest retrievable index).
    pub fn baseline(&self) -> usize {
        self.baseline
    }

    /// Current exclusive upper bound; `bound() - 1` is the partial tail.
    pub fn bound(&self) -> usize {
        self.baseline + self.completed.len() + 1
    }

    /// Append raw bytes (already UTF-8 checked by the caller) onto the
    /// partial tail, splitting completed lines off on `\n`.
    ///
    /// `a\r\nb` yields one completed line `a` and a new tail `b`. A lone
    /// `\r` with no following `\n` stays in the tail verbatim — it might
    /// still turn into a CRLF boundary on the next call.
    pub fn append_raw(&mut self, chunk: &str) {
        if chunk.is_empty() {
            return;
        }
        self.tail.push_str(chunk);
        if !self.tail.contains('\n') {
            return;
        }

        let combined = std::mem::take(&mut self.tail);
        let mut parts: Vec<&str> = combined.split('\n').collect();
        // `split` always yields the text after the last '\n' as its final
        // element (empty if the chunk ended exactly on a newline); that is
        // the new tail, not a completed line.
        let new_tail = parts.pop().expect("split always yields at least one part").to_string();

        for line in parts {
            self.completed.push_back(trim_trailing_cr(line));
        }
        self.tail = new_tail;
    }

    /// Discard lines below `new` and move the baseline forward.
    ///
    /// `new` must satisfy `baseline <= new <= bound()`; violating this is a
    /// program bug, not a user error.
    pub fn update_baseline(&mut self, new: usize) {
        assert!(
            new >= self.baseline && new <= self.bound(),
            "update_baseline({new}) out of range [{}, {}]",
            self.baseline,
            self.bound()
        );
        let advance = new - self.baseline;
        for _ in 0..advance {
            self.completed.pop_front();
        }
        self.baseline = new;
    }

    /// Retrieve the (possibly partial) line at index `k`.
    ///
    /// `k` must satisfy `baseline <= k < bound()`; violating this is a
    /// program bug, not a user error.
    pub fn get_line(&self, k: usize) -> &str {
        assert!(
            k >= self.baseline && k < self.bound(),
            "get_line({k}) out of range [{}, {})",
            self.baseline,
            self.bound()
        );
        if k == self.bound() - 1 {
            &self.tail
        } else {
            &self.completed[k - self.baseline]
        }
    }
}

fn trim_trailing_cr(s: &str) -> String {
    s.trim_end_matches('\r').to_string()
}
