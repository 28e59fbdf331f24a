//! Source lines from an Ashier configuration file

/// One line of an Ashier configuration file.
///
/// Carries enough provenance to qualify every error message with
/// `file:lineno`, and the two small text transforms ([`SourceLine::indent`],
/// [`SourceLine::stripped`]) that every directive classification depends on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLine {
    /// Name of the configuration file this line came from.
    pub file: String,
    /// 1-based line number within the file.
    pub lineno: usize,
    /// Raw content of the line, including any trailing newline.
    pub content: String,
}

impl SourceLine {
    /// Create a new source line.
    pub fn new(file: impl Into<String>, lineno: usize, content: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            lineno,
            content: content.into(),
        }
    }

    /// Number of leading spaces after tab-expansion (tab stops every 8 columns).
    pub fn indent(&self) -> usize {
        let expanded = expand_tabs(&self.content, 8);
        expanded.len() - expanded.trim_start_matches(' ').len()
    }

    /// Content with leading whitespace and the trailing newline stripped.
    ///
    /// Unlike [`SourceLine::indent`], this does not tab-expand: it only trims
    /// whitespace so that directive payloads keep their original column
    /// positions relative to `>`/`?`/`!`.
    pub fn stripped(&self) -> &str {
        self.content
            .trim_start_matches([' ', '\t'])
            .trim_end_matches('\n')
    }

    /// Prefix a message with this line's `file:lineno  ` header.
    pub fn with_header(&self, msg: impl AsRef<str>) -> String {
        format!("{}:{}  {}", self.file, self.lineno, msg.as_ref())
    }
}

/// Expand tabs to the next multiple of `width`, Python `str.expandtabs`-style.
fn expand_tabs(s: &str, width: usize) -> String {
    let mut out = String::with_capacity(s.len());
    let mut col = 0usize;
    for ch in s.chars() {
        match ch {
            '\t' => {
                let advance = width - (col % width);
                out.extend(std::iter::repeat_n(' ', advance));
                col += advance;
            }
            '\n' => {
                out.push(ch);
                col = 0;
            }
            _ => {
                out.push(ch);
                col += 1;
            }
        }
    }
    out
}
