//! Per-character markup escaping.

use std::collections::HashMap;
use std::fmt;

/// Maps reserved characters to literal markup substitutions.
///
/// Characters without an entry render as themselves.
#[derive(Debug, Clone, Default)]
pub struct Escaper {
    table: HashMap<char, String>,
}

impl Escaper {
    /// An escaper that substitutes nothing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace the substitution for `ch`.
    pub fn with(mut self, ch: char, replacement: impl Into<String>) -> Self {
        self.insert(ch, replacement);
        self
    }

    pub fn insert(&mut self, ch: char, replacement: impl Into<String>) {
        self.table.insert(ch, replacement.into());
    }

    /// Substitution for `ch`, or `None` to render it literally.
    pub fn escape(&self, ch: char) -> Option<&str> {
        self.table.get(&ch).map(String::as_str)
    }

    /// Write the rendered form of `ch` to `out`.
    pub fn write_escaped<W: fmt::Write>(&self, ch: char, out: &mut W) -> fmt::Result {
        match self.escape(ch) {
            Some(replacement) => out.write_str(replacement),
            None => out.write_char(ch),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn html() -> Escaper {
        Escaper::new()
            .with('<', "&lt;")
            .with('>', "&gt;")
            .with('&', "&amp;")
    }

    fn escape_all(escaper: &Escaper, text: &str) -> String {
        let mut out = String::new();
        for ch in text.chars() {
            escaper.write_escaped(ch, &mut out).expect("write to String");
        }
        out
    }

    #[test]
    fn escapes_reserved_chars() {
        assert_eq!(html().escape('<'), Some("&lt;"));
        assert_eq!(html().escape('a'), None);
        assert_eq!(escape_all(&html(), "a<b>&c"), "a&lt;b&gt;&amp;c");
    }

    #[test]
    fn empty_escaper_is_identity() {
        assert_eq!(escape_all(&Escaper::new(), "<\n\t>"), "<\n\t>");
    }

    #[test]
    fn later_entry_replaces_earlier() {
        let escaper = html().with('<', "\\<");
        assert_eq!(escaper.escape('<'), Some("\\<"));
        assert_eq!(escaper.escape('&'), Some("&amp;"));
    }
}
