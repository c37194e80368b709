//! Whitespace tidying for text extracted from markup.
//!
//! Readers that walk HTML or XML trees produce text with indentation and
//! blank lines from the source markup. [`tidy_whitespace`] squeezes that down
//! while keeping line structure, so snippets shown to subscribers still read
//! like paragraphs.
//!
//! ```rust
//! use canonical::tidy_whitespace;
//!
//! assert_eq!(tidy_whitespace("  Argus \t Panoptes\n\n\n  giant  "), "Argus Panoptes\ngiant");
//! ```

/// Collapse each whitespace run to one character and trim the ends.
///
/// A run that contains a line break becomes `'\n'`; any other run becomes a
/// single ASCII space. Every Unicode whitespace character counts, including
/// the non-breaking space.
pub fn tidy_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending: Option<char> = None;

    for ch in text.chars() {
        if ch.is_whitespace() {
            let breaks_line = matches!(ch, '\n' | '\r' | '\u{2028}' | '\u{2029}');
            pending = match pending {
                Some('\n') => Some('\n'),
                _ if breaks_line => Some('\n'),
                _ => Some(' '),
            };
            continue;
        }
        if let Some(sep) = pending.take() {
            if !out.is_empty() {
                out.push(sep);
            }
        }
        out.push(ch);
    }

    out
}
