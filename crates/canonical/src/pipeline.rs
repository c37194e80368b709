use unicode_categories::UnicodeCategories;
use unicode_normalization::UnicodeNormalization;

/// Cleaned text together with a map back into the source text.
///
/// `offsets[i]` is the byte offset in the source of the character that
/// produced byte `i` of `text`. The map has one trailing entry equal to the
/// source length, so `offsets[text.len()]` is always valid.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanedText {
    pub text: String,
    pub offsets: Vec<usize>,
}

impl CleanedText {
    /// Translate a byte offset in the cleaned text to the source text.
    pub fn source_offset(&self, cleaned: usize) -> usize {
        let idx = cleaned.min(self.offsets.len().saturating_sub(1));
        self.offsets.get(idx).copied().unwrap_or(0)
    }
}

/// Strip non-informative punctuation and fold diacritics to base characters.
///
/// Every punctuation character becomes a single ASCII space so neighbouring
/// words still split. Characters are decomposed (NFD) and combining marks are
/// dropped; characters without a decomposition are kept as-is.
pub fn clean(input: &str) -> CleanedText {
    let mut text = String::with_capacity(input.len());
    let mut offsets = Vec::with_capacity(input.len() + 1);

    for (source_idx, ch) in input.char_indices() {
        if ch.is_punctuation() {
            push_mapped(&mut text, &mut offsets, ' ', source_idx);
            continue;
        }
        if ch.is_ascii() {
            push_mapped(&mut text, &mut offsets, ch, source_idx);
            continue;
        }
        // A single char may decompose into a base and several marks.
        for decomposed in std::iter::once(ch).nfd() {
            if decomposed.is_mark_nonspacing() {
                continue;
            }
            push_mapped(&mut text, &mut offsets, decomposed, source_idx);
        }
    }
    offsets.push(input.len());

    CleanedText { text, offsets }
}

fn push_mapped(text: &mut String, offsets: &mut Vec<usize>, ch: char, source_idx: usize) {
    text.push(ch);
    for _ in 0..ch.len_utf8() {
        offsets.push(source_idx);
    }
}
