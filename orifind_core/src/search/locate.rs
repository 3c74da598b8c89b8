//! Literal substring matching within one text value.

use std::ops::Range;

use super::SearchOptions;

/// Find every non-overlapping occurrence of `query` in `text`.
///
/// Returns byte ranges into `text`, left to right. After an accepted
/// match the search resumes at its end, so `"aa"` in `"aaaa"` yields two
/// ranges. A candidate rejected by the whole-word check only advances one
/// character. An empty query yields nothing.
pub fn locate(text: &str, query: &str, options: SearchOptions) -> Vec<Range<usize>> {
    if query.is_empty() || text.is_empty() {
        return Vec::new();
    }

    if options.case_sensitive {
        return find_all(text, text, query, Some, options.whole_word);
    }

    let folded = Folded::new(text);
    let needle: String = query.chars().flat_map(char::to_lowercase).collect();
    find_all(text, &folded.text, &needle, |i| folded.origin(i), options.whole_word)
}

/// Word characters for whole-word matching: alphanumerics and `_`.
pub fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Scan `haystack` for `needle` and map hits back onto `original`.
///
/// `origin` maps a haystack byte offset to the matching offset in
/// `original`, or `None` when the offset falls inside one original
/// character (a partial case-fold expansion). Such hits are rejected.
fn find_all(
    original: &str,
    haystack: &str,
    needle: &str,
    origin: impl Fn(usize) -> Option<usize>,
    whole_word: bool,
) -> Vec<Range<usize>> {
    let mut out = Vec::new();
    let mut from = 0;

    while let Some(pos) = haystack.get(from..).and_then(|h| h.find(needle)) {
        let hit_start = from + pos;
        let hit_end = hit_start + needle.len();

        let accepted = match (origin(hit_start), origin(hit_end)) {
            (Some(start), Some(end))
                if start < end && (!whole_word || is_word_bounded(original, start, end)) =>
            {
                Some(start..end)
            }
            _ => None,
        };

        match accepted {
            Some(range) => {
                out.push(range);
                from = hit_end;
            }
            None => {
                let step = haystack
                    .get(hit_start..)
                    .and_then(|h| h.chars().next())
                    .map_or(1, char::len_utf8);
                from = hit_start + step;
            }
        }
    }

    out
}

/// Whether `text[start..end]` has no word character on either side.
fn is_word_bounded(text: &str, start: usize, end: usize) -> bool {
    let before = text.get(..start).and_then(|t| t.chars().next_back());
    let after = text.get(end..).and_then(|t| t.chars().next());
    !before.is_some_and(is_word_char) && !after.is_some_and(is_word_char)
}

/// Lower-cased copy of a string with an offset map back to the original.
struct Folded {
    text: String,
    /// For each byte of `text` (plus one past the end): the original byte
    /// offset if this byte starts the fold of an original character.
    origin: Vec<Option<usize>>,
}

impl Folded {
    fn new(original: &str) -> Self {
        let mut text = String::with_capacity(original.len());
        let mut origin = Vec::with_capacity(original.len() + 1);
        for (at, ch) in original.char_indices() {
            origin.push(Some(at));
            text.extend(ch.to_lowercase());
            origin.resize(text.len(), None);
        }
        origin.push(Some(original.len()));
        Self { text, origin }
    }

    fn origin(&self, folded: usize) -> Option<usize> {
        self.origin.get(folded).copied().flatten()
    }
}
