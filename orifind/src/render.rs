//! Plain-text presentation of search state for the terminal.

use unicode_width::UnicodeWidthStr;

use orifind_core::{Document, NodeId, NodeKind, SearchOptions, SearchStatus, TextSource};

/// Status line with option indicators, e.g. `2 of 5 results  [Aa] [W]`.
pub fn status(status: &SearchStatus, options: SearchOptions) -> String {
    let mut line = status.status_line();
    if options.case_sensitive {
        line.push_str("  [Aa]");
    }
    if options.whole_word {
        line.push_str("  [W]");
    }
    line
}

/// The line holding highlight `mark`, followed by a caret row under the
/// matched text. `None` if the marker is gone.
pub fn focus(doc: &Document, index: usize, mark: NodeId) -> Option<String> {
    if !doc.contains(mark) {
        return None;
    }
    let line = enclosing_line(doc, mark);

    let mut prefix = String::new();
    for id in doc.descendants(line) {
        if id == mark {
            break;
        }
        if let Some(text) = doc.text(id) {
            prefix.push_str(text);
        }
    }

    let text = doc.text_content(line);
    let hit = doc.text_content(mark);
    let pad = " ".repeat(prefix.width());
    let carets = "^".repeat(hit.width().max(1));
    Some(format!("{index:>4}: {text}\n      {pad}{carets}"))
}

/// Nearest `line` element above `id`, or its parent when there is none.
fn enclosing_line(doc: &Document, id: NodeId) -> NodeId {
    let mut cur = doc.parent(id);
    while let Some(n) = cur {
        if matches!(doc.kind(n), Some(NodeKind::Element(tag)) if tag == "line") {
            return n;
        }
        cur = doc.parent(n);
    }
    doc.parent(id).unwrap_or(id)
}
