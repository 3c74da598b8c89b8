//! Arena-backed content tree with in-place highlight markers.
//!
//! A `Document` is the concrete [`TextSource`] the engine ships with. It
//! models the subset of a rendered page that search cares about: container
//! elements, text nodes, and `Mark` nodes that wrap one matched text run.
//! Marks are indexed by sequence number so navigation can re-resolve them
//! live instead of holding references across mutations.

use std::collections::{HashMap, HashSet};
use std::ops::Range;
use std::sync::atomic::{AtomicU64, Ordering};

use bitflags::bitflags;

use crate::highlight::MaterializeError;
use crate::source::{NodeId, TextSource};

/// Source of node identities, shared by every document in the process so
/// an id read from one tree never resolves in another.
static NEXT_ID: AtomicU64 = AtomicU64::new(0);

fn next_id() -> NodeId {
    NodeId(NEXT_ID.fetch_add(1, Ordering::Relaxed))
}

bitflags! {
    /// Per-node rendering flags relevant to search.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct NodeFlags: u8 {
        /// UI chrome (toolbars, buttons). Excluded with its subtree.
        const NO_SEARCH = 1 << 0;
        /// Not rendered. Excluded with its subtree.
        const HIDDEN    = 1 << 1;
    }
}

/// What a node is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// Container with a tag name (`p`, `section`, ...).
    Element(String),
    /// A run of text.
    Text(String),
    /// Highlight marker wrapping one text child.
    Mark {
        /// Zero-based position in the applied match set.
        seq: usize,
        /// Whether this is the focused match.
        current: bool,
    },
}

/// One range handed to [`Document::wrap_ranges`]: bytes `range` of text
/// node `node`, to become marker `seq`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrapRange {
    pub node: NodeId,
    pub range: Range<usize>,
    pub seq: usize,
}

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    flags: NodeFlags,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    fn new(kind: NodeKind, parent: Option<NodeId>) -> Self {
        Self {
            kind,
            flags: NodeFlags::empty(),
            parent,
            children: Vec::new(),
        }
    }
}

/// A mutable content tree.
#[derive(Debug, Clone)]
pub struct Document {
    nodes: HashMap<NodeId, Node>,
    root: NodeId,
    /// Live highlight markers by sequence index.
    marks: HashMap<usize, NodeId>,
}

impl Document {
    /// Create a document holding only a root element.
    pub fn new(root_tag: &str) -> Self {
        let root = next_id();
        let mut nodes = HashMap::new();
        nodes.insert(root, Node::new(NodeKind::Element(root_tag.to_owned()), None));
        Self {
            nodes,
            root,
            marks: HashMap::new(),
        }
    }

    /// Build a document from plain text.
    ///
    /// Blank lines separate paragraphs. Each paragraph becomes a `p`
    /// element holding one `line` element per line, and each line one
    /// text node.
    pub fn from_plain_text(text: &str) -> Self {
        let mut doc = Self::new("body");
        let root = doc.root;
        let mut para: Option<NodeId> = None;
        for line in text.lines() {
            if line.trim().is_empty() {
                para = None;
                continue;
            }
            let p = match para {
                Some(p) => p,
                None => {
                    let Some(p) = doc.append_element(root, "p") else {
                        continue;
                    };
                    para = Some(p);
                    p
                }
            };
            if let Some(l) = doc.append_element(p, "line") {
                doc.append_text(l, line);
            }
        }
        doc
    }

    /// Number of attached nodes, root included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the document holds only its root.
    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    /// Append a container element under `parent`.
    ///
    /// Returns `None` if `parent` is missing or cannot hold children.
    pub fn append_element(&mut self, parent: NodeId, tag: &str) -> Option<NodeId> {
        self.append(parent, NodeKind::Element(tag.to_owned()))
    }

    /// Append a text node under `parent`.
    pub fn append_text(&mut self, parent: NodeId, text: &str) -> Option<NodeId> {
        self.append(parent, NodeKind::Text(text.to_owned()))
    }

    fn append(&mut self, parent: NodeId, kind: NodeKind) -> Option<NodeId> {
        let holder = self.nodes.get(&parent)?;
        if matches!(holder.kind, NodeKind::Text(_)) {
            return None;
        }
        let id = self.alloc(kind, Some(parent));
        self.nodes.get_mut(&parent)?.children.push(id);
        Some(id)
    }

    fn alloc(&mut self, kind: NodeKind, parent: Option<NodeId>) -> NodeId {
        let id = next_id();
        self.nodes.insert(id, Node::new(kind, parent));
        id
    }

    /// Detach and drop `id` with its whole subtree.
    ///
    /// Markers inside the subtree are forgotten, so later lookups by
    /// sequence index fail. The root cannot be removed.
    pub fn remove(&mut self, id: NodeId) -> bool {
        let Some(parent) = self.nodes.get(&id).and_then(|n| n.parent) else {
            return false;
        };
        if let Some(p) = self.nodes.get_mut(&parent) {
            p.children.retain(|&c| c != id);
        }
        for gone in self.descendants(id) {
            if let Some(node) = self.nodes.remove(&gone) {
                if let NodeKind::Mark { seq, .. } = node.kind {
                    if self.marks.get(&seq) == Some(&gone) {
                        self.marks.remove(&seq);
                    }
                }
            }
        }
        true
    }

    /// Replace the value of a text node.
    pub fn set_text(&mut self, id: NodeId, text: &str) -> bool {
        match self.nodes.get_mut(&id).map(|n| &mut n.kind) {
            Some(NodeKind::Text(t)) => {
                text.clone_into(t);
                true
            }
            _ => false,
        }
    }

    /// Flags of `id`, empty for unknown nodes.
    pub fn flags(&self, id: NodeId) -> NodeFlags {
        self.nodes.get(&id).map(|n| n.flags).unwrap_or_default()
    }

    /// Replace the flags of `id`.
    pub fn set_flags(&mut self, id: NodeId, flags: NodeFlags) -> bool {
        match self.nodes.get_mut(&id) {
            Some(n) => {
                n.flags = flags;
                true
            }
            None => false,
        }
    }

    /// Kind of `id`, if attached.
    pub fn kind(&self, id: NodeId) -> Option<&NodeKind> {
        self.nodes.get(&id).map(|n| &n.kind)
    }

    /// Parent of `id`. `None` for the root and for unknown nodes.
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(&id).and_then(|n| n.parent)
    }

    /// Concatenated text of `id` and its subtree in document order.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        for n in self.descendants(id) {
            if let Some(NodeKind::Text(t)) = self.kind(n) {
                out.push_str(t);
            }
        }
        out
    }

    /// `id` followed by all of its descendants, pre-order.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(n) = stack.pop() {
            let Some(node) = self.nodes.get(&n) else {
                continue;
            };
            out.push(n);
            stack.extend(node.children.iter().rev());
        }
        out
    }

    // ---------------------------------------------------------------------
    // Highlight markers
    // ---------------------------------------------------------------------

    /// Wrap bytes `start..end` of text node `id` in a new `Mark`.
    ///
    /// The original node keeps the text before the range (and is dropped if
    /// that is empty), the mark gets a fresh text child holding the range,
    /// and any text after the range moves to a new sibling. Returns the
    /// mark's id.
    pub fn wrap_range(
        &mut self,
        id: NodeId,
        start: usize,
        end: usize,
        seq: usize,
    ) -> Result<NodeId, MaterializeError> {
        let range = WrapRange {
            node: id,
            range: start..end,
            seq,
        };
        if let Some((_, e)) = self.wrap_ranges(&[range]).pop() {
            return Err(e);
        }
        self.marks.get(&seq).copied().ok_or(MaterializeError::NodeMissing(id))
    }

    /// Wrap many ranges at once. Returns the rejected ones with their
    /// sequence index.
    ///
    /// Ranges of one node may come in any order but must not overlap; a
    /// range overlapping an earlier accepted one is rejected. Each text node
    /// is split in a single pass and each affected parent's child list is
    /// rebuilt once, so the cost is linear in the text and children touched.
    pub fn wrap_ranges(&mut self, ranges: &[WrapRange]) -> Vec<(usize, MaterializeError)> {
        let mut rejected = Vec::new();

        let mut by_node: HashMap<NodeId, Vec<(Range<usize>, usize)>> = HashMap::new();
        for r in ranges {
            by_node.entry(r.node).or_default().push((r.range.clone(), r.seq));
        }

        let mut by_parent: HashMap<NodeId, HashMap<NodeId, Vec<(Range<usize>, usize)>>> =
            HashMap::new();
        for (id, mut runs) in by_node {
            let parent = match self.validate_text(id) {
                Ok(parent) => parent,
                Err(e) => {
                    rejected.extend(runs.into_iter().map(|(_, seq)| (seq, e.clone())));
                    continue;
                }
            };
            runs.sort_by_key(|(r, _)| r.start);
            let text = self.text(id).unwrap_or_default();
            let mut accepted: Vec<(Range<usize>, usize)> = Vec::with_capacity(runs.len());
            for (range, seq) in runs {
                let after_prev = accepted.last().is_none_or(|(prev, _)| range.start >= prev.end);
                if range.start >= range.end
                    || range.end > text.len()
                    || !text.is_char_boundary(range.start)
                    || !text.is_char_boundary(range.end)
                    || !after_prev
                {
                    let e = MaterializeError::InvalidRange {
                        node: id,
                        start: range.start,
                        end: range.end,
                    };
                    rejected.push((seq, e));
                    continue;
                }
                accepted.push((range, seq));
            }
            if !accepted.is_empty() {
                by_parent.entry(parent).or_default().insert(id, accepted);
            }
        }

        for (parent, mut runs) in by_parent {
            let Some(old) = self.nodes.get_mut(&parent).map(|p| std::mem::take(&mut p.children))
            else {
                continue;
            };
            let mut children = Vec::with_capacity(old.len() + 2 * runs.len());
            for child in old {
                match runs.remove(&child) {
                    Some(ranges) => self.split_text(child, parent, &ranges, &mut children),
                    None => children.push(child),
                }
            }
            if let Some(p) = self.nodes.get_mut(&parent) {
                p.children = children;
            }
        }

        rejected
    }

    /// Attached text node with a parent, or why not.
    fn validate_text(&self, id: NodeId) -> Result<NodeId, MaterializeError> {
        let node = self.nodes.get(&id).ok_or(MaterializeError::NodeMissing(id))?;
        if !matches!(node.kind, NodeKind::Text(_)) {
            return Err(MaterializeError::NotText(id));
        }
        node.parent.ok_or(MaterializeError::NotText(id))
    }

    /// Split text node `id` around sorted, checked `ranges`, pushing the
    /// resulting siblings onto `out`. `id` keeps the leading text.
    fn split_text(
        &mut self,
        id: NodeId,
        parent: NodeId,
        ranges: &[(Range<usize>, usize)],
        out: &mut Vec<NodeId>,
    ) {
        let text = match self.nodes.get_mut(&id).map(|n| &mut n.kind) {
            Some(NodeKind::Text(t)) => std::mem::take(t),
            _ => {
                out.push(id);
                return;
            }
        };

        let mut cursor = 0;
        for (i, (range, seq)) in ranges.iter().enumerate() {
            let gap = text.get(cursor..range.start).unwrap_or_default();
            if i == 0 {
                if gap.is_empty() {
                    self.nodes.remove(&id);
                } else {
                    self.set_text(id, gap);
                    out.push(id);
                }
            } else if !gap.is_empty() {
                out.push(self.alloc(NodeKind::Text(gap.to_owned()), Some(parent)));
            }

            let mark = self.alloc(
                NodeKind::Mark {
                    seq: *seq,
                    current: false,
                },
                Some(parent),
            );
            let matched = text.get(range.clone()).unwrap_or_default().to_owned();
            let inner = self.alloc(NodeKind::Text(matched), Some(mark));
            if let Some(m) = self.nodes.get_mut(&mark) {
                m.children.push(inner);
            }
            self.marks.insert(*seq, mark);
            out.push(mark);
            cursor = range.end;
        }

        let tail = text.get(cursor..).unwrap_or_default();
        if !tail.is_empty() {
            out.push(self.alloc(NodeKind::Text(tail.to_owned()), Some(parent)));
        }
    }

    /// Replace a mark by its children without merging text.
    ///
    /// Returns the mark's former parent so callers can [`normalize`] it
    /// once after unwrapping many marks.
    ///
    /// [`normalize`]: Self::normalize
    pub fn unwrap_mark(&mut self, id: NodeId) -> Option<NodeId> {
        let node = self.nodes.get(&id)?;
        let NodeKind::Mark { seq, .. } = node.kind else {
            return None;
        };
        let parent = node.parent?;
        let children = node.children.clone();

        let parent_node = self.nodes.get_mut(&parent)?;
        let pos = parent_node.children.iter().position(|&c| c == id)?;
        parent_node.children.splice(pos..=pos, children.iter().copied());
        for c in &children {
            if let Some(child) = self.nodes.get_mut(c) {
                child.parent = Some(parent);
            }
        }
        self.nodes.remove(&id);
        if self.marks.get(&seq) == Some(&id) {
            self.marks.remove(&seq);
        }
        Some(parent)
    }

    /// Unwrap every marker and normalize each affected parent. Returns the
    /// number of markers removed.
    ///
    /// Each parent's child list is rebuilt once, however many markers it
    /// holds.
    pub fn unwrap_all_marks(&mut self) -> usize {
        let marks = self.marks();
        let mut parents: Vec<NodeId> = Vec::new();
        let mut seen = HashSet::new();
        for mark in &marks {
            if let Some(parent) = self.parent(*mark) {
                if seen.insert(parent) {
                    parents.push(parent);
                }
            }
        }

        for &parent in &parents {
            let Some(old) = self.nodes.get_mut(&parent).map(|p| std::mem::take(&mut p.children))
            else {
                continue;
            };
            let mut children = Vec::with_capacity(old.len());
            for child in old {
                if !matches!(self.kind(child), Some(NodeKind::Mark { .. })) {
                    children.push(child);
                    continue;
                }
                let Some(mark) = self.nodes.remove(&child) else {
                    continue;
                };
                for c in &mark.children {
                    if let Some(n) = self.nodes.get_mut(c) {
                        n.parent = Some(parent);
                    }
                }
                children.extend(mark.children);
            }
            if let Some(p) = self.nodes.get_mut(&parent) {
                p.children = children;
            }
            self.normalize(parent);
        }

        self.marks.clear();
        marks.len()
    }

    /// Merge adjacent text children of `id` and drop empty ones.
    ///
    /// The first node of each run keeps its identity and absorbs the rest.
    pub fn normalize(&mut self, id: NodeId) {
        let Some(children) = self.nodes.get(&id).map(|n| n.children.clone()) else {
            return;
        };
        let mut kept: Vec<NodeId> = Vec::with_capacity(children.len());
        for child in children {
            let Some(NodeKind::Text(text)) = self.kind(child).cloned() else {
                kept.push(child);
                continue;
            };
            let prev_text = kept
                .last()
                .copied()
                .filter(|&p| matches!(self.kind(p), Some(NodeKind::Text(_))));
            match prev_text {
                Some(prev) => {
                    if let Some(NodeKind::Text(t)) = self.nodes.get_mut(&prev).map(|n| &mut n.kind) {
                        t.push_str(&text);
                    }
                    self.nodes.remove(&child);
                }
                None if text.is_empty() => {
                    self.nodes.remove(&child);
                }
                None => kept.push(child),
            }
        }
        if let Some(node) = self.nodes.get_mut(&id) {
            node.children = kept;
        }
    }

    /// Live lookup of the marker with sequence index `seq`.
    pub fn mark(&self, seq: usize) -> Option<NodeId> {
        let id = *self.marks.get(&seq)?;
        match self.kind(id) {
            Some(NodeKind::Mark { seq: s, .. }) if *s == seq => Some(id),
            _ => None,
        }
    }

    /// All attached markers in document order.
    pub fn marks(&self) -> Vec<NodeId> {
        self.descendants(self.root)
            .into_iter()
            .filter(|&n| matches!(self.kind(n), Some(NodeKind::Mark { .. })))
            .collect()
    }

    /// Renumber all markers `0..n` in document order. Returns `n`.
    pub fn renumber_marks(&mut self) -> usize {
        let ordered = self.marks();
        self.marks.clear();
        for (i, id) in ordered.iter().enumerate() {
            if let Some(NodeKind::Mark { seq, .. }) = self.nodes.get_mut(id).map(|n| &mut n.kind) {
                *seq = i;
            }
            self.marks.insert(i, *id);
        }
        ordered.len()
    }

    /// Set or clear the "current match" flag on a marker.
    pub fn set_current(&mut self, id: NodeId, on: bool) -> bool {
        match self.nodes.get_mut(&id).map(|n| &mut n.kind) {
            Some(NodeKind::Mark { current, .. }) => {
                *current = on;
                true
            }
            _ => false,
        }
    }

    /// Whether `id` is the focused marker.
    pub fn is_current(&self, id: NodeId) -> bool {
        matches!(self.kind(id), Some(NodeKind::Mark { current: true, .. }))
    }
}

impl TextSource for Document {
    fn root(&self) -> NodeId {
        self.root
    }

    fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    fn children(&self, id: NodeId) -> Vec<NodeId> {
        self.nodes.get(&id).map(|n| n.children.clone()).unwrap_or_default()
    }

    fn text(&self, id: NodeId) -> Option<&str> {
        match self.kind(id)? {
            NodeKind::Text(t) => Some(t),
            _ => None,
        }
    }

    fn is_searchable(&self, id: NodeId) -> bool {
        self.nodes
            .get(&id)
            .is_some_and(|n| !n.flags.intersects(NodeFlags::NO_SEARCH | NodeFlags::HIDDEN))
    }
}
