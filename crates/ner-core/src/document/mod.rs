//! Sparse annotated text: a flat character buffer plus an element tree whose
//! nodes reference character ranges of that buffer.
//!
//! Markup never changes the text, so offsets stay valid across insertions.

mod xml;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("XML: {0}")]
    Xml(String),
    #[error("range {start}..{end} is outside the text (length {len})")]
    RangeOutOfBounds { start: usize, end: usize, len: usize },
    #[error("document has no root element")]
    NoRootElement,
}

/// How an inserted element reconciles with elements it partially overlaps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Balancing {
    /// Grow the range until it encloses every partially overlapped element.
    #[default]
    Outer,
    /// Shrink the range until it lies outside every partially overlapped element.
    Inner,
}

impl FromStr for Balancing {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "OUTER" => Ok(Balancing::Outer),
            "INNER" => Ok(Balancing::Inner),
            _ => Err(format!("unknown balancing \"{s}\", expected OUTER or INNER")),
        }
    }
}

impl TryFrom<String> for Balancing {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Balancing> for String {
    fn from(b: Balancing) -> Self {
        b.to_string()
    }
}

impl fmt::Display for Balancing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Balancing::Outer => "OUTER",
            Balancing::Inner => "INNER",
        })
    }
}

/// Split `prefix:local` into its parts.
pub fn split_qname(qname: &str) -> (Option<&str>, &str) {
    match qname.split_once(':') {
        Some((prefix, local)) => (Some(prefix), local),
        None => (None, qname),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    qualified_name: String,
    namespace_uri: Option<String>,
    /// Non-namespace attributes, in document order.
    attributes: Vec<(String, String)>,
    /// Namespace declarations written on this element in the source,
    /// `None` for the default namespace.
    declarations: Vec<(Option<String>, String)>,
    start: usize,
    end: usize,
    children: Vec<Element>,
}

impl Element {
    pub fn new(namespace_uri: Option<&str>, qualified_name: &str) -> Self {
        Self {
            qualified_name: qualified_name.to_string(),
            namespace_uri: namespace_uri.map(str::to_string),
            attributes: Vec::new(),
            declarations: Vec::new(),
            start: 0,
            end: 0,
            children: Vec::new(),
        }
    }

    pub fn qualified_name(&self) -> &str {
        &self.qualified_name
    }

    pub fn local_name(&self) -> &str {
        split_qname(&self.qualified_name).1
    }

    pub fn prefix(&self) -> Option<&str> {
        split_qname(&self.qualified_name).0
    }

    pub fn namespace_uri(&self) -> Option<&str> {
        self.namespace_uri.as_deref()
    }

    /// Same local name and namespace.
    pub fn has_name(&self, namespace_uri: Option<&str>, local_name: &str) -> bool {
        self.local_name() == local_name && self.namespace_uri() == namespace_uri
    }

    pub fn set_attribute(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attributes.iter_mut().find(|(n, _)| n == name) {
            Some(slot) => slot.1 = value,
            None => self.attributes.push((name.to_string(), value)),
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn attributes(&self) -> &[(String, String)] {
        &self.attributes
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    pub fn children(&self) -> &[Element] {
        &self.children
    }

    pub(crate) fn declare_namespace(&mut self, prefix: Option<&str>, uri: &str) {
        self.declarations
            .push((prefix.map(str::to_string), uri.to_string()));
    }

    pub(crate) fn declarations(&self) -> &[(Option<String>, String)] {
        &self.declarations
    }

    /// `self` partially overlaps `[start, end)`: one endpoint strictly inside, one strictly outside.
    fn crosses(&self, start: usize, end: usize) -> bool {
        (self.start < start && start < self.end && self.end < end)
            || (start < self.start && self.start < end && end < self.end)
    }

    fn contains_range(&self, start: usize, end: usize) -> bool {
        self.start <= start && end <= self.end
    }

    fn lies_within(&self, start: usize, end: usize) -> bool {
        start <= self.start && self.end <= end
    }

    /// Elements of this subtree in document order, `self` first.
    pub fn descendants(&self) -> impl Iterator<Item = &Element> {
        let mut stack = vec![self];
        std::iter::from_fn(move || {
            let element = stack.pop()?;
            stack.extend(element.children.iter().rev());
            Some(element)
        })
    }
}

// Drops the subtree with a worklist; nesting depth must not grow the call stack.
impl Drop for Element {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.children);
        while let Some(mut element) = pending.pop() {
            pending.append(&mut element.children);
        }
    }
}

/// A text buffer with markup that can be queried and extended.
pub trait AnnotatedDocument {
    /// The complete text, markup excluded.
    fn content(&self) -> &[char];

    /// The document element; it spans the whole text.
    fn root(&self) -> &Element;

    /// Insert `element` over `[start, end)` after balancing the range against
    /// existing markup. Returns `false` when balancing leaves nothing to mark up.
    fn insert_markup(
        &mut self,
        element: Element,
        balancing: Balancing,
        start: usize,
        end: usize,
    ) -> Result<bool, DocumentError>;
}

/// In-memory annotated document read from and written to XML.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmaxDocument {
    content: Vec<char>,
    root: Element,
}

impl SmaxDocument {
    pub fn new(content: &str, mut root: Element) -> Self {
        let content: Vec<char> = content.chars().collect();
        root.start = 0;
        root.end = content.len();
        Self { content, root }
    }

    pub fn content_string(&self) -> String {
        self.content.iter().collect()
    }

    /// Widen or narrow `[start, end)` until no element crosses it.
    fn balance(&self, balancing: Balancing, mut start: usize, mut end: usize) -> (usize, usize) {
        while let Some(element) = self.first_crossing(start, end) {
            let left = element.start < start;
            match (balancing, left) {
                (Balancing::Outer, true) => start = element.start,
                (Balancing::Outer, false) => end = element.end,
                (Balancing::Inner, true) => start = element.end,
                (Balancing::Inner, false) => end = element.start,
            }
            if start >= end {
                return (start, start);
            }
        }
        (start, end)
    }

    /// First element in document order that crosses `[start, end)`.
    ///
    /// Siblings are sorted and disjoint, so only the two children holding the
    /// range edges can lead to a crossing; subtrees wholly inside or outside
    /// the range are never visited.
    fn first_crossing(&self, start: usize, end: usize) -> Option<&Element> {
        let mut stack = vec![&self.root];
        while let Some(element) = stack.pop() {
            if element.crosses(start, end) {
                return Some(element);
            }
            let children = &element.children;
            let first = children.partition_point(|child| child.end <= start);
            let last = children.partition_point(|child| child.start < end);
            if first >= last {
                continue;
            }
            let tail = &children[last - 1];
            if last - 1 > first && !tail.lies_within(start, end) {
                stack.push(tail);
            }
            let head = &children[first];
            if !head.lies_within(start, end) {
                stack.push(head);
            }
        }
        None
    }
}

impl AnnotatedDocument for SmaxDocument {
    fn content(&self) -> &[char] {
        &self.content
    }

    fn root(&self) -> &Element {
        &self.root
    }

    fn insert_markup(
        &mut self,
        mut element: Element,
        balancing: Balancing,
        start: usize,
        end: usize,
    ) -> Result<bool, DocumentError> {
        let len = self.content.len();
        if start > end || end > len {
            return Err(DocumentError::RangeOutOfBounds { start, end, len });
        }
        let (start, end) = if start < end {
            match self.balance(balancing, start, end) {
                (s, e) if s == e => return Ok(false),
                range => range,
            }
        } else {
            (start, end)
        };

        // Deepest element containing the range; equal bounds descend further.
        let mut parent = &mut self.root;
        loop {
            let from = parent.children.partition_point(|child| child.end < end);
            let next = parent.children[from..]
                .iter()
                .take_while(|child| child.start <= start)
                .position(|child| child.start < child.end && child.contains_range(start, end));
            match next {
                Some(offset) => parent = &mut parent.children[from + offset],
                None => break,
            }
        }

        let first = parent.children.partition_point(|child| child.end <= start);
        let mut last = first;
        while let Some(child) = parent.children.get(last) {
            let inside = child.start >= start && child.end <= end;
            let empty_at_end = child.start == child.end && child.start == end;
            if !inside || empty_at_end {
                break;
            }
            last += 1;
        }

        element.start = start;
        element.end = end;
        element.children = parent.children.drain(first..last).collect();
        parent.children.insert(first, element);
        Ok(true)
    }
}
