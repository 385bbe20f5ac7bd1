//! Longest-match scanner.
//!
//! A scan walks the text left to right and covers it with non-overlapping
//! [`ScanEvent`]s. At every start candidate it explores the trie depth-first,
//! following exact characters, case variants and insignificant runs as the
//! thresholds allow, and keeps the candidate with the greatest end offset.

#[cfg(test)]
mod tests;

use std::iter::FusedIterator;
use std::ops::ControlFlow;
use std::sync::Arc;

use crate::normalize::{case_variants, CharClass, CharClasses, SEPARATOR};
use crate::trie::{EntityTrie, TrieNode};

/// Minimum normalized entity length for a relaxed comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Threshold {
    /// Never relax (`-1`).
    #[default]
    Disabled,
    /// Always relax (`0`).
    Always,
    /// Relax for entity names of at least this many normalized characters.
    AtLeast(usize),
}

impl Threshold {
    /// Map the configured integer; anything below `-1` is rejected.
    pub fn from_min_length(min_length: i64) -> Option<Self> {
        match min_length {
            -1 => Some(Threshold::Disabled),
            0 => Some(Threshold::Always),
            n if n > 0 => usize::try_from(n).ok().map(Threshold::AtLeast),
            _ => None,
        }
    }

    pub fn min_length(self) -> i64 {
        match self {
            Threshold::Disabled => -1,
            Threshold::Always => 0,
            Threshold::AtLeast(n) => n as i64,
        }
    }

    /// Whether an entity whose normalized name has `entity_len` chars may
    /// match with this relaxation.
    pub fn permits(self, entity_len: usize) -> bool {
        match self {
            Threshold::Disabled => false,
            Threshold::Always => true,
            Threshold::AtLeast(n) => entity_len >= n,
        }
    }

    fn is_disabled(self) -> bool {
        self == Threshold::Disabled
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ScanThresholds {
    pub case_insensitive: Threshold,
    pub fuzzy: Threshold,
}

/// A recognized span `[start, end)` with every id attached to the name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MatchSpan<'a> {
    pub start: usize,
    pub end: usize,
    pub ids: &'a [String],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanEvent<'a> {
    Match(MatchSpan<'a>),
    NoMatch { start: usize, end: usize },
}

impl ScanEvent<'_> {
    pub fn start(&self) -> usize {
        match self {
            ScanEvent::Match(span) => span.start,
            ScanEvent::NoMatch { start, .. } => *start,
        }
    }

    pub fn end(&self) -> usize {
        match self {
            ScanEvent::Match(span) => span.end,
            ScanEvent::NoMatch { end, .. } => *end,
        }
    }
}

/// Receiver of scan events.
///
/// Returning [`ControlFlow::Break`] stops the scan before the next start
/// candidate is examined.
pub trait MatchHandler {
    fn on_match(&mut self, text: &[char], span: &MatchSpan<'_>) -> ControlFlow<()>;

    fn on_no_match(&mut self, _text: &[char], _start: usize, _end: usize) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }
}

pub struct Scanner {
    trie: Arc<EntityTrie>,
    classes: CharClasses,
}

impl Scanner {
    /// Word characters come from the trie so text and names are classified alike.
    pub fn new(trie: Arc<EntityTrie>, no_word_before: &str, no_word_after: &str) -> Self {
        let classes = CharClasses::new(&trie.word_chars(), no_word_before, no_word_after);
        Self { trie, classes }
    }

    pub fn trie(&self) -> &EntityTrie {
        &self.trie
    }

    pub fn classes(&self) -> &CharClasses {
        &self.classes
    }

    /// Lazily cover `text` with match and no-match events.
    pub fn scan<'a>(&'a self, text: &'a [char], thresholds: ScanThresholds) -> Scan<'a> {
        Scan {
            scanner: self,
            text,
            thresholds,
            pos: 0,
        }
    }

    /// Only the matches of [`Scanner::scan`].
    pub fn matches<'a>(
        &'a self,
        text: &'a [char],
        thresholds: ScanThresholds,
    ) -> impl Iterator<Item = MatchSpan<'a>> + 'a {
        self.scan(text, thresholds).filter_map(|event| match event {
            ScanEvent::Match(span) => Some(span),
            ScanEvent::NoMatch { .. } => None,
        })
    }

    /// Push every event to `handler` until the text is covered or the handler breaks.
    pub fn scan_with<H: MatchHandler + ?Sized>(
        &self,
        text: &[char],
        thresholds: ScanThresholds,
        handler: &mut H,
    ) -> ControlFlow<()> {
        for event in self.scan(text, thresholds) {
            match event {
                ScanEvent::Match(span) => handler.on_match(text, &span)?,
                ScanEvent::NoMatch { start, end } => handler.on_no_match(text, start, end)?,
            }
        }
        ControlFlow::Continue(())
    }

    /// A match may start here: a significant character that does not continue
    /// a word and does not follow a no-word-after character.
    fn is_start(&self, text: &[char], pos: usize) -> bool {
        let Some(&c) = text.get(pos) else {
            return false;
        };
        if !self.classes.is_significant(c) {
            return false;
        }
        match pos.checked_sub(1).map(|p| text[p]) {
            None => true,
            Some(prev) => !self.classes.is_significant(prev) && !self.classes.is_no_word_after(prev),
        }
    }

    fn next_start(&self, text: &[char], from: usize) -> usize {
        (from..text.len())
            .find(|&pos| self.is_start(text, pos))
            .unwrap_or(text.len())
    }

    /// A match may end here: end of text, or a character that neither
    /// continues the word nor is a no-word-before character.
    fn is_end(&self, text: &[char], end: usize) -> bool {
        match text.get(end) {
            None => true,
            Some(&c) => !self.classes.is_significant(c) && !self.classes.is_no_word_before(c),
        }
    }

    fn longest_match<'a>(
        &'a self,
        text: &[char],
        start: usize,
        thresholds: ScanThresholds,
    ) -> Option<MatchSpan<'a>> {
        let mut best: Option<Candidate<'a>> = None;
        let mut stack = vec![Path {
            node: self.trie.root(),
            pos: start,
            depth: 0,
            cost: Cost::default(),
        }];

        while let Some(path) = stack.pop() {
            let Some(&c) = text.get(path.pos) else {
                continue;
            };
            match self.classes.classify(c) {
                CharClass::Significant => {
                    // Pushed in reverse so the exact character is explored first.
                    let mut steps: Vec<Path<'a>> = Vec::with_capacity(3);
                    for variant in case_variants(c) {
                        let folded = variant != c;
                        if folded && thresholds.case_insensitive.is_disabled() {
                            continue;
                        }
                        let Some(child) = path.node.child(variant) else {
                            continue;
                        };
                        let mut cost = path.cost;
                        cost.folds += usize::from(folded);
                        let next = Path {
                            node: child,
                            pos: path.pos + 1,
                            depth: path.depth + 1,
                            cost,
                        };
                        if child.is_terminal()
                            && self.is_end(text, next.pos)
                            && next.permitted(thresholds)
                        {
                            let candidate = Candidate {
                                end: next.pos,
                                ids: child.ids(),
                                cost,
                            };
                            if best.as_ref().map_or(true, |b| candidate.beats(b)) {
                                best = Some(candidate);
                            }
                        }
                        steps.push(next);
                    }
                    stack.extend(steps.into_iter().rev());
                }
                CharClass::Whitespace | CharClass::Noise => {
                    if path.depth == 0 {
                        continue;
                    }
                    let run = self.classes.insignificant_run(text, path.pos);
                    if run.has_noise && thresholds.fuzzy.is_disabled() {
                        continue;
                    }
                    if !run.has_whitespace {
                        let mut cost = path.cost;
                        cost.skips += 1;
                        stack.push(Path {
                            node: path.node,
                            pos: run.end,
                            depth: path.depth,
                            cost,
                        });
                    }
                    if let Some(child) = path.node.child(SEPARATOR) {
                        let mut cost = path.cost;
                        cost.fuzzy_separators += usize::from(run.has_noise);
                        stack.push(Path {
                            node: child,
                            pos: run.end,
                            depth: path.depth + 1,
                            cost,
                        });
                    }
                }
            }
        }

        best.map(|b| MatchSpan {
            start,
            end: b.end,
            ids: b.ids,
        })
    }
}

/// Relaxations used along a path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
struct Cost {
    skips: usize,
    fuzzy_separators: usize,
    folds: usize,
}

impl Cost {
    fn is_fuzzy(&self) -> bool {
        self.skips > 0 || self.fuzzy_separators > 0
    }
}

struct Path<'a> {
    node: &'a TrieNode,
    pos: usize,
    /// Normalized characters consumed, which is the entity length at a terminal.
    depth: usize,
    cost: Cost,
}

impl Path<'_> {
    fn permitted(&self, thresholds: ScanThresholds) -> bool {
        (self.cost.folds == 0 || thresholds.case_insensitive.permits(self.depth))
            && (!self.cost.is_fuzzy() || thresholds.fuzzy.permits(self.depth))
    }
}

struct Candidate<'a> {
    end: usize,
    ids: &'a [String],
    cost: Cost,
}

impl Candidate<'_> {
    /// Longer wins; at equal length, fewer relaxations. Ties keep the earlier find.
    fn beats(&self, other: &Candidate<'_>) -> bool {
        self.end > other.end || (self.end == other.end && self.cost < other.cost)
    }
}

/// Lazy event sequence returned by [`Scanner::scan`].
pub struct Scan<'a> {
    scanner: &'a Scanner,
    text: &'a [char],
    thresholds: ScanThresholds,
    pos: usize,
}

impl<'a> Iterator for Scan<'a> {
    type Item = ScanEvent<'a>;

    fn next(&mut self) -> Option<ScanEvent<'a>> {
        if self.pos >= self.text.len() {
            return None;
        }
        let start = self.pos;
        if self.scanner.is_start(self.text, start) {
            if let Some(span) = self.scanner.longest_match(self.text, start, self.thresholds) {
                self.pos = span.end;
                return Some(ScanEvent::Match(span));
            }
        }
        let end = self.scanner.next_start(self.text, start + 1);
        self.pos = end;
        Some(ScanEvent::NoMatch { start, end })
    }
}

impl FusedIterator for Scan<'_> {}
