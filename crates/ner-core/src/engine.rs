//! The recognizer: a compiled trie plus the configuration to scan with it.

use std::ops::ControlFlow;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, debug_span, info};

use crate::cache::{CacheKey, MemoryTrieCache, TrieCache};
use crate::document::{AnnotatedDocument, DocumentError};
use crate::error::NerError;
use crate::grammar::GrammarSource;
use crate::options::{EngineConfig, NerOptions};
use crate::projector::{qualifying_regions, MarkupProjector};
use crate::scanner::{MatchHandler, MatchSpan, Scanner};
use crate::trie::EntityTrie;

/// One recognized entity, detached from the scanned text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityMatch {
    pub start: usize,
    pub end: usize,
    pub text: String,
    pub ids: Vec<String>,
}

pub struct NamedEntityRecognizer {
    config: EngineConfig,
    scanner: Scanner,
}

impl NamedEntityRecognizer {
    /// Validate `options`, then load and compile `source`.
    pub fn compile(source: &GrammarSource, options: &NerOptions) -> Result<Self, NerError> {
        let config = EngineConfig::new(options)?;
        if config.cache {
            return Self::compile_cached(source, config, MemoryTrieCache::global());
        }
        let trie = source.load(&config.syntax, &config.word_chars)?;
        Ok(Self::from_trie(Arc::new(trie), config))
    }

    /// Like [`NamedEntityRecognizer::compile`], memoizing file grammars in
    /// `cache` regardless of the `cache` option.
    pub fn compile_with_cache(
        source: &GrammarSource,
        options: &NerOptions,
        cache: &dyn TrieCache,
    ) -> Result<Self, NerError> {
        let config = EngineConfig::new(options)?;
        Self::compile_cached(source, config, cache)
    }

    fn compile_cached(
        source: &GrammarSource,
        config: EngineConfig,
        cache: &dyn TrieCache,
    ) -> Result<Self, NerError> {
        let key = CacheKey::new(source, &config);
        let modified = source.modified();
        let trie = match (key, modified) {
            (Some(key), Some(modified)) => cache.get_or_compile(key, modified, &mut || {
                source.load(&config.syntax, &config.word_chars)
            })?,
            _ => Arc::new(source.load(&config.syntax, &config.word_chars)?),
        };
        Ok(Self::from_trie(trie, config))
    }

    /// Use an already compiled trie. Its word characters win over the configured ones.
    pub fn from_trie(trie: Arc<EntityTrie>, config: EngineConfig) -> Self {
        let scanner = Scanner::new(trie, &config.no_word_before, &config.no_word_after);
        Self { config, scanner }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn trie(&self) -> &EntityTrie {
        self.scanner.trie()
    }

    pub fn scanner(&self) -> &Scanner {
        &self.scanner
    }

    pub fn key_count(&self) -> usize {
        self.trie().key_count()
    }

    pub fn size_in_bytes(&self) -> usize {
        self.trie().size_in_bytes()
    }

    /// Annotate every recognized entity in `document`. Returns the number of
    /// inserted annotation elements.
    ///
    /// Matches overlapping an existing annotation element are left alone, so
    /// scanning the same document twice adds nothing.
    pub fn scan<D: AnnotatedDocument + ?Sized>(&self, document: &mut D) -> Result<usize, NerError> {
        let text = document.content().to_vec();
        let regions = match &self.config.match_within {
            Some(filter) => qualifying_regions(document.root(), filter),
            None => vec![(0, text.len())],
        };
        let annotated =
            AnnotatedRanges::new(self.config.projector.annotated_ranges(document.root()));
        let _span = debug_span!("scan", chars = text.len(), regions = regions.len()).entered();

        let mut projection = Projection {
            projector: &self.config.projector,
            document,
            annotated,
            offset: 0,
            inserted: 0,
            error: None,
        };
        for (start, end) in regions {
            projection.offset = start;
            let flow = self
                .scanner
                .scan_with(&text[start..end], self.config.thresholds, &mut projection);
            if flow.is_break() {
                break;
            }
        }
        if let Some(e) = projection.error {
            return Err(e.into());
        }
        debug!(inserted = projection.inserted);
        Ok(projection.inserted)
    }

    /// All matches in plain `text`, without touching any document.
    pub fn matches(&self, text: &str) -> Vec<EntityMatch> {
        let chars: Vec<char> = text.chars().collect();
        self.scanner
            .matches(&chars, self.config.thresholds)
            .map(|span| EntityMatch {
                start: span.start,
                end: span.end,
                text: chars[span.start..span.end].iter().collect(),
                ids: span.ids.to_vec(),
            })
            .collect()
    }

    /// Log the trie statistics at info level.
    pub fn log_stats(&self) {
        info!(
            "Trie has {} keys, {} megabytes",
            self.key_count(),
            self.size_in_bytes() / 1_048_576
        );
    }
}

/// Ranges of annotation elements present before a scan, sorted by start.
struct AnnotatedRanges {
    starts: Vec<usize>,
    /// Greatest end among the ranges up to each index.
    reach: Vec<usize>,
}

impl AnnotatedRanges {
    fn new(mut ranges: Vec<(usize, usize)>) -> Self {
        ranges.sort_unstable();
        let mut reach = Vec::with_capacity(ranges.len());
        let mut furthest = 0;
        let starts = ranges
            .iter()
            .map(|&(start, end)| {
                furthest = furthest.max(end);
                reach.push(furthest);
                start
            })
            .collect();
        Self { starts, reach }
    }

    fn overlaps(&self, start: usize, end: usize) -> bool {
        let before_end = self.starts.partition_point(|&s| s < end);
        before_end > 0 && self.reach[before_end - 1] > start
    }
}

/// Inserts matches of one region into the document, translating offsets.
struct Projection<'a, D: ?Sized> {
    projector: &'a MarkupProjector,
    document: &'a mut D,
    annotated: AnnotatedRanges,
    offset: usize,
    inserted: usize,
    error: Option<DocumentError>,
}

impl<D: AnnotatedDocument + ?Sized> MatchHandler for Projection<'_, D> {
    fn on_match(&mut self, _text: &[char], span: &MatchSpan<'_>) -> ControlFlow<()> {
        let start = self.offset + span.start;
        let end = self.offset + span.end;
        if self.annotated.overlaps(start, end) {
            debug!(start, end, "already annotated");
            return ControlFlow::Continue(());
        }
        match self.projector.project(self.document, start, end, span.ids) {
            Ok(true) => self.inserted += 1,
            Ok(false) => debug!(start, end, "balancing left an empty range"),
            Err(e) => {
                self.error = Some(e);
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }
}
