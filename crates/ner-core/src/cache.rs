//! Memoization of compiled tries for file-backed grammars.
//!
//! An entry is fresh while its compile time is not older than the grammar
//! file's modification time. Entries are never evicted, only replaced.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock, PoisonError};
use std::time::SystemTime;

use tracing::info;

use crate::error::NerError;
use crate::grammar::GrammarSource;
use crate::options::EngineConfig;
use crate::trie::EntityTrie;

/// Grammar identity plus the options that change the compiled trie.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    source: String,
    word_chars: String,
    entity_separator: String,
    name_separator: String,
}

impl CacheKey {
    /// `None` for grammars that do not live in a file; those are never cached.
    pub fn new(source: &GrammarSource, config: &EngineConfig) -> Option<Self> {
        let path = source.file_path()?;
        Some(Self {
            source: path.display().to_string(),
            word_chars: config.word_chars.clone(),
            entity_separator: config.syntax.entity_separator().to_string(),
            name_separator: config.syntax.name_separator().to_string(),
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }
}

#[derive(Clone)]
pub struct CacheEntry {
    pub compiled_at: SystemTime,
    pub trie: Arc<EntityTrie>,
}

impl CacheEntry {
    /// `compiled_at` is when the compile started, so a grammar file rewritten
    /// during the compile reads as newer than the entry.
    pub fn new(trie: Arc<EntityTrie>, compiled_at: SystemTime) -> Self {
        Self { compiled_at, trie }
    }

    pub fn is_fresh(&self, modified: SystemTime) -> bool {
        self.compiled_at >= modified
    }
}

pub trait TrieCache: Send + Sync {
    fn get(&self, key: &CacheKey) -> Option<CacheEntry>;

    fn put(&self, key: CacheKey, entry: CacheEntry);

    /// Return the cached trie if it is at least as recent as `modified`,
    /// otherwise run `compile` and store the result. Concurrent callers with
    /// the same key wait for a single compile.
    fn get_or_compile(
        &self,
        key: CacheKey,
        modified: SystemTime,
        compile: &mut dyn FnMut() -> Result<EntityTrie, NerError>,
    ) -> Result<Arc<EntityTrie>, NerError>;
}

type Slot = Arc<Mutex<Option<CacheEntry>>>;

/// Process-local cache with one lock per key.
#[derive(Default)]
pub struct MemoryTrieCache {
    slots: Mutex<HashMap<CacheKey, Slot>>,
}

impl MemoryTrieCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The shared process-wide cache.
    pub fn global() -> &'static MemoryTrieCache {
        static INSTANCE: OnceLock<MemoryTrieCache> = OnceLock::new();
        INSTANCE.get_or_init(MemoryTrieCache::new)
    }

    pub fn len(&self) -> usize {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|slot| slot.lock().unwrap_or_else(PoisonError::into_inner).is_some())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn slot(&self, key: &CacheKey) -> Slot {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots.entry(key.clone()).or_default().clone()
    }

    /// Forget `slot` if it is still empty and nobody else is waiting on it.
    fn discard_if_unused(&self, key: &CacheKey, slot: &Slot) {
        let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        let unused = slots
            .get(key)
            .is_some_and(|held| Arc::ptr_eq(held, slot) && Arc::strong_count(held) == 2)
            && slot.lock().unwrap_or_else(PoisonError::into_inner).is_none();
        if unused {
            slots.remove(key);
        }
    }
}

impl TrieCache for MemoryTrieCache {
    fn get(&self, key: &CacheKey) -> Option<CacheEntry> {
        let slot = self
            .slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()?;
        let entry = slot.lock().unwrap_or_else(PoisonError::into_inner);
        entry.clone()
    }

    fn put(&self, key: CacheKey, entry: CacheEntry) {
        let slot = self.slot(&key);
        *slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(entry);
    }

    fn get_or_compile(
        &self,
        key: CacheKey,
        modified: SystemTime,
        compile: &mut dyn FnMut() -> Result<EntityTrie, NerError>,
    ) -> Result<Arc<EntityTrie>, NerError> {
        let slot = self.slot(&key);
        let mut entry = slot.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(cached) = entry.as_ref().filter(|e| e.is_fresh(modified)) {
            info!(grammar = key.source(), "using cached trie");
            return Ok(Arc::clone(&cached.trie));
        }
        let started = SystemTime::now();
        let trie = match compile() {
            Ok(trie) => Arc::new(trie),
            Err(e) => {
                drop(entry);
                self.discard_if_unused(&key, &slot);
                return Err(e);
            }
        };
        *entry = Some(CacheEntry::new(Arc::clone(&trie), started));
        info!(grammar = key.source(), "cached compiled trie");
        Ok(trie)
    }
}
