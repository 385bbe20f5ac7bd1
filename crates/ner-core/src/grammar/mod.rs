//! Dictionary compiler.
//!
//! Grammars come as line-oriented text (`id <- name1<TAB>name2`) or as a
//! two-level XML structure; both are parsed completely into [`EntityRule`]s
//! before anything is inserted, so a syntax error never leaves a partial
//! dictionary behind.

mod source;
mod text;
mod xml;

pub use source::GrammarSource;
pub use text::{parse_text_rules, LineSyntax, DEFAULT_ENTITY_SEPARATOR, DEFAULT_NAME_SEPARATOR};
pub use xml::parse_xml_rules;

use tracing::{info, warn};

use crate::trie::EntityTrie;

/// One `(id, name variant)` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityRule {
    pub id: String,
    pub name: String,
}

impl EntityRule {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// Build a trie from `rules`, normalizing names with `word_chars`.
pub fn compile(rules: impl IntoIterator<Item = EntityRule>, word_chars: &str) -> EntityTrie {
    let mut trie = EntityTrie::new(word_chars);
    let mut rule_count = 0usize;
    for rule in rules {
        rule_count += 1;
        let key = trie.normalize(&rule.name);
        if key.is_empty() {
            warn!(id = %rule.id, name = %rule.name, "entity name has no significant characters");
            continue;
        }
        trie.insert_key(&key, &rule.id);
    }
    info!(
        "Trie has {} keys from {} rules, {} megabytes",
        trie.key_count(),
        rule_count,
        trie.size_in_bytes() / 1_048_576
    );
    trie
}
