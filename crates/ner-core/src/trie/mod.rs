//! Entity trie: the compiled matching automaton.
//!
//! Edges are keyed by normalized characters. A node is terminal when it holds
//! at least one entity id. The trie is built once by the grammar compiler and
//! then shared read-only (behind an `Arc`) by any number of scans.

mod io;

pub use io::TrieIoError;

use std::collections::HashMap;
use std::mem::size_of;

use serde::{Deserialize, Serialize};

use crate::normalize::CharClasses;

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct TrieNode {
    children: HashMap<char, TrieNode>,
    ids: Vec<String>,
}

impl TrieNode {
    /// Follow the edge labelled `c`.
    pub fn child(&self, c: char) -> Option<&TrieNode> {
        self.children.get(&c)
    }

    /// Entity ids in insertion order. Empty for non-terminal nodes.
    pub fn ids(&self) -> &[String] {
        &self.ids
    }

    pub fn is_terminal(&self) -> bool {
        !self.ids.is_empty()
    }

    fn heap_size(&self) -> usize {
        let ids: usize = self
            .ids
            .iter()
            .map(|id| size_of::<String>() + id.capacity())
            .sum();
        let edges = self.children.capacity() * (size_of::<char>() + size_of::<TrieNode>());
        ids + edges
            + self
                .children
                .values()
                .map(TrieNode::heap_size)
                .sum::<usize>()
    }
}

#[derive(Debug)]
pub struct EntityTrie {
    root: TrieNode,
    classes: CharClasses,
    key_count: usize,
}

impl EntityTrie {
    /// An empty trie whose names are normalized with `word_chars`.
    pub fn new(word_chars: &str) -> Self {
        Self {
            root: TrieNode::default(),
            classes: CharClasses::with_word_chars(word_chars),
            key_count: 0,
        }
    }

    pub fn root(&self) -> &TrieNode {
        &self.root
    }

    /// The word characters names were normalized with.
    pub fn word_chars(&self) -> String {
        self.classes.word_chars()
    }

    /// Insert `id` under the normalized form of `name`.
    ///
    /// Returns `false` when the name normalizes to nothing or the
    /// `(name, id)` pair is already present.
    pub fn put(&mut self, name: &str, id: &str) -> bool {
        let key = self.normalize(name);
        self.insert_key(&key, id)
    }

    /// The normalized form `name` is stored under.
    pub fn normalize(&self, name: &str) -> String {
        self.classes.normalize_name(name)
    }

    pub(crate) fn insert_key(&mut self, key: &str, id: &str) -> bool {
        if key.is_empty() {
            return false;
        }
        let mut node = &mut self.root;
        for c in key.chars() {
            node = node.children.entry(c).or_default();
        }
        if node.ids.iter().any(|existing| existing == id) {
            return false;
        }
        if node.ids.is_empty() {
            self.key_count += 1;
        }
        node.ids.push(id.to_string());
        true
    }

    /// Exact lookup of an already-normalized key.
    pub fn get(&self, key: &str) -> Option<&[String]> {
        let mut node = &self.root;
        for c in key.chars() {
            node = node.child(c)?;
        }
        node.is_terminal().then_some(node.ids())
    }

    /// Number of terminal nodes (distinct normalized names).
    pub fn key_count(&self) -> usize {
        self.key_count
    }

    /// Approximate heap footprint, for diagnostics.
    pub fn size_in_bytes(&self) -> usize {
        size_of::<Self>() + self.root.heap_size()
    }

    /// Iterate over all `(normalized name, ids)` pairs in depth-first order.
    pub fn iter(&self) -> impl Iterator<Item = (String, &[String])> {
        let mut stack: Vec<(String, &TrieNode)> = vec![(String::new(), &self.root)];
        std::iter::from_fn(move || {
            while let Some((key, node)) = stack.pop() {
                let mut edges: Vec<(&char, &TrieNode)> = node.children.iter().collect();
                edges.sort_unstable_by(|a, b| b.0.cmp(a.0));
                for (c, child) in edges {
                    let mut child_key = key.clone();
                    child_key.push(*c);
                    stack.push((child_key, child));
                }
                if node.is_terminal() {
                    return Some((key, node.ids()));
                }
            }
            None
        })
    }
}
