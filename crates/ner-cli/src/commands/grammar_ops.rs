use std::collections::HashSet;
use std::fs;
use std::path::Path;

use ner_core::trie::EntityTrie;
use ner_core::NerError;

use super::{recognizer, CliError, OptionArgs};

/// Figures printed by `info`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrieSummary {
    pub keys: usize,
    pub ids: usize,
    pub word_chars: String,
    pub size_in_bytes: usize,
}

impl TrieSummary {
    pub fn of(trie: &EntityTrie) -> Self {
        let ids: HashSet<&str> = trie
            .iter()
            .flat_map(|(_, ids)| ids.iter().map(String::as_str))
            .collect();
        Self {
            keys: trie.key_count(),
            ids: ids.len(),
            word_chars: trie.word_chars(),
            size_in_bytes: trie.size_in_bytes(),
        }
    }
}

pub fn compile(grammar: &str, output_file: &str, opts: &OptionArgs) {
    let summary = die!(
        compile_to_file(grammar, output_file, opts),
        "Error compiling {grammar}: {}"
    );
    let file_size = fs::metadata(output_file).map(|m| m.len()).unwrap_or(0);
    eprintln!(
        "Wrote {output_file} ({} keys, {} ids, {:.1} MB)",
        summary.keys,
        summary.ids,
        file_size as f64 / 1_048_576.0
    );
}

/// Compile `grammar` with the given options and save the binary trie.
pub fn compile_to_file(
    grammar: &str,
    output_file: &str,
    opts: &OptionArgs,
) -> Result<TrieSummary, CliError> {
    let options = opts.load()?;
    let ner = recognizer(grammar, &options)?;
    ner.trie()
        .save(Path::new(output_file))
        .map_err(NerError::from)?;
    Ok(TrieSummary::of(ner.trie()))
}

pub fn info(file: &str) {
    let trie = die!(EntityTrie::open(Path::new(file)), "Error reading {file}: {}");
    let summary = TrieSummary::of(&trie);
    println!("Compiled trie: {file}");
    println!("  keys:       {}", summary.keys);
    println!("  entity ids: {}", summary.ids);
    println!("  word chars: {:?}", summary.word_chars);
    println!(
        "  in memory:  {:.1} MB",
        summary.size_in_bytes as f64 / 1_048_576.0
    );
}
