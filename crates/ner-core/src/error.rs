use crate::document::DocumentError;
use crate::trie::TrieIoError;

#[derive(Debug, thiserror::Error)]
pub enum NerError {
    /// Rejected at engine construction, before any grammar is read.
    #[error("invalid value for {field}: {reason}")]
    Configuration { field: String, reason: String },

    #[error("bad grammar syntax{}: {fragment}\n\t{reason}", line_suffix(.line))]
    GrammarSyntax {
        line: Option<usize>,
        fragment: String,
        reason: String,
    },

    #[error("grammar {grammar} is unreachable: {reason}")]
    SourceUnreachable { grammar: String, reason: String },

    #[error("the grammar {grammar} cannot be parsed as XML ({structured}) or text ({text})")]
    SourceLoad {
        grammar: String,
        structured: String,
        text: String,
    },

    #[error("compiled trie: {0}")]
    CompiledTrie(#[from] TrieIoError),

    #[error("document: {0}")]
    Document(#[from] DocumentError),
}

fn line_suffix(line: &Option<usize>) -> String {
    line.map(|n| format!(" in line {n}")).unwrap_or_default()
}

impl NerError {
    pub(crate) fn config(field: &str, reason: impl Into<String>) -> Self {
        Self::Configuration {
            field: field.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn syntax(line: Option<usize>, fragment: &str, reason: impl Into<String>) -> Self {
        Self::GrammarSyntax {
            line,
            fragment: fragment.to_string(),
            reason: reason.into(),
        }
    }
}
