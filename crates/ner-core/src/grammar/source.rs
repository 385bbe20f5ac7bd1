use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use percent_encoding::percent_decode_str;
use tracing::info;

use super::text::{parse_text_rules, LineSyntax};
use super::xml::{read_xml_rules, XmlGrammarError};
use super::{compile, parse_xml_rules, EntityRule};
use crate::error::NerError;
use crate::normalize::CharClasses;
use crate::trie::EntityTrie;

/// Where a dictionary comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GrammarSource {
    /// Line-oriented grammar text.
    Text(String),
    /// Structured (XML) grammar text.
    Xml(String),
    /// `file:`, `http:` or `https:` URL; tried as XML first, then as text.
    Url(String),
    /// Filesystem path; tried as XML first, then as text.
    Path(PathBuf),
    /// Binary trie written by [`EntityTrie::save`].
    Compiled(PathBuf),
}

impl GrammarSource {
    /// Classify a command-line location: URLs by scheme, files holding a
    /// compiled trie by their magic bytes, anything else as a grammar path.
    pub fn detect(location: &str) -> Self {
        if ["file:", "http://", "https://"]
            .iter()
            .any(|scheme| location.starts_with(scheme))
        {
            return GrammarSource::Url(location.to_string());
        }
        let path = PathBuf::from(location);
        let mut magic = [0u8; 4];
        let compiled = fs::File::open(&path)
            .and_then(|mut file| file.read_exact(&mut magic))
            .is_ok()
            && EntityTrie::is_compiled(&magic);
        if compiled {
            GrammarSource::Compiled(path)
        } else {
            GrammarSource::Path(path)
        }
    }

    /// A stable name for log messages and cache keys.
    pub fn identity(&self) -> String {
        match self {
            GrammarSource::Text(_) => "<text grammar>".to_string(),
            GrammarSource::Xml(_) => "<xml grammar>".to_string(),
            GrammarSource::Url(url) => url.clone(),
            GrammarSource::Path(path) | GrammarSource::Compiled(path) => {
                path.display().to_string()
            }
        }
    }

    /// The backing file, if the source lives on the filesystem.
    pub fn file_path(&self) -> Option<PathBuf> {
        match self {
            GrammarSource::Path(path) | GrammarSource::Compiled(path) => Some(path.clone()),
            GrammarSource::Url(url) => file_url_path(url),
            GrammarSource::Text(_) | GrammarSource::Xml(_) => None,
        }
    }

    /// Last modification time of the backing file.
    pub fn modified(&self) -> Option<SystemTime> {
        let path = self.file_path()?;
        fs::metadata(path).and_then(|m| m.modified()).ok()
    }

    /// Read, parse and compile the grammar.
    pub fn load(&self, syntax: &LineSyntax, word_chars: &str) -> Result<EntityTrie, NerError> {
        info!(grammar = %self.identity(), "loading grammar");
        match self {
            GrammarSource::Text(text) => Ok(compile(parse_text_rules(text, syntax)?, word_chars)),
            GrammarSource::Xml(xml) => Ok(compile(parse_xml_rules(xml)?, word_chars)),
            GrammarSource::Url(url) => {
                let body = match file_url_path(url) {
                    Some(path) => self.read_file(&path)?,
                    None => self.fetch(url)?,
                };
                Ok(compile(self.parse_either(&body, syntax)?, word_chars))
            }
            GrammarSource::Path(path) => {
                let body = self.read_file(path)?;
                Ok(compile(self.parse_either(&body, syntax)?, word_chars))
            }
            GrammarSource::Compiled(path) => {
                let trie = EntityTrie::open(path)?;
                let expected = CharClasses::with_word_chars(word_chars).word_chars();
                if trie.word_chars() != expected {
                    return Err(NerError::config(
                        "word-chars",
                        format!(
                            "{} was compiled with word characters \"{}\", not \"{}\"",
                            path.display(),
                            trie.word_chars(),
                            expected
                        ),
                    ));
                }
                info!(
                    "Trie has {} keys, {} megabytes",
                    trie.key_count(),
                    trie.size_in_bytes() / 1_048_576
                );
                Ok(trie)
            }
        }
    }

    /// Structured format first; on a well-formedness failure, the line format.
    fn parse_either(&self, body: &str, syntax: &LineSyntax) -> Result<Vec<EntityRule>, NerError> {
        match read_xml_rules(body) {
            Ok(rules) => Ok(rules),
            Err(XmlGrammarError::Grammar(e)) => Err(e),
            Err(XmlGrammarError::Malformed(structured)) => {
                parse_text_rules(body, syntax).map_err(|e| NerError::SourceLoad {
                    grammar: self.identity(),
                    structured,
                    text: e.to_string(),
                })
            }
        }
    }

    fn read_file(&self, path: &Path) -> Result<String, NerError> {
        fs::read_to_string(path).map_err(|e| NerError::SourceUnreachable {
            grammar: self.identity(),
            reason: e.to_string(),
        })
    }

    fn fetch(&self, url: &str) -> Result<String, NerError> {
        let unreachable = |reason: String| NerError::SourceUnreachable {
            grammar: self.identity(),
            reason,
        };
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(unreachable("unsupported URL scheme".to_string()));
        }
        ureq::get(url)
            .call()
            .map_err(|e| unreachable(e.to_string()))?
            .into_body()
            .read_to_string()
            .map_err(|e| unreachable(e.to_string()))
    }
}

/// `file:///a/b`, `file://localhost/a/b` and `file:/a/b` all map to `/a/b`.
fn file_url_path(url: &str) -> Option<PathBuf> {
    let rest = url.strip_prefix("file:")?;
    let rest = match rest.strip_prefix("//") {
        Some(authority_and_path) => {
            let slash = authority_and_path.find('/')?;
            let (host, path) = authority_and_path.split_at(slash);
            if !(host.is_empty() || host == "localhost") {
                return None;
            }
            path
        }
        None => rest,
    };
    Some(PathBuf::from(percent_decode_str(rest).decode_utf8_lossy().into_owned()))
}
