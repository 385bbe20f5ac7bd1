pub mod cache;
pub mod document;
pub mod engine;
pub mod error;
pub mod grammar;
pub mod normalize;
pub mod options;
pub mod projector;
pub mod scanner;
pub mod trie;

pub use document::{AnnotatedDocument, Balancing, SmaxDocument};
pub use engine::{EntityMatch, NamedEntityRecognizer};
pub use error::NerError;
pub use grammar::GrammarSource;
pub use options::NerOptions;
