//! Character-level classification and name normalization.
//!
//! Letters and digits are always significant. Configured word characters are
//! significant too. Everything else is whitespace or noise, and runs of those
//! collapse to at most one separator when names are compared.

/// The canonical separator stored on trie edges between name parts.
pub const SEPARATOR: char = ' ';

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CharClass {
    /// Letter, digit or configured word character.
    Significant,
    Whitespace,
    Noise,
}

/// Character sets that drive classification and word-boundary vetoes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CharClasses {
    word_chars: Vec<char>,
    no_word_before: Vec<char>,
    no_word_after: Vec<char>,
}

fn char_set(chars: &str) -> Vec<char> {
    let mut set: Vec<char> = chars.chars().collect();
    set.sort_unstable();
    set.dedup();
    set
}

impl CharClasses {
    pub fn new(word_chars: &str, no_word_before: &str, no_word_after: &str) -> Self {
        Self {
            word_chars: char_set(word_chars),
            no_word_before: char_set(no_word_before),
            no_word_after: char_set(no_word_after),
        }
    }

    /// Classes with only the word characters set, as used for dictionary names.
    pub fn with_word_chars(word_chars: &str) -> Self {
        Self::new(word_chars, "", "")
    }

    pub fn classify(&self, c: char) -> CharClass {
        if c.is_alphanumeric() || self.word_chars.binary_search(&c).is_ok() {
            CharClass::Significant
        } else if c.is_whitespace() {
            CharClass::Whitespace
        } else {
            CharClass::Noise
        }
    }

    pub fn is_significant(&self, c: char) -> bool {
        self.classify(c) == CharClass::Significant
    }

    /// `c` may not directly follow the end of a match.
    pub fn is_no_word_before(&self, c: char) -> bool {
        self.no_word_before.binary_search(&c).is_ok()
    }

    /// A match may not start directly after `c`.
    pub fn is_no_word_after(&self, c: char) -> bool {
        self.no_word_after.binary_search(&c).is_ok()
    }

    /// The configured word characters as a sorted, deduplicated string.
    pub fn word_chars(&self) -> String {
        self.word_chars.iter().collect()
    }

    /// Normalize a dictionary name to the canonical alphabet.
    ///
    /// Leading and trailing insignificant runs are dropped. An inner run that
    /// contains whitespace becomes one [`SEPARATOR`]; an inner run of noise
    /// only disappears, so `e.g.` normalizes to `eg` unless `.` is a word char.
    pub fn normalize_name(&self, name: &str) -> String {
        let mut out = String::with_capacity(name.len());
        let mut pending_separator = false;
        for c in name.chars() {
            match self.classify(c) {
                CharClass::Significant => {
                    if pending_separator && !out.is_empty() {
                        out.push(SEPARATOR);
                    }
                    pending_separator = false;
                    out.push(c);
                }
                CharClass::Whitespace => pending_separator = true,
                CharClass::Noise => {}
            }
        }
        out
    }
}

/// A maximal run of insignificant characters in scanned text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InsignificantRun {
    /// Offset just past the run.
    pub end: usize,
    pub has_whitespace: bool,
    pub has_noise: bool,
}

impl CharClasses {
    /// Describe the insignificant run starting at `start`.
    ///
    /// `text[start]` must be insignificant.
    pub fn insignificant_run(&self, text: &[char], start: usize) -> InsignificantRun {
        let mut run = InsignificantRun {
            end: start,
            has_whitespace: false,
            has_noise: false,
        };
        while let Some(&c) = text.get(run.end) {
            match self.classify(c) {
                CharClass::Significant => break,
                CharClass::Whitespace => run.has_whitespace = true,
                CharClass::Noise => run.has_noise = true,
            }
            run.end += 1;
        }
        run
    }
}

/// Case variants of `c` that map to a single character, `c` itself first.
pub fn case_variants(c: char) -> impl Iterator<Item = char> {
    let mut variants = [Some(c), None, None];
    let lower = single_char(c.to_lowercase());
    let upper = single_char(c.to_uppercase());
    if let Some(l) = lower.filter(|&l| l != c) {
        variants[1] = Some(l);
    }
    if let Some(u) = upper.filter(|&u| u != c && Some(u) != lower) {
        variants[2] = Some(u);
    }
    variants.into_iter().flatten()
}

fn single_char(mut chars: impl Iterator<Item = char>) -> Option<char> {
    let first = chars.next()?;
    chars.next().is_none().then_some(first)
}
