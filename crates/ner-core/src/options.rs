//! Recognizer options.
//!
//! [`NerOptions`] is the user-facing bag of settings, read from TOML or from
//! string key/value pairs. [`EngineConfig::new`] validates it once and turns
//! it into the typed values the compiler, scanner and projector use.

use serde::{Deserialize, Serialize};

use crate::document::{split_qname, Balancing};
use crate::error::NerError;
use crate::grammar::{LineSyntax, DEFAULT_ENTITY_SEPARATOR, DEFAULT_NAME_SEPARATOR};
use crate::projector::{ElementFilter, MarkupProjector, FN_NAMESPACE};
use crate::scanner::{ScanThresholds, Threshold};

pub const DEFAULT_OPTIONS_TOML: &str = include_str!("default_options.toml");

/// Returns the embedded default options TOML content.
pub fn default_toml() -> &'static str {
    DEFAULT_OPTIONS_TOML
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields, default)]
pub struct NerOptions {
    pub entity_separator: String,
    pub name_separator: String,
    pub word_chars: String,
    pub no_word_before: String,
    pub no_word_after: String,
    pub case_insensitive_min_length: i64,
    pub fuzzy_min_length: i64,
    pub balancing: Balancing,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_within_element: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_within_namespace: Option<String>,
    pub match_element_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_element_namespace_uri: Option<String>,
    pub match_attribute: String,
    pub cache: bool,
}

impl Default for NerOptions {
    fn default() -> Self {
        Self {
            entity_separator: DEFAULT_ENTITY_SEPARATOR.to_string(),
            name_separator: DEFAULT_NAME_SEPARATOR.to_string(),
            word_chars: String::new(),
            no_word_before: String::new(),
            no_word_after: String::new(),
            case_insensitive_min_length: -1,
            fuzzy_min_length: -1,
            balancing: Balancing::Outer,
            match_within_element: None,
            match_within_namespace: None,
            match_element_name: "fn:match".to_string(),
            match_element_namespace_uri: None,
            match_attribute: "id".to_string(),
            cache: false,
        }
    }
}

impl NerOptions {
    /// Parse an options file. Missing keys keep their defaults.
    pub fn from_toml_str(toml_str: &str) -> Result<Self, NerError> {
        toml::from_str(toml_str).map_err(|e| NerError::config("options", e.message()))
    }

    pub fn to_toml_string(&self) -> Result<String, NerError> {
        toml::to_string(self).map_err(|e| NerError::config("options", e.to_string()))
    }

    /// Build options from string pairs such as `("fuzzy-min-length", "3")`.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self, NerError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut options = Self::default();
        for (key, value) in pairs {
            options.set(key.as_ref(), value.as_ref())?;
        }
        Ok(options)
    }

    /// Set one option from its string form.
    pub fn set(&mut self, key: &str, value: &str) -> Result<(), NerError> {
        match key {
            "entity-separator" => self.entity_separator = value.to_string(),
            "name-separator" => self.name_separator = value.to_string(),
            "word-chars" => self.word_chars = value.to_string(),
            "no-word-before" => self.no_word_before = value.to_string(),
            "no-word-after" => self.no_word_after = value.to_string(),
            "case-insensitive-min-length" => {
                self.case_insensitive_min_length = parse_int(key, value)?
            }
            "fuzzy-min-length" => self.fuzzy_min_length = parse_int(key, value)?,
            "balancing" => {
                self.balancing = value.parse().map_err(|e: String| NerError::config(key, e))?
            }
            "match-within-element" => self.match_within_element = Some(value.to_string()),
            "match-within-namespace" => self.match_within_namespace = Some(value.to_string()),
            "match-element-name" => self.match_element_name = value.to_string(),
            "match-element-namespace-uri" => {
                self.match_element_namespace_uri = Some(value.to_string())
            }
            "match-attribute" => self.match_attribute = value.to_string(),
            "cache" => self.cache = parse_bool(key, value)?,
            _ => return Err(NerError::config(key, "unknown option")),
        }
        Ok(())
    }
}

fn parse_int(key: &str, value: &str) -> Result<i64, NerError> {
    value
        .trim()
        .parse()
        .map_err(|_| NerError::config(key, format!("\"{value}\" is not an integer")))
}

fn parse_bool(key: &str, value: &str) -> Result<bool, NerError> {
    match value.trim() {
        v if v.eq_ignore_ascii_case("true") => Ok(true),
        v if v.eq_ignore_ascii_case("false") => Ok(false),
        _ => Err(NerError::config(key, format!("\"{value}\" is not a boolean"))),
    }
}

/// Validated, typed configuration of a recognizer.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub syntax: LineSyntax,
    pub word_chars: String,
    pub no_word_before: String,
    pub no_word_after: String,
    pub thresholds: ScanThresholds,
    pub match_within: Option<ElementFilter>,
    pub projector: MarkupProjector,
    pub cache: bool,
}

impl EngineConfig {
    pub fn new(options: &NerOptions) -> Result<Self, NerError> {
        let syntax = LineSyntax::new(&options.entity_separator, &options.name_separator)?;
        let thresholds = ScanThresholds {
            case_insensitive: threshold(
                "case-insensitive-min-length",
                options.case_insensitive_min_length,
            )?,
            fuzzy: threshold("fuzzy-min-length", options.fuzzy_min_length)?,
        };

        let match_within = match options.match_within_element.as_deref() {
            None | Some("") => None,
            Some(local_name) => {
                if !is_ncname(local_name) {
                    return Err(NerError::config(
                        "match-within-element",
                        format!("\"{local_name}\" is not a local element name"),
                    ));
                }
                Some(ElementFilter::new(
                    local_name,
                    options.match_within_namespace.as_deref(),
                ))
            }
        };

        let element_name = options.match_element_name.as_str();
        let (prefix, local) = split_qname(element_name);
        if !is_ncname(local) || prefix.is_some_and(|p| !is_ncname(p)) {
            return Err(NerError::config(
                "match-element-name",
                format!("\"{element_name}\" is not a qualified element name"),
            ));
        }
        let namespace_uri = match (options.match_element_namespace_uri.as_deref(), prefix) {
            (Some(uri), _) if !uri.is_empty() => Some(uri),
            (_, Some("fn")) => Some(FN_NAMESPACE),
            (_, Some(_)) => {
                return Err(NerError::config(
                    "match-element-namespace-uri",
                    format!("a namespace URI must be defined for the match-element-name '{element_name}'"),
                ))
            }
            (_, None) => None,
        };
        if !is_ncname(&options.match_attribute) {
            return Err(NerError::config(
                "match-attribute",
                format!("\"{}\" is not an attribute name", options.match_attribute),
            ));
        }

        Ok(Self {
            syntax,
            word_chars: options.word_chars.clone(),
            no_word_before: options.no_word_before.clone(),
            no_word_after: options.no_word_after.clone(),
            thresholds,
            match_within,
            projector: MarkupProjector::new(
                element_name,
                namespace_uri,
                &options.match_attribute,
                options.balancing,
            ),
            cache: options.cache,
        })
    }
}

fn threshold(field: &str, min_length: i64) -> Result<Threshold, NerError> {
    Threshold::from_min_length(min_length)
        .ok_or_else(|| NerError::config(field, format!("{min_length} is less than -1")))
}

/// XML name without a colon.
fn is_ncname(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first.is_alphabetic() || first == '_')
        && chars.all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_defaults_match_default() {
        let parsed = NerOptions::from_toml_str(default_toml()).unwrap();
        assert_eq!(parsed, NerOptions::default());
    }

    #[test]
    fn test_default_config() {
        let config = EngineConfig::new(&NerOptions::default()).unwrap();
        assert_eq!(config.syntax.entity_separator(), DEFAULT_ENTITY_SEPARATOR);
        assert_eq!(config.thresholds, ScanThresholds::default());
        assert_eq!(config.projector.element_name(), "fn:match");
        assert_eq!(config.projector.namespace_uri(), Some(FN_NAMESPACE));
        assert_eq!(config.projector.attribute(), "id");
        assert_eq!(config.projector.balancing(), Balancing::Outer);
        assert!(config.match_within.is_none());
        assert!(!config.cache);
    }

    #[test]
    fn test_from_toml_partial() {
        let options = NerOptions::from_toml_str(
            "word-chars = \"-\"\nfuzzy-min-length = 3\nbalancing = \"inner\"\n",
        )
        .unwrap();
        assert_eq!(options.word_chars, "-");
        assert_eq!(options.fuzzy_min_length, 3);
        assert_eq!(options.balancing, Balancing::Inner);
        assert_eq!(options.match_attribute, "id");
    }

    #[test]
    fn test_from_toml_rejects_unknown_key() {
        let err = NerOptions::from_toml_str("fuzzyness = 3\n").unwrap_err();
        assert!(matches!(err, NerError::Configuration { .. }));
    }

    #[test]
    fn test_toml_export_roundtrip() {
        let mut options = NerOptions::default();
        options.match_within_element = Some("m".to_string());
        options.balancing = Balancing::Inner;
        let exported = options.to_toml_string().unwrap();
        assert_eq!(NerOptions::from_toml_str(&exported).unwrap(), options);
    }

    #[test]
    fn test_from_pairs() {
        let options = NerOptions::from_pairs([
            ("word-chars", "."),
            ("case-insensitive-min-length", "4"),
            ("balancing", "INNER"),
            ("cache", "true"),
            ("match-within-element", "m"),
        ])
        .unwrap();
        assert_eq!(options.word_chars, ".");
        assert_eq!(options.case_insensitive_min_length, 4);
        assert_eq!(options.balancing, Balancing::Inner);
        assert!(options.cache);
        assert_eq!(options.match_within_element.as_deref(), Some("m"));
    }

    #[test]
    fn test_from_pairs_errors() {
        let err = NerOptions::from_pairs([("fuzzy-min-length", "many")]).unwrap_err();
        assert!(matches!(err, NerError::Configuration { ref field, .. } if field == "fuzzy-min-length"));
        let err = NerOptions::from_pairs([("balancing", "sideways")]).unwrap_err();
        assert!(matches!(err, NerError::Configuration { ref field, .. } if field == "balancing"));
        let err = NerOptions::from_pairs([("colour", "red")]).unwrap_err();
        assert!(matches!(err, NerError::Configuration { ref field, .. } if field == "colour"));
        assert!(NerOptions::from_pairs([("cache", "yes")]).is_err());
    }

    #[test]
    fn test_prefixed_name_requires_namespace() {
        let options = NerOptions::from_pairs([("match-element-name", "ric:image")]).unwrap();
        let err = EngineConfig::new(&options).unwrap_err();
        assert!(
            matches!(err, NerError::Configuration { ref field, .. } if field == "match-element-namespace-uri")
        );

        let options = NerOptions::from_pairs([
            ("match-element-name", "ric:image"),
            (
                "match-element-namespace-uri",
                "https://en.wikipedia.org/wiki/Resin_identification_code",
            ),
        ])
        .unwrap();
        let config = EngineConfig::new(&options).unwrap();
        assert_eq!(
            config.projector.namespace_uri(),
            Some("https://en.wikipedia.org/wiki/Resin_identification_code")
        );
    }

    #[test]
    fn test_unprefixed_name_has_no_namespace() {
        let options = NerOptions::from_pairs([("match-element-name", "ric")]).unwrap();
        let config = EngineConfig::new(&options).unwrap();
        assert_eq!(config.projector.namespace_uri(), None);
        let options = NerOptions::from_pairs([("match-element-name", "fn:ric")]).unwrap();
        let config = EngineConfig::new(&options).unwrap();
        assert_eq!(config.projector.namespace_uri(), Some(FN_NAMESPACE));
    }

    #[test]
    fn test_invalid_values_rejected() {
        for (key, value) in [
            ("case-insensitive-min-length", "-2"),
            ("fuzzy-min-length", "-5"),
            ("match-attribute", ""),
            ("match-attribute", "two words"),
            ("match-element-name", ""),
            ("match-element-name", "a:b:c"),
            ("match-within-element", "1st"),
            ("entity-separator", "("),
            ("name-separator", ""),
        ] {
            let options = NerOptions::from_pairs([(key, value)]).unwrap();
            let err = EngineConfig::new(&options).unwrap_err();
            assert!(
                matches!(err, NerError::Configuration { .. }),
                "{key}={value:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_thresholds_typed() {
        let options = NerOptions::from_pairs([
            ("case-insensitive-min-length", "0"),
            ("fuzzy-min-length", "3"),
        ])
        .unwrap();
        let config = EngineConfig::new(&options).unwrap();
        assert_eq!(config.thresholds.case_insensitive, Threshold::Always);
        assert_eq!(config.thresholds.fuzzy, Threshold::AtLeast(3));
    }
}
