use regex::Regex;

use super::EntityRule;
use crate::error::NerError;

pub const DEFAULT_ENTITY_SEPARATOR: &str = r"\s*(<-|:)\s*";
pub const DEFAULT_NAME_SEPARATOR: &str = r"\t";

/// Separators of the line-oriented grammar format.
#[derive(Debug, Clone)]
pub struct LineSyntax {
    entity_separator: Regex,
    name_separator: Regex,
}

impl LineSyntax {
    pub fn new(entity_separator: &str, name_separator: &str) -> Result<Self, NerError> {
        Ok(Self {
            entity_separator: compile_separator("entity-separator", entity_separator)?,
            name_separator: compile_separator("name-separator", name_separator)?,
        })
    }

    pub fn entity_separator(&self) -> &str {
        self.entity_separator.as_str()
    }

    pub fn name_separator(&self) -> &str {
        self.name_separator.as_str()
    }
}

impl Default for LineSyntax {
    fn default() -> Self {
        Self {
            entity_separator: Regex::new(DEFAULT_ENTITY_SEPARATOR)
                .expect("default entity separator is a valid regex"),
            name_separator: Regex::new(DEFAULT_NAME_SEPARATOR)
                .expect("default name separator is a valid regex"),
        }
    }
}

fn compile_separator(field: &str, pattern: &str) -> Result<Regex, NerError> {
    if pattern.is_empty() {
        return Err(NerError::config(field, "separator pattern must not be empty"));
    }
    let regex = Regex::new(pattern).map_err(|e| NerError::config(field, e.to_string()))?;
    if regex.is_match("") {
        return Err(NerError::config(
            field,
            format!("separator pattern \"{pattern}\" matches the empty string"),
        ));
    }
    Ok(regex)
}

/// Parse a line-oriented grammar: `id <entity-separator> name (<name-separator> name)*`.
///
/// Blank lines are skipped. Line numbers in errors are 1-based.
pub fn parse_text_rules(grammar: &str, syntax: &LineSyntax) -> Result<Vec<EntityRule>, NerError> {
    let mut rules = Vec::new();
    for (index, raw) in grammar.lines().enumerate() {
        let line_number = index + 1;
        let line = raw.trim();
        if line.is_empty() {
            continue;
        }
        let mut parts = syntax.entity_separator.splitn(line, 2);
        let id = parts.next().unwrap_or_default();
        let Some(names) = parts.next() else {
            return Err(NerError::syntax(
                Some(line_number),
                line,
                format!(
                    "Every line must contain two parts separated by the regular expression \"{}\".",
                    syntax.entity_separator()
                ),
            ));
        };
        if names.is_empty() {
            return Err(NerError::syntax(
                Some(line_number),
                line,
                "The second part of a rule must not be empty.",
            ));
        }
        if id.is_empty() {
            return Err(NerError::syntax(
                Some(line_number),
                line,
                "The entity id must not be empty.",
            ));
        }
        for name in syntax.name_separator.split(names) {
            rules.push(EntityRule::new(id, name));
        }
    }
    Ok(rules)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules(grammar: &str) -> Vec<(String, String)> {
        parse_text_rules(grammar, &LineSyntax::default())
            .unwrap()
            .into_iter()
            .map(|r| (r.id, r.name))
            .collect()
    }

    #[test]
    fn test_default_separators() {
        let parsed = rules("a <- a\nb : b\nab<-a b\n");
        assert_eq!(
            parsed,
            vec![
                ("a".to_string(), "a".to_string()),
                ("b".to_string(), "b".to_string()),
                ("ab".to_string(), "a b".to_string()),
            ]
        );
    }

    #[test]
    fn test_tab_separated_names() {
        let parsed = rules("1 <- A A\tB A\n");
        assert_eq!(parsed.len(), 2);
        assert_eq!(parsed[0], ("1".to_string(), "A A".to_string()));
        assert_eq!(parsed[1], ("1".to_string(), "B A".to_string()));
    }

    #[test]
    fn test_blank_lines_skipped() {
        let parsed = rules("\n   \nTHE <- THE\n\t\nCF <- C F\n\n");
        assert_eq!(parsed.len(), 2);
    }

    #[test]
    fn test_crlf_lines() {
        let parsed = rules("a <- a\r\nb <- b\r\n");
        assert_eq!(parsed[1], ("b".to_string(), "b".to_string()));
    }

    #[test]
    fn test_custom_separators() {
        let syntax = LineSyntax::new(r"\s*<=\s*", r"\s*;\s*").unwrap();
        let parsed = parse_text_rules("eg:1 <= e.g.\neg:2<=e g; eg\n", &syntax).unwrap();
        let pairs: Vec<(&str, &str)> = parsed
            .iter()
            .map(|r| (r.id.as_str(), r.name.as_str()))
            .collect();
        assert_eq!(pairs, vec![("eg:1", "e.g."), ("eg:2", "e g"), ("eg:2", "eg")]);
    }

    #[test]
    fn test_missing_separator() {
        let err = parse_text_rules("a <- a\njust words\n", &LineSyntax::default()).unwrap_err();
        match err {
            NerError::GrammarSyntax { line, fragment, .. } => {
                assert_eq!(line, Some(2));
                assert_eq!(fragment, "just words");
            }
            other => panic!("expected GrammarSyntax, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_name_part() {
        let err = parse_text_rules("x <-   \n", &LineSyntax::default()).unwrap_err();
        assert!(matches!(err, NerError::GrammarSyntax { line: Some(1), .. }));
        assert!(err.to_string().contains("must not be empty"));
    }

    #[test]
    fn test_empty_id() {
        let err = parse_text_rules(": name\n", &LineSyntax::default()).unwrap_err();
        assert!(matches!(err, NerError::GrammarSyntax { line: Some(1), .. }));
    }

    #[test]
    fn test_invalid_separator_regex() {
        let err = LineSyntax::new("(", r"\t").unwrap_err();
        assert!(matches!(err, NerError::Configuration { ref field, .. } if field == "entity-separator"));
        let err = LineSyntax::new(":", "x*").unwrap_err();
        assert!(matches!(err, NerError::Configuration { ref field, .. } if field == "name-separator"));
    }
}
