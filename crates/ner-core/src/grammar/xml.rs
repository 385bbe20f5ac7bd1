use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::EntityRule;
use crate::error::NerError;

/// Why a grammar could not be read as XML.
#[derive(Debug)]
pub(crate) enum XmlGrammarError {
    /// Not well-formed XML; the caller may retry the line-oriented format.
    Malformed(String),
    /// Well-formed XML that breaks the grammar structure.
    Grammar(NerError),
}

impl From<XmlGrammarError> for NerError {
    fn from(e: XmlGrammarError) -> Self {
        match e {
            XmlGrammarError::Malformed(msg) => {
                NerError::syntax(None, "", format!("not a well-formed XML grammar: {msg}"))
            }
            XmlGrammarError::Grammar(e) => e,
        }
    }
}

/// Parse a structured grammar.
///
/// Element names are not significant. Every child of the root carries exactly
/// one attribute, the entity id; the text content of each of its children is
/// one name variant.
pub fn parse_xml_rules(grammar: &str) -> Result<Vec<EntityRule>, NerError> {
    read_xml_rules(grammar).map_err(NerError::from)
}

pub(crate) fn read_xml_rules(grammar: &str) -> Result<Vec<EntityRule>, XmlGrammarError> {
    let mut reader = Reader::from_str(grammar);
    reader.config_mut().trim_text(false);

    let mut rules = Vec::new();
    let mut level = 0usize;
    let mut seen_root = false;
    let mut entity_id = String::new();
    let mut name = String::new();

    loop {
        let position = reader.buffer_position() as usize;
        let event = reader
            .read_event()
            .map_err(|e| XmlGrammarError::Malformed(e.to_string()))?;
        match event {
            Event::Start(start) => {
                level += 1;
                open_element(&start, level, position, grammar, &mut seen_root, &mut entity_id, &mut name)?;
            }
            Event::Empty(start) => {
                open_element(&start, level + 1, position, grammar, &mut seen_root, &mut entity_id, &mut name)?;
            }
            Event::End(_) => {
                if level == 3 {
                    rules.push(EntityRule::new(entity_id.as_str(), name.as_str()));
                }
                level = level.saturating_sub(1);
            }
            Event::Text(text) => {
                let text = text
                    .unescape()
                    .map_err(|e| XmlGrammarError::Malformed(e.to_string()))?;
                if level == 0 && !text.trim().is_empty() {
                    return Err(XmlGrammarError::Malformed(format!(
                        "text outside the root element in line {}",
                        line_at(grammar, position)
                    )));
                }
                if level >= 3 {
                    name.push_str(&text);
                }
            }
            Event::CData(data) => {
                if level == 0 {
                    return Err(XmlGrammarError::Malformed(
                        "CDATA outside the root element".to_string(),
                    ));
                }
                if level >= 3 {
                    let bytes = data.into_inner();
                    let text = std::str::from_utf8(&bytes)
                        .map_err(|e| XmlGrammarError::Malformed(e.to_string()))?;
                    name.push_str(text);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !seen_root {
        return Err(XmlGrammarError::Malformed("no root element".to_string()));
    }
    if level != 0 {
        return Err(XmlGrammarError::Malformed("unclosed element".to_string()));
    }
    Ok(rules)
}

fn open_element(
    start: &BytesStart<'_>,
    level: usize,
    position: usize,
    grammar: &str,
    seen_root: &mut bool,
    entity_id: &mut String,
    name: &mut String,
) -> Result<(), XmlGrammarError> {
    match level {
        1 => {
            if *seen_root {
                return Err(XmlGrammarError::Malformed(
                    "more than one root element".to_string(),
                ));
            }
            *seen_root = true;
        }
        2 => {
            let attributes = entity_attributes(start)?;
            if attributes.len() != 1 {
                let tag = String::from_utf8_lossy(start.name().as_ref()).into_owned();
                return Err(XmlGrammarError::Grammar(NerError::syntax(
                    Some(line_at(grammar, position)),
                    &format!("<{tag}>"),
                    "The entity elements in a NER grammar must have exactly one attribute.",
                )));
            }
            *entity_id = attributes.into_iter().next().unwrap_or_default();
            if entity_id.is_empty() {
                return Err(XmlGrammarError::Grammar(NerError::syntax(
                    Some(line_at(grammar, position)),
                    "",
                    "The entity id must not be empty.",
                )));
            }
        }
        3 => name.clear(),
        _ => {}
    }
    Ok(())
}

/// Attribute values of an entity element, namespace declarations excluded.
fn entity_attributes(start: &BytesStart<'_>) -> Result<Vec<String>, XmlGrammarError> {
    let mut values = Vec::new();
    for attr in start.attributes() {
        let attr = attr.map_err(|e| XmlGrammarError::Malformed(e.to_string()))?;
        let key = attr.key.as_ref();
        if key == b"xmlns" || key.starts_with(b"xmlns:") {
            continue;
        }
        let value = attr
            .unescape_value()
            .map_err(|e| XmlGrammarError::Malformed(e.to_string()))?;
        values.push(value.into_owned());
    }
    Ok(values)
}

fn line_at(source: &str, byte_offset: usize) -> usize {
    let end = byte_offset.min(source.len());
    source.as_bytes()[..end].iter().filter(|&&b| b == b'\n').count() + 1
}
