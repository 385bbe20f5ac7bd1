use ner_core::{NamedEntityRecognizer, NerError, SmaxDocument};
use tracing::info;

use super::{read_input, recognizer, write_output, CliError, OptionArgs};

pub fn annotate(grammar: &str, input: &str, output: Option<&str>, opts: &OptionArgs) {
    let options = die!(opts.load(), "Error: {}");
    let ner = die!(recognizer(grammar, &options), "Error loading {grammar}: {}");
    let xml = die!(read_input(input), "Error: {}");
    let (annotated, inserted) = die!(annotate_xml(&ner, &xml), "Error annotating {input}: {}");
    info!(inserted, "annotated {input}");
    die!(write_output(output, &annotated), "Error: {}");
}

/// Scan one XML document and serialize the result.
pub fn annotate_xml(ner: &NamedEntityRecognizer, xml: &str) -> Result<(String, usize), CliError> {
    let mut document = SmaxDocument::from_xml(xml).map_err(NerError::from)?;
    let inserted = ner.scan(&mut document)?;
    Ok((document.to_xml(), inserted))
}

pub fn matches(grammar: &str, input: &str, opts: &OptionArgs) {
    let options = die!(opts.load(), "Error: {}");
    let ner = die!(recognizer(grammar, &options), "Error loading {grammar}: {}");
    let text = die!(read_input(input), "Error: {}");
    let lines = die!(match_lines(&ner, &text), "Error: {}");
    die!(write_output(None, &lines), "Error: {}");
}

/// One JSON object per match: `{"start":..,"end":..,"text":..,"ids":[..]}`.
pub fn match_lines(ner: &NamedEntityRecognizer, text: &str) -> Result<String, CliError> {
    let mut out = String::new();
    for m in ner.matches(text) {
        out.push_str(&serde_json::to_string(&m)?);
        out.push('\n');
    }
    Ok(out)
}
