use ner_core::options::{default_toml, EngineConfig};
use ner_core::NerOptions;

use super::{read_file, CliError, OptionArgs};

/// The embedded defaults, or the effective options when any were given.
pub fn options_export(opts: &OptionArgs) {
    if opts.is_empty() {
        print!("{}", default_toml());
        return;
    }
    let options = die!(opts.load(), "Error: {}");
    let toml = die!(options.to_toml_string(), "Error: {}");
    print!("{toml}");
}

pub fn options_validate(file: &str) {
    let summary = die!(validate(file), "Error: {}");
    println!("OK: {summary}");
}

/// Parse and check an options file; returns a one-line summary.
pub fn validate(file: &str) -> Result<String, CliError> {
    let options = NerOptions::from_toml_str(&read_file(file)?)?;
    let config = EngineConfig::new(&options)?;
    let projector = &config.projector;
    Ok(format!(
        "match-element={} ({}), balancing={}, case-insensitive-min-length={}, fuzzy-min-length={}",
        projector.element_name(),
        projector.namespace_uri().unwrap_or("no namespace"),
        projector.balancing(),
        config.thresholds.case_insensitive.min_length(),
        config.thresholds.fuzzy.min_length(),
    ))
}
