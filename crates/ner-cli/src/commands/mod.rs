use std::fs;
use std::io::{self, Read};

use ner_core::{GrammarSource, NamedEntityRecognizer, NerError, NerOptions};

macro_rules! die {
    ($result:expr, $($arg:tt)*) => {
        $result.unwrap_or_else(|e| {
            eprintln!($($arg)*, e);
            std::process::exit(1);
        })
    };
}

pub mod config_ops;
pub mod grammar_ops;
pub mod scan_ops;

#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("cannot read {path}: {source}")]
    Read { path: String, source: io::Error },

    #[error("cannot write {path}: {source}")]
    Write { path: String, source: io::Error },

    #[error("invalid --set \"{0}\" (expected key=value)")]
    InvalidSetting(String),

    #[error(transparent)]
    Ner(#[from] NerError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// `--options` and `--set`, shared by every command.
#[derive(Debug, Clone, Default)]
pub struct OptionArgs {
    pub file: Option<String>,
    pub settings: Vec<String>,
}

impl OptionArgs {
    pub fn is_empty(&self) -> bool {
        self.file.is_none() && self.settings.is_empty()
    }

    /// The options file (or the defaults), then each `--set` in order.
    pub fn load(&self) -> Result<NerOptions, CliError> {
        let mut options = match &self.file {
            Some(path) => NerOptions::from_toml_str(&read_file(path)?)?,
            None => NerOptions::default(),
        };
        for setting in &self.settings {
            let (key, value) = setting
                .split_once('=')
                .ok_or_else(|| CliError::InvalidSetting(setting.clone()))?;
            options.set(key.trim(), value)?;
        }
        Ok(options)
    }
}

/// Compile the grammar or compiled trie at `location`.
pub fn recognizer(location: &str, options: &NerOptions) -> Result<NamedEntityRecognizer, CliError> {
    let source = GrammarSource::detect(location);
    Ok(NamedEntityRecognizer::compile(&source, options)?)
}

pub fn read_file(path: &str) -> Result<String, CliError> {
    fs::read_to_string(path).map_err(|source| CliError::Read {
        path: path.to_string(),
        source,
    })
}

/// A file, or stdin for `-`.
pub fn read_input(path: &str) -> Result<String, CliError> {
    if path != "-" {
        return read_file(path);
    }
    let mut input = String::new();
    io::stdin()
        .read_to_string(&mut input)
        .map_err(|source| CliError::Read {
            path: "<stdin>".to_string(),
            source,
        })?;
    Ok(input)
}

/// A file, or stdout when no path is given.
pub fn write_output(path: Option<&str>, content: &str) -> Result<(), CliError> {
    match path {
        Some(path) => fs::write(path, content).map_err(|source| CliError::Write {
            path: path.to_string(),
            source,
        }),
        None => {
            print!("{content}");
            Ok(())
        }
    }
}
