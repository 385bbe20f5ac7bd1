const DEFAULT_OPTIONS: &str = "src/default_options.toml";

/// Keys `NerOptions` accepts; the embedded defaults may not set anything else.
const OPTION_KEYS: &[&str] = &[
    "entity-separator",
    "name-separator",
    "word-chars",
    "no-word-before",
    "no-word-after",
    "case-insensitive-min-length",
    "fuzzy-min-length",
    "balancing",
    "match-within-element",
    "match-within-namespace",
    "match-element-name",
    "match-element-namespace-uri",
    "match-attribute",
    "cache",
];

fn main() {
    println!("cargo:rerun-if-changed={DEFAULT_OPTIONS}");
    let table = match include_str!("src/default_options.toml").parse::<toml::Table>() {
        Ok(table) => table,
        Err(e) => panic!("{DEFAULT_OPTIONS} contains invalid TOML: {e}"),
    };
    if let Some(key) = table.keys().find(|key| !OPTION_KEYS.contains(&key.as_str())) {
        panic!("{DEFAULT_OPTIONS} sets unknown option \"{key}\"");
    }
}
