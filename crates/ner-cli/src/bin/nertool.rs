use clap::{Parser, Subcommand};

use ner_cli::commands::{config_ops, grammar_ops, scan_ops, OptionArgs};
use ner_cli::trace_init::init_tracing;

#[derive(Parser)]
#[command(name = "nertool", about = "Dictionary-based named entity recognition for XML")]
struct Cli {
    /// Options file (TOML)
    #[arg(long, global = true)]
    options: Option<String>,
    /// Override one option, e.g. --set fuzzy-min-length=3 (repeatable)
    #[arg(long = "set", value_name = "KEY=VALUE", global = true)]
    settings: Vec<String>,
    /// Debug logging (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compile a grammar into a binary trie
    Compile {
        /// Grammar file or URL (XML or line format)
        grammar: String,
        /// Output file
        output_file: String,
    },
    /// Show compiled trie info
    Info {
        /// Compiled trie file
        file: String,
    },
    /// Annotate entities in an XML document
    Annotate {
        /// Grammar file, URL or compiled trie
        grammar: String,
        /// XML document ("-" for stdin)
        input: String,
        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Print the matches in plain text as JSON lines
    Matches {
        /// Grammar file, URL or compiled trie
        grammar: String,
        /// Text file ("-" for stdin)
        input: String,
    },
    /// Export options as TOML (the defaults unless --options/--set are given)
    OptionsExport,
    /// Validate an options TOML file
    OptionsValidate {
        /// Path to the TOML file
        file: String,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let opts = OptionArgs {
        file: cli.options,
        settings: cli.settings,
    };

    match cli.command {
        Command::Compile {
            grammar,
            output_file,
        } => grammar_ops::compile(&grammar, &output_file, &opts),
        Command::Info { file } => grammar_ops::info(&file),
        Command::Annotate {
            grammar,
            input,
            output,
        } => scan_ops::annotate(&grammar, &input, output.as_deref(), &opts),
        Command::Matches { grammar, input } => scan_ops::matches(&grammar, &input, &opts),
        Command::OptionsExport => config_ops::options_export(&opts),
        Command::OptionsValidate { file } => config_ops::options_validate(&file),
    }
}
