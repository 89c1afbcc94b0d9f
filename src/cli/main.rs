//! field-mapping-cli: inspect documents and resolve mapping files offline

use clap::{Parser, Subcommand};
use field_mapping_sdk::cli::commands::inspect::handle_inspect;
use field_mapping_sdk::cli::commands::resolve::{ResolveArgs, handle_resolve};
use field_mapping_sdk::cli::{CliError, load_config};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "field-mapping-cli", version, about = "Field mapping document tooling")]
struct Cli {
    /// TOML context configuration
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the field tree parsed from an inspection response
    Inspect {
        /// Document type: java, xml or json
        #[arg(long = "type", short = 't')]
        document_type: String,
        /// Inspection response file, `-` for stdin
        input: String,
    },
    /// Resolve a mapping document against saved inspection responses
    Resolve {
        /// Directory holding `<id>.json` inspection responses
        #[arg(long, short = 'd')]
        documents: PathBuf,
        /// Source document as id:type (repeatable)
        #[arg(long = "source", short = 's')]
        sources: Vec<String>,
        /// Target document as id:type (repeatable)
        #[arg(long = "target")]
        targets: Vec<String>,
        /// Mapping document, `-` for stdin
        #[arg(long, short = 'm')]
        mapping: Option<String>,
        /// Output file for the re-serialized mapping
        #[arg(long, short = 'o')]
        output: Option<PathBuf>,
    },
}

fn run(cli: Cli) -> Result<(), CliError> {
    let config = load_config(cli.config.as_deref())?;
    match cli.command {
        Command::Inspect { document_type, input } => handle_inspect(&document_type, &input, &config),
        Command::Resolve {
            documents,
            sources,
            targets,
            mapping,
            output,
        } => {
            let args = ResolveArgs {
                documents_dir: documents,
                sources,
                targets,
                mapping,
                output,
            };
            handle_resolve(&args, config)
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    run(Cli::parse())?;
    Ok(())
}
