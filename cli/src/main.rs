use clap::{Parser, Subcommand};
use std::fs;
use std::path::PathBuf;
use tracing::error;
use tracing_subscriber::EnvFilter;

use relgen_cli::run_generate;
use relgen_compiler::error::RelgenError;
use relgen_compiler::{compile_entities, compile_header, GenOptions};

#[derive(Parser)]
#[command(name = "relgen")]
#[command(about = "Generate relational mapping headers from @relais-annotated C++ structs", long_about = None)]
struct Cli {
    /// Log dropped input and every scanned file
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan headers and write one `<Class>Wrapper.h` per annotated entity
    Generate {
        /// Header files or directories to scan (directories are walked recursively)
        #[arg(short, long, required = true, num_args = 1..)]
        sources: Vec<PathBuf>,

        /// Directory receiving the generated headers
        #[arg(short, long)]
        output_dir: PathBuf,
    },

    /// Print the entity descriptors found in a header as JSON
    Inspect {
        /// Annotated header
        input: PathBuf,
    },

    /// Print the generated headers for one file instead of writing them
    Print {
        /// Annotated header
        input: PathBuf,
    },
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| default.into()),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<(), RelgenError> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match &cli.command {
        Commands::Generate { sources, output_dir } => {
            let report = run_generate(sources, output_dir)?;
            println!("Generated {} wrapper(s) in {}", report.written.len(), output_dir.display());
            if !report.failed.is_empty() {
                error!("{} file(s) could not be processed", report.failed.len());
                std::process::exit(1);
            }
            Ok(())
        }

        Commands::Inspect { input } => {
            let text = fs::read_to_string(input)?;
            let entities = compile_entities(&text, &input.to_string_lossy())?;
            println!("{}", serde_json::to_string_pretty(&entities)?);
            Ok(())
        }

        Commands::Print { input } => {
            let text = fs::read_to_string(input)?;
            let options = GenOptions {
                source_include: input.to_string_lossy().into_owned(),
                source_name:    input
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default(),
            };
            for unit in compile_header(&text, &input.to_string_lossy(), &options)? {
                println!("// ---- {} ----", unit.file_name);
                println!("{}", unit.text);
            }
            Ok(())
        }
    }
}
