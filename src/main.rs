//! Contract Forge CLI
//!
//! Usage:
//!   contract-forge [OPTIONS] <COMMAND>
//!
//! Commands:
//!   generate            Compile a definition and write the artifacts
//!   validate            Check a definition without generating anything
//!   list-jurisdictions  List jurisdictions with rules
//!   list-types          List supported contract types
//!
//! Options:
//!   -c, --config <FILE>     Compiler configuration (TOML format)
//!   -r, --rules <FILE>      Jurisdiction rule table (YAML format)
//!   -t, --templates <DIR>   Template directory
//!   -h, --help              Print help
//!
//! Set `RUST_LOG=debug` to see what the compiler loads and composes.

use std::fs;
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use contract_forge::{ArtifactRole, CompileError, Compiler, CompilerConfig, GeneratedArtifact};

#[derive(Parser)]
#[command(name = "contract-forge")]
#[command(about = "Compile contract definitions into jurisdiction-compliant smart contracts")]
struct Cli {
    /// Compiler configuration file (TOML format)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Jurisdiction rule table, replacing the configured or built-in one
    #[arg(short, long, global = true)]
    rules: Option<PathBuf>,

    /// Template directory, replacing the configured or built-in templates
    #[arg(short, long, global = true)]
    templates: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compile a definition and write the contract, deploy script and tests
    Generate {
        /// Contract definition (YAML format)
        #[arg(short, long)]
        file: PathBuf,

        /// Output directory
        #[arg(short, long, default_value = "generated")]
        output: PathBuf,
    },
    /// Check a definition against the jurisdiction rules
    Validate {
        /// Contract definition (YAML format)
        #[arg(short, long)]
        file: PathBuf,
    },
    /// List jurisdictions with rules
    ListJurisdictions,
    /// List contract types supported by a jurisdiction, or by any
    ListTypes {
        #[arg(short, long)]
        jurisdiction: Option<String>,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let compiler = match build_compiler(&cli) {
        Ok(compiler) => compiler,
        Err(e) => fail(&e),
    };

    match &cli.command {
        Command::Generate { file, output } => match compiler.compile_file(file) {
            Ok(artifact) => {
                if let Err(e) = write_artifacts(&artifact, output) {
                    eprintln!("Error writing to '{}': {}", output.display(), e);
                    process::exit(1);
                }
            }
            Err(e) => fail(&e),
        },
        Command::Validate { file } => match compiler.compile_file(file) {
            Ok(artifact) => {
                let definition = artifact.definition();
                println!(
                    "{}: valid {} contract for {} ({} parties, {} conditions)",
                    file.display(),
                    definition.contract_type(),
                    definition.jurisdiction(),
                    definition.parties().len(),
                    definition.conditions().len()
                );
            }
            Err(e) => fail(&e),
        },
        Command::ListJurisdictions => {
            for jurisdiction in compiler.rules().jurisdictions() {
                println!("{}", jurisdiction);
            }
        }
        Command::ListTypes { jurisdiction } => match jurisdiction {
            Some(jurisdiction) => {
                if !compiler.rules().supports_jurisdiction(jurisdiction) {
                    eprintln!("Error: unsupported jurisdiction '{}'", jurisdiction);
                    process::exit(1);
                }
                for contract_type in compiler.rules().contract_types(jurisdiction) {
                    println!("{}", contract_type);
                }
            }
            None => {
                for jurisdiction in compiler.rules().jurisdictions() {
                    println!(
                        "{}: {}",
                        jurisdiction,
                        compiler.rules().contract_types(jurisdiction).join(", ")
                    );
                }
            }
        },
    }
}

/// Config file first, then command-line source overrides
fn build_compiler(cli: &Cli) -> Result<Compiler, CompileError> {
    let mut config = match &cli.config {
        Some(path) => CompilerConfig::from_file(path)?,
        None => CompilerConfig::new(),
    };
    if let Some(rules) = &cli.rules {
        config = config.with_rules(rules);
    }
    if let Some(templates) = &cli.templates {
        config = config.with_templates(templates);
    }
    Compiler::from_config(&config)
}

fn write_artifacts(artifact: &GeneratedArtifact, output: &Path) -> std::io::Result<()> {
    fs::create_dir_all(output)?;
    for role in ArtifactRole::ALL {
        let path = output.join(artifact.suggested_file_name(role));
        fs::write(&path, artifact.body(role))?;
        println!("{} {}", role, path.display());
    }

    let definition = artifact.definition();
    let provenance = artifact
        .provenance_json()
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
    let path = output.join(format!(
        "{}_{}.provenance.json",
        definition.contract_type(),
        definition.jurisdiction()
    ));
    fs::write(&path, provenance)?;
    println!("provenance {}", path.display());
    Ok(())
}

/// Print an error, one line per validation problem, and exit
fn fail(error: &CompileError) -> ! {
    match error.validation_errors() {
        Some(errors) => {
            eprintln!("Validation failed with {} error(s):", errors.len());
            for e in errors {
                eprintln!("  {}", e);
            }
        }
        None => eprintln!("Error: {}", error),
    }
    process::exit(1);
}
