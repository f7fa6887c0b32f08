//! Command line interface for xsdkit
//!
//! A thin wrapper over the library surface: validate XML files against a
//! schema, or decode them to JSON.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use xsdkit::{DecodeOptions, ValidationMode, XmlSchema};

#[derive(Parser)]
#[command(name = "xsdkit", version, about = "XML Schema validation and conversion")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Validate XML documents against a schema
    Validate {
        /// Path to the XSD schema
        #[arg(short, long)]
        schema: PathBuf,
        /// XML documents to validate
        #[arg(required = true)]
        documents: Vec<PathBuf>,
    },
    /// Decode an XML document to JSON
    Decode {
        /// Path to the XSD schema
        #[arg(short, long)]
        schema: PathBuf,
        /// XML document to decode
        document: PathBuf,
        /// Validation mode: strict, lax or skip
        #[arg(short, long, default_value = "strict")]
        mode: String,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> xsdkit::Result<ExitCode> {
    match cli.command {
        Command::Validate { schema, documents } => {
            let schema = XmlSchema::from_file(&schema)?;
            let mut failures = 0usize;
            for document in &documents {
                let xml = std::fs::read_to_string(document)?;
                match schema.validate(&xml) {
                    Ok(()) => println!("{}: valid", document.display()),
                    Err(e) => {
                        failures += 1;
                        println!("{}: INVALID", document.display());
                        eprintln!("{}", e);
                    }
                }
            }
            Ok(if failures == 0 {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Command::Decode {
            schema,
            document,
            mode,
        } => {
            let mode = ValidationMode::from_value(&mode)?;
            let schema = XmlSchema::from_file(&schema)?;
            let xml = std::fs::read_to_string(&document)?;
            let (value, errors) = schema.decode(
                &xml,
                &DecodeOptions {
                    mode,
                    ..DecodeOptions::default()
                },
            )?;
            println!(
                "{}",
                serde_json::to_string_pretty(&value)
                    .map_err(|e| xsdkit::Error::Value(e.to_string()))?
            );
            for error in &errors {
                eprintln!("warning: {}", error);
            }
            Ok(if errors.is_empty() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
    }
}
