//! IAM Policy Forge CLI
//!
//! Thin front end over the core library: composes managed policy documents
//! from statement-source files, validates existing documents, and assembles
//! assume-role trust documents. All output documents go to stdout as pretty
//! JSON; diagnostics go to stderr. Validation failures exit with code 2.

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use log::debug;

use iam_policy_forge_core::{
    assemble_trust_policy, compose_policy, normalize_sources, StatementSource, TrustSource,
};

#[derive(Parser)]
#[command(
    name = "iam-policy-forge",
    version,
    about = "Compose, validate, and assemble IAM policy documents"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compose a managed policy document from one or more source files
    Compose {
        /// Policy name, validated against the provider constraints
        #[arg(long)]
        name: String,
        /// Policy path
        #[arg(long, default_value = "/")]
        path: String,
        /// Policy description
        #[arg(long)]
        description: Option<String>,
        /// JSON policy documents whose statements merge in argument order
        #[arg(required = true)]
        sources: Vec<PathBuf>,
    },
    /// Validate a policy document and report its statement count
    Validate {
        /// JSON policy document to check
        file: PathBuf,
    },
    /// Assemble an assume-role trust document
    Trust {
        /// Service principal, repeatable (e.g. ec2.amazonaws.com)
        #[arg(long = "service")]
        services: Vec<String>,
        /// AWS account principal ARN, repeatable
        #[arg(long = "aws-account")]
        aws_accounts: Vec<String>,
        /// External id condition applied to the account principals
        #[arg(long)]
        external_id: Option<String>,
        /// Federated identity provider
        #[arg(long)]
        federated: Option<String>,
        /// Audience condition applied to the federated provider, repeatable
        #[arg(long = "audience")]
        audiences: Vec<String>,
    },
}

fn main() -> ExitCode {
    env_logger::init();
    let cli = Cli::parse();

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err:#}");
            ExitCode::from(2)
        }
    }
}

fn run(command: Command) -> Result<()> {
    match command {
        Command::Compose {
            name,
            path,
            description,
            sources,
        } => {
            let statement_sources = read_sources(&sources)?;
            let document =
                compose_policy(&name, &path, description.as_deref(), &statement_sources)?;
            println!("{}", document.to_json_pretty()?);
            Ok(())
        }
        Command::Validate { file } => {
            let json = fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let normalized = normalize_sources(&[StatementSource::document(
                file.display().to_string(),
                json,
            )])?;
            println!("{}: {} statements", file.display(), normalized.len());
            Ok(())
        }
        Command::Trust {
            services,
            aws_accounts,
            external_id,
            federated,
            audiences,
        } => {
            let mut sources = Vec::new();
            if !services.is_empty() {
                sources.push(TrustSource::Service {
                    identifiers: services,
                });
            }
            if !aws_accounts.is_empty() {
                sources.push(TrustSource::AwsAccount {
                    arns: aws_accounts,
                    external_id,
                });
            }
            if let Some(provider) = federated {
                sources.push(TrustSource::Federated {
                    provider,
                    audiences,
                });
            }

            let document = assemble_trust_policy(&sources)?;
            println!("{}", document.to_json_pretty()?);
            Ok(())
        }
    }
}

fn read_sources(files: &[PathBuf]) -> Result<Vec<StatementSource>> {
    let mut sources = Vec::with_capacity(files.len());
    for file in files {
        debug!("reading statement source {}", file.display());
        let json = fs::read_to_string(file)
            .with_context(|| format!("failed to read source file {}", file.display()))?;
        sources.push(StatementSource::document(file.display().to_string(), json));
    }
    Ok(sources)
}
