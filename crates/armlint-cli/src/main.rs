use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use armlint::{describe_rules, exceeds, render, run_lint, FailOn, LintRequest, OutputFormat};
use armlint_core::SpecKinds;
use armlint_engine::CONFIG_ENV;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "armlint")]
#[command(about = "Validate Azure Resource Manager API descriptions", long_about = None, version)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Enable debug output
    #[arg(short, long)]
    debug: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Lint one or more documents and the documents they reference
    Lint {
        /// Document paths or URLs
        #[arg(required = true)]
        files: Vec<String>,

        /// Document kind (arm, data-plane, default); overrides the config file
        #[arg(short, long)]
        kind: Option<SpecKinds>,

        /// Config file (YAML, JSON or TOML)
        #[arg(short, long, env = CONFIG_ENV)]
        config: Option<PathBuf>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Exit non-zero when a message is at least this severe
        #[arg(long, value_enum, default_value = "error")]
        fail_on: FailOn,
    },

    /// List the built-in rules
    Rules {
        /// Only rules that apply to this kind
        #[arg(short, long)]
        kind: Option<SpecKinds>,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    // RUST_LOG wins over the flags
    let level = if cli.debug {
        "trace"
    } else if cli.verbose {
        "debug"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(cli.debug)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Lint {
            files,
            kind,
            config,
            format,
            fail_on,
        } => {
            let request = LintRequest {
                files,
                kind,
                config,
            };
            let messages = run_lint(&request).await?;
            println!("{}", render(&messages, format)?);

            if exceeds(&messages, fail_on) {
                Ok(ExitCode::FAILURE)
            } else {
                Ok(ExitCode::SUCCESS)
            }
        }
        Commands::Rules { kind } => {
            println!("{}", describe_rules(kind)?);
            Ok(ExitCode::SUCCESS)
        }
    }
}
