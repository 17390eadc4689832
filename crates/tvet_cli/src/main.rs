//! terravet CLI - Main entry point.
//!
//! Exit codes:
//! - 0: Success
//! - 1: General error
//! - 2: Configuration error
//! - 3: Validation failure
//! - 4: Interrupted

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;

use commands::{Cli, Commands};

/// CI-friendly exit codes
pub struct ExitCodes;

impl ExitCodes {
    pub const SUCCESS: u8 = 0;
    pub const GENERAL_ERROR: u8 = 1;
    pub const CONFIG_ERROR: u8 = 2;
    pub const VALIDATION_FAILURE: u8 = 3;
    pub const INTERRUPTED: u8 = 4;
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    let default_level = if cli.quiet {
        "terravet=warn"
    } else if cli.verbose {
        "terravet=debug"
    } else {
        "terravet=info"
    };
    let filter = EnvFilter::from_env("TERRAVET_LOG")
        .add_directive(default_level.parse().unwrap())
        .add_directive("warn".parse().unwrap());

    let fmt_layer = if cli.log_json {
        fmt::layer().json().with_target(false).boxed()
    } else {
        fmt::layer().with_target(false).boxed()
    };
    let log_result = tracing_subscriber::registry()
        .with(fmt_layer)
        .with(filter)
        .try_init();

    if log_result.is_err() {
        // Logging already initialized, continue
    }

    let result = match cli.command {
        Commands::Analyze(args) => commands::analyze::execute(args).await,
        Commands::Validate(args) => commands::validate::execute(args).await,
        Commands::Remediate(args) => commands::remediate::execute(args).await,
        Commands::Rules(args) => commands::rules::execute(args).await,
    };

    match result {
        Ok(()) => ExitCode::from(ExitCodes::SUCCESS),
        Err(e) => {
            // Determine appropriate exit code based on error
            let exit_code = categorize_error(&e);
            eprintln!("❌ Error: {:#}", e);
            ExitCode::from(exit_code)
        }
    }
}

/// Categorize error to determine exit code
fn categorize_error(e: &anyhow::Error) -> u8 {
    let msg = e.to_string().to_lowercase();

    if msg.contains("not found")
        || msg.contains("not a terraform")
        || msg.contains("empty")
        || msg.contains("unknown category")
        || msg.contains("unknown export")
        || msg.contains("rule definitions")
        || msg.contains("--write")
    {
        ExitCodes::CONFIG_ERROR
    } else if msg.contains("validation") || msg.contains("remediation") {
        ExitCodes::VALIDATION_FAILURE
    } else {
        ExitCodes::GENERAL_ERROR
    }
}
