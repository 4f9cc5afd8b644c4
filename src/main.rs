//! Command-line entry point: extracts an OpenAPI document from the handler classes of a
//! TypeScript project.
//!
//! # Usage
//!
//! ```bash
//! openapi-from-handlers [OPTIONS] <PROJECT_PATH>
//! ```
//!
//! # Examples
//!
//! Generate YAML from a handler manifest:
//! ```bash
//! openapi-from-handlers ./napcat -m handlers.yaml -o openapi.yaml
//! ```
//!
//! Generate JSON with a project configuration:
//! ```bash
//! openapi-from-handlers ./napcat -c openapi-handlers.yaml -f json -o openapi.json
//! ```

use anyhow::Result;
use clap::Parser;
use log::info;
use openapi_from_handlers::cli;

fn main() -> Result<()> {
    // Parse first so that the verbose flag can pick the log level
    let args = cli::CliArgs::parse();

    let log_level = if args.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };

    env_logger::Builder::from_default_env()
        .filter_level(log_level)
        .init();

    info!("OpenAPI handler extractor starting...");

    let args = cli::parse_args_from_parsed(args)?;

    cli::run(args)?;

    info!("OpenAPI document generation completed successfully");

    Ok(())
}
