use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use log::{debug, info, warn};
use std::path::PathBuf;

use crate::config::ProjectConfig;
use crate::openapi_builder::Info;

/// Generate an OpenAPI document from TypeScript handler classes
#[derive(Parser, Debug)]
#[command(name = "openapi-from-handlers")]
#[command(author, version, about, long_about = None)]
pub struct CliArgs {
    /// Path to the project directory
    #[arg(value_name = "PROJECT_PATH")]
    pub project_path: PathBuf,

    /// Handler manifest (YAML or JSON) listing operations and their classes
    #[arg(short = 'm', long = "handlers", value_name = "FILE")]
    pub handlers: Option<PathBuf>,

    /// Type to emit as a component even if no handler references it (repeatable)
    #[arg(short = 't', long = "type", value_name = "NAME")]
    pub types: Vec<String>,

    /// Project configuration file
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Output format (yaml or json)
    #[arg(short = 'f', long = "format", value_enum, default_value = "yaml")]
    pub output_format: OutputFormat,

    /// Output file path (if not specified, outputs to stdout)
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    pub output_path: Option<PathBuf>,

    /// Title of the generated document
    #[arg(long = "title")]
    pub title: Option<String>,

    /// Version of the generated document
    #[arg(long = "api-version")]
    pub api_version: Option<String>,

    /// Enable verbose output
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,
}

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// YAML format
    Yaml,
    /// JSON format
    Json,
}

/// Parse command line arguments
pub fn parse_args() -> Result<CliArgs> {
    let args = CliArgs::parse();
    parse_args_from_parsed(args)
}

/// Validate and log already-parsed arguments
pub fn parse_args_from_parsed(args: CliArgs) -> Result<CliArgs> {
    debug!("Parsed arguments: {:?}", args);

    if !args.project_path.exists() {
        anyhow::bail!(
            "Project path does not exist: {}",
            args.project_path.display()
        );
    }

    if !args.project_path.is_dir() {
        anyhow::bail!(
            "Project path is not a directory: {}",
            args.project_path.display()
        );
    }

    info!("Project path: {}", args.project_path.display());
    info!("Output format: {:?}", args.output_format);
    if let Some(ref output) = args.output_path {
        info!("Output file: {}", output.display());
    } else {
        info!("Output: stdout");
    }

    Ok(args)
}

/// Settings of one run after merging the config file with the command line.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSettings {
    pub source_root: PathBuf,
    /// Handler manifest, absent when only named types are requested
    pub handlers: Option<PathBuf>,
    /// Named types from the config file followed by those from the command line
    pub types: Vec<String>,
    pub info: Info,
    pub config: ProjectConfig,
}

/// Merges the optional config file and the command-line flags. Flags win.
pub fn resolve_settings(args: &CliArgs) -> Result<RunSettings> {
    let config = match &args.config {
        Some(path) => ProjectConfig::load(path)
            .with_context(|| format!("Failed to load configuration: {}", path.display()))?,
        None => {
            let candidate = args.project_path.join("openapi-handlers.yaml");
            if candidate.is_file() {
                info!("Using configuration: {}", candidate.display());
                ProjectConfig::load(&candidate)
                    .with_context(|| format!("Failed to load configuration: {}", candidate.display()))?
            } else {
                ProjectConfig::default()
            }
        }
    };

    let source_root = match &config.source_root {
        Some(dir) => args.project_path.join(dir),
        None => args.project_path.clone(),
    };
    let handlers = match (&args.handlers, &config.handlers) {
        (Some(path), _) => Some(path.clone()),
        (None, Some(path)) => Some(args.project_path.join(path)),
        (None, None) => None,
    };
    let mut types: Vec<String> = Vec::new();
    for name in config.types.iter().chain(&args.types) {
        if !types.contains(name) {
            types.push(name.clone());
        }
    }
    if handlers.is_none() && types.is_empty() {
        anyhow::bail!(
            "Nothing to generate. Use --handlers or --type, or set `handlers` or `types` in the config file"
        );
    }

    let defaults = crate::openapi_builder::OpenApiBuilder::default_info();
    let info = Info {
        title: args
            .title
            .clone()
            .or_else(|| config.info.title.clone())
            .unwrap_or(defaults.title),
        version: args
            .api_version
            .clone()
            .or_else(|| config.info.version.clone())
            .unwrap_or(defaults.version),
        description: config.info.description.clone().or(defaults.description),
    };

    Ok(RunSettings {
        source_root,
        handlers,
        types,
        info,
        config,
    })
}

/// Run the main workflow
pub fn run(args: CliArgs) -> Result<()> {
    use crate::generator::ContractGenerator;
    use crate::oracle::ProjectIndex;
    use crate::parser::{ParsedFile, SourceParser};
    use crate::registry::ManifestRegistry;
    use crate::scanner::FileScanner;
    use crate::serializer::{serialize_json, serialize_yaml, write_to_file};

    info!("Starting OpenAPI document generation...");
    let settings = resolve_settings(&args)?;

    // Step 1: Scan directory for source files
    info!("Scanning {}...", settings.source_root.display());
    let scanner = FileScanner::new(settings.source_root.clone()).with_excludes(settings.config.exclude.clone());
    let scan_result = scanner.scan()?;

    info!("Found {} source files", scan_result.source_files.len());
    for warning in &scan_result.warnings {
        warn!("{}", warning);
    }

    if scan_result.source_files.is_empty() {
        anyhow::bail!("No TypeScript files found in {}", settings.source_root.display());
    }

    // Step 2: Parse declarations
    info!("Parsing source files...");
    let parsed_files: Vec<ParsedFile> = SourceParser::parse_files(&args.project_path, &scan_result.source_files)
        .into_iter()
        .filter_map(|r| match r {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                warn!("Skipping file due to parse error: {}", e);
                None
            }
        })
        .collect();
    let parsed_count = parsed_files.len();
    info!("Successfully parsed {} files", parsed_count);

    // Step 3: Index declarations
    info!("Indexing declarations...");
    let index = ProjectIndex::build(parsed_files, &settings.config.aliases).map_err(crate::error::Error::from)?;
    info!(
        "Indexed {} declarations in {} modules",
        index.declaration_count(),
        index.module_count()
    );

    // Step 4: Load the handler registry
    let registry = match &settings.handlers {
        Some(path) => {
            let registry = ManifestRegistry::load(path)?;
            info!("Loaded {} handler entries from {}", registry.len(), path.display());
            registry
        }
        None => {
            info!("No handler manifest, emitting named types only");
            ManifestRegistry::from_entries(Vec::new())
        }
    };

    // Step 5: Resolve, expand and assemble
    let report = ContractGenerator::new(&index, settings.config.expansion_options())
        .with_info(settings.info.clone())
        .with_types(settings.types.clone())
        .generate(&registry)?;
    info!("OpenAPI document built successfully");

    // Step 6: Serialize to requested format
    info!("Serializing to {:?} format...", args.output_format);
    let content = match args.output_format {
        OutputFormat::Yaml => serialize_yaml(&report.document)?,
        OutputFormat::Json => serialize_json(&report.document)?,
    };

    // Step 7: Output to file or stdout
    if let Some(output_path) = &args.output_path {
        info!("Writing output to: {}", output_path.display());
        write_to_file(&content, output_path)?;
        info!("Successfully wrote OpenAPI document to {}", output_path.display());
    } else {
        println!("{}", content);
    }

    info!("Generation complete!");
    info!("Summary:");
    info!("  - Files scanned: {}", scan_result.source_files.len());
    info!("  - Files parsed: {}", parsed_count);
    info!("  - Operations emitted: {}", report.operations.len());
    info!("  - Named types emitted: {}", report.types.len());
    info!("  - Operations or types skipped: {}", report.skipped.len());
    info!("  - Components: {}", report.component_count());
    for skipped in &report.skipped {
        debug!("    skipped `{}`: {}", skipped.operation, skipped.reason);
    }

    Ok(())
}
