//! ABAPify CLI
//!
//! Command-line interface for generating ABAP code with LLMs, optionally
//! grounded on dictionary metadata read from an SAP system.

mod commands;
mod config_commands;
mod menu;
mod prompt;
mod sap_commands;

use abapify_common::{ConfigStore, SapEnvironment, Settings};
use abapify_generator::EnhancementType;
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use colored::*;
use commands::Request;
use config_commands::ConfigCommands;
use sap_commands::SapCodeType;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_LEVEL: &str = "warn";

#[derive(Parser)]
#[command(name = "abapify")]
#[command(
    version,
    about = "AI-assisted ABAP code generation with SAP dictionary awareness",
    long_about = None
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file
    #[arg(long, global = true, default_value = ".env")]
    config: PathBuf,
}

#[derive(Args)]
struct OutputArgs {
    /// Output directory (defaults to OUTPUT_DIR)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Output file name
    #[arg(short, long)]
    filename: Option<String>,
}

#[derive(Args)]
struct SapArgs {
    /// SAP environment used for table analysis
    #[arg(long)]
    sap_environment: Option<SapEnvironment>,

    /// Analyze the tables in SAP before generating
    #[arg(long)]
    analyze_tables: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate an ALV report
    #[command(after_help = "EXAMPLES:\n  \
        abapify generate-alv -d \"Open sales orders\" -t VBAK -t VBAP\n\n  \
        # Ground the prompt on the dictionary of the DEV system\n  \
        abapify generate-alv -d \"Orders per customer\" -t ZORDER \
        --analyze-tables --sap-environment DEV")]
    GenerateAlv {
        /// What the report should do
        #[arg(short, long)]
        description: String,

        /// Tables used by the report
        #[arg(short, long)]
        tables: Vec<String>,

        #[command(flatten)]
        sap: SapArgs,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Generate a report
    GenerateReport {
        #[arg(short, long)]
        description: String,

        #[arg(short, long)]
        tables: Vec<String>,

        #[command(flatten)]
        sap: SapArgs,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Generate a class
    GenerateClass {
        #[arg(short, long)]
        description: String,

        /// Methods to implement
        #[arg(short, long)]
        methods: Vec<String>,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Generate a function module
    GenerateFunction {
        #[arg(short, long)]
        description: String,

        /// Interface parameters
        #[arg(short, long)]
        params: Vec<String>,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Generate a dictionary structure
    GenerateStructure {
        #[arg(short, long)]
        description: String,

        /// Structure fields
        #[arg(long = "field")]
        fields: Vec<String>,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Generate unit tests for a class or function module
    GenerateTest {
        /// Class or function module under test
        #[arg(short, long)]
        target: String,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Generate a custom program through an interactive assistant
    GenerateProgram {
        #[command(flatten)]
        output: OutputArgs,
    },

    /// Generate an enhancement
    GenerateEnhancement {
        /// Object being enhanced
        #[arg(short, long)]
        base_object: String,

        /// BADI, Enhancement Point, Customer Exit or User Exit
        #[arg(short = 'y', long = "type")]
        enhancement_type: EnhancementType,

        /// Functionality to add
        #[arg(long)]
        functionality: String,

        /// Specific enhancement points
        #[arg(short, long)]
        enhancement_points: Vec<String>,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Analyze the structure of an SAP table
    AnalyzeTable {
        #[arg(short, long)]
        table_name: String,

        #[arg(short, long, default_value = "DEV")]
        environment: SapEnvironment,

        /// Include foreign-key relationships
        #[arg(long)]
        include_relationships: bool,

        /// Save the analysis as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Generate code grounded on SAP metadata
    #[command(after_help = "EXAMPLES:\n  \
        abapify sap-generate --type class -d \"Order repository\" -t ZORDER -t ZCUSTOMER -e QAS")]
    SapGenerate {
        #[arg(short = 'y', long = "type", value_enum)]
        code_type: SapCodeType,

        #[arg(short, long)]
        description: String,

        #[arg(short, long, required = true)]
        tables: Vec<String>,

        #[arg(short, long, default_value = "DEV")]
        environment: SapEnvironment,

        #[command(flatten)]
        output: OutputArgs,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

fn main() {
    let cli = Cli::parse();
    let store = ConfigStore::new(&cli.config);

    init_logging(cli.verbose, &store);

    if let Err(e) = run(cli, &store) {
        error!("{:#}", e);
        eprintln!("{} {:#}", "✗".red().bold(), e);
        std::process::exit(1);
    }
}

/// `RUST_LOG` wins, then `--verbose`, then `LOG_LEVEL`
fn init_logging(verbose: bool, store: &ConfigStore) {
    let level = if verbose {
        "debug".to_string()
    } else {
        std::env::var("LOG_LEVEL")
            .ok()
            .or_else(|| store.load().ok().and_then(|values| values.get("LOG_LEVEL").cloned()))
            .filter(|level| !level.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string())
            .to_ascii_lowercase()
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&level)),
        )
        .with_writer(std::io::stderr)
        .init();
}

fn run(cli: Cli, store: &ConfigStore) -> Result<()> {
    let settings = match Settings::load(store) {
        Ok(settings) => settings,
        Err(e) if matches!(cli.command, Some(Commands::Config { .. })) => {
            warn!("Ignoring invalid configuration: {}", e);
            eprintln!("{} Configuration could not be loaded: {}", "⚠".yellow(), e);
            Settings::from_values(BTreeMap::new())?
        }
        Err(e) => {
            return Err(e).context("Failed to load configuration; run `abapify config setup`")
        }
    };

    let Some(command) = cli.command else {
        return menu::run(store, &settings);
    };

    match command {
        Commands::GenerateAlv {
            description,
            tables,
            sap,
            output,
        } => {
            let output_dir = commands::output_dir(&settings, output.output);
            if sap.analyze_tables && !tables.is_empty() {
                sap_commands::run(
                    &settings,
                    sap.sap_environment.unwrap_or(SapEnvironment::Dev),
                    SapCodeType::Alv,
                    &description,
                    &tables,
                    &output_dir,
                    output.filename.as_deref(),
                )?;
            } else {
                let request = Request::Alv {
                    description,
                    tables,
                };
                commands::run(&settings, &request, &output_dir, output.filename.as_deref())?;
            }
        }
        Commands::GenerateReport {
            description,
            tables,
            sap,
            output,
        } => {
            let output_dir = commands::output_dir(&settings, output.output);
            if sap.analyze_tables && !tables.is_empty() {
                sap_commands::run(
                    &settings,
                    sap.sap_environment.unwrap_or(SapEnvironment::Dev),
                    SapCodeType::Report,
                    &description,
                    &tables,
                    &output_dir,
                    output.filename.as_deref(),
                )?;
            } else {
                let request = Request::Report {
                    description,
                    tables,
                };
                commands::run(&settings, &request, &output_dir, output.filename.as_deref())?;
            }
        }
        Commands::GenerateClass {
            description,
            methods,
            output,
        } => generate(
            &settings,
            Request::Class {
                description,
                methods,
            },
            output,
        )?,
        Commands::GenerateFunction {
            description,
            params,
            output,
        } => generate(
            &settings,
            Request::FunctionModule {
                description,
                params,
            },
            output,
        )?,
        Commands::GenerateStructure {
            description,
            fields,
            output,
        } => generate(
            &settings,
            Request::Structure {
                description,
                fields,
            },
            output,
        )?,
        Commands::GenerateTest { target, output } => {
            generate(&settings, Request::Test { target }, output)?
        }
        Commands::GenerateProgram { output } => {
            let spec = commands::ask_program_spec()?;
            generate(&settings, Request::CustomProgram(spec), output)?
        }
        Commands::GenerateEnhancement {
            base_object,
            enhancement_type,
            functionality,
            enhancement_points,
            output,
        } => generate(
            &settings,
            Request::Enhancement {
                base_object,
                enhancement_type,
                functionality,
                enhancement_points,
            },
            output,
        )?,
        Commands::AnalyzeTable {
            table_name,
            environment,
            include_relationships,
            output,
        } => {
            let client = sap_commands::connect(&settings, environment)?;
            let result = sap_commands::analyze_table(
                &client,
                &table_name.to_ascii_uppercase(),
                include_relationships,
                output.as_deref(),
            );
            client.close();
            result?;
        }
        Commands::SapGenerate {
            code_type,
            description,
            tables,
            environment,
            output,
        } => {
            let output_dir = commands::output_dir(&settings, output.output);
            let tables: Vec<String> = tables.iter().map(|t| t.to_ascii_uppercase()).collect();
            sap_commands::run(
                &settings,
                environment,
                code_type,
                &description,
                &tables,
                &output_dir,
                output.filename.as_deref(),
            )?;
        }
        Commands::Config { command } => config_commands::run(command, store, &settings)?,
    }

    Ok(())
}

fn generate(settings: &Settings, request: Request, output: OutputArgs) -> Result<()> {
    let output_dir = commands::output_dir(settings, output.output);
    commands::run(settings, &request, &output_dir, output.filename.as_deref())?;
    Ok(())
}
