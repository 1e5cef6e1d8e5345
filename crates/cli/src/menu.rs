//! Interactive menu shown when no subcommand is given

use crate::commands::{self, Request};
use crate::config_commands::{self, ConfigCommands};
use crate::prompt;
use crate::sap_commands;
use abapify_common::{ConfigStore, SapEnvironment, Settings};
use abapify_generator::EnhancementType;
use anyhow::{bail, Result};
use colored::*;
use std::fmt;
use std::path::PathBuf;
use tracing::error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MenuChoice {
    Alv,
    Report,
    Class,
    FunctionModule,
    Structure,
    Test,
    CustomProgram,
    Enhancement,
    AnalyzeTable,
    SapGenerate,
    Settings,
    Exit,
}

impl MenuChoice {
    const ALL: [MenuChoice; 12] = [
        MenuChoice::Alv,
        MenuChoice::Report,
        MenuChoice::Class,
        MenuChoice::FunctionModule,
        MenuChoice::Structure,
        MenuChoice::Test,
        MenuChoice::CustomProgram,
        MenuChoice::Enhancement,
        MenuChoice::AnalyzeTable,
        MenuChoice::SapGenerate,
        MenuChoice::Settings,
        MenuChoice::Exit,
    ];
}

impl fmt::Display for MenuChoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            MenuChoice::Alv => "Generate ALV report",
            MenuChoice::Report => "Generate report",
            MenuChoice::Class => "Generate class",
            MenuChoice::FunctionModule => "Generate function module",
            MenuChoice::Structure => "Generate structure",
            MenuChoice::Test => "Generate unit test",
            MenuChoice::CustomProgram => "Generate custom program",
            MenuChoice::Enhancement => "Generate enhancement",
            MenuChoice::AnalyzeTable => "Analyze SAP table",
            MenuChoice::SapGenerate => "SAP-aware generation",
            MenuChoice::Settings => "Show settings",
            MenuChoice::Exit => "Exit",
        };
        f.write_str(label)
    }
}

/// Loop until the user exits; failures are reported and the loop continues
pub fn run(store: &ConfigStore, settings: &Settings) -> Result<()> {
    println!("{}", "ABAPify - AI-assisted ABAP code generation".bold().blue());

    loop {
        println!();
        let choice = prompt::select("What do you want to do?", MenuChoice::ALL.to_vec())?;
        if choice == MenuChoice::Exit {
            println!("Bye!");
            return Ok(());
        }

        if let Err(e) = handle(choice, store, settings) {
            error!("{:#}", e);
            eprintln!("{} {:#}", "✗".red(), e);
        }
    }
}

fn handle(choice: MenuChoice, store: &ConfigStore, settings: &Settings) -> Result<()> {
    let request = match choice {
        MenuChoice::Alv => Request::Alv {
            description: prompt::text("Report description")?,
            tables: prompt::list("Table")?,
        },
        MenuChoice::Report => Request::Report {
            description: prompt::text("Report description")?,
            tables: prompt::list("Table")?,
        },
        MenuChoice::Class => Request::Class {
            description: prompt::text("Class description")?,
            methods: prompt::list("Method")?,
        },
        MenuChoice::FunctionModule => Request::FunctionModule {
            description: prompt::text("Function module description")?,
            params: prompt::list("Parameter")?,
        },
        MenuChoice::Structure => Request::Structure {
            description: prompt::text("Structure description")?,
            fields: prompt::list("Field")?,
        },
        MenuChoice::Test => Request::Test {
            target: prompt::text("Class or function module under test")?,
        },
        MenuChoice::CustomProgram => Request::CustomProgram(commands::ask_program_spec()?),
        MenuChoice::Enhancement => Request::Enhancement {
            base_object: prompt::text("Base object")?,
            enhancement_type: prompt::select("Enhancement type", EnhancementType::ALL.to_vec())?,
            functionality: prompt::text("Functionality to add")?,
            enhancement_points: prompt::list("Enhancement point")?,
        },
        MenuChoice::AnalyzeTable => return analyze_table(settings),
        MenuChoice::SapGenerate => return sap_generate(settings),
        MenuChoice::Settings => return config_commands::run(ConfigCommands::Show, store, settings),
        MenuChoice::Exit => return Ok(()),
    };

    commands::run(settings, &request, &settings.output_dir, None)?;
    Ok(())
}

fn ask_environment() -> Result<SapEnvironment> {
    prompt::select("SAP environment", SapEnvironment::ALL.to_vec())
}

fn analyze_table(settings: &Settings) -> Result<()> {
    let environment = ask_environment()?;
    let table = prompt::text("Table name")?.to_ascii_uppercase();
    let include_relationships = prompt::confirm("Include relationships?", true)?;
    let output = prompt::optional_text("Save analysis as JSON (file path)")?.map(PathBuf::from);

    let client = sap_commands::connect(settings, environment)?;
    let result =
        sap_commands::analyze_table(&client, &table, include_relationships, output.as_deref());
    client.close();
    result.map(|_| ())
}

fn sap_generate(settings: &Settings) -> Result<()> {
    let environment = ask_environment()?;
    let kind = prompt::select(
        "Code type",
        vec![
            sap_commands::SapCodeType::Alv,
            sap_commands::SapCodeType::Report,
            sap_commands::SapCodeType::Class,
        ],
    )?;
    let description = prompt::text("Description")?;
    let tables: Vec<String> = prompt::list("Table")?
        .into_iter()
        .map(|t| t.to_ascii_uppercase())
        .collect();
    if tables.is_empty() {
        bail!("At least one table is required for SAP-aware generation");
    }

    sap_commands::run(
        settings,
        environment,
        kind,
        &description,
        &tables,
        &settings.output_dir,
        None,
    )?;
    Ok(())
}
