//! Commands that talk to an SAP system

use crate::commands::build_generator;
use abapify_analyzer::{
    build_analysis_context, build_table_context, detect_naming_patterns, format_analysis_summary,
    format_table_report, MetadataAnalyzer, CUSTOM_OBJECT_PATTERN,
};
use abapify_common::{SapEnvironment, Settings, Table};
use abapify_generator::{default_filename, write_artifact, AbapGenerator};
use abapify_sap::{ConnectionResolver, SapClient, SapConnection};
use anyhow::{bail, Context, Result};
use clap::ValueEnum;
use colored::*;
use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::info;

/// Depth used when collecting related tables for prompts
const RELATED_DEPTH: usize = 1;
const SUBJECT_LEN: usize = 20;

/// Artifact kinds supported by `sap-generate`
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SapCodeType {
    Alv,
    Report,
    Class,
}

impl SapCodeType {
    pub fn filename_prefix(&self) -> String {
        format!("z_{}_", self)
    }
}

impl fmt::Display for SapCodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SapCodeType::Alv => "alv",
            SapCodeType::Report => "report",
            SapCodeType::Class => "class",
        };
        f.write_str(name)
    }
}

/// Open a client for the configured environment
pub fn connect(settings: &Settings, environment: SapEnvironment) -> Result<SapClient> {
    let resolver = ConnectionResolver::new(settings)?;
    let config = resolver.resolve_valid(environment).with_context(|| {
        format!(
            "SAP {} is not configured; run `abapify config sap -e {}`",
            environment, environment
        )
    })?;
    let client = SapClient::new(config)
        .with_context(|| format!("Failed to connect to SAP {}", environment))?;
    info!("Connected to SAP environment {}", environment);
    Ok(client)
}

/// Analyze one table, print the report and optionally save it as JSON.
///
/// Nothing is written when the analysis fails.
pub fn analyze_table(
    connection: &dyn SapConnection,
    table_name: &str,
    include_relationships: bool,
    output: Option<&Path>,
) -> Result<Table> {
    println!("{} Analyzing table {}", "→".cyan(), table_name.yellow());

    let mut analyzer = MetadataAnalyzer::new(connection);
    let table = analyzer
        .analyze_table(table_name, include_relationships)
        .with_context(|| format!("Failed to analyze table {}", table_name))?;

    print!("{}", format_table_report(&table)?);

    if let Some(path) = output {
        table
            .write_json(path)
            .with_context(|| format!("Failed to save analysis to {}", path.display()))?;
        println!("{} Analysis saved: {}", "✓".green(), path.display());
    }

    Ok(table.as_ref().clone())
}

/// Connect, generate SAP-aware code and save it to `output_dir`
pub fn run(
    settings: &Settings,
    environment: SapEnvironment,
    kind: SapCodeType,
    description: &str,
    table_names: &[String],
    output_dir: &Path,
    filename: Option<&str>,
) -> Result<PathBuf> {
    println!(
        "{} Generating SAP-aware {} using {}: {}",
        "→".cyan(),
        kind,
        environment,
        description.yellow()
    );

    let generator = build_generator(settings)?;
    let client = connect(settings, environment)?;
    let code = sap_aware_generate(&client, &generator, kind, description, table_names);
    client.close();
    let code = code?;

    let filename = filename
        .map(str::to_string)
        .unwrap_or_else(|| default_filename(&kind.filename_prefix(), description, SUBJECT_LEN));
    let path =
        write_artifact(output_dir, &filename, &code).context("Failed to save generated code")?;

    println!("{} SAP-aware code generated: {}", "✓".green(), path.display());
    Ok(path)
}

/// Generate code of `kind` grounded on the analyzed tables
pub fn sap_aware_generate(
    connection: &dyn SapConnection,
    generator: &AbapGenerator,
    kind: SapCodeType,
    description: &str,
    table_names: &[String],
) -> Result<String> {
    match kind {
        SapCodeType::Alv => sap_aware_alv(connection, generator, description, table_names),
        SapCodeType::Report => sap_aware_report(connection, generator, description, table_names),
        SapCodeType::Class => sap_aware_class(connection, generator, description, table_names),
    }
}

/// ALV built from table structures, their direct neighbours and the
/// naming conventions of existing custom code
pub fn sap_aware_alv(
    connection: &dyn SapConnection,
    generator: &AbapGenerator,
    description: &str,
    table_names: &[String],
) -> Result<String> {
    let mut analyzer = MetadataAnalyzer::new(connection);
    let tables = analyze_tables(&mut analyzer, table_names)?;

    let mut related = BTreeSet::new();
    for table in &tables {
        related.extend(analyzer.find_related_tables(&table.name, RELATED_DEPTH));
    }
    let related: Vec<String> = related.into_iter().collect();

    let objects = analyzer
        .analyze_custom_objects(CUSTOM_OBJECT_PATTERN)
        .context("Failed to analyze custom objects")?;
    let patterns = detect_naming_patterns(&objects);

    let context = build_table_context(&tables, &related, &patterns)?;
    let analyzed: Vec<String> = tables.iter().map(|t| t.name.clone()).collect();

    generator
        .generate_sap_alv(description, &analyzed, &related, &context)
        .context("Failed to generate SAP-aware ALV")
}

/// Report built from a full analysis including custom objects
pub fn sap_aware_report(
    connection: &dyn SapConnection,
    generator: &AbapGenerator,
    description: &str,
    table_names: &[String],
) -> Result<String> {
    let mut analyzer = MetadataAnalyzer::new(connection);
    let result = analyzer
        .generate_full_analysis(table_names, true)
        .context("SAP analysis failed")?;
    if result.tables.is_empty() {
        bail!("None of the tables could be analyzed: {}", table_names.join(", "));
    }

    print!("{}", format_analysis_summary(&result)?);

    let context = build_analysis_context(&result)?;
    let analyzed: Vec<String> = result.tables.iter().map(|t| t.name.clone()).collect();

    generator
        .generate_sap_report(description, &analyzed, &context)
        .context("Failed to generate SAP-aware report")
}

/// Class designed around the analyzed table structures
pub fn sap_aware_class(
    connection: &dyn SapConnection,
    generator: &AbapGenerator,
    description: &str,
    table_names: &[String],
) -> Result<String> {
    let mut analyzer = MetadataAnalyzer::new(connection);
    let tables = analyze_tables(&mut analyzer, table_names)?;

    let context = build_table_context(&tables, &[], &Default::default())?;
    let analyzed: Vec<String> = tables.iter().map(|t| t.name.clone()).collect();

    generator
        .generate_sap_class(description, &analyzed, &context)
        .context("Failed to generate SAP-aware class")
}

/// Print tables matching `pattern`
pub fn list_tables(
    connection: &dyn SapConnection,
    pattern: &str,
    limit: usize,
) -> Result<Vec<String>> {
    let analyzer = MetadataAnalyzer::new(connection);
    let tables = analyzer
        .search_custom_tables(pattern, limit)
        .context("Failed to search tables")?;

    if tables.is_empty() {
        println!("{} No tables match {}", "⚠".yellow(), pattern);
    } else {
        println!("{} {} tables match {}", "✓".green(), tables.len(), pattern);
        for table in &tables {
            println!("  • {}", table);
        }
    }

    Ok(tables)
}

fn analyze_tables(
    analyzer: &mut MetadataAnalyzer<'_>,
    table_names: &[String],
) -> Result<Vec<Table>> {
    println!("{} Analyzing tables: {}", "→".cyan(), table_names.join(", ").yellow());

    let tables = analyzer
        .analyze_multiple_tables(table_names)
        .context("SAP analysis failed")?;
    if tables.is_empty() {
        bail!("None of the tables could be analyzed: {}", table_names.join(", "));
    }

    println!("{} {} of {} tables analyzed", "✓".green(), tables.len(), table_names.len());
    Ok(tables)
}

#[cfg(test)]
mod tests {
    use super::*;
    use abapify_common::LlmSettings;
    use abapify_generator::LlmClient;
    use abapify_sap::InMemoryConnection;
    use tempfile::TempDir;

    fn connection() -> InMemoryConnection {
        InMemoryConnection::new()
            .with_simple_table(
                "ZORDER",
                "Sales orders",
                &[
                    ("MANDT", "CLNT", 3, true),
                    ("ORDER_ID", "NUMC", 10, true),
                    ("KUNNR", "CHAR", 10, false),
                ],
            )
            .with_simple_table("ZCUSTOMER", "Customers", &[("KUNNR", "CHAR", 10, true)])
            .with_foreign_key("ZORDER", "KUNNR", "ZCUSTOMER", "KUNNR")
    }

    fn offline_generator() -> AbapGenerator {
        let settings = LlmSettings::default();
        AbapGenerator::new(LlmClient::with_providers(vec![], &settings), &settings).unwrap()
    }

    #[test]
    fn test_analyze_table_writes_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("zorder.json");

        let table = analyze_table(&connection(), "ZORDER", true, Some(&path)).unwrap();

        assert_eq!(table.foreign_keys.len(), 1);
        let saved = std::fs::read_to_string(&path).unwrap();
        assert!(saved.contains("\"ZCUSTOMER\""));
    }

    #[test]
    fn test_analyze_missing_table_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing.json");

        assert!(analyze_table(&connection(), "ZMISSING", true, Some(&path)).is_err());
        assert!(!path.exists());
    }

    #[test]
    fn test_sap_aware_generation_needs_a_table() {
        let generator = offline_generator();
        let names = vec!["ZMISSING".to_string()];

        for kind in [SapCodeType::Alv, SapCodeType::Report, SapCodeType::Class] {
            let err =
                sap_aware_generate(&connection(), &generator, kind, "Orders", &names).unwrap_err();
            assert!(err.to_string().contains("None of the tables could be analyzed"));
        }
    }

    #[test]
    fn test_offline_system_aborts() {
        let generator = offline_generator();
        let names = vec!["ZORDER".to_string()];

        let err = sap_aware_alv(&connection().offline(), &generator, "Orders", &names).unwrap_err();
        assert!(err.to_string().contains("SAP analysis failed"));
    }

    #[test]
    fn test_list_tables() {
        let tables = list_tables(&connection(), "ZC*", 50).unwrap();
        assert_eq!(tables, vec!["ZCUSTOMER".to_string()]);
    }

    #[test]
    fn test_code_type_prefix() {
        assert_eq!(SapCodeType::Alv.filename_prefix(), "z_alv_");
        assert_eq!(SapCodeType::Class.filename_prefix(), "z_class_");
    }
}
