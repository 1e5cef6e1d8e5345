//! Plain-text SAP context blocks for prompts

use abapify_common::{AnalysisResult, NamingPatterns, Result, Table};
use std::fmt::Write as FmtWrite;

const MAX_LISTED_FIELDS: usize = 10;
const MAX_IMPORTANT_FIELDS: usize = 5;
const MAX_RELATIONSHIPS: usize = 10;
const MAX_PACKAGES: usize = 5;
const TOP_PREFIXES: usize = 3;

/// Context for table-driven generation: structures, related tables and
/// the dominant naming prefixes
pub fn build_table_context(
    tables: &[Table],
    related_tables: &[String],
    patterns: &NamingPatterns,
) -> Result<String> {
    let mut output = String::new();

    if !tables.is_empty() {
        writeln!(output, "TABLE STRUCTURES:")?;
        for table in tables {
            let fields: Vec<&str> = table
                .fields
                .iter()
                .take(MAX_LISTED_FIELDS)
                .map(|f| f.name.as_str())
                .collect();
            let keys: Vec<&str> = table.key_fields().map(|f| f.name.as_str()).collect();

            writeln!(output, "Table {}:", table.name)?;
            writeln!(output, "  - Description: {}", table.description)?;
            writeln!(output, "  - Main fields: {}", fields.join(", "))?;
            writeln!(output, "  - Key fields: {}", keys.join(", "))?;
        }
        writeln!(output)?;
    }

    if !related_tables.is_empty() {
        writeln!(output, "RELATED TABLES: {}", related_tables.join(", "))?;
        writeln!(output)?;
    }

    if !patterns.prefixes.is_empty() {
        writeln!(output, "NAMING PATTERNS: {}", format_prefixes(patterns))?;
        writeln!(output)?;
    }

    Ok(output)
}

/// Context summarizing a full analysis
pub fn build_analysis_context(result: &AnalysisResult) -> Result<String> {
    let mut output = String::new();

    writeln!(output, "ANALYSIS SUMMARY:")?;
    writeln!(output, "- Tables analyzed: {}", result.tables.len())?;
    writeln!(output, "- Relationships: {}", result.relationships.len())?;
    writeln!(output, "- Custom objects: {}", result.custom_objects.len())?;
    writeln!(output)?;

    writeln!(output, "TABLE DETAILS:")?;
    for table in &result.tables {
        let keys: Vec<&str> = table.key_fields().map(|f| f.name.as_str()).collect();
        let important: Vec<&str> = table
            .non_key_fields()
            .take(MAX_IMPORTANT_FIELDS)
            .map(|f| f.name.as_str())
            .collect();

        writeln!(output, "Table {} ({}):", table.name, table.description)?;
        writeln!(output, "  - Keys: {}", keys.join(", "))?;
        writeln!(output, "  - Important fields: {}", important.join(", "))?;
    }
    writeln!(output)?;

    if !result.relationships.is_empty() {
        writeln!(output, "IDENTIFIED RELATIONSHIPS:")?;
        for relationship in result.relationships.iter().take(MAX_RELATIONSHIPS) {
            writeln!(
                output,
                "- {} → {} ({})",
                relationship.from_table, relationship.to_table, relationship.kind
            )?;
        }
        writeln!(output)?;
    }

    if !result.patterns.is_empty() {
        writeln!(output, "COMPANY PATTERNS:")?;
        if !result.patterns.prefixes.is_empty() {
            writeln!(output, "- Common prefixes: {}", format_prefixes(&result.patterns))?;
        }
        if !result.patterns.packages.is_empty() {
            let packages: Vec<&str> = result
                .patterns
                .packages
                .keys()
                .take(MAX_PACKAGES)
                .map(String::as_str)
                .collect();
            writeln!(output, "- Packages used: {}", packages.join(", "))?;
        }
        writeln!(output)?;
    }

    Ok(output)
}

fn format_prefixes(patterns: &NamingPatterns) -> String {
    patterns
        .top_prefixes(TOP_PREFIXES)
        .iter()
        .map(|(prefix, count)| format!("{} ({}x)", prefix, count))
        .collect::<Vec<_>>()
        .join(", ")
}
