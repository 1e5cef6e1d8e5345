//! Text reports for analyzed tables and full analyses

use abapify_common::{AnalysisResult, Result, Table};
use std::fmt::Write as FmtWrite;

/// Render one analyzed table: attributes, fields and relationships
pub fn format_table_report(table: &Table) -> Result<String> {
    let mut output = String::new();

    write_header(&mut output, table)?;
    write_fields(&mut output, table)?;
    write_relationships(&mut output, table)?;

    Ok(output)
}

/// Render the summary of a full analysis
pub fn format_analysis_summary(result: &AnalysisResult) -> Result<String> {
    let mut output = String::new();

    writeln!(output, "SAP analysis summary")?;
    writeln!(output, "  Tables analyzed:  {}", result.tables.len())?;
    writeln!(output, "  Relationships:    {}", result.relationships.len())?;
    writeln!(output, "  Custom objects:   {}", result.custom_objects.len())?;
    writeln!(
        output,
        "  Timestamp:        {}",
        result.analysis_timestamp.format("%Y-%m-%d %H:%M:%S")
    )?;

    Ok(output)
}

fn write_header(output: &mut String, table: &Table) -> Result<()> {
    writeln!(output, "Table: {}", table.name)?;
    writeln!(output, "Description:    {}", table.description)?;
    writeln!(output, "Type:           {}", table.table_class)?;
    writeln!(output, "Delivery class: {}", table.delivery_class)?;
    writeln!(output)?;

    Ok(())
}

fn write_fields(output: &mut String, table: &Table) -> Result<()> {
    writeln!(
        output,
        "{:<20} {:<10} {:>8}  {:<3}  Description",
        "Field", "Type", "Length", "Key"
    )?;
    writeln!(output, "{}", "-".repeat(60))?;

    for field in &table.fields {
        let key = if field.key_field { "✓" } else { "" };
        writeln!(
            output,
            "{:<20} {:<10} {:>8}  {:<3}  {}",
            field.name, field.data_type, field.length, key, field.description
        )?;
    }

    Ok(())
}

fn write_relationships(output: &mut String, table: &Table) -> Result<()> {
    if table.foreign_keys.is_empty() {
        return Ok(());
    }

    writeln!(output)?;
    writeln!(output, "Relationships found: {}", table.foreign_keys.len())?;
    for relationship in &table.foreign_keys {
        writeln!(
            output,
            "  • {}.{} → {}.{}",
            relationship.from_table,
            relationship.from_fields.join(","),
            relationship.to_table,
            relationship.to_fields.join(",")
        )?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use abapify_common::{NamingPatterns, Relationship, TableField};
    use chrono::{TimeZone, Utc};

    fn table() -> Table {
        Table {
            name: "ZORDER".to_string(),
            description: "Sales orders".to_string(),
            table_class: "TRANSP".to_string(),
            delivery_class: "A".to_string(),
            fields: vec![
                TableField {
                    name: "ORDER_ID".to_string(),
                    data_type: "NUMC".to_string(),
                    length: 10,
                    decimals: 0,
                    description: "Order number".to_string(),
                    key_field: true,
                    not_null: true,
                    domain: None,
                    data_element: None,
                },
                TableField {
                    name: "KUNNR".to_string(),
                    data_type: "CHAR".to_string(),
                    length: 10,
                    decimals: 0,
                    description: "Customer".to_string(),
                    key_field: false,
                    not_null: false,
                    domain: None,
                    data_element: None,
                },
            ],
            foreign_keys: vec![Relationship::foreign_key("ZORDER", "KUNNR", "ZCUSTOMER", "KUNNR")],
            created_on: None,
            changed_on: None,
        }
    }

    #[test]
    fn test_table_report() {
        let report = format_table_report(&table()).unwrap();

        assert!(report.starts_with("Table: ZORDER\n"));
        assert!(report.contains("Delivery class: A"));
        let order_line = report
            .lines()
            .find(|l| l.starts_with("ORDER_ID"))
            .unwrap();
        assert!(order_line.contains('✓'));
        let kunnr_line = report.lines().find(|l| l.starts_with("KUNNR")).unwrap();
        assert!(!kunnr_line.contains('✓'));
        assert!(report.contains("Relationships found: 1"));
        assert!(report.contains("ZORDER.KUNNR → ZCUSTOMER.KUNNR"));
    }

    #[test]
    fn test_analysis_summary() {
        let result = AnalysisResult {
            tables: vec![table()],
            relationships: vec![],
            custom_objects: vec![],
            patterns: NamingPatterns::default(),
            analysis_timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap(),
        };

        let summary = format_analysis_summary(&result).unwrap();
        assert!(summary.contains("Tables analyzed:  1"));
        assert!(summary.contains("2024-05-01 12:30:00"));
    }
}
