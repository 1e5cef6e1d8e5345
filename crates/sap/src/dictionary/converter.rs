//! Converts raw dictionary documents into typed rows

use super::types::{ForkeyGetDocument, RawObject, ReadTableDocument, TablGetDocument};
use super::{FieldRow, ForeignKeyRow, ObjectRow, TableHeader, TableStructure};
use abapify_common::{AbapifyError, Result};
use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Column width used when records are flattened into `WA` lines
pub const RFC_COLUMN_WIDTH: usize = 30;

/// Parse a `DDIF_TABL_GET` response.
///
/// A response without a `DD02V_WA` header means the table does not exist.
pub fn parse_table_structure(table_name: &str, document: &Value) -> Result<TableStructure> {
    let doc: TablGetDocument = decode(document, "DDIF_TABL_GET", table_name)?;

    let header = doc.header.ok_or_else(|| AbapifyError::TableNotFound {
        table: table_name.to_string(),
    })?;

    let header = TableHeader {
        name: if header.tabname.trim().is_empty() {
            table_name.to_string()
        } else {
            header.tabname.trim().to_string()
        },
        description: header.ddtext.trim().to_string(),
        table_class: or_default(&header.tabclass, "TRANSP"),
        delivery_class: or_default(&header.contflag, "A"),
        client_dependent: is_flag_set(&header.clidep),
        created_on: parse_sap_date(&header.created_on),
        changed_on: parse_sap_date(&header.changed_on),
    };

    let fields = doc
        .fields
        .into_iter()
        .map(|raw| FieldRow {
            name: raw.fieldname.trim().to_string(),
            data_type: raw.datatype.trim().to_string(),
            length: raw.leng,
            decimals: raw.decimals,
            description: raw.ddtext.trim().to_string(),
            key_flag: is_flag_set(&raw.keyflag),
            not_null: is_flag_set(&raw.notnull),
            domain: non_empty(raw.domname),
            data_element: non_empty(raw.rollname),
        })
        .collect();

    Ok(TableStructure { header, fields })
}

/// Parse a `DDIF_FORKEY_GET` response
pub fn parse_foreign_keys(table_name: &str, document: &Value) -> Result<Vec<ForeignKeyRow>> {
    let doc: ForkeyGetDocument = decode(document, "DDIF_FORKEY_GET", table_name)?;

    Ok(doc
        .foreign_keys
        .into_iter()
        .map(|raw| ForeignKeyRow {
            field_name: raw.fieldname.trim().to_string(),
            check_table: raw.checktable.trim().to_string(),
            check_field: raw.checkfield.trim().to_string(),
        })
        .collect())
}

/// Parse the `DATA` lines of an `RFC_READ_TABLE` response
pub fn parse_read_table(table_name: &str, document: &Value) -> Result<Vec<String>> {
    let doc: ReadTableDocument = decode(document, "RFC_READ_TABLE", table_name)?;
    Ok(doc.data.into_iter().map(|line| line.wa).collect())
}

/// Parse a list of repository object rows
pub fn parse_object_rows(document: &Value) -> Result<Vec<ObjectRow>> {
    let raw: Vec<RawObject> = decode(document, "object search", "TADIR")?;

    Ok(raw
        .into_iter()
        .map(|raw| ObjectRow {
            name: raw.object_name.trim().to_string(),
            object_type: raw.object_type.trim().to_string(),
            description: raw.object_text.trim().to_string(),
            package: non_empty(raw.devclass),
            author: non_empty(raw.author),
            created_on: parse_sap_date(&raw.created_on),
            changed_on: parse_sap_date(&raw.changed_on),
            status: non_empty(raw.object_status),
        })
        .collect())
}

/// Split a fixed-width `WA` line into trimmed columns
pub fn split_columns(wa: &str, columns: usize) -> Vec<String> {
    let chars: Vec<char> = wa.chars().collect();
    (0..columns)
        .map(|i| {
            let start = (i * RFC_COLUMN_WIDTH).min(chars.len());
            let end = ((i + 1) * RFC_COLUMN_WIDTH).min(chars.len());
            chars[start..end].iter().collect::<String>().trim().to_string()
        })
        .collect()
}

/// Parse a `YYYYMMDD` date; anything else is `None`
pub fn parse_sap_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if value.len() != 8 || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    NaiveDate::parse_from_str(value, "%Y%m%d").ok()
}

fn decode<T: DeserializeOwned>(document: &Value, function: &str, subject: &str) -> Result<T> {
    serde_json::from_value(document.clone()).map_err(|e| {
        AbapifyError::SapMetadata(format!(
            "Malformed {} response for {}: {}",
            function, subject, e
        ))
    })
}

fn is_flag_set(flag: &str) -> bool {
    flag.trim() == "X"
}

fn or_default(value: &str, default: &str) -> String {
    let value = value.trim();
    if value.is_empty() {
        default.to_string()
    } else {
        value.to_string()
    }
}

fn non_empty(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sap_dates() {
        assert_eq!(parse_sap_date("20240131"), NaiveDate::from_ymd_opt(2024, 1, 31));
        assert_eq!(parse_sap_date("00000000"), None);
        assert_eq!(parse_sap_date("2024-01-31"), None);
        assert_eq!(parse_sap_date(""), None);
    }

    #[test]
    fn test_split_columns_pads_short_lines() {
        let wa = format!("{:<30}{:<30}", "ZORDER", "Sales orders");
        assert_eq!(split_columns(&wa, 2), vec!["ZORDER", "Sales orders"]);
        assert_eq!(split_columns("ZSHORT", 2), vec!["ZSHORT", ""]);
    }

    #[test]
    fn test_header_defaults() {
        let doc = json!({ "DD02V_WA": { "DDTEXT": "Orders" } });
        let structure = parse_table_structure("ZORDER", &doc).unwrap();
        assert_eq!(structure.header.name, "ZORDER");
        assert_eq!(structure.header.table_class, "TRANSP");
        assert_eq!(structure.header.delivery_class, "A");
        assert!(!structure.header.client_dependent);
        assert!(structure.fields.is_empty());
    }

    #[test]
    fn test_delivery_class_is_not_client_dependence() {
        let doc = json!({ "DD02V_WA": { "TABNAME": "ZCONFIG", "CLIDEP": "X", "CONTFLAG": "C" } });
        let header = parse_table_structure("ZCONFIG", &doc).unwrap().header;
        assert_eq!(header.delivery_class, "C");
        assert!(header.client_dependent);
    }
}
