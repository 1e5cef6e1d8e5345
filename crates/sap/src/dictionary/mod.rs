//! ABAP Dictionary document parsing
//!
//! Transport responses arrive as loosely-typed JSON documents. They are parsed
//! here, at the boundary, into the typed rows below so that nothing above the
//! transport layer ever handles raw maps.
//!
//! ## Documents
//!
//! - `DDIF_TABL_GET`: `DD02V_WA` header plus `DD03P_TAB` field rows
//! - `DDIF_FORKEY_GET`: `DD08V_TAB` foreign key rows
//! - `RFC_READ_TABLE`: `DATA` lines with fixed-width `WA` records
//!
//! ## Usage
//! ```rust,ignore
//! use abapify_sap::dictionary::parse_table_structure;
//!
//! let structure = parse_table_structure("ZORDER", &document)?;
//! println!("{} fields", structure.fields.len());
//! ```

mod converter;
pub mod types;

pub use converter::{
    parse_foreign_keys, parse_object_rows, parse_read_table, parse_sap_date,
    parse_table_structure, split_columns, RFC_COLUMN_WIDTH,
};

use chrono::NaiveDate;
use serde::Serialize;

/// Table-level attributes from `DD02V`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableHeader {
    pub name: String,
    pub description: String,
    pub table_class: String,
    pub delivery_class: String,
    pub client_dependent: bool,
    pub created_on: Option<NaiveDate>,
    pub changed_on: Option<NaiveDate>,
}

/// One `DD03P` row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldRow {
    pub name: String,
    pub data_type: String,
    pub length: u32,
    pub decimals: u32,
    pub description: String,
    pub key_flag: bool,
    pub not_null: bool,
    pub domain: Option<String>,
    pub data_element: Option<String>,
}

/// Header and field rows of one table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableStructure {
    pub header: TableHeader,
    pub fields: Vec<FieldRow>,
}

/// One `DD08V` row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ForeignKeyRow {
    pub field_name: String,
    pub check_table: String,
    pub check_field: String,
}

/// Result row of a table search
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableSummary {
    pub name: String,
    pub description: String,
}

/// Result row of a repository object search
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectRow {
    pub name: String,
    pub object_type: String,
    pub description: String,
    pub package: Option<String>,
    pub author: Option<String>,
    pub created_on: Option<NaiveDate>,
    pub changed_on: Option<NaiveDate>,
    pub status: Option<String>,
}

/// Raw record read from a table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableRow {
    /// 1-based row number
    pub row_id: usize,
    pub table_name: String,
    /// Fixed-width record as returned in `WA`
    pub data: String,
}
