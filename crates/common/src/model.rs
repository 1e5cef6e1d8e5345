//! SAP dictionary data model
//!
//! Strongly-typed representation of tables, fields, relationships and
//! repository objects produced by the metadata analyzer.

use crate::Result;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::Path;

/// A single field of a dictionary table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableField {
    /// Field name (e.g., "MANDT")
    pub name: String,
    /// ABAP dictionary data type (e.g., "CLNT", "CHAR")
    pub data_type: String,
    /// Field length
    pub length: u32,
    /// Number of decimal places
    pub decimals: u32,
    /// Short description
    pub description: String,
    /// Whether the field is part of the primary key
    pub key_field: bool,
    /// Whether the field is declared NOT NULL
    pub not_null: bool,
    /// Domain name
    pub domain: Option<String>,
    /// Data element name
    pub data_element: Option<String>,
}

/// A dictionary table with its fields and foreign keys
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    pub description: String,
    /// Table class (TRANSP, POOL, CLUSTER, ...)
    pub table_class: String,
    /// Delivery class (A, C, L, ...)
    pub delivery_class: String,
    pub fields: Vec<TableField>,
    pub foreign_keys: Vec<Relationship>,
    pub created_on: Option<NaiveDate>,
    pub changed_on: Option<NaiveDate>,
}

impl Table {
    /// Fields flagged as primary key
    pub fn key_fields(&self) -> impl Iterator<Item = &TableField> {
        self.fields.iter().filter(|f| f.key_field)
    }

    /// Fields outside the primary key
    pub fn non_key_fields(&self) -> impl Iterator<Item = &TableField> {
        self.fields.iter().filter(|f| !f.key_field)
    }

    /// Look up a field by name
    pub fn field(&self, name: &str) -> Option<&TableField> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the table as pretty JSON
    pub fn write_json(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

/// Kind of relationship between two tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelationshipKind {
    ForeignKey,
}

impl fmt::Display for RelationshipKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RelationshipKind::ForeignKey => write!(f, "FOREIGN_KEY"),
        }
    }
}

/// Directed edge from one table to another
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Relationship {
    pub from_table: String,
    pub to_table: String,
    pub from_fields: Vec<String>,
    pub to_fields: Vec<String>,
    pub kind: RelationshipKind,
    /// Cardinality label, e.g. "N:1"
    pub cardinality: String,
}

impl Relationship {
    /// Foreign key from `from_table.field` to the check table's check field
    pub fn foreign_key(
        from_table: &str,
        field: &str,
        check_table: &str,
        check_field: &str,
    ) -> Self {
        Self {
            from_table: from_table.to_string(),
            to_table: check_table.to_string(),
            from_fields: vec![field.to_string()],
            to_fields: vec![check_field.to_string()],
            kind: RelationshipKind::ForeignKey,
            cardinality: "N:1".to_string(),
        }
    }
}

/// Repository object type
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ObjectType {
    Program,
    Class,
    FunctionGroup,
    Other(String),
}

impl ObjectType {
    /// The object types searched for custom development
    pub const SEARCHABLE: [ObjectType; 3] = [
        ObjectType::Program,
        ObjectType::Class,
        ObjectType::FunctionGroup,
    ];

    /// TADIR object code
    pub fn code(&self) -> &str {
        match self {
            ObjectType::Program => "PROG",
            ObjectType::Class => "CLAS",
            ObjectType::FunctionGroup => "FUGR",
            ObjectType::Other(code) => code,
        }
    }

    /// Parse a TADIR object code
    pub fn from_code(code: &str) -> Self {
        match code.trim().to_ascii_uppercase().as_str() {
            "PROG" => ObjectType::Program,
            "CLAS" => ObjectType::Class,
            "FUGR" => ObjectType::FunctionGroup,
            other => ObjectType::Other(other.to_string()),
        }
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl Serialize for ObjectType {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.code())
    }
}

impl<'de> Deserialize<'de> for ObjectType {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let code = String::deserialize(deserializer)?;
        Ok(ObjectType::from_code(&code))
    }
}

/// Custom repository object used for naming-pattern detection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SapObject {
    pub name: String,
    pub object_type: ObjectType,
    pub description: String,
    pub package: Option<String>,
    pub author: Option<String>,
    pub created_on: Option<NaiveDate>,
    pub changed_on: Option<NaiveDate>,
    pub status: Option<String>,
}

/// Frequency tables describing naming conventions in custom code
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamingPatterns {
    /// First-two-character prefix → count
    pub prefixes: BTreeMap<String, usize>,
    /// Object type code → (final underscore token → count)
    pub suffixes: BTreeMap<String, BTreeMap<String, usize>>,
    /// Package → count
    pub packages: BTreeMap<String, usize>,
}

impl NamingPatterns {
    pub fn is_empty(&self) -> bool {
        self.prefixes.is_empty() && self.suffixes.is_empty() && self.packages.is_empty()
    }

    /// Most frequent prefixes, highest count first, ties broken alphabetically
    pub fn top_prefixes(&self, n: usize) -> Vec<(&str, usize)> {
        let mut ranked: Vec<(&str, usize)> = self
            .prefixes
            .iter()
            .map(|(prefix, count)| (prefix.as_str(), *count))
            .collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        ranked.truncate(n);
        ranked
    }
}

/// Aggregate document of one full metadata analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub tables: Vec<Table>,
    pub relationships: Vec<Relationship>,
    pub custom_objects: Vec<SapObject>,
    pub patterns: NamingPatterns,
    pub analysis_timestamp: DateTime<Utc>,
}

impl AnalysisResult {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }
}
