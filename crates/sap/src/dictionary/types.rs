//! Raw ABAP Dictionary documents as returned by the remote function calls
//!
//! Field names follow the SAP structures (`DD02V`, `DD03P`, `DD08V`, `TAB512`).
//! Every attribute is optional because fallback responses are sparse.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// `DDIF_TABL_GET` result
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TablGetDocument {
    /// Table header; absent when the table does not exist
    #[serde(rename = "DD02V_WA", default)]
    pub header: Option<RawHeader>,

    /// Field rows, including `.INCLUDE` / `.APPEND` markers
    #[serde(rename = "DD03P_TAB", default)]
    pub fields: Vec<RawField>,
}

/// `DD02V` work area
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawHeader {
    #[serde(rename = "TABNAME", default, deserialize_with = "text")]
    pub tabname: String,

    #[serde(rename = "DDTEXT", default, deserialize_with = "text")]
    pub ddtext: String,

    #[serde(rename = "TABCLASS", default, deserialize_with = "text")]
    pub tabclass: String,

    /// Client-dependence flag
    #[serde(rename = "CLIDEP", default, deserialize_with = "text")]
    pub clidep: String,

    /// Delivery class
    #[serde(rename = "CONTFLAG", default, deserialize_with = "text")]
    pub contflag: String,

    #[serde(rename = "CREATED_ON", default, deserialize_with = "text")]
    pub created_on: String,

    #[serde(rename = "CHANGED_ON", default, deserialize_with = "text")]
    pub changed_on: String,
}

/// `DD03P` row
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawField {
    #[serde(rename = "FIELDNAME", default, deserialize_with = "text")]
    pub fieldname: String,

    #[serde(rename = "DATATYPE", default, deserialize_with = "text")]
    pub datatype: String,

    /// Length, sent either as a number or a zero-padded string
    #[serde(rename = "LENG", default, deserialize_with = "number")]
    pub leng: u32,

    #[serde(rename = "DECIMALS", default, deserialize_with = "number")]
    pub decimals: u32,

    #[serde(rename = "DDTEXT", default, deserialize_with = "text")]
    pub ddtext: String,

    #[serde(rename = "KEYFLAG", default, deserialize_with = "text")]
    pub keyflag: String,

    #[serde(rename = "NOTNULL", default, deserialize_with = "text")]
    pub notnull: String,

    #[serde(rename = "DOMNAME", default, deserialize_with = "text")]
    pub domname: String,

    #[serde(rename = "ROLLNAME", default, deserialize_with = "text")]
    pub rollname: String,
}

/// `DDIF_FORKEY_GET` result
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ForkeyGetDocument {
    #[serde(rename = "DD08V_TAB", default)]
    pub foreign_keys: Vec<RawForeignKey>,
}

/// `DD08V` row
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawForeignKey {
    #[serde(rename = "FIELDNAME", default, deserialize_with = "text")]
    pub fieldname: String,

    #[serde(rename = "CHECKTABLE", default, deserialize_with = "text")]
    pub checktable: String,

    #[serde(rename = "CHECKFIELD", default, deserialize_with = "text")]
    pub checkfield: String,
}

/// `RFC_READ_TABLE` result
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReadTableDocument {
    #[serde(rename = "DATA", default)]
    pub data: Vec<RawDataLine>,
}

/// `TAB512` line holding one fixed-width record
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawDataLine {
    #[serde(rename = "WA", default, deserialize_with = "text")]
    pub wa: String,
}

/// Repository object row as produced by the object search
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawObject {
    #[serde(rename = "OBJECT_NAME", default, deserialize_with = "text")]
    pub object_name: String,

    #[serde(rename = "OBJECT_TYPE", default, deserialize_with = "text")]
    pub object_type: String,

    #[serde(rename = "OBJECT_TEXT", default, deserialize_with = "text")]
    pub object_text: String,

    #[serde(rename = "DEVCLASS", default, deserialize_with = "text")]
    pub devclass: String,

    #[serde(rename = "AUTHOR", default, deserialize_with = "text")]
    pub author: String,

    #[serde(rename = "CREATED_ON", default, deserialize_with = "text")]
    pub created_on: String,

    #[serde(rename = "CHANGED_ON", default, deserialize_with = "text")]
    pub changed_on: String,

    #[serde(rename = "OBJECT_STATUS", default, deserialize_with = "text")]
    pub object_status: String,
}

/// Accept strings, numbers or null as text
fn text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Null => String::new(),
        Value::String(s) => s,
        other => other.to_string(),
    })
}

/// Accept numbers or numeric strings; anything malformed becomes 0
fn number<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_u64().and_then(|n| u32::try_from(n).ok()).unwrap_or(0),
        Value::String(s) => s.trim().parse().unwrap_or(0),
        _ => 0,
    })
}
