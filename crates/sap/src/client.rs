//! SAP connection backed by the RFC client and the HTTP client
//!
//! Without native RFC the dictionary function modules are not available, so
//! structures, foreign keys and repository objects are read from the
//! dictionary tables (`DD02L`, `DD02T`, `DD03M`, `DD05S`, `TADIR`) through
//! `RFC_READ_TABLE` and reshaped into the documents the parsers expect.

use crate::connection::SapConnection;
use crate::dictionary::{
    parse_foreign_keys, parse_object_rows, parse_read_table, parse_table_structure, split_columns,
    ForeignKeyRow, ObjectRow, TableRow, TableStructure, TableSummary,
};
use crate::http::{odata_filter, HttpClient};
use crate::resolver::{ConnectionConfig, ConnectionType};
use crate::rfc::{fields_param, options_param, RfcClient, RfcParams, RfcSession};
use crate::{check_name, wildcard_regex, wildcard_to_like};
use abapify_common::{AbapifyError, ObjectType, Result};
use serde::Serialize;
use serde_json::{json, Map, Value};
use tracing::{debug, error, info, warn};

/// Rows requested per dictionary table read
const DICTIONARY_ROWCOUNT: usize = 1000;
/// Rows requested per repository object search
const OBJECT_ROWCOUNT: usize = 500;

/// `DD03M` columns read for each field
const FIELD_COLUMNS: [&str; 12] = [
    "TABNAME",
    "FIELDNAME",
    "DDLANGUAGE",
    "POSITION",
    "KEYFLAG",
    "NOTNULL",
    "DATATYPE",
    "LENG",
    "DECIMALS",
    "ROLLNAME",
    "DOMNAME",
    "DDTEXT",
];

type Record = Map<String, Value>;

/// Result of a connectivity check
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConnectionStatus {
    pub rfc: bool,
    pub http: bool,
}

/// Basic information about the connected system
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SystemInfo {
    pub system_id: String,
    pub client: String,
    pub user: String,
    pub language: String,
    pub hostname: String,
    pub system_release: String,
    pub database_system: String,
}

/// Connection to one SAP environment
#[derive(Debug)]
pub struct SapClient {
    config: ConnectionConfig,
    rfc: RfcClient,
}

impl SapClient {
    /// Validate the descriptor and build the underlying clients.
    ///
    /// One authenticated [`HttpClient`] serves both OData queries and the
    /// RFC fallback.
    pub fn new(config: ConnectionConfig) -> Result<Self> {
        config.validate()?;

        let http = if config.connection_type == ConnectionType::Http || config.base_url.is_some()
        {
            let mut http = HttpClient::new(&config)?;
            if let (Some(user), Some(passwd)) = (&config.user, &config.passwd) {
                http.authenticate(user, passwd);
            }
            Some(http)
        } else {
            None
        };
        let rfc = RfcClient::new(config.clone(), http);

        Ok(Self { config, rfc })
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    pub fn http(&self) -> Option<&HttpClient> {
        self.rfc.http()
    }

    /// Scoped RFC connection; released when the returned session is dropped,
    /// whichever way the caller leaves its scope
    pub fn rfc_connection(&self) -> Result<RfcSession<'_>> {
        self.rfc.session()
    }

    /// Check RFC and HTTP connectivity independently
    pub fn test_connection(&self) -> ConnectionStatus {
        let mut status = ConnectionStatus::default();

        match self.rfc_connection() {
            Ok(session) => {
                status.rfc = session.client().is_connected();
                info!("RFC connection test: success");
            }
            Err(e) => error!("RFC connection test failed: {}", e),
        }

        if let Some(http) = self.http() {
            status.http = http.test_connection();
            if status.http {
                info!("HTTP connection test: success");
            } else {
                warn!("HTTP connection test: failed");
            }
        }

        status
    }

    /// `RFC_SYSTEM_INFO`
    pub fn system_info(&self) -> Result<SystemInfo> {
        let fetch = || -> Result<SystemInfo> {
            let session = self.rfc_connection()?;
            let result = session.call_function("RFC_SYSTEM_INFO", &RfcParams::new())?;
            let field = |name: &str| {
                result
                    .pointer(&format!("/RFCSI_EXPORT/{}", name))
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string()
            };
            Ok(SystemInfo {
                system_id: field("RFCSYSID"),
                client: field("RFCMANDT"),
                user: field("RFCUSER"),
                language: field("RFCLAN"),
                hostname: field("RFCHOST"),
                system_release: field("RFCSAPRL"),
                database_system: field("RFCDBSYS"),
            })
        };

        let info = fetch().map_err(|e| {
            error!("Failed to read system information: {}", e);
            AbapifyError::SapConnection(format!("Failed to read system information: {}", e))
        })?;
        info!("Connected to SAP system: {}", info.system_id);
        Ok(info)
    }

    /// Query an OData entity set with equality filters
    pub fn execute_odata_query(
        &self,
        service: &str,
        entity_set: &str,
        filters: &[(String, String)],
    ) -> Result<Value> {
        let http = self.http().ok_or_else(|| {
            AbapifyError::SapConnection("HTTP client required for OData".to_string())
        })?;

        let endpoint = format!("/sap/opu/odata/sap/{}/{}", service, entity_set);
        let query: Vec<(String, String)> = odata_filter(filters)
            .map(|filter| vec![("$filter".to_string(), filter)])
            .unwrap_or_default();
        http.get(&endpoint, &query)
    }

    /// Release all connections
    pub fn close(&self) {
        self.rfc.disconnect();
        info!("SAP connections closed for environment {}", self.config.environment);
    }
}

impl SapClient {
    /// `DDIF_TABL_GET`-shaped document assembled from `DD02L`, `DD02T` and `DD03M`
    fn read_dictionary_structure(
        &self,
        session: &RfcSession<'_>,
        table_name: &str,
    ) -> Result<Value> {
        let language = language_key(&self.config.language);

        let mut header = read_records(
            session,
            "DD02L",
            &["TABNAME", "TABCLASS", "CLIDEP", "CONTFLAG", "AS4DATE"],
            &format!("TABNAME = '{}' AND AS4LOCAL = 'A'", table_name),
            DICTIONARY_ROWCOUNT,
        )?
        .into_iter()
        .find(|record| text_of(record, "TABNAME") == table_name)
        .ok_or_else(|| AbapifyError::TableNotFound {
            table: table_name.to_string(),
        })?;

        let texts = read_records(
            session,
            "DD02T",
            &["TABNAME", "DDLANGUAGE", "DDTEXT"],
            &format!(
                "TABNAME = '{}' AND DDLANGUAGE = '{}' AND AS4LOCAL = 'A'",
                table_name, language
            ),
            DICTIONARY_ROWCOUNT,
        )?;
        let description = texts
            .iter()
            .find(|record| {
                text_of(record, "TABNAME") == table_name
                    && text_of(record, "DDLANGUAGE") == language
            })
            .map(|record| text_of(record, "DDTEXT").to_string())
            .unwrap_or_default();

        header.insert("DDTEXT".to_string(), Value::String(description));
        if let Some(changed_on) = header.remove("AS4DATE") {
            header.insert("CHANGED_ON".to_string(), changed_on);
        }

        let mut fields: Vec<Record> = read_records(
            session,
            "DD03M",
            &FIELD_COLUMNS,
            &format!("TABNAME = '{}' AND DDLANGUAGE = '{}'", table_name, language),
            DICTIONARY_ROWCOUNT,
        )?
        .into_iter()
        .filter(|record| {
            let field_language = text_of(record, "DDLANGUAGE");
            text_of(record, "TABNAME") == table_name
                && (field_language.is_empty() || field_language == language)
        })
        .collect();
        fields.sort_by_key(|record| {
            text_of(record, "POSITION")
                .parse::<u32>()
                .unwrap_or(u32::MAX)
        });
        fields.dedup_by(|a, b| text_of(a, "FIELDNAME") == text_of(b, "FIELDNAME"));

        debug!("Read {} fields of {} from DD03M", fields.len(), table_name);
        Ok(json!({ "DD02V_WA": header, "DD03P_TAB": fields }))
    }
}

/// `DDIF_FORKEY_GET`-shaped document assembled from `DD05S`.
///
/// Only the row of the foreign key field itself is kept; client and
/// constant rows of multi-field keys are dropped.
fn read_dictionary_foreign_keys(session: &RfcSession<'_>, table_name: &str) -> Result<Value> {
    let keys: Vec<Record> = read_records(
        session,
        "DD05S",
        &["TABNAME", "FIELDNAME", "FORTABLE", "FORKEY", "CHECKTABLE", "CHECKFIELD"],
        &format!("TABNAME = '{}' AND AS4LOCAL = 'A'", table_name),
        DICTIONARY_ROWCOUNT,
    )?
    .into_iter()
    .filter(|record| {
        text_of(record, "TABNAME") == table_name
            && text_of(record, "FORTABLE") == table_name
            && text_of(record, "FORKEY") == text_of(record, "FIELDNAME")
    })
    .collect();

    Ok(json!({ "DD08V_TAB": keys }))
}

/// `RFC_READ_TABLE` rows as records keyed by field name
fn read_records(
    session: &RfcSession<'_>,
    table: &str,
    fields: &[&str],
    where_clause: &str,
    rowcount: usize,
) -> Result<Vec<Record>> {
    let params = RfcParams::new()
        .with("QUERY_TABLE", table)
        .with("FIELDS", fields_param(fields))
        .with("OPTIONS", options_param(where_clause))
        .with("ROWCOUNT", rowcount as u64);

    let document = session.call_function("RFC_READ_TABLE", &params)?;
    Ok(parse_read_table(table, &document)?
        .iter()
        .map(|wa| {
            fields
                .iter()
                .zip(split_columns(wa, fields.len()))
                .map(|(name, value)| (name.to_string(), Value::String(value)))
                .collect()
        })
        .collect())
}

fn text_of<'a>(record: &'a Record, field: &str) -> &'a str {
    record
        .get(field)
        .and_then(Value::as_str)
        .unwrap_or_default()
}

/// One-character SAP language key for an ISO code
fn language_key(language: &str) -> String {
    let language = language.trim().to_ascii_uppercase();
    match language.as_str() {
        "EN" => "E".to_string(),
        "DE" => "D".to_string(),
        "FR" => "F".to_string(),
        "ES" => "S".to_string(),
        "IT" => "I".to_string(),
        "PT" => "P".to_string(),
        "NL" => "N".to_string(),
        "JA" => "J".to_string(),
        "ZH" => "1".to_string(),
        other => other.chars().take(1).collect(),
    }
}

impl SapConnection for SapClient {
    fn language(&self) -> String {
        self.config.language.clone()
    }

    fn get_table_structure(&self, table_name: &str) -> Result<TableStructure> {
        check_name(table_name)?;
        let session = self.rfc_connection()?;

        let document = if session.client().supports("DDIF_TABL_GET") {
            let params = RfcParams::new()
                .with("NAME", table_name)
                .with("STATE", "A")
                .with("LANGU", self.config.language.as_str());
            session.call_function("DDIF_TABL_GET", &params)
        } else {
            self.read_dictionary_structure(&session, table_name)
        };

        document
            .and_then(|document| parse_table_structure(table_name, &document))
            .map_err(|e| match e {
                e if e.is_connectivity() || e.is_not_found() => e,
                e => {
                    error!("Failed to read structure of {}: {}", table_name, e);
                    AbapifyError::rfc(
                        "DDIF_TABL_GET",
                        format!("Failed to read structure of {}: {}", table_name, e),
                    )
                }
            })
    }

    fn get_foreign_keys(&self, table_name: &str) -> Result<Vec<ForeignKeyRow>> {
        check_name(table_name)?;
        let session = self.rfc_connection()?;

        let document = if session.client().supports("DDIF_FORKEY_GET") {
            let params = RfcParams::new()
                .with("NAME", table_name)
                .with("STATE", "A")
                .with("LANGU", self.config.language.as_str());
            session.call_function("DDIF_FORKEY_GET", &params)?
        } else {
            read_dictionary_foreign_keys(&session, table_name)?
        };
        parse_foreign_keys(table_name, &document)
    }

    fn get_table_data(
        &self,
        table_name: &str,
        fields: &[String],
        where_clause: &str,
        max_rows: usize,
    ) -> Result<Vec<TableRow>> {
        let session = self.rfc_connection()?;

        let mut params = RfcParams::new()
            .with("QUERY_TABLE", table_name)
            .with("ROWCOUNT", max_rows as u64);
        if !fields.is_empty() {
            let names: Vec<&str> = fields.iter().map(String::as_str).collect();
            params = params.with("FIELDS", fields_param(&names));
        }
        if !where_clause.is_empty() {
            params = params.with("OPTIONS", options_param(where_clause));
        }

        let lines = session
            .call_function("RFC_READ_TABLE", &params)
            .and_then(|document| parse_read_table(table_name, &document))
            .map_err(|e| {
                if e.is_connectivity() {
                    return e;
                }
                error!("Failed to read table {}: {}", table_name, e);
                AbapifyError::rfc(
                    "RFC_READ_TABLE",
                    format!("Failed to read table {}: {}", table_name, e),
                )
            })?;

        Ok(lines
            .into_iter()
            .take(max_rows)
            .enumerate()
            .map(|(i, wa)| TableRow {
                row_id: i + 1,
                table_name: table_name.to_string(),
                data: wa,
            })
            .collect())
    }

    fn search_tables(&self, pattern: &str, limit: usize) -> Result<Vec<TableSummary>> {
        let like = wildcard_to_like(pattern)?;
        let matcher = wildcard_regex(pattern)?;
        let session = self.rfc_connection()?;

        let params = RfcParams::new()
            .with("QUERY_TABLE", "DD02L")
            .with("FIELDS", fields_param(&["TABNAME", "DDTEXT"]))
            .with(
                "OPTIONS",
                json!([
                    { "TEXT": format!("TABNAME LIKE '{}'", like) },
                    { "TEXT": "AND TABCLASS = 'TRANSP'" },
                    { "TEXT": "AND CLIDEP = 'X'" },
                    { "TEXT": "AND AS4LOCAL = 'A'" }
                ]),
            )
            .with("ROWCOUNT", limit as u64);

        let document = session.call_function("RFC_READ_TABLE", &params)?;
        let tables: Vec<TableSummary> = parse_read_table("DD02L", &document)?
            .iter()
            .map(|wa| split_columns(wa, 2))
            .filter(|columns| !columns[0].is_empty() && matcher.is_match(&columns[0]))
            .map(|mut columns| TableSummary {
                description: columns.pop().unwrap_or_default(),
                name: columns.pop().unwrap_or_default(),
            })
            .take(limit)
            .collect();

        info!("Found {} custom tables", tables.len());
        Ok(tables)
    }

    fn search_objects(&self, pattern: &str, object_type: &ObjectType) -> Result<Vec<ObjectRow>> {
        let like = wildcard_to_like(pattern)?;
        let matcher = wildcard_regex(pattern)?;
        let code = object_type.code();
        check_name(code)?;
        let session = self.rfc_connection()?;

        let records = read_records(
            &session,
            "TADIR",
            &["OBJ_NAME", "OBJECT", "DEVCLASS", "AUTHOR", "CREATED_ON"],
            &format!(
                "PGMID = 'R3TR' AND OBJECT = '{}' AND OBJ_NAME LIKE '{}'",
                code, like
            ),
            OBJECT_ROWCOUNT,
        )?;

        let objects: Vec<Value> = records
            .iter()
            .filter(|record| {
                text_of(record, "OBJECT") == code && matcher.is_match(text_of(record, "OBJ_NAME"))
            })
            .map(|record| {
                json!({
                    "OBJECT_NAME": text_of(record, "OBJ_NAME"),
                    "OBJECT_TYPE": code,
                    "DEVCLASS": text_of(record, "DEVCLASS"),
                    "AUTHOR": text_of(record, "AUTHOR"),
                    "CREATED_ON": text_of(record, "CREATED_ON")
                })
            })
            .collect();

        let objects = parse_object_rows(&Value::Array(objects))?;
        info!("Found {} {} objects matching {}", objects.len(), code, pattern);
        Ok(objects)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use abapify_common::SapEnvironment;
    use chrono::NaiveDate;
    use std::io::{BufRead, BufReader, Write};
    use std::net::TcpListener;
    use std::sync::{Arc, Mutex};
    use std::thread;

    const TABLES_PREFIX: &str = "/sap/opu/odata/sap/ZGW_TABLES_SRV/";

    /// HTTP endpoint on localhost answering from a routing function
    struct LocalSystem {
        base_url: String,
        /// Request paths and whether they carried basic credentials
        requests: Arc<Mutex<Vec<(String, bool)>>>,
    }

    impl LocalSystem {
        fn start(route: fn(&str) -> Option<Value>) -> Self {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            let base_url = format!("http://{}", listener.local_addr().unwrap());
            let requests = Arc::new(Mutex::new(Vec::new()));
            let seen = Arc::clone(&requests);

            thread::spawn(move || {
                for stream in listener.incoming() {
                    let Ok(mut stream) = stream else { break };
                    let mut reader = BufReader::new(stream.try_clone().unwrap());

                    let mut request_line = String::new();
                    if reader.read_line(&mut request_line).is_err() {
                        continue;
                    }
                    let mut authorized = false;
                    loop {
                        let mut line = String::new();
                        if reader.read_line(&mut line).unwrap_or(0) <= 2 {
                            break;
                        }
                        authorized |= line
                            .to_ascii_lowercase()
                            .starts_with("authorization: basic");
                    }

                    let target = request_line.split_whitespace().nth(1).unwrap_or("/");
                    let path = target.split('?').next().unwrap_or(target).to_string();
                    let (status, body) = match route(&path) {
                        Some(body) => ("200 OK", body.to_string()),
                        None => ("404 Not Found", "{}".to_string()),
                    };
                    seen.lock().unwrap().push((path, authorized));

                    let _ = write!(
                        stream,
                        "HTTP/1.1 {}\r\nContent-Type: application/json\r\n\
                         Content-Length: {}\r\nConnection: close\r\n\r\n{}",
                        status,
                        body.len(),
                        body
                    );
                }
            });

            Self { base_url, requests }
        }

        fn client(&self) -> SapClient {
            let mut config = ConnectionConfig::new(SapEnvironment::Dev);
            config.connection_type = ConnectionType::Http;
            config.base_url = Some(self.base_url.clone());
            config.user = Some("DEVELOPER".to_string());
            config.passwd = Some("secret".to_string());
            config.timeout = 5;
            SapClient::new(config).unwrap()
        }

        fn requests(&self) -> Vec<(String, bool)> {
            self.requests.lock().unwrap().clone()
        }
    }

    fn results(rows: Value) -> Value {
        json!({ "d": { "results": rows } })
    }

    /// Answers the ping and returns no rows for any table
    fn empty_system(path: &str) -> Option<Value> {
        match path {
            "/sap/bc/ping" => Some(json!({})),
            path if path.starts_with(TABLES_PREFIX) => Some(results(json!([]))),
            _ => None,
        }
    }

    /// Dictionary holding ZORDER, its text, fields and one foreign key
    fn order_system(path: &str) -> Option<Value> {
        if path == "/sap/bc/ping" {
            return Some(json!({}));
        }
        let rows = match path.strip_prefix(TABLES_PREFIX)? {
            "DD02L" => json!([
                { "TABNAME": "ZOTHER", "TABCLASS": "TRANSP", "CLIDEP": "", "CONTFLAG": "C" },
                { "TABNAME": "ZORDER", "TABCLASS": "TRANSP", "CLIDEP": "X", "CONTFLAG": "A",
                  "AS4DATE": "20240131" }
            ]),
            "DD02T" => json!([
                { "TABNAME": "ZORDER", "DDLANGUAGE": "D", "DDTEXT": "Auftraege" },
                { "TABNAME": "ZORDER", "DDLANGUAGE": "E", "DDTEXT": "Sales orders" }
            ]),
            "DD03M" => json!([
                { "TABNAME": "ZORDER", "FIELDNAME": "ORDER_ID", "DDLANGUAGE": "E",
                  "POSITION": "0002", "KEYFLAG": "X", "NOTNULL": "X", "DATATYPE": "NUMC",
                  "LENG": "000010", "DECIMALS": "000000", "DDTEXT": "Order number" },
                { "TABNAME": "ZORDER", "FIELDNAME": "MANDT", "DDLANGUAGE": "E",
                  "POSITION": "0001", "KEYFLAG": "X", "NOTNULL": "X", "DATATYPE": "CLNT",
                  "LENG": "000003", "DECIMALS": "000000", "ROLLNAME": "MANDT",
                  "DOMNAME": "MANDT", "DDTEXT": "Client" },
                { "TABNAME": "ZORDER", "FIELDNAME": "KUNNR", "DDLANGUAGE": "E",
                  "POSITION": "0003", "KEYFLAG": "", "DATATYPE": "CHAR", "LENG": "000010",
                  "DECIMALS": "000000", "ROLLNAME": "KUNNR", "DDTEXT": "Customer" },
                { "TABNAME": "ZOTHER", "FIELDNAME": "ID", "DDLANGUAGE": "E",
                  "POSITION": "0001", "DATATYPE": "CHAR", "LENG": "000004" }
            ]),
            "DD05S" => json!([
                { "TABNAME": "ZORDER", "FIELDNAME": "KUNNR", "FORTABLE": "ZORDER",
                  "FORKEY": "MANDT", "CHECKTABLE": "ZCUSTOMER", "CHECKFIELD": "MANDT" },
                { "TABNAME": "ZORDER", "FIELDNAME": "KUNNR", "FORTABLE": "ZORDER",
                  "FORKEY": "KUNNR", "CHECKTABLE": "ZCUSTOMER", "CHECKFIELD": "KUNNR" }
            ]),
            "TADIR" => json!([
                { "OBJ_NAME": "ZSD_ORDERS", "OBJECT": "PROG", "DEVCLASS": "ZSD",
                  "AUTHOR": "DEVELOPER", "CREATED_ON": "20240101" },
                { "OBJ_NAME": "ZCL_SD_ORDER", "OBJECT": "CLAS", "DEVCLASS": "ZSD" },
                { "OBJ_NAME": "YTEST", "OBJECT": "PROG", "DEVCLASS": "$TMP" }
            ]),
            _ => json!([]),
        };
        Some(results(rows))
    }

    fn offline_config() -> ConnectionConfig {
        let mut config = ConnectionConfig::new(SapEnvironment::Dev);
        config.connection_type = ConnectionType::Http;
        config.base_url = Some("http://127.0.0.1:9".to_string());
        config.user = Some("DEVELOPER".to_string());
        config.passwd = Some("secret".to_string());
        config.timeout = 2;
        config
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = ConnectionConfig::new(SapEnvironment::Dev);
        let err = SapClient::new(config).unwrap_err();
        assert!(err.is_connectivity());
    }

    #[test]
    fn test_unreachable_system_is_connectivity_error() {
        let client = SapClient::new(offline_config()).unwrap();
        let err = client.get_table_structure("ZORDER").unwrap_err();
        assert!(err.is_connectivity());

        let status = client.test_connection();
        assert!(!status.rfc);
        assert!(!status.http);
    }

    #[test]
    fn test_invalid_search_pattern() {
        let client = SapClient::new(offline_config()).unwrap();
        let err = client.search_tables("Z' OR '1'='1", 10).unwrap_err();
        assert!(matches!(err, AbapifyError::SapMetadata(_)));
    }

    #[test]
    fn test_missing_table_is_not_found() {
        let system = LocalSystem::start(empty_system);
        let client = system.client();

        let err = client.get_table_structure("ZDOES_NOT_EXIST").unwrap_err();
        assert!(matches!(
            err,
            AbapifyError::TableNotFound { ref table } if table == "ZDOES_NOT_EXIST"
        ));

        let objects = client
            .search_objects("Y_NOTHING*", &ObjectType::Program)
            .unwrap();
        assert!(objects.is_empty());
        assert!(client
            .get_foreign_keys("ZDOES_NOT_EXIST")
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_structure_read_from_dictionary_tables() {
        let system = LocalSystem::start(order_system);
        let client = system.client();

        let structure = client.get_table_structure("ZORDER").unwrap();
        assert_eq!(structure.header.name, "ZORDER");
        assert_eq!(structure.header.description, "Sales orders");
        assert_eq!(structure.header.delivery_class, "A");
        assert!(structure.header.client_dependent);
        assert_eq!(structure.header.changed_on, NaiveDate::from_ymd_opt(2024, 1, 31));

        let names: Vec<&str> = structure.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["MANDT", "ORDER_ID", "KUNNR"]);
        assert_eq!(structure.fields[1].length, 10);
        assert!(structure.fields[1].key_flag);
        assert_eq!(structure.fields[1].description, "Order number");
        assert_eq!(structure.fields[0].domain.as_deref(), Some("MANDT"));
        assert!(!structure.fields[2].key_flag);

        let err = client.get_table_structure("ZMISSING").unwrap_err();
        assert!(err.is_not_found());

        let keys = client.get_foreign_keys("ZORDER").unwrap();
        assert_eq!(keys.len(), 1);
        assert_eq!(keys[0].field_name, "KUNNR");
        assert_eq!(keys[0].check_table, "ZCUSTOMER");
        assert_eq!(keys[0].check_field, "KUNNR");
    }

    #[test]
    fn test_object_search_reads_repository_directory() {
        let system = LocalSystem::start(order_system);
        let client = system.client();

        let programs = client.search_objects("Z*", &ObjectType::Program).unwrap();
        assert_eq!(programs.len(), 1);
        assert_eq!(programs[0].name, "ZSD_ORDERS");
        assert_eq!(programs[0].object_type, "PROG");
        assert_eq!(programs[0].package.as_deref(), Some("ZSD"));

        let classes = client.search_objects("ZCL*", &ObjectType::Class).unwrap();
        assert_eq!(classes.len(), 1);
        assert_eq!(classes[0].name, "ZCL_SD_ORDER");

        assert!(client
            .search_objects("Y_NOTHING*", &ObjectType::Program)
            .unwrap()
            .is_empty());
        assert!(system
            .requests()
            .iter()
            .any(|(path, _)| path.ends_with("/TADIR")));
    }

    #[test]
    fn test_rfc_connection_released_on_every_exit() {
        fn first_failing_call(client: &SapClient) -> Result<Value> {
            let session = client.rfc_connection()?;
            session.call_function("Z_NOT_AVAILABLE", &RfcParams::new())?;
            session.call_function("RFC_PING", &RfcParams::new())
        }

        let system = LocalSystem::start(empty_system);
        let client = system.client();

        {
            let session = client.rfc_connection().unwrap();
            assert!(session.client().is_connected());
            session
                .call_function("RFC_SYSTEM_INFO", &RfcParams::new())
                .unwrap();
        }
        assert!(!client.rfc.is_connected());

        {
            let session = client.rfc_connection().unwrap();
            assert!(session
                .call_function("BAPI_USER_GET_DETAIL", &RfcParams::new())
                .is_err());
        }
        assert!(!client.rfc.is_connected());

        assert!(first_failing_call(&client).is_err());
        assert!(!client.rfc.is_connected());

        client.get_table_structure("ZDOES_NOT_EXIST").unwrap_err();
        assert!(!client.rfc.is_connected());
    }

    #[test]
    fn test_one_authenticated_http_client_serves_both_paths() {
        let system = LocalSystem::start(empty_system);
        let client = system.client();

        let http = client.http().unwrap();
        assert!(std::ptr::eq(http, client.rfc.http().unwrap()));

        let status = client.test_connection();
        assert!(status.rfc);
        assert!(status.http);

        client.search_tables("Z*", 10).unwrap();
        let requests = system.requests();
        assert!(requests.iter().any(|(path, _)| path.ends_with("/DD02L")));
        assert!(requests.iter().all(|(_, authorized)| *authorized));
    }
}
