//! RFC client running in HTTP fallback mode
//!
//! The native RFC library is not available, so remote function calls are
//! served by a fallback: calls that have an HTTP equivalent are forwarded to
//! the [`HttpClient`] and anything else fails with an RFC error naming the
//! function. Callers check [`RfcClient::supports`] and read the dictionary
//! tables through `RFC_READ_TABLE` when a function is not served.

use crate::dictionary::RFC_COLUMN_WIDTH;
use crate::http::HttpClient;
use crate::resolver::ConnectionConfig;
use abapify_common::{AbapifyError, Result};
use serde_json::{json, Map, Value};
use std::cell::Cell;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Maximum length of one `OPTIONS` line in `RFC_READ_TABLE`
pub const OPTION_LINE_WIDTH: usize = 72;

const TABLES_SERVICE: &str = "/sap/opu/odata/sap/ZGW_TABLES_SRV";
const DEFAULT_ROWCOUNT: u64 = 100;

/// Functions answered without native RFC
const FALLBACK_FUNCTIONS: [&str; 3] = ["RFC_PING", "RFC_SYSTEM_INFO", "RFC_READ_TABLE"];

/// Keyword parameters of a remote function call
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RfcParams {
    values: BTreeMap<String, Value>,
}

impl RfcParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.values.insert(name.to_string(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    /// `FIELDS` table as a list of field names
    pub fn field_names(&self) -> Vec<String> {
        self.get("FIELDS")
            .and_then(Value::as_array)
            .map(|fields| {
                fields
                    .iter()
                    .filter_map(|f| f.get("FIELDNAME").and_then(Value::as_str))
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// `FIELDS` parameter for `RFC_READ_TABLE`
pub fn fields_param(fields: &[&str]) -> Value {
    Value::Array(
        fields
            .iter()
            .map(|f| json!({ "FIELDNAME": f }))
            .collect(),
    )
}

/// Split a WHERE clause into `OPTIONS` lines of at most 72 characters
pub fn options_param(where_clause: &str) -> Value {
    let chars: Vec<char> = where_clause.chars().collect();
    Value::Array(
        chars
            .chunks(OPTION_LINE_WIDTH)
            .map(|chunk| json!({ "TEXT": chunk.iter().collect::<String>() }))
            .collect(),
    )
}

/// RFC client bound to one connection descriptor
#[derive(Debug)]
pub struct RfcClient {
    config: ConnectionConfig,
    http_fallback: Option<HttpClient>,
    connected: Cell<bool>,
}

impl RfcClient {
    /// Client serving calls through `http_fallback`, the only HTTP client of
    /// the connection
    pub fn new(config: ConnectionConfig, http_fallback: Option<HttpClient>) -> Self {
        warn!(
            "Native RFC is unavailable; using HTTP compatibility mode, \
             some RFC functions are limited"
        );

        Self {
            config,
            http_fallback,
            connected: Cell::new(false),
        }
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    pub fn http(&self) -> Option<&HttpClient> {
        self.http_fallback.as_ref()
    }

    /// Whether `name` can be called in the current mode
    pub fn supports(&self, name: &str) -> bool {
        FALLBACK_FUNCTIONS.contains(&name)
    }

    /// Open a scoped session; the connection is released when it is dropped
    pub fn session(&self) -> Result<RfcSession<'_>> {
        if !self.connected.get() {
            self.connect()?;
        }
        Ok(RfcSession { client: self })
    }

    pub fn connect(&self) -> Result<()> {
        match &self.http_fallback {
            Some(http) => {
                info!("Using HTTP fallback for SAP connectivity");
                if http.test_connection() {
                    info!("HTTP connection established (RFC fallback)");
                    self.connected.set(true);
                    Ok(())
                } else {
                    Err(AbapifyError::SapConnection(
                        "HTTP fallback connection failed".to_string(),
                    ))
                }
            }
            None => Err(AbapifyError::SapConnection(format!(
                "Native RFC is unavailable and no HTTP base URL is configured. Set {}",
                self.config.environment.key("BASE_URL")
            ))),
        }
    }

    pub fn disconnect(&self) {
        if self.connected.replace(false) {
            info!("RFC/HTTP connection closed");
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected.get() && self.call_function("RFC_PING", &RfcParams::new()).is_ok()
    }

    /// Call a remote function by name
    pub fn call_function(&self, name: &str, params: &RfcParams) -> Result<Value> {
        if !self.connected.get() {
            return Err(AbapifyError::rfc(name, "RFC connection not established"));
        }
        debug!("Calling {}", name);

        match name {
            "RFC_PING" => self.ping(),
            "RFC_SYSTEM_INFO" => Ok(self.system_info()),
            "RFC_READ_TABLE" => self.read_table(params),
            other => Err(AbapifyError::rfc(
                other,
                format!(
                    "Function '{}' is not supported in HTTP fallback mode; native RFC is required",
                    other
                ),
            )),
        }
    }

    fn ping(&self) -> Result<Value> {
        match &self.http_fallback {
            Some(http) if http.test_connection() => Ok(json!({ "SUCCESS": "X" })),
            _ => Err(AbapifyError::rfc("RFC_PING", "Ping failed")),
        }
    }

    /// Descriptor values only; release and database stay blank without native RFC
    fn system_info(&self) -> Value {
        let config = &self.config;
        let host = config.ashost.clone().or_else(|| {
            self.http_fallback
                .as_ref()
                .and_then(|http| http.base_url().host_str().map(str::to_string))
        });

        json!({
            "RFCSI_EXPORT": {
                "RFCSYSID": config.environment.as_str(),
                "RFCMANDT": config.client.as_deref().unwrap_or_default(),
                "RFCUSER": config.user.as_deref().unwrap_or_default(),
                "RFCLAN": config.language,
                "RFCHOST": host.unwrap_or_default(),
                "RFCSAPRL": "",
                "RFCDBSYS": ""
            }
        })
    }

    /// `RFC_READ_TABLE` through the generic OData tables service
    fn read_table(&self, params: &RfcParams) -> Result<Value> {
        let http = self.http_fallback.as_ref().ok_or_else(|| {
            AbapifyError::rfc("RFC_READ_TABLE", "HTTP fallback not configured")
        })?;

        let table = params.get_str("QUERY_TABLE").unwrap_or_default();
        let rowcount = params
            .get("ROWCOUNT")
            .and_then(Value::as_u64)
            .unwrap_or(DEFAULT_ROWCOUNT);
        let fields = params.field_names();

        let mut query = vec![("$top".to_string(), rowcount.to_string())];
        if !fields.is_empty() {
            query.push(("$select".to_string(), fields.join(",")));
        }

        let endpoint = format!("{}/{}", TABLES_SERVICE, table);
        match http.get(&endpoint, &query) {
            Ok(result) => Ok(odata_to_read_table(&result, &fields)),
            Err(e) => {
                warn!("OData fallback failed for {}: {}", table, e);
                Ok(json!({
                    "DATA": [],
                    "FIELDS": params.get("FIELDS").cloned().unwrap_or_else(|| json!([])),
                    "OPTIONS": params.get("OPTIONS").cloned().unwrap_or_else(|| json!([]))
                }))
            }
        }
    }
}

/// Scoped RFC session; disconnects on drop
pub struct RfcSession<'a> {
    client: &'a RfcClient,
}

impl RfcSession<'_> {
    pub fn call_function(&self, name: &str, params: &RfcParams) -> Result<Value> {
        self.client.call_function(name, params)
    }

    pub fn client(&self) -> &RfcClient {
        self.client
    }
}

impl Drop for RfcSession<'_> {
    fn drop(&mut self) {
        self.client.disconnect();
    }
}

/// Flatten OData `d.results` entries into fixed-width `WA` lines.
///
/// Columns follow the requested field order when one was given; fields
/// missing from an entry stay blank.
fn odata_to_read_table(result: &Value, fields: &[String]) -> Value {
    let entries = result
        .pointer("/d/results")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();

    let data: Vec<Value> = entries
        .iter()
        .filter_map(Value::as_object)
        .map(|entry| json!({ "WA": work_area(entry, fields) }))
        .collect();

    json!({ "DATA": data, "FIELDS": [], "OPTIONS": [] })
}

fn work_area(entry: &Map<String, Value>, fields: &[String]) -> String {
    let values: Vec<&Value> = if fields.is_empty() {
        entry
            .iter()
            .filter(|(key, _)| !key.starts_with("__"))
            .map(|(_, value)| value)
            .collect()
    } else {
        fields
            .iter()
            .map(|f| entry.get(f).unwrap_or(&Value::Null))
            .collect()
    };

    values
        .into_iter()
        .map(|value| {
            let text = match value {
                Value::Null => String::new(),
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            let column: String = text.chars().take(RFC_COLUMN_WIDTH).collect();
            format!("{:<width$}", column, width = RFC_COLUMN_WIDTH)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use abapify_common::SapEnvironment;

    #[test]
    fn test_options_split_at_72_chars() {
        let clause = "A".repeat(150);
        let options = options_param(&clause);
        let lines = options.as_array().unwrap();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0]["TEXT"].as_str().unwrap().len(), 72);
        assert_eq!(lines[2]["TEXT"].as_str().unwrap().len(), 6);
    }

    #[test]
    fn test_calls_require_connection() {
        let client = RfcClient::new(ConnectionConfig::new(SapEnvironment::Dev), None);
        let err = client
            .call_function("RFC_SYSTEM_INFO", &RfcParams::new())
            .unwrap_err();
        assert!(matches!(err, AbapifyError::Rfc { .. }));
    }

    #[test]
    fn test_session_without_base_url_is_connectivity_error() {
        let client = RfcClient::new(ConnectionConfig::new(SapEnvironment::Dev), None);
        let err = client.session().err().unwrap();
        assert!(err.is_connectivity());
        assert!(err.to_string().contains("SAP_DEV_BASE_URL"));
    }

    #[test]
    fn test_odata_entries_become_work_areas() {
        let result = json!({
            "d": { "results": [
                { "__metadata": { "uri": "x" }, "TABNAME": "ZORDER", "DDTEXT": "Orders" }
            ]}
        });
        let fields = vec!["TABNAME".to_string(), "DDTEXT".to_string()];
        let converted = odata_to_read_table(&result, &fields);
        let wa = converted["DATA"][0]["WA"].as_str().unwrap();

        assert_eq!(wa.len(), 60);
        assert!(wa.starts_with("ZORDER"));
        assert_eq!(wa[30..].trim(), "Orders");
    }

    #[test]
    fn test_missing_fields_keep_column_positions() {
        let result = json!({
            "d": { "results": [ { "TABNAME": "ZORDER", "AS4DATE": "20240131" } ] }
        });
        let fields = vec![
            "TABNAME".to_string(),
            "CONTFLAG".to_string(),
            "AS4DATE".to_string(),
        ];
        let converted = odata_to_read_table(&result, &fields);
        let wa = converted["DATA"][0]["WA"].as_str().unwrap();

        assert_eq!(wa.len(), 90);
        assert_eq!(wa[30..60].trim(), "");
        assert_eq!(wa[60..].trim(), "20240131");
    }

    #[test]
    fn test_system_info_only_echoes_the_descriptor() {
        let mut config = ConnectionConfig::new(SapEnvironment::Qas);
        config.base_url = Some("https://sapqas.example.com:44300".to_string());
        config.user = Some("TESTER".to_string());
        let http = HttpClient::new(&config).unwrap();
        let client = RfcClient::new(config, Some(http));

        let info = client.system_info();
        assert_eq!(info["RFCSI_EXPORT"]["RFCSYSID"], "QAS");
        assert_eq!(info["RFCSI_EXPORT"]["RFCUSER"], "TESTER");
        assert_eq!(info["RFCSI_EXPORT"]["RFCHOST"], "sapqas.example.com");
        assert_eq!(info["RFCSI_EXPORT"]["RFCMANDT"], "");
        assert_eq!(info["RFCSI_EXPORT"]["RFCSAPRL"], "");
    }

    #[test]
    fn test_dictionary_functions_are_not_served() {
        let client = RfcClient::new(ConnectionConfig::new(SapEnvironment::Dev), None);
        assert!(client.supports("RFC_READ_TABLE"));
        assert!(!client.supports("DDIF_TABL_GET"));
        assert!(!client.supports("DDIF_FORKEY_GET"));

        client.connected.set(true);
        let err = client
            .call_function("DDIF_TABL_GET", &RfcParams::new().with("NAME", "ZORDER"))
            .unwrap_err();
        assert!(matches!(
            err,
            AbapifyError::Rfc { ref function, .. } if function.as_deref() == Some("DDIF_TABL_GET")
        ));
        client.disconnect();
    }
}
