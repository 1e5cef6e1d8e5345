//! HTTP client for SAP OData and REST endpoints

use crate::resolver::ConnectionConfig;
use crate::retry::RetryPolicy;
use abapify_common::{AbapifyError, Result};
use reqwest::blocking::{Client, RequestBuilder, Response};
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{Method, Url};
use serde_json::{json, Value};
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

const USER_AGENT: &str = "ABAPify-SAP-Client/1.0";

/// Endpoint used for connectivity checks
pub const PING_ENDPOINT: &str = "/sap/bc/ping";

#[derive(Debug, Clone)]
enum HttpAuth {
    Basic { user: String, password: String },
    Bearer(String),
}

/// Blocking HTTP client bound to one SAP system
#[derive(Debug)]
pub struct HttpClient {
    client: Client,
    base_url: Url,
    auth: Option<HttpAuth>,
    retry: RetryPolicy,
}

impl HttpClient {
    /// Build a client from a connection descriptor; requires a base URL
    pub fn new(config: &ConnectionConfig) -> Result<Self> {
        let base = config.effective_base_url().ok_or_else(|| {
            AbapifyError::Config(format!(
                "No HTTP base URL configured for environment {}",
                config.environment
            ))
        })?;
        let base_url = Url::parse(&base)
            .map_err(|e| AbapifyError::Config(format!("Invalid SAP base URL '{}': {}", base, e)))?;

        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(header::ACCEPT, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .default_headers(headers)
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(config.timeout))
            .danger_accept_invalid_certs(!config.verify_ssl)
            .build()
            .map_err(|e| {
                AbapifyError::SapConnection(format!("Failed to build HTTP client: {}", e))
            })?;

        if !config.verify_ssl {
            warn!("SSL certificate verification disabled for {}", base_url);
        }

        Ok(Self {
            client,
            base_url,
            auth: None,
            retry: RetryPolicy::default(),
        })
    }

    /// Replace the retry policy
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Use HTTP basic authentication
    pub fn authenticate(&mut self, user: &str, password: &str) {
        self.auth = Some(HttpAuth::Basic {
            user: user.to_string(),
            password: password.to_string(),
        });
        info!("HTTP authentication configured for user: {}", user);
    }

    /// Use a bearer token
    pub fn authenticate_bearer(&mut self, token: &str) {
        self.auth = Some(HttpAuth::Bearer(token.to_string()));
        info!("OAuth authentication configured");
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Resolve an endpoint against the base URL
    pub fn url(&self, endpoint: &str) -> Result<Url> {
        self.base_url
            .join(endpoint)
            .map_err(|e| AbapifyError::http(format!("Invalid endpoint: {}", e), None, endpoint))
    }

    pub fn get(&self, endpoint: &str, query: &[(String, String)]) -> Result<Value> {
        let response = self.send(Method::GET, endpoint, |request| request.query(query))?;
        read_json(response, endpoint)
    }

    pub fn post(&self, endpoint: &str, body: &Value) -> Result<Value> {
        let response = self.send(Method::POST, endpoint, |request| request.json(body))?;
        read_json(response, endpoint)
    }

    pub fn put(&self, endpoint: &str, body: &Value) -> Result<Value> {
        let response = self.send(Method::PUT, endpoint, |request| request.json(body))?;
        read_json(response, endpoint)
    }

    pub fn delete(&self, endpoint: &str) -> Result<Value> {
        let response = self.send(Method::DELETE, endpoint, |request| request)?;
        read_json(response, endpoint)
    }

    /// Fetch the `$metadata` document of an OData service as XML text
    pub fn odata_metadata(&self, service: &str) -> Result<String> {
        let endpoint = format!("/sap/opu/odata/sap/{}/$metadata", service);
        let response = self.send(Method::GET, &endpoint, |request| {
            request.header(header::ACCEPT, "application/xml")
        })?;
        response.text().map_err(|e| {
            AbapifyError::http(format!("Failed to read metadata: {}", e), None, &endpoint)
        })
    }

    /// Whether the ping endpoint answers successfully
    pub fn test_connection(&self) -> bool {
        match self.get(PING_ENDPOINT, &[]) {
            Ok(_) => true,
            Err(e) => {
                debug!("HTTP connection test failed: {}", e);
                false
            }
        }
    }

    fn send<F>(&self, method: Method, endpoint: &str, configure: F) -> Result<Response>
    where
        F: Fn(RequestBuilder) -> RequestBuilder,
    {
        let url = self.url(endpoint)?;
        let mut retry = 0;

        loop {
            debug!("{} {}", method, url);
            let mut request = configure(self.client.request(method.clone(), url.clone()));
            request = match &self.auth {
                Some(HttpAuth::Basic { user, password }) => {
                    request.basic_auth(user, Some(password))
                }
                Some(HttpAuth::Bearer(token)) => request.bearer_auth(token),
                None => request,
            };

            let response = request.send().map_err(|e| transport_error(e, endpoint))?;
            let status = response.status().as_u16();
            debug!("Response status: {}", status);

            if self.retry.should_retry(status, retry) {
                retry += 1;
                let delay = self.retry.delay_for(retry);
                warn!(
                    "HTTP {} from {}, retry {}/{} in {:?}",
                    status, endpoint, retry, self.retry.max_retries, delay
                );
                thread::sleep(delay);
                continue;
            }

            return check_status(response, endpoint);
        }
    }
}

fn check_status(response: Response, endpoint: &str) -> Result<Response> {
    let status = response.status().as_u16();
    if status == 401 {
        return Err(AbapifyError::SapAuthentication(
            "HTTP authentication failed".to_string(),
        ));
    }
    if status >= 400 {
        let body = response.text().unwrap_or_default();
        return Err(AbapifyError::http(
            format!("HTTP {}: {}", status, body),
            Some(status),
            endpoint,
        ));
    }
    Ok(response)
}

fn transport_error(error: reqwest::Error, endpoint: &str) -> AbapifyError {
    if error.is_timeout() {
        AbapifyError::http(format!("Request to {} timed out", endpoint), None, endpoint)
    } else if error.is_connect() {
        AbapifyError::SapConnection(format!("Connection error for {}", endpoint))
    } else {
        AbapifyError::http(format!("Request failed: {}", error), None, endpoint)
    }
}

/// Parse a body as JSON, wrapping anything else as `{"content": text}`
fn read_json(response: Response, endpoint: &str) -> Result<Value> {
    let text = response.text().map_err(|e| {
        AbapifyError::http(format!("Failed to read response: {}", e), None, endpoint)
    })?;
    Ok(parse_body(text))
}

pub(crate) fn parse_body(text: String) -> Value {
    match serde_json::from_str(&text) {
        Ok(value) => value,
        Err(_) => json!({ "content": text }),
    }
}

/// Build an OData `$filter` expression from equality conditions
pub fn odata_filter(filters: &[(String, String)]) -> Option<String> {
    if filters.is_empty() {
        return None;
    }
    Some(
        filters
            .iter()
            .map(|(field, value)| format!("{} eq '{}'", field, value))
            .collect::<Vec<_>>()
            .join(" and "),
    )
}
