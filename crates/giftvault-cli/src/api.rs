//! Thin HTTP client for the GiftVault server.

use anyhow::Context;
use serde_json::Value;

/// HTTP client bound to one server base URL.
pub struct Client {
    base_url: String,
}

impl Client {
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self { base_url }
    }

    /// Sends a GET and parses the JSON response.
    pub fn get(&self, path: &str) -> anyhow::Result<Value> {
        let url = format!("{}{}", self.base_url, path);
        let response = ureq::get(&url).call().map_err(|e| describe_error(&url, e))?;
        response
            .into_json()
            .with_context(|| format!("invalid JSON from {url}"))
    }

    /// Sends a POST with a JSON body and parses the JSON response.
    pub fn post(&self, path: &str, body: Value) -> anyhow::Result<Value> {
        let url = format!("{}{}", self.base_url, path);
        let response = ureq::post(&url)
            .send_json(body)
            .map_err(|e| describe_error(&url, e))?;
        response
            .into_json()
            .with_context(|| format!("invalid JSON from {url}"))
    }
}

/// Turns a transport or HTTP-status error into something readable,
/// surfacing the server's error message and reason code when present.
fn describe_error(url: &str, err: ureq::Error) -> anyhow::Error {
    match err {
        ureq::Error::Status(code, response) => {
            let body: Value = response.into_json().unwrap_or(Value::Null);
            let message = body["error"].as_str().unwrap_or("request failed");
            match body["reason"].as_str() {
                Some(reason) => anyhow::anyhow!("{code}: {message} ({reason})"),
                None => anyhow::anyhow!("{code}: {message}"),
            }
        }
        other => anyhow::anyhow!("request to {url} failed: {other}"),
    }
}
