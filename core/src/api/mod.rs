//! HTTP plumbing for the ProofAI service contract.
//!
//! Every call returns a typed [`Result`]: transport failures become
//! [`ClientError::Network`], a non-2xx status or a JSON body carrying an
//! `error` field becomes [`ClientError::Server`].

pub mod types;

use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::config::ServiceConfig;
use crate::{ClientError, Result};

pub use types::*;

#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(config: &ServiceConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| ClientError::Network(e.to_string()))?;
        Ok(Self {
            http,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Shared connection pool, also used for gateway routes.
    pub(crate) fn http(&self) -> &Client {
        &self.http
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        decode_json(self.send_get(path, query).await?).await
    }

    /// Like [`ApiClient::get`] for routes whose non-2xx replies still carry a
    /// meaningful body (confirmation answers 202 while pending).
    pub async fn get_any_status<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        decode_json_any_status(self.send_get(path, query).await?).await
    }

    pub async fn post_form<T: DeserializeOwned>(&self, path: &str, form: &[(&str, &str)]) -> Result<T> {
        decode_json(self.send_form(path, form).await?).await
    }

    /// Like [`ApiClient::post_form`] for routes whose non-2xx replies still
    /// carry a meaningful body (login answers 401 `{"login":"Failed"}`).
    pub async fn post_form_any_status<T: DeserializeOwned>(&self, path: &str, form: &[(&str, &str)]) -> Result<T> {
        decode_json_any_status(self.send_form(path, form).await?).await
    }

    async fn send_get(&self, path: &str, query: &[(&str, String)]) -> Result<Response> {
        let url = self.url(path);
        log::debug!("GET {url}");
        Ok(self.http.get(&url).query(query).send().await?)
    }

    async fn send_form(&self, path: &str, form: &[(&str, &str)]) -> Result<Response> {
        let url = self.url(path);
        log::debug!("POST {url}");
        Ok(self.http.post(&url).form(form).send().await?)
    }

    pub async fn post<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.url(path);
        log::debug!("POST {url}");
        let response = self.http.post(&url).send().await?;
        decode_json(response).await
    }
}

/// Decode a service response; any non-2xx status is a [`ClientError::Server`].
pub(crate) async fn decode_json<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    if status.is_success() {
        return decode_json_any_status(response).await;
    }

    let body = response.text().await?;
    let detail = match serde_json::from_str::<Value>(&body) {
        Ok(value) => value.get("error").map(error_message).unwrap_or_else(|| value.to_string()),
        Err(_) => body.trim().to_string(),
    };
    Err(ClientError::Server(if detail.is_empty() {
        status.to_string()
    } else {
        format!("{status}: {detail}")
    }))
}

/// Decode a response whose status code is not authoritative.
///
/// Any parseable JSON is handed to the caller unless it carries an `error`
/// field. Only for routes with a known non-2xx contract.
pub(crate) async fn decode_json_any_status<T: DeserializeOwned>(response: Response) -> Result<T> {
    let status = response.status();
    let body = response.text().await?;

    let value: Value = match serde_json::from_str(&body) {
        Ok(value) => value,
        Err(e) if status.is_success() => {
            return Err(ClientError::Serialization(format!("invalid response body: {e}")));
        }
        Err(_) => {
            let text = body.trim();
            return Err(ClientError::Server(if text.is_empty() {
                status.to_string()
            } else {
                format!("{status}: {text}")
            }));
        }
    };

    if let Some(err) = value.get("error") {
        return Err(ClientError::Server(error_message(err)));
    }

    serde_json::from_value(value).map_err(|e| {
        if status.is_success() {
            ClientError::Serialization(e.to_string())
        } else {
            ClientError::Server(format!("{status}: {e}"))
        }
    })
}

fn error_message(err: &Value) -> String {
    match err {
        Value::String(s) => s.clone(),
        Value::Object(map) => map
            .get("error")
            .or_else(|| map.get("message"))
            .map(error_message)
            .unwrap_or_else(|| err.to_string()),
        other => other.to_string(),
    }
}
