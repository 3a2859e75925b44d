//! Transport capability: the one suspension point every handler awaits on.

use async_trait::async_trait;
use serde_json::Value;
use shared::protocol::Envelope;

use crate::error::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
}

#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    pub method: Method,
    pub url: String,
    pub body: Option<Value>,
}

impl RequestDescriptor {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            body: None,
        }
    }

    pub fn post(url: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::Post,
            url: url.into(),
            body: Some(body),
        }
    }

    pub fn put(url: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::Put,
            url: url.into(),
            body: Some(body),
        }
    }

    pub fn delete(url: impl Into<String>) -> Self {
        Self {
            method: Method::Delete,
            url: url.into(),
            body: None,
        }
    }
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Performs the request and suspends until it settles. Network and
    /// HTTP-level failures surface as [`CoreError::Transport`]; no retry,
    /// no backoff.
    async fn perform(&self, request: RequestDescriptor) -> Result<Envelope, CoreError>;
}

/// reqwest-backed transport decoding the JSON body into an [`Envelope`].
pub struct HttpTransport {
    http: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
        }
    }
}

impl Default for HttpTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn perform(&self, request: RequestDescriptor) -> Result<Envelope, CoreError> {
        let mut builder = match request.method {
            Method::Get => self.http.get(&request.url),
            Method::Post => self.http.post(&request.url),
            Method::Put => self.http.put(&request.url),
            Method::Delete => self.http.delete(&request.url),
        };
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|err| CoreError::Transport(err.to_string()))?
            .error_for_status()
            .map_err(|err| CoreError::Transport(err.to_string()))?;

        response
            .json::<Envelope>()
            .await
            .map_err(|err| CoreError::Transport(err.to_string()))
    }
}

#[cfg(test)]
#[path = "tests/transport_tests.rs"]
mod tests;
