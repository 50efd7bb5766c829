// src/api.rs
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// Payroll queries recompute the whole period server side.
pub const REPORT_TIMEOUT: Duration = Duration::from_secs(120);
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("La sesión expiró o el token no es válido. Vuelva a iniciar sesión.")]
    Unauthorized,
    #[error("El servidor tardó demasiado en responder ({0} s). Intente con un periodo más corto o reintente.")]
    Timeout(u64),
    #[error("{message}")]
    Api {
        status: StatusCode,
        message: String,
        errors: Vec<String>,
    },
    #[error("No se pudo conectar con el servidor: {0}")]
    Http(reqwest::Error),
}

impl ClientError {
    /// A rejected token makes every saved filter and report stale.
    pub fn invalidates_session(&self) -> bool {
        matches!(self, ClientError::Unauthorized)
    }
}

/// Response envelope of the reporting API.
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    success: bool,
    data: Option<Value>,
    message: Option<String>,
    #[serde(default)]
    errors: Vec<String>,
}

pub struct ApiClient {
    http: Client,
    base_url: String,
    token: Option<String>,
}

impl ApiClient {
    pub fn new(base_url: &str, token: Option<String>) -> Result<Self, ClientError> {
        let http = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .map_err(ClientError::Http)?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    pub async fn get(
        &self,
        path: &str,
        query: &[(&str, String)],
        timeout: Duration,
    ) -> Result<Value, ClientError> {
        let request = self.http.get(self.url(path)).query(query).timeout(timeout);
        self.send(self.authorize(request), timeout).await
    }

    pub async fn post(&self, path: &str, body: &Value) -> Result<Value, ClientError> {
        let request = self.http.post(self.url(path)).json(body);
        self.send(self.authorize(request), DEFAULT_TIMEOUT).await
    }

    async fn send(&self, request: RequestBuilder, timeout: Duration) -> Result<Value, ClientError> {
        let response = request.send().await.map_err(|e| classify(e, timeout))?;
        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(ClientError::Unauthorized);
        }
        if status == StatusCode::REQUEST_TIMEOUT || status == StatusCode::GATEWAY_TIMEOUT {
            return Err(ClientError::Timeout(timeout.as_secs()));
        }

        let text = response.text().await.map_err(|e| classify(e, timeout))?;
        let envelope: Option<Envelope> = serde_json::from_str(&text).ok();

        match envelope {
            Some(envelope) if status.is_success() && envelope.success => {
                Ok(envelope.data.unwrap_or(Value::Null))
            }
            Some(envelope) => Err(ClientError::Api {
                status,
                message: envelope
                    .message
                    .unwrap_or_else(|| format!("Error {}", status.as_u16())),
                errors: envelope.errors,
            }),
            None => Err(ClientError::Api {
                status,
                message: format!("Error {}: {}", status.as_u16(), text.trim()),
                errors: Vec::new(),
            }),
        }
    }
}

fn classify(error: reqwest::Error, timeout: Duration) -> ClientError {
    if error.is_timeout() {
        ClientError::Timeout(timeout.as_secs())
    } else {
        ClientError::Http(error)
    }
}
