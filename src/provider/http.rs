//! Shared HTTP client and auth utilities.

use std::sync::OnceLock;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};

use crate::error::SwitchboardError;

static SHARED_CLIENT: OnceLock<reqwest::Client> = OnceLock::new();

/// Get (or create) the shared reqwest client.
pub fn shared_client() -> &'static reqwest::Client {
    SHARED_CLIENT.get_or_init(|| {
        reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .pool_max_idle_per_host(10)
            .build()
            .unwrap_or_default()
    })
}

/// How the completion endpoint authenticates requests.
#[derive(Debug, Clone)]
pub enum Auth {
    /// `Authorization: Bearer <key>` (OpenAI-compatible endpoints).
    Bearer(String),
    /// `api-key: <key>` (Azure OpenAI deployments).
    ApiKey(String),
}

impl Auth {
    pub fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        match self {
            Self::Bearer(key) => {
                if let Ok(value) = HeaderValue::from_str(&format!("Bearer {key}")) {
                    headers.insert(AUTHORIZATION, value);
                }
            }
            Self::ApiKey(key) => {
                if let Ok(value) = HeaderValue::from_str(key) {
                    headers.insert("api-key", value);
                }
            }
        }
        headers
    }
}

/// Map a non-200 completion response to an error.
pub fn status_to_error(status: u16, body: &str) -> SwitchboardError {
    SwitchboardError::Api {
        status,
        message: body.to_string(),
    }
}
