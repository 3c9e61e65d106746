//! HTTP transport for remote execution.

use futures::future::BoxFuture;
use serde_json::Value;
use sift_engine::ProtocolRequest;

use crate::error::{GridError, Result};

/// Sends one translated request and returns the raw response body.
///
/// The controller only ever talks to this trait, so tests substitute
/// scripted transports and production code keeps [`HttpTransport`].
pub trait Transport: Send + Sync {
    fn fetch<'a>(
        &'a self,
        endpoint: &'a str,
        request: &'a ProtocolRequest,
    ) -> BoxFuture<'a, Result<Value>>;
}

/// GET-based transport over a shared `reqwest` client.
#[derive(Debug, Clone, Default)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Transport for HttpTransport {
    fn fetch<'a>(
        &'a self,
        endpoint: &'a str,
        request: &'a ProtocolRequest,
    ) -> BoxFuture<'a, Result<Value>> {
        Box::pin(async move {
            let response = self
                .client
                .get(endpoint)
                .query(&request.params)
                .send()
                .await
                .map_err(|e| GridError::Transport(e.to_string()))?;

            let status = response.status();
            if !status.is_success() {
                return Err(GridError::Transport(format!(
                    "endpoint returned {}",
                    status
                )));
            }

            response
                .json::<Value>()
                .await
                .map_err(|e| GridError::Transport(e.to_string()))
        })
    }
}
