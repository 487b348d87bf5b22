//! Email transport client
//!
//! The transport is a remote HTTP batch-send service consumed as a black
//! box: one request per campaign, one tracking identifier per recipient in
//! the response. Every transport error is retryable from the dispatcher's
//! point of view.

use std::time::Duration;

use async_trait::async_trait;
use maildrip_common::config::TransportConfig;
use maildrip_common::types::Recipient;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::credentials::AccessCredentials;

/// Transport errors
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("transport returned status {0}")]
    Status(u16),

    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out")]
    Timeout,

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error("response carried {got} tracking ids for {expected} recipients")]
    TrackingIdMismatch { expected: usize, got: usize },
}

/// Batch send request
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendRequest {
    pub recipients: Vec<Recipient>,
    pub subject: String,
    pub body: String,
    pub sender_email: String,
}

/// Batch send response: one opaque tracking id per recipient
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendResponse {
    pub tracking_ids: Vec<String>,
}

/// Outbound email transport
#[async_trait]
pub trait EmailTransport: Send + Sync {
    /// Perform one batch send. All-or-nothing: partial acceptance is not
    /// part of the contract.
    async fn send(
        &self,
        request: &SendRequest,
        credentials: &AccessCredentials,
    ) -> Result<SendResponse, TransportError>;
}

/// HTTP client for the remote email-sending service
pub struct HttpEmailTransport {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpEmailTransport {
    /// Create a new transport client with a bounded request timeout
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Network(e.to_string()))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    /// Build from configuration
    pub fn from_config(config: &TransportConfig) -> Result<Self, TransportError> {
        Self::new(
            config.endpoint.clone(),
            Duration::from_secs(config.timeout_secs),
        )
    }
}

#[async_trait]
impl EmailTransport for HttpEmailTransport {
    async fn send(
        &self,
        request: &SendRequest,
        credentials: &AccessCredentials,
    ) -> Result<SendResponse, TransportError> {
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&credentials.access_token)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    TransportError::Timeout
                } else {
                    TransportError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::Status(status.as_u16()));
        }

        let body: SendResponse = response
            .json()
            .await
            .map_err(|e| TransportError::MalformedResponse(e.to_string()))?;

        if body.tracking_ids.len() != request.recipients.len() {
            return Err(TransportError::TrackingIdMismatch {
                expected: request.recipients.len(),
                got: body.tracking_ids.len(),
            });
        }

        debug!(
            recipients = request.recipients.len(),
            "transport accepted batch"
        );
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request() -> SendRequest {
        SendRequest {
            recipients: vec![
                Recipient::new("n", "a@x.com"),
                Recipient::new("m", "b@x.com"),
            ],
            subject: "Hello".into(),
            body: "Body".into(),
            sender_email: "sender@x.com".into(),
        }
    }

    fn credentials() -> AccessCredentials {
        AccessCredentials {
            access_token: "tok".into(),
            expires_at: None,
        }
    }

    async fn transport(server: &MockServer) -> HttpEmailTransport {
        HttpEmailTransport::new(format!("{}/send", server.uri()), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_send_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/send"))
            .and(header("authorization", "Bearer tok"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"trackingIds": ["tr1", "tr2"]})),
            )
            .mount(&server)
            .await;

        let response = transport(&server)
            .await
            .send(&request(), &credentials())
            .await
            .unwrap();
        assert_eq!(response.tracking_ids, vec!["tr1", "tr2"]);
    }

    #[tokio::test]
    async fn test_send_non_2xx_is_status_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/send"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let err = transport(&server)
            .await
            .send(&request(), &credentials())
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Status(503)));
    }

    #[tokio::test]
    async fn test_send_slow_response_is_timeout() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/send"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"trackingIds": ["tr1", "tr2"]}))
                    .set_delay(Duration::from_secs(5)),
            )
            .mount(&server)
            .await;

        let transport =
            HttpEmailTransport::new(format!("{}/send", server.uri()), Duration::from_millis(100))
                .unwrap();
        let err = transport
            .send(&request(), &credentials())
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Timeout));
    }

    #[tokio::test]
    async fn test_send_connection_refused_is_network_error() {
        // Port 1 is reserved and never listening
        let transport =
            HttpEmailTransport::new("http://127.0.0.1:1/send", Duration::from_secs(5)).unwrap();
        let err = transport
            .send(&request(), &credentials())
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::Network(_)));
    }

    #[tokio::test]
    async fn test_send_malformed_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/send"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let err = transport(&server)
            .await
            .send(&request(), &credentials())
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn test_send_tracking_id_count_mismatch() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/send"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"trackingIds": ["tr1"]})))
            .mount(&server)
            .await;

        let err = transport(&server)
            .await
            .send(&request(), &credentials())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            TransportError::TrackingIdMismatch {
                expected: 2,
                got: 1
            }
        ));
    }
}
