//! services/api/src/adapters/webhook.rs
//!
//! Shared HTTP plumbing for the remote webhook endpoints. Every endpoint
//! answers with a status and a body; the body is handed to the core untouched
//! apart from JSON decoding.

use post_planner_core::ports::{PortError, PortResult, RemoteReply};
use reqwest::multipart::Form;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

/// A client bound to a single webhook URL.
#[derive(Clone)]
pub struct WebhookClient {
    client: reqwest::Client,
    url: String,
}

impl WebhookClient {
    /// Creates a new `WebhookClient`.
    pub fn new(client: reqwest::Client, url: String) -> Self {
        Self { client, url }
    }

    pub async fn post_json<T>(&self, body: &T) -> PortResult<RemoteReply>
    where
        T: Serialize + ?Sized,
    {
        let response = self
            .client
            .post(&self.url)
            .json(body)
            .send()
            .await
            .map_err(network_error)?;
        read_reply(response).await
    }

    pub async fn post_multipart(&self, form: Form) -> PortResult<RemoteReply> {
        let response = self
            .client
            .post(&self.url)
            .multipart(form)
            .send()
            .await
            .map_err(network_error)?;
        read_reply(response).await
    }
}

/// Any status is returned as a reply; only a missing response is an error.
async fn read_reply(response: reqwest::Response) -> PortResult<RemoteReply> {
    let status = response.status().as_u16();
    let body = response.text().await.map_err(network_error)?;
    debug!(status, bytes = body.len(), "Webhook replied.");
    Ok(RemoteReply::new(status, parse_body(&body)))
}

/// Decodes a JSON body. Anything else is kept as text for the normalizer.
pub fn parse_body(body: &str) -> Value {
    serde_json::from_str(body).unwrap_or_else(|_| Value::String(body.to_string()))
}

fn network_error(err: reqwest::Error) -> PortError {
    PortError::Network(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn keeps_non_json_bodies_as_text() {
        assert_eq!(parse_body(r#"{"success": true}"#), json!({"success": true}));
        assert_eq!(parse_body("Accepted"), json!("Accepted"));
        assert_eq!(parse_body("{broken"), json!("{broken"));
        assert_eq!(parse_body(r#""{\"a\":1}""#), json!("{\"a\":1}"));
    }
}
