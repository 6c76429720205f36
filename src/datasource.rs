//! Client for the remote inventory endpoint.
//!
//! The endpoint answers with an envelope `{ "body": "<json>" }` whose `body` is itself a
//! JSON-encoded array of records. Decoding happens in two steps, [`decode_envelope`] and
//! [`decode_payload`], each with its own error, so a caller can tell a broken envelope
//! from a broken payload.

use serde::Deserialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::record::{Dataset, Record};

#[derive(Debug, Clone, PartialEq)]
pub enum LoadState {
    Pending,
    Ready(Dataset),
    Failed(String),
}

impl LoadState {
    pub fn from_result(result: Result<Dataset, FetchError>) -> Self {
        match result {
            Ok(records) => LoadState::Ready(records),
            Err(e) => LoadState::Failed(e.to_string()),
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, LoadState::Pending)
    }

    pub fn dataset(&self) -> Option<&Dataset> {
        match self {
            LoadState::Ready(records) => Some(records),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {endpoint} failed: {message}")]
    Transport { endpoint: String, message: String },
    #[error("HTTP error! status: {status}")]
    Status { status: u16 },
    #[error("malformed response envelope: {0}")]
    Envelope(#[source] serde_json::Error),
    #[error("malformed inventory payload: {0}")]
    Payload(#[source] serde_json::Error),
}

#[derive(Deserialize)]
struct Envelope {
    body: String,
}

/// First decoding step: the outer JSON object, returning the encoded payload string.
pub fn decode_envelope(bytes: &[u8]) -> Result<String, FetchError> {
    let envelope: Envelope = serde_json::from_slice(bytes).map_err(FetchError::Envelope)?;
    Ok(envelope.body)
}

/// Second decoding step: the payload string into records.
pub fn decode_payload(body: &str) -> Result<Dataset, FetchError> {
    let objects: Vec<Map<String, Value>> =
        serde_json::from_str(body).map_err(FetchError::Payload)?;
    Ok(Arc::new(
        objects.into_iter().map(Record::from_json_object).collect(),
    ))
}

#[derive(Debug, Clone)]
pub struct DataSource {
    endpoint_url: String,
    client: reqwest::Client,
}

impl DataSource {
    pub fn new(endpoint_url: impl Into<String>) -> Self {
        Self {
            endpoint_url: endpoint_url.into(),
            client: reqwest::Client::new(),
        }
    }

    pub fn endpoint_url(&self) -> &str {
        &self.endpoint_url
    }

    /// One GET, no retry, no timeout.
    pub async fn fetch(&self) -> Result<Dataset, FetchError> {
        let transport = |e: reqwest::Error| FetchError::Transport {
            endpoint: self.endpoint_url.clone(),
            message: e.to_string(),
        };

        let response = self
            .client
            .get(&self.endpoint_url)
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        debug!("GET {} => {}", self.endpoint_url, status);
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
            });
        }

        let bytes = response.bytes().await.map_err(transport)?;
        let body = decode_envelope(&bytes)?;
        decode_payload(&body)
    }

    pub async fn load(&self) -> LoadState {
        let start_time = Instant::now();
        let result = self.fetch().await;
        let duration = start_time.elapsed().as_millis();
        match &result {
            Ok(records) => info!(
                "Loaded {} records from {} in {duration}ms",
                records.len(),
                self.endpoint_url
            ),
            Err(e) => error!("Loading from {} failed after {duration}ms: {e}", self.endpoint_url),
        }
        LoadState::from_result(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_double_encoded_body() {
        let raw = br#"{"body": "[{\"URL\":\"a\",\"Account\":\"1\",\"Region\":\"eu-north-1\"}]"}"#;
        let body = decode_envelope(raw).unwrap();
        let records = decode_payload(&body).unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].get("URL"), Some("a"));
        assert_eq!(records[0].get("Account"), Some("1"));
    }

    #[test]
    fn envelope_errors_are_distinct_from_payload_errors() {
        assert!(matches!(
            decode_envelope(b"<html>oops</html>"),
            Err(FetchError::Envelope(_))
        ));
        assert!(matches!(
            decode_envelope(br#"{"items": []}"#),
            Err(FetchError::Envelope(_))
        ));
        assert!(matches!(
            decode_envelope(br#"{"body": 5}"#),
            Err(FetchError::Envelope(_))
        ));

        assert!(matches!(decode_payload("not-json"), Err(FetchError::Payload(_))));
        assert!(matches!(decode_payload(r#"{"URL":"a"}"#), Err(FetchError::Payload(_))));
        assert!(matches!(decode_payload(r#"["a", "b"]"#), Err(FetchError::Payload(_))));
    }

    #[test]
    fn empty_payload_is_ready_with_no_records() {
        let records = decode_payload("[]").unwrap();
        assert!(records.is_empty());
        assert_eq!(LoadState::from_result(Ok(records.clone())), LoadState::Ready(records));
    }

    #[test]
    fn failed_state_carries_status_code() {
        let state = LoadState::from_result(Err(FetchError::Status { status: 503 }));
        match state {
            LoadState::Failed(message) => assert!(message.contains("503")),
            other => panic!("unexpected state {other:?}"),
        }
    }
}
