use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use crate::analytics::{HttpTransport, TransportError, TransportResponse};

#[derive(Clone, Debug, PartialEq)]
pub struct RecordedRequest {
    pub url: String,
    pub body: String,
    pub headers: BTreeMap<String, String>,
}

impl RecordedRequest {
    pub fn json(&self) -> Value {
        serde_json::from_str(&self.body).unwrap()
    }

    /// `event_type` of every event in the posted batch, in order.
    pub fn event_types(&self) -> Vec<String> {
        self.json()["events"]
            .as_array()
            .unwrap()
            .iter()
            .map(|event| event["event_type"].as_str().unwrap().to_string())
            .collect()
    }
}

/// In-memory transport that records every POST and answers with a scripted result.
#[derive(Clone)]
pub struct RecordingTransport {
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    response: Arc<Mutex<Result<TransportResponse, TransportError>>>,
}

impl Default for RecordingTransport {
    fn default() -> Self {
        Self {
            requests: Arc::default(),
            response: Arc::new(Mutex::new(Ok(TransportResponse::new(200, "success")))),
        }
    }
}

impl RecordingTransport {
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn respond_with(&self, response: TransportResponse) {
        *self.response.lock().unwrap() = Ok(response);
    }

    pub fn fail_with(&self, message: &str) {
        *self.response.lock().unwrap() = Err(TransportError::new(message));
    }
}

#[async_trait]
impl HttpTransport for RecordingTransport {
    async fn post(
        &self,
        url: &str,
        body: &str,
        headers: &BTreeMap<String, String>,
    ) -> Result<TransportResponse, TransportError> {
        self.requests.lock().unwrap().push(RecordedRequest {
            url: url.to_string(),
            body: body.to_string(),
            headers: headers.clone(),
        });
        self.response.lock().unwrap().clone()
    }
}
