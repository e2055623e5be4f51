use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use serde::Serialize;
use serde_json::{json, Value};

use crate::analytics::error::{internal_error, AnalyticsResult};
use crate::analytics::event::Event;
use crate::analytics::logger::{Logger, LOGGER};

/// Status code and body returned by the collection endpoint.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The request never produced a response (DNS, connect, TLS, timeout).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransportError {
    message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl std::error::Error for TransportError {}

/// Network seam used by the dispatcher to POST a JSON body.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn post(
        &self,
        url: &str,
        body: &str,
        headers: &BTreeMap<String, String>,
    ) -> Result<TransportResponse, TransportError>;
}

/// Default transport backed by an async `reqwest` client.
#[derive(Clone, Debug)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> AnalyticsResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| internal_error(format!("failed to build HTTP client: {err}")))?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn post(
        &self,
        url: &str,
        body: &str,
        headers: &BTreeMap<String, String>,
    ) -> Result<TransportResponse, TransportError> {
        let mut header_map = HeaderMap::new();
        for (name, value) in headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|err| TransportError::new(format!("invalid header name: {err}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|err| TransportError::new(format!("invalid header value: {err}")))?;
            header_map.insert(name, value);
        }

        let response = self
            .client
            .post(url)
            .headers(header_map)
            .body(body.to_owned())
            .send()
            .await
            .map_err(|err| TransportError::new(format!("failed to send analytics events: {err}")))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<unavailable response body>".to_string());
        Ok(TransportResponse { status, body })
    }
}

/// How a dispatch attempt ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered { status: u16, body: String },
    Rejected { status: u16, body: String },
    TransportFailed { message: String },
}

impl DeliveryOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, DeliveryOutcome::Delivered { .. })
    }
}

/// Passed to the delivery hook after every dispatch attempt.
#[derive(Clone, Debug, PartialEq)]
pub struct DeliveryReport {
    pub url: String,
    pub event_count: usize,
    pub payload: Value,
    pub outcome: DeliveryOutcome,
}

pub type DeliveryHook = Arc<dyn Fn(&DeliveryReport) + Send + Sync + 'static>;

#[derive(Serialize)]
struct DispatchPayload<'a> {
    api_key: &'a str,
    events: &'a [Event],
}

/// Serializes batches to the wire format, hands them to the transport and records the outcome.
///
/// Delivery is best effort: nothing here returns an error to the caller. Failures are logged
/// and, when a hook is installed, reported to it.
pub(crate) struct Dispatcher {
    transport: Arc<dyn HttpTransport>,
    logger: RwLock<Logger>,
    hook: RwLock<Option<DeliveryHook>>,
}

impl Dispatcher {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            transport,
            logger: RwLock::new(LOGGER.clone()),
            hook: RwLock::new(None),
        }
    }

    pub fn set_logger(&self, logger: Logger) {
        *self.logger.write().unwrap_or_else(|p| p.into_inner()) = logger;
    }

    pub fn logger(&self) -> Logger {
        self.logger.read().unwrap_or_else(|p| p.into_inner()).clone()
    }

    pub fn set_hook(&self, hook: Option<DeliveryHook>) {
        *self.hook.write().unwrap_or_else(|p| p.into_inner()) = hook;
    }

    pub async fn dispatch(&self, events: &[Event], api_key: &str, api_url: &str) -> DeliveryOutcome {
        let logger = self.logger();
        let payload = match serde_json::to_value(DispatchPayload { api_key, events }) {
            Ok(payload) => payload,
            Err(err) => {
                let outcome = DeliveryOutcome::TransportFailed {
                    message: format!("failed to serialize analytics payload: {err}"),
                };
                logger.critical_with_context(
                    "Analytics payload could not be serialized",
                    json!({ "url": api_url, "error": err.to_string() }),
                );
                self.notify(api_url, events.len(), Value::Null, &outcome);
                return outcome;
            }
        };
        let body = payload.to_string();

        let mut headers = BTreeMap::new();
        headers.insert("Content-Type".to_string(), "application/json".to_string());

        let outcome = match self.transport.post(api_url, &body, &headers).await {
            Err(err) => {
                logger.critical_with_context(
                    format!("Unable to reach analytics endpoint {api_url}: {err}"),
                    json!({ "url": api_url, "payload": payload }),
                );
                DeliveryOutcome::TransportFailed {
                    message: err.to_string(),
                }
            }
            Ok(response) if response.is_success() => {
                logger.info_with_context(
                    format!("Analytics events delivered: {}", response.body),
                    json!({ "status": response.status, "payload": payload }),
                );
                DeliveryOutcome::Delivered {
                    status: response.status,
                    body: response.body,
                }
            }
            Ok(response) => {
                logger.error_with_context(
                    format!(
                        "Analytics endpoint rejected events with status {}: {}",
                        response.status, response.body
                    ),
                    json!({
                        "status": response.status,
                        "body": response.body,
                        "payload": payload,
                    }),
                );
                DeliveryOutcome::Rejected {
                    status: response.status,
                    body: response.body,
                }
            }
        };

        self.notify(api_url, events.len(), payload, &outcome);
        outcome
    }

    fn notify(&self, url: &str, event_count: usize, payload: Value, outcome: &DeliveryOutcome) {
        let hook = self.hook.read().unwrap_or_else(|p| p.into_inner()).clone();
        if let Some(hook) = hook {
            hook(&DeliveryReport {
                url: url.to_string(),
                event_count,
                payload,
                outcome: outcome.clone(),
            });
        }
    }
}
