use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use amplitude_rs_sdk::analytics::{
    get_instance, properties, Analytics, AnalyticsOptions, DeliveryReport, HttpTransport,
    InstanceRegistry, Properties, TransportError, TransportResponse,
};
use amplitude_rs_sdk::logger::{LogLevel, Logger};
use async_trait::async_trait;
use serde_json::{json, Value};

#[derive(Clone, Default)]
struct CapturingTransport {
    bodies: Arc<Mutex<Vec<Value>>>,
}

#[async_trait]
impl HttpTransport for CapturingTransport {
    async fn post(
        &self,
        _url: &str,
        body: &str,
        _headers: &BTreeMap<String, String>,
    ) -> Result<TransportResponse, TransportError> {
        self.bodies
            .lock()
            .unwrap()
            .push(serde_json::from_str(body).unwrap());
        Ok(TransportResponse::new(200, "{\"code\":200}"))
    }
}

fn client(api_key: &str) -> (Analytics, CapturingTransport) {
    let transport = CapturingTransport::default();
    let analytics =
        Analytics::with_transport(AnalyticsOptions::new(api_key), Arc::new(transport.clone()));
    (analytics, transport)
}

#[tokio::test(flavor = "current_thread")]
async fn queued_events_flush_as_one_batch_with_session_identity() {
    let (analytics, transport) = client("K");
    analytics.set_user_id("u1");

    analytics
        .queue_event("signup", properties([("plan", "pro")]))
        .unwrap();
    analytics.queue_event("login", Properties::new()).unwrap();
    analytics.log_queued_events().await.unwrap();

    let bodies = transport.bodies.lock().unwrap().clone();
    assert_eq!(bodies.len(), 1);
    assert_eq!(
        bodies[0],
        json!({
            "api_key": "K",
            "events": [
                {
                    "event_type": "signup",
                    "user_id": "u1",
                    "event_properties": {"plan": "pro"},
                    "user_properties": {},
                },
                {
                    "event_type": "login",
                    "user_id": "u1",
                    "event_properties": {},
                    "user_properties": {},
                },
            ],
        })
    );
    assert!(!analytics.has_queued_events());
}

#[tokio::test(flavor = "current_thread")]
async fn delivery_outcomes_reach_logger_and_hook() {
    let (analytics, _transport) = client("K");
    let logger = Logger::new("@amplitude/integration");
    let levels = Arc::new(Mutex::new(Vec::new()));
    let level_sink = Arc::clone(&levels);
    logger.set_log_handler(move |_, record| level_sink.lock().unwrap().push(record.level));
    analytics.set_logger(logger);

    let reports = Arc::new(Mutex::new(0usize));
    let report_sink = Arc::clone(&reports);
    analytics.set_delivery_hook(move |report: &DeliveryReport| {
        assert!(report.outcome.is_delivered());
        *report_sink.lock().unwrap() += report.event_count;
    });

    analytics.set_device_id("device-9");
    analytics
        .log_event("app_open", properties([("cold_start", true)]))
        .await
        .unwrap();

    assert_eq!(levels.lock().unwrap().as_slice(), &[LogLevel::Info]);
    assert_eq!(*reports.lock().unwrap(), 1);
}

#[test]
fn registry_hands_out_shared_named_clients() {
    let registry = InstanceRegistry::with_transport_factory(|| {
        Arc::new(CapturingTransport::default()) as Arc<dyn HttpTransport>
    });
    let a = registry.get("mobile");
    a.init("K", Some("u1".into()));
    assert_eq!(registry.get("mobile").user_id().as_deref(), Some("u1"));
    assert!(!registry.get("web").is_initialized());

    assert!(Arc::ptr_eq(
        &get_instance(Some("integration")),
        &get_instance(Some("integration"))
    ));
}
