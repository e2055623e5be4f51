use std::sync::Arc;

use crate::analytics::{Analytics, AnalyticsOptions};
use crate::test_support::transport::RecordingTransport;

/// Build an initialized client wired to a fresh [`RecordingTransport`].
///
/// Each call returns an independent client so tests stay isolated from the shared registry.
pub fn test_analytics_with_api_key(api_key: impl Into<String>) -> (Analytics, RecordingTransport) {
    let transport = RecordingTransport::default();
    let analytics = Analytics::with_transport(
        AnalyticsOptions::new(api_key),
        Arc::new(transport.clone()),
    );
    (analytics, transport)
}
