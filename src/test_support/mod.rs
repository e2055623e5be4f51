//! Test utilities shared across crate-level unit tests.

pub mod analytics;
pub mod http;
pub mod transport;

pub use analytics::test_analytics_with_api_key;
pub use http::start_mock_server;
pub use transport::{RecordedRequest, RecordingTransport};
