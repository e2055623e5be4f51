use std::time::Duration;

pub const ANALYTICS_LOGGER_NAME: &str = "@amplitude/analytics";

/// Amplitude HTTP API v2 collection endpoint.
pub const DEFAULT_API_URL: &str = "https://api2.amplitude.com/2/httpapi";

pub const DEFAULT_INSTANCE_NAME: &str = "default";

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub const API_KEY_ENV: &str = "AMPLITUDE_API_KEY";
pub const API_URL_ENV: &str = "AMPLITUDE_API_URL";
pub const TIMEOUT_MS_ENV: &str = "AMPLITUDE_TIMEOUT_MS";
