use std::env;
use std::time::Duration;

use url::Url;

use crate::analytics::constants::{
    API_KEY_ENV, API_URL_ENV, DEFAULT_API_URL, DEFAULT_REQUEST_TIMEOUT, TIMEOUT_MS_ENV,
};
use crate::analytics::error::{configuration_error, AnalyticsResult};

/// Settings used to construct an [`Analytics`](crate::analytics::Analytics) client.
///
/// Every field is optional. A client built from `AnalyticsOptions::default()` is not yet
/// initialized: it can queue events but cannot send them until an API key is supplied through
/// [`Analytics::init`](crate::analytics::Analytics::init).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AnalyticsOptions {
    pub api_key: Option<String>,
    pub api_url: Option<String>,
    pub timeout: Option<Duration>,
}

impl AnalyticsOptions {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            ..Default::default()
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Overrides the collection endpoint. The URL must be absolute http(s).
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> AnalyticsResult<Self> {
        self.api_url = Some(validate_api_url(api_url.into())?);
        Ok(self)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Reads `AMPLITUDE_API_KEY`, `AMPLITUDE_API_URL` and `AMPLITUDE_TIMEOUT_MS`.
    pub fn from_env() -> AnalyticsResult<Self> {
        let mut options = Self::default();
        if let Ok(api_key) = env::var(API_KEY_ENV) {
            options.api_key = Some(api_key);
        }
        if let Ok(api_url) = env::var(API_URL_ENV) {
            options = options.with_api_url(api_url)?;
        }
        if let Ok(raw) = env::var(TIMEOUT_MS_ENV) {
            let millis = raw.trim().parse::<u64>().map_err(|err| {
                configuration_error(format!("{TIMEOUT_MS_ENV} must be a number of milliseconds: {err}"))
            })?;
            options.timeout = Some(Duration::from_millis(millis));
        }
        Ok(options)
    }

    pub(crate) fn resolved_api_url(&self) -> String {
        self.api_url
            .clone()
            .unwrap_or_else(|| DEFAULT_API_URL.to_string())
    }

    pub(crate) fn resolved_timeout(&self) -> Duration {
        self.timeout.unwrap_or(DEFAULT_REQUEST_TIMEOUT)
    }
}

pub(crate) fn validate_api_url(api_url: String) -> AnalyticsResult<String> {
    let parsed = Url::parse(&api_url)
        .map_err(|err| configuration_error(format!("invalid API URL `{api_url}`: {err}")))?;
    match parsed.scheme() {
        "http" | "https" => Ok(api_url),
        scheme => Err(configuration_error(format!(
            "API URL must use http or https, got `{scheme}`"
        ))),
    }
}
