//! Sends a single event straight to the collection endpoint.
//! Set `AMPLITUDE_API_KEY` (and optionally `AMPLITUDE_API_URL`) before running.

use amplitude_rs_sdk::analytics::{properties, Analytics, AnalyticsOptions};
use amplitude_rs_sdk::logger::{set_user_log_handler_fn, LogCallbackParams};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let analytics = Analytics::new(AnalyticsOptions::from_env()?)?;

    set_user_log_handler_fn(
        Some(|params: LogCallbackParams| {
            println!("[{}] {}", params.level_label(), params.message);
        }),
        None,
    );

    analytics.set_user_id("example-user");
    analytics.set_user_properties(properties([("plan", "pro")]));
    analytics
        .log_event("button_click", properties([("button", "subscribe")]))
        .await?;

    Ok(())
}
