//! Queues events before the user is known, then flushes them once identity is available.

use amplitude_rs_sdk::analytics::{get_instance, properties, Properties};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let analytics = get_instance(None);

    analytics.queue_event("page_view", properties([("path", "/pricing")]))?;
    analytics.queue_event("signup_started", Properties::new())?;

    let api_key = std::env::var("AMPLITUDE_API_KEY").unwrap_or_default();
    analytics.init(api_key, Some("late-bound-user".to_string()));

    analytics.set_delivery_hook(|report| {
        println!("{} event(s): {:?}", report.event_count, report.outcome);
    });
    analytics.log_queued_events().await?;

    Ok(())
}
