use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use crate::analytics::config::{validate_api_url, AnalyticsOptions};
use crate::analytics::error::{configuration_error, validation_error, AnalyticsResult};
use crate::analytics::event::Event;
use crate::analytics::logger::Logger;
use crate::analytics::queue::EventQueue;
use crate::analytics::session::SessionState;
use crate::analytics::transport::{DeliveryHook, Dispatcher, HttpTransport, ReqwestTransport};
use crate::analytics::value::Properties;

/// Analytics client: builds events, merges session defaults and sends or queues them.
///
/// The client keeps one in-progress event. Calls such as [`Analytics::update_event`] shape it,
/// and [`Analytics::log_event`] or [`Analytics::queue_event`] finish it. After an event is sent,
/// queued or reset, the next access starts a fresh one.
///
/// Cloning is cheap and every clone shares the same state.
#[derive(Clone)]
pub struct Analytics {
    inner: Arc<AnalyticsInner>,
}

impl fmt::Debug for Analytics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Analytics")
            .field("initialized", &self.is_initialized())
            .field("api_url", &self.api_url())
            .field("queued_events", &self.inner.queue.len())
            .finish()
    }
}

struct AnalyticsInner {
    current_event: Mutex<Option<Event>>,
    session: Mutex<SessionState>,
    queue: EventQueue,
    opt_out: AtomicBool,
    dispatcher: Dispatcher,
}

/// Replacement applied by [`Analytics::event`] to the in-progress event.
#[derive(Clone, Debug, PartialEq)]
pub enum EventUpdate {
    /// Discard the current event and use this one instead.
    Replace(Event),
    /// Merge these entries into the current event's properties.
    Properties(Properties),
}

impl From<Event> for EventUpdate {
    fn from(event: Event) -> Self {
        EventUpdate::Replace(event)
    }
}

impl From<Properties> for EventUpdate {
    fn from(properties: Properties) -> Self {
        EventUpdate::Properties(properties)
    }
}

impl Analytics {
    /// Creates a client that posts through `reqwest`.
    pub fn new(options: AnalyticsOptions) -> AnalyticsResult<Self> {
        let transport = ReqwestTransport::new(options.resolved_timeout())?;
        Ok(Self::with_transport(options, Arc::new(transport)))
    }

    /// Creates a client that posts through a caller supplied transport.
    pub fn with_transport(options: AnalyticsOptions, transport: Arc<dyn HttpTransport>) -> Self {
        let session = SessionState {
            api_key: options.api_key.clone().unwrap_or_default(),
            api_url: options.resolved_api_url(),
            ..Default::default()
        };
        let inner = AnalyticsInner {
            current_event: Mutex::new(None),
            session: Mutex::new(session),
            queue: EventQueue::new(),
            opt_out: AtomicBool::new(false),
            dispatcher: Dispatcher::new(transport),
        };
        Self {
            inner: Arc::new(inner),
        }
    }

    /// Supplies the API key, and optionally a user id, after construction.
    pub fn init(&self, api_key: impl Into<String>, user_id: Option<String>) -> &Self {
        let mut session = self.session();
        session.api_key = api_key.into();
        if user_id.is_some() {
            session.user_id = user_id;
        }
        self
    }

    pub fn is_initialized(&self) -> bool {
        self.session().is_initialized()
    }

    pub fn api_key(&self) -> String {
        self.session().api_key.clone()
    }

    pub fn api_url(&self) -> String {
        self.session().api_url.clone()
    }

    pub fn set_api_url(&self, api_url: impl Into<String>) -> AnalyticsResult<()> {
        let api_url = validate_api_url(api_url.into())?;
        self.session().api_url = api_url;
        Ok(())
    }

    /// Routes delivery logs to `logger` instead of the shared analytics logger.
    pub fn set_logger(&self, logger: Logger) {
        self.inner.dispatcher.set_logger(logger);
    }

    pub fn logger(&self) -> Logger {
        self.inner.dispatcher.logger()
    }

    /// Installs a callback that observes every dispatch outcome. Delivery failures are still
    /// never returned as errors.
    pub fn set_delivery_hook<F>(&self, hook: F)
    where
        F: Fn(&crate::analytics::DeliveryReport) + Send + Sync + 'static,
    {
        self.inner
            .dispatcher
            .set_hook(Some(Arc::new(hook) as DeliveryHook));
    }

    pub fn clear_delivery_hook(&self) {
        self.inner.dispatcher.set_hook(None);
    }

    /// Materializes the in-progress event if none exists yet.
    pub fn ensure_current_event(&self) {
        self.current_event().get_or_insert_with(Event::default);
    }

    /// Returns a snapshot of the in-progress event after applying `update`.
    ///
    /// No validation happens here; it is deferred until the event is queued or sent.
    pub fn event(&self, update: Option<EventUpdate>) -> Event {
        let mut current = self.current_event();
        let event = current.get_or_insert_with(Event::default);
        match update {
            Some(EventUpdate::Replace(replacement)) => *event = replacement,
            Some(EventUpdate::Properties(properties)) => {
                event.set_properties(properties);
            }
            None => {}
        }
        event.clone()
    }

    /// Mutates the in-progress event in place.
    pub fn update_event<F>(&self, f: F)
    where
        F: FnOnce(&mut Event),
    {
        let mut current = self.current_event();
        f(current.get_or_insert_with(Event::default));
    }

    /// Abandons the in-progress event.
    pub fn reset_event(&self) {
        self.current_event().take();
    }

    /// Merges session identity and pending user properties into the in-progress event.
    pub fn set_persistent_event_data(&self) {
        let mut current = self.current_event();
        let event = current.get_or_insert_with(Event::default);
        self.session().apply_to(event);
    }

    /// Sends the in-progress event immediately, merged with `event_type`, `properties` and the
    /// session state.
    ///
    /// Returns a configuration error without an API key and a validation error when the event
    /// has no type or no user/device id. Network failures are logged, not returned. Does
    /// nothing when the client is opted out.
    pub async fn log_event(&self, event_type: &str, properties: Properties) -> AnalyticsResult<()> {
        if self.opt_out() {
            return Ok(());
        }

        let (event, api_key, api_url) = {
            let mut current = self.current_event();
            let mut session = self.session();
            if !session.is_initialized() {
                return Err(configuration_error(
                    "API key must be set before events can be sent",
                ));
            }

            let event = current.get_or_insert_with(Event::default);
            merge_into(event, event_type, properties);
            session.apply_to(event);
            validate_event_type(event)?;
            if !event.has_identity() {
                return Err(validation_error(
                    "Either user_id or device_id must be set before an event can be sent",
                ));
            }

            let event = current.take().unwrap_or_default();
            (event, session.api_key.clone(), session.api_url.clone())
        };

        self.inner
            .dispatcher
            .dispatch(std::slice::from_ref(&event), &api_key, &api_url)
            .await;
        Ok(())
    }

    /// Appends the in-progress event, merged with `event_type` and `properties`, to the queue.
    ///
    /// Identity is not required here; session identity is applied when the queue is flushed.
    /// Does nothing when the client is opted out.
    pub fn queue_event(&self, event_type: &str, properties: Properties) -> AnalyticsResult<()> {
        if self.opt_out() {
            return Ok(());
        }

        let mut current = self.current_event();
        let event = current.get_or_insert_with(Event::default);
        merge_into(event, event_type, properties);
        validate_event_type(event)?;

        let event = current.take().unwrap_or_default();
        self.inner.queue.push(event);
        Ok(())
    }

    /// Sends every queued event as one batch and empties the queue.
    ///
    /// Session identity is applied to each queued event. Pending session user properties are
    /// not: they only ride along with events sent through [`Analytics::log_event`].
    pub async fn log_queued_events(&self) -> AnalyticsResult<()> {
        if self.inner.queue.is_empty() {
            return Ok(());
        }

        let (batch, api_key, api_url) = {
            let session = self.session();
            if !session.is_initialized() {
                return Err(configuration_error(
                    "API key must be set before queued events can be sent",
                ));
            }
            let mut batch = self.inner.queue.drain();
            for event in &mut batch {
                session.apply_identity(event);
            }
            (batch, session.api_key.clone(), session.api_url.clone())
        };
        if batch.is_empty() {
            return Ok(());
        }

        let anonymous = batch.iter().filter(|event| !event.has_identity()).count();
        if anonymous > 0 {
            self.logger().warn(format!(
                "Flushing {anonymous} queued event(s) without user_id or device_id"
            ));
        }

        self.inner.dispatcher.dispatch(&batch, &api_key, &api_url).await;
        Ok(())
    }

    pub fn has_queued_events(&self) -> bool {
        !self.inner.queue.is_empty()
    }

    pub fn queued_event_count(&self) -> usize {
        self.inner.queue.len()
    }

    pub fn queued_events(&self) -> Vec<Event> {
        self.inner.queue.snapshot()
    }

    /// Drops every queued event without sending it.
    pub fn reset_queue(&self) {
        self.inner.queue.clear();
    }

    pub fn set_user_id(&self, user_id: impl Into<String>) -> &Self {
        self.session().user_id = Some(user_id.into());
        self
    }

    pub fn user_id(&self) -> Option<String> {
        self.session().user_id.clone()
    }

    pub fn set_device_id(&self, device_id: impl Into<String>) -> &Self {
        self.session().device_id = Some(device_id.into());
        self
    }

    pub fn device_id(&self) -> Option<String> {
        self.session().device_id.clone()
    }

    /// Merges `properties` into the pending user properties. They are attached to the next
    /// event sent with [`Analytics::log_event`] and then cleared.
    pub fn set_user_properties(&self, properties: Properties) -> &Self {
        self.session().user_properties.extend(properties);
        self
    }

    pub fn user_properties(&self) -> Properties {
        self.session().user_properties.clone()
    }

    pub fn reset_user_properties(&self) -> &Self {
        self.session().user_properties.clear();
        self
    }

    /// Forgets the user id, device id and pending user properties.
    pub fn reset_user(&self) -> &Self {
        self.session().reset_user();
        self
    }

    /// While opted out, logging and queueing calls succeed without recording anything.
    pub fn set_opt_out(&self, opt_out: bool) -> &Self {
        self.inner.opt_out.store(opt_out, Ordering::SeqCst);
        self
    }

    pub fn opt_out(&self) -> bool {
        self.inner.opt_out.load(Ordering::SeqCst)
    }

    fn current_event(&self) -> MutexGuard<'_, Option<Event>> {
        self.inner
            .current_event
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
    }

    fn session(&self) -> MutexGuard<'_, SessionState> {
        self.inner
            .session
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
    }
}

fn merge_into(event: &mut Event, event_type: &str, properties: Properties) {
    if !event_type.is_empty() {
        event.set_event_type(event_type);
    }
    event.set_properties(properties);
}

fn validate_event_type(event: &Event) -> AnalyticsResult<()> {
    if event.event_type().is_empty() {
        return Err(validation_error("Event type must not be empty"));
    }
    Ok(())
}
