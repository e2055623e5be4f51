use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::analytics::value::{Properties, PropertyValue};

/// One analytics fact: what happened, to whom, and with which properties.
///
/// Events are plain data. Validation happens when the client queues or sends them, so an event
/// may be built up over several calls before it is complete. The serialized form is the wire
/// representation expected by the HTTP API.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Event {
    #[serde(default)]
    event_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    device_id: Option<String>,
    #[serde(default)]
    event_properties: Properties,
    #[serde(default)]
    user_properties: Properties,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    time: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    insert_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    session_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    app_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    platform: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    os_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    ip: Option<String>,
}

impl Event {
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            ..Default::default()
        }
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn set_event_type(&mut self, event_type: impl Into<String>) -> &mut Self {
        self.event_type = event_type.into();
        self
    }

    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    pub fn set_user_id(&mut self, user_id: impl Into<String>) -> &mut Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn device_id(&self) -> Option<&str> {
        self.device_id.as_deref()
    }

    pub fn set_device_id(&mut self, device_id: impl Into<String>) -> &mut Self {
        self.device_id = Some(device_id.into());
        self
    }

    /// True when a non-empty user id or device id is present.
    pub fn has_identity(&self) -> bool {
        non_empty(self.user_id.as_deref()) || non_empty(self.device_id.as_deref())
    }

    pub fn properties(&self) -> &Properties {
        &self.event_properties
    }

    /// Merges `properties` into the event properties, overwriting keys already present.
    pub fn set_properties(&mut self, properties: Properties) -> &mut Self {
        self.event_properties.extend(properties);
        self
    }

    pub fn set_property(
        &mut self,
        key: impl Into<String>,
        value: impl Into<PropertyValue>,
    ) -> &mut Self {
        self.event_properties.insert(key.into(), value.into());
        self
    }

    pub fn remove_property(&mut self, key: &str) -> Option<PropertyValue> {
        self.event_properties.remove(key)
    }

    pub fn user_properties(&self) -> &Properties {
        &self.user_properties
    }

    /// Merges `properties` into the user properties, overwriting keys already present.
    pub fn set_user_properties(&mut self, properties: Properties) -> &mut Self {
        self.user_properties.extend(properties);
        self
    }

    /// Event time in milliseconds since the Unix epoch. When unset the collector stamps the
    /// upload time.
    pub fn time(&self) -> Option<i64> {
        self.time
    }

    pub fn set_time(&mut self, time: DateTime<Utc>) -> &mut Self {
        self.time = Some(time.timestamp_millis());
        self
    }

    pub fn stamp_time_now(&mut self) -> &mut Self {
        self.set_time(Utc::now())
    }

    pub fn insert_id(&self) -> Option<&str> {
        self.insert_id.as_deref()
    }

    pub fn set_insert_id(&mut self, insert_id: impl Into<String>) -> &mut Self {
        self.insert_id = Some(insert_id.into());
        self
    }

    pub fn session_id(&self) -> Option<i64> {
        self.session_id
    }

    /// Session start time in milliseconds since the Unix epoch.
    pub fn set_session_id(&mut self, session_id: i64) -> &mut Self {
        self.session_id = Some(session_id);
        self
    }

    pub fn app_version(&self) -> Option<&str> {
        self.app_version.as_deref()
    }

    pub fn set_app_version(&mut self, app_version: impl Into<String>) -> &mut Self {
        self.app_version = Some(app_version.into());
        self
    }

    pub fn platform(&self) -> Option<&str> {
        self.platform.as_deref()
    }

    pub fn set_platform(&mut self, platform: impl Into<String>) -> &mut Self {
        self.platform = Some(platform.into());
        self
    }

    pub fn os_name(&self) -> Option<&str> {
        self.os_name.as_deref()
    }

    pub fn set_os_name(&mut self, os_name: impl Into<String>) -> &mut Self {
        self.os_name = Some(os_name.into());
        self
    }

    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }

    pub fn set_language(&mut self, language: impl Into<String>) -> &mut Self {
        self.language = Some(language.into());
        self
    }

    pub fn ip(&self) -> Option<&str> {
        self.ip.as_deref()
    }

    pub fn set_ip(&mut self, ip: impl Into<String>) -> &mut Self {
        self.ip = Some(ip.into());
        self
    }
}

fn non_empty(value: Option<&str>) -> bool {
    value.is_some_and(|value| !value.is_empty())
}
