use crate::analytics::constants::DEFAULT_API_URL;
use crate::analytics::event::Event;
use crate::analytics::value::Properties;

/// Cross-event defaults owned by one analytics client.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct SessionState {
    pub api_key: String,
    pub api_url: String,
    pub user_id: Option<String>,
    pub device_id: Option<String>,
    pub user_properties: Properties,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_url: DEFAULT_API_URL.to_string(),
            user_id: None,
            device_id: None,
            user_properties: Properties::new(),
        }
    }
}

impl SessionState {
    pub fn is_initialized(&self) -> bool {
        !self.api_key.is_empty()
    }

    /// Session identifiers win over whatever the event carries.
    pub fn apply_identity(&self, event: &mut Event) {
        if let Some(user_id) = self.user_id.as_deref().filter(|id| !id.is_empty()) {
            event.set_user_id(user_id);
        }
        if let Some(device_id) = self.device_id.as_deref().filter(|id| !id.is_empty()) {
            event.set_device_id(device_id);
        }
    }

    /// Applies identity and hands pending user properties to `event`. The pending map is
    /// consumed, so it reaches at most one event.
    pub fn apply_to(&mut self, event: &mut Event) {
        self.apply_identity(event);
        if !self.user_properties.is_empty() {
            event.set_user_properties(std::mem::take(&mut self.user_properties));
        }
    }

    pub fn reset_user(&mut self) {
        self.user_id = None;
        self.device_id = None;
        self.user_properties.clear();
    }
}
