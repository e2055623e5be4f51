//! Named directory of shared analytics clients.
//!
//! Call sites that cannot pass a client around can look one up by name. The first lookup for a
//! name creates a client with default options; every later lookup returns that same client for
//! the rest of the process.

use std::collections::HashMap;
use std::sync::{Arc, LazyLock, Mutex, MutexGuard};

use crate::analytics::api::Analytics;
use crate::analytics::config::AnalyticsOptions;
use crate::analytics::constants::DEFAULT_INSTANCE_NAME;
use crate::analytics::transport::{HttpTransport, ReqwestTransport};

type TransportFactory = Arc<dyn Fn() -> Arc<dyn HttpTransport> + Send + Sync>;

pub struct InstanceRegistry {
    instances: Mutex<HashMap<String, Arc<Analytics>>>,
    transport_factory: TransportFactory,
}

impl Default for InstanceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl InstanceRegistry {
    /// Registry whose clients post through `reqwest` with the default timeout.
    pub fn new() -> Self {
        Self::with_transport_factory(|| {
            let options = AnalyticsOptions::default();
            match ReqwestTransport::new(options.resolved_timeout()) {
                Ok(transport) => Arc::new(transport) as Arc<dyn HttpTransport>,
                Err(err) => {
                    log::debug!("falling back to default reqwest client: {err}");
                    Arc::new(ReqwestTransport::with_client(reqwest::Client::new()))
                }
            }
        })
    }

    /// Registry whose clients post through transports produced by `factory`.
    pub fn with_transport_factory<F>(factory: F) -> Self
    where
        F: Fn() -> Arc<dyn HttpTransport> + Send + Sync + 'static,
    {
        Self {
            instances: Mutex::new(HashMap::new()),
            transport_factory: Arc::new(factory),
        }
    }

    /// The process-wide registry.
    pub fn shared() -> &'static InstanceRegistry {
        static INSTANCE: LazyLock<InstanceRegistry> = LazyLock::new(InstanceRegistry::new);
        &INSTANCE
    }

    fn guard(&self) -> MutexGuard<'_, HashMap<String, Arc<Analytics>>> {
        self.instances
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
    }

    /// Returns the client registered under `name`, creating it on first use.
    pub fn get(&self, name: &str) -> Arc<Analytics> {
        let mut instances = self.guard();
        if let Some(existing) = instances.get(name) {
            return Arc::clone(existing);
        }
        log::debug!("creating analytics instance `{name}`");
        let analytics = Arc::new(Analytics::with_transport(
            AnalyticsOptions::default(),
            (self.transport_factory)(),
        ));
        instances.insert(name.to_string(), Arc::clone(&analytics));
        analytics
    }

    pub fn get_default(&self) -> Arc<Analytics> {
        self.get(DEFAULT_INSTANCE_NAME)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.guard().contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.guard().keys().cloned().collect();
        names.sort();
        names
    }
}

/// Looks up `name` (or `"default"`) in the process-wide registry.
pub fn get_instance(name: Option<&str>) -> Arc<Analytics> {
    InstanceRegistry::shared().get(name.unwrap_or(DEFAULT_INSTANCE_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::RecordingTransport;
    use std::thread;

    fn recording_registry() -> InstanceRegistry {
        InstanceRegistry::with_transport_factory(|| Arc::new(RecordingTransport::default()))
    }

    #[test]
    fn same_name_returns_same_instance() {
        let registry = recording_registry();
        let first = registry.get("x");
        let second = registry.get("x");
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn different_names_have_independent_state() {
        let registry = recording_registry();
        let x = registry.get("x");
        let y = registry.get("y");
        assert!(!Arc::ptr_eq(&x, &y));

        x.set_user_id("only-x");
        assert_eq!(y.user_id(), None);
        assert_eq!(registry.names(), ["x", "y"]);
    }

    #[test]
    fn instances_start_uninitialized() {
        let registry = recording_registry();
        let analytics = registry.get_default();
        assert!(!analytics.is_initialized());
        assert!(registry.contains(DEFAULT_INSTANCE_NAME));
    }

    #[test]
    fn concurrent_first_access_creates_one_instance() {
        let registry = Arc::new(recording_registry());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                thread::spawn(move || registry.get("racy"))
            })
            .collect();
        let instances: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert!(instances.windows(2).all(|pair| Arc::ptr_eq(&pair[0], &pair[1])));
    }

    #[test]
    fn shared_registry_is_process_wide() {
        let first = get_instance(Some("registry-shared-test"));
        let second = InstanceRegistry::shared().get("registry-shared-test");
        assert!(Arc::ptr_eq(&first, &second));
        assert!(Arc::ptr_eq(&get_instance(None), &get_instance(Some("default"))));
    }
}
