mod api;
mod config;
pub mod constants;
pub mod error;
mod event;
mod logger;
mod queue;
mod registry;
mod session;
mod transport;
mod value;

pub use api::{Analytics, EventUpdate};
pub use config::AnalyticsOptions;
pub use event::Event;
pub use logger::LOGGER;
pub use registry::{get_instance, InstanceRegistry};
pub use transport::{
    DeliveryHook, DeliveryOutcome, DeliveryReport, HttpTransport, ReqwestTransport,
    TransportError, TransportResponse,
};
pub use value::{properties, Properties, PropertyValue};
