pub mod client;
pub mod coercion;
pub mod registry;
pub mod server;
pub mod ssl;
pub mod template;
pub mod transport;

pub use crate::domain::model::{Reply, ServiceDefinition, Value, ValueKind};
pub use crate::domain::ports::{ResponseHandler, RestService, ServiceDiscovery};
pub use crate::utils::error::Result;
