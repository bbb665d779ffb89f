pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;
pub use config::TomlConfig;

pub use adapters::{StaticDiscovery, StatusService};
pub use core::client::RestConnection;
pub use core::registry::{RegistryConfig, RouteRegistry};
pub use core::server::{LifecycleState, RestServer, ServerConfig, ServerHandle};
pub use core::ssl::{HttpVersion, SslConfig};
pub use domain::model::{
    Absence, HttpVerb, MediaType, Operation, Reply, ServiceDefinition, Value, ValueKind,
};
pub use domain::ports::{ResponseHandler, RestService, ServiceDiscovery};
pub use utils::error::{RestError, Result};
