use crate::domain::model::{RawResponse, Reply, ServiceDefinition, Value, ValueKind};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// Decodes responses whose media type is not textual.
pub trait ResponseHandler: Send + Sync {
    fn decode(&self, response: RawResponse, kind: ValueKind) -> Reply;
}

/// A server-side service implementation.
///
/// `invoke` receives the path parameters of the matched route in template
/// order.
#[async_trait]
pub trait RestService: Send + Sync {
    fn definition(&self) -> ServiceDefinition;

    async fn invoke(&self, operation: &str, args: Vec<String>) -> Result<Value>;
}

/// Enumerates the candidate services of a namespace.
pub trait ServiceDiscovery: Send + Sync {
    fn discover(&self, namespace: &str) -> Vec<Arc<dyn RestService>>;
}
