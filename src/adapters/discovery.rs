use crate::domain::ports::{RestService, ServiceDiscovery};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Discovery backed by an explicit namespace table.
///
/// A namespace also covers its dotted sub-namespaces: `shop` finds services
/// registered under `shop` and `shop.orders`, but not `shopping`.
#[derive(Clone, Default)]
pub struct StaticDiscovery {
    namespaces: BTreeMap<String, Vec<Arc<dyn RestService>>>,
}

impl StaticDiscovery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn service(self, namespace: impl Into<String>, service: impl RestService + 'static) -> Self {
        self.shared(namespace, Arc::new(service))
    }

    pub fn shared(mut self, namespace: impl Into<String>, service: Arc<dyn RestService>) -> Self {
        self.namespaces
            .entry(namespace.into())
            .or_default()
            .push(service);
        self
    }

    /// Canonical names of every registered service, in namespace order.
    pub fn service_names(&self) -> Vec<String> {
        self.namespaces
            .values()
            .flatten()
            .map(|service| service.definition().canonical_name)
            .collect()
    }
}

impl ServiceDiscovery for StaticDiscovery {
    fn discover(&self, namespace: &str) -> Vec<Arc<dyn RestService>> {
        let nested = format!("{}.", namespace);
        self.namespaces
            .iter()
            .filter(|(name, _)| name.as_str() == namespace || name.starts_with(&nested))
            .flat_map(|(_, services)| services.iter().cloned())
            .collect()
    }
}

impl std::fmt::Debug for StaticDiscovery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticDiscovery")
            .field("services", &self.service_names())
            .finish()
    }
}
