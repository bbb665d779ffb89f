use crate::domain::model::{normalize_path, EndpointRecord, ServiceDefinition, ServiceDescriptor};
use crate::core::template;
use crate::domain::ports::RestService;
use crate::utils::error::{RestError, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Controls which diagnostics are written to the log. Diagnostics are
/// recorded either way.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryConfig {
    #[serde(default = "enabled")]
    pub warnings_enabled: bool,
    #[serde(default = "enabled")]
    pub debug_enabled: bool,
    #[serde(default = "enabled")]
    pub check_base_path: bool,
}

fn enabled() -> bool {
    true
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            warnings_enabled: true,
            debug_enabled: true,
            check_base_path: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// Operation has a path but no HTTP verb.
    MissingVerb,
    /// Non-void operation without produced media type.
    MissingProducedType,
    /// Service without any path-carrying operation.
    NoCompatibleOperations,
    /// Placeholder followed by literal text in the same path segment.
    UnroutableTemplate,
    Reachable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub service: String,
    pub operation: Option<String>,
    pub message: String,
}

impl Diagnostic {
    pub fn is_warning(&self) -> bool {
        self.kind != DiagnosticKind::Reachable
    }
}

/// Validates service definitions and collects the reachable endpoints.
#[derive(Debug, Default)]
pub struct RouteRegistry {
    config: RegistryConfig,
    descriptors: Vec<ServiceDescriptor>,
    endpoints: Vec<EndpointRecord>,
    diagnostics: Vec<Diagnostic>,
}

impl RouteRegistry {
    pub fn new(config: RegistryConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    /// Registers every candidate. A candidate without base path aborts the
    /// whole registration and leaves the registry as it was.
    pub fn register(&mut self, candidates: &[Arc<dyn RestService>]) -> Result<Vec<ServiceDescriptor>> {
        let marks = (
            self.descriptors.len(),
            self.endpoints.len(),
            self.diagnostics.len(),
        );

        let mut registered = Vec::new();
        for candidate in candidates {
            match self.register_definition(&candidate.definition()) {
                Ok(Some(descriptor)) => registered.push(descriptor),
                Ok(None) => {}
                Err(e) => {
                    self.descriptors.truncate(marks.0);
                    self.endpoints.truncate(marks.1);
                    self.diagnostics.truncate(marks.2);
                    return Err(e);
                }
            }
        }
        Ok(registered)
    }

    /// Returns `None` for deprecated services, which are skipped silently.
    pub fn register_definition(
        &mut self,
        definition: &ServiceDefinition,
    ) -> Result<Option<ServiceDescriptor>> {
        let name = &definition.canonical_name;

        if definition.deprecated {
            tracing::debug!("Service '{}' skipped: deprecated", name);
            return Ok(None);
        }

        let base_path = match (&definition.base_path, self.config.check_base_path) {
            (Some(path), _) => normalize_path(path),
            (None, false) => String::new(),
            (None, true) => {
                return Err(RestError::MissingBasePath {
                    service: name.clone(),
                })
            }
        };

        if self.descriptors.iter().any(|d| &d.canonical_name == name) {
            return Err(RestError::ConfigError {
                message: format!("Service '{}' registered twice", name),
            });
        }

        let mut operations = Vec::new();
        for operation in &definition.operations {
            let Some(route) = operation.route() else {
                continue;
            };
            operations.push((operation.name.clone(), route));

            let mut valid = true;

            if operation.verbs.is_empty() {
                valid = false;
                self.warn(
                    DiagnosticKind::MissingVerb,
                    name,
                    Some(&operation.name),
                    format!(
                        "Rest operation must declare at least one of GET, PUT, POST or DELETE: {} operation '{}'",
                        name, operation.name
                    ),
                );
            }

            if operation.produces.is_none() && !operation.returns.is_void() {
                valid = false;
                self.warn(
                    DiagnosticKind::MissingProducedType,
                    name,
                    Some(&operation.name),
                    format!(
                        "Rest operation returns a {:?} value and must declare a produced media type: {} operation '{}'",
                        operation.returns, name, operation.name
                    ),
                );
            }

            let path = normalize_path(operation.path.as_deref().unwrap_or_default());
            if let Some(placeholder) = template::trailing_placeholder(&path) {
                valid = false;
                self.warn(
                    DiagnosticKind::UnroutableTemplate,
                    name,
                    Some(&operation.name),
                    format!(
                        "Rest operation path placeholder {} must end its path segment: {} operation '{}' ({})",
                        placeholder, name, operation.name, path
                    ),
                );
            }

            if valid {
                let endpoint = EndpointRecord {
                    url_template: format!("http://%s:%d{}{}", base_path, path),
                    service: name.clone(),
                    base_path: base_path.clone(),
                    operation: operation.clone(),
                };
                let message = format!(
                    "Rest resource accessible: {} operation '{}' using http://[host:port]{}",
                    name,
                    operation.name,
                    endpoint.route_path()
                );
                if self.config.debug_enabled {
                    tracing::info!("✅ {}", message);
                }
                self.diagnostics.push(Diagnostic {
                    kind: DiagnosticKind::Reachable,
                    service: name.clone(),
                    operation: Some(operation.name.clone()),
                    message,
                });
                self.endpoints.push(endpoint);
            }
        }

        if operations.is_empty() {
            self.warn(
                DiagnosticKind::NoCompatibleOperations,
                name,
                None,
                format!("Rest resource has no compatible operation with a path: {}", name),
            );
        }

        let descriptor = ServiceDescriptor {
            canonical_name: name.clone(),
            base_path,
            operations,
        };
        self.descriptors.push(descriptor.clone());
        Ok(Some(descriptor))
    }

    fn warn(&mut self, kind: DiagnosticKind, service: &str, operation: Option<&str>, message: String) {
        if self.config.warnings_enabled {
            tracing::warn!("⚠️ {}", message);
        }
        self.diagnostics.push(Diagnostic {
            kind,
            service: service.to_string(),
            operation: operation.map(str::to_string),
            message,
        });
    }

    pub fn descriptors(&self) -> &[ServiceDescriptor] {
        &self.descriptors
    }

    pub fn endpoints(&self) -> &[EndpointRecord] {
        &self.endpoints
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.is_warning())
    }

    /// Endpoints shaped like a health probe: zero arguments, boolean result.
    pub fn health_probes(&self, probe_name: &str) -> Vec<&EndpointRecord> {
        self.endpoints
            .iter()
            .filter(|e| e.is_health_probe(probe_name))
            .collect()
    }
}
