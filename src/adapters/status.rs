use crate::domain::model::{MediaType, Operation, ServiceDefinition, Value, ValueKind};
use crate::domain::ports::RestService;
use crate::utils::error::{RestError, Result};
use async_trait::async_trait;

/// Built-in status service mounted under `/status`.
///
/// `ping` doubles as the server's readiness probe.
#[derive(Debug, Clone, Default)]
pub struct StatusService {
    services: Vec<String>,
}

impl StatusService {
    pub const CANONICAL_NAME: &'static str = "restlink.StatusService";

    pub fn new() -> Self {
        Self::default()
    }

    /// Names reported by the `services` operation.
    pub fn with_services(mut self, services: Vec<String>) -> Self {
        self.services = services;
        self
    }
}

#[async_trait]
impl RestService for StatusService {
    fn definition(&self) -> ServiceDefinition {
        ServiceDefinition::new(Self::CANONICAL_NAME)
            .base_path("/status")
            .operation(
                Operation::get("ping", "/ping")
                    .produces(MediaType::TEXT_PLAIN)
                    .returns(ValueKind::Bool),
            )
            .operation(
                Operation::get("version", "/version")
                    .produces(MediaType::TEXT_PLAIN)
                    .returns(ValueKind::Text),
            )
            .operation(
                Operation::get("services", "/services")
                    .produces(MediaType::APPLICATION_JSON)
                    .returns(ValueKind::Json),
            )
            .operation(
                Operation::get("echo", "/echo/{message}")
                    .produces(MediaType::TEXT_PLAIN)
                    .returns(ValueKind::Text),
            )
    }

    async fn invoke(&self, operation: &str, args: Vec<String>) -> Result<Value> {
        match operation {
            "ping" => Ok(Value::Bool(true)),
            "version" => Ok(Value::Text(env!("CARGO_PKG_VERSION").to_string())),
            "services" => Ok(Value::Json(serde_json::to_value(&self.services)?)),
            "echo" => args.into_iter().next().map(Value::Text).ok_or_else(|| {
                RestError::MissingArgument {
                    operation: operation.to_string(),
                    placeholder: "{message}".to_string(),
                    given: 0,
                }
            }),
            other => Err(RestError::UnroutedOperation {
                operation: other.to_string(),
            }),
        }
    }
}
