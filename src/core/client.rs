use crate::core::coercion;
use crate::core::template::{self, Arg};
use crate::core::transport::{self, Outcome, RestRequest};
use crate::domain::model::{
    Absence, FromValue, Reply, RouteDescriptor, ServiceDefinition, Value, ValueKind,
};
use crate::domain::ports::ResponseHandler;
use crate::utils::error::{RestError, Result};
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone)]
struct BoundRoute {
    route: RouteDescriptor,
    returns: ValueKind,
}

/// Client binding for one remote service.
///
/// Turns `invoke(operation, args)` into a single HTTP request and decodes
/// the body by the operation's declared [`ValueKind`]. The route table is
/// built once, when the connection is created.
pub struct RestConnection {
    service: String,
    routes: HashMap<String, BoundRoute>,
    transport: RestRequest,
    handler: Option<Arc<dyn ResponseHandler>>,
}

impl RestConnection {
    /// Binds `definition` to `host:port`, e.g. `consume("http://localhost", 8080, &def)`.
    pub fn consume(host: &str, port: u16, definition: &ServiceDefinition) -> Self {
        Self::new(&format!("{}:{}", host, port), definition)
    }

    /// Binds `definition` to a base address; the service base path is appended.
    pub fn new(base_address: &str, definition: &ServiceDefinition) -> Self {
        let service = template::join_url(&[
            base_address,
            definition.base_path.as_deref().unwrap_or_default(),
        ]);

        let routes = definition
            .operations
            .iter()
            .filter_map(|op| {
                op.route().map(|route| {
                    (
                        op.name.clone(),
                        BoundRoute {
                            route,
                            returns: op.returns,
                        },
                    )
                })
            })
            .collect();

        Self {
            service,
            routes,
            transport: RestRequest::new(),
            handler: None,
        }
    }

    pub fn with_response_handler(mut self, handler: impl ResponseHandler + 'static) -> Self {
        self.handler = Some(Arc::new(handler));
        self
    }

    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.transport = RestRequest::with_client(client);
        self
    }

    pub fn service_address(&self) -> &str {
        &self.service
    }

    fn bound(&self, operation: &str) -> Result<&BoundRoute> {
        self.routes
            .get(operation)
            .ok_or_else(|| RestError::UnroutedOperation {
                operation: operation.to_string(),
            })
    }

    /// Final request URL for a call, placeholders substituted.
    pub fn url_for(&self, operation: &str, args: &[Arg<'_>]) -> Result<String> {
        let bound = self.bound(operation)?;
        let path = template::expand(operation, &bound.route.path_template, args)?;
        Ok(template::join_url(&[&self.service, &path]))
    }

    /// Performs the call. Unrouted operations and missing arguments are
    /// errors; a failed request is an `Absent` reply, never an error.
    pub async fn invoke(&self, operation: &str, args: &[Arg<'_>]) -> Result<Reply> {
        let bound = self.bound(operation)?;
        let url = self.url_for(operation, args)?;
        let media_type = bound.route.media_type();

        tracing::info!("📡 {} {}", bound.route.verb, url);
        let request = self.transport.request(bound.route.verb, &url, &media_type);

        let response = match self.transport.send(request).await {
            Ok(Outcome::Ok(response)) => response,
            Ok(Outcome::NotOk(status)) => {
                let reply = Reply::Absent(Absence::Status(status.as_u16()));
                tracing::info!("[RESULT] - {}", reply);
                return Ok(reply);
            }
            Err(e) => {
                tracing::warn!("⚠️ {} failed: {}", url, e);
                let reply = Reply::Absent(Absence::Transport(e.to_string()));
                tracing::info!("[RESULT] - {}", reply);
                return Ok(reply);
            }
        };

        let reply = if media_type.is_textual() {
            let text = transport::read_lines(response).await?;
            match coercion::coerce(&text, bound.returns, media_type.is_json()) {
                Some(value) => Reply::Present(value),
                None => Reply::Absent(Absence::Undecodable),
            }
        } else {
            let raw = transport::read_raw(response).await?;
            match &self.handler {
                Some(handler) => handler.decode(raw, bound.returns),
                None => {
                    tracing::warn!(
                        "⚠️ No response handler configured for '{}', returning raw response",
                        media_type
                    );
                    Reply::Present(Value::Raw(raw))
                }
            }
        };

        tracing::info!("[RESULT] - {}", reply);
        Ok(reply)
    }

    /// Typed call: absent replies and values of another kind become `None`.
    pub async fn call<T: FromValue>(&self, operation: &str, args: &[Arg<'_>]) -> Result<Option<T>> {
        Ok(self
            .invoke(operation, args)
            .await?
            .into_value()
            .and_then(T::from_value))
    }

    /// Structured call: the JSON body is decoded into `T`; malformed or
    /// mismatching documents become `None`.
    pub async fn call_json<T: DeserializeOwned>(
        &self,
        operation: &str,
        args: &[Arg<'_>],
    ) -> Result<Option<T>> {
        let decoded = match self.invoke(operation, args).await? {
            Reply::Present(Value::Json(value)) => serde_json::from_value(value).ok(),
            Reply::Present(Value::Text(text)) => coercion::to_json(&text),
            _ => None,
        };
        Ok(decoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{MediaType, Operation, RawResponse};
    use httpmock::prelude::*;

    fn inventory() -> ServiceDefinition {
        ServiceDefinition::new("demo.Inventory")
            .base_path("/inventory")
            .operation(
                Operation::get("ping", "/ping")
                    .produces(MediaType::TEXT_PLAIN)
                    .returns(ValueKind::Bool),
            )
            .operation(
                Operation::get("count", "/items/{category}/count")
                    .produces(MediaType::TEXT_PLAIN)
                    .returns(ValueKind::Int),
            )
            .operation(
                Operation::get("item", "/items/{id}")
                    .produces(MediaType::APPLICATION_JSON)
                    .returns(ValueKind::Json),
            )
            .operation(
                Operation::get("tags", "/tags")
                    .produces(MediaType::TEXT_PLAIN)
                    .returns(ValueKind::TextArray),
            )
            .operation(
                Operation::get("thumbnail", "/items/{id}/thumbnail")
                    .produces(MediaType::APPLICATION_OCTET_STREAM)
                    .returns(ValueKind::Raw),
            )
            .operation(Operation::new("unrouted").returns(ValueKind::Text))
    }

    struct LengthHandler;

    impl ResponseHandler for LengthHandler {
        fn decode(&self, response: RawResponse, _kind: ValueKind) -> Reply {
            Reply::Present(Value::Int(response.body.len() as i32))
        }
    }

    #[test]
    fn test_url_for_substitutes_arguments() {
        let conn = RestConnection::consume("http://localhost", 8080, &inventory());
        assert_eq!(
            conn.url_for("item", &[&42]).unwrap(),
            "http://localhost:8080/inventory/items/42"
        );
        assert_eq!(
            conn.url_for("count", &[&"books"]).unwrap(),
            "http://localhost:8080/inventory/items/books/count"
        );
    }

    #[tokio::test]
    async fn test_unrouted_operation_is_fatal() {
        let conn = RestConnection::new("http://127.0.0.1:1", &inventory());

        let err = conn.invoke("unrouted", &[]).await.unwrap_err();
        assert!(matches!(err, RestError::UnroutedOperation { .. }));

        let err = conn.invoke("no_such_operation", &[]).await.unwrap_err();
        assert!(matches!(err, RestError::UnroutedOperation { .. }));
    }

    #[tokio::test]
    async fn test_boolean_decoded_on_200_absent_on_404() {
        let server = MockServer::start();
        let mut ok_mock = server.mock(|when, then| {
            when.method(GET).path("/inventory/ping");
            then.status(200).body("true");
        });

        let conn = RestConnection::new(&server.base_url(), &inventory());
        assert_eq!(conn.call::<bool>("ping", &[]).await.unwrap(), Some(true));
        ok_mock.assert();
        ok_mock.delete();

        server.mock(|when, then| {
            when.method(GET).path("/inventory/ping");
            then.status(404).body("true");
        });
        let reply = conn.invoke("ping", &[]).await.unwrap();
        assert_eq!(reply, Reply::Absent(Absence::Status(404)));
        assert_eq!(conn.call::<bool>("ping", &[]).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_transport_fault_degrades_to_absence() {
        let conn = RestConnection::new("http://127.0.0.1:1", &inventory());
        let reply = conn.invoke("ping", &[]).await.unwrap();
        assert!(matches!(reply, Reply::Absent(Absence::Transport(_))));
    }

    #[tokio::test]
    async fn test_placeholder_call_and_integer_coercion() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(GET).path("/inventory/items/books/count");
            then.status(200).body("17");
        });

        let conn = RestConnection::new(&server.base_url(), &inventory());
        assert_eq!(conn.call::<i32>("count", &[&"books"]).await.unwrap(), Some(17));
        mock.assert();
    }

    #[tokio::test]
    async fn test_malformed_integer_body_is_zero() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/inventory/items/x/count");
            then.status(200).body("lots");
        });

        let conn = RestConnection::new(&server.base_url(), &inventory());
        assert_eq!(conn.call::<i32>("count", &[&"x"]).await.unwrap(), Some(0));
    }

    #[tokio::test]
    async fn test_json_decode_and_undecodable_body() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/inventory/items/1");
            then.status(200)
                .header("Content-Type", "application/json")
                .json_body(serde_json::json!({"id": 1, "name": "lamp"}));
        });
        server.mock(|when, then| {
            when.method(GET).path("/inventory/items/2");
            then.status(200).body("{oops");
        });

        let conn = RestConnection::new(&server.base_url(), &inventory());
        let item: Option<serde_json::Value> = conn.call_json("item", &[&1]).await.unwrap();
        assert_eq!(item, Some(serde_json::json!({"id": 1, "name": "lamp"})));

        let reply = conn.invoke("item", &[&2]).await.unwrap();
        assert_eq!(reply, Reply::Absent(Absence::Undecodable));
    }

    #[tokio::test]
    async fn test_string_array_decoding() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/inventory/tags");
            then.status(200).body("red, green,blue");
        });

        let conn = RestConnection::new(&server.base_url(), &inventory());
        let tags: Option<Vec<String>> = conn.call("tags", &[]).await.unwrap();
        assert_eq!(
            tags,
            Some(vec!["red".to_string(), "green".to_string(), "blue".to_string()])
        );
    }

    #[tokio::test]
    async fn test_non_textual_media_without_handler_returns_raw() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/inventory/items/3/thumbnail");
            then.status(200)
                .header("Content-Type", "application/octet-stream")
                .body(vec![1u8, 2, 3, 4]);
        });

        let conn = RestConnection::new(&server.base_url(), &inventory());
        let raw: Option<RawResponse> = conn.call("thumbnail", &[&3]).await.unwrap();
        assert_eq!(raw.unwrap().body, vec![1u8, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_non_textual_media_uses_bound_handler() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/inventory/items/3/thumbnail");
            then.status(200).body(vec![9u8; 10]);
        });

        let conn =
            RestConnection::new(&server.base_url(), &inventory()).with_response_handler(LengthHandler);
        assert_eq!(conn.call::<i32>("thumbnail", &[&3]).await.unwrap(), Some(10));
    }

    #[tokio::test]
    async fn test_declared_verb_is_used() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(DELETE).path("/inventory/items/5");
            then.status(200);
        });

        let definition = ServiceDefinition::new("demo.Deleter")
            .base_path("/inventory")
            .operation(Operation::delete("remove", "/items/{id}"));
        let conn = RestConnection::new(&server.base_url(), &definition);

        assert_eq!(conn.call::<()>("remove", &[&5]).await.unwrap(), Some(()));
        mock.assert();
    }
}
