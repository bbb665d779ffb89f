use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpVerb {
    Get,
    Put,
    Post,
    Delete,
}

impl HttpVerb {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpVerb::Get => "GET",
            HttpVerb::Put => "PUT",
            HttpVerb::Post => "POST",
            HttpVerb::Delete => "DELETE",
        }
    }

    pub fn as_method(&self) -> reqwest::Method {
        match self {
            HttpVerb::Get => reqwest::Method::GET,
            HttpVerb::Put => reqwest::Method::PUT,
            HttpVerb::Post => reqwest::Method::POST,
            HttpVerb::Delete => reqwest::Method::DELETE,
        }
    }
}

impl fmt::Display for HttpVerb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Media type string such as `application/json` or `text/plain`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MediaType(String);

impl MediaType {
    pub const APPLICATION_JSON: &'static str = "application/json";
    pub const TEXT_PLAIN: &'static str = "text/plain";
    pub const APPLICATION_OCTET_STREAM: &'static str = "application/octet-stream";

    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn json() -> Self {
        Self::new(Self::APPLICATION_JSON)
    }

    pub fn text_plain() -> Self {
        Self::new(Self::TEXT_PLAIN)
    }

    pub fn octet_stream() -> Self {
        Self::new(Self::APPLICATION_OCTET_STREAM)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `type/subtype` without parameters, lowercased.
    pub fn essence(&self) -> String {
        self.0
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase()
    }

    pub fn is_json(&self) -> bool {
        self.essence() == Self::APPLICATION_JSON
    }

    /// JSON or any `text*` type is read as text and coerced.
    pub fn is_textual(&self) -> bool {
        self.is_json() || self.essence().starts_with("text")
    }

    pub fn with_charset(&self, charset: &str) -> String {
        format!("{};charset={}", self.essence(), charset)
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Declared return kind of an operation. Decoding switches on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueKind {
    Void,
    Bool,
    Int,
    Double,
    Long,
    Short,
    Byte,
    Char,
    Text,
    TextArray,
    IntArray,
    DoubleArray,
    LongArray,
    Json,
    Raw,
}

impl ValueKind {
    pub fn is_void(&self) -> bool {
        matches!(self, ValueKind::Void)
    }
}

/// A remote operation together with its routing metadata.
///
/// `path` and `verbs` may be missing: the server validator reports that,
/// the client refuses to dispatch an operation without a path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    pub name: String,
    pub path: Option<String>,
    pub verbs: Vec<HttpVerb>,
    pub produces: Option<MediaType>,
    pub returns: ValueKind,
    pub arity: usize,
}

impl Operation {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: None,
            verbs: Vec::new(),
            produces: None,
            returns: ValueKind::Void,
            arity: 0,
        }
    }

    pub fn get(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(name).path(path).verb(HttpVerb::Get)
    }

    pub fn put(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(name).path(path).verb(HttpVerb::Put)
    }

    pub fn post(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(name).path(path).verb(HttpVerb::Post)
    }

    pub fn delete(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self::new(name).path(path).verb(HttpVerb::Delete)
    }

    /// Sets the path template; arity becomes the number of `{...}` placeholders.
    pub fn path(mut self, path: impl Into<String>) -> Self {
        let path = path.into();
        self.arity = path.matches('{').count();
        self.path = Some(path);
        self
    }

    pub fn verb(mut self, verb: HttpVerb) -> Self {
        if !self.verbs.contains(&verb) {
            self.verbs.push(verb);
        }
        self
    }

    pub fn produces(mut self, media_type: impl Into<String>) -> Self {
        self.produces = Some(MediaType::new(media_type));
        self
    }

    pub fn returns(mut self, kind: ValueKind) -> Self {
        self.returns = kind;
        self
    }

    pub fn arity(mut self, arity: usize) -> Self {
        self.arity = arity;
        self
    }

    /// Route of this operation. The first declared verb wins, GET when none.
    pub fn route(&self) -> Option<RouteDescriptor> {
        self.path.as_ref().map(|path| RouteDescriptor {
            verb: self.verbs.first().copied().unwrap_or(HttpVerb::Get),
            path_template: path.clone(),
            produced_type: self.produces.clone(),
        })
    }
}

/// A service type as declared by its implementation: base path, deprecation
/// marker and operations in declaration order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceDefinition {
    pub canonical_name: String,
    pub base_path: Option<String>,
    pub deprecated: bool,
    pub operations: Vec<Operation>,
}

impl ServiceDefinition {
    pub fn new(canonical_name: impl Into<String>) -> Self {
        Self {
            canonical_name: canonical_name.into(),
            base_path: None,
            deprecated: false,
            operations: Vec::new(),
        }
    }

    pub fn base_path(mut self, base_path: impl Into<String>) -> Self {
        self.base_path = Some(base_path.into());
        self
    }

    pub fn deprecated(mut self) -> Self {
        self.deprecated = true;
        self
    }

    pub fn operation(mut self, operation: Operation) -> Self {
        self.operations.push(operation);
        self
    }

    pub fn find(&self, name: &str) -> Option<&Operation> {
        self.operations.iter().find(|op| op.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteDescriptor {
    pub verb: HttpVerb,
    pub path_template: String,
    pub produced_type: Option<MediaType>,
}

impl RouteDescriptor {
    /// Produced type, `text/plain` when none was declared.
    pub fn media_type(&self) -> MediaType {
        self.produced_type.clone().unwrap_or_else(MediaType::text_plain)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceDescriptor {
    pub canonical_name: String,
    pub base_path: String,
    pub operations: Vec<(String, RouteDescriptor)>,
}

/// Leading `/` added, trailing `/` removed; `"/"` and `""` become `""`.
pub fn normalize_path(path: &str) -> String {
    let trimmed = path.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else if trimmed.starts_with('/') {
        trimmed.to_string()
    } else {
        format!("/{}", trimmed)
    }
}

/// A validated, externally reachable operation.
///
/// `url_template` keeps `%s` (host) and `%d` (port) open until the
/// server knows where it is listening.
#[derive(Debug, Clone, PartialEq)]
pub struct EndpointRecord {
    pub url_template: String,
    pub service: String,
    pub base_path: String,
    pub operation: Operation,
}

impl EndpointRecord {
    pub fn resolve(&self, host: &str, port: u16) -> String {
        self.url_template
            .replacen("%s", host, 1)
            .replacen("%d", &port.to_string(), 1)
    }

    /// Full route path on the server, base path included.
    pub fn route_path(&self) -> String {
        let path = format!(
            "{}{}",
            normalize_path(&self.base_path),
            normalize_path(self.operation.path.as_deref().unwrap_or_default())
        );
        if path.is_empty() {
            "/".to_string()
        } else {
            path
        }
    }

    pub fn is_health_probe(&self, probe_name: &str) -> bool {
        self.operation.name == probe_name
            && self.operation.arity == 0
            && self.operation.returns == ValueKind::Bool
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}


/// Decoded (client) or returned (server) value of an operation.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Unit,
    Bool(bool),
    Int(i32),
    Double(f64),
    Long(i64),
    Short(i16),
    Byte(i8),
    Char(char),
    Text(String),
    TextArray(Vec<String>),
    IntArray(Vec<i32>),
    DoubleArray(Vec<f64>),
    LongArray(Vec<i64>),
    Json(serde_json::Value),
    Raw(RawResponse),
}

fn join_wire<T: ToString>(items: &[T]) -> String {
    items
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

impl Value {
    /// Wire form served by the embedded server; arrays become `a, b, c`.
    pub fn to_wire(&self) -> Vec<u8> {
        match self {
            Value::Unit => Vec::new(),
            Value::Bool(v) => v.to_string().into_bytes(),
            Value::Int(v) => v.to_string().into_bytes(),
            Value::Double(v) => v.to_string().into_bytes(),
            Value::Long(v) => v.to_string().into_bytes(),
            Value::Short(v) => v.to_string().into_bytes(),
            Value::Byte(v) => v.to_string().into_bytes(),
            Value::Char(v) => v.to_string().into_bytes(),
            Value::Text(v) => v.clone().into_bytes(),
            Value::TextArray(v) => v.join(", ").into_bytes(),
            Value::IntArray(v) => join_wire(v).into_bytes(),
            Value::DoubleArray(v) => join_wire(v).into_bytes(),
            Value::LongArray(v) => join_wire(v).into_bytes(),
            Value::Json(v) => serde_json::to_vec(v).unwrap_or_default(),
            Value::Raw(raw) => raw.body.clone(),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Raw(raw) => write!(f, "<raw {} bytes, status {}>", raw.body.len(), raw.status),
            other => f.write_str(&String::from_utf8_lossy(&other.to_wire())),
        }
    }
}

/// Why a call produced no value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Absence {
    /// The server answered with a status other than 200.
    Status(u16),
    /// The request never completed.
    Transport(String),
    /// 200 with a JSON body that could not be parsed.
    Undecodable,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Present(Value),
    Absent(Absence),
}

impl Reply {
    pub fn is_absent(&self) -> bool {
        matches!(self, Reply::Absent(_))
    }

    pub fn into_value(self) -> Option<Value> {
        match self {
            Reply::Present(value) => Some(value),
            Reply::Absent(_) => None,
        }
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Present(value) => value.fmt(f),
            Reply::Absent(absence) => write!(f, "null ({:?})", absence),
        }
    }
}

/// Typed extraction from a decoded [`Value`].
pub trait FromValue: Sized {
    fn from_value(value: Value) -> Option<Self>;
}

macro_rules! value_conversions {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl FromValue for $ty {
                fn from_value(value: Value) -> Option<Self> {
                    match value {
                        Value::$variant(v) => Some(v),
                        _ => None,
                    }
                }
            }

            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v)
                }
            }
        )*
    };
}

value_conversions!(
    bool => Bool,
    i32 => Int,
    f64 => Double,
    i64 => Long,
    i16 => Short,
    i8 => Byte,
    char => Char,
    String => Text,
    Vec<String> => TextArray,
    Vec<i32> => IntArray,
    Vec<f64> => DoubleArray,
    Vec<i64> => LongArray,
    serde_json::Value => Json,
    RawResponse => Raw,
);

impl FromValue for () {
    fn from_value(value: Value) -> Option<Self> {
        match value {
            Value::Unit => Some(()),
            _ => None,
        }
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_media_type_classification() {
        assert!(MediaType::json().is_json());
        assert!(MediaType::json().is_textual());
        assert!(MediaType::new("application/json; charset=utf-8").is_json());
        assert!(MediaType::new("text/html").is_textual());
        assert!(!MediaType::octet_stream().is_textual());
        assert_eq!(
            MediaType::text_plain().with_charset("UTF-8"),
            "text/plain;charset=UTF-8"
        );
    }

    #[test]
    fn test_operation_route_defaults() {
        let op = Operation::new("lookup")
            .path("/items/{id}")
            .returns(ValueKind::Text);
        assert_eq!(op.arity, 1);

        let route = op.route().unwrap();
        assert_eq!(route.verb, HttpVerb::Get);
        assert_eq!(route.media_type(), MediaType::text_plain());
        assert!(Operation::new("unrouted").route().is_none());
    }

    #[test]
    fn test_endpoint_resolve_and_probe_shape() {
        let endpoint = EndpointRecord {
            url_template: "http://%s:%d/status/ping".to_string(),
            service: "status".to_string(),
            base_path: "/status".to_string(),
            operation: Operation::get("ping", "/ping")
                .produces(MediaType::TEXT_PLAIN)
                .returns(ValueKind::Bool),
        };
        assert_eq!(
            endpoint.resolve("127.0.0.1", 8080),
            "http://127.0.0.1:8080/status/ping"
        );
        assert_eq!(endpoint.route_path(), "/status/ping");
        assert!(endpoint.is_health_probe("ping"));
        assert!(!endpoint.is_health_probe("health"));
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("items"), "/items");
        assert_eq!(normalize_path("/items/"), "/items");
        assert_eq!(normalize_path("/"), "");
        assert_eq!(normalize_path(""), "");
    }

    #[test]
    fn test_value_wire_form() {
        assert_eq!(Value::Bool(true).to_wire(), b"true");
        assert_eq!(Value::IntArray(vec![1, 2, 3]).to_wire(), b"1, 2, 3");
        assert_eq!(Value::Unit.to_wire(), b"");
        assert_eq!(
            Value::Json(serde_json::json!({"id": 7})).to_wire(),
            br#"{"id":7}"#
        );
    }

    #[test]
    fn test_from_value_checks_variant() {
        assert_eq!(i32::from_value(Value::Int(5)), Some(5));
        assert_eq!(i32::from_value(Value::Long(5)), None);
        assert_eq!(<()>::from_value(Value::Unit), Some(()));
        assert_eq!(Value::from("hi"), Value::Text("hi".to_string()));
    }
}
