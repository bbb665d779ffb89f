use crate::core::coercion;
use crate::core::registry::{RegistryConfig, RouteRegistry};
use crate::core::ssl::{SslConfig, SslListener};
use crate::core::template;
use crate::core::transport::RestRequest;
use crate::domain::model::{EndpointRecord, HttpVerb, MediaType};
use crate::domain::ports::{RestService, ServiceDiscovery};
use crate::utils::error::{RestError, Result};
use axum::extract::Path;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{MethodFilter, MethodRouter};
use axum::Router;
use hyper_util::rt::TokioTimer;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Notify};
use tokio::task::JoinSet;

const GRACE_PERIOD: Duration = Duration::from_secs(5);

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_health_probe() -> String {
    "ping".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Namespaces handed to service discovery, scanned in order.
    #[serde(default)]
    pub namespaces: Vec<String>,
    /// Operation name treated as the readiness probe.
    #[serde(default = "default_health_probe")]
    pub health_probe: String,
    #[serde(default)]
    pub registry: RegistryConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            namespaces: Vec::new(),
            health_probe: default_health_probe(),
            registry: RegistryConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    pub fn namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespaces.push(namespace.into());
        self
    }
}

/// `Created -> SslConfigured? -> Started -> Joined -> Destroyed`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LifecycleState {
    Created,
    SslConfigured,
    Started,
    Joined,
    Destroyed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    Pending,
    /// No unique probe endpoint, or the server stopped before probing.
    Skipped,
    Healthy,
    Unhealthy,
}

struct HandleInner {
    shutdown: Notify,
    state: watch::Sender<LifecycleState>,
    address: watch::Sender<Option<SocketAddr>>,
    secure_address: watch::Sender<Option<SocketAddr>>,
    health: watch::Sender<HealthStatus>,
}

/// Observes and stops a running [`RestServer`] from another task.
#[derive(Clone)]
pub struct ServerHandle {
    inner: Arc<HandleInner>,
}

impl Default for ServerHandle {
    fn default() -> Self {
        Self {
            inner: Arc::new(HandleInner {
                shutdown: Notify::new(),
                state: watch::Sender::new(LifecycleState::Created),
                address: watch::Sender::new(None),
                secure_address: watch::Sender::new(None),
                health: watch::Sender::new(HealthStatus::Pending),
            }),
        }
    }
}

impl std::fmt::Debug for ServerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerHandle")
            .field("state", &self.state())
            .field("address", &self.local_addr())
            .finish()
    }
}

impl ServerHandle {
    /// Ends the `Joined` wait. A signal sent before the server joins is kept.
    pub fn shutdown(&self) {
        self.inner.shutdown.notify_one();
    }

    pub fn state(&self) -> LifecycleState {
        *self.inner.state.borrow()
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        *self.inner.address.borrow()
    }

    pub fn secure_addr(&self) -> Option<SocketAddr> {
        *self.inner.secure_address.borrow()
    }

    pub fn health(&self) -> HealthStatus {
        *self.inner.health.borrow()
    }

    /// Waits until the lifecycle has reached at least `target`.
    pub async fn wait_for(&self, target: LifecycleState) -> LifecycleState {
        let mut state = self.inner.state.subscribe();
        let reached = match state.wait_for(|current| *current >= target).await {
            Ok(current) => *current,
            Err(_) => self.state(),
        };
        reached
    }

    /// Plain listener address once started; `None` if the server never started.
    pub async fn listening(&self) -> Option<SocketAddr> {
        self.wait_for(LifecycleState::Started).await;
        self.local_addr()
    }

    /// Waits for the readiness probe to finish or be skipped.
    pub async fn health_checked(&self) -> HealthStatus {
        let mut health = self.inner.health.subscribe();
        let checked = match health.wait_for(|status| *status != HealthStatus::Pending).await {
            Ok(status) => *status,
            Err(_) => self.health(),
        };
        checked
    }

    fn advance(&self, state: LifecycleState) {
        tracing::debug!("🔄 Server state: {:?}", state);
        self.inner.state.send_replace(state);
    }

    fn report_health(&self, status: HealthStatus) {
        self.inner.health.send_if_modified(|current| {
            if *current == HealthStatus::Pending {
                *current = status;
                true
            } else {
                false
            }
        });
    }
}

/// Runs on every exit path of [`RestServer::execute`], faults and dropped
/// futures included.
struct Teardown {
    handle: ServerHandle,
    listeners: Vec<axum_server::Handle>,
}

impl Drop for Teardown {
    fn drop(&mut self) {
        for listener in &self.listeners {
            listener.shutdown();
        }
        self.handle.report_health(HealthStatus::Skipped);
        self.handle.advance(LifecycleState::Destroyed);
        tracing::info!("🛑 Server destroyed");
    }
}

/// Embedded server exposing the services found by discovery.
pub struct RestServer {
    config: ServerConfig,
    registry: RouteRegistry,
    services: HashMap<String, Arc<dyn RestService>>,
    ssl: Option<SslListener>,
    handle: ServerHandle,
}

impl RestServer {
    /// Discovers and validates every service of the configured namespaces.
    /// A service without base path aborts construction.
    pub fn new(config: ServerConfig, discovery: &dyn ServiceDiscovery) -> Result<Self> {
        let mut registry = RouteRegistry::new(config.registry.clone());
        let mut services = HashMap::new();

        for namespace in &config.namespaces {
            let candidates = discovery.discover(namespace);
            tracing::info!(
                "🔍 Namespace '{}': {} candidate service(s)",
                namespace,
                candidates.len()
            );
            for candidate in candidates {
                if let Some(descriptor) = registry.register_definition(&candidate.definition())? {
                    services.insert(descriptor.canonical_name, candidate);
                }
            }
        }

        tracing::info!(
            "📋 {} service(s) registered, {} reachable endpoint(s)",
            services.len(),
            registry.endpoints().len()
        );

        Ok(Self {
            config,
            registry,
            services,
            ssl: None,
            handle: ServerHandle::default(),
        })
    }

    /// Adds a TLS listener next to the plain one.
    pub fn enable_ssl(&mut self, ssl: &SslConfig) -> Result<()> {
        self.ssl = Some(ssl.build()?);
        self.handle.advance(LifecycleState::SslConfigured);
        Ok(())
    }

    pub fn handle(&self) -> ServerHandle {
        self.handle.clone()
    }

    pub fn registry(&self) -> &RouteRegistry {
        &self.registry
    }

    /// One route per reachable endpoint and declared verb. A second
    /// operation on the same path and verb is skipped with a warning.
    pub fn build_router(&self) -> Router {
        let mut paths: BTreeMap<String, MethodRouter> = BTreeMap::new();
        let mut taken: HashSet<(String, HttpVerb)> = HashSet::new();

        for endpoint in self.registry.endpoints() {
            let Some(service) = self.services.get(&endpoint.service) else {
                continue;
            };
            let path = template::to_router_path(&endpoint.route_path());

            for verb in &endpoint.operation.verbs {
                if !taken.insert((path.clone(), *verb)) {
                    tracing::warn!(
                        "⚠️ {} {} already routed, skipping {} operation '{}'",
                        verb,
                        path,
                        endpoint.service,
                        endpoint.operation.name
                    );
                    continue;
                }

                let route = operation_route(service.clone(), endpoint, *verb);
                let merged = match paths.remove(&path) {
                    Some(existing) => existing.merge(route),
                    None => route,
                };
                paths.insert(path.clone(), merged);
            }
        }

        paths
            .into_iter()
            .fold(Router::new(), |router, (path, route)| router.route(&path, route))
    }

    /// Starts the listeners, runs the readiness probe and blocks until
    /// [`ServerHandle::shutdown`] is called or a listener fails. The server
    /// ends `Destroyed` on every exit path.
    pub async fn execute(self) -> Result<()> {
        let router = self.build_router();
        let plain = axum_server::Handle::new();
        let secure = axum_server::Handle::new();
        let _teardown = Teardown {
            handle: self.handle.clone(),
            listeners: vec![plain.clone(), secure.clone()],
        };

        let address = resolve(&self.config.host, self.config.port).await?;
        let app = router.into_make_service();
        let mut listeners = JoinSet::new();

        let server = axum_server::bind(address).handle(plain.clone());
        let plain_app = app.clone();
        listeners.spawn(async move { server.serve(plain_app).await });

        if let Some(ssl) = &self.ssl {
            let secure_address = SocketAddr::new(address.ip(), ssl.port);
            let mut server =
                axum_server::bind_rustls(secure_address, ssl.tls.clone()).handle(secure.clone());
            server
                .http_builder()
                .http1()
                .timer(TokioTimer::new())
                .header_read_timeout(ssl.idle_timeout);
            listeners.spawn(async move { server.serve(app).await });
        }

        let bound = tokio::select! {
            bound = plain.listening() => bound,
            Some(joined) = listeners.join_next() => return Err(listener_fault(joined)),
        };
        let bound = bound.ok_or_else(|| RestError::ServerError {
            message: format!("listener on {} did not start", address),
        })?;
        self.handle.inner.address.send_replace(Some(bound));

        if let Some(ssl) = &self.ssl {
            let secure_bound = tokio::select! {
                bound = secure.listening() => bound,
                Some(joined) = listeners.join_next() => return Err(listener_fault(joined)),
            };
            self.handle.inner.secure_address.send_replace(secure_bound);
            if let Some(secure_bound) = secure_bound {
                tracing::info!("🔒 Listening on {}://{}", ssl.scheme, secure_bound);
            }
        }

        tracing::info!("🚀 Listening on http://{}", bound);
        self.handle.advance(LifecycleState::Started);
        self.spawn_health_probe(bound);

        self.handle.advance(LifecycleState::Joined);
        let result = tokio::select! {
            _ = self.handle.inner.shutdown.notified() => {
                tracing::info!("🛑 Shutdown requested");
                Ok(())
            }
            Some(joined) = listeners.join_next() => Err(listener_fault(joined)),
        };

        plain.graceful_shutdown(Some(GRACE_PERIOD));
        secure.graceful_shutdown(Some(GRACE_PERIOD));
        while listeners.join_next().await.is_some() {}

        result
    }

    /// Issues one GET to the unique probe endpoint, if any. The outcome is
    /// logged and published on the handle; it never stops the server.
    fn spawn_health_probe(&self, bound: SocketAddr) {
        let probes = self.registry.health_probes(&self.config.health_probe);
        let endpoint: &EndpointRecord = match probes.as_slice() {
            [endpoint] => *endpoint,
            [] => {
                tracing::debug!("No '{}' health probe endpoint", self.config.health_probe);
                self.handle.report_health(HealthStatus::Skipped);
                return;
            }
            many => {
                tracing::warn!(
                    "⚠️ {} '{}' health probe endpoints, skipping readiness check",
                    many.len(),
                    self.config.health_probe
                );
                self.handle.report_health(HealthStatus::Skipped);
                return;
            }
        };

        let url = endpoint.resolve(&probe_host(bound.ip()), bound.port());
        let handle = self.handle.clone();
        tokio::spawn(async move {
            let text = RestRequest::new()
                .get_text(&url, &MediaType::text_plain())
                .await;
            if text.as_deref().is_some_and(coercion::to_boolean) {
                tracing::info!("[OK] Health probe {}", url);
                handle.report_health(HealthStatus::Healthy);
            } else {
                tracing::warn!("[FAIL] Health probe {}", url);
                handle.report_health(HealthStatus::Unhealthy);
            }
        });
    }
}

fn operation_route(service: Arc<dyn RestService>, endpoint: &EndpointRecord, verb: HttpVerb) -> MethodRouter {
    let operation = endpoint.operation.name.clone();
    let content_type = endpoint
        .operation
        .produces
        .clone()
        .unwrap_or_else(MediaType::text_plain)
        .with_charset("UTF-8");

    let handler = move |params: Option<Path<Vec<(String, String)>>>| async move {
        let args: Vec<String> = params
            .map(|Path(params)| params.into_iter().map(|(_, value)| value).collect())
            .unwrap_or_default();

        match service.invoke(&operation, args).await {
            Ok(value) => ([(header::CONTENT_TYPE, content_type)], value.to_wire()).into_response(),
            Err(e) => {
                tracing::error!("❌ Operation '{}' failed: {}", operation, e);
                (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
            }
        }
    };

    axum::routing::on(method_filter(verb), handler)
}

fn method_filter(verb: HttpVerb) -> MethodFilter {
    match verb {
        HttpVerb::Get => MethodFilter::GET,
        HttpVerb::Put => MethodFilter::PUT,
        HttpVerb::Post => MethodFilter::POST,
        HttpVerb::Delete => MethodFilter::DELETE,
    }
}

async fn resolve(host: &str, port: u16) -> Result<SocketAddr> {
    tokio::net::lookup_host((host, port))
        .await?
        .next()
        .ok_or_else(|| RestError::ServerError {
            message: format!("cannot resolve {}:{}", host, port),
        })
}

/// Loopback when bound to the wildcard address.
fn probe_host(ip: IpAddr) -> String {
    match ip {
        IpAddr::V4(ip) if ip.is_unspecified() => "127.0.0.1".to_string(),
        IpAddr::V4(ip) => ip.to_string(),
        IpAddr::V6(ip) if ip.is_unspecified() => "[::1]".to_string(),
        IpAddr::V6(ip) => format!("[{}]", ip),
    }
}

fn listener_fault(joined: std::result::Result<std::io::Result<()>, tokio::task::JoinError>) -> RestError {
    let message = match joined {
        Ok(Ok(())) => "listener stopped unexpectedly".to_string(),
        Ok(Err(e)) => format!("listener failed: {}", e),
        Err(e) => format!("listener task failed: {}", e),
    };
    tracing::error!("❌ {}", message);
    RestError::ServerError { message }
}
