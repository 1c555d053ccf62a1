//! Routers.
//!
//! A [`Router`] owns the defaults shared by every route of one API host:
//! host and port, rate limit, transport manager, case converters, JSON
//! finalizer and argument preparer. Routes read them at call time, so
//! setters take effect for routes that already exist.

use crate::channels::{CaseOverrides, Channel};
use crate::hooks::{JsonFinalizer, Preparer};
use crate::route::RouteBuilder;
use emissary_client::{
    normalize_url, AsyncReqwestTransport, AsyncTransport, RateLimit, ReqwestTransport, Transport,
    TransportConfig, TransportManager,
};
use emissary_config::RouterSettings;
use emissary_core::{CaseConverter, EmissaryError, HttpMethod, Result};
use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Shared router state.
#[derive(Clone)]
struct RouterState {
    host: String,
    port: Option<u16>,
    rate_limit: Option<Arc<RateLimit>>,
    manager: Option<Arc<TransportManager>>,
    cases: CaseOverrides,
    json_finalizer: JsonFinalizer,
    preparer: Preparer,
    transport_config: TransportConfig,
}

impl RouterState {
    fn new(host: String) -> Self {
        Self {
            host,
            port: None,
            rate_limit: None,
            manager: None,
            cases: CaseOverrides::new(),
            json_finalizer: JsonFinalizer::identity(),
            preparer: Preparer::identity(),
            transport_config: TransportConfig::default(),
        }
    }

    fn base_url(&self) -> String {
        let host = self.host.trim_end_matches('/');
        match self.port {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        }
    }
}

type Cached<T> = Mutex<Option<(String, Arc<T>)>>;

struct RouterInner {
    state: RwLock<RouterState>,
    model: Mutex<Option<String>>,
    sync_transport: Cached<dyn Transport>,
    async_transport: Cached<dyn AsyncTransport>,
}

/// Router defaults captured at the start of a call.
pub(crate) struct RouterDefaults {
    pub(crate) cases: CaseOverrides,
    pub(crate) json_finalizer: JsonFinalizer,
    pub(crate) preparer: Preparer,
    pub(crate) rate_limit: Option<Arc<RateLimit>>,
}

fn check_port(port: u32) -> Result<u16> {
    u16::try_from(port)
        .ok()
        .filter(|port| *port != 0)
        .ok_or(EmissaryError::InvalidPort { port })
}

/// The facade creating routes for one API host.
///
/// Cloning a router is cheap; clones share state.
///
/// # Example
///
/// ```
/// use emissary::{ResponseType, Router};
/// use emissary_core::{Param, Schema};
///
/// let router = Router::builder("https://api.example.com").port(8443).build().unwrap();
/// assert_eq!(router.base_url(), "https://api.example.com:8443");
///
/// let get_user = router
///     .get("/users/{id}")
///     .param("id", Param::path(Schema::integer()))
///     .returns(ResponseType::Json)
///     .build()
///     .unwrap();
/// assert_eq!(get_user.path().as_str(), "/users/{id}");
/// ```
#[derive(Clone)]
pub struct Router {
    inner: Arc<RouterInner>,
}

impl Router {
    /// Creates a router for `host`, e.g. `https://api.example.com`.
    pub fn new(host: impl Into<String>) -> Self {
        Self::from_state(RouterState::new(host.into()))
    }

    fn from_state(state: RouterState) -> Self {
        Self {
            inner: Arc::new(RouterInner {
                state: RwLock::new(state),
                model: Mutex::new(None),
                sync_transport: Mutex::new(None),
                async_transport: Mutex::new(None),
            }),
        }
    }

    /// Starts a router builder.
    pub fn builder(host: impl Into<String>) -> RouterBuilder {
        RouterBuilder::new(host)
    }

    /// Builds a router from loaded configuration.
    ///
    /// # Errors
    ///
    /// `InvalidPort` for port 0, `InvalidParameter` for an unusable rate limit.
    pub fn from_settings(settings: &RouterSettings) -> Result<Self> {
        let mut builder = Self::builder(settings.host.clone())
            .cases(settings.cases.into())
            .timeout(Duration::from_secs(settings.timeout_secs));
        if let Some(port) = settings.port {
            builder = builder.port(u32::from(port));
        }
        if let Some(limit) = &settings.rate_limit {
            let period = Duration::try_from_secs_f64(limit.period_secs).map_err(|e| {
                EmissaryError::invalid_parameter("rate_limit.period_secs", e.to_string())
            })?;
            builder = builder.rate_limit(RateLimit::new(limit.calls, period)?);
        }
        builder.build()
    }

    /// Host as configured.
    #[must_use]
    pub fn host(&self) -> String {
        self.inner.state.read().host.clone()
    }

    /// Port, if any.
    #[must_use]
    pub fn port(&self) -> Option<u16> {
        self.inner.state.read().port
    }

    /// Host plus port, without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> String {
        self.inner.state.read().base_url()
    }

    /// Shared rate limit.
    #[must_use]
    pub fn rate_limit(&self) -> Option<Arc<RateLimit>> {
        self.inner.state.read().rate_limit.clone()
    }

    /// Transport manager.
    #[must_use]
    pub fn manager(&self) -> Option<Arc<TransportManager>> {
        self.inner.state.read().manager.clone()
    }

    /// Default case converters.
    #[must_use]
    pub fn cases(&self) -> CaseOverrides {
        self.inner.state.read().cases.clone()
    }

    /// Default JSON finalizer.
    #[must_use]
    pub fn json_finalizer(&self) -> JsonFinalizer {
        self.inner.state.read().json_finalizer.clone()
    }

    /// Default argument preparer.
    #[must_use]
    pub fn preparer(&self) -> Preparer {
        self.inner.state.read().preparer.clone()
    }

    /// Replaces the host.
    pub fn set_host(&self, host: impl Into<String>) {
        self.inner.state.write().host = host.into();
    }

    /// Replaces the port.
    ///
    /// # Errors
    ///
    /// `InvalidPort` unless the port is within 1..=65535.
    pub fn set_port(&self, port: Option<u32>) -> Result<()> {
        let port = port.map(check_port).transpose()?;
        self.inner.state.write().port = port;
        Ok(())
    }

    /// Replaces the rate limit.
    pub fn set_rate_limit(&self, rate_limit: Option<RateLimit>) {
        self.inner.state.write().rate_limit = rate_limit.map(Arc::new);
    }

    /// Replaces the transport manager.
    pub fn set_manager(&self, manager: Option<Arc<TransportManager>>) {
        self.inner.state.write().manager = manager;
    }

    /// Replaces the default converter of one channel.
    pub fn set_case(&self, channel: Channel, converter: Option<CaseConverter>) {
        self.inner.state.write().cases.set(channel, converter);
    }

    /// Replaces the fallback converter.
    pub fn set_default_case(&self, converter: Option<CaseConverter>) {
        self.inner.state.write().cases.set_default(converter);
    }

    /// Replaces the default JSON finalizer.
    pub fn set_json_finalizer(&self, finalizer: JsonFinalizer) {
        self.inner.state.write().json_finalizer = finalizer;
    }

    /// Replaces the default argument preparer.
    pub fn set_preparer(&self, preparer: Preparer) {
        self.inner.state.write().preparer = preparer;
    }

    /// Replaces the settings of lazily created transports.
    pub fn set_transport_config(&self, config: TransportConfig) {
        self.inner.state.write().transport_config = config;
        self.inner.sync_transport.lock().take();
        self.inner.async_transport.lock().take();
    }

    /// Name of the bound model, if any.
    #[must_use]
    pub fn model_name(&self) -> Option<String> {
        self.inner.model.lock().clone()
    }

    /// Starts a route for any of the nine standard verbs.
    ///
    /// # Errors
    ///
    /// `InvalidMethod` for an unknown verb.
    pub fn route(&self, method: &str, path: impl Into<String>) -> Result<RouteBuilder> {
        Ok(RouteBuilder::new(self.clone(), HttpMethod::parse(method)?, path))
    }

    /// Starts a GET route.
    pub fn get(&self, path: impl Into<String>) -> RouteBuilder {
        RouteBuilder::new(self.clone(), HttpMethod::Get, path)
    }

    /// Starts a POST route.
    pub fn post(&self, path: impl Into<String>) -> RouteBuilder {
        RouteBuilder::new(self.clone(), HttpMethod::Post, path)
    }

    /// Starts a PUT route.
    pub fn put(&self, path: impl Into<String>) -> RouteBuilder {
        RouteBuilder::new(self.clone(), HttpMethod::Put, path)
    }

    /// Starts a PATCH route.
    pub fn patch(&self, path: impl Into<String>) -> RouteBuilder {
        RouteBuilder::new(self.clone(), HttpMethod::Patch, path)
    }

    /// Starts a DELETE route.
    pub fn delete(&self, path: impl Into<String>) -> RouteBuilder {
        RouteBuilder::new(self.clone(), HttpMethod::Delete, path)
    }

    /// Starts a HEAD route.
    pub fn head(&self, path: impl Into<String>) -> RouteBuilder {
        RouteBuilder::new(self.clone(), HttpMethod::Head, path)
    }

    /// Starts an OPTIONS route.
    pub fn options(&self, path: impl Into<String>) -> RouteBuilder {
        RouteBuilder::new(self.clone(), HttpMethod::Options, path)
    }

    /// Returns true if both handles share state.
    #[must_use]
    pub fn same_router(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn defaults(&self) -> RouterDefaults {
        let state = self.inner.state.read();
        RouterDefaults {
            cases: state.cases.clone(),
            json_finalizer: state.json_finalizer.clone(),
            preparer: state.preparer.clone(),
            rate_limit: state.rate_limit.clone(),
        }
    }

    /// Marks a model as bound, failing if one already is.
    pub(crate) fn bind_model(&self, name: &str) -> Result<()> {
        let mut model = self.inner.model.lock();
        if model.is_some() {
            return Err(EmissaryError::ModelAlreadyBound);
        }
        *model = Some(name.to_string());
        info!(model = %name, base_url = %self.base_url(), "model bound to router");
        Ok(())
    }

    /// Transport for a blocking call.
    pub(crate) fn transport(&self) -> Result<Arc<dyn Transport>> {
        let (base_url, manager, config) = self.transport_inputs();
        if let Some(transport) = manager.map(|m| m.get()).transpose()?.flatten() {
            check_base_url(transport.base_url(), &base_url)?;
            return Ok(transport);
        }

        let mut cached = self.inner.sync_transport.lock();
        if let Some((url, transport)) = cached.as_ref() {
            if *url == base_url {
                return Ok(Arc::clone(transport));
            }
        }
        debug!(base_url = %base_url, "creating blocking transport");
        let transport: Arc<dyn Transport> =
            Arc::new(ReqwestTransport::with_config(base_url.clone(), &config)?);
        *cached = Some((base_url, Arc::clone(&transport)));
        Ok(transport)
    }

    /// Transport for an async call.
    pub(crate) fn async_transport(&self) -> Result<Arc<dyn AsyncTransport>> {
        let (base_url, manager, config) = self.transport_inputs();
        if let Some(transport) = manager.map(|m| m.get_async()).transpose()?.flatten() {
            check_base_url(transport.base_url(), &base_url)?;
            return Ok(transport);
        }

        let mut cached = self.inner.async_transport.lock();
        if let Some((url, transport)) = cached.as_ref() {
            if *url == base_url {
                return Ok(Arc::clone(transport));
            }
        }
        debug!(base_url = %base_url, "creating async transport");
        let transport: Arc<dyn AsyncTransport> =
            Arc::new(AsyncReqwestTransport::with_config(base_url.clone(), &config)?);
        *cached = Some((base_url, Arc::clone(&transport)));
        Ok(transport)
    }

    fn transport_inputs(&self) -> (String, Option<Arc<TransportManager>>, TransportConfig) {
        let state = self.inner.state.read();
        (
            state.base_url(),
            state.manager.clone(),
            state.transport_config.clone(),
        )
    }
}

fn check_base_url(client: &str, router: &str) -> Result<()> {
    let client = normalize_url(client);
    let router = normalize_url(router);
    if client == router {
        Ok(())
    } else {
        Err(EmissaryError::BaseUrlMismatch { client, router })
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.read();
        f.debug_struct("Router")
            .field("base_url", &state.base_url())
            .field("rate_limit", &state.rate_limit)
            .field("manager", &state.manager.is_some())
            .field("cases", &state.cases)
            .field("model", &*self.inner.model.lock())
            .finish_non_exhaustive()
    }
}

/// Builder for [`Router`].
///
/// ```
/// use emissary::{Channel, Router};
/// use emissary_core::CaseConverter;
///
/// let router = Router::builder("https://api.example.com")
///     .case(Channel::Query, CaseConverter::camel())
///     .build()
///     .unwrap();
/// assert!(router.cases().get(Channel::Query).is_some());
///
/// assert!(Router::builder("https://api.example.com").port(70000).build().is_err());
/// ```
#[must_use]
pub struct RouterBuilder {
    state: RouterState,
    port: Option<u32>,
}

impl RouterBuilder {
    /// Creates a builder for `host`.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            state: RouterState::new(host.into()),
            port: None,
        }
    }

    /// Sets the port. Checked by [`build`](Self::build).
    pub fn port(mut self, port: u32) -> Self {
        self.port = Some(port);
        self
    }

    /// Sets the shared rate limit.
    pub fn rate_limit(mut self, rate_limit: RateLimit) -> Self {
        self.state.rate_limit = Some(Arc::new(rate_limit));
        self
    }

    /// Sets the transport manager.
    pub fn manager(mut self, manager: Arc<TransportManager>) -> Self {
        self.state.manager = Some(manager);
        self
    }

    /// Replaces every default case converter.
    pub fn cases(mut self, cases: CaseOverrides) -> Self {
        self.state.cases = cases;
        self
    }

    /// Sets the default converter of one channel.
    pub fn case(mut self, channel: Channel, converter: CaseConverter) -> Self {
        self.state.cases.set(channel, Some(converter));
        self
    }

    /// Sets the fallback converter.
    pub fn default_case(mut self, converter: CaseConverter) -> Self {
        self.state.cases.set_default(Some(converter));
        self
    }

    /// Sets the default JSON finalizer.
    pub fn json_finalizer(mut self, finalizer: JsonFinalizer) -> Self {
        self.state.json_finalizer = finalizer;
        self
    }

    /// Sets the default argument preparer.
    pub fn preparer(mut self, preparer: Preparer) -> Self {
        self.state.preparer = preparer;
        self
    }

    /// Sets the request timeout of lazily created transports.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.state.transport_config = self.state.transport_config.request_timeout(timeout);
        self
    }

    /// Builds the router.
    ///
    /// # Errors
    ///
    /// `InvalidPort` unless the port is within 1..=65535.
    pub fn build(mut self) -> Result<Router> {
        self.state.port = self.port.map(check_port).transpose()?;
        Ok(Router::from_state(self.state))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use emissary_client::TransportKind;
    use emissary_config::{CaseSettings, RateLimitSettings};
    use emissary_core::CaseName;
    use emissary_test::{MockAsyncTransport, MockResponse, MockTransport};

    #[test]
    fn test_base_url() {
        let router = Router::new("https://api.example.com/");
        assert_eq!(router.base_url(), "https://api.example.com");
        router.set_port(Some(8080)).unwrap();
        assert_eq!(router.base_url(), "https://api.example.com:8080");
        router.set_port(None).unwrap();
        assert_eq!(router.port(), None);
    }

    #[test]
    fn test_invalid_port() {
        let router = Router::new("https://api.example.com");
        assert!(matches!(
            router.set_port(Some(0)),
            Err(EmissaryError::InvalidPort { port: 0 })
        ));
        assert!(matches!(
            router.set_port(Some(65_536)),
            Err(EmissaryError::InvalidPort { port: 65_536 })
        ));
        assert!(router.set_port(Some(65_535)).is_ok());
    }

    #[test]
    fn test_route_rejects_unknown_method() {
        let router = Router::new("https://api.example.com");
        let err = router.route("FETCH", "/x").unwrap_err();
        assert_eq!(err.to_string(), "Invalid HTTP method: FETCH");
        assert!(router.route("patch", "/x").is_ok());
    }

    #[test]
    fn test_from_settings() {
        let settings = RouterSettings {
            host: "https://api.example.com".to_string(),
            port: Some(9000),
            rate_limit: Some(RateLimitSettings {
                calls: 5,
                period_secs: 2.0,
            }),
            cases: CaseSettings {
                query: Some(CaseName::Camel),
                ..CaseSettings::default()
            },
            timeout_secs: 5,
        };
        let router = Router::from_settings(&settings).unwrap();
        assert_eq!(router.base_url(), "https://api.example.com:9000");
        let limit = router.rate_limit().unwrap();
        assert_eq!(limit.calls(), 5);
        assert_eq!(limit.period(), Duration::from_secs(2));
        assert_eq!(
            router.cases().get(Channel::Query).unwrap().name(),
            "camel_case"
        );
    }

    #[test]
    fn test_from_settings_bad_rate_limit() {
        let settings = RouterSettings {
            rate_limit: Some(RateLimitSettings {
                calls: 1,
                period_secs: -1.0,
            }),
            ..RouterSettings::default()
        };
        assert!(matches!(
            Router::from_settings(&settings),
            Err(EmissaryError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_bind_model_once() {
        let router = Router::new("https://api.example.com");
        router.bind_model("User").unwrap();
        assert_eq!(router.model_name().as_deref(), Some("User"));
        assert!(matches!(
            router.bind_model("Post"),
            Err(EmissaryError::ModelAlreadyBound)
        ));
    }

    #[test]
    fn test_managed_transport_is_used() {
        let manager = Arc::new(TransportManager::new(false));
        manager
            .set(Arc::new(MockTransport::fixed(
                "HTTPS://API.example.com/",
                MockResponse::ok(),
            )))
            .unwrap();
        let router = Router::builder("https://api.example.com")
            .manager(Arc::clone(&manager))
            .build()
            .unwrap();
        let transport = router.transport().unwrap();
        assert_eq!(transport.base_url(), "HTTPS://API.example.com/");
    }

    #[test]
    fn test_managed_transport_base_url_mismatch() {
        let manager = Arc::new(TransportManager::new(false));
        manager
            .set_async(Arc::new(MockAsyncTransport::fixed(
                "https://other.example.com",
                MockResponse::ok(),
            )))
            .unwrap();
        let router = Router::builder("https://api.example.com")
            .manager(manager)
            .build()
            .unwrap();
        let err = router.async_transport().err().unwrap();
        assert_eq!(
            err.to_string(),
            "Client base url must be equal to Router base url (https://other.example.com != https://api.example.com)"
        );
    }

    #[test]
    fn test_required_manager_without_transport() {
        let manager = Arc::new(TransportManager::new(true));
        assert!(manager.is_empty(TransportKind::Sync));
        let router = Router::builder("https://api.example.com")
            .manager(manager)
            .build()
            .unwrap();
        assert!(matches!(
            router.transport().err().unwrap(),
            EmissaryError::ClientNotSet { .. }
        ));
    }

    #[test]
    fn test_clones_share_state() {
        let router = Router::new("https://api.example.com");
        let clone = router.clone();
        clone.set_case(Channel::Body, Some(CaseConverter::camel()));
        assert!(router.same_router(&clone));
        assert!(router.cases().get(Channel::Body).is_some());
        assert!(!router.same_router(&Router::new("https://api.example.com")));
    }
}
