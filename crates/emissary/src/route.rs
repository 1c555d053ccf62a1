//! Routes.
//!
//! A [`RouteBuilder`] collects a route's declaration; [`RouteBuilder::build`]
//! validates it into an immutable [`Route`]. Hooks attached after build
//! live behind a lock and are read once per call.

use crate::channels::{CaseConverters, CaseOverrides, Channel};
use crate::endpoint::{Endpoint, EndpointContext, FieldDecl, ResponseType};
use crate::hooks::{JsonFinalizer, Preparer, ResponseFinalizer};
use crate::model::ModelType;
use crate::receiver::{check_receiver, MethodType, Receiver};
use crate::requester::Requester;
use crate::response::ResponseValue;
use crate::router::Router;
use crate::Kwargs;
use emissary_core::{CaseConverter, HttpMethod, PathTemplate, Result};
use indexmap::IndexMap;
use parking_lot::RwLock;
use std::fmt;
use std::sync::Arc;

/// Declaration of one route.
///
/// Created by the verb methods of [`Router`].
#[must_use]
pub struct RouteBuilder {
    router: Router,
    method: HttpMethod,
    path: String,
    name: Option<String>,
    fields: IndexMap<String, FieldDecl>,
    response_type: Option<ResponseType>,
    method_type: MethodType,
    owner: Option<ModelType>,
    cases: CaseOverrides,
    skip_preparer: bool,
    skip_finalizer: bool,
    preparer: Option<Preparer>,
    finalizer: Option<ResponseFinalizer>,
}

impl RouteBuilder {
    pub(crate) fn new(router: Router, method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            router,
            method,
            path: path.into(),
            name: None,
            fields: IndexMap::new(),
            response_type: None,
            method_type: MethodType::Static,
            owner: None,
            cases: CaseOverrides::new(),
            skip_preparer: false,
            skip_finalizer: false,
            preparer: None,
            finalizer: None,
        }
    }

    /// Declares a field. Declaration order is kept.
    pub fn param(mut self, name: impl Into<String>, field: impl Into<FieldDecl>) -> Self {
        self.fields.insert(name.into(), field.into());
        self
    }

    /// Sets the response type.
    ///
    /// Without one, plain responses resolve as [`ResponseType::Json`] and a
    /// response finalizer's value is returned as is.
    pub fn returns(mut self, response_type: ResponseType) -> Self {
        self.response_type = Some(response_type);
        self
    }

    /// Sets how the route binds to its model.
    pub fn method_type(mut self, method_type: MethodType) -> Self {
        self.method_type = method_type;
        self
    }

    /// Sets the owning model.
    pub fn owner(mut self, owner: ModelType) -> Self {
        self.owner = Some(owner);
        self
    }

    /// Sets the name used in logs. Defaults to `METHOD path`.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Overrides the fallback converter for this route.
    pub fn default_case(mut self, converter: CaseConverter) -> Self {
        self.cases.set_default(Some(converter));
        self
    }

    /// Overrides the query key converter.
    pub fn query_case(self, converter: CaseConverter) -> Self {
        self.case(Channel::Query, converter)
    }

    /// Overrides the body key converter.
    pub fn body_case(self, converter: CaseConverter) -> Self {
        self.case(Channel::Body, converter)
    }

    /// Overrides the cookie name converter.
    pub fn cookie_case(self, converter: CaseConverter) -> Self {
        self.case(Channel::Cookie, converter)
    }

    /// Overrides the header name converter.
    pub fn header_case(self, converter: CaseConverter) -> Self {
        self.case(Channel::Header, converter)
    }

    /// Overrides the response key converter.
    pub fn response_case(self, converter: CaseConverter) -> Self {
        self.case(Channel::Response, converter)
    }

    fn case(mut self, channel: Channel, converter: CaseConverter) -> Self {
        self.cases.set(channel, Some(converter));
        self
    }

    /// Skips the router's argument preparer for this route.
    pub fn skip_preparer(mut self) -> Self {
        self.skip_preparer = true;
        self
    }

    /// Skips the router's JSON finalizer for this route.
    pub fn skip_finalizer(mut self) -> Self {
        self.skip_finalizer = true;
        self
    }

    /// Attaches a route-level argument preparer.
    pub fn prepare(mut self, preparer: Preparer) -> Self {
        self.preparer = Some(preparer);
        self
    }

    /// Attaches a response finalizer.
    pub fn finalize(mut self, finalizer: ResponseFinalizer) -> Self {
        self.finalizer = Some(finalizer);
        self
    }

    pub(crate) const fn router(&self) -> &Router {
        &self.router
    }

    pub(crate) fn set_owner_if_unset(&mut self, owner: &ModelType) {
        if self.owner.is_none() {
            self.owner = Some(owner.clone());
        }
    }

    /// Validates the declaration.
    ///
    /// # Errors
    ///
    /// Any build error of [`Endpoint::new`].
    pub fn build(self) -> Result<Arc<Route>> {
        let context = EndpointContext {
            method_type: self.method_type,
            owner: self.owner,
            has_finalizer: self.finalizer.is_some(),
        };
        let declared = self.response_type.is_some();
        let endpoint = Endpoint::new(
            &self.path,
            self.method,
            self.fields,
            self.response_type.unwrap_or(ResponseType::Json),
            &context,
        )?;
        let endpoint = if declared {
            endpoint
        } else {
            endpoint.with_undeclared_response()
        };
        let name = self
            .name
            .unwrap_or_else(|| format!("{} {}", self.method, self.path));
        Ok(Arc::new(Route {
            name,
            endpoint,
            method_type: self.method_type,
            cases: self.cases,
            skip_preparer: self.skip_preparer,
            skip_finalizer: self.skip_finalizer,
            hooks: RwLock::new(RouteHooks {
                preparer: self.preparer,
                finalizer: self.finalizer,
            }),
            router: self.router,
        }))
    }
}

impl fmt::Debug for RouteBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteBuilder")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("fields", &self.fields)
            .field("response_type", &self.response_type)
            .field("method_type", &self.method_type)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Default)]
struct RouteHooks {
    preparer: Option<Preparer>,
    finalizer: Option<ResponseFinalizer>,
}

/// A callable route.
///
/// Routes are shared behind `Arc` and safe to call concurrently. The
/// receiver of a call is passed explicitly, never stored on the route.
pub struct Route {
    name: String,
    endpoint: Endpoint,
    method_type: MethodType,
    cases: CaseOverrides,
    skip_preparer: bool,
    skip_finalizer: bool,
    hooks: RwLock<RouteHooks>,
    router: Router,
}

impl Route {
    /// Name used in logs.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The validated endpoint.
    #[must_use]
    pub const fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Path template.
    #[must_use]
    pub const fn path(&self) -> &PathTemplate {
        self.endpoint.path()
    }

    /// HTTP method.
    #[must_use]
    pub const fn method(&self) -> HttpMethod {
        self.endpoint.method()
    }

    /// How the route binds to its model.
    #[must_use]
    pub const fn method_type(&self) -> MethodType {
        self.method_type
    }

    /// The router the route was declared on.
    #[must_use]
    pub const fn router(&self) -> &Router {
        &self.router
    }

    /// Replaces the route-level argument preparer.
    pub fn prepare(&self, preparer: Preparer) {
        self.hooks.write().preparer = Some(preparer);
    }

    /// Replaces the response finalizer.
    pub fn finalize(&self, finalizer: ResponseFinalizer) {
        self.hooks.write().finalizer = Some(finalizer);
    }

    /// Calls a static route on the blocking path.
    ///
    /// # Errors
    ///
    /// Any error of the call pipeline, unchanged.
    pub fn call(&self, kwargs: &Kwargs) -> Result<ResponseValue> {
        self.call_with(None, kwargs)
    }

    /// Calls a class or instance route on the blocking path.
    ///
    /// # Errors
    ///
    /// `InvalidReceiver` if the receiver does not match the method type, or
    /// any error of the call pipeline.
    pub fn call_on(&self, receiver: &Receiver, kwargs: &Kwargs) -> Result<ResponseValue> {
        self.call_with(Some(receiver), kwargs)
    }

    /// Calls a static route on the async path.
    ///
    /// # Errors
    ///
    /// Any error of the call pipeline, unchanged.
    pub async fn call_async(&self, kwargs: &Kwargs) -> Result<ResponseValue> {
        self.call_with_async(None, kwargs).await
    }

    /// Calls a class or instance route on the async path.
    ///
    /// # Errors
    ///
    /// `InvalidReceiver` if the receiver does not match the method type, or
    /// any error of the call pipeline.
    pub async fn call_on_async(
        &self,
        receiver: &Receiver,
        kwargs: &Kwargs,
    ) -> Result<ResponseValue> {
        self.call_with_async(Some(receiver), kwargs).await
    }

    fn call_with(&self, receiver: Option<&Receiver>, kwargs: &Kwargs) -> Result<ResponseValue> {
        let requester = self.requester(receiver)?;
        let transport = self.router.transport()?;
        requester.request(transport.as_ref(), kwargs)
    }

    async fn call_with_async(
        &self,
        receiver: Option<&Receiver>,
        kwargs: &Kwargs,
    ) -> Result<ResponseValue> {
        let requester = self.requester(receiver)?;
        let transport = self.router.async_transport()?;
        requester.request_async(transport.as_ref(), kwargs).await
    }

    fn requester<'a>(&'a self, receiver: Option<&'a Receiver>) -> Result<Requester<'a>> {
        check_receiver(self.method_type, receiver)?;

        let defaults = self.router.defaults();
        let hooks = self.hooks.read();

        let mut preparers = Vec::with_capacity(2);
        if !self.skip_preparer && !defaults.preparer.is_identity() {
            preparers.push(defaults.preparer);
        }
        preparers.extend(hooks.preparer.clone());

        let json_finalizer = if self.skip_finalizer {
            JsonFinalizer::identity()
        } else {
            defaults.json_finalizer
        };

        Ok(Requester {
            route: &self.name,
            endpoint: &self.endpoint,
            cases: CaseConverters::resolve(&self.cases, &defaults.cases),
            preparers,
            finalizer: hooks.finalizer.clone(),
            json_finalizer,
            rate_limit: defaults.rate_limit,
            receiver,
        })
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("name", &self.name)
            .field("endpoint", &self.endpoint)
            .field("method_type", &self.method_type)
            .field("skip_preparer", &self.skip_preparer)
            .field("skip_finalizer", &self.skip_finalizer)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use emissary_client::TransportManager;
    use emissary_core::{EmissaryError, Param, Schema};
    use emissary_test::{MockResponse, MockTransport};
    use serde_json::json;

    fn mocked(response: MockResponse) -> (Router, Arc<MockTransport>) {
        let mock = Arc::new(MockTransport::fixed("https://api.example.com", response));
        let manager = Arc::new(TransportManager::new(true));
        manager.set(mock.clone()).unwrap();
        let router = Router::builder("https://api.example.com")
            .manager(manager)
            .build()
            .unwrap();
        (router, mock)
    }

    #[test]
    fn test_default_name() {
        let router = Router::new("https://api.example.com");
        let route = router.delete("/users/{id}").param("id", Param::path(Schema::integer()));
        let route = route.build().unwrap();
        assert_eq!(route.name(), "DELETE /users/{id}");
        assert_eq!(route.method(), HttpMethod::Delete);
        assert_eq!(route.method_type(), MethodType::Static);

        let named = router.get("/me").name("whoami").build().unwrap();
        assert_eq!(named.name(), "whoami");
    }

    #[test]
    fn test_route_case_overrides_router() {
        let (router, mock) = mocked(MockResponse::json(&json!({})));
        router.set_case(Channel::Query, Some(CaseConverter::kebab()));
        let route = router
            .get("/search")
            .param("page_size", Schema::integer())
            .query_case(CaseConverter::camel())
            .build()
            .unwrap();

        route.call(&Kwargs::new().arg("page_size", 10)).unwrap();
        let request = mock.last_request().unwrap();
        assert_eq!(request.params["pageSize"], 10);
    }

    #[test]
    fn test_finalize_after_build() {
        let (router, _mock) = mocked(MockResponse::json(&json!({"count": 3})));
        let route = router.get("/stats").build().unwrap();
        route.finalize(ResponseFinalizer::new(|response| {
            Ok(ResponseValue::Custom(response.json()?["count"].clone()))
        }));
        let value = route.call(&Kwargs::new()).unwrap();
        assert_eq!(value, ResponseValue::Custom(json!(3)));
    }

    #[test]
    fn test_finalizer_value_kept_without_declared_response() {
        let (router, _mock) = mocked(MockResponse::json(&json!({"count": 3})));
        let route = router
            .get("/stats")
            .finalize(ResponseFinalizer::new(|response| {
                Ok(ResponseValue::Custom(response.json()?["count"].clone()))
            }))
            .build()
            .unwrap();
        assert!(!route.endpoint().declares_response());
        assert_eq!(
            route.call(&Kwargs::new()).unwrap(),
            ResponseValue::Custom(json!(3))
        );
    }

    #[test]
    fn test_declared_response_checks_finalizer_value() {
        let (router, _mock) = mocked(MockResponse::json(&json!({"count": 3})));
        let route = router
            .get("/stats")
            .returns(ResponseType::Json)
            .finalize(ResponseFinalizer::new(|response| {
                Ok(ResponseValue::Custom(response.json()?["count"].clone()))
            }))
            .build()
            .unwrap();
        assert!(route.endpoint().declares_response());
        let err = route.call(&Kwargs::new()).unwrap_err();
        assert!(matches!(err, EmissaryError::ResponseValidation { .. }));
    }

    #[test]
    fn test_receiver_checked_before_dispatch() {
        let (router, mock) = mocked(MockResponse::ok());
        let route = router.get("/ping").build().unwrap();
        let err = route.call_on(&Receiver::Class, &Kwargs::new()).unwrap_err();
        assert!(matches!(err, EmissaryError::InvalidReceiver { .. }));
        assert_eq!(mock.request_count(), 0);
    }
}
