//! Declarative models.
//!
//! A model groups the routes of one resource type and supplies router-wide
//! hooks. Binding is an explicit pass: list the hooks and routes on a
//! [`ModelBuilder`], then [`bind`](ModelBuilder::bind) it to a router to get
//! an immutable table of routes.

use crate::hooks::{JsonFinalizer, Preparer};
use crate::receiver::MethodType;
use crate::route::{Route, RouteBuilder};
use crate::router::Router;
use crate::Channel;
use emissary_core::{CaseConverter, EmissaryError, Result, Schema};
use indexmap::IndexMap;
use std::sync::Arc;
use tracing::info;

/// A model's name and record schema.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelType {
    name: String,
    schema: Schema,
}

impl ModelType {
    /// Creates a model type.
    pub fn new(name: impl Into<String>, schema: Schema) -> Self {
        Self {
            name: name.into(),
            schema,
        }
    }

    /// Model name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Record schema of one instance.
    #[must_use]
    pub const fn schema(&self) -> &Schema {
        &self.schema
    }
}

/// A router-wide hook supplied by a model.
#[derive(Debug, Clone)]
pub enum ModelHook {
    /// `__finalize_json__`
    FinalizeJson(JsonFinalizer),
    /// `__prepare_args__`
    PrepareArgs(Preparer),
    /// `__default_case__`
    DefaultCase(CaseConverter),
    /// `__query_case__`
    QueryCase(CaseConverter),
    /// `__body_case__`
    BodyCase(CaseConverter),
    /// `__cookie_case__`
    CookieCase(CaseConverter),
    /// `__header_case__`
    HeaderCase(CaseConverter),
    /// `__response_case__`
    ResponseCase(CaseConverter),
}

impl ModelHook {
    /// Hook name as reported in errors.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::FinalizeJson(_) => "__finalize_json__",
            Self::PrepareArgs(_) => "__prepare_args__",
            Self::DefaultCase(_) => "__default_case__",
            Self::QueryCase(_) => "__query_case__",
            Self::BodyCase(_) => "__body_case__",
            Self::CookieCase(_) => "__cookie_case__",
            Self::HeaderCase(_) => "__header_case__",
            Self::ResponseCase(_) => "__response_case__",
        }
    }

    fn install(self, router: &Router) {
        match self {
            Self::FinalizeJson(finalizer) => router.set_json_finalizer(finalizer),
            Self::PrepareArgs(preparer) => router.set_preparer(preparer),
            Self::DefaultCase(converter) => router.set_default_case(Some(converter)),
            Self::QueryCase(converter) => router.set_case(Channel::Query, Some(converter)),
            Self::BodyCase(converter) => router.set_case(Channel::Body, Some(converter)),
            Self::CookieCase(converter) => router.set_case(Channel::Cookie, Some(converter)),
            Self::HeaderCase(converter) => router.set_case(Channel::Header, Some(converter)),
            Self::ResponseCase(converter) => router.set_case(Channel::Response, Some(converter)),
        }
    }
}

/// Collects a model's hooks and routes before binding.
///
/// # Example
///
/// ```
/// use emissary::{MethodType, Model, ModelHook, ModelType, ResponseType, Router};
/// use emissary_core::{CaseConverter, Param, Schema};
///
/// let router = Router::new("https://api.example.com");
/// let user = ModelType::new(
///     "User",
///     Schema::record("User").field("id", Schema::integer()).field("name", Schema::string()),
/// );
///
/// let model = Model::builder(user)
///     .hook(ModelHook::QueryCase(CaseConverter::camel()), MethodType::Class)
///     .unwrap()
///     .route(
///         "get",
///         router
///             .get("/users/{id}")
///             .param("id", Param::path(Schema::integer()))
///             .method_type(MethodType::Class)
///             .returns(ResponseType::SelfRecord),
///     )
///     .bind(&router)
///     .unwrap();
///
/// assert!(model.route("get").is_some());
/// assert_eq!(router.model_name().as_deref(), Some("User"));
/// ```
#[derive(Debug)]
#[must_use]
pub struct ModelBuilder {
    model_type: ModelType,
    hooks: Vec<ModelHook>,
    routes: Vec<(String, RouteBuilder)>,
}

impl ModelBuilder {
    /// Adds a hook declared at the given level.
    ///
    /// # Errors
    ///
    /// `InvalidHookOwner` if the hook is an instance method, or an argument
    /// preparer that needs a receiver.
    pub fn hook(mut self, hook: ModelHook, owner: MethodType) -> Result<Self> {
        let needs_receiver = matches!(&hook, ModelHook::PrepareArgs(p) if p.takes_receiver());
        if owner == MethodType::Instance || needs_receiver {
            return Err(EmissaryError::InvalidHookOwner {
                hook: hook.name().to_string(),
            });
        }
        self.hooks.push(hook);
        Ok(self)
    }

    /// Adds a route. The model becomes its owner unless one is set.
    pub fn route(mut self, name: impl Into<String>, mut route: RouteBuilder) -> Self {
        route.set_owner_if_unset(&self.model_type);
        self.routes.push((name.into(), route));
        self
    }

    /// Binds the model to `router`: builds every route, then installs the
    /// hooks as router defaults.
    ///
    /// # Errors
    ///
    /// - `InvalidParameter` if a route was declared on another router
    /// - any build error of a route
    /// - `ModelAlreadyBound` if the router already has a model
    pub fn bind(self, router: &Router) -> Result<Model> {
        let mut routes = IndexMap::with_capacity(self.routes.len());
        for (name, builder) in self.routes {
            if !builder.router().same_router(router) {
                return Err(EmissaryError::invalid_parameter(
                    name,
                    "route belongs to a different router",
                ));
            }
            routes.insert(name, builder.build()?);
        }

        router.bind_model(self.model_type.name())?;
        let hook_count = self.hooks.len();
        for hook in self.hooks {
            hook.install(router);
        }
        info!(
            model = %self.model_type.name(),
            routes = routes.len(),
            hooks = hook_count,
            "model routes registered"
        );

        Ok(Model {
            model_type: self.model_type,
            routes,
        })
    }
}

/// A bound model: its type and its routes by name.
#[derive(Debug)]
pub struct Model {
    model_type: ModelType,
    routes: IndexMap<String, Arc<Route>>,
}

impl Model {
    /// Starts declaring a model.
    pub fn builder(model_type: ModelType) -> ModelBuilder {
        ModelBuilder {
            model_type,
            hooks: Vec::new(),
            routes: Vec::new(),
        }
    }

    /// The model type.
    #[must_use]
    pub const fn model_type(&self) -> &ModelType {
        &self.model_type
    }

    /// Looks up a route by name.
    #[must_use]
    pub fn route(&self, name: &str) -> Option<&Arc<Route>> {
        self.routes.get(name)
    }

    /// Routes in declaration order.
    #[must_use]
    pub const fn routes(&self) -> &IndexMap<String, Arc<Route>> {
        &self.routes
    }
}
