//! User hooks.
//!
//! Three hooks can intercept a call:
//!
//! - [`Preparer`] rewrites the [`Args`] envelope before dispatch. Routers
//!   carry one, routes may add a second that runs after it.
//! - [`JsonFinalizer`] post-processes every decoded JSON body.
//! - [`ResponseFinalizer`] turns the decorated response into the call's
//!   [`ResponseValue`], replacing the built-in resolution.
//!
//! Preparers and response finalizers are either blocking or asynchronous.
//! Asynchronous hooks only run on the async call path; the blocking path
//! rejects them with `AsyncHookMisuse`.

use crate::receiver::Receiver;
use crate::response::{DecoratedResponse, ResponseValue};
use emissary_core::{Args, EmissaryError, Result};
use futures_util::future::{self, BoxFuture, FutureExt};
use serde_json::Value;
use std::borrow::Cow;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

type SyncHook<I, O> = Arc<dyn Fn(I, Option<&Receiver>) -> Result<O> + Send + Sync>;
type AsyncHook<I, O> = Arc<dyn Fn(I, Option<Receiver>) -> BoxFuture<'static, Result<O>> + Send + Sync>;

/// A hook body, blocking or asynchronous.
enum Stage<I, O> {
    Sync(SyncHook<I, O>),
    Async(AsyncHook<I, O>),
}

impl<I, O> Clone for Stage<I, O> {
    fn clone(&self) -> Self {
        match self {
            Self::Sync(func) => Self::Sync(Arc::clone(func)),
            Self::Async(func) => Self::Async(Arc::clone(func)),
        }
    }
}

impl<I: Send + 'static, O: Send + 'static> Stage<I, O> {
    fn plain<F>(func: F) -> Self
    where
        F: Fn(I) -> Result<O> + Send + Sync + 'static,
    {
        Self::Sync(Arc::new(move |input: I, _: Option<&Receiver>| func(input)))
    }

    fn bound<F>(func: F) -> Self
    where
        F: Fn(I, &Receiver) -> Result<O> + Send + Sync + 'static,
    {
        Self::Sync(Arc::new(move |input: I, receiver: Option<&Receiver>| {
            receiver.map_or_else(|| Err(missing_receiver()), |r| func(input, r))
        }))
    }

    fn plain_async<F, Fut>(func: F) -> Self
    where
        F: Fn(I) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<O>> + Send + 'static,
    {
        Self::Async(Arc::new(move |input: I, _: Option<Receiver>| {
            func(input).boxed()
        }))
    }

    fn bound_async<F, Fut>(func: F) -> Self
    where
        F: Fn(I, Receiver) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<O>> + Send + 'static,
    {
        Self::Async(Arc::new(move |input: I, receiver: Option<Receiver>| {
            match receiver {
                Some(receiver) => func(input, receiver).boxed(),
                None => future::ready(Err(missing_receiver())).boxed(),
            }
        }))
    }

    const fn is_async(&self) -> bool {
        matches!(self, Self::Async(_))
    }

    fn run(&self, name: &str, input: I, receiver: Option<&Receiver>) -> Result<O> {
        match self {
            Self::Sync(func) => func(input, receiver),
            Self::Async(_) => Err(EmissaryError::async_hook(name)),
        }
    }

    async fn run_async(&self, input: I, receiver: Option<&Receiver>) -> Result<O> {
        match self {
            Self::Sync(func) => func(input, receiver),
            Self::Async(func) => func(input, receiver.cloned()).await,
        }
    }
}

fn missing_receiver() -> EmissaryError {
    EmissaryError::InvalidReceiver {
        message: "hook expects a receiver but the call has none".to_string(),
    }
}

/// Rewrites the request envelope before dispatch.
///
/// # Example
///
/// ```
/// use emissary::Preparer;
/// use serde_json::json;
///
/// let auth = Preparer::new(|mut args| {
///     args.headers.insert("Authorization".into(), json!("Bearer token"));
///     Ok(args)
/// });
/// assert!(!auth.is_async());
///
/// let audit = Preparer::new_async(|args| async move { Ok(args) }).named("audit");
/// assert!(audit.is_async());
/// assert_eq!(audit.name(), "audit");
/// ```
#[derive(Clone)]
pub struct Preparer {
    name: Cow<'static, str>,
    stage: Stage<Args, Args>,
    takes_receiver: bool,
    identity: bool,
}

impl Preparer {
    fn from_stage(stage: Stage<Args, Args>, takes_receiver: bool) -> Self {
        Self {
            name: Cow::Borrowed("prepare_args"),
            stage,
            takes_receiver,
            identity: false,
        }
    }

    /// A blocking preparer.
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(Args) -> Result<Args> + Send + Sync + 'static,
    {
        Self::from_stage(Stage::plain(func), false)
    }

    /// A blocking preparer that also sees the call's receiver.
    pub fn with_receiver<F>(func: F) -> Self
    where
        F: Fn(Args, &Receiver) -> Result<Args> + Send + Sync + 'static,
    {
        Self::from_stage(Stage::bound(func), true)
    }

    /// An asynchronous preparer.
    pub fn new_async<F, Fut>(func: F) -> Self
    where
        F: Fn(Args) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Args>> + Send + 'static,
    {
        Self::from_stage(Stage::plain_async(func), false)
    }

    /// An asynchronous preparer that also sees the call's receiver.
    pub fn with_receiver_async<F, Fut>(func: F) -> Self
    where
        F: Fn(Args, Receiver) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Args>> + Send + 'static,
    {
        Self::from_stage(Stage::bound_async(func), true)
    }

    /// Returns its input unchanged.
    #[must_use]
    pub fn identity() -> Self {
        Self {
            name: Cow::Borrowed("identity"),
            stage: Stage::plain(Ok),
            takes_receiver: false,
            identity: true,
        }
    }

    /// Sets the name reported in errors.
    #[must_use]
    pub fn named(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.name = name.into();
        self
    }

    /// Hook name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns true for asynchronous preparers.
    #[must_use]
    pub const fn is_async(&self) -> bool {
        self.stage.is_async()
    }

    /// Returns true if the preparer needs the call's receiver.
    #[must_use]
    pub const fn takes_receiver(&self) -> bool {
        self.takes_receiver
    }

    /// Returns true for [`Preparer::identity`].
    #[must_use]
    pub const fn is_identity(&self) -> bool {
        self.identity
    }

    /// Runs a blocking preparer. Fails with `AsyncHookMisuse` if asynchronous.
    pub fn call(&self, args: Args, receiver: Option<&Receiver>) -> Result<Args> {
        self.stage.run(&self.name, args, receiver)
    }

    /// Runs the preparer, awaiting it if asynchronous.
    pub async fn call_async(&self, args: Args, receiver: Option<&Receiver>) -> Result<Args> {
        self.stage.run_async(args, receiver).await
    }
}

impl Default for Preparer {
    fn default() -> Self {
        Self::identity()
    }
}

impl fmt::Debug for Preparer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Preparer")
            .field("name", &self.name)
            .field("async", &self.is_async())
            .field("takes_receiver", &self.takes_receiver)
            .finish()
    }
}

/// Produces a route's result from its decorated response.
///
/// The value is still checked against the route's declared response type.
///
/// ```
/// use emissary::{ResponseFinalizer, ResponseValue};
///
/// let status = ResponseFinalizer::new(|response| {
///     Ok(ResponseValue::Custom(response.status_code().into()))
/// });
/// assert!(!status.is_async());
/// ```
#[derive(Clone)]
pub struct ResponseFinalizer {
    name: Cow<'static, str>,
    stage: Stage<DecoratedResponse, ResponseValue>,
    takes_receiver: bool,
}

impl ResponseFinalizer {
    fn from_stage(stage: Stage<DecoratedResponse, ResponseValue>, takes_receiver: bool) -> Self {
        Self {
            name: Cow::Borrowed("finalize"),
            stage,
            takes_receiver,
        }
    }

    /// A blocking finalizer.
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(DecoratedResponse) -> Result<ResponseValue> + Send + Sync + 'static,
    {
        Self::from_stage(Stage::plain(func), false)
    }

    /// A blocking finalizer that also sees the call's receiver.
    pub fn with_receiver<F>(func: F) -> Self
    where
        F: Fn(DecoratedResponse, &Receiver) -> Result<ResponseValue> + Send + Sync + 'static,
    {
        Self::from_stage(Stage::bound(func), true)
    }

    /// An asynchronous finalizer.
    pub fn new_async<F, Fut>(func: F) -> Self
    where
        F: Fn(DecoratedResponse) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<ResponseValue>> + Send + 'static,
    {
        Self::from_stage(Stage::plain_async(func), false)
    }

    /// An asynchronous finalizer that also sees the call's receiver.
    pub fn with_receiver_async<F, Fut>(func: F) -> Self
    where
        F: Fn(DecoratedResponse, Receiver) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<ResponseValue>> + Send + 'static,
    {
        Self::from_stage(Stage::bound_async(func), true)
    }

    /// Sets the name reported in errors.
    #[must_use]
    pub fn named(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.name = name.into();
        self
    }

    /// Hook name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns true for asynchronous finalizers.
    #[must_use]
    pub const fn is_async(&self) -> bool {
        self.stage.is_async()
    }

    /// Returns true if the finalizer needs the call's receiver.
    #[must_use]
    pub const fn takes_receiver(&self) -> bool {
        self.takes_receiver
    }

    /// Runs a blocking finalizer. Fails with `AsyncHookMisuse` if asynchronous.
    pub fn call(
        &self,
        response: DecoratedResponse,
        receiver: Option<&Receiver>,
    ) -> Result<ResponseValue> {
        self.stage.run(&self.name, response, receiver)
    }

    /// Runs the finalizer, awaiting it if asynchronous.
    pub async fn call_async(
        &self,
        response: DecoratedResponse,
        receiver: Option<&Receiver>,
    ) -> Result<ResponseValue> {
        self.stage.run_async(response, receiver).await
    }
}

impl fmt::Debug for ResponseFinalizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResponseFinalizer")
            .field("name", &self.name)
            .field("async", &self.is_async())
            .field("takes_receiver", &self.takes_receiver)
            .finish()
    }
}

/// Post-processes decoded JSON bodies, e.g. to unwrap an envelope.
///
/// ```
/// use emissary::JsonFinalizer;
/// use serde_json::json;
///
/// let unwrap = JsonFinalizer::new(|mut body| Ok(body["data"].take()));
/// assert_eq!(unwrap.call(json!({"data": [1, 2]})).unwrap(), json!([1, 2]));
/// ```
#[derive(Clone, Default)]
pub struct JsonFinalizer {
    func: Option<Arc<dyn Fn(Value) -> Result<Value> + Send + Sync>>,
}

impl JsonFinalizer {
    /// Wraps a finalizer function.
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(Value) -> Result<Value> + Send + Sync + 'static,
    {
        Self {
            func: Some(Arc::new(func)),
        }
    }

    /// Returns its input unchanged.
    #[must_use]
    pub fn identity() -> Self {
        Self { func: None }
    }

    /// Returns true for [`JsonFinalizer::identity`].
    #[must_use]
    pub const fn is_identity(&self) -> bool {
        self.func.is_none()
    }

    /// Applies the finalizer.
    pub fn call(&self, value: Value) -> Result<Value> {
        match &self.func {
            Some(func) => func(value),
            None => Ok(value),
        }
    }
}

impl fmt::Debug for JsonFinalizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonFinalizer")
            .field("identity", &self.is_identity())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn args() -> Args {
        Args::new("/users")
    }

    #[test]
    fn test_sync_preparer() {
        let preparer = Preparer::new(|mut args| {
            args.params.insert("page".into(), json!(2));
            Ok(args)
        });
        let args = preparer.call(args(), None).unwrap();
        assert_eq!(args.params["page"], 2);
    }

    #[test]
    fn test_async_preparer_on_sync_path() {
        let preparer = Preparer::new_async(|args| async move { Ok(args) }).named("refresh_token");
        let err = preparer.call(args(), None).unwrap_err();
        assert_eq!(
            err.to_string(),
            "If refresh_token is async, the route must be called asynchronously"
        );
    }

    #[tokio::test]
    async fn test_async_preparer() {
        let preparer = Preparer::new_async(|mut args: Args| async move {
            args.url.push_str("/me");
            Ok(args)
        });
        let args = preparer.call_async(args(), None).await.unwrap();
        assert_eq!(args.url, "/users/me");
    }

    #[tokio::test]
    async fn test_sync_preparer_on_async_path() {
        let preparer = Preparer::identity();
        assert!(preparer.is_identity());
        let args = preparer.call_async(args(), None).await.unwrap();
        assert_eq!(args.url, "/users");
    }

    #[test]
    fn test_receiver_preparer() {
        let preparer = Preparer::with_receiver(|mut args, receiver: &Receiver| {
            if let Some(instance) = receiver.as_instance() {
                args.url = format!("{}/{}", args.url, instance["id"]);
            }
            Ok(args)
        });
        assert!(preparer.takes_receiver());

        let receiver = Receiver::Instance(json!({"id": 7}));
        let args = preparer.call(args(), Some(&receiver)).unwrap();
        assert_eq!(args.url, "/users/7");

        let err = preparer.call(Args::new("/users"), None).unwrap_err();
        assert!(matches!(err, EmissaryError::InvalidReceiver { .. }));
    }

    #[tokio::test]
    async fn test_async_receiver_preparer_without_receiver() {
        let preparer =
            Preparer::with_receiver_async(|args, _receiver: Receiver| async move { Ok(args) });
        let err = preparer.call_async(args(), None).await.unwrap_err();
        assert!(matches!(err, EmissaryError::InvalidReceiver { .. }));
    }

    #[test]
    fn test_hook_errors_propagate() {
        let preparer = Preparer::new(|_| Err(EmissaryError::hook(anyhow::anyhow!("no token"))));
        let err = preparer.call(args(), None).unwrap_err();
        assert_eq!(err.to_string(), "Hook error: no token");
    }

    #[test]
    fn test_json_finalizer_identity() {
        let finalizer = JsonFinalizer::default();
        assert!(finalizer.is_identity());
        assert_eq!(finalizer.call(json!({"a": 1})).unwrap(), json!({"a": 1}));
    }

    #[test]
    fn test_debug_output() {
        let preparer = Preparer::identity();
        assert!(format!("{preparer:?}").contains("identity"));
        let finalizer = ResponseFinalizer::new(|_| Ok(ResponseValue::None)).named("drop");
        assert!(format!("{finalizer:?}").contains("drop"));
    }
}
