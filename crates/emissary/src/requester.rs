//! One routed call, from arguments to resolved value.
//!
//! A call moves through `BUILDING`, `PREPARING`, `DISPATCHING` and
//! `FINALIZING`. Any error ends the call and is returned as is.

use crate::channels::{CaseConverters, Channel};
use crate::endpoint::Endpoint;
use crate::hooks::{JsonFinalizer, Preparer, ResponseFinalizer};
use crate::receiver::Receiver;
use crate::response::{DecoratedResponse, ResponseValue};
use crate::Kwargs;
use emissary_client::{AsyncTransport, RateLimit, Response, Transport};
use emissary_core::{Args, EmissaryError, Result, TransportRequest};
use std::sync::Arc;
use tracing::{debug, warn};

/// Everything one call needs, resolved from the route and its router.
pub(crate) struct Requester<'a> {
    pub(crate) route: &'a str,
    pub(crate) endpoint: &'a Endpoint,
    pub(crate) cases: CaseConverters,
    pub(crate) preparers: Vec<Preparer>,
    pub(crate) finalizer: Option<ResponseFinalizer>,
    pub(crate) json_finalizer: JsonFinalizer,
    pub(crate) rate_limit: Option<Arc<RateLimit>>,
    pub(crate) receiver: Option<&'a Receiver>,
}

impl Requester<'_> {
    /// Runs the call on the blocking path.
    pub(crate) fn request(&self, transport: &dyn Transport, kwargs: &Kwargs) -> Result<ResponseValue> {
        self.ensure_blocking_hooks()?;

        let mut args = self.build(kwargs)?;

        debug!(route = %self.route, state = "PREPARING", hooks = self.preparers.len());
        for preparer in &self.preparers {
            args = preparer.call(args, self.receiver)?;
        }

        let request = args.into_request(self.endpoint.method())?;
        if let Some(limit) = &self.rate_limit {
            limit.wait_for_slot();
        }
        self.log_dispatch(&request);
        let response = transport.request(&request)?;
        self.check_status(&response)?;

        let decorated = self.decorate(response);
        let value = match &self.finalizer {
            Some(finalizer) => finalizer.call(decorated, self.receiver)?,
            None => self.endpoint.resolve(&decorated, self.receiver)?,
        };
        self.endpoint.check_result(&value, self.finalizer.is_some())?;
        Ok(value)
    }

    /// Runs the call on the async path.
    pub(crate) async fn request_async(
        &self,
        transport: &dyn AsyncTransport,
        kwargs: &Kwargs,
    ) -> Result<ResponseValue> {
        let mut args = self.build(kwargs)?;

        debug!(route = %self.route, state = "PREPARING", hooks = self.preparers.len());
        for preparer in &self.preparers {
            args = preparer.call_async(args, self.receiver).await?;
        }

        let request = args.into_request(self.endpoint.method())?;
        if let Some(limit) = &self.rate_limit {
            limit.wait_for_slot_async().await;
        }
        self.log_dispatch(&request);
        let response = transport.request(&request).await?;
        self.check_status(&response)?;

        let decorated = self.decorate(response);
        let value = match &self.finalizer {
            Some(finalizer) => finalizer.call_async(decorated, self.receiver).await?,
            None => self.endpoint.resolve(&decorated, self.receiver)?,
        };
        self.endpoint.check_result(&value, self.finalizer.is_some())?;
        Ok(value)
    }

    fn ensure_blocking_hooks(&self) -> Result<()> {
        if let Some(preparer) = self.preparers.iter().find(|p| p.is_async()) {
            return Err(EmissaryError::async_hook(preparer.name()));
        }
        match &self.finalizer {
            Some(finalizer) if finalizer.is_async() => {
                Err(EmissaryError::async_hook(finalizer.name()))
            }
            _ => Ok(()),
        }
    }

    fn build(&self, kwargs: &Kwargs) -> Result<Args> {
        debug!(route = %self.route, state = "BUILDING", arguments = kwargs.len());
        self.endpoint.get_args(kwargs, &self.cases)
    }

    fn log_dispatch(&self, request: &TransportRequest) {
        debug!(
            route = %self.route,
            state = "DISPATCHING",
            method = %request.method,
            url = %request.url
        );
    }

    fn check_status(&self, response: &Response) -> Result<()> {
        if let Err(err) = response.raise_for_status() {
            warn!(route = %self.route, status = response.status_code(), error = %err, "request failed");
            return Err(err);
        }
        debug!(route = %self.route, state = "FINALIZING", status = response.status_code());
        Ok(())
    }

    fn decorate(&self, response: Response) -> DecoratedResponse {
        DecoratedResponse::new(
            response,
            self.cases.get(Channel::Response).clone(),
            self.json_finalizer.clone(),
        )
    }
}
