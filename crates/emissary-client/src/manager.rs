//! Transport manager.
//!
//! A [`TransportManager`] holds at most one blocking and one async transport.
//! Routers consult it before falling back to a transport of their own.

use crate::transport::{AsyncTransport, Transport, TransportKind};
use emissary_core::{EmissaryError, Result};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

/// Single-slot holder for one transport of each kind.
///
/// # Example
///
/// ```no_run
/// use emissary_client::{ReqwestTransport, TransportKind, TransportManager};
/// use std::sync::Arc;
///
/// let manager = TransportManager::new(false);
/// manager.set(Arc::new(ReqwestTransport::new("https://api.example.com").unwrap())).unwrap();
/// assert!(!manager.is_empty(TransportKind::Sync));
///
/// // A second transport of the same kind is rejected until the first is popped.
/// assert!(manager.set(Arc::new(ReqwestTransport::new("https://api.example.com").unwrap())).is_err());
/// manager.pop().unwrap();
/// assert!(manager.is_empty(TransportKind::Sync));
/// ```
pub struct TransportManager {
    sync_slot: Mutex<Option<Arc<dyn Transport>>>,
    async_slot: Mutex<Option<Arc<dyn AsyncTransport>>>,
    required: bool,
}

impl TransportManager {
    /// Creates an empty manager.
    ///
    /// When `required` is true, [`get`](Self::get) and
    /// [`get_async`](Self::get_async) fail on an empty slot instead of
    /// returning `None`.
    pub fn new(required: bool) -> Self {
        Self {
            sync_slot: Mutex::new(None),
            async_slot: Mutex::new(None),
            required,
        }
    }

    /// Whether reading an empty slot is an error.
    pub fn is_required(&self) -> bool {
        self.required
    }

    /// Stores the blocking transport; fails with `CollectionLimit` if one is set.
    pub fn set(&self, transport: Arc<dyn Transport>) -> Result<()> {
        let mut slot = self.sync_slot.lock();
        if slot.is_some() {
            return Err(EmissaryError::CollectionLimit);
        }
        *slot = Some(transport);
        Ok(())
    }

    /// Stores the async transport; fails with `CollectionLimit` if one is set.
    pub fn set_async(&self, transport: Arc<dyn AsyncTransport>) -> Result<()> {
        let mut slot = self.async_slot.lock();
        if slot.is_some() {
            return Err(EmissaryError::CollectionLimit);
        }
        *slot = Some(transport);
        Ok(())
    }

    /// Removes and returns the blocking transport.
    pub fn pop(&self) -> Result<Arc<dyn Transport>> {
        self.sync_slot
            .lock()
            .take()
            .ok_or_else(|| not_set(TransportKind::Sync))
    }

    /// Removes and returns the async transport.
    pub fn pop_async(&self) -> Result<Arc<dyn AsyncTransport>> {
        self.async_slot
            .lock()
            .take()
            .ok_or_else(|| not_set(TransportKind::Async))
    }

    /// Returns the blocking transport without removing it.
    pub fn get(&self) -> Result<Option<Arc<dyn Transport>>> {
        let transport = self.sync_slot.lock().clone();
        if transport.is_none() && self.required {
            return Err(not_set(TransportKind::Sync));
        }
        Ok(transport)
    }

    /// Returns the async transport without removing it.
    pub fn get_async(&self) -> Result<Option<Arc<dyn AsyncTransport>>> {
        let transport = self.async_slot.lock().clone();
        if transport.is_none() && self.required {
            return Err(not_set(TransportKind::Async));
        }
        Ok(transport)
    }

    /// Returns true if the slot of `kind` is empty.
    pub fn is_empty(&self, kind: TransportKind) -> bool {
        match kind {
            TransportKind::Sync => self.sync_slot.lock().is_none(),
            TransportKind::Async => self.async_slot.lock().is_none(),
        }
    }
}

impl Default for TransportManager {
    fn default() -> Self {
        Self::new(true)
    }
}

impl fmt::Debug for TransportManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportManager")
            .field("sync", &!self.is_empty(TransportKind::Sync))
            .field("async", &!self.is_empty(TransportKind::Async))
            .field("required", &self.required)
            .finish()
    }
}

fn not_set(kind: TransportKind) -> EmissaryError {
    EmissaryError::ClientNotSet {
        kind: kind.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Response;
    use async_trait::async_trait;
    use emissary_core::TransportRequest;
    use http::{HeaderMap, StatusCode};

    struct Stub;

    impl Transport for Stub {
        fn base_url(&self) -> &str {
            "https://stub"
        }

        fn request(&self, request: &TransportRequest) -> Result<Response> {
            Ok(Response::new(StatusCode::OK, HeaderMap::new(), "", request.url.clone()))
        }
    }

    #[async_trait]
    impl AsyncTransport for Stub {
        fn base_url(&self) -> &str {
            "https://stub"
        }

        async fn request(&self, request: &TransportRequest) -> Result<Response> {
            Ok(Response::new(StatusCode::OK, HeaderMap::new(), "", request.url.clone()))
        }
    }

    #[test]
    fn test_set_twice_is_collection_limit() {
        let manager = TransportManager::new(true);
        manager.set(Arc::new(Stub)).unwrap();
        let err = manager.set(Arc::new(Stub)).unwrap_err();
        assert!(matches!(err, EmissaryError::CollectionLimit));
    }

    #[test]
    fn test_slots_are_independent() {
        let manager = TransportManager::new(true);
        manager.set(Arc::new(Stub)).unwrap();
        manager.set_async(Arc::new(Stub)).unwrap();
        assert!(!manager.is_empty(TransportKind::Sync));
        assert!(!manager.is_empty(TransportKind::Async));

        manager.pop().unwrap();
        assert!(manager.is_empty(TransportKind::Sync));
        assert!(!manager.is_empty(TransportKind::Async));
    }

    #[test]
    fn test_pop_empty_fails() {
        let manager = TransportManager::new(false);
        let err = manager.pop_async().err().unwrap();
        assert_eq!(err.to_string(), "AsyncClient is not set");
    }

    #[test]
    fn test_get_respects_required() {
        let lenient = TransportManager::new(false);
        assert!(lenient.get().unwrap().is_none());

        let strict = TransportManager::new(true);
        assert!(matches!(
            strict.get().err().unwrap(),
            EmissaryError::ClientNotSet { ref kind } if kind == "Client"
        ));
    }

    #[test]
    fn test_set_after_pop() {
        let manager = TransportManager::default();
        manager.set(Arc::new(Stub)).unwrap();
        let transport = manager.pop().unwrap();
        assert_eq!(transport.base_url(), "https://stub");
        manager.set(transport).unwrap();
        assert!(manager.get().unwrap().is_some());
    }
}
