use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use http::request::Parts;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::resource::Params;
use crate::store::Store;

#[derive(Debug, Clone)]
pub struct RequestContext {
    pub trace_id: String,
    pub start_time: Instant,
}

impl RequestContext {
    pub fn new() -> Self {
        Self {
            trace_id: uuid::Uuid::new_v4().to_string(),
            start_time: Instant::now(),
        }
    }

    pub fn with_trace_id(trace_id: String) -> Self {
        Self {
            trace_id,
            start_time: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> std::time::Duration {
        self.start_time.elapsed()
    }
}

impl Default for RequestContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Whoever the authenticator recognised. Restlink never looks inside; it
/// only hands the value to access checks.
#[derive(Clone)]
pub struct Accessor(Arc<dyn Any + Send + Sync>);

impl Accessor {
    pub fn new<T: Send + Sync + 'static>(value: T) -> Self {
        Self(Arc::new(value))
    }

    pub fn downcast_ref<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }
}

impl fmt::Debug for Accessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Accessor").finish_non_exhaustive()
    }
}

/// The request as an authenticator sees it.
#[derive(Debug, Clone, Copy)]
pub struct RequestInfo<'a> {
    pub parts: &'a Parts,
    /// Every query parameter, decoded, before route filtering.
    pub query: &'a Params,
}

impl<'a> RequestInfo<'a> {
    pub fn new(parts: &'a Parts, query: &'a Params) -> Self {
        Self { parts, query }
    }

    pub fn header(&self, name: &str) -> Option<&'a str> {
        self.parts.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn query(&self, name: &str) -> Option<&'a Value> {
        self.query.get(name)
    }

    pub fn path(&self) -> &'a str {
        self.parts.uri.path()
    }
}

/// Per-call context handed to resource actions and access checks.
#[derive(Clone, Default)]
pub struct CallContext {
    pub request: RequestContext,
    pub accessor: Option<Accessor>,
    store: Option<Arc<dyn Store>>,
}

impl CallContext {
    pub fn new(request: RequestContext) -> Self {
        Self {
            request,
            accessor: None,
            store: None,
        }
    }

    pub fn with_accessor(mut self, accessor: Option<Accessor>) -> Self {
        self.accessor = accessor;
        self
    }

    pub fn with_store(mut self, store: Option<Arc<dyn Store>>) -> Self {
        self.store = store;
        self
    }

    pub fn trace_id(&self) -> &str {
        &self.request.trace_id
    }

    /// The authenticated accessor, if it is a `T`.
    pub fn accessor<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.accessor.as_ref().and_then(|a| a.downcast_ref::<T>())
    }

    pub fn is_authenticated(&self) -> bool {
        self.accessor.is_some()
    }

    /// The store configured on the exposer.
    pub fn store(&self) -> Result<&dyn Store> {
        self.store
            .as_deref()
            .ok_or_else(|| Error::internal("No store has been configured for this exposer"))
    }
}

impl fmt::Debug for CallContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallContext")
            .field("request", &self.request)
            .field("accessor", &self.accessor)
            .field("store", &self.store.is_some())
            .finish()
    }
}
