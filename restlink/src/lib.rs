//! Declaratively described resources, exposed as REST routes with a
//! generated OpenAPI document.
//!
//! A [`Resource`](resource::Resource) names the verbs it allows and carries
//! a [`MethodMap`](method_map::MethodMap) saying what each verb does on the
//! collection route (`.../canal`) and the member route (`.../canal/{id}`).
//! An [`Exposer`](exposer::Exposer) compiles registered resources into
//! routes and keeps the document of their [`Api`](api::Api) in step.
//! [`TableResource`](table::TableResource) covers the common case of a
//! table in a [`Store`](store::Store).

pub mod api;
pub mod app;
pub mod config;
pub mod context;
#[cfg(feature = "database")]
pub mod database;
pub mod error;
pub mod exposer;
pub mod extract;
pub mod host;
pub mod introspection;
pub mod method_map;
pub mod middleware;
pub mod observability;
pub mod openapi;
pub mod resource;
pub mod response;
pub mod router;
pub mod server;
pub mod state;
pub mod store;
pub mod table;
pub mod testing;

pub use schemars;

pub mod prelude {
    pub use std::sync::Arc;

    pub use crate::api::Api;
    pub use crate::app::Restlink;
    pub use crate::config::ExposerConfig;
    pub use crate::context::{Accessor, CallContext, RequestContext, RequestInfo};
    pub use crate::error::{Error, ExposeError, ExposeResult, IntoApiError, Result};
    pub use crate::exposer::Exposer;
    pub use crate::method_map::{
        Action, MethodMap, MethodSpec, ParamSpec, ResponseSpec, RouteShape, SchemaRef,
    };
    pub use crate::middleware::{Middleware, Next};
    pub use crate::observability::TracingConfig;
    pub use crate::resource::{Params, Resource};
    pub use crate::response::IntoResponse;
    pub use crate::router::Router;
    pub use crate::store::{MemoryStore, Record, Store, TableInfo};
    pub use crate::table::{RecordSchema, TableResource};

    pub use async_trait::async_trait;
    pub use http::{Method, StatusCode};
    pub use schemars::JsonSchema;
    pub use serde::{Deserialize, Serialize};
    pub use validator::Validate;
}
