//! The exposed noun.
//!
//! A [`Resource`] is what ends up at `.../noun` and `.../noun/{id}`. Every
//! action is split in two: the guarded action (`get`, `post`, ...) checks
//! access and then calls the backend hook (`fetch`, `create`, ...). Override
//! the hooks to change what an action does and the access checks to change
//! who may do it.
//!
//! ```
//! use restlink::prelude::*;
//!
//! struct Weir;
//!
//! #[async_trait]
//! impl Resource for Weir {
//!     fn rest_path(&self) -> &str {
//!         "waterways/weir"
//!     }
//!
//!     fn allowed_methods(&self) -> &[Method] {
//!         &[Method::GET]
//!     }
//!
//!     async fn list_ids(&self, _ctx: &CallContext, _params: Params) -> Result<serde_json::Value> {
//!         Ok(serde_json::json!([1, 2, 3]))
//!     }
//! }
//!
//! assert_eq!(Weir.name(), "weir");
//! assert_eq!(Weir.exposed_methods().len(), 2);
//! ```

use std::path::Path;

use async_trait::async_trait;
use http::Method;
use serde_json::{Map, Value, json};

use crate::context::CallContext;
use crate::error::{Error, Result};
use crate::method_map::{MethodEntry, MethodMap};

/// Decoded query parameters, keyed by name.
pub type Params = Map<String, Value>;

#[async_trait]
pub trait Resource: Send + Sync + 'static {
    /// Where the resource lives below its API root, e.g. `"canal"` or
    /// `"waterways/canal"`.
    fn rest_path(&self) -> &str;

    /// Verbs that may be exposed. Nothing is exposed by default.
    fn allowed_methods(&self) -> &[Method] {
        &[]
    }

    fn method_map(&self) -> MethodMap {
        MethodMap::default()
    }

    /// The JSON schema published as this resource's component.
    fn component_schema(&self) -> Value {
        json!({"type": "object"})
    }

    /// Schemas the component schema refers to through
    /// `#/components/schemas/{name}`. They are added to the document beside it.
    fn schema_definitions(&self) -> Map<String, Value> {
        Map::new()
    }

    /// Read access check. `id` is `None` for listing.
    async fn can_read(&self, _ctx: &CallContext, _id: Option<&Value>) -> bool {
        true
    }

    /// Write access check. `id` is `None` for creation.
    async fn can_write(&self, _ctx: &CallContext, _id: Option<&Value>) -> bool {
        false
    }

    /// The rest path without leading or trailing slashes.
    fn path(&self) -> &str {
        self.rest_path().trim_matches('/')
    }

    /// The last path segment, without extension.
    fn name(&self) -> String {
        Path::new(self.path())
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// Method map entries whose verb is allowed, in map order.
    fn exposed_methods(&self) -> Vec<MethodEntry> {
        let allowed = self.allowed_methods();
        self.method_map()
            .iter()
            .filter(|e| allowed.contains(&e.verb))
            .cloned()
            .collect()
    }

    async fn get(&self, ctx: &CallContext, id: Value, params: Params) -> Result<Value> {
        if !self.can_read(ctx, Some(&id)).await {
            return Err(denied("read", &self.name()));
        }
        self.fetch(ctx, id, params).await
    }

    async fn post(&self, ctx: &CallContext, data: Value, params: Params) -> Result<Value> {
        if !self.can_write(ctx, None).await {
            return Err(denied("write", &self.name()));
        }
        self.create(ctx, data, params).await
    }

    async fn put(&self, ctx: &CallContext, id: Value, data: Value, params: Params) -> Result<Value> {
        if !self.can_write(ctx, Some(&id)).await {
            return Err(denied("write", &self.name()));
        }
        self.update(ctx, id, data, params).await
    }

    async fn delete(&self, ctx: &CallContext, id: Value, params: Params) -> Result<Value> {
        if !self.can_write(ctx, Some(&id)).await {
            return Err(denied("write", &self.name()));
        }
        self.remove(ctx, id, params).await
    }

    async fn list(&self, ctx: &CallContext, params: Params) -> Result<Value> {
        if !self.can_read(ctx, None).await {
            return Err(denied("read", &self.name()));
        }
        self.list_ids(ctx, params).await
    }

    async fn fetch(&self, _ctx: &CallContext, _id: Value, _params: Params) -> Result<Value> {
        Err(unimplemented("get", &self.name()))
    }

    async fn create(&self, _ctx: &CallContext, _data: Value, _params: Params) -> Result<Value> {
        Err(unimplemented("post", &self.name()))
    }

    async fn update(
        &self,
        _ctx: &CallContext,
        _id: Value,
        _data: Value,
        _params: Params,
    ) -> Result<Value> {
        Err(unimplemented("put", &self.name()))
    }

    async fn remove(&self, _ctx: &CallContext, _id: Value, _params: Params) -> Result<Value> {
        Err(unimplemented("delete", &self.name()))
    }

    async fn list_ids(&self, _ctx: &CallContext, _params: Params) -> Result<Value> {
        Err(unimplemented("list", &self.name()))
    }
}

fn denied(kind: &str, name: &str) -> Error {
    Error::forbidden(format!("Accessor does not have {} access to {}", kind, name))
}

fn unimplemented(action: &str, name: &str) -> Error {
    Error::not_implemented(format!("{} does not implement {}", name, action))
}
