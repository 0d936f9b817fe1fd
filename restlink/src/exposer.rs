//! Compiles resources into routes.
//!
//! The [`Exposer`] takes a resource registered under an [`Api`], checks its
//! method map, adds it to the API document and compiles one [`RouteRule`]
//! per exposed method. A rule carries its URL pattern, a unique endpoint
//! name and a transfer function that turns a decoded [`Call`] into a call
//! of the resource's guarded action.
//!
//! Rules are handed to a [`RouteSink`](crate::host::RouteSink) with
//! [`Exposer::install`].
//!
//! ```
//! use restlink::prelude::*;
//!
//! struct Weir;
//!
//! #[async_trait]
//! impl Resource for Weir {
//!     fn rest_path(&self) -> &str {
//!         "weir"
//!     }
//!
//!     fn allowed_methods(&self) -> &[Method] {
//!         &[Method::GET]
//!     }
//! }
//!
//! let api = Api::new("api", "v1", "Waterways");
//! let mut exposer = Exposer::new().base_path("/");
//! exposer.register(&api, Weir).unwrap();
//!
//! let rules: Vec<_> = exposer.rules().iter().map(|r| r.rule.as_str()).collect();
//! assert_eq!(rules, ["/api/v1/docs", "/api/v1/weir/:id", "/api/v1/weir"]);
//! ```

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use http::Method;
use serde_json::Value;
use tracing::{debug, info};

use crate::api::Api;
use crate::config::ExposerConfig;
use crate::context::{Accessor, CallContext, RequestInfo};
use crate::error::{Error, ExposeError, ExposeResult, Result};
use crate::introspection::RouteInfo;
use crate::method_map::{Action, MethodEntry, RouteShape, arguments};
use crate::openapi::{docs_transfer, endpoint_name};
use crate::resource::{Params, Resource};
use crate::store::Store;

pub type TransferFuture = Pin<Box<dyn Future<Output = Result<Value>> + Send>>;

/// Turns a decoded request into the result of a resource action.
pub type Transfer = Arc<dyn Fn(Call) -> TransferFuture + Send + Sync>;

/// Recognises the accessor behind a request. `None` means anonymous.
pub type Authenticator = Arc<dyn Fn(&RequestInfo<'_>) -> Option<Accessor> + Send + Sync>;

/// A request, decoded and ready for a transfer function.
#[derive(Debug, Default)]
pub struct Call {
    pub ctx: CallContext,
    /// The `:id` path segment of specific routes.
    pub id: Option<Value>,
    /// The JSON body, if one was sent.
    pub data: Option<Value>,
    /// Every decoded query parameter. The transfer drops the ones the route
    /// does not declare.
    pub params: Params,
}

/// A compiled route.
#[derive(Clone)]
pub struct RouteRule {
    pub method: Method,
    /// URL pattern with `:param` placeholders.
    pub rule: String,
    pub endpoint: String,
    transfer: Transfer,
}

impl RouteRule {
    pub fn new(
        method: Method,
        rule: impl Into<String>,
        endpoint: impl Into<String>,
        transfer: Transfer,
    ) -> Self {
        Self {
            method,
            rule: rule.into(),
            endpoint: endpoint.into(),
            transfer,
        }
    }

    pub async fn call(&self, call: Call) -> Result<Value> {
        (self.transfer)(call).await
    }

    pub fn info(&self) -> RouteInfo {
        RouteInfo::new(self.method.as_str(), &self.rule, &self.endpoint)
    }
}

impl fmt::Debug for RouteRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteRule")
            .field("method", &self.method)
            .field("rule", &self.rule)
            .field("endpoint", &self.endpoint)
            .finish_non_exhaustive()
    }
}

/// What every compiled route shares at request time.
#[derive(Clone, Default)]
pub struct Gateway {
    authenticator: Option<Authenticator>,
    store: Option<Arc<dyn Store>>,
}

impl Gateway {
    pub fn authenticate(&self, info: &RequestInfo<'_>) -> Option<Accessor> {
        self.authenticator.as_ref().and_then(|auth| auth(info))
    }

    pub fn store(&self) -> Option<Arc<dyn Store>> {
        self.store.clone()
    }
}

impl fmt::Debug for Gateway {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Gateway")
            .field("authenticator", &self.authenticator.is_some())
            .field("store", &self.store.is_some())
            .finish()
    }
}

struct Registered {
    api: Api,
    resources: Vec<Arc<dyn Resource>>,
}

pub struct Exposer {
    base_path: String,
    apis: Vec<Registered>,
    rules: Vec<RouteRule>,
    gateway: Gateway,
}

impl Exposer {
    pub fn new() -> Self {
        Self {
            base_path: "/".to_string(),
            apis: Vec::new(),
            rules: Vec::new(),
            gateway: Gateway::default(),
        }
    }

    pub fn from_config(config: ExposerConfig) -> Self {
        Self::new().base_path(config.base_path)
    }

    /// The path every API root is placed under. Defaults to `/`.
    pub fn base_path(mut self, base_path: impl Into<String>) -> Self {
        self.base_path = base_path.into();
        self
    }

    pub fn authenticator<F>(mut self, authenticator: F) -> Self
    where
        F: Fn(&RequestInfo<'_>) -> Option<Accessor> + Send + Sync + 'static,
    {
        self.gateway.authenticator = Some(Arc::new(authenticator));
        self
    }

    /// The store handed to resources through their [`CallContext`].
    pub fn store(mut self, store: Arc<dyn Store>) -> Self {
        self.gateway.store = Some(store);
        self
    }

    pub fn get_base_path(&self) -> &str {
        &self.base_path
    }

    pub fn rules(&self) -> &[RouteRule] {
        &self.rules
    }

    pub fn gateway(&self) -> &Gateway {
        &self.gateway
    }

    /// The APIs resources have been registered under, in registration order.
    pub fn apis(&self) -> impl Iterator<Item = &Api> {
        self.apis.iter().map(|r| &r.api)
    }

    /// Looks up a registered resource by API key and name.
    pub fn resource(&self, api_key: &str, name: &str) -> Option<Arc<dyn Resource>> {
        self.apis
            .iter()
            .find(|r| r.api.key() == api_key)?
            .resources
            .iter()
            .find(|r| r.name() == name)
            .cloned()
    }

    /// Registers `resource` under `api`.
    ///
    /// Nothing is compiled or documented unless every check passes.
    pub fn register<R: Resource>(&mut self, api: &Api, resource: R) -> ExposeResult<()> {
        self.register_arc(api, Arc::new(resource))
    }

    pub fn register_arc(
        &mut self,
        api: &Api,
        resource: Arc<dyn Resource>,
    ) -> ExposeResult<()> {
        let name = resource.name();
        let exposed = self.validate(api, resource.as_ref(), &name)?;

        let root = api.path_root(&self.base_path);
        let index = match self.apis.iter().position(|r| r.api.key() == api.key()) {
            Some(index) => index,
            None => {
                self.open_api(api, &root);
                self.apis.len() - 1
            }
        };

        api.doc_add_resource(resource.as_ref());

        let general = api.path_resource(&root, resource.as_ref());
        for entry in exposed {
            let pattern = match entry.shape {
                RouteShape::General => general.clone(),
                RouteShape::Specific => format!("{}/:id", general),
            };
            let endpoint = endpoint_name(api.name(), api.version(), &name, &entry.verb, entry.shape);
            debug!(method = %entry.verb, rule = %pattern, endpoint = %endpoint, "compiled route");

            let transfer = transfer(resource.clone(), &entry);
            self.rules
                .push(RouteRule::new(entry.verb, pattern, endpoint, transfer));
        }

        info!(api = %api, resource = %name, path = %general, "registered resource");
        self.apis[index].resources.push(resource);
        Ok(())
    }

    fn validate(
        &self,
        api: &Api,
        resource: &dyn Resource,
        name: &str,
    ) -> ExposeResult<Vec<MethodEntry>> {
        if resource.path().is_empty() {
            return Err(ExposeError::MissingPath);
        }
        if name == "docs" {
            return Err(ExposeError::ReservedName(name.to_string()));
        }

        let map = resource.method_map();
        for verb in resource.allowed_methods() {
            if !map.contains_verb(verb) {
                return Err(ExposeError::InvalidMethod {
                    resource: name.to_string(),
                    method: verb.to_string(),
                    valid: map.verbs().iter().map(Method::to_string).collect(),
                });
            }
        }

        let exposed = resource.exposed_methods();
        for entry in &exposed {
            match arguments(&entry.verb, entry.shape) {
                None => {
                    return Err(ExposeError::UnsupportedRoute {
                        resource: name.to_string(),
                        method: entry.verb.to_string(),
                        shape: entry.shape.as_str(),
                    });
                }
                Some(args) if args != entry.spec.action.arguments() => {
                    return Err(ExposeError::ActionMismatch {
                        resource: name.to_string(),
                        method: entry.verb.to_string(),
                        shape: entry.shape.as_str(),
                        action: entry.spec.action.name(),
                    });
                }
                Some(_) => {}
            }
        }

        let taken = self
            .apis
            .iter()
            .filter(|r| r.api.key() == api.key())
            .flat_map(|r| r.resources.iter())
            .any(|r| r.name() == name);
        if taken {
            return Err(ExposeError::DuplicateResource {
                name: name.to_string(),
                api: api.to_string(),
            });
        }

        Ok(exposed)
    }

    fn open_api(&mut self, api: &Api, root: &str) {
        api.doc_set_servers(&self.base_path);

        let rule = api.path_docs(root);
        let endpoint = format!("{}_docs", api.key());
        debug!(method = %Method::GET, rule = %rule, endpoint = %endpoint, "compiled route");
        self.rules
            .push(RouteRule::new(Method::GET, rule, endpoint, docs_transfer(api.clone())));

        info!(api = %api, root = %root, "opened api");
        self.apis.push(Registered {
            api: api.clone(),
            resources: Vec::new(),
        });
    }

    /// Lists every compiled rule.
    pub fn routes(&self) -> Vec<RouteInfo> {
        self.rules.iter().map(RouteRule::info).collect()
    }

    /// Adds every compiled rule to `sink`.
    pub fn install<S: crate::host::RouteSink>(&self, sink: &mut S) {
        let gateway = Arc::new(self.gateway.clone());
        for rule in &self.rules {
            sink.add_rule(rule.clone(), gateway.clone());
        }
    }
}

impl Default for Exposer {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Exposer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Exposer")
            .field("base_path", &self.base_path)
            .field("apis", &self.apis().collect::<Vec<_>>())
            .field("rules", &self.rules)
            .field("gateway", &self.gateway)
            .finish()
    }
}

fn transfer(resource: Arc<dyn Resource>, entry: &MethodEntry) -> Transfer {
    let action = entry.spec.action;
    let allowed: Arc<[String]> = entry.spec.params.iter().map(|p| p.name.clone()).collect();

    Arc::new(move |call: Call| {
        let resource = resource.clone();
        let allowed = allowed.clone();

        Box::pin(async move {
            let Call {
                ctx,
                id,
                data,
                mut params,
            } = call;
            params.retain(|key, _| allowed.contains(key));

            let name = resource.name();
            match action {
                Action::Get => resource.get(&ctx, require_id(id, &name)?, params).await,
                Action::List => resource.list(&ctx, params).await,
                Action::Post => resource.post(&ctx, require_data(data, &name)?, params).await,
                Action::Put => {
                    let id = require_id(id, &name)?;
                    resource
                        .put(&ctx, id, require_data(data, &name)?, params)
                        .await
                }
                Action::Delete => resource.delete(&ctx, require_id(id, &name)?, params).await,
            }
        }) as TransferFuture
    })
}

fn require_id(id: Option<Value>, name: &str) -> Result<Value> {
    id.ok_or_else(|| Error::bad_request(format!("No ID provided for {}", name)))
}

fn require_data(data: Option<Value>, name: &str) -> Result<Value> {
    data.ok_or_else(|| Error::bad_request(format!("No JSON data provided for {}", name)))
}
