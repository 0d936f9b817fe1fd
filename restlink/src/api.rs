//! A named, versioned API and its OpenAPI document.
//!
//! An [`Api`] groups resources under `/{base}/{name}/{version}` and owns
//! the document describing them. The document is edited through
//! [`Api::with_spec`] and published as a JSON snapshot that the docs route
//! serves, so readers never see a half-applied edit.
//!
//! `Api` is a cheap handle; clones share the same document.

use std::fmt;
use std::sync::Arc;

use arc_swap::ArcSwap;
use serde_json::Value;

use crate::method_map::RouteShape;
use crate::openapi::{OpenApiSpec, Server, build_operation, endpoint_name};
use crate::resource::Resource;

#[derive(Clone)]
pub struct Api {
    inner: Arc<ApiInner>,
}

struct ApiInner {
    name: String,
    version: String,
    title: String,
    doc: ArcSwap<Document>,
}

/// A document and its JSON snapshot, swapped in together.
struct Document {
    spec: Arc<OpenApiSpec>,
    view: Arc<Value>,
}

impl Document {
    fn new(spec: OpenApiSpec) -> Self {
        let view = Arc::new(spec.to_value());
        Self {
            spec: Arc::new(spec),
            view,
        }
    }
}

impl Api {
    /// Creates an API. `name` and `version` end up in URLs and must be
    /// path-safe; `title` is only displayed.
    pub fn new(
        name: impl Into<String>,
        version: impl Into<String>,
        title: impl Into<String>,
    ) -> Self {
        let name = name.into();
        let version = version.into();
        let title = title.into();

        let spec = OpenApiSpec::new(title.clone(), version.clone());

        Self {
            inner: Arc::new(ApiInner {
                name,
                version,
                title,
                doc: ArcSwap::from_pointee(Document::new(spec)),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn version(&self) -> &str {
        &self.inner.version
    }

    pub fn title(&self) -> &str {
        &self.inner.title
    }

    /// Unique key of this API, `{name}_{version}`.
    pub fn key(&self) -> String {
        format!("{}_{}", self.inner.name, self.inner.version)
    }

    /// The current document.
    pub fn spec(&self) -> Arc<OpenApiSpec> {
        self.inner.doc.load().spec.clone()
    }

    /// The published JSON snapshot of the document.
    pub fn doc_view(&self) -> Arc<Value> {
        self.inner.doc.load().view.clone()
    }

    /// Modifies the document and republishes it.
    ///
    /// `f` may run more than once if the document is modified concurrently.
    ///
    /// ```
    /// use restlink::prelude::*;
    ///
    /// let api = Api::new("api", "v1", "Waterways");
    /// api.with_spec(|spec| spec.info.description = Some("Canals and locks".to_string()));
    /// assert_eq!(api.doc_view()["info"]["description"], "Canals and locks");
    /// ```
    pub fn with_spec<F>(&self, mut f: F)
    where
        F: FnMut(&mut OpenApiSpec),
    {
        self.inner.doc.rcu(|current| {
            let mut next = OpenApiSpec::clone(&current.spec);
            f(&mut next);
            Document::new(next)
        });
    }

    /// Points the document's single server at this API's root.
    pub fn doc_set_servers(&self, base_path: &str) {
        let root = self.path_root(base_path);
        self.with_spec(|spec| spec.servers = vec![Server::new(root.clone())]);
    }

    /// Adds a resource's component schema and one operation per exposed
    /// method to the document.
    pub fn doc_add_resource(&self, resource: &dyn Resource) {
        let name = resource.name();
        let schema = resource.component_schema();
        let definitions = resource.schema_definitions();
        let exposed = resource.exposed_methods();
        let general = format!("/{}", resource.path());
        let specific = format!("{}/{{id}}", general);

        self.with_spec(|spec| {
            for (key, definition) in &definitions {
                spec.components
                    .schemas
                    .insert(key.clone(), definition.clone());
            }
            spec.components.schemas.insert(name.clone(), schema.clone());

            for entry in &exposed {
                let path = match entry.shape {
                    RouteShape::General => &general,
                    RouteShape::Specific => &specific,
                };
                let operation_id =
                    endpoint_name(self.name(), self.version(), &name, &entry.verb, entry.shape);
                let operation = build_operation(&name, entry.shape, &entry.spec, operation_id);
                spec.paths
                    .entry(path.clone())
                    .or_default()
                    .set(&entry.verb, operation);
            }
        });
    }

    /// `/{base_path}/{name}/{version}`. Slashes in `base_path` are
    /// normalised, an empty base collapses.
    pub fn path_root(&self, base_path: &str) -> String {
        let segments: Vec<&str> = base_path
            .split('/')
            .chain([self.name(), self.version()])
            .filter(|s| !s.is_empty())
            .collect();
        format!("/{}", segments.join("/"))
    }

    /// The collection route of a resource below `path_root`.
    pub fn path_resource(&self, path_root: &str, resource: &dyn Resource) -> String {
        format!("{}/{}", path_root.trim_end_matches('/'), resource.path())
    }

    /// Where this API's document is served below `path_root`.
    pub fn path_docs(&self, path_root: &str) -> String {
        format!("{}/docs", path_root.trim_end_matches('/'))
    }
}

impl fmt::Display for Api {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<API {} {}>", self.inner.name, self.inner.version)
    }
}

impl fmt::Debug for Api {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Api")
            .field("name", &self.inner.name)
            .field("version", &self.inner.version)
            .field("title", &self.inner.title)
            .finish()
    }
}
