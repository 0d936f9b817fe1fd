//! The declarative route table of a resource.
//!
//! A [`MethodMap`] maps an HTTP verb and a [`RouteShape`] to a
//! [`MethodSpec`]: the [`Action`] a request is dispatched to, the query
//! parameters the route accepts, the request body it expects and the
//! responses it documents. The exposer compiles routes from it and the API
//! document is generated from the same entries, so the two never drift.
//!
//! ```
//! use restlink::method_map::{MethodMap, ParamSpec, RouteShape};
//! use http::Method;
//!
//! let mut map = MethodMap::default();
//! if let Some(list) = map.get_mut(&Method::GET, RouteShape::General) {
//!     list.params.push(ParamSpec::optional("depth", "Minimum depth in meters."));
//! }
//! assert_eq!(map.get(&Method::GET, RouteShape::General).unwrap().params.len(), 2);
//! ```

use http::Method;
use serde_json::{Value, json};

/// Whether a route addresses the collection or a single member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RouteShape {
    /// `.../noun`
    General,
    /// `.../noun/{id}`
    Specific,
}

impl RouteShape {
    /// The single letter used in endpoint names.
    pub fn initial(self) -> char {
        match self {
            RouteShape::General => 'g',
            RouteShape::Specific => 's',
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RouteShape::General => "general",
            RouteShape::Specific => "specific",
        }
    }
}

/// What a route hands to its action besides the query parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arguments {
    pub id: bool,
    pub data: bool,
}

impl Arguments {
    const NONE: Arguments = Arguments {
        id: false,
        data: false,
    };
    const ID: Arguments = Arguments {
        id: true,
        data: false,
    };
    const DATA: Arguments = Arguments {
        id: false,
        data: true,
    };
    const ID_DATA: Arguments = Arguments {
        id: true,
        data: true,
    };
}

/// Returns the arguments a verb on a route shape provides, or `None` when
/// the combination has no convention.
pub fn arguments(verb: &Method, shape: RouteShape) -> Option<Arguments> {
    match (verb.as_str(), shape) {
        ("GET", RouteShape::General) => Some(Arguments::NONE),
        ("GET", RouteShape::Specific) => Some(Arguments::ID),
        ("POST", RouteShape::General) => Some(Arguments::DATA),
        ("PUT", RouteShape::Specific) => Some(Arguments::ID_DATA),
        ("DELETE", RouteShape::Specific) => Some(Arguments::ID),
        _ => None,
    }
}

/// The guarded resource action a route dispatches to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Get,
    List,
    Post,
    Put,
    Delete,
}

impl Action {
    pub fn name(self) -> &'static str {
        match self {
            Action::Get => "get",
            Action::List => "list",
            Action::Post => "post",
            Action::Put => "put",
            Action::Delete => "delete",
        }
    }

    /// The arguments this action consumes.
    pub fn arguments(self) -> Arguments {
        match self {
            Action::List => Arguments::NONE,
            Action::Get | Action::Delete => Arguments::ID,
            Action::Post => Arguments::DATA,
            Action::Put => Arguments::ID_DATA,
        }
    }
}

/// A query parameter accepted by a route.
#[derive(Debug, Clone, PartialEq)]
pub struct ParamSpec {
    pub name: String,
    pub description: String,
    pub required: bool,
}

impl ParamSpec {
    pub fn optional(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            required: false,
        }
    }

    pub fn required(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            required: true,
        }
    }
}

/// A schema used in a request body or a response.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaRef {
    /// A reference to the resource's own component schema.
    SelfSchema,
    /// A literal JSON schema.
    Inline(Value),
}

/// A documented response.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseSpec {
    /// No body.
    Empty,
    /// A JSON body of the given schema.
    Body(SchemaRef),
}

/// Everything the exposer needs to know about one verb on one route shape.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodSpec {
    pub action: Action,
    pub params: Vec<ParamSpec>,
    pub data: Option<SchemaRef>,
    /// Keyed by HTTP status code, in documentation order.
    pub responses: Vec<(String, ResponseSpec)>,
}

impl MethodSpec {
    pub fn new(action: Action) -> Self {
        Self {
            action,
            params: Vec::new(),
            data: None,
            responses: Vec::new(),
        }
    }

    pub fn param(mut self, param: ParamSpec) -> Self {
        self.params.push(param);
        self
    }

    pub fn data(mut self, schema: SchemaRef) -> Self {
        self.data = Some(schema);
        self
    }

    /// Adds a response, replacing any earlier one with the same code.
    pub fn response(mut self, code: impl Into<String>, response: ResponseSpec) -> Self {
        let code = code.into();
        match self.responses.iter_mut().find(|(c, _)| *c == code) {
            Some(slot) => slot.1 = response,
            None => self.responses.push((code, response)),
        }
        self
    }

    /// Whether a query parameter of this name reaches the action.
    pub fn allows_param(&self, name: &str) -> bool {
        self.params.iter().any(|p| p.name == name)
    }
}

/// One row of a [`MethodMap`].
#[derive(Debug, Clone, PartialEq)]
pub struct MethodEntry {
    pub verb: Method,
    pub shape: RouteShape,
    pub spec: MethodSpec,
}

/// Ordered verb to shape to [`MethodSpec`] table.
///
/// Iteration yields verbs in the order they were first inserted and, within
/// a verb, shapes in insertion order.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodMap {
    entries: Vec<MethodEntry>,
}

impl MethodMap {
    /// Creates a map with no entries.
    pub fn empty() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Inserts a spec. An existing entry for the same verb and shape is
    /// replaced in place.
    pub fn insert(&mut self, verb: Method, shape: RouteShape, spec: MethodSpec) {
        if let Some(entry) = self.get_mut(&verb, shape) {
            *entry = spec;
            return;
        }

        let position = self
            .entries
            .iter()
            .rposition(|e| e.verb == verb)
            .map(|i| i + 1)
            .unwrap_or(self.entries.len());
        self.entries
            .insert(position, MethodEntry { verb, shape, spec });
    }

    /// Chaining form of [`MethodMap::insert`].
    pub fn with(mut self, verb: Method, shape: RouteShape, spec: MethodSpec) -> Self {
        self.insert(verb, shape, spec);
        self
    }

    pub fn get(&self, verb: &Method, shape: RouteShape) -> Option<&MethodSpec> {
        self.entries
            .iter()
            .find(|e| e.verb == *verb && e.shape == shape)
            .map(|e| &e.spec)
    }

    pub fn get_mut(&mut self, verb: &Method, shape: RouteShape) -> Option<&mut MethodSpec> {
        self.entries
            .iter_mut()
            .find(|e| e.verb == *verb && e.shape == shape)
            .map(|e| &mut e.spec)
    }

    pub fn remove(&mut self, verb: &Method, shape: RouteShape) -> Option<MethodSpec> {
        let index = self
            .entries
            .iter()
            .position(|e| e.verb == *verb && e.shape == shape)?;
        Some(self.entries.remove(index).spec)
    }

    /// Distinct verbs, in map order.
    pub fn verbs(&self) -> Vec<Method> {
        let mut verbs: Vec<Method> = Vec::new();
        for entry in &self.entries {
            if !verbs.contains(&entry.verb) {
                verbs.push(entry.verb.clone());
            }
        }
        verbs
    }

    pub fn contains_verb(&self, verb: &Method) -> bool {
        self.entries.iter().any(|e| e.verb == *verb)
    }

    pub fn iter(&self) -> impl Iterator<Item = &MethodEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The body every documented error response carries.
pub fn error_schema() -> Value {
    json!({"type": "object", "properties": {"error": {"type": "string"}}})
}

fn error_body() -> ResponseSpec {
    ResponseSpec::Body(SchemaRef::Inline(error_schema()))
}

fn self_body() -> ResponseSpec {
    ResponseSpec::Body(SchemaRef::SelfSchema)
}

impl Default for MethodMap {
    /// The standard CRUD map.
    fn default() -> Self {
        MethodMap::empty()
            .with(
                Method::GET,
                RouteShape::Specific,
                MethodSpec::new(Action::Get)
                    .response("200", self_body())
                    .response("403", error_body())
                    .response("404", error_body()),
            )
            .with(
                Method::GET,
                RouteShape::General,
                MethodSpec::new(Action::List)
                    .param(ParamSpec::optional(
                        "filter",
                        "URL-encoded key/value data which is used to filter the returned ID list.",
                    ))
                    .response(
                        "200",
                        ResponseSpec::Body(SchemaRef::Inline(
                            json!({"type": "array", "items": {"type": "integer"}}),
                        )),
                    )
                    .response("400", error_body())
                    .response("403", error_body()),
            )
            .with(
                Method::POST,
                RouteShape::General,
                MethodSpec::new(Action::Post)
                    .data(SchemaRef::SelfSchema)
                    .response("200", self_body())
                    .response("400", error_body())
                    .response("403", error_body())
                    .response("404", error_body()),
            )
            .with(
                Method::PUT,
                RouteShape::Specific,
                MethodSpec::new(Action::Put)
                    .data(SchemaRef::SelfSchema)
                    .response("200", self_body())
                    .response("400", error_body())
                    .response("403", error_body())
                    .response("404", error_body()),
            )
            .with(
                Method::DELETE,
                RouteShape::Specific,
                MethodSpec::new(Action::Delete)
                    .response("200", ResponseSpec::Empty)
                    .response("400", error_body())
                    .response("403", error_body())
                    .response("404", error_body()),
            )
    }
}
