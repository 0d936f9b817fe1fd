//! Storage-backed resources.
//!
//! A [`TableResource`] exposes one table of the exposer's
//! [`Store`](crate::store::Store) with the
//! standard CRUD behavior. The shape of the data is given by a
//! [`RecordSchema`]: `Dump` is what leaves the server (fields it does not
//! name are never sent), `Load` is what is accepted from clients.
//!
//! # Example
//!
//! ```
//! use restlink::prelude::*;
//! use restlink::schemars::{self, JsonSchema};
//!
//! #[derive(Serialize, Deserialize, JsonSchema)]
//! struct CanalOut {
//!     id: i64,
//!     width: Option<i64>,
//!     name: Option<String>,
//! }
//!
//! #[derive(Serialize, Deserialize, Validate)]
//! #[serde(deny_unknown_fields)]
//! struct CanalIn {
//!     width: Option<i64>,
//!     #[validate(length(min = 1, max = 32))]
//!     name: Option<String>,
//! }
//!
//! struct Canal;
//!
//! impl RecordSchema for Canal {
//!     const TABLE: &'static str = "canal";
//!     type Dump = CanalOut;
//!     type Load = CanalIn;
//! }
//!
//! let canals = TableResource::<Canal>::new("canal")
//!     .allow([Method::GET, Method::POST])
//!     .write_access(|ctx, _id| ctx.is_authenticated());
//! assert_eq!(canals.name(), "canal");
//! ```

use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use http::Method;
use schemars::JsonSchema;
use schemars::generate::SchemaSettings;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};
use validator::Validate;

use crate::context::CallContext;
use crate::error::{Error, Result};
use crate::method_map::MethodMap;
use crate::resource::{Params, Resource};
use crate::store::Record;

/// Describes the records of one table.
pub trait RecordSchema: Send + Sync + 'static {
    /// The table in the exposer's store.
    const TABLE: &'static str;

    /// Serialized form sent to clients.
    type Dump: Serialize + DeserializeOwned + JsonSchema + Send;

    /// Accepted form for creation and update.
    type Load: Serialize + DeserializeOwned + Validate + Send;

    /// `(field, column)` pairs for fields stored under another column name.
    fn field_remap() -> &'static [(&'static str, &'static str)] {
        &[]
    }

    /// Builds the record to insert for a validated creation payload.
    fn into_record(load: Self::Load) -> Result<Record> {
        let value = serde_json::to_value(&load)
            .map_err(|e| Error::internal(format!("failed to serialize payload: {}", e)))?;
        let Value::Object(fields) = value else {
            return Err(Error::internal("payload did not serialize to an object"));
        };

        Ok(fields
            .into_iter()
            .filter(|(_, v)| !v.is_null())
            .map(|(k, v)| (column_for::<Self>(&k).to_string(), v))
            .collect())
    }
}

fn column_for<S: RecordSchema + ?Sized>(field: &str) -> &str {
    S::field_remap()
        .iter()
        .find(|(f, _)| *f == field)
        .map(|(_, column)| *column)
        .unwrap_or(field)
}

fn field_for<S: RecordSchema + ?Sized>(column: &str) -> &str {
    S::field_remap()
        .iter()
        .find(|(_, c)| *c == column)
        .map(|(field, _)| *field)
        .unwrap_or(column)
}

/// Schema of `T` with its nested definitions split off. References point
/// at `#/components/schemas/`, where the definitions belong.
fn dump_schema<T: JsonSchema>() -> (Value, Map<String, Value>) {
    let mut generator = SchemaSettings::draft2020_12()
        .with(|s| {
            s.definitions_path = "/components/schemas".into();
            s.meta_schema = None;
        })
        .into_generator();
    let mut schema = serde_json::to_value(generator.root_schema_for::<T>())
        .unwrap_or_else(|_| json!({"type": "object"}));

    let mut components = None;
    if let Some(object) = schema.as_object_mut() {
        object.remove("title");
        components = object.remove("components");
    }
    let definitions = match components {
        Some(Value::Object(mut components)) => match components.remove("schemas") {
            Some(Value::Object(schemas)) => schemas,
            _ => Map::new(),
        },
        _ => Map::new(),
    };
    (schema, definitions)
}

/// Decides whether the caller may act on a record. `None` means the whole
/// collection (list or create).
pub type AccessCheck = Arc<dyn Fn(&CallContext, Option<&Value>) -> bool + Send + Sync>;

pub struct TableResource<S: RecordSchema> {
    rest_path: String,
    allowed: Vec<Method>,
    method_map: MethodMap,
    read_access: AccessCheck,
    write_access: AccessCheck,
    schema: Value,
    definitions: Map<String, Value>,
    exposed_fields: Vec<String>,
    _schema: PhantomData<fn() -> S>,
}

impl<S: RecordSchema> TableResource<S> {
    /// Read access is public and write access is closed until configured.
    pub fn new(rest_path: impl Into<String>) -> Self {
        let (schema, definitions) = dump_schema::<S::Dump>();
        let exposed_fields = schema
            .get("properties")
            .and_then(Value::as_object)
            .map(|p| p.keys().cloned().collect())
            .unwrap_or_default();

        Self {
            rest_path: rest_path.into(),
            allowed: Vec::new(),
            method_map: MethodMap::default(),
            read_access: Arc::new(|_, _| true),
            write_access: Arc::new(|_, _| false),
            schema,
            definitions,
            exposed_fields,
            _schema: PhantomData,
        }
    }

    pub fn allow(mut self, methods: impl IntoIterator<Item = Method>) -> Self {
        self.allowed = methods.into_iter().collect();
        self
    }

    pub fn with_method_map(mut self, map: MethodMap) -> Self {
        self.method_map = map;
        self
    }

    pub fn read_access<F>(mut self, check: F) -> Self
    where
        F: Fn(&CallContext, Option<&Value>) -> bool + Send + Sync + 'static,
    {
        self.read_access = Arc::new(check);
        self
    }

    pub fn write_access<F>(mut self, check: F) -> Self
    where
        F: Fn(&CallContext, Option<&Value>) -> bool + Send + Sync + 'static,
    {
        self.write_access = Arc::new(check);
        self
    }

    /// Fields of the dump, i.e. everything a client may see or filter by.
    pub fn exposed_fields(&self) -> &[String] {
        &self.exposed_fields
    }

    fn dump(&self, record: Record) -> Result<Value> {
        let fields: Record = record
            .into_iter()
            .map(|(column, v)| (field_for::<S>(&column).to_string(), v))
            .collect();
        let dump: S::Dump = serde_json::from_value(Value::Object(fields)).map_err(|e| {
            tracing::error!(table = S::TABLE, error = %e, "stored record does not match its dump schema");
            Error::internal(format!("{} record could not be serialized", self.name()))
        })?;
        serde_json::to_value(dump).map_err(|e| Error::internal(e.to_string()))
    }

    fn load(&self, data: &Value) -> Result<S::Load> {
        if !data.is_object() {
            return Err(validation_failed(json!({"_schema": ["Invalid input type."]})));
        }
        let load: S::Load = serde_json::from_value(data.clone())
            .map_err(|e| validation_failed(json!({"_schema": [e.to_string()]})))?;
        load.validate().map_err(|e| {
            validation_failed(serde_json::to_value(e).unwrap_or(Value::Null))
        })?;
        Ok(load)
    }

    fn missing(&self, id: &Value) -> Error {
        let shown = match id {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        Error::not_found(format!("{} ID={} does not exist.", self.name(), shown))
    }
}

fn validation_failed(messages: Value) -> Error {
    Error::validation(format!("Validation failed for: {}", messages)).with_details(messages)
}

#[async_trait]
impl<S: RecordSchema> Resource for TableResource<S> {
    fn rest_path(&self) -> &str {
        &self.rest_path
    }

    fn allowed_methods(&self) -> &[Method] {
        &self.allowed
    }

    fn method_map(&self) -> MethodMap {
        self.method_map.clone()
    }

    fn component_schema(&self) -> Value {
        self.schema.clone()
    }

    fn schema_definitions(&self) -> Map<String, Value> {
        self.definitions.clone()
    }

    async fn can_read(&self, ctx: &CallContext, id: Option<&Value>) -> bool {
        (self.read_access)(ctx, id)
    }

    async fn can_write(&self, ctx: &CallContext, id: Option<&Value>) -> bool {
        (self.write_access)(ctx, id)
    }

    async fn fetch(&self, ctx: &CallContext, id: Value, _params: Params) -> Result<Value> {
        let record = ctx
            .store()?
            .fetch(S::TABLE, &id)
            .await?
            .ok_or_else(|| self.missing(&id))?;
        self.dump(record)
    }

    async fn create(&self, ctx: &CallContext, data: Value, _params: Params) -> Result<Value> {
        let store = ctx.store()?;
        let load = self.load(&data)?;
        let record = S::into_record(load)?;
        let stored = store.insert(S::TABLE, record).await?;
        tracing::debug!(table = S::TABLE, "record created");
        self.dump(stored)
    }

    async fn update(
        &self,
        ctx: &CallContext,
        id: Value,
        data: Value,
        _params: Params,
    ) -> Result<Value> {
        let store = ctx.store()?;
        if store.fetch(S::TABLE, &id).await?.is_none() {
            return Err(self.missing(&id));
        }
        self.load(&data)?;

        let changes: Record = data
            .as_object()
            .into_iter()
            .flatten()
            .map(|(k, v)| (column_for::<S>(k).to_string(), v.clone()))
            .collect();
        let record = store
            .update(S::TABLE, &id, changes)
            .await?
            .ok_or_else(|| self.missing(&id))?;
        self.dump(record)
    }

    async fn remove(&self, ctx: &CallContext, id: Value, _params: Params) -> Result<Value> {
        if !ctx.store()?.delete(S::TABLE, &id).await? {
            return Err(self.missing(&id));
        }
        Ok(Value::Null)
    }

    async fn list_ids(&self, ctx: &CallContext, params: Params) -> Result<Value> {
        let store = ctx.store()?;
        let info = store.describe(S::TABLE).await?;
        if info.is_composite() {
            return Err(Error::not_implemented(
                "No implementation for composite primary keys.",
            ));
        }

        let mut filter = Vec::new();
        match params.get("filter") {
            None | Some(Value::Null) => {}
            Some(Value::Object(pairs)) => {
                for (field, value) in pairs {
                    let column = column_for::<S>(field);
                    if !info.has_column(column) {
                        return Err(Error::bad_request(format!(
                            "Can not filter by '{}' on {} - no such field.",
                            column,
                            self.name()
                        )));
                    }
                    if !self.exposed_fields.iter().any(|f| f == field) {
                        return Err(Error::unauthorized(format!(
                            "Can not filter by excluded property '{}' on {}",
                            column,
                            self.name()
                        )));
                    }
                    filter.push((column.to_string(), value.clone()));
                }
            }
            Some(_) => {
                return Err(Error::bad_request(
                    "filter must be a JSON object of key/value pairs",
                ));
            }
        }

        let ids = store.select_ids(S::TABLE, &filter).await?;
        Ok(Value::Array(ids))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Accessor;
    use crate::store::{MemoryStore, TableInfo};
    use serde::Deserialize;

    #[derive(Serialize, Deserialize, JsonSchema)]
    struct CanalOut {
        id: i64,
        width: Option<i64>,
        name: Option<String>,
        read_only: Option<i64>,
    }

    #[derive(Serialize, Deserialize, Validate)]
    #[serde(deny_unknown_fields)]
    struct CanalIn {
        width: Option<i64>,
        #[validate(length(min = 1, max = 32))]
        name: Option<String>,
    }

    struct Canal;

    impl RecordSchema for Canal {
        const TABLE: &'static str = "canal";
        type Dump = CanalOut;
        type Load = CanalIn;

        fn into_record(load: CanalIn) -> Result<Record> {
            let value = json!({
                "width": load.width,
                "name": load.name,
                "read_only": 5,
                "internal_only": "secret",
            });
            Ok(value.as_object().cloned().unwrap_or_default())
        }
    }

    #[derive(Serialize, Deserialize, JsonSchema)]
    struct GateOut {
        id: i64,
        label: Option<String>,
    }

    #[derive(Serialize, Deserialize, Validate)]
    struct GateIn {
        label: Option<String>,
    }

    struct Gate;

    impl RecordSchema for Gate {
        const TABLE: &'static str = "gate";
        type Dump = GateOut;
        type Load = GateIn;

        fn field_remap() -> &'static [(&'static str, &'static str)] {
            &[("label", "gate_label")]
        }
    }

    fn store() -> Arc<MemoryStore> {
        Arc::new(
            MemoryStore::new()
                .with_table(
                    TableInfo::new("canal")
                        .column("width")
                        .column("name")
                        .column("read_only")
                        .column("internal_only"),
                )
                .with_table(TableInfo::new("gate").column("gate_label"))
                .with_table(TableInfo::new("lock").primary_key(["canal_id", "position"])),
        )
    }

    fn ctx(store: Arc<MemoryStore>) -> CallContext {
        CallContext::default()
            .with_store(Some(store))
            .with_accessor(Some(Accessor::new(())))
    }

    fn canals() -> TableResource<Canal> {
        TableResource::<Canal>::new("/canal")
            .allow([Method::GET, Method::POST, Method::PUT, Method::DELETE])
            .write_access(|ctx, _| ctx.is_authenticated())
    }

    fn params(value: Value) -> Params {
        value.as_object().cloned().unwrap()
    }

    #[derive(Serialize, Deserialize, JsonSchema)]
    struct Gauge {
        depth: f64,
    }

    #[derive(Serialize, Deserialize, JsonSchema)]
    struct WeirOut {
        id: i64,
        gauge: Option<Gauge>,
    }

    struct Weir;

    impl RecordSchema for Weir {
        const TABLE: &'static str = "weir";
        type Dump = WeirOut;
        type Load = GateIn;
    }

    fn collect_refs(value: &Value, refs: &mut Vec<String>) {
        match value {
            Value::Object(object) => {
                if let Some(Value::String(target)) = object.get("$ref") {
                    refs.push(target.clone());
                }
                object.values().for_each(|v| collect_refs(v, refs));
            }
            Value::Array(items) => items.iter().for_each(|v| collect_refs(v, refs)),
            _ => {}
        }
    }

    #[test]
    fn test_nested_dump_refs_resolve_in_document() {
        let weirs = TableResource::<Weir>::new("weir").allow([Method::GET]);
        assert!(weirs.component_schema().get("components").is_none());
        assert!(weirs.schema_definitions().contains_key("Gauge"));

        let api = crate::api::Api::new("api", "v1", "Waterways");
        api.doc_add_resource(&weirs);
        let doc = api.doc_view();

        let mut refs = Vec::new();
        collect_refs(&doc["components"]["schemas"]["weir"], &mut refs);
        assert_eq!(refs, ["#/components/schemas/Gauge"]);

        for target in &refs {
            let pointer = target.trim_start_matches('#');
            assert!(doc.pointer(pointer).is_some(), "dangling {}", target);
        }
    }

    #[test]
    fn test_component_schema() {
        let resource = canals();
        let schema = resource.component_schema();
        assert!(schema.get("$schema").is_none());
        assert!(schema.get("title").is_none());
        assert_eq!(schema["type"], "object");
        assert!(resource.schema_definitions().is_empty());
        let mut fields = resource.exposed_fields().to_vec();
        fields.sort();
        assert_eq!(fields, vec!["id", "name", "read_only", "width"]);
    }

    #[tokio::test]
    async fn test_create_dumps_stored_record() {
        let ctx = ctx(store());
        let created = canals()
            .post(&ctx, json!({"width": 7, "name": "Oxford Canal"}), Params::new())
            .await
            .unwrap();

        assert_eq!(
            created,
            json!({"id": 1, "width": 7, "name": "Oxford Canal", "read_only": 5})
        );
    }

    #[tokio::test]
    async fn test_create_validation() {
        let ctx = ctx(store());

        let err = canals()
            .post(&ctx, json!({"width": 7, "name": ""}), Params::new())
            .await
            .unwrap_err();
        assert_eq!(err.status, 400);
        assert!(err.message.starts_with("Validation failed for: "));
        assert!(err.details.is_some());

        let err = canals()
            .post(&ctx, json!({"read_only": 1}), Params::new())
            .await
            .unwrap_err();
        assert_eq!(err.status, 400);

        let err = canals()
            .post(&ctx, json!([7]), Params::new())
            .await
            .unwrap_err();
        assert_eq!(err.status, 400);
    }

    #[tokio::test]
    async fn test_fetch_missing() {
        let ctx = ctx(store());
        let err = canals().get(&ctx, json!(99), Params::new()).await.unwrap_err();
        assert_eq!(err.status, 404);
        assert_eq!(err.message, "canal ID=99 does not exist.");

        let err = canals()
            .get(&ctx, json!("nine"), Params::new())
            .await
            .unwrap_err();
        assert_eq!(err.message, "canal ID=nine does not exist.");
    }

    #[tokio::test]
    async fn test_update_applies_provided_keys() {
        let ctx = ctx(store());
        let resource = canals();
        resource
            .post(&ctx, json!({"width": 14, "name": "Grand Junction"}), Params::new())
            .await
            .unwrap();

        let updated = resource
            .put(&ctx, json!(1), json!({"width": 99}), Params::new())
            .await
            .unwrap();
        assert_eq!(
            updated,
            json!({"id": 1, "width": 99, "name": "Grand Junction", "read_only": 5})
        );

        let err = resource
            .put(&ctx, json!(1), json!({"read_only": 99}), Params::new())
            .await
            .unwrap_err();
        assert_eq!(err.status, 400);

        let err = resource
            .put(&ctx, json!(2), json!({"width": 1}), Params::new())
            .await
            .unwrap_err();
        assert_eq!(err.status, 404);
    }

    #[tokio::test]
    async fn test_remove() {
        let ctx = ctx(store());
        let resource = canals();
        resource
            .post(&ctx, json!({"width": 7, "name": "Oxford Canal"}), Params::new())
            .await
            .unwrap();

        assert_eq!(
            resource.delete(&ctx, json!(1), Params::new()).await.unwrap(),
            Value::Null
        );
        let err = resource
            .delete(&ctx, json!(1), Params::new())
            .await
            .unwrap_err();
        assert_eq!(err.status, 404);
    }

    #[tokio::test]
    async fn test_list_filters() {
        let ctx = ctx(store());
        let resource = canals();
        for (width, name) in [(7, "Oxford Canal"), (14, "Grand Junction")] {
            resource
                .post(&ctx, json!({"width": width, "name": name}), Params::new())
                .await
                .unwrap();
        }

        assert_eq!(resource.list(&ctx, Params::new()).await.unwrap(), json!([1, 2]));
        assert_eq!(
            resource
                .list(&ctx, params(json!({"filter": {"width": 14}})))
                .await
                .unwrap(),
            json!([2])
        );

        let err = resource
            .list(&ctx, params(json!({"filter": {"depth": 1}})))
            .await
            .unwrap_err();
        assert_eq!(err.status, 400);
        assert_eq!(err.message, "Can not filter by 'depth' on canal - no such field.");

        let err = resource
            .list(&ctx, params(json!({"filter": {"internal_only": 14}})))
            .await
            .unwrap_err();
        assert_eq!(err.status, 401);
        assert_eq!(
            err.message,
            "Can not filter by excluded property 'internal_only' on canal"
        );

        let err = resource
            .list(&ctx, params(json!({"filter": [1]})))
            .await
            .unwrap_err();
        assert_eq!(err.status, 400);
    }

    #[tokio::test]
    async fn test_field_remap() {
        let ctx = ctx(store());
        let gates = TableResource::<Gate>::new("gate").write_access(|_, _| true);

        let created = gates
            .post(&ctx, json!({"label": "upper"}), Params::new())
            .await
            .unwrap();
        assert_eq!(created, json!({"id": 1, "label": "upper"}));

        let updated = gates
            .put(&ctx, json!(1), json!({"label": "lower"}), Params::new())
            .await
            .unwrap();
        assert_eq!(updated, json!({"id": 1, "label": "lower"}));

        let ids = gates
            .list(&ctx, params(json!({"filter": {"label": "lower"}})))
            .await
            .unwrap();
        assert_eq!(ids, json!([1]));
    }

    #[tokio::test]
    async fn test_composite_key_listing() {
        #[derive(Serialize, Deserialize, JsonSchema)]
        struct LockOut {
            canal_id: i64,
            position: i64,
        }

        struct Lock;

        impl RecordSchema for Lock {
            const TABLE: &'static str = "lock";
            type Dump = LockOut;
            type Load = GateIn;
        }

        let ctx = ctx(store());
        let err = TableResource::<Lock>::new("lock")
            .list(&ctx, Params::new())
            .await
            .unwrap_err();
        assert_eq!(err.status, 501);
    }

    #[tokio::test]
    async fn test_missing_store() {
        let err = canals()
            .get(&CallContext::default(), json!(1), Params::new())
            .await
            .unwrap_err();
        assert_eq!(err.status, 500);
    }

    #[tokio::test]
    async fn test_write_access_closed_by_default() {
        let ctx = ctx(store());
        let err = TableResource::<Canal>::new("canal")
            .post(&ctx, json!({"width": 1}), Params::new())
            .await
            .unwrap_err();
        assert_eq!(err.status, 403);
    }
}
