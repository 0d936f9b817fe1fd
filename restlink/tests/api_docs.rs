//! Route layout and API documents across base paths and several APIs.

use http::StatusCode;
use restlink::error::ExposeError;
use restlink::prelude::*;
use restlink::testing::TestClient;
use serde_json::{Value, json};

struct Lock;

#[async_trait]
impl Resource for Lock {
    fn rest_path(&self) -> &str {
        "structures/lock"
    }

    fn allowed_methods(&self) -> &[Method] {
        &[Method::GET]
    }

    async fn fetch(&self, _ctx: &CallContext, id: Value, _params: Params) -> Result<Value> {
        Ok(json!({"id": id, "rise": 2}))
    }

    async fn list_ids(&self, _ctx: &CallContext, _params: Params) -> Result<Value> {
        Ok(json!([1, 2]))
    }
}

#[tokio::test]
async fn test_base_path_and_nested_rest_path() {
    let api = Api::new("api", "v2", "Locks");
    let mut exposer = Exposer::from_config(ExposerConfig::new("/waterways/"));
    exposer.register(&api, Lock).unwrap();

    let client = TestClient::new(Restlink::new().exposer(exposer)).await;

    let response = client
        .get("/waterways/api/v2/structures/lock/2")
        .send()
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.json::<Value>(), json!({"id": 2, "rise": 2}));

    let response = client.get("/waterways/api/v2/structures/lock").send().await;
    assert_eq!(response.json::<Value>(), json!([1, 2]));

    let doc: Value = client.get("/waterways/api/v2/docs").send().await.json();
    assert_eq!(doc["servers"], json!([{"url": "/waterways/api/v2"}]));
    assert_eq!(
        doc["paths"]["/structures/lock/{id}"]["get"]["operationId"],
        "api_v2_lock_GET_s"
    );
    assert!(doc["components"]["schemas"].get("lock").is_some());

    let response = client.get("/api/v2/structures/lock").send().await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_apis_keep_separate_documents() {
    let v1 = Api::new("api", "v1", "Locks");
    let v2 = Api::new("api", "v2", "Locks");
    let mut exposer = Exposer::new();
    exposer.register(&v1, Lock).unwrap();
    exposer.register(&v2, Lock).unwrap();

    assert_eq!(
        exposer.register(&v1, Lock),
        Err(ExposeError::DuplicateResource {
            name: "lock".to_string(),
            api: "<API api v1>".to_string(),
        })
    );
    assert_eq!(exposer.apis().count(), 2);

    let client = TestClient::new(Restlink::new().exposer(exposer)).await;
    let first: Value = client.get("/api/v1/docs").send().await.json();
    let second: Value = client.get("/api/v2/docs").send().await.json();

    assert_eq!(first["info"]["version"], "v1");
    assert_eq!(second["info"]["version"], "v2");
    assert_eq!(first["servers"], json!([{"url": "/api/v1"}]));
    assert_eq!(second["servers"], json!([{"url": "/api/v2"}]));
}

#[tokio::test]
async fn test_document_edits_are_served() {
    let api = Api::new("api", "v1", "Locks");
    let mut exposer = Exposer::new();
    exposer.register(&api, Lock).unwrap();

    let client = TestClient::new(Restlink::bare().exposer(exposer)).await;

    let doc: Value = client.get("/api/v1/docs").send().await.json();
    assert!(doc["info"].get("description").is_none());

    api.with_spec(|spec| spec.info.description = Some("Locks of the Grand Union".to_string()));

    let response = client.get("/api/v1/docs").send().await;
    assert!(!response.headers().contains_key("x-trace-id"));
    assert_eq!(
        response.json::<Value>()["info"]["description"],
        "Locks of the Grand Union"
    );
}

#[tokio::test]
async fn test_exposed_routes_beside_hand_written_ones() {
    let api = Api::new("api", "v1", "Locks");
    let mut exposer = Exposer::new();
    exposer.register(&api, Lock).unwrap();

    let router = Router::new().get("/health", |_, _, _| async { StatusCode::NO_CONTENT });
    let client = TestClient::new(
        Restlink::new()
            .router(router)
            .exposer(exposer)
            .with_introspection(true),
    )
    .await;

    let response = client.get("/health").send().await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let routes: Vec<Value> = client.get("/.__restlink/routes").send().await.json();
    let paths: Vec<&str> = routes.iter().filter_map(|r| r["path"].as_str()).collect();
    assert_eq!(
        paths,
        [
            "/health",
            "/api/v1/docs",
            "/api/v1/structures/lock/:id",
            "/api/v1/structures/lock",
        ]
    );
}

struct Basin;

#[async_trait]
impl Resource for Basin {
    fn rest_path(&self) -> &str {
        "basin"
    }

    fn allowed_methods(&self) -> &[Method] {
        &[Method::GET]
    }

    async fn fetch(&self, _ctx: &CallContext, id: Value, _params: Params) -> Result<Value> {
        Ok(json!({"basin": id}))
    }
}

struct Mooring;

#[async_trait]
impl Resource for Mooring {
    fn rest_path(&self) -> &str {
        "basin/moorings"
    }

    fn allowed_methods(&self) -> &[Method] {
        &[Method::GET]
    }

    async fn fetch(&self, _ctx: &CallContext, id: Value, _params: Params) -> Result<Value> {
        Ok(json!({"mooring": id}))
    }

    async fn list_ids(&self, _ctx: &CallContext, _params: Params) -> Result<Value> {
        Ok(json!(["north", "south"]))
    }
}

#[tokio::test]
async fn test_nested_resource_below_member_route() {
    let api = Api::new("api", "v1", "Basins");
    let mut exposer = Exposer::new();
    exposer.register(&api, Basin).unwrap();
    exposer.register(&api, Mooring).unwrap();

    let client = TestClient::new(Restlink::new().exposer(exposer)).await;

    let response = client.get("/api/v1/basin/moorings").send().await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.json::<Value>(), json!(["north", "south"]));

    let response = client.get("/api/v1/basin/moorings/2").send().await;
    assert_eq!(response.json::<Value>(), json!({"mooring": 2}));

    let response = client.get("/api/v1/basin/east").send().await;
    assert_eq!(response.json::<Value>(), json!({"basin": "east"}));
}
