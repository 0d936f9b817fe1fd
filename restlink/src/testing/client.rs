//! Test client for integration testing restlink applications.

use std::net::SocketAddr;

use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use http_body_util::{BodyExt, Full};
use hyper::Request;
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper_util::client::legacy::Client;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder;
use serde::{Serialize, de::DeserializeOwned};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

use crate::app::Restlink;
use crate::middleware::MiddlewareStack;
use crate::router::Router;
use crate::server::Pipeline;
use crate::state::AppState;

/// A test client for making HTTP requests to a restlink application.
///
/// The test client spawns a lightweight HTTP server on a random port
/// and provides a convenient API for making requests and asserting responses.
///
/// # Examples
///
/// ```ignore
/// use restlink::prelude::*;
/// use restlink::testing::TestClient;
///
/// #[tokio::test]
/// async fn test_canal_listing() {
///     let client = TestClient::new(Restlink::new().exposer(exposer)).await;
///     let response = client
///         .get("/api/v1/canal")
///         .query(&[("filter", r#"{"width":3}"#)])
///         .send()
///         .await;
///
///     assert_eq!(response.status(), StatusCode::OK);
///     assert_eq!(response.json::<Vec<u64>>(), vec![1]);
/// }
/// ```
pub struct TestClient {
    addr: SocketAddr,
    client: Client<HttpConnector, Full<Bytes>>,
    _shutdown: oneshot::Sender<()>,
}

impl TestClient {
    /// Creates a new test client from an application.
    ///
    /// This spawns a background server on a random available port.
    pub async fn new(app: Restlink) -> Self {
        let (router, state, middlewares) = app.into_parts();
        Self::from_parts(router, state, middlewares).await
    }

    /// Creates a test client from router, state, and middlewares.
    pub async fn from_parts(router: Router, state: AppState, middlewares: MiddlewareStack) -> Self {
        let pipeline = Pipeline::new(router, state, middlewares);
        let listener = TcpListener::bind(("127.0.0.1", 0)).await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (shutdown, mut stopped) = oneshot::channel::<()>();

        tokio::spawn(async move {
            let builder = Builder::new(TokioExecutor::new());
            loop {
                let stream = tokio::select! {
                    accepted = listener.accept() => match accepted {
                        Ok((stream, _)) => stream,
                        Err(_) => break,
                    },
                    _ = &mut stopped => break,
                };

                let pipeline = pipeline.clone();
                let service = service_fn(move |req: Request<Incoming>| {
                    let pipeline = pipeline.clone();
                    async move { pipeline.handle(req).await }
                });
                let conn = builder
                    .serve_connection(TokioIo::new(stream), service)
                    .into_owned();
                tokio::spawn(async move {
                    let _ = conn.await;
                });
            }
        });

        Self {
            addr,
            client: Client::builder(TokioExecutor::new()).build_http(),
            _shutdown: shutdown,
        }
    }

    /// Creates a GET request builder.
    pub fn get(&self, path: &str) -> TestRequestBuilder<'_> {
        self.request(Method::GET, path)
    }

    /// Creates a POST request builder.
    pub fn post(&self, path: &str) -> TestRequestBuilder<'_> {
        self.request(Method::POST, path)
    }

    /// Creates a PUT request builder.
    pub fn put(&self, path: &str) -> TestRequestBuilder<'_> {
        self.request(Method::PUT, path)
    }

    /// Creates a DELETE request builder.
    pub fn delete(&self, path: &str) -> TestRequestBuilder<'_> {
        self.request(Method::DELETE, path)
    }

    /// Creates a request builder with the given method and path.
    pub fn request(&self, method: Method, path: &str) -> TestRequestBuilder<'_> {
        TestRequestBuilder::new(self, method, path)
    }

    /// Returns the address the test server is listening on.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }
}

/// Builder for constructing test requests.
pub struct TestRequestBuilder<'a> {
    client: &'a TestClient,
    method: Method,
    path: String,
    headers: HeaderMap,
    body: Bytes,
}

impl<'a> TestRequestBuilder<'a> {
    fn new(client: &'a TestClient, method: Method, path: &str) -> Self {
        Self {
            client,
            method,
            path: path.to_string(),
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    /// Adds a header to the request.
    pub fn header(mut self, key: &str, value: &str) -> Self {
        self.headers.insert(
            HeaderName::from_bytes(key.as_bytes()).unwrap(),
            HeaderValue::from_str(value).unwrap(),
        );
        self
    }

    /// Sets a JSON body on the request.
    pub fn json<T: Serialize>(mut self, body: &T) -> Self {
        self.body = Bytes::from(serde_json::to_vec(body).unwrap());
        self.headers.insert(
            http::header::CONTENT_TYPE,
            HeaderValue::from_static("application/json"),
        );
        self
    }

    /// Appends URL-encoded query parameters to the path.
    pub fn query<T: Serialize + ?Sized>(mut self, query: &T) -> Self {
        let encoded = serde_urlencoded::to_string(query).unwrap();
        if !encoded.is_empty() {
            let separator = if self.path.contains('?') { '&' } else { '?' };
            self.path = format!("{}{}{}", self.path, separator, encoded);
        }
        self
    }

    /// Sets raw body bytes.
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Sends the request and reads the whole response.
    pub async fn send(self) -> TestResponse {
        let uri = format!("http://{}{}", self.client.addr, self.path);
        let mut request = Request::new(Full::new(self.body));
        *request.method_mut() = self.method;
        *request.uri_mut() = uri.parse().unwrap();
        *request.headers_mut() = self.headers;

        let (parts, body) = self.client.client.request(request).await.unwrap().into_parts();
        TestResponse {
            status: parts.status,
            headers: parts.headers,
            body: body.collect().await.unwrap().to_bytes(),
        }
    }
}

/// Response from a test request.
pub struct TestResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Bytes,
}

impl TestResponse {
    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns the response body as text.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).to_string()
    }

    pub fn bytes(&self) -> &Bytes {
        &self.body
    }

    /// Deserializes the response body as JSON, panicking with the body
    /// if it does not fit `T`.
    pub fn json<T: DeserializeOwned>(&self) -> T {
        self.try_json()
            .unwrap_or_else(|e| panic!("unexpected response body ({}): {}", e, self.text()))
    }

    /// Attempts to deserialize the response body as JSON.
    pub fn try_json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::TRACE_ID_HEADER;

    #[tokio::test]
    async fn test_client_get() {
        let app = Restlink::new().router(Router::new().get("/", |_, _, _| async { "Hello!" }));

        let client = TestClient::new(app).await;
        let response = client.get("/").send().await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.text(), "Hello!");
        assert!(response.headers().contains_key(TRACE_ID_HEADER));
    }

    #[tokio::test]
    async fn test_client_query_and_json() {
        let app = Restlink::new().router(Router::new().put("/echo", |req, _, _| async move {
            let query = req.uri().query().unwrap_or("").to_string();
            let body = req.into_body().collect().await.unwrap().to_bytes();
            format!("{}|{}", query, String::from_utf8_lossy(&body))
        }));

        let client = TestClient::new(app).await;
        let response = client
            .put("/echo")
            .query(&[("filter", r#"{"width":3}"#)])
            .json(&serde_json::json!({"name": "north"}))
            .send()
            .await;

        assert_eq!(
            response.text(),
            r#"filter=%7B%22width%22%3A3%7D|{"name":"north"}"#
        );
    }

    #[tokio::test]
    async fn test_client_with_headers() {
        let app = Restlink::new().router(Router::new().get("/headers", |req, _, _| async move {
            req.headers()
                .get("handshake")
                .and_then(|v| v.to_str().ok())
                .unwrap_or("")
                .to_string()
        }));

        let client = TestClient::new(app).await;
        let response = client
            .get("/headers")
            .header("handshake", "trustworthy")
            .send()
            .await;

        assert_eq!(response.text(), "trustworthy");
    }

    #[tokio::test]
    async fn test_client_not_found() {
        let client = TestClient::new(Restlink::new()).await;
        let response = client.delete("/nonexistent").send().await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert!(client.addr().port() > 0);
    }

    #[tokio::test]
    async fn test_trace_id_propagated() {
        let client = TestClient::new(Restlink::new()).await;
        let response = client
            .get("/nonexistent")
            .header(TRACE_ID_HEADER, "trace-lock-7")
            .send()
            .await;

        assert_eq!(response.headers()[TRACE_ID_HEADER], "trace-lock-7");
    }
}
