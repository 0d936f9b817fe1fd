//! Serves a small canal registry backed by the in-memory store.
//!
//! ```sh
//! cargo run -p restlink --example waterways
//! curl -X POST localhost:3000/api/v1/canal \
//!     -H 'handshake: trustworthy' -H 'content-type: application/json' \
//!     -d '{"name": "Kennet and Avon", "width": 4}'
//! curl localhost:3000/api/v1/docs
//! ```

use restlink::prelude::*;
use restlink::schemars::{self, JsonSchema};

#[derive(Serialize, Deserialize, JsonSchema)]
struct CanalOut {
    id: i64,
    width: Option<i64>,
    name: Option<String>,
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
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    restlink::config::load_dotenv();

    let store = MemoryStore::new()
        .with_table(TableInfo::new("canal").column("width").column("name"));

    let canals = TableResource::<Canal>::new("canal")
        .allow([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .write_access(|ctx, _| ctx.is_authenticated());

    let api = Api::new("api", "v1", "Waterways");
    let mut exposer = Exposer::from_config(ExposerConfig::from_env())
        .store(Arc::new(store))
        .authenticator(|info| {
            (info.header("handshake") == Some("trustworthy")).then(|| Accessor::new(()))
        });
    if let Err(e) = exposer.register(&api, canals) {
        return Err(std::io::Error::new(std::io::ErrorKind::InvalidInput, e));
    }

    Restlink::new()
        .with_tracing(TracingConfig::from_env())
        .with_introspection(true)
        .exposer(exposer)
        .listen("127.0.0.1:3000")
        .await
}
