//! The route serving an API's document

use std::sync::Arc;

use crate::api::Api;
use crate::exposer::{Call, Transfer, TransferFuture};

/// Transfer function of the `{root}/docs` route. It answers with the
/// document as published when the request arrives.
pub fn docs_transfer(api: Api) -> Transfer {
    Arc::new(move |_call: Call| {
        let doc = api.doc_view();
        Box::pin(async move { Ok(doc.as_ref().clone()) }) as TransferFuture
    })
}
