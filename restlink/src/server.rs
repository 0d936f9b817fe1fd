//! The HTTP server loop.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper::{Request, Response};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder;
use hyper_util::server::graceful::GracefulShutdown;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::context::RequestContext;
use crate::middleware::MiddlewareStack;
use crate::response::BoxBody;
use crate::router::Router;
use crate::state::AppState;

/// Everything a connection needs to answer requests.
#[derive(Clone)]
pub(crate) struct Pipeline {
    router: Arc<Router>,
    state: Arc<AppState>,
    middlewares: Arc<MiddlewareStack>,
}

impl Pipeline {
    pub(crate) fn new(router: Router, state: AppState, middlewares: MiddlewareStack) -> Self {
        Self {
            router: Arc::new(router),
            state: Arc::new(state),
            middlewares: Arc::new(middlewares),
        }
    }

    /// Gives the request a fresh [`RequestContext`] and runs it through the
    /// middleware and the router.
    pub(crate) async fn handle(
        &self,
        mut req: Request<Incoming>,
    ) -> Result<Response<BoxBody>, Infallible> {
        let ctx = RequestContext::new();
        req.extensions_mut().insert(ctx.clone());
        Ok(self
            .middlewares
            .execute(req, &self.router, &self.state, &ctx)
            .await)
    }
}

/// Serves until ctrl-c, then waits for open connections to finish.
pub async fn serve(
    router: Router,
    state: AppState,
    middlewares: MiddlewareStack,
    addr: SocketAddr,
) -> std::io::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %listener.local_addr()?, "restlink listening");

    let pipeline = Pipeline::new(router, state, middlewares);
    let builder = Builder::new(TokioExecutor::new());
    let graceful = GracefulShutdown::new();
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    loop {
        let (stream, peer) = tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok(conn) => conn,
                Err(e) => {
                    warn!(error = %e, "failed to accept connection");
                    continue;
                }
            },
            _ = &mut shutdown => {
                info!("shutting down");
                break;
            }
        };

        let pipeline = pipeline.clone();
        let service = service_fn(move |req: Request<Incoming>| {
            let pipeline = pipeline.clone();
            async move { pipeline.handle(req).await }
        });

        let conn = builder.serve_connection(TokioIo::new(stream), service);
        let conn = graceful.watch(conn.into_owned());
        tokio::spawn(async move {
            if let Err(e) = conn.await {
                warn!(peer = %peer, error = %e, "connection error");
            }
        });
    }

    graceful.shutdown().await;
    Ok(())
}
