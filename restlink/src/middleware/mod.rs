//! Request middleware.
//!
//! Middleware wraps the router: each one receives the request and the rest
//! of the chain as [`Next`], and may act before and after calling it.
//! The chain runs in the order middleware was added.

mod request_log;
mod trace_id;

pub use request_log::RequestLogMiddleware;
pub use trace_id::{TRACE_ID_HEADER, TraceIdMiddleware};

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use hyper::body::Incoming;
use hyper::{Request, Response};

use crate::context::RequestContext;
use crate::response::BoxBody;
use crate::router::Router;
use crate::state::AppState;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

pub trait Middleware: Send + Sync + 'static {
    fn handle<'a>(
        &'a self,
        req: Request<Incoming>,
        ctx: &'a RequestContext,
        next: Next<'a>,
    ) -> BoxFuture<'a, Response<BoxBody>>;
}

/// Where a chain ends.
#[derive(Clone, Copy)]
struct Terminal<'a> {
    router: &'a Router,
    state: &'a Arc<AppState>,
}

/// The part of the chain after the current middleware.
pub struct Next<'a> {
    remaining: &'a [Arc<dyn Middleware>],
    terminal: Terminal<'a>,
    ctx: &'a RequestContext,
}

impl<'a> Next<'a> {
    /// Passes the request on, to the router once no middleware is left.
    pub async fn run(self, req: Request<Incoming>) -> Response<BoxBody> {
        let Some((first, remaining)) = self.remaining.split_first() else {
            return self.terminal.router.handle(req, self.terminal.state).await;
        };
        let ctx = self.ctx;
        first.handle(req, ctx, Next { remaining, ..self }).await
    }

    /// How many middleware still run before the router.
    pub fn remaining(&self) -> usize {
        self.remaining.len()
    }
}

#[derive(Clone, Default)]
pub struct MiddlewareStack {
    chain: Vec<Arc<dyn Middleware>>,
}

impl MiddlewareStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add<M: Middleware>(&mut self, middleware: M) {
        self.push(Arc::new(middleware));
    }

    pub fn push(&mut self, middleware: Arc<dyn Middleware>) {
        self.chain.push(middleware);
    }

    pub fn len(&self) -> usize {
        self.chain.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }

    /// Runs `req` through the whole chain and the router.
    pub async fn execute(
        &self,
        req: Request<Incoming>,
        router: &Router,
        state: &Arc<AppState>,
        ctx: &RequestContext,
    ) -> Response<BoxBody> {
        Next {
            remaining: &self.chain,
            terminal: Terminal { router, state },
            ctx,
        }
        .run(req)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stack_keeps_added_middleware() {
        let mut stack = MiddlewareStack::new();
        assert!(stack.is_empty());

        stack.add(TraceIdMiddleware::new());
        stack.push(Arc::new(RequestLogMiddleware::new()));
        assert_eq!(stack.len(), 2);
        assert_eq!(stack.clone().len(), 2);
    }
}
