//! Dispatcher (spec §4.A): a single flat name → handler map. Unlike the
//! one-struct-per-tool registries this pattern is usually built from, the
//! ~80-entry flat surface here is registered as closures via `FnToolHandler`
//! so each subsystem's `handlers/*.rs` file can declare its tools as a flat
//! list rather than eighty near-identical unit structs.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;
use serde_json::Value;

use super::context::ToolContext;
use crate::error::Result;

#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn handle(&self, ctx: Arc<ToolContext>, args: Value) -> Result<Value>;
}

struct FnToolHandler<F> {
    f: F,
}

#[async_trait]
impl<F> ToolHandler for FnToolHandler<F>
where
    F: Fn(Arc<ToolContext>, Value) -> BoxFuture<'static, Result<Value>> + Send + Sync,
{
    async fn handle(&self, ctx: Arc<ToolContext>, args: Value) -> Result<Value> {
        (self.f)(ctx, args).await
    }
}

#[derive(Default)]
pub struct ToolRegistryBuilder {
    handlers: HashMap<&'static str, Arc<dyn ToolHandler>>,
}

impl ToolRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a tool by name with an async closure `(ctx, args) -> Result<Value>`.
    pub fn add<F, Fut>(&mut self, name: &'static str, f: F) -> &mut Self
    where
        F: Fn(Arc<ToolContext>, Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Value>> + Send + 'static,
    {
        let wrapped = FnToolHandler {
            f: move |ctx, args| -> BoxFuture<'static, Result<Value>> { Box::pin(f(ctx, args)) },
        };
        self.handlers.insert(name, Arc::new(wrapped));
        self
    }

    pub fn build(self) -> ToolRegistry {
        ToolRegistry {
            handlers: self.handlers,
        }
    }
}

pub struct ToolRegistry {
    handlers: HashMap<&'static str, Arc<dyn ToolHandler>>,
}

impl ToolRegistry {
    pub fn names(&self) -> Vec<&'static str> {
        self.handlers.keys().copied().collect()
    }

    pub fn handler(&self, name: &str) -> Option<Arc<dyn ToolHandler>> {
        self.handlers.get(name).cloned()
    }

    /// Dispatches a single `call_tool` request. Unknown names are the
    /// caller's responsibility to translate into an `isError` envelope;
    /// this returns `NotFound` for them so every path goes through the
    /// same error-shaping logic in `transport`.
    pub async fn dispatch(&self, ctx: Arc<ToolContext>, name: &str, args: Value) -> Result<Value> {
        match self.handler(name) {
            Some(handler) => handler.handle(ctx, args).await,
            None => Err(crate::error::ServerError::InvalidArgument(format!(
                "unknown tool: {name}"
            ))),
        }
    }
}
