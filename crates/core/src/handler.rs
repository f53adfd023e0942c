//! The terminal handler contract and adapters for plain closures.

use async_trait::async_trait;
use futures_util::future::BoxFuture;

use crate::context::CommandContext;

/// Invoked when traversal reaches a terminal node with all arguments parsed.
///
/// Errors returned here are wrapped as command-execution failures with the
/// cause retained.
#[async_trait]
pub trait CommandHandler<S: Send + Sync>: Send + Sync {
    async fn handle(&self, context: &mut CommandContext<S>) -> anyhow::Result<()>;
}

/// Adapter for synchronous handler closures.
pub struct BlockingHandler<F>(pub F);

#[async_trait]
impl<S, F> CommandHandler<S> for BlockingHandler<F>
where
    S: Send + Sync + 'static,
    F: Fn(&mut CommandContext<S>) -> anyhow::Result<()> + Send + Sync,
{
    async fn handle(&self, context: &mut CommandContext<S>) -> anyhow::Result<()> {
        (self.0)(context)
    }
}

/// Adapter for closures returning boxed futures.
pub struct AsyncHandler<F>(pub F);

#[async_trait]
impl<S, F> CommandHandler<S> for AsyncHandler<F>
where
    S: Send + Sync + 'static,
    F: for<'a> Fn(&'a mut CommandContext<S>) -> BoxFuture<'a, anyhow::Result<()>> + Send + Sync,
{
    async fn handle(&self, context: &mut CommandContext<S>) -> anyhow::Result<()> {
        (self.0)(context).await
    }
}
