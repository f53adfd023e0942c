//! Execution coordinators: where pipeline futures run.
//!
//! A manager carries two coordinators, one for executions and one for
//! suggestion runs. The coordinator decides whether the pipeline future is
//! polled eagerly on the calling task, spawned onto a tokio runtime, or
//! awaited in place.

use std::future::Future;
use std::task::Poll;

use crate::error::CommandError;

/// Placement strategy for pipeline futures.
#[derive(Clone, Debug, Default)]
pub enum ExecutionCoordinator {
    /// Poll the pipeline eagerly on the calling task. With blocking parsers
    /// and handlers the whole run completes in that single poll; a parser
    /// that truly suspends is awaited in place afterwards.
    #[default]
    Simple,
    /// Spawn the pipeline onto the runtime behind `handle`. Aborting the
    /// spawned task surfaces as a cancellation failure.
    Asynchronous { handle: tokio::runtime::Handle },
    /// Await on the caller's task, preserving its thread while still letting
    /// future-returning parsers suspend naturally.
    NonScheduling,
}

impl ExecutionCoordinator {
    /// Coordinator spawning onto the current tokio runtime.
    pub fn asynchronous() -> Self {
        ExecutionCoordinator::Asynchronous {
            handle: tokio::runtime::Handle::current(),
        }
    }

    pub(crate) async fn run<T, F>(&self, pipeline: F) -> Result<T, CommandError>
    where
        T: Send + 'static,
        F: Future<Output = Result<T, CommandError>> + Send + 'static,
    {
        match self {
            ExecutionCoordinator::Simple => {
                let mut pinned = Box::pin(pipeline);
                match futures_util::poll!(pinned.as_mut()) {
                    Poll::Ready(result) => result,
                    Poll::Pending => pinned.await,
                }
            }
            ExecutionCoordinator::Asynchronous { handle } => {
                match handle.spawn(pipeline).await {
                    Ok(result) => result,
                    Err(join_error) if join_error.is_cancelled() => Err(CommandError::Cancelled),
                    Err(join_error) => Err(CommandError::Execution(anyhow::Error::new(join_error))),
                }
            }
            ExecutionCoordinator::NonScheduling => pipeline.await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_simple_completes_ready_futures() {
        let coordinator = ExecutionCoordinator::Simple;
        let result = coordinator.run(async { Ok::<_, CommandError>(7) }).await;
        assert_eq!(result.unwrap(), 7);
    }

    #[tokio::test]
    async fn test_simple_falls_back_on_suspension() {
        let coordinator = ExecutionCoordinator::Simple;
        let result = coordinator
            .run(async {
                tokio::task::yield_now().await;
                Ok::<_, CommandError>("done")
            })
            .await;
        assert_eq!(result.unwrap(), "done");
    }

    #[tokio::test]
    async fn test_asynchronous_spawns_onto_handle() {
        let coordinator = ExecutionCoordinator::asynchronous();
        let result = coordinator.run(async { Ok::<_, CommandError>(1) }).await;
        assert_eq!(result.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_non_scheduling_awaits_in_place() {
        let coordinator = ExecutionCoordinator::NonScheduling;
        let result = coordinator
            .run(async {
                tokio::task::yield_now().await;
                Ok::<_, CommandError>(2)
            })
            .await;
        assert_eq!(result.unwrap(), 2);
    }
}
