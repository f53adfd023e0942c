//! Pre- and postprocessing hooks around the dispatch pipeline.

use cloud_util::InputCursor;

use crate::context::CommandContext;
use crate::error::CommandError;

/// Verdict of a preprocessor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProcessOutcome {
    Accepted,
    Rejected,
}

/// Runs before dispatch, in registration order. A rejection short-circuits
/// the pipeline with a no-such-command failure.
pub trait CommandPreprocessor<S: Send + Sync>: Send + Sync {
    fn preprocess(
        &self,
        context: &mut CommandContext<S>,
        input: &mut InputCursor,
    ) -> ProcessOutcome;
}

impl<S, F> CommandPreprocessor<S> for F
where
    S: Send + Sync,
    F: Fn(&mut CommandContext<S>, &mut InputCursor) -> ProcessOutcome + Send + Sync,
{
    fn preprocess(
        &self,
        context: &mut CommandContext<S>,
        input: &mut InputCursor,
    ) -> ProcessOutcome {
        self(context, input)
    }
}

/// Runs after the tree walk with the filled context, before the handler.
/// Rejecting returns the supplied failure to the caller (external permission
/// gates typically return a no-permission failure).
pub trait CommandPostprocessor<S: Send + Sync>: Send + Sync {
    fn postprocess(&self, context: &mut CommandContext<S>) -> Result<(), CommandError>;
}

impl<S, F> CommandPostprocessor<S> for F
where
    S: Send + Sync,
    F: Fn(&mut CommandContext<S>) -> Result<(), CommandError> + Send + Sync,
{
    fn postprocess(&self, context: &mut CommandContext<S>) -> Result<(), CommandError> {
        self(context)
    }
}
