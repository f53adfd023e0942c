//! Derived parsers: fallible mapping and ordered alternatives.

use std::marker::PhantomData;

use async_trait::async_trait;
use cloud_types::{Suggestion, ValueType};
use cloud_util::InputCursor;

use crate::context::CommandContext;
use crate::error::ParseFailure;
use crate::parser::{AcceptClass, ArgumentParser};

/// Transform a parser's output with a fallible mapping.
///
/// On success of the inner parser the cursor advance is preserved; on
/// failure of either the inner parser or the mapping, the cursor is restored
/// to its pre-attempt offset.
pub fn map<P, F, T>(parser: P, mapper: F) -> MappedParser<P, F, T> {
    MappedParser {
        parser,
        mapper,
        _output: PhantomData,
    }
}

/// Try `primary`; on failure restore the cursor and try `fallback` from the
/// same offset. When both fail, the compound failure carries both child
/// failures and both value-type descriptors.
pub fn either<P, Q>(primary: P, fallback: Q) -> EitherParser<P, Q> {
    EitherParser { primary, fallback }
}

/// See [`map`].
pub struct MappedParser<P, F, T> {
    parser: P,
    mapper: F,
    _output: PhantomData<fn() -> T>,
}

#[async_trait]
impl<S, P, F, T> ArgumentParser<S> for MappedParser<P, F, T>
where
    S: Send + Sync + 'static,
    P: ArgumentParser<S>,
    F: Fn(P::Output) -> Result<T, ParseFailure> + Send + Sync,
    T: Clone + Send + Sync + 'static,
{
    type Output = T;

    async fn parse(
        &self,
        context: &mut CommandContext<S>,
        input: &mut InputCursor,
    ) -> Result<T, ParseFailure> {
        let saved = input.save();
        match self.parser.parse(context, input).await {
            Ok(value) => match (self.mapper)(value) {
                Ok(mapped) => Ok(mapped),
                Err(failure) => {
                    input.restore(saved);
                    Err(failure)
                }
            },
            Err(failure) => {
                input.restore(saved);
                Err(failure)
            }
        }
    }

    async fn suggest(&self, context: &CommandContext<S>, input: &str) -> Vec<Suggestion> {
        self.parser.suggest(context, input).await
    }

    fn value_type(&self) -> ValueType {
        ValueType::parameterised::<T>(vec![self.parser.value_type()])
    }

    fn accept_class(&self) -> AcceptClass {
        self.parser.accept_class()
    }

    fn is_context_free(&self) -> bool {
        self.parser.is_context_free()
    }

    fn parser_name(&self) -> String {
        format!("mapped({})", self.parser.parser_name())
    }
}

/// Value produced by an [`EitherParser`], tagged with the branch that won.
#[derive(Clone, Debug, PartialEq)]
pub enum Either<L, R> {
    Primary(L),
    Fallback(R),
}

impl<T> Either<T, T> {
    /// Collapse both branches when they carry the same type.
    pub fn merged(self) -> T {
        match self {
            Either::Primary(value) | Either::Fallback(value) => value,
        }
    }
}

/// See [`either`].
pub struct EitherParser<P, Q> {
    primary: P,
    fallback: Q,
}

#[async_trait]
impl<S, P, Q> ArgumentParser<S> for EitherParser<P, Q>
where
    S: Send + Sync + 'static,
    P: ArgumentParser<S>,
    Q: ArgumentParser<S>,
{
    type Output = Either<P::Output, Q::Output>;

    async fn parse(
        &self,
        context: &mut CommandContext<S>,
        input: &mut InputCursor,
    ) -> Result<Self::Output, ParseFailure> {
        let saved = input.save();
        let offending = input.peek_string();
        let primary_failure = match self.primary.parse(context, input).await {
            Ok(value) => return Ok(Either::Primary(value)),
            Err(failure) => {
                input.restore(saved);
                failure
            }
        };
        match self.fallback.parse(context, input).await {
            Ok(value) => Ok(Either::Fallback(value)),
            Err(fallback_failure) => {
                input.restore(saved);
                Err(ParseFailure::either(
                    offending,
                    self.primary.value_type().short_name(),
                    self.fallback.value_type().short_name(),
                    primary_failure,
                    fallback_failure,
                ))
            }
        }
    }

    async fn suggest(&self, context: &CommandContext<S>, input: &str) -> Vec<Suggestion> {
        let mut candidates = self.primary.suggest(context, input).await;
        candidates.extend(self.fallback.suggest(context, input).await);
        candidates
    }

    fn value_type(&self) -> ValueType {
        ValueType::parameterised::<Self::Output>(vec![
            self.primary.value_type(),
            self.fallback.value_type(),
        ])
    }

    fn is_context_free(&self) -> bool {
        self.primary.is_context_free() && self.fallback.is_context_free()
    }

    fn parser_name(&self) -> String {
        format!(
            "either({}, {})",
            self.primary.parser_name(),
            self.fallback.parser_name()
        )
    }
}
