//! The parser contract and its object-safe erased form.
//!
//! A parser converts the token(s) under the cursor into a typed value.
//! Blocking parsers return an already-completed result; suspending parsers
//! (remote lookups, database checks) suspend at the `parse` boundary. The
//! command tree stores parsers in the erased [`UntypedParser`] form, which is
//! implemented for every [`ArgumentParser`] automatically.

pub mod compose;
pub mod registry;
pub mod standard;

use async_trait::async_trait;
use cloud_types::{Suggestion, ValueType};
use cloud_util::InputCursor;

use crate::context::{CommandContext, ContextValue};
use crate::error::ParseFailure;

/// Coarse shape of the input a parser accepts.
///
/// Used by the registration-time ambiguity check: two variable siblings are
/// deterministically distinguishable only when their accept classes are
/// disjoint. Classes that accept arbitrary words are never disjoint from
/// anything.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AcceptClass {
    Integer,
    Decimal,
    Boolean,
    Character,
    Word,
    Quoted,
    Greedy,
    Custom,
}

impl AcceptClass {
    /// Whether no input can be accepted by both classes.
    pub fn disjoint_with(self, other: AcceptClass) -> bool {
        use AcceptClass::*;
        if matches!(self, Word | Quoted | Greedy | Custom)
            || matches!(other, Word | Quoted | Greedy | Custom)
        {
            return false;
        }
        match (self, other) {
            // Every integer is also a valid decimal.
            (Integer, Decimal) | (Decimal, Integer) => false,
            // A single digit is both a character and a number.
            (Character, Integer | Decimal) | (Integer | Decimal, Character) => false,
            _ => self != other,
        }
    }
}

/// Converts cursor input into a typed value.
#[async_trait]
pub trait ArgumentParser<S: Send + Sync>: Send + Sync {
    /// The value this parser produces into the context.
    type Output: Clone + Send + Sync + 'static;

    /// Attempt to parse. On failure the cursor must be left at the offset it
    /// had on entry; the engine additionally restores it.
    async fn parse(
        &self,
        context: &mut CommandContext<S>,
        input: &mut InputCursor,
    ) -> Result<Self::Output, ParseFailure>;

    /// Completion candidates for the partially-typed token `input`.
    async fn suggest(&self, context: &CommandContext<S>, input: &str) -> Vec<Suggestion> {
        let _ = (context, input);
        Vec::new()
    }

    /// Descriptor of the produced value type.
    fn value_type(&self) -> ValueType {
        ValueType::of::<Self::Output>()
    }

    /// Coarse accepted-input shape, for ambiguity detection.
    fn accept_class(&self) -> AcceptClass {
        AcceptClass::Custom
    }

    /// Parsers that never inspect the context may advertise it; compositions
    /// use the flag to skip context plumbing.
    fn is_context_free(&self) -> bool {
        false
    }

    /// Identity carried in parse failures.
    fn parser_name(&self) -> String {
        self.value_type().short_name().to_string()
    }
}

/// Object-safe form of [`ArgumentParser`] stored in the command tree.
///
/// Implemented for every `ArgumentParser` via a blanket impl; consumers only
/// interact with this trait when sourcing parsers from the registry.
#[async_trait]
pub trait UntypedParser<S: Send + Sync>: Send + Sync {
    async fn parse_value(
        &self,
        context: &mut CommandContext<S>,
        input: &mut InputCursor,
    ) -> Result<ContextValue, ParseFailure>;

    async fn suggest_values(&self, context: &CommandContext<S>, input: &str) -> Vec<Suggestion>;

    fn value_type(&self) -> ValueType;

    fn accept_class(&self) -> AcceptClass;

    fn parser_name(&self) -> String;
}

#[async_trait]
impl<S, P> UntypedParser<S> for P
where
    S: Send + Sync + 'static,
    P: ArgumentParser<S>,
{
    async fn parse_value(
        &self,
        context: &mut CommandContext<S>,
        input: &mut InputCursor,
    ) -> Result<ContextValue, ParseFailure> {
        self.parse(context, input).await.map(ContextValue::new)
    }

    async fn suggest_values(&self, context: &CommandContext<S>, input: &str) -> Vec<Suggestion> {
        self.suggest(context, input).await
    }

    fn value_type(&self) -> ValueType {
        ArgumentParser::value_type(self)
    }

    fn accept_class(&self) -> AcceptClass {
        ArgumentParser::accept_class(self)
    }

    fn parser_name(&self) -> String {
        ArgumentParser::parser_name(self)
    }
}

/// Supplies completion candidates independently of a parser.
///
/// A variable component may carry one of these to override its parser's
/// default suggestions.
#[async_trait]
pub trait SuggestionProvider<S: Send + Sync>: Send + Sync {
    async fn suggest(&self, context: &CommandContext<S>, input: &str) -> Vec<Suggestion>;
}

/// Provider backed by a fixed candidate list.
#[derive(Clone, Debug)]
pub struct StaticSuggestions {
    candidates: Vec<Suggestion>,
}

impl StaticSuggestions {
    pub fn new(texts: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            candidates: Suggestion::all(texts),
        }
    }
}

#[async_trait]
impl<S: Send + Sync> SuggestionProvider<S> for StaticSuggestions {
    async fn suggest(&self, _context: &CommandContext<S>, _input: &str) -> Vec<Suggestion> {
        self.candidates.clone()
    }
}
