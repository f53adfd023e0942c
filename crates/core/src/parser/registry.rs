//! Manager-scoped mapping from value types to default parser factories.
//!
//! The registry is consulted by construction-time glue (derive layers,
//! platform adapters) that needs a parser for a plain value type. The
//! execution engine always uses the parsers stored in the tree and never
//! re-resolves here.

use std::collections::HashMap;
use std::sync::Arc;

use cloud_types::ValueType;

use crate::parser::standard::{
    BooleanParser, ByteParser, CharParser, DoubleParser, FloatParser, IntegerParser, LongParser,
    ShortParser, StringParser,
};
use crate::parser::{ArgumentParser, UntypedParser};

type ParserFactory<S> = Arc<dyn Fn() -> Arc<dyn UntypedParser<S>> + Send + Sync>;

/// Value-type → default parser factory map.
pub struct ParserRegistry<S> {
    factories: HashMap<ValueType, ParserFactory<S>>,
}

impl<S: Send + Sync + 'static> ParserRegistry<S> {
    /// Empty registry.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Registry pre-populated with the standard parser set: quoted strings,
    /// characters, strict booleans, and the full-range numeric family.
    pub fn with_standard_parsers() -> Self {
        let mut registry = Self::new();
        registry.register_default(StringParser::quoted());
        registry.register_default(CharParser);
        registry.register_default(BooleanParser::strict());
        registry.register_default(ByteParser::any());
        registry.register_default(ShortParser::any());
        registry.register_default(IntegerParser::any());
        registry.register_default(LongParser::any());
        registry.register_default(FloatParser::any());
        registry.register_default(DoubleParser::any());
        registry
    }

    /// Register a factory for a value type, replacing any previous one.
    pub fn register_factory(
        &mut self,
        value_type: ValueType,
        factory: impl Fn() -> Arc<dyn UntypedParser<S>> + Send + Sync + 'static,
    ) {
        self.factories.insert(value_type, Arc::new(factory));
    }

    /// Register a cloneable parser as the default for its own value type.
    pub fn register_default<P>(&mut self, parser: P)
    where
        P: ArgumentParser<S> + Clone + 'static,
    {
        let value_type = parser.value_type();
        self.register_factory(value_type, move || {
            Arc::new(parser.clone()) as Arc<dyn UntypedParser<S>>
        });
    }

    /// Produce a parser for the value type, if a factory is registered.
    pub fn parser(&self, value_type: &ValueType) -> Option<Arc<dyn UntypedParser<S>>> {
        self.factories.get(value_type).map(|factory| factory())
    }

    /// Produce a parser for the plain type `T`.
    pub fn parser_for<T: 'static>(&self) -> Option<Arc<dyn UntypedParser<S>>> {
        self.parser(&ValueType::of::<T>())
    }

    pub fn contains(&self, value_type: &ValueType) -> bool {
        self.factories.contains_key(value_type)
    }
}

impl<S: Send + Sync + 'static> Default for ParserRegistry<S> {
    fn default() -> Self {
        Self::with_standard_parsers()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::CommandContext;
    use cloud_util::InputCursor;

    #[tokio::test]
    async fn test_standard_parsers_resolve_by_type() {
        let registry: ParserRegistry<()> = ParserRegistry::with_standard_parsers();
        let parser = registry.parser_for::<i32>().expect("i32 parser");

        let mut ctx = CommandContext::new((), String::new(), false);
        let mut cursor = InputCursor::new("42");
        let value = parser.parse_value(&mut ctx, &mut cursor).await.unwrap();
        assert_eq!(value.get::<i32>(), Some(42));
    }

    #[test]
    fn test_unregistered_type_is_absent() {
        #[derive(Clone)]
        struct Custom;
        let registry: ParserRegistry<()> = ParserRegistry::with_standard_parsers();
        assert!(registry.parser_for::<Custom>().is_none());
        assert!(!registry.contains(&ValueType::of::<Custom>()));
    }

    #[test]
    fn test_factory_replacement() {
        let mut registry: ParserRegistry<()> = ParserRegistry::new();
        registry.register_default(IntegerParser::new(0..=5));
        registry.register_default(IntegerParser::new(0..=10));
        assert!(registry.parser_for::<i32>().is_some());
        assert_eq!(registry.factories.len(), 1);
    }
}
