//! Per-execution context: the typed value bag, the flag bag, and the
//! metadata the engine accumulates while walking the tree.

use std::any::{Any, TypeId};
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use indexmap::IndexMap;

use crate::error::ParseFailure;

/// A type-erased, immutably shared value with its type descriptor attached.
#[derive(Clone)]
pub struct ContextValue {
    value: Arc<dyn Any + Send + Sync>,
    type_id: TypeId,
    type_name: &'static str,
}

impl ContextValue {
    pub fn new<T: Send + Sync + 'static>(value: T) -> Self {
        Self {
            value: Arc::new(value),
            type_id: TypeId::of::<T>(),
            type_name: std::any::type_name::<T>(),
        }
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub fn is<T: 'static>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }

    pub fn downcast_ref<T: 'static>(&self) -> Option<&T> {
        self.value.downcast_ref::<T>()
    }

    /// Clone the inner value out, if it is a `T`.
    pub fn get<T: Clone + 'static>(&self) -> Option<T> {
        self.value.downcast_ref::<T>().cloned()
    }
}

impl fmt::Debug for ContextValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContextValue({})", self.type_name)
    }
}

/// Typed key into a [`CommandContext`] value bag.
///
/// A key is a name plus a compile-time type; lookups validate the stored
/// value's type descriptor against the key's.
pub struct ContextKey<T> {
    name: Cow<'static, str>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> ContextKey<T> {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            name: name.into(),
            _marker: PhantomData,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl<T> Clone for ContextKey<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> fmt::Debug for ContextKey<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContextKey({})", self.name)
    }
}

/// A parse failure remembered during permissive traversal, together with the
/// cursor offset at which the attempt started.
#[derive(Clone, Debug)]
pub struct RememberedFailure {
    pub offset: usize,
    pub failure: ParseFailure,
}

/// Value recorded for one occurrence of a flag.
#[derive(Clone, Debug)]
pub enum FlagValue {
    /// Presence flag marker.
    Present,
    /// Parsed value of a value-bearing flag.
    Value(ContextValue),
}

/// Per-execution bag of parsed flags, keyed by long name.
///
/// Repeatable flags accumulate values in encounter order; presence flags
/// store [`FlagValue::Present`] markers.
#[derive(Clone, Debug, Default)]
pub struct FlagContext {
    values: IndexMap<String, Vec<FlagValue>>,
}

impl FlagContext {
    pub fn is_present(&self, name: &str) -> bool {
        self.values.get(name).is_some_and(|values| !values.is_empty())
    }

    /// Number of occurrences of the flag.
    pub fn count(&self, name: &str) -> usize {
        self.values.get(name).map_or(0, Vec::len)
    }

    /// First recorded value of a value-bearing flag.
    pub fn first<T: Clone + 'static>(&self, name: &str) -> Option<T> {
        self.values.get(name)?.iter().find_map(|value| match value {
            FlagValue::Value(stored) => stored.get::<T>(),
            FlagValue::Present => None,
        })
    }

    /// Every recorded value of a value-bearing flag, in encounter order.
    pub fn all<T: Clone + 'static>(&self, name: &str) -> Vec<T> {
        self.values
            .get(name)
            .map(|values| {
                values
                    .iter()
                    .filter_map(|value| match value {
                        FlagValue::Value(stored) => stored.get::<T>(),
                        FlagValue::Present => None,
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Long names of every flag seen, in encounter order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub(crate) fn add_present(&mut self, name: &str) {
        self.values
            .entry(name.to_string())
            .or_default()
            .push(FlagValue::Present);
    }

    pub(crate) fn add_value(&mut self, name: &str, value: ContextValue) {
        self.values
            .entry(name.to_string())
            .or_default()
            .push(FlagValue::Value(value));
    }
}

/// Per-execution key→value map plus execution metadata.
///
/// Values are keyed by `(name, type)`: the typed accessors validate the
/// stored type descriptor, so a lookup under the wrong type returns `None`
/// rather than a bogus value. A context lives for exactly one execution.
pub struct CommandContext<S> {
    sender: S,
    raw_input: String,
    suggestions_run: bool,
    values: HashMap<String, ContextValue>,
    flags: FlagContext,
    failures: Vec<RememberedFailure>,
    matched_path: Vec<String>,
}

impl<S> CommandContext<S> {
    pub(crate) fn new(sender: S, raw_input: String, suggestions_run: bool) -> Self {
        Self {
            sender,
            raw_input,
            suggestions_run,
            values: HashMap::new(),
            flags: FlagContext::default(),
            failures: Vec::new(),
            matched_path: Vec::new(),
        }
    }

    /// Standalone context for driving a parser outside an execution, for
    /// example in adapter tests.
    pub fn detached(sender: S, raw_input: impl Into<String>) -> Self {
        Self::new(sender, raw_input.into(), false)
    }

    /// The sender this execution runs on behalf of.
    pub fn sender(&self) -> &S {
        &self.sender
    }

    /// The unmodified input line.
    pub fn raw_input(&self) -> &str {
        &self.raw_input
    }

    /// Whether this context belongs to a suggestion run rather than an
    /// execution.
    pub fn is_suggestions(&self) -> bool {
        self.suggestions_run
    }

    /// Typed lookup; `None` when absent or stored under a different type.
    pub fn get<T: Clone + 'static>(&self, key: &ContextKey<T>) -> Option<T> {
        self.values.get(key.name())?.get::<T>()
    }

    /// Typed lookup falling back to `T::default()`.
    pub fn get_or_default<T: Clone + Default + 'static>(&self, key: &ContextKey<T>) -> T {
        self.get(key).unwrap_or_default()
    }

    /// Whether a value of the key's type is stored under the key's name.
    pub fn contains<T: 'static>(&self, key: &ContextKey<T>) -> bool {
        self.values
            .get(key.name())
            .is_some_and(|stored| stored.is::<T>())
    }

    /// Store a typed value, replacing any previous entry under the name.
    pub fn store<T: Send + Sync + 'static>(&mut self, key: &ContextKey<T>, value: T) {
        self.values
            .insert(key.name().to_string(), ContextValue::new(value));
    }

    /// Return the stored value, computing and storing it first if absent.
    pub fn compute_if_absent<T: Clone + Send + Sync + 'static>(
        &mut self,
        key: &ContextKey<T>,
        compute: impl FnOnce() -> T,
    ) -> T {
        if let Some(existing) = self.get(key) {
            return existing;
        }
        let value = compute();
        self.store(key, value.clone());
        value
    }

    /// The flag bag filled by the flag sub-parser.
    pub fn flags(&self) -> &FlagContext {
        &self.flags
    }

    /// Parser failures remembered while siblings were tried, deepest last
    /// not guaranteed; the engine surfaces the most-advanced one.
    pub fn parse_failures(&self) -> &[RememberedFailure] {
        &self.failures
    }

    /// Names of the nodes matched so far, in traversal order.
    pub fn matched_path(&self) -> &[String] {
        &self.matched_path
    }

    pub(crate) fn flags_mut(&mut self) -> &mut FlagContext {
        &mut self.flags
    }

    pub(crate) fn store_erased(&mut self, name: &str, value: ContextValue) {
        self.values.insert(name.to_string(), value);
    }

    pub(crate) fn remove_erased(&mut self, name: &str) {
        self.values.remove(name);
    }

    pub(crate) fn value_raw(&self, name: &str) -> Option<&ContextValue> {
        self.values.get(name)
    }

    pub(crate) fn remember_failure(&mut self, offset: usize, failure: ParseFailure) {
        self.failures.push(RememberedFailure { offset, failure });
    }

    pub(crate) fn push_matched(&mut self, segment: impl Into<String>) {
        self.matched_path.push(segment.into());
    }

    pub(crate) fn pop_matched(&mut self) {
        self.matched_path.pop();
    }
}

impl<S> fmt::Debug for CommandContext<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandContext")
            .field("raw_input", &self.raw_input)
            .field("suggestions_run", &self.suggestions_run)
            .field("values", &self.values.keys().collect::<Vec<_>>())
            .field("matched_path", &self.matched_path)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> CommandContext<()> {
        CommandContext::new((), "test input".into(), false)
    }

    #[test]
    fn test_store_and_get_round_trip() {
        let mut ctx = context();
        let key = ContextKey::<i32>::new("count");
        ctx.store(&key, 4);
        assert_eq!(ctx.get(&key), Some(4));
        assert!(ctx.contains(&key));
    }

    #[test]
    fn test_get_validates_type() {
        let mut ctx = context();
        ctx.store(&ContextKey::<i32>::new("count"), 4);
        let wrong = ContextKey::<String>::new("count");
        assert_eq!(ctx.get(&wrong), None);
        assert!(!ctx.contains(&wrong));
    }

    #[test]
    fn test_get_or_default() {
        let ctx = context();
        assert_eq!(ctx.get_or_default(&ContextKey::<i32>::new("absent")), 0);
    }

    #[test]
    fn test_compute_if_absent_stores_once() {
        let mut ctx = context();
        let key = ContextKey::<String>::new("value");
        assert_eq!(ctx.compute_if_absent(&key, || "a".to_string()), "a");
        assert_eq!(ctx.compute_if_absent(&key, || "b".to_string()), "a");
    }

    #[test]
    fn test_flag_context_accumulates_repeatable() {
        let mut flags = FlagContext::default();
        flags.add_value("tag", ContextValue::new("x".to_string()));
        flags.add_value("tag", ContextValue::new("y".to_string()));
        assert_eq!(flags.count("tag"), 2);
        assert_eq!(flags.first::<String>("tag"), Some("x".to_string()));
        assert_eq!(flags.all::<String>("tag"), vec!["x".to_string(), "y".to_string()]);
    }

    #[test]
    fn test_flag_context_presence() {
        let mut flags = FlagContext::default();
        assert!(!flags.is_present("silent"));
        flags.add_present("silent");
        assert!(flags.is_present("silent"));
        assert_eq!(flags.first::<String>("silent"), None);
    }

    #[test]
    fn test_matched_path_push_pop() {
        let mut ctx = context();
        ctx.push_matched("give");
        ctx.push_matched("Alice");
        assert_eq!(ctx.matched_path(), ["give", "Alice"]);
        ctx.pop_matched();
        assert_eq!(ctx.matched_path(), ["give"]);
    }
}
