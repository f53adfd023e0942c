//! Caption providers and failure rendering.
//!
//! The core never writes to any sink; it resolves a failure's caption key to
//! a template through the provider chain and hands the rendered text back to
//! the caller.

use std::collections::HashMap;
use std::sync::Arc;

use cloud_types::caption::{CaptionKey, default_template, format_caption};

use crate::error::CommandError;

/// Resolves caption keys to message templates for a given sender.
pub trait CaptionProvider<S>: Send + Sync {
    /// Template for `key`, or `None` to defer to the next provider.
    fn provide(&self, key: &CaptionKey, sender: &S) -> Option<String>;
}

impl<S, F> CaptionProvider<S> for F
where
    F: Fn(&CaptionKey, &S) -> Option<String> + Send + Sync,
{
    fn provide(&self, key: &CaptionKey, sender: &S) -> Option<String> {
        self(key, sender)
    }
}

/// Provider backed by a fixed key → template map.
#[derive(Clone, Debug, Default)]
pub struct StaticCaptionProvider {
    templates: HashMap<CaptionKey, String>,
}

impl StaticCaptionProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_caption(mut self, key: CaptionKey, template: impl Into<String>) -> Self {
        self.templates.insert(key, template.into());
        self
    }
}

impl<S> CaptionProvider<S> for StaticCaptionProvider {
    fn provide(&self, key: &CaptionKey, _sender: &S) -> Option<String> {
        self.templates.get(key).cloned()
    }
}

/// Ordered provider chain; the first provider returning a template wins, and
/// the built-in English templates are the implicit final fallback.
pub struct CaptionRegistry<S> {
    providers: Vec<Arc<dyn CaptionProvider<S>>>,
}

impl<S> Default for CaptionRegistry<S> {
    fn default() -> Self {
        Self {
            providers: Vec::new(),
        }
    }
}

impl<S> Clone for CaptionRegistry<S> {
    fn clone(&self) -> Self {
        Self {
            providers: self.providers.clone(),
        }
    }
}

impl<S> CaptionRegistry<S> {
    pub fn add_provider(&mut self, provider: Arc<dyn CaptionProvider<S>>) {
        self.providers.push(provider);
    }

    /// Resolve a key through the chain, falling back to the standard
    /// English templates.
    pub fn resolve(&self, key: &CaptionKey, sender: &S) -> Option<String> {
        self.providers
            .iter()
            .find_map(|provider| provider.provide(key, sender))
            .or_else(|| default_template(key).map(str::to_string))
    }

    /// Render a failure into user-facing text. Unresolvable keys fall back
    /// to the failure's own display form.
    pub fn render(&self, error: &CommandError, sender: &S) -> String {
        let key = error.caption_key();
        match self.resolve(&key, sender) {
            Some(template) => format_caption(&template, &error.caption_variables()),
            None => error.to_string(),
        }
    }
}
