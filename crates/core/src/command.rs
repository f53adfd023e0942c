//! Builder describing one command chain before it is spliced into the tree.

use std::sync::Arc;

use crate::context::ContextValue;
use crate::error::RegistrationError;
use crate::flags::{FlagGroup, FlagSpec};
use crate::handler::{AsyncHandler, BlockingHandler, CommandHandler};
use crate::parser::{ArgumentParser, SuggestionProvider, UntypedParser};
use crate::sender::CommandSummary;

/// Per-node sender gate: the Rust rendition of a required sender type.
pub type SenderFilter<S> = Arc<dyn Fn(&S) -> bool + Send + Sync>;

/// Default synthesised for an omitted optional component.
#[derive(Clone)]
pub enum DefaultValue {
    /// A ready value stored directly into the context.
    Value(ContextValue),
    /// A default input string re-parsed through the component's parser.
    Parsed(String),
}

pub(crate) enum ComponentKind<S> {
    Literal {
        name: String,
        aliases: Vec<String>,
    },
    Variable {
        name: String,
        parser: Arc<dyn UntypedParser<S>>,
        required: bool,
        default: Option<DefaultValue>,
        suggestions: Option<Arc<dyn SuggestionProvider<S>>>,
    },
    Flags {
        specs: Vec<FlagSpec<S>>,
    },
}

pub(crate) struct Component<S> {
    pub kind: ComponentKind<S>,
    pub permission: Option<String>,
    pub sender_filter: Option<SenderFilter<S>>,
    pub description: Option<String>,
}

impl<S> Component<S> {
    fn new(kind: ComponentKind<S>) -> Self {
        Self {
            kind,
            permission: None,
            sender_filter: None,
            description: None,
        }
    }
}

/// Describes a command as a chain of components ending in a handler.
///
/// ```
/// use cloud_core::command::Command;
/// use cloud_core::context::ContextKey;
/// use cloud_core::parser::standard::{IntegerParser, StringParser};
///
/// let amount_key = ContextKey::<i32>::new("amount");
/// let command: Command<()> = Command::new("give")
///     .required("player", StringParser::single())
///     .required("item", StringParser::single())
///     .optional_with_default("amount", IntegerParser::new(1..), 1)
///     .handler_blocking(move |ctx| {
///         let _amount = ctx.get(&amount_key).unwrap_or(1);
///         Ok(())
///     });
/// ```
pub struct Command<S> {
    components: Vec<Component<S>>,
    handler: Option<Arc<dyn CommandHandler<S>>>,
}

impl<S: Send + Sync + 'static> Command<S> {
    /// Start a chain at a top-level literal.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            components: vec![Component::new(ComponentKind::Literal {
                name: name.into(),
                aliases: Vec::new(),
            })],
            handler: None,
        }
    }

    /// Start a chain at a top-level literal with aliases.
    pub fn new_with_aliases(
        name: impl Into<String>,
        aliases: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            components: vec![Component::new(ComponentKind::Literal {
                name: name.into(),
                aliases: aliases.into_iter().map(Into::into).collect(),
            })],
            handler: None,
        }
    }

    /// Append a literal component.
    pub fn literal(mut self, name: impl Into<String>) -> Self {
        self.components
            .push(Component::new(ComponentKind::Literal {
                name: name.into(),
                aliases: Vec::new(),
            }));
        self
    }

    /// Append a literal component with aliases.
    pub fn literal_with_aliases(
        mut self,
        name: impl Into<String>,
        aliases: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.components
            .push(Component::new(ComponentKind::Literal {
                name: name.into(),
                aliases: aliases.into_iter().map(Into::into).collect(),
            }));
        self
    }

    /// Append a required variable component.
    pub fn required<P>(self, name: impl Into<String>, parser: P) -> Self
    where
        P: ArgumentParser<S> + 'static,
    {
        self.required_with(name, Arc::new(parser))
    }

    /// Append a required variable component with an erased parser.
    pub fn required_with(
        mut self,
        name: impl Into<String>,
        parser: Arc<dyn UntypedParser<S>>,
    ) -> Self {
        self.components
            .push(Component::new(ComponentKind::Variable {
                name: name.into(),
                parser,
                required: true,
                default: None,
                suggestions: None,
            }));
        self
    }

    /// Append an optional variable component with no default.
    pub fn optional<P>(self, name: impl Into<String>, parser: P) -> Self
    where
        P: ArgumentParser<S> + 'static,
    {
        self.optional_with(name, Arc::new(parser))
    }

    /// Append an optional variable component with an erased parser.
    pub fn optional_with(
        mut self,
        name: impl Into<String>,
        parser: Arc<dyn UntypedParser<S>>,
    ) -> Self {
        self.components
            .push(Component::new(ComponentKind::Variable {
                name: name.into(),
                parser,
                required: false,
                default: None,
                suggestions: None,
            }));
        self
    }

    /// Append an optional variable component with a ready default value.
    pub fn optional_with_default<P>(
        mut self,
        name: impl Into<String>,
        parser: P,
        default: P::Output,
    ) -> Self
    where
        P: ArgumentParser<S> + 'static,
    {
        self.components
            .push(Component::new(ComponentKind::Variable {
                name: name.into(),
                parser: Arc::new(parser),
                required: false,
                default: Some(DefaultValue::Value(ContextValue::new(default))),
                suggestions: None,
            }));
        self
    }

    /// Append an optional variable whose default is an input string parsed
    /// through the component's own parser when synthesised.
    pub fn optional_with_default_input<P>(
        mut self,
        name: impl Into<String>,
        parser: P,
        default: impl Into<String>,
    ) -> Self
    where
        P: ArgumentParser<S> + 'static,
    {
        self.components
            .push(Component::new(ComponentKind::Variable {
                name: name.into(),
                parser: Arc::new(parser),
                required: false,
                default: Some(DefaultValue::Parsed(default.into())),
                suggestions: None,
            }));
        self
    }

    /// Override the most recent variable component's suggestions.
    pub fn suggestions(mut self, provider: impl SuggestionProvider<S> + 'static) -> Self {
        let provider: Arc<dyn SuggestionProvider<S>> = Arc::new(provider);
        for component in self.components.iter_mut().rev() {
            if let ComponentKind::Variable { suggestions, .. } = &mut component.kind {
                *suggestions = Some(Arc::clone(&provider));
                break;
            }
        }
        self
    }

    /// Add a flag to the chain's flag group, creating the group if needed.
    /// The flag group is terminal; no further components may follow it.
    pub fn flag(mut self, spec: FlagSpec<S>) -> Self {
        if let Some(Component {
            kind: ComponentKind::Flags { specs },
            ..
        }) = self.components.last_mut()
        {
            specs.push(spec);
            return self;
        }
        self.components
            .push(Component::new(ComponentKind::Flags { specs: vec![spec] }));
        self
    }

    /// Attach a permission to the most recent component's node.
    pub fn permission(mut self, permission: impl Into<String>) -> Self {
        if let Some(component) = self.components.last_mut() {
            component.permission = Some(permission.into());
        }
        self
    }

    /// Attach a sender gate to the most recent component's node.
    pub fn sender_filter(mut self, filter: impl Fn(&S) -> bool + Send + Sync + 'static) -> Self {
        if let Some(component) = self.components.last_mut() {
            component.sender_filter = Some(Arc::new(filter));
        }
        self
    }

    /// Attach a description to the most recent component's node.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        if let Some(component) = self.components.last_mut() {
            component.description = Some(description.into());
        }
        self
    }

    /// Terminal handler.
    pub fn handler(mut self, handler: impl CommandHandler<S> + 'static) -> Self {
        self.handler = Some(Arc::new(handler));
        self
    }

    /// Terminal handler from a synchronous closure.
    pub fn handler_blocking(
        self,
        handler: impl Fn(&mut crate::context::CommandContext<S>) -> anyhow::Result<()>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        self.handler(BlockingHandler(handler))
    }

    /// Terminal handler from a future-returning closure.
    pub fn handler_async<F>(self, handler: F) -> Self
    where
        F: for<'a> Fn(
                &'a mut crate::context::CommandContext<S>,
            ) -> futures_util::future::BoxFuture<'a, anyhow::Result<()>>
            + Send
            + Sync
            + 'static,
    {
        self.handler(AsyncHandler(handler))
    }

    /// Primary name of the top-level literal.
    pub fn name(&self) -> &str {
        match &self.components[0].kind {
            ComponentKind::Literal { name, .. } => name,
            _ => "",
        }
    }

    /// Chain-level validation: component ordering, flag-group terminality,
    /// flag spec well-formedness, and handler presence.
    pub(crate) fn validate(&self) -> Result<(), RegistrationError> {
        let mut seen_optional = false;
        let mut seen_flags = false;
        for component in &self.components {
            if seen_flags {
                return Err(RegistrationError::ComponentAfterFlags);
            }
            match &component.kind {
                ComponentKind::Literal { name, .. } => {
                    if seen_optional {
                        return Err(RegistrationError::RequiredAfterOptional {
                            name: name.clone(),
                        });
                    }
                }
                ComponentKind::Variable { name, required, .. } => {
                    if *required && seen_optional {
                        return Err(RegistrationError::RequiredAfterOptional {
                            name: name.clone(),
                        });
                    }
                    if !required {
                        seen_optional = true;
                    }
                }
                ComponentKind::Flags { specs } => {
                    seen_flags = true;
                    let mut group = FlagGroup::new();
                    for spec in specs {
                        group.add(spec.clone())?;
                    }
                }
            }
        }
        if self.handler.is_none() {
            return Err(RegistrationError::MissingHandler {
                name: self.name().to_string(),
            });
        }
        Ok(())
    }

    pub(crate) fn components(&self) -> &[Component<S>] {
        &self.components
    }

    pub(crate) fn into_parts(self) -> (Vec<Component<S>>, Option<Arc<dyn CommandHandler<S>>>) {
        (self.components, self.handler)
    }

    /// Summary handed to registration sinks and the introspection surface.
    pub(crate) fn summary(&self) -> CommandSummary {
        let (name, aliases) = match &self.components[0].kind {
            ComponentKind::Literal { name, aliases } => (name.clone(), aliases.clone()),
            _ => (String::new(), Vec::new()),
        };
        CommandSummary {
            name,
            aliases,
            description: self.components[0].description.clone(),
            syntax: self.syntax(),
        }
    }

    /// Human-readable syntax line: `give <player> <item> [amount] [--silent]`.
    pub(crate) fn syntax(&self) -> String {
        let mut parts = Vec::new();
        for component in &self.components {
            match &component.kind {
                ComponentKind::Literal { name, .. } => parts.push(name.clone()),
                ComponentKind::Variable { name, required, .. } => {
                    if *required {
                        parts.push(format!("<{name}>"));
                    } else {
                        parts.push(format!("[{name}]"));
                    }
                }
                ComponentKind::Flags { specs } => {
                    for spec in specs {
                        let mut rendered = format!("--{}", spec.long_name());
                        if spec.has_value() {
                            rendered.push_str(" <value>");
                        }
                        if spec.mode() == crate::flags::FlagMode::Repeatable {
                            rendered.push_str("...");
                        }
                        parts.push(format!("[{rendered}]"));
                    }
                }
            }
        }
        parts.join(" ")
    }
}
