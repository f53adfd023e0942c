//! The rooted command trie: literals, variables, and flag groups.
//!
//! The tree is built by splicing command chains under a shared root. Every
//! splice re-checks the sibling invariants for the parents it touches and
//! leaves the tree unchanged on violation. Once the manager seals, the tree
//! is read-only and shared freely across executions.

use std::sync::Arc;

use crate::command::{Command, Component, ComponentKind, DefaultValue, SenderFilter};
use crate::error::RegistrationError;
use crate::flags::FlagGroup;
use crate::handler::CommandHandler;
use crate::manager::ManagerSettings;
use crate::parser::{SuggestionProvider, UntypedParser};

/// Fixed-word node data: the primary name plus aliases, all indexed as keys.
#[derive(Clone)]
pub(crate) struct LiteralData {
    pub name: String,
    pub aliases: Vec<String>,
}

impl LiteralData {
    pub(crate) fn matches(&self, word: &str) -> bool {
        self.name == word || self.aliases.iter().any(|alias| alias == word)
    }

    fn name_set(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str()).chain(self.aliases.iter().map(String::as_str))
    }
}

/// Parsed-argument node data.
pub(crate) struct VariableData<S> {
    pub name: String,
    pub parser: Arc<dyn UntypedParser<S>>,
    pub required: bool,
    pub default: Option<DefaultValue>,
    pub suggestions: Option<Arc<dyn SuggestionProvider<S>>>,
}

impl<S> Clone for VariableData<S> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            parser: self.parser.clone(),
            required: self.required,
            default: self.default.clone(),
            suggestions: self.suggestions.clone(),
        }
    }
}

pub(crate) enum NodeKind<S> {
    Literal(LiteralData),
    Variable(VariableData<S>),
    FlagGroup(FlagGroup<S>),
}

impl<S> Clone for NodeKind<S> {
    fn clone(&self) -> Self {
        match self {
            NodeKind::Literal(literal) => NodeKind::Literal(literal.clone()),
            NodeKind::Variable(variable) => NodeKind::Variable(variable.clone()),
            NodeKind::FlagGroup(group) => NodeKind::FlagGroup(group.clone()),
        }
    }
}

/// One vertex of the command tree.
pub(crate) struct CommandNode<S> {
    pub kind: NodeKind<S>,
    pub permission: Option<String>,
    pub sender_filter: Option<SenderFilter<S>>,
    pub description: Option<String>,
    pub handler: Option<Arc<dyn CommandHandler<S>>>,
    pub children: Vec<CommandNode<S>>,
}

impl<S> Clone for CommandNode<S> {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind.clone(),
            permission: self.permission.clone(),
            sender_filter: self.sender_filter.clone(),
            description: self.description.clone(),
            handler: self.handler.clone(),
            children: self.children.clone(),
        }
    }
}

impl<S: Send + Sync + 'static> CommandNode<S> {
    fn from_component(component: Component<S>) -> Result<Self, RegistrationError> {
        let Component {
            kind,
            permission,
            sender_filter,
            description,
        } = component;
        let kind = match kind {
            ComponentKind::Literal { name, aliases } => {
                NodeKind::Literal(LiteralData { name, aliases })
            }
            ComponentKind::Variable {
                name,
                parser,
                required,
                default,
                suggestions,
            } => NodeKind::Variable(VariableData {
                name,
                parser,
                required,
                default,
                suggestions,
            }),
            ComponentKind::Flags { specs } => {
                let mut group = FlagGroup::new();
                for spec in specs {
                    group.add(spec)?;
                }
                NodeKind::FlagGroup(group)
            }
        };
        Ok(Self {
            kind,
            permission,
            sender_filter,
            description,
            handler: None,
            children: Vec::new(),
        })
    }

    /// Display form used in failures and traces.
    pub(crate) fn display_name(&self) -> String {
        match &self.kind {
            NodeKind::Literal(literal) => literal.name.clone(),
            NodeKind::Variable(variable) => format!("<{}>", variable.name),
            NodeKind::FlagGroup(_) => "[flags]".to_string(),
        }
    }

    /// Names this node occupies among its siblings.
    fn name_set(&self) -> Vec<&str> {
        match &self.kind {
            NodeKind::Literal(literal) => literal.name_set().collect(),
            NodeKind::Variable(variable) => vec![variable.name.as_str()],
            NodeKind::FlagGroup(_) => Vec::new(),
        }
    }

    pub(crate) fn variable(&self) -> Option<&VariableData<S>> {
        match &self.kind {
            NodeKind::Variable(variable) => Some(variable),
            _ => None,
        }
    }

    pub(crate) fn literal(&self) -> Option<&LiteralData> {
        match &self.kind {
            NodeKind::Literal(literal) => Some(literal),
            _ => None,
        }
    }

    pub(crate) fn flag_group(&self) -> Option<&FlagGroup<S>> {
        match &self.kind {
            NodeKind::FlagGroup(group) => Some(group),
            _ => None,
        }
    }

    pub(crate) fn flag_child(&self) -> Option<&CommandNode<S>> {
        self.children
            .iter()
            .find(|child| child.flag_group().is_some())
    }

    pub(crate) fn has_literal_children(&self) -> bool {
        self.children.iter().any(|child| child.literal().is_some())
    }

    /// First flag-group node reachable through this subtree, if any.
    pub(crate) fn flag_group_descendant(&self) -> Option<&CommandNode<S>> {
        if let Some(child) = self.flag_child() {
            return Some(child);
        }
        self.children
            .iter()
            .find_map(|child| child.flag_group_descendant())
    }

    /// Tokens a dead-end failure lists as acceptable continuations.
    pub(crate) fn expected_tokens(&self) -> Vec<String> {
        let mut expected = Vec::new();
        for child in &self.children {
            match &child.kind {
                NodeKind::Literal(literal) => expected.push(literal.name.clone()),
                NodeKind::Variable(variable) => expected.push(format!("<{}>", variable.name)),
                NodeKind::FlagGroup(group) => {
                    for spec in group.specs() {
                        expected.push(format!("--{}", spec.long_name()));
                    }
                }
            }
        }
        expected
    }
}

enum ChildSlot {
    Existing(usize),
    New,
}

/// The tree itself: a nameless root whose children are top-level literals.
pub(crate) struct CommandTree<S> {
    pub root: CommandNode<S>,
}

impl<S> Clone for CommandTree<S> {
    fn clone(&self) -> Self {
        Self {
            root: self.root.clone(),
        }
    }
}

impl<S: Send + Sync + 'static> CommandTree<S> {
    pub(crate) fn new() -> Self {
        Self {
            root: CommandNode {
                kind: NodeKind::Literal(LiteralData {
                    name: String::new(),
                    aliases: Vec::new(),
                }),
                permission: None,
                sender_filter: None,
                description: None,
                handler: None,
                children: Vec::new(),
            },
        }
    }

    /// Identity match for a component among a parent's children.
    fn find_child(parent: &CommandNode<S>, component: &Component<S>) -> Option<usize> {
        parent.children.iter().position(|child| {
            match (&child.kind, &component.kind) {
                (NodeKind::Literal(literal), ComponentKind::Literal { name, .. }) => {
                    literal.name == *name
                }
                (NodeKind::Variable(variable), ComponentKind::Variable { name, .. }) => {
                    variable.name == *name
                }
                (NodeKind::FlagGroup(_), ComponentKind::Flags { .. }) => true,
                _ => false,
            }
        })
    }

    /// Check every invariant a splice of `command` would have to uphold,
    /// without mutating anything.
    pub(crate) fn validate_insert(
        &self,
        command: &Command<S>,
        settings: &ManagerSettings,
    ) -> Result<(), RegistrationError> {
        command.validate()?;
        let mut node = &self.root;
        for component in command.components() {
            match Self::find_child(node, component) {
                Some(index) => {
                    let child = &node.children[index];
                    Self::check_merge(node, child, component, settings)?;
                    node = child;
                }
                None => {
                    if !settings.allow_unsafe_registration {
                        Self::check_new_child(node, component)?;
                    }
                    // Everything deeper hangs off the new node; chain-level
                    // rules were already validated by the builder.
                    return Ok(());
                }
            }
        }
        if node.handler.is_some() && !settings.override_existing_commands {
            return Err(RegistrationError::DuplicateCommand {
                path: command.syntax(),
            });
        }
        Ok(())
    }

    /// Splice the command into the tree. Validation runs first; the tree is
    /// untouched when any check fails.
    pub(crate) fn insert(
        &mut self,
        command: Command<S>,
        settings: &ManagerSettings,
    ) -> Result<(), RegistrationError> {
        self.validate_insert(&command, settings)?;
        let (components, handler) = command.into_parts();
        let mut node = &mut self.root;
        for component in components {
            let slot = match Self::find_child(node, &component) {
                Some(index) => ChildSlot::Existing(index),
                None => ChildSlot::New,
            };
            let index = match slot {
                ChildSlot::Existing(index) => {
                    Self::merge_component(&mut node.children[index], component)?;
                    index
                }
                ChildSlot::New => {
                    node.children.push(CommandNode::from_component(component)?);
                    node.children.len() - 1
                }
            };
            node = &mut node.children[index];
        }
        node.handler = handler;
        Ok(())
    }

    /// Compatibility of a component with the existing node it merges into.
    fn check_merge(
        parent: &CommandNode<S>,
        child: &CommandNode<S>,
        component: &Component<S>,
        settings: &ManagerSettings,
    ) -> Result<(), RegistrationError> {
        match (&child.kind, &component.kind) {
            (NodeKind::Literal(_), ComponentKind::Literal { name, aliases }) => {
                // New aliases must not collide with any other sibling.
                if settings.allow_unsafe_registration {
                    return Ok(());
                }
                for sibling in &parent.children {
                    if std::ptr::eq(sibling, child) {
                        continue;
                    }
                    let sibling_names = sibling.name_set();
                    for alias in aliases {
                        if sibling_names.contains(&alias.as_str()) {
                            return Err(RegistrationError::Ambiguity {
                                parent: parent.display_name(),
                                detail: format!(
                                    "alias '{alias}' of '{name}' collides with sibling '{}'",
                                    sibling.display_name()
                                ),
                            });
                        }
                    }
                }
                Ok(())
            }
            (NodeKind::Variable(variable), ComponentKind::Variable { name, parser, .. }) => {
                if variable.parser.value_type() != parser.value_type() {
                    return Err(RegistrationError::Ambiguity {
                        parent: parent.display_name(),
                        detail: format!("variable '{name}' is already registered with a different parser type"),
                    });
                }
                Ok(())
            }
            (NodeKind::FlagGroup(group), ComponentKind::Flags { specs }) => {
                for spec in specs {
                    spec.validate()?;
                    group.check_collision(spec)?;
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Sibling invariants for attaching a brand-new child under `parent`.
    fn check_new_child(
        parent: &CommandNode<S>,
        component: &Component<S>,
    ) -> Result<(), RegistrationError> {
        let component_names: Vec<&str> = match &component.kind {
            ComponentKind::Literal { name, aliases } => std::iter::once(name.as_str())
                .chain(aliases.iter().map(String::as_str))
                .collect(),
            ComponentKind::Variable { name, .. } => vec![name.as_str()],
            ComponentKind::Flags { .. } => Vec::new(),
        };
        for sibling in &parent.children {
            let sibling_names = sibling.name_set();
            for name in &component_names {
                if sibling_names.contains(name) {
                    return Err(RegistrationError::Ambiguity {
                        parent: parent.display_name(),
                        detail: format!(
                            "name '{name}' collides with sibling '{}'",
                            sibling.display_name()
                        ),
                    });
                }
            }
        }
        if let ComponentKind::Variable {
            name,
            parser,
            required,
            ..
        } = &component.kind
        {
            for sibling in &parent.children {
                let Some(existing) = sibling.variable() else {
                    continue;
                };
                if !existing
                    .parser
                    .accept_class()
                    .disjoint_with(parser.accept_class())
                {
                    return Err(RegistrationError::Ambiguity {
                        parent: parent.display_name(),
                        detail: format!(
                            "variables '{}' and '{name}' cannot be told apart deterministically",
                            existing.name
                        ),
                    });
                }
                if *required && !existing.required {
                    return Err(RegistrationError::RequiredAfterOptional {
                        name: name.to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Merge a component's contributions into its existing node.
    fn merge_component(
        child: &mut CommandNode<S>,
        component: Component<S>,
    ) -> Result<(), RegistrationError> {
        let Component {
            kind,
            permission,
            sender_filter,
            description,
        } = component;
        match (&mut child.kind, kind) {
            (NodeKind::Literal(literal), ComponentKind::Literal { aliases, .. }) => {
                for alias in aliases {
                    if !literal.aliases.contains(&alias) {
                        literal.aliases.push(alias);
                    }
                }
            }
            (NodeKind::Variable(variable), ComponentKind::Variable {
                default,
                suggestions,
                ..
            }) => {
                if default.is_some() {
                    variable.default = default;
                }
                if suggestions.is_some() {
                    variable.suggestions = suggestions;
                }
            }
            (NodeKind::FlagGroup(group), ComponentKind::Flags { specs }) => {
                for spec in specs {
                    group.add(spec)?;
                }
            }
            _ => {}
        }
        if permission.is_some() {
            child.permission = permission;
        }
        if sender_filter.is_some() {
            child.sender_filter = sender_filter;
        }
        if description.is_some() {
            child.description = description;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::Command;
    use crate::flags::FlagSpec;
    use crate::parser::standard::{BooleanParser, IntegerParser, StringParser};

    fn settings() -> ManagerSettings {
        ManagerSettings::default()
    }

    fn tree() -> CommandTree<()> {
        CommandTree::new()
    }

    fn noop(name: &str) -> Command<()> {
        Command::new(name).handler_blocking(|_| Ok(()))
    }

    #[test]
    fn test_insert_creates_chain() {
        let mut tree = tree();
        let command = Command::new("give")
            .required("player", StringParser::single())
            .handler_blocking(|_| Ok(()));
        tree.insert(command, &settings()).unwrap();
        assert_eq!(tree.root.children.len(), 1);
        let give = &tree.root.children[0];
        assert_eq!(give.display_name(), "give");
        assert_eq!(give.children.len(), 1);
        assert!(give.children[0].handler.is_some());
    }

    #[test]
    fn test_insert_merges_shared_prefix() {
        let mut tree = tree();
        tree.insert(
            Command::new("op").literal("add").handler_blocking(|_| Ok(())),
            &settings(),
        )
        .unwrap();
        tree.insert(
            Command::new("op").literal("remove").handler_blocking(|_| Ok(())),
            &settings(),
        )
        .unwrap();
        assert_eq!(tree.root.children.len(), 1);
        assert_eq!(tree.root.children[0].children.len(), 2);
    }

    #[test]
    fn test_duplicate_handler_rejected_without_override() {
        let mut tree = tree();
        tree.insert(noop("cmd"), &settings()).unwrap();
        let error = tree.insert(noop("cmd"), &settings()).unwrap_err();
        assert!(matches!(error, RegistrationError::DuplicateCommand { .. }));
    }

    #[test]
    fn test_duplicate_handler_replaced_with_override() {
        let mut tree = tree();
        let mut overriding = settings();
        overriding.override_existing_commands = true;
        tree.insert(noop("cmd"), &settings()).unwrap();
        tree.insert(noop("cmd"), &overriding).unwrap();
        assert_eq!(tree.root.children.len(), 1);
    }

    #[test]
    fn test_alias_collision_rejected() {
        let mut tree = tree();
        tree.insert(
            Command::new_with_aliases("teleport", ["tp"]).handler_blocking(|_| Ok(())),
            &settings(),
        )
        .unwrap();
        let error = tree
            .insert(noop("tp"), &settings())
            .unwrap_err();
        assert!(matches!(error, RegistrationError::Ambiguity { .. }));
    }

    #[test]
    fn test_ambiguous_variable_siblings_rejected() {
        let mut tree = tree();
        tree.insert(
            Command::new("cmd")
                .required("first", StringParser::single())
                .handler_blocking(|_| Ok(())),
            &settings(),
        )
        .unwrap();
        let error = tree
            .insert(
                Command::new("cmd")
                    .required("second", IntegerParser::any())
                    .handler_blocking(|_| Ok(())),
                &settings(),
            )
            .unwrap_err();
        assert!(matches!(error, RegistrationError::Ambiguity { .. }));
    }

    #[test]
    fn test_disjoint_variable_siblings_accepted() {
        let mut tree = tree();
        tree.insert(
            Command::new("cmd")
                .required("count", IntegerParser::any())
                .handler_blocking(|_| Ok(())),
            &settings(),
        )
        .unwrap();
        tree.insert(
            Command::new("cmd")
                .required("enabled", BooleanParser::strict())
                .handler_blocking(|_| Ok(())),
            &settings(),
        )
        .unwrap();
        assert_eq!(tree.root.children[0].children.len(), 2);
    }

    #[test]
    fn test_unsafe_registration_skips_ambiguity_checks() {
        let mut tree = tree();
        let mut unsafe_settings = settings();
        unsafe_settings.allow_unsafe_registration = true;
        tree.insert(
            Command::new("cmd")
                .required("first", StringParser::single())
                .handler_blocking(|_| Ok(())),
            &unsafe_settings,
        )
        .unwrap();
        tree.insert(
            Command::new("cmd")
                .required("second", StringParser::single())
                .handler_blocking(|_| Ok(())),
            &unsafe_settings,
        )
        .unwrap();
        assert_eq!(tree.root.children[0].children.len(), 2);
    }

    #[test]
    fn test_required_sibling_after_optional_rejected() {
        let mut tree = tree();
        tree.insert(
            Command::new("cmd")
                .optional("count", IntegerParser::any())
                .handler_blocking(|_| Ok(())),
            &settings(),
        )
        .unwrap();
        let error = tree
            .insert(
                Command::new("cmd")
                    .required("enabled", BooleanParser::strict())
                    .handler_blocking(|_| Ok(())),
                &settings(),
            )
            .unwrap_err();
        assert!(matches!(
            error,
            RegistrationError::RequiredAfterOptional { .. }
        ));
    }

    #[test]
    fn test_conflicting_variable_parser_type_rejected() {
        let mut tree = tree();
        tree.insert(
            Command::new("cmd")
                .required("value", IntegerParser::any())
                .literal("a")
                .handler_blocking(|_| Ok(())),
            &settings(),
        )
        .unwrap();
        let error = tree
            .insert(
                Command::new("cmd")
                    .required("value", StringParser::single())
                    .literal("b")
                    .handler_blocking(|_| Ok(())),
                &settings(),
            )
            .unwrap_err();
        assert!(matches!(error, RegistrationError::Ambiguity { .. }));
    }

    #[test]
    fn test_failed_insert_leaves_tree_unchanged() {
        let mut tree = tree();
        tree.insert(noop("cmd"), &settings()).unwrap();
        let before = tree.root.children[0].children.len();
        let error = tree.insert(noop("cmd"), &settings()).unwrap_err();
        assert!(matches!(error, RegistrationError::DuplicateCommand { .. }));
        assert_eq!(tree.root.children.len(), 1);
        assert_eq!(tree.root.children[0].children.len(), before);
    }

    #[test]
    fn test_flag_merge_collision_rejected() {
        let mut tree = tree();
        tree.insert(
            Command::new("pack")
                .flag(FlagSpec::presence("verbose").alias('v'))
                .handler_blocking(|_| Ok(())),
            &settings(),
        )
        .unwrap();
        let error = tree
            .insert(
                Command::new("pack")
                    .flag(FlagSpec::presence("verbose"))
                    .handler_blocking(|_| Ok(())),
                &settings(),
            )
            .unwrap_err();
        assert!(matches!(error, RegistrationError::Ambiguity { .. }));
    }
}
