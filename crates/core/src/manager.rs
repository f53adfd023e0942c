//! The command manager: the façade owning the tree, registries, settings,
//! and the execute/suggest entry points.

use std::collections::HashMap;
use std::sync::Arc;

use cloud_types::Suggestion;

use crate::caption::{CaptionProvider, CaptionRegistry};
use crate::command::Command;
use crate::context::CommandContext;
use crate::coordinator::ExecutionCoordinator;
use crate::error::{CommandError, CommandErrorKind, RegistrationError};
use crate::execution::{self, ExecutionOutcome};
use crate::parser::registry::ParserRegistry;
use crate::processors::{CommandPostprocessor, CommandPreprocessor};
use crate::sender::{CommandSummary, RegistrationSink};
use crate::suggest::{self, CaseInsensitivePrefixFilter, SuggestionFilter};
use crate::tree::CommandTree;

/// Checks whether a sender holds a permission node.
pub type PermissionChecker<S> = Arc<dyn Fn(&S, &str) -> bool + Send + Sync>;

/// Registered per error kind; may swallow the failure (the execution
/// resolves to a suppressed outcome) or rewrite it.
pub type ExceptionHandler<S> =
    Arc<dyn Fn(&mut CommandContext<S>, CommandError) -> Result<(), CommandError> + Send + Sync>;

/// Manager configuration toggles.
#[derive(Clone, Copy, Debug, Default)]
pub struct ManagerSettings {
    /// Disable the registration-time ambiguity invariants.
    pub allow_unsafe_registration: bool,
    /// Let a later registration replace an existing handler.
    pub override_existing_commands: bool,
    /// Emit a single empty suggestion when no candidates exist.
    pub force_suggestion: bool,
    /// Let flags appear anywhere after the last matched literal.
    pub liberal_flag_parsing: bool,
    /// Permit transitioning a sealed manager back to `Registering`.
    pub allow_reopening: bool,
}

/// Registration lifecycle of the manager and its tree.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RegistrationState {
    #[default]
    Registering,
    Sealed,
}

/// Everything an in-flight execution reads; shared immutably with spawned
/// pipeline futures.
pub(crate) struct EngineShared<S> {
    pub tree: CommandTree<S>,
    pub settings: ManagerSettings,
    pub preprocessors: Vec<Arc<dyn CommandPreprocessor<S>>>,
    pub postprocessors: Vec<Arc<dyn CommandPostprocessor<S>>>,
    pub permission_checker: PermissionChecker<S>,
    pub exception_handlers: HashMap<CommandErrorKind, ExceptionHandler<S>>,
    pub suggestion_filter: Arc<dyn SuggestionFilter>,
}

impl<S> Clone for EngineShared<S> {
    fn clone(&self) -> Self {
        Self {
            tree: self.tree.clone(),
            settings: self.settings,
            preprocessors: self.preprocessors.clone(),
            postprocessors: self.postprocessors.clone(),
            permission_checker: self.permission_checker.clone(),
            exception_handlers: self.exception_handlers.clone(),
            suggestion_filter: self.suggestion_filter.clone(),
        }
    }
}

/// Owns one command tree and dispatches input lines against it.
///
/// A manager is parameterised once over its sender type. Registration is
/// single-threaded and happens while the manager is in the `Registering`
/// state; after sealing, the tree is read-only and `execute`/`suggest` may
/// run from any number of tasks.
pub struct CommandManager<S> {
    shared: Arc<EngineShared<S>>,
    state: RegistrationState,
    parser_registry: ParserRegistry<S>,
    captions: CaptionRegistry<S>,
    sinks: Vec<Arc<dyn RegistrationSink<S>>>,
    summaries: Vec<CommandSummary>,
    execution_coordinator: ExecutionCoordinator,
    suggestion_coordinator: ExecutionCoordinator,
}

impl<S: Send + Sync + 'static> CommandManager<S> {
    pub fn new() -> Self {
        Self::with_settings(ManagerSettings::default())
    }

    pub fn with_settings(settings: ManagerSettings) -> Self {
        Self {
            shared: Arc::new(EngineShared {
                tree: CommandTree::new(),
                settings,
                preprocessors: Vec::new(),
                postprocessors: Vec::new(),
                permission_checker: Arc::new(|_, _| true),
                exception_handlers: HashMap::new(),
                suggestion_filter: Arc::new(CaseInsensitivePrefixFilter),
            }),
            state: RegistrationState::default(),
            parser_registry: ParserRegistry::with_standard_parsers(),
            captions: CaptionRegistry::default(),
            sinks: Vec::new(),
            summaries: Vec::new(),
            execution_coordinator: ExecutionCoordinator::default(),
            suggestion_coordinator: ExecutionCoordinator::default(),
        }
    }

    fn shared_mut(&mut self) -> &mut EngineShared<S> {
        Arc::make_mut(&mut self.shared)
    }

    /// Coordinator used for `execute` pipelines.
    pub fn with_execution_coordinator(mut self, coordinator: ExecutionCoordinator) -> Self {
        self.execution_coordinator = coordinator;
        self
    }

    /// Coordinator used for `suggest` runs.
    pub fn with_suggestion_coordinator(mut self, coordinator: ExecutionCoordinator) -> Self {
        self.suggestion_coordinator = coordinator;
        self
    }

    /// Append a preprocessor; they run in registration order.
    pub fn with_preprocessor(
        mut self,
        preprocessor: impl CommandPreprocessor<S> + 'static,
    ) -> Self {
        self.shared_mut().preprocessors.push(Arc::new(preprocessor));
        self
    }

    /// Append a postprocessor; they run in registration order.
    pub fn with_postprocessor(
        mut self,
        postprocessor: impl CommandPostprocessor<S> + 'static,
    ) -> Self {
        self.shared_mut().postprocessors.push(Arc::new(postprocessor));
        self
    }

    /// Handle failures of `kind` instead of returning them to the caller.
    pub fn with_exception_handler(
        mut self,
        kind: CommandErrorKind,
        handler: impl Fn(&mut CommandContext<S>, CommandError) -> Result<(), CommandError>
        + Send
        + Sync
        + 'static,
    ) -> Self {
        self.shared_mut()
            .exception_handlers
            .insert(kind, Arc::new(handler));
        self
    }

    /// Install the permission checker consulted by node and flag gates.
    pub fn with_permission_checker(
        mut self,
        checker: impl Fn(&S, &str) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.shared_mut().permission_checker = Arc::new(checker);
        self
    }

    /// Append a caption provider; earlier providers win.
    pub fn with_caption_provider(mut self, provider: impl CaptionProvider<S> + 'static) -> Self {
        self.captions.add_provider(Arc::new(provider));
        self
    }

    /// Replace the default case-insensitive prefix suggestion filter.
    pub fn with_suggestion_filter(mut self, filter: impl SuggestionFilter + 'static) -> Self {
        self.shared_mut().suggestion_filter = Arc::new(filter);
        self
    }

    /// Add a registration sink notified on every successful `register`.
    pub fn with_registration_sink(mut self, sink: impl RegistrationSink<S> + 'static) -> Self {
        self.sinks.push(Arc::new(sink));
        self
    }

    pub fn settings(&self) -> ManagerSettings {
        self.shared.settings
    }

    pub fn state(&self) -> RegistrationState {
        self.state
    }

    /// Transition between `Registering` and `Sealed`. Re-opening a sealed
    /// manager requires the `allow_reopening` setting.
    pub fn set_state(&mut self, state: RegistrationState) -> Result<(), RegistrationError> {
        if self.state == RegistrationState::Sealed
            && state == RegistrationState::Registering
            && !self.shared.settings.allow_reopening
        {
            return Err(RegistrationError::TreeSealed);
        }
        tracing::debug!("Command manager transitioning to {:?}", state);
        self.state = state;
        Ok(())
    }

    /// The parser registry consulted by construction-time glue.
    pub fn parser_registry(&self) -> &ParserRegistry<S> {
        &self.parser_registry
    }

    pub fn parser_registry_mut(&mut self) -> &mut ParserRegistry<S> {
        &mut self.parser_registry
    }

    /// The caption registry used by [`render_error`](Self::render_error).
    pub fn caption_registry(&self) -> &CaptionRegistry<S> {
        &self.captions
    }

    /// Summaries of every registered command, in registration order.
    pub fn commands(&self) -> &[CommandSummary] {
        &self.summaries
    }

    /// Splice a command into the tree.
    ///
    /// Fails without touching the tree when the manager is sealed, a sink
    /// rejects the command, or a tree invariant would break.
    pub fn register(&mut self, command: Command<S>) -> Result<(), RegistrationError> {
        if self.state == RegistrationState::Sealed {
            return Err(RegistrationError::TreeSealed);
        }
        let settings = self.shared.settings;
        self.shared.tree.validate_insert(&command, &settings)?;
        let summary = command.summary();
        for sink in &self.sinks {
            if let Err(rejection) = sink.command_registered(&summary) {
                return Err(RegistrationError::SinkRejected {
                    name: summary.name.clone(),
                    reason: rejection.to_string(),
                });
            }
        }
        self.shared_mut().tree.insert(command, &settings)?;
        tracing::debug!("Registered command '{}'", summary.syntax);
        self.summaries.push(summary);
        Ok(())
    }

    /// Run the full pipeline for one input line.
    pub async fn execute(
        &self,
        sender: S,
        line: impl Into<String>,
    ) -> Result<ExecutionOutcome<S>, CommandError> {
        let shared = Arc::clone(&self.shared);
        let line = line.into();
        self.execution_coordinator
            .run(async move { execution::execute(shared, sender, line).await })
            .await
    }

    /// Compute completion candidates for a partial input line.
    ///
    /// Suggestion runs never mutate the manager; unknown top-level names
    /// yield an empty list (or a single empty suggestion under
    /// `force_suggestion`).
    pub async fn suggest(&self, sender: S, line: impl Into<String>) -> Vec<Suggestion> {
        let shared = Arc::clone(&self.shared);
        let line = line.into();
        self.suggestion_coordinator
            .run(async move { Ok(suggest::suggest(shared, sender, line).await) })
            .await
            .unwrap_or_default()
    }

    /// Render a failure through the caption provider chain.
    pub fn render_error(&self, error: &CommandError, sender: &S) -> String {
        self.captions.render(error, sender)
    }
}

impl<S: Send + Sync + 'static> Default for CommandManager<S> {
    fn default() -> Self {
        Self::new()
    }
}
