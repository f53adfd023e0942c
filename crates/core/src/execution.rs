//! The execution pipeline: preprocess, walk the tree, postprocess, invoke.
//!
//! The walk is a loop over sibling variants with explicit backtracking:
//! a recoverable dead end restores the cursor and tries the next sibling,
//! while one cell remembers the failure with the furthest cursor advance so
//! the most-specific failure is the one surfaced. Gate failures (permission,
//! sender) abort immediately and are never retried against siblings.

use std::sync::Arc;

use futures_util::future::BoxFuture;

use cloud_util::InputCursor;

use crate::command::DefaultValue;
use crate::context::{CommandContext, ContextValue};
use crate::error::{CommandError, CommandErrorKind, ParseFailure};
use crate::flags;
use crate::handler::CommandHandler;
use crate::manager::EngineShared;
use crate::processors::ProcessOutcome;
use crate::tree::{CommandNode, VariableData};

/// Result of a completed `execute` call.
#[derive(Debug)]
pub enum ExecutionOutcome<S> {
    /// The matched handler ran to completion; the filled context is handed
    /// back to the caller.
    Completed { context: CommandContext<S> },
    /// A registered exception handler swallowed a failure of this kind.
    Suppressed { kind: CommandErrorKind },
}

impl<S> ExecutionOutcome<S> {
    /// The context of a completed execution.
    pub fn context(&self) -> Option<&CommandContext<S>> {
        match self {
            ExecutionOutcome::Completed { context } => Some(context),
            ExecutionOutcome::Suppressed { .. } => None,
        }
    }
}

/// Remembers the failure whose attempt started furthest into the input.
#[derive(Default)]
struct DeepestFailure {
    best: Option<(usize, CommandError)>,
}

impl DeepestFailure {
    fn remember(&mut self, offset: usize, error: CommandError) {
        let deeper = match &self.best {
            Some((best_offset, _)) => offset > *best_offset,
            None => true,
        };
        if deeper {
            self.best = Some((offset, error));
        }
    }

    fn into_error(self) -> Option<CommandError> {
        self.best.map(|(_, error)| error)
    }
}

/// Permission and sender gates, applied on entering a node.
pub(crate) fn check_gates<S: Send + Sync + 'static>(
    shared: &EngineShared<S>,
    context: &CommandContext<S>,
    node: &CommandNode<S>,
) -> Result<(), CommandError> {
    if let Some(filter) = &node.sender_filter {
        if !filter(context.sender()) {
            return Err(CommandError::InvalidSender {
                node: node.display_name(),
            });
        }
    }
    if let Some(permission) = &node.permission {
        if !(shared.permission_checker)(context.sender(), permission) {
            return Err(CommandError::NoPermission {
                permission: permission.clone(),
            });
        }
    }
    Ok(())
}

pub(crate) async fn execute<S: Send + Sync + 'static>(
    shared: Arc<EngineShared<S>>,
    sender: S,
    line: String,
) -> Result<ExecutionOutcome<S>, CommandError> {
    tracing::debug!("Executing command line '{}'", line);
    let mut context = CommandContext::new(sender, line.clone(), false);
    let mut cursor = InputCursor::new(line);
    match run_pipeline(shared.as_ref(), &mut context, &mut cursor).await {
        Ok(()) => Ok(ExecutionOutcome::Completed { context }),
        Err(error) => settle_failure(shared.as_ref(), context, error),
    }
}

async fn run_pipeline<S: Send + Sync + 'static>(
    shared: &EngineShared<S>,
    context: &mut CommandContext<S>,
    cursor: &mut InputCursor,
) -> Result<(), CommandError> {
    for preprocessor in &shared.preprocessors {
        if preprocessor.preprocess(context, cursor) == ProcessOutcome::Rejected {
            return Err(CommandError::NoSuchCommand {
                input: cursor.peek_word().to_string(),
            });
        }
    }

    cursor.skip_whitespace();
    let first = cursor.peek_word().to_string();
    let known = shared
        .tree
        .root
        .children
        .iter()
        .any(|child| child.literal().is_some_and(|literal| literal.matches(&first)));
    if !known {
        return Err(CommandError::NoSuchCommand { input: first });
    }

    let mut deepest = DeepestFailure::default();
    let handler = visit(shared, &shared.tree.root, context, cursor, &mut deepest).await?;
    let Some(handler) = handler else {
        return Err(deepest.into_error().unwrap_or(CommandError::InvalidSyntax {
            prefix: String::new(),
            expected: shared.tree.root.expected_tokens(),
        }));
    };

    for postprocessor in &shared.postprocessors {
        postprocessor.postprocess(context)?;
    }

    tracing::trace!("Invoking handler for '{}'", context.matched_path().join(" "));
    handler
        .handle(context)
        .await
        .map_err(CommandError::Execution)
}

fn settle_failure<S: Send + Sync + 'static>(
    shared: &EngineShared<S>,
    mut context: CommandContext<S>,
    error: CommandError,
) -> Result<ExecutionOutcome<S>, CommandError> {
    let kind = error.kind();
    let Some(handler) = shared.exception_handlers.get(&kind) else {
        return Err(error);
    };
    match handler(&mut context, error) {
        Ok(()) => {
            tracing::warn!("Exception handler swallowed a {:?} failure", kind);
            Ok(ExecutionOutcome::Suppressed { kind })
        }
        Err(rewritten) => Err(rewritten),
    }
}

fn dead_end<S: Send + Sync + 'static>(
    node: &CommandNode<S>,
    context: &CommandContext<S>,
) -> CommandError {
    CommandError::InvalidSyntax {
        prefix: context.matched_path().join(" "),
        expected: node.expected_tokens(),
    }
}

/// Walk one node: `Ok(Some(handler))` is success, `Ok(None)` a recoverable
/// dead end remembered in `deepest`, `Err` an unrecoverable gate or flag
/// failure.
fn visit<'a, S: Send + Sync + 'static>(
    shared: &'a EngineShared<S>,
    node: &'a CommandNode<S>,
    context: &'a mut CommandContext<S>,
    cursor: &'a mut InputCursor,
    deepest: &'a mut DeepestFailure,
) -> BoxFuture<'a, Result<Option<Arc<dyn CommandHandler<S>>>, CommandError>> {
    Box::pin(async move {
        // Liberal mode: past the last literal, flags are absorbed greedily
        // before any variable sibling is tried.
        if shared.settings.liberal_flag_parsing && !node.has_literal_children() {
            cursor.skip_whitespace();
            if flags::looks_like_flag(cursor.peek_word()) {
                if let Some(flag_node) = node.flag_group_descendant() {
                    check_gates(shared, context, flag_node)?;
                    if let Some(group) = flag_node.flag_group() {
                        flags::parse_flags(
                            group,
                            context,
                            cursor,
                            &shared.permission_checker,
                            true,
                        )
                        .await?;
                    }
                }
            }
        }

        if cursor.is_empty(true) {
            if let Some(handler) = &node.handler {
                return Ok(Some(Arc::clone(handler)));
            }
        } else {
            // An explicit flag group entry consumes the rest of the line.
            if let Some(flag_node) = node.flag_child() {
                cursor.skip_whitespace();
                if flags::looks_like_flag(cursor.peek_word()) {
                    check_gates(shared, context, flag_node)?;
                    if let Some(group) = flag_node.flag_group() {
                        flags::parse_flags(
                            group,
                            context,
                            cursor,
                            &shared.permission_checker,
                            false,
                        )
                        .await?;
                    }
                    if let Some(handler) = &flag_node.handler {
                        return Ok(Some(Arc::clone(handler)));
                    }
                    deepest.remember(cursor.offset(), dead_end(node, context));
                    return Ok(None);
                }
            }

            // Literals before variables. Sibling name sets are disjoint, so
            // at most one literal child can match the word.
            let word = cursor.peek_word().to_string();
            let literal_index = node.children.iter().position(|child| {
                child
                    .literal()
                    .is_some_and(|literal| literal.matches(&word))
            });
            if let Some(index) = literal_index {
                let child = &node.children[index];
                check_gates(shared, context, child)?;
                let saved = cursor.save();
                cursor.read_word();
                context.push_matched(word.as_str());
                match visit(shared, child, &mut *context, &mut *cursor, &mut *deepest).await? {
                    Some(handler) => return Ok(Some(handler)),
                    None => {
                        context.pop_matched();
                        cursor.restore(saved);
                    }
                }
            }

            for child in &node.children {
                let Some(variable) = child.variable() else {
                    continue;
                };
                check_gates(shared, context, child)?;
                let saved = cursor.save();
                match variable
                    .parser
                    .parse_value(&mut *context, &mut *cursor)
                    .await
                {
                    Ok(value) => {
                        context.store_erased(&variable.name, value);
                        let consumed =
                            cursor.input()[saved..cursor.offset()].trim().to_string();
                        context.push_matched(consumed);
                        match visit(shared, child, &mut *context, &mut *cursor, &mut *deepest)
                            .await?
                        {
                            Some(handler) => return Ok(Some(handler)),
                            None => {
                                context.pop_matched();
                                context.remove_erased(&variable.name);
                                cursor.restore(saved);
                            }
                        }
                    }
                    Err(failure) => {
                        cursor.restore(saved);
                        context.remember_failure(saved, failure.clone());
                        deepest.remember(saved, CommandError::ArgumentParse(failure));
                    }
                }
            }
        }

        // Optional variables absorb omission: synthesise the default (or
        // nothing) and continue, whether or not input remains.
        for child in &node.children {
            let Some(variable) = child.variable() else {
                continue;
            };
            if variable.required {
                continue;
            }
            check_gates(shared, context, child)?;
            let saved = cursor.save();
            let mut synthesised = false;
            if let Some(default) = &variable.default {
                match synthesise_default(variable, default, &mut *context).await {
                    Ok(value) => {
                        context.store_erased(&variable.name, value);
                        synthesised = true;
                    }
                    Err(failure) => {
                        deepest.remember(saved, CommandError::ArgumentParse(failure));
                        continue;
                    }
                }
            }
            match visit(shared, child, &mut *context, &mut *cursor, &mut *deepest).await? {
                Some(handler) => return Ok(Some(handler)),
                None => {
                    if synthesised {
                        context.remove_erased(&variable.name);
                    }
                    cursor.restore(saved);
                }
            }
        }

        // A flag group reached with nothing left is a clean terminal.
        if cursor.is_empty(true) {
            if let Some(flag_node) = node.flag_child() {
                check_gates(shared, context, flag_node)?;
                if let Some(handler) = &flag_node.handler {
                    return Ok(Some(Arc::clone(handler)));
                }
            }
        }

        deepest.remember(cursor.offset(), dead_end(node, context));
        Ok(None)
    })
}

async fn synthesise_default<S: Send + Sync + 'static>(
    variable: &VariableData<S>,
    default: &DefaultValue,
    context: &mut CommandContext<S>,
) -> Result<ContextValue, ParseFailure> {
    match default {
        DefaultValue::Value(value) => Ok(value.clone()),
        DefaultValue::Parsed(text) => {
            let mut ephemeral = InputCursor::new(text.clone());
            variable.parser.parse_value(context, &mut ephemeral).await
        }
    }
}
