//! The suggestion engine: re-walks the tree against the same cursor and
//! stops at the last incomplete token.
//!
//! Complete tokens (those followed by whitespace) are consumed exactly as
//! execution would consume them; the trailing partial token selects the
//! candidates. Suggestion runs never mutate the manager, the tree, or any
//! provider.

use std::collections::HashSet;
use std::sync::Arc;

use futures_util::future::BoxFuture;

use cloud_types::{Suggestion, dedupe_suggestions};
use cloud_util::InputCursor;

use crate::context::CommandContext;
use crate::execution::check_gates;
use crate::flags::{self, FlagGroup, FlagMode};
use crate::manager::EngineShared;
use crate::processors::ProcessOutcome;
use crate::tree::{CommandNode, NodeKind, VariableData};

/// Filters raw candidates against the partial token under the cursor.
pub trait SuggestionFilter: Send + Sync {
    fn filter(&self, candidates: Vec<Suggestion>, partial: &str) -> Vec<Suggestion>;
}

/// Default filter: case-insensitive prefix match, anchored after the last
/// whitespace in the input so greedy parsers can suggest full sentences.
#[derive(Clone, Copy, Debug, Default)]
pub struct CaseInsensitivePrefixFilter;

impl SuggestionFilter for CaseInsensitivePrefixFilter {
    fn filter(&self, candidates: Vec<Suggestion>, partial: &str) -> Vec<Suggestion> {
        if partial.is_empty() {
            return candidates;
        }
        let needle = partial.to_lowercase();
        candidates
            .into_iter()
            .filter(|suggestion| suggestion.text.to_lowercase().starts_with(&needle))
            .collect()
    }
}

/// Flag-territory walking state: which flags the typed tokens already used
/// and whether one of them is still awaiting its value.
struct FlagWalk<'a, S> {
    group: &'a FlagGroup<S>,
    seen: HashSet<String>,
    pending: Option<String>,
}

fn has_complete_token(cursor: &InputCursor) -> bool {
    let mut probe = cursor.clone();
    let token = probe.read_string();
    !token.is_empty() && probe.offset() < probe.input().len()
}

pub(crate) async fn suggest<S: Send + Sync + 'static>(
    shared: Arc<EngineShared<S>>,
    sender: S,
    line: String,
) -> Vec<Suggestion> {
    tracing::trace!("Computing suggestions for '{}'", line);
    let shared_handle = shared;
    let shared = shared_handle.as_ref();
    let mut context = CommandContext::new(sender, line.clone(), true);
    let mut cursor = InputCursor::new(line.clone());

    for preprocessor in &shared.preprocessors {
        if preprocessor.preprocess(&mut context, &mut cursor) == ProcessOutcome::Rejected {
            return finish(shared, Vec::new());
        }
    }

    // The partial token is everything after the last whitespace; it is both
    // the provider input and the filter anchor.
    let anchor = line
        .rsplit(char::is_whitespace)
        .next()
        .unwrap_or("")
        .to_string();

    let mut node = &shared.tree.root;
    let mut focus: Option<&CommandNode<S>> = None;
    let mut flag_walk: Option<FlagWalk<'_, S>> = None;

    loop {
        if focus.is_some() || !has_complete_token(&cursor) {
            break;
        }

        let mut leave_flag_territory = false;
        if let Some(walk) = &mut flag_walk {
            if walk.pending.take().is_some() {
                cursor.read_string();
                continue;
            }
            let token = cursor.peek_word().to_string();
            if !flags::looks_like_flag(&token) {
                // Under liberal parsing a non-flag token hands control back
                // to the ordered walk; on a terminal flag group it belongs
                // to no one.
                if shared.settings.liberal_flag_parsing {
                    leave_flag_territory = true;
                } else {
                    return finish(shared, Vec::new());
                }
            } else {
                cursor.read_word();
                if let Some(long_name) = token.strip_prefix("--") {
                    let Some(spec) = walk.group.find_long(long_name) else {
                        return finish(shared, Vec::new());
                    };
                    walk.seen.insert(spec.long_name().to_string());
                    if spec.has_value() {
                        walk.pending = Some(spec.long_name().to_string());
                    }
                    continue;
                }
                if let Some(short) = token.strip_prefix('-') {
                    let alias_count = short.chars().count();
                    for alias in short.chars() {
                        let Some(spec) = walk.group.find_alias(alias) else {
                            return finish(shared, Vec::new());
                        };
                        walk.seen.insert(spec.long_name().to_string());
                        if spec.has_value() {
                            if alias_count == 1 {
                                walk.pending = Some(spec.long_name().to_string());
                            } else {
                                return finish(shared, Vec::new());
                            }
                        }
                    }
                    continue;
                }
                continue;
            }
        }
        if leave_flag_territory {
            flag_walk = None;
            continue;
        }

        let word = cursor.peek_word().to_string();
        if flags::looks_like_flag(&word) {
            let target = if shared.settings.liberal_flag_parsing && !node.has_literal_children() {
                node.flag_group_descendant()
            } else {
                node.flag_child()
            };
            if let Some(flag_node) = target {
                if check_gates(shared, &context, flag_node).is_err() {
                    return finish(shared, Vec::new());
                }
                if let Some(group) = flag_node.flag_group() {
                    flag_walk = Some(FlagWalk {
                        group,
                        seen: HashSet::new(),
                        pending: None,
                    });
                    continue;
                }
            }
        }

        if let Some(child) = node
            .children
            .iter()
            .find(|child| child.literal().is_some_and(|literal| literal.matches(&word)))
        {
            if check_gates(shared, &context, child).is_err() {
                return finish(shared, Vec::new());
            }
            cursor.read_word();
            node = child;
            continue;
        }

        let mut advanced = false;
        for child in &node.children {
            let Some(variable) = child.variable() else {
                continue;
            };
            if check_gates(shared, &context, child).is_err() {
                continue;
            }
            let saved = cursor.save();
            match variable.parser.parse_value(&mut context, &mut cursor).await {
                Ok(value) => {
                    context.store_erased(&variable.name, value);
                    if cursor.is_empty(false) && !ends_with_whitespace(&line) {
                        // The parser consumed the trailing partial token
                        // (greedy input): its provider is the one under
                        // focus.
                        focus = Some(child);
                    }
                    node = child;
                    advanced = true;
                    break;
                }
                Err(_) => cursor.restore(saved),
            }
        }
        if advanced {
            continue;
        }

        // A complete token no child accepts: nothing to suggest beyond it.
        return finish(shared, Vec::new());
    }

    let candidates = if let Some(child) = focus {
        match child.variable() {
            Some(variable) => variable_candidates(variable, &context, &anchor).await,
            None => Vec::new(),
        }
    } else if let Some(walk) = &flag_walk {
        if walk.pending.is_none()
            && shared.settings.liberal_flag_parsing
            && !anchor.starts_with('-')
        {
            // The partial token is ordinary input again; offer the node's
            // own candidates, plus the unused flags when nothing is typed.
            let mut out = node_candidates(shared, &context, node, &anchor).await;
            if anchor.is_empty() {
                out.extend(flag_forms(shared, walk.group, &walk.seen, &context));
            }
            out
        } else {
            flag_walk_candidates(shared, walk, &context, &anchor).await
        }
    } else {
        node_candidates(shared, &context, node, &anchor).await
    };

    let filtered = shared.suggestion_filter.filter(candidates, &anchor);
    finish(shared, filtered)
}

fn ends_with_whitespace(line: &str) -> bool {
    line.chars().next_back().is_some_and(char::is_whitespace)
}

fn finish<S>(shared: &EngineShared<S>, candidates: Vec<Suggestion>) -> Vec<Suggestion> {
    let deduped = dedupe_suggestions(candidates);
    if deduped.is_empty() && shared.settings.force_suggestion {
        return vec![Suggestion::new("")];
    }
    deduped
}

async fn variable_candidates<S: Send + Sync + 'static>(
    variable: &VariableData<S>,
    context: &CommandContext<S>,
    partial: &str,
) -> Vec<Suggestion> {
    match &variable.suggestions {
        Some(provider) => provider.suggest(context, partial).await,
        None => variable.parser.suggest_values(context, partial).await,
    }
}

async fn flag_walk_candidates<S: Send + Sync + 'static>(
    shared: &EngineShared<S>,
    walk: &FlagWalk<'_, S>,
    context: &CommandContext<S>,
    partial: &str,
) -> Vec<Suggestion> {
    if let Some(pending) = &walk.pending {
        if let Some(parser) = walk
            .group
            .find_long(pending)
            .and_then(|spec| spec.value_parser())
        {
            return parser.suggest_values(context, partial).await;
        }
        return Vec::new();
    }
    flag_forms(shared, walk.group, &walk.seen, context)
}

/// `--long` and unused `-x` forms the sender may still use.
fn flag_forms<S: Send + Sync + 'static>(
    shared: &EngineShared<S>,
    group: &FlagGroup<S>,
    seen: &HashSet<String>,
    context: &CommandContext<S>,
) -> Vec<Suggestion> {
    let mut out = Vec::new();
    for spec in group.specs() {
        if seen.contains(spec.long_name()) && spec.mode() == FlagMode::Single {
            continue;
        }
        if let Some(permission) = spec.required_permission() {
            if !(shared.permission_checker)(context.sender(), permission) {
                continue;
            }
        }
        out.push(Suggestion::new(format!("--{}", spec.long_name())));
        for alias in spec.aliases() {
            out.push(Suggestion::new(format!("-{alias}")));
        }
    }
    out
}

/// Candidates offered by a node's children, descending through optional
/// variables so omitted components do not hide what follows them.
fn node_candidates<'a, S: Send + Sync + 'static>(
    shared: &'a EngineShared<S>,
    context: &'a CommandContext<S>,
    node: &'a CommandNode<S>,
    partial: &'a str,
) -> BoxFuture<'a, Vec<Suggestion>> {
    Box::pin(async move {
        let mut out = Vec::new();
        for child in &node.children {
            if check_gates(shared, context, child).is_err() {
                continue;
            }
            match &child.kind {
                NodeKind::Literal(literal) => {
                    out.push(Suggestion::new(literal.name.clone()));
                    for alias in &literal.aliases {
                        out.push(Suggestion::new(alias.clone()));
                    }
                }
                NodeKind::Variable(variable) => {
                    out.extend(variable_candidates(variable, context, partial).await);
                    if !variable.required {
                        out.extend(node_candidates(shared, context, child, partial).await);
                    }
                }
                NodeKind::FlagGroup(group) => {
                    if partial.is_empty() || partial.starts_with('-') {
                        out.extend(flag_forms(shared, group, &HashSet::new(), context));
                    }
                }
            }
        }
        out
    })
}
