//! Structured failure taxonomy for registration and dispatch.

use cloud_types::caption::{CaptionKey, CaptionVariable, keys};
use cloud_util::CursorError;
use thiserror::Error;

/// Failure reported by an argument parser.
///
/// Carries everything the caption surface needs: the parser identity, the
/// offending input, a caption key, and the caption variables referenced by
/// the key's template. Compound failures (for example from alternative
/// parsers) keep their child failures in `causes`.
#[derive(Clone, Debug)]
pub struct ParseFailure {
    /// Identity of the parser that failed, for diagnostics.
    pub parser: String,
    /// The input that was rejected.
    pub input: String,
    /// Caption key selecting the message template.
    pub caption: CaptionKey,
    /// Variables substituted into the template.
    pub variables: Vec<CaptionVariable>,
    /// Child failures for compound parsers; empty otherwise.
    pub causes: Vec<ParseFailure>,
}

impl ParseFailure {
    pub fn new(
        parser: impl Into<String>,
        input: impl Into<String>,
        caption: CaptionKey,
        variables: Vec<CaptionVariable>,
    ) -> Self {
        Self {
            parser: parser.into(),
            input: input.into(),
            caption,
            variables,
            causes: Vec::new(),
        }
    }

    /// Failure for a reader that found nothing to consume.
    pub fn no_input(parser: impl Into<String>) -> Self {
        Self::new(parser, "", keys::ARGUMENT_PARSE_FAILURE_NO_INPUT, Vec::new())
    }

    /// Map a cursor-level failure onto the caption surface.
    pub fn from_cursor(parser: impl Into<String>, error: CursorError) -> Self {
        match error {
            CursorError::NoInput => Self::no_input(parser),
            CursorError::InvalidNumber { token, min, max, .. } => Self::new(
                parser,
                token.clone(),
                keys::ARGUMENT_PARSE_FAILURE_NUMBER,
                vec![
                    CaptionVariable::new("input", &token),
                    CaptionVariable::new("min", min),
                    CaptionVariable::new("max", max),
                ],
            ),
            CursorError::OutOfRange { token, min, max, .. } => Self::new(
                parser,
                token.clone(),
                keys::ARGUMENT_PARSE_FAILURE_NUMBER,
                vec![
                    CaptionVariable::new("input", &token),
                    CaptionVariable::new("min", min),
                    CaptionVariable::new("max", max),
                ],
            ),
            CursorError::InvalidBoolean { token } => Self::new(
                parser,
                token.clone(),
                keys::ARGUMENT_PARSE_FAILURE_BOOLEAN,
                vec![CaptionVariable::new("input", &token)],
            ),
            CursorError::InvalidChar { token } => Self::new(
                parser,
                token.clone(),
                keys::ARGUMENT_PARSE_FAILURE_CHAR,
                vec![CaptionVariable::new("input", &token)],
            ),
        }
    }

    /// Compound failure produced when both branches of an alternative fail.
    pub fn either(
        input: impl Into<String>,
        primary_type: &str,
        fallback_type: &str,
        primary_failure: ParseFailure,
        fallback_failure: ParseFailure,
    ) -> Self {
        let input = input.into();
        Self {
            parser: format!("either({primary_type}, {fallback_type})"),
            input: input.clone(),
            caption: keys::ARGUMENT_PARSE_FAILURE_EITHER,
            variables: vec![
                CaptionVariable::new("input", &input),
                CaptionVariable::new("primary", primary_type),
                CaptionVariable::new("fallback", fallback_type),
            ],
            causes: vec![primary_failure, fallback_failure],
        }
    }
}

impl std::fmt::Display for ParseFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} could not parse '{}'", self.parser, self.input)
    }
}

/// Failure raised by the flag sub-parser.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum FlagError {
    /// The token named a flag the group does not define.
    #[error("unknown flag '{flag}'")]
    UnknownFlag { flag: String },
    /// A single-mode flag appeared more than once.
    #[error("duplicate flag '{flag}'")]
    DuplicateFlag { flag: String },
    /// A non-flag token appeared where a flag was expected.
    #[error("no flag started before '{input}'")]
    NoFlagStarted { input: String },
    /// Input ended while a flag was awaiting its value.
    #[error("missing value for flag '{flag}'")]
    MissingArgument { flag: String },
    /// The sender lacks the flag's permission.
    #[error("missing permission '{permission}' for flag '{flag}'")]
    NoPermission { flag: String, permission: String },
}

/// Discriminant of [`CommandError`], used to register exception handlers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CommandErrorKind {
    NoSuchCommand,
    InvalidSyntax,
    InvalidSender,
    NoPermission,
    ArgumentParse,
    FlagParse,
    Execution,
    Cancelled,
}

/// Failure raised by the execution or suggestion pipeline.
#[derive(Debug, Error)]
pub enum CommandError {
    /// The first token matched no registered top-level literal.
    #[error("unknown command '{input}'")]
    NoSuchCommand { input: String },
    /// Traversal reached a dead end with input remaining; carries the longest
    /// successful prefix and the tokens that would have been accepted next.
    #[error("invalid command syntax after '{prefix}'")]
    InvalidSyntax { prefix: String, expected: Vec<String> },
    /// The sender filter on a matched node rejected the sender.
    #[error("this sender may not run '{node}'")]
    InvalidSender { node: String },
    /// A permission gate rejected the sender.
    #[error("missing permission '{permission}'")]
    NoPermission { permission: String },
    /// An argument parser rejected its token.
    #[error("could not parse argument: {0}")]
    ArgumentParse(ParseFailure),
    /// The flag sub-parser rejected the remaining tokens.
    #[error(transparent)]
    FlagParse(#[from] FlagError),
    /// The command handler returned an error; the original cause is retained.
    #[error("command handler failed")]
    Execution(#[source] anyhow::Error),
    /// The execution future was cancelled between suspension points.
    #[error("command execution was cancelled")]
    Cancelled,
}

impl CommandError {
    pub fn kind(&self) -> CommandErrorKind {
        match self {
            CommandError::NoSuchCommand { .. } => CommandErrorKind::NoSuchCommand,
            CommandError::InvalidSyntax { .. } => CommandErrorKind::InvalidSyntax,
            CommandError::InvalidSender { .. } => CommandErrorKind::InvalidSender,
            CommandError::NoPermission { .. } => CommandErrorKind::NoPermission,
            CommandError::ArgumentParse(_) => CommandErrorKind::ArgumentParse,
            CommandError::FlagParse(_) => CommandErrorKind::FlagParse,
            CommandError::Execution(_) => CommandErrorKind::Execution,
            CommandError::Cancelled => CommandErrorKind::Cancelled,
        }
    }

    /// Parse-time failures may be retried against sibling variables; gate and
    /// handler failures may not.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            CommandError::ArgumentParse(_) | CommandError::InvalidSyntax { .. }
        )
    }

    /// Caption key describing this failure.
    pub fn caption_key(&self) -> CaptionKey {
        match self {
            CommandError::NoSuchCommand { .. } => keys::EXCEPTION_NO_SUCH_COMMAND,
            CommandError::InvalidSyntax { .. } => keys::EXCEPTION_INVALID_SYNTAX,
            CommandError::InvalidSender { .. } => keys::EXCEPTION_INVALID_SENDER,
            CommandError::NoPermission { .. } => keys::EXCEPTION_NO_PERMISSION,
            CommandError::ArgumentParse(failure) => failure.caption.clone(),
            CommandError::FlagParse(flag_error) => match flag_error {
                FlagError::UnknownFlag { .. } => keys::FLAG_UNKNOWN,
                FlagError::DuplicateFlag { .. } => keys::FLAG_DUPLICATE,
                FlagError::NoFlagStarted { .. } => keys::FLAG_NO_FLAG_STARTED,
                FlagError::MissingArgument { .. } => keys::FLAG_MISSING_ARGUMENT,
                FlagError::NoPermission { .. } => keys::FLAG_NO_PERMISSION,
            },
            CommandError::Execution(_) => keys::EXCEPTION_COMMAND_EXECUTION,
            CommandError::Cancelled => keys::EXCEPTION_CANCELLED,
        }
    }

    /// Variables referenced by this failure's caption template.
    pub fn caption_variables(&self) -> Vec<CaptionVariable> {
        match self {
            CommandError::NoSuchCommand { input } => {
                vec![CaptionVariable::new("command", input)]
            }
            CommandError::InvalidSyntax { prefix, expected } => vec![
                CaptionVariable::new("prefix", prefix),
                CaptionVariable::new("expected", expected.join(", ")),
            ],
            CommandError::InvalidSender { node } => vec![CaptionVariable::new("node", node)],
            CommandError::NoPermission { permission } => {
                vec![CaptionVariable::new("permission", permission)]
            }
            CommandError::ArgumentParse(failure) => failure.variables.clone(),
            CommandError::FlagParse(flag_error) => match flag_error {
                FlagError::UnknownFlag { flag } | FlagError::DuplicateFlag { flag } => {
                    vec![CaptionVariable::new("flag", flag)]
                }
                FlagError::NoFlagStarted { input } => vec![CaptionVariable::new("input", input)],
                FlagError::MissingArgument { flag } => vec![CaptionVariable::new("flag", flag)],
                FlagError::NoPermission { flag, permission } => vec![
                    CaptionVariable::new("flag", flag),
                    CaptionVariable::new("permission", permission),
                ],
            },
            CommandError::Execution(_) | CommandError::Cancelled => Vec::new(),
        }
    }
}

/// Failure raised while registering a command. The tree is left unchanged.
#[derive(Debug, Error)]
pub enum RegistrationError {
    /// Sibling nodes would no longer be deterministically distinguishable.
    #[error("ambiguous children under '{parent}': {detail}")]
    Ambiguity { parent: String, detail: String },
    /// A handler is already attached at this terminal and overriding is off.
    #[error("a command is already registered at '{path}'")]
    DuplicateCommand { path: String },
    /// The manager is sealed; structural edits are rejected.
    #[error("the command tree is sealed")]
    TreeSealed,
    /// A registration sink refused to mirror the command.
    #[error("registration sink rejected '{name}': {reason}")]
    SinkRejected { name: String, reason: String },
    /// The flag's long name does not match `[A-Za-z][A-Za-z0-9_-]*`.
    #[error("invalid flag name '{name}'")]
    InvalidFlagName { name: String },
    /// A flag alias must be exactly one alphabetic character.
    #[error("invalid alias '{alias}' for flag '{name}'")]
    InvalidFlagAlias { name: String, alias: char },
    /// A required component may not follow an optional one.
    #[error("required component '{name}' follows an optional component")]
    RequiredAfterOptional { name: String },
    /// A flag group ends a command chain; nothing may follow it.
    #[error("components may not follow a flag group")]
    ComponentAfterFlags,
    /// The command chain never received a handler.
    #[error("command '{name}' has no handler")]
    MissingHandler { name: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_cursor_out_of_range_variables() {
        let failure = ParseFailure::from_cursor(
            "i32",
            CursorError::OutOfRange {
                token: "99".into(),
                kind: cloud_util::NumberKind::Integer,
                min: "0".into(),
                max: "10".into(),
            },
        );
        assert_eq!(failure.caption, keys::ARGUMENT_PARSE_FAILURE_NUMBER);
        assert_eq!(
            failure.variables,
            vec![
                CaptionVariable::new("input", "99"),
                CaptionVariable::new("min", "0"),
                CaptionVariable::new("max", "10"),
            ]
        );
    }

    #[test]
    fn test_from_cursor_invalid_number_carries_bounds() {
        let failure = ParseFailure::from_cursor(
            "i32",
            CursorError::InvalidNumber {
                token: "abc".into(),
                kind: cloud_util::NumberKind::Integer,
                min: "0".into(),
                max: "3".into(),
            },
        );
        assert_eq!(failure.caption, keys::ARGUMENT_PARSE_FAILURE_NUMBER);
        assert_eq!(
            failure.variables,
            vec![
                CaptionVariable::new("input", "abc"),
                CaptionVariable::new("min", "0"),
                CaptionVariable::new("max", "3"),
            ]
        );
    }

    #[test]
    fn test_either_failure_keeps_causes() {
        let first = ParseFailure::no_input("i32");
        let second = ParseFailure::no_input("bool");
        let compound = ParseFailure::either("x", "i32", "bool", first, second);
        assert_eq!(compound.causes.len(), 2);
        assert_eq!(compound.caption, keys::ARGUMENT_PARSE_FAILURE_EITHER);
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            CommandError::Cancelled.kind(),
            CommandErrorKind::Cancelled
        );
        assert!(CommandError::ArgumentParse(ParseFailure::no_input("x")).is_recoverable());
        assert!(!CommandError::NoPermission { permission: "p".into() }.is_recoverable());
    }
}
