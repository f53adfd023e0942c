//! Caption keys, variables, and `<name>` placeholder rendering.
//!
//! Captions are keyed message templates. The core attaches a caption key and
//! a set of variables to every structured failure; providers map the key to a
//! template and [`format_caption`] substitutes `<variable>` placeholders.

use std::borrow::Cow;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifies a message template.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CaptionKey(Cow<'static, str>);

impl CaptionKey {
    /// Key from a compile-time constant.
    pub const fn from_static(key: &'static str) -> Self {
        Self(Cow::Borrowed(key))
    }

    /// Key from a runtime string.
    pub fn new(key: impl Into<String>) -> Self {
        Self(Cow::Owned(key.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CaptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A named value substituted into a caption template.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptionVariable {
    /// Placeholder name, referenced in templates as `<name>`.
    pub name: String,
    /// Replacement text.
    pub value: String,
}

impl CaptionVariable {
    pub fn new(name: impl Into<String>, value: impl ToString) -> Self {
        Self {
            name: name.into(),
            value: value.to_string(),
        }
    }
}

/// Substitute every `<name>` placeholder in `template` with its variable.
///
/// Placeholders with no matching variable are left verbatim, as are stray
/// `<` characters that never close.
pub fn format_caption(template: &str, variables: &[CaptionVariable]) -> String {
    let mut output = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('<') {
        output.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find('>') {
            Some(close) => {
                let name = &after[..close];
                match variables.iter().find(|variable| variable.name == name) {
                    Some(variable) => output.push_str(&variable.value),
                    None => {
                        output.push('<');
                        output.push_str(name);
                        output.push('>');
                    }
                }
                rest = &after[close + 1..];
            }
            None => {
                output.push_str(&rest[open..]);
                return output;
            }
        }
    }
    output.push_str(rest);
    output
}

/// Standard caption keys raised by the command core.
pub mod keys {
    use super::CaptionKey;

    pub const ARGUMENT_PARSE_FAILURE_NUMBER: CaptionKey =
        CaptionKey::from_static("argument.parse.failure.number");
    pub const ARGUMENT_PARSE_FAILURE_BOOLEAN: CaptionKey =
        CaptionKey::from_static("argument.parse.failure.boolean");
    pub const ARGUMENT_PARSE_FAILURE_CHAR: CaptionKey =
        CaptionKey::from_static("argument.parse.failure.char");
    pub const ARGUMENT_PARSE_FAILURE_NO_INPUT: CaptionKey =
        CaptionKey::from_static("argument.parse.failure.no_input");
    pub const ARGUMENT_PARSE_FAILURE_EITHER: CaptionKey =
        CaptionKey::from_static("argument.parse.failure.either");
    pub const EXCEPTION_NO_SUCH_COMMAND: CaptionKey =
        CaptionKey::from_static("exception.no_such_command");
    pub const EXCEPTION_INVALID_SYNTAX: CaptionKey =
        CaptionKey::from_static("exception.invalid_syntax");
    pub const EXCEPTION_INVALID_SENDER: CaptionKey =
        CaptionKey::from_static("exception.invalid_sender");
    pub const EXCEPTION_NO_PERMISSION: CaptionKey =
        CaptionKey::from_static("exception.no_permission");
    pub const EXCEPTION_COMMAND_EXECUTION: CaptionKey =
        CaptionKey::from_static("exception.command_execution");
    pub const EXCEPTION_CANCELLED: CaptionKey = CaptionKey::from_static("exception.cancelled");
    pub const FLAG_UNKNOWN: CaptionKey = CaptionKey::from_static("flag.unknown");
    pub const FLAG_DUPLICATE: CaptionKey = CaptionKey::from_static("flag.duplicate");
    pub const FLAG_NO_FLAG_STARTED: CaptionKey = CaptionKey::from_static("flag.no_flag_started");
    pub const FLAG_MISSING_ARGUMENT: CaptionKey = CaptionKey::from_static("flag.missing_argument");
    pub const FLAG_NO_PERMISSION: CaptionKey = CaptionKey::from_static("flag.no_permission");
}

/// English fallback template for a standard key, if one exists.
pub fn default_template(key: &CaptionKey) -> Option<&'static str> {
    let template = match key.as_str() {
        "argument.parse.failure.number" => "'<input>' is not a valid number between <min> and <max>",
        "argument.parse.failure.boolean" => "'<input>' is not a valid boolean",
        "argument.parse.failure.char" => "'<input>' is not a single character",
        "argument.parse.failure.no_input" => "No input was provided",
        "argument.parse.failure.either" => "'<input>' matched neither <primary> nor <fallback>",
        "exception.no_such_command" => "Unknown command '<command>'",
        "exception.invalid_syntax" => "Invalid command syntax after '<prefix>'. Expected one of: <expected>",
        "exception.invalid_sender" => "This sender may not run '<node>'",
        "exception.no_permission" => "Missing permission '<permission>'",
        "exception.command_execution" => "An error occurred while executing the command",
        "exception.cancelled" => "Command execution was cancelled",
        "flag.unknown" => "Unknown flag '<flag>'",
        "flag.duplicate" => "Duplicate flag '<flag>'",
        "flag.no_flag_started" => "No flag started before '<input>'",
        "flag.missing_argument" => "Missing value for flag '<flag>'",
        "flag.no_permission" => "Missing permission '<permission>' for flag '<flag>'",
        _ => return None,
    };
    Some(template)
}
