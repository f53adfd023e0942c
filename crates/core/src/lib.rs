//! # Cloud Command Core
//!
//! Cloud is a general-purpose command dispatcher: a line of text produced by
//! some sender is deterministically routed to a handler, with every
//! positional token converted into a strongly-typed value on the way.
//!
//! ## Key pieces
//!
//! - **Command tree**: an immutable-after-seal trie of literal, variable,
//!   and flag-group nodes, built through the [`Command`] builder and owned
//!   by a [`CommandManager`]
//! - **Parsers**: the [`parser::ArgumentParser`] contract with a standard
//!   set ([`parser::standard`]), derived combinators ([`parser::compose`]),
//!   and a manager-scoped registry ([`parser::registry`])
//! - **Execution**: a pipeline of preprocessors, the backtracking tree walk
//!   with deepest-failure reporting, postprocessors, and the handler
//! - **Flags**: an orderless sub-parser for `--long`, `-x`, and combined
//!   `-abc` forms with repeatable and value-bearing flags
//! - **Suggestions**: the same walk, stopped at the last incomplete token
//!
//! ## Usage
//!
//! ```rust
//! use cloud_core::command::Command;
//! use cloud_core::context::ContextKey;
//! use cloud_core::manager::CommandManager;
//! use cloud_core::parser::standard::IntegerParser;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let mut manager: CommandManager<&'static str> = CommandManager::new();
//! manager
//!     .register(
//!         Command::new("roll")
//!             .optional_with_default("sides", IntegerParser::new(2..=120), 6)
//!             .handler_blocking(|ctx| {
//!                 let sides = ctx.get(&ContextKey::<i32>::new("sides")).unwrap_or(6);
//!                 let _ = sides;
//!                 Ok(())
//!             }),
//!     )
//!     .unwrap();
//!
//! let outcome = manager.execute("console", "roll 20").await;
//! assert!(outcome.is_ok());
//! # }
//! ```

pub mod caption;
pub mod command;
pub mod context;
pub mod coordinator;
pub mod error;
pub mod execution;
pub mod flags;
pub mod handler;
pub mod manager;
pub mod parser;
pub mod processors;
pub mod sender;
pub mod suggest;
mod tree;

pub use caption::{CaptionProvider, CaptionRegistry, StaticCaptionProvider};
pub use command::{Command, DefaultValue, SenderFilter};
pub use context::{CommandContext, ContextKey, ContextValue, FlagContext, FlagValue};
pub use coordinator::ExecutionCoordinator;
pub use error::{
    CommandError, CommandErrorKind, FlagError, ParseFailure, RegistrationError,
};
pub use execution::ExecutionOutcome;
pub use flags::{FlagMode, FlagSpec};
pub use handler::{AsyncHandler, BlockingHandler, CommandHandler};
pub use manager::{
    CommandManager, ExceptionHandler, ManagerSettings, PermissionChecker, RegistrationState,
};
pub use parser::registry::ParserRegistry;
pub use parser::{AcceptClass, ArgumentParser, StaticSuggestions, SuggestionProvider, UntypedParser};
pub use processors::{CommandPostprocessor, CommandPreprocessor, ProcessOutcome};
pub use sender::{CommandSummary, IdentityMapper, RegistrationSink, SenderMapper};
pub use suggest::{CaseInsensitivePrefixFilter, SuggestionFilter};

pub use cloud_types::{CaptionKey, CaptionVariable, Suggestion, ValueType};
pub use cloud_util::{CursorError, InputCursor, NumberKind, NumericRange};
