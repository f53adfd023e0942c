//! Input lexing utilities for the Cloud command dispatcher.
//!
//! The central export is [`InputCursor`], a forward-only cursor over one line
//! of command input that supports peeking, quoted strings with escapes, typed
//! numeric readers that never consume on failure, and save/restore based
//! backtracking for alternative parsers.

pub mod cursor;
pub mod range;

pub use cursor::{CursorError, InputCursor, NumberKind};
pub use range::{NumericRange, RangedNumber};
