//! Core type definitions shared across the Cloud workspace.
//!
//! The `cloud-types` crate centralizes the plain data structures that describe
//! parsed-value types, completion suggestions, and the caption (message
//! template) surface shared by the parsing core and any platform adapter
//! built on top of it.

pub mod caption;
pub mod suggestion;
pub mod value;

pub use caption::{CaptionKey, CaptionVariable, format_caption};
pub use suggestion::{Suggestion, dedupe_suggestions};
pub use value::ValueType;
