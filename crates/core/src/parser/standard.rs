//! Standard parsers: strings, characters, booleans, and the numeric family.

use async_trait::async_trait;
use cloud_types::Suggestion;
use cloud_util::{InputCursor, NumericRange};

use crate::context::CommandContext;
use crate::error::ParseFailure;
use crate::parser::{AcceptClass, ArgumentParser};

/// How much input a [`StringParser`] consumes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StringMode {
    /// One whitespace-delimited word, verbatim.
    Single,
    /// One token with quoting and escapes honoured.
    Quoted,
    /// Everything remaining, including internal whitespace.
    Greedy,
}

/// Parses string arguments in one of three modes.
#[derive(Clone, Copy, Debug)]
pub struct StringParser {
    mode: StringMode,
}

impl StringParser {
    pub fn single() -> Self {
        Self {
            mode: StringMode::Single,
        }
    }

    pub fn quoted() -> Self {
        Self {
            mode: StringMode::Quoted,
        }
    }

    pub fn greedy() -> Self {
        Self {
            mode: StringMode::Greedy,
        }
    }

    pub fn mode(&self) -> StringMode {
        self.mode
    }
}

#[async_trait]
impl<S: Send + Sync + 'static> ArgumentParser<S> for StringParser {
    type Output = String;

    async fn parse(
        &self,
        _context: &mut CommandContext<S>,
        input: &mut InputCursor,
    ) -> Result<String, ParseFailure> {
        let value = match self.mode {
            StringMode::Single => input.read_word(),
            StringMode::Quoted => input.read_string(),
            StringMode::Greedy => input.read_greedy(),
        };
        if value.is_empty() {
            return Err(ParseFailure::no_input(<StringParser as ArgumentParser<S>>::parser_name(self)));
        }
        Ok(value)
    }

    fn accept_class(&self) -> AcceptClass {
        match self.mode {
            StringMode::Single => AcceptClass::Word,
            StringMode::Quoted => AcceptClass::Quoted,
            StringMode::Greedy => AcceptClass::Greedy,
        }
    }

    fn is_context_free(&self) -> bool {
        true
    }

    fn parser_name(&self) -> String {
        match self.mode {
            StringMode::Single => "string".into(),
            StringMode::Quoted => "quoted string".into(),
            StringMode::Greedy => "greedy string".into(),
        }
    }
}

/// Parses a single character token.
#[derive(Clone, Copy, Debug, Default)]
pub struct CharParser;

#[async_trait]
impl<S: Send + Sync + 'static> ArgumentParser<S> for CharParser {
    type Output = char;

    async fn parse(
        &self,
        _context: &mut CommandContext<S>,
        input: &mut InputCursor,
    ) -> Result<char, ParseFailure> {
        input
            .read_char()
            .map_err(|error| ParseFailure::from_cursor("char", error))
    }

    fn accept_class(&self) -> AcceptClass {
        AcceptClass::Character
    }

    fn is_context_free(&self) -> bool {
        true
    }

    fn parser_name(&self) -> String {
        "char".into()
    }
}

/// Parses boolean tokens; the liberal form also accepts `yes/no/on/off/1/0`.
#[derive(Clone, Copy, Debug)]
pub struct BooleanParser {
    liberal: bool,
}

impl BooleanParser {
    pub fn strict() -> Self {
        Self { liberal: false }
    }

    pub fn liberal() -> Self {
        Self { liberal: true }
    }

    pub fn is_liberal(&self) -> bool {
        self.liberal
    }
}

#[async_trait]
impl<S: Send + Sync + 'static> ArgumentParser<S> for BooleanParser {
    type Output = bool;

    async fn parse(
        &self,
        _context: &mut CommandContext<S>,
        input: &mut InputCursor,
    ) -> Result<bool, ParseFailure> {
        input
            .read_boolean(self.liberal)
            .map_err(|error| ParseFailure::from_cursor(<BooleanParser as ArgumentParser<S>>::parser_name(self), error))
    }

    async fn suggest(&self, _context: &CommandContext<S>, _input: &str) -> Vec<Suggestion> {
        if self.liberal {
            Suggestion::all(["true", "false", "yes", "no", "on", "off"])
        } else {
            Suggestion::all(["true", "false"])
        }
    }

    fn accept_class(&self) -> AcceptClass {
        // Liberal spellings overlap numbers ("1"/"0"), so only the strict
        // form is a usable disambiguator.
        if self.liberal {
            AcceptClass::Custom
        } else {
            AcceptClass::Boolean
        }
    }

    fn is_context_free(&self) -> bool {
        true
    }

    fn parser_name(&self) -> String {
        "boolean".into()
    }
}

/// Digit-extension candidates for a numeric prefix: the prefix itself plus
/// `prefix` with each of `0..=9` appended, keeping only candidates the
/// parser's range accepts.
fn numeric_suggestions(prefix: &str, accepts: impl Fn(&str) -> bool) -> Vec<Suggestion> {
    let mut out = Vec::new();
    if !prefix.is_empty() && accepts(prefix) {
        out.push(Suggestion::new(prefix));
    }
    // "0" extends only to leading-zero spellings of itself.
    if prefix == "0" || prefix == "-0" {
        return out;
    }
    if !prefix.is_empty() && prefix != "-" && prefix.parse::<f64>().is_err() {
        return out;
    }
    for digit in 0..=9u8 {
        let candidate = format!("{prefix}{digit}");
        if accepts(&candidate) {
            out.push(Suggestion::new(candidate));
        }
    }
    out
}

macro_rules! numeric_argument_parser {
    ($(#[$doc:meta])* $parser:ident, $ty:ty, $reader:ident, $name:literal, $class:expr) => {
        $(#[$doc])*
        #[derive(Clone, Copy, Debug)]
        pub struct $parser {
            range: NumericRange<$ty>,
        }

        impl $parser {
            pub fn new(range: impl Into<NumericRange<$ty>>) -> Self {
                Self {
                    range: range.into(),
                }
            }

            /// Parser over the full representable range.
            pub fn any() -> Self {
                Self {
                    range: NumericRange::full(),
                }
            }

            pub fn range(&self) -> NumericRange<$ty> {
                self.range
            }
        }

        impl Default for $parser {
            fn default() -> Self {
                Self::any()
            }
        }

        #[async_trait]
        impl<S: Send + Sync + 'static> ArgumentParser<S> for $parser {
            type Output = $ty;

            async fn parse(
                &self,
                _context: &mut CommandContext<S>,
                input: &mut InputCursor,
            ) -> Result<$ty, ParseFailure> {
                input
                    .$reader(self.range)
                    .map_err(|error| ParseFailure::from_cursor($name, error))
            }

            async fn suggest(
                &self,
                _context: &CommandContext<S>,
                input: &str,
            ) -> Vec<Suggestion> {
                numeric_suggestions(input, |candidate| {
                    candidate
                        .parse::<$ty>()
                        .map(|value| self.range.contains(value))
                        .unwrap_or(false)
                })
            }

            fn accept_class(&self) -> AcceptClass {
                $class
            }

            fn is_context_free(&self) -> bool {
                true
            }

            fn parser_name(&self) -> String {
                $name.into()
            }
        }
    };
}

numeric_argument_parser!(
    /// Parses `i8` arguments within an inclusive range.
    ByteParser, i8, read_byte, "byte", AcceptClass::Integer
);
numeric_argument_parser!(
    /// Parses `i16` arguments within an inclusive range.
    ShortParser, i16, read_short, "short", AcceptClass::Integer
);
numeric_argument_parser!(
    /// Parses `i32` arguments within an inclusive range.
    IntegerParser, i32, read_integer, "integer", AcceptClass::Integer
);
numeric_argument_parser!(
    /// Parses `i64` arguments within an inclusive range.
    LongParser, i64, read_long, "long", AcceptClass::Integer
);
numeric_argument_parser!(
    /// Parses `f32` arguments within an inclusive range.
    FloatParser, f32, read_float, "float", AcceptClass::Decimal
);
numeric_argument_parser!(
    /// Parses `f64` arguments within an inclusive range.
    DoubleParser, f64, read_double, "double", AcceptClass::Decimal
);
