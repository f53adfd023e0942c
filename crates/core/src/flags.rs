//! Flag specifications and the orderless flag sub-parser.
//!
//! Once a flag group is entered, the remaining tokens are consumed by a
//! small state machine (`AWAIT_FLAG` / `AWAIT_VALUE`) rather than the
//! ordered tree walk: flags may appear in any order, short aliases may
//! combine (`-abc`), and repeatable flags accumulate values.

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;

use cloud_util::InputCursor;

use crate::context::CommandContext;
use crate::error::{CommandError, FlagError, RegistrationError};
use crate::manager::PermissionChecker;
use crate::parser::{ArgumentParser, UntypedParser};

static FLAG_NAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new("^[A-Za-z][A-Za-z0-9_-]*$").expect("flag name pattern"));

/// Whether a flag may appear more than once.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FlagMode {
    Single,
    Repeatable,
}

/// Specification of one flag within a flag group.
pub struct FlagSpec<S> {
    long_name: String,
    aliases: Vec<char>,
    value_parser: Option<Arc<dyn UntypedParser<S>>>,
    mode: FlagMode,
    permission: Option<String>,
    description: Option<String>,
}

impl<S: Send + Sync + 'static> FlagSpec<S> {
    /// A presence flag: no value, stored as a marker.
    pub fn presence(long_name: impl Into<String>) -> Self {
        Self {
            long_name: long_name.into(),
            aliases: Vec::new(),
            value_parser: None,
            mode: FlagMode::Single,
            permission: None,
            description: None,
        }
    }

    /// A value-bearing flag driven by the given parser.
    pub fn with_value<P>(long_name: impl Into<String>, parser: P) -> Self
    where
        P: ArgumentParser<S> + 'static,
    {
        Self::with_value_parser(long_name, Arc::new(parser))
    }

    /// A value-bearing flag with an erased (registry-sourced) parser.
    pub fn with_value_parser(
        long_name: impl Into<String>,
        parser: Arc<dyn UntypedParser<S>>,
    ) -> Self {
        Self {
            long_name: long_name.into(),
            aliases: Vec::new(),
            value_parser: Some(parser),
            mode: FlagMode::Single,
            permission: None,
            description: None,
        }
    }

    /// Add a single-character alias, used as `-x`.
    pub fn alias(mut self, alias: char) -> Self {
        self.aliases.push(alias);
        self
    }

    pub fn repeatable(mut self) -> Self {
        self.mode = FlagMode::Repeatable;
        self
    }

    pub fn permission(mut self, permission: impl Into<String>) -> Self {
        self.permission = Some(permission.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn long_name(&self) -> &str {
        &self.long_name
    }

    pub fn aliases(&self) -> &[char] {
        &self.aliases
    }

    pub fn mode(&self) -> FlagMode {
        self.mode
    }

    pub fn has_value(&self) -> bool {
        self.value_parser.is_some()
    }

    pub fn value_parser(&self) -> Option<&Arc<dyn UntypedParser<S>>> {
        self.value_parser.as_ref()
    }

    pub fn required_permission(&self) -> Option<&str> {
        self.permission.as_deref()
    }

    pub fn flag_description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub(crate) fn validate(&self) -> Result<(), RegistrationError> {
        if !FLAG_NAME_PATTERN.is_match(&self.long_name) {
            return Err(RegistrationError::InvalidFlagName {
                name: self.long_name.clone(),
            });
        }
        for alias in &self.aliases {
            if !alias.is_alphabetic() {
                return Err(RegistrationError::InvalidFlagAlias {
                    name: self.long_name.clone(),
                    alias: *alias,
                });
            }
        }
        Ok(())
    }
}

impl<S> Clone for FlagSpec<S> {
    fn clone(&self) -> Self {
        Self {
            long_name: self.long_name.clone(),
            aliases: self.aliases.clone(),
            value_parser: self.value_parser.clone(),
            mode: self.mode,
            permission: self.permission.clone(),
            description: self.description.clone(),
        }
    }
}

/// The flags attached to one flag-group node.
pub(crate) struct FlagGroup<S> {
    specs: Vec<FlagSpec<S>>,
}

impl<S: Send + Sync + 'static> FlagGroup<S> {
    pub(crate) fn new() -> Self {
        Self { specs: Vec::new() }
    }

    /// Add a spec, rejecting long-name or alias collisions.
    pub(crate) fn add(&mut self, spec: FlagSpec<S>) -> Result<(), RegistrationError> {
        spec.validate()?;
        self.check_collision(&spec)?;
        self.specs.push(spec);
        Ok(())
    }

    pub(crate) fn check_collision(&self, spec: &FlagSpec<S>) -> Result<(), RegistrationError> {
        for existing in &self.specs {
            if existing.long_name == spec.long_name {
                return Err(RegistrationError::Ambiguity {
                    parent: "flags".into(),
                    detail: format!("flag '--{}' is already defined", spec.long_name),
                });
            }
            for alias in &spec.aliases {
                if existing.aliases.contains(alias) {
                    return Err(RegistrationError::Ambiguity {
                        parent: "flags".into(),
                        detail: format!("flag alias '-{alias}' is already defined"),
                    });
                }
            }
        }
        Ok(())
    }

    pub(crate) fn specs(&self) -> &[FlagSpec<S>] {
        &self.specs
    }

    pub(crate) fn find_long(&self, long_name: &str) -> Option<&FlagSpec<S>> {
        self.specs.iter().find(|spec| spec.long_name == long_name)
    }

    pub(crate) fn find_alias(&self, alias: char) -> Option<&FlagSpec<S>> {
        self.specs.iter().find(|spec| spec.aliases.contains(&alias))
    }
}

impl<S> Clone for FlagGroup<S> {
    fn clone(&self) -> Self {
        Self {
            specs: self.specs.clone(),
        }
    }
}

/// Heuristic for "this token starts a flag". A lone `-` or a `-` followed by
/// a digit or decimal point is treated as ordinary input so negative numbers
/// still parse as variable arguments.
pub(crate) fn looks_like_flag(token: &str) -> bool {
    let mut chars = token.chars();
    if chars.next() != Some('-') {
        return false;
    }
    match chars.next() {
        None => false,
        Some(second) => !(second.is_ascii_digit() || second == '.'),
    }
}

fn check_flag_permission<S>(
    spec: &FlagSpec<S>,
    context: &CommandContext<S>,
    checker: &PermissionChecker<S>,
) -> Result<(), CommandError>
where
    S: Send + Sync + 'static,
{
    if let Some(permission) = spec.required_permission() {
        if !checker(context.sender(), permission) {
            return Err(FlagError::NoPermission {
                flag: spec.long_name.clone(),
                permission: permission.to_string(),
            }
            .into());
        }
    }
    Ok(())
}

fn check_duplicate<S>(
    spec: &FlagSpec<S>,
    context: &CommandContext<S>,
) -> Result<(), CommandError>
where
    S: Send + Sync + 'static,
{
    if spec.mode == FlagMode::Single && context.flags().count(&spec.long_name) > 0 {
        return Err(FlagError::DuplicateFlag {
            flag: spec.long_name.clone(),
        }
        .into());
    }
    Ok(())
}

async fn apply_flag<S>(
    spec: &FlagSpec<S>,
    context: &mut CommandContext<S>,
    cursor: &mut InputCursor,
    checker: &PermissionChecker<S>,
) -> Result<(), CommandError>
where
    S: Send + Sync + 'static,
{
    check_flag_permission(spec, context, checker)?;
    check_duplicate(spec, context)?;
    match spec.value_parser() {
        None => {
            context.flags_mut().add_present(&spec.long_name);
            Ok(())
        }
        Some(parser) => {
            cursor.skip_whitespace();
            if cursor.is_empty(false) {
                return Err(FlagError::MissingArgument {
                    flag: spec.long_name.clone(),
                }
                .into());
            }
            let value = parser
                .parse_value(context, cursor)
                .await
                .map_err(CommandError::ArgumentParse)?;
            context.flags_mut().add_value(&spec.long_name, value);
            Ok(())
        }
    }
}

/// Drive the flag state machine over the remaining tokens.
///
/// In terminal mode (`absorb == false`) a non-flag token is a
/// `NO_FLAG_STARTED` failure; in absorb mode (liberal flag parsing) the
/// machine stops in front of it and leaves the cursor there.
pub(crate) async fn parse_flags<S>(
    group: &FlagGroup<S>,
    context: &mut CommandContext<S>,
    cursor: &mut InputCursor,
    checker: &PermissionChecker<S>,
    absorb: bool,
) -> Result<(), CommandError>
where
    S: Send + Sync + 'static,
{
    loop {
        cursor.skip_whitespace();
        if cursor.is_empty(false) {
            return Ok(());
        }
        let token = cursor.peek_word().to_string();
        if !looks_like_flag(&token) {
            if absorb {
                return Ok(());
            }
            return Err(FlagError::NoFlagStarted { input: token }.into());
        }
        cursor.read_word();
        tracing::trace!("Parsing flag token '{}'", token);
        if let Some(long_name) = token.strip_prefix("--") {
            let spec = group.find_long(long_name).ok_or(FlagError::UnknownFlag {
                flag: token.clone(),
            })?;
            apply_flag(spec, context, cursor, checker).await?;
            continue;
        }
        let short = &token[1..];
        let mut alias_chars = short.chars();
        let Some(first) = alias_chars.next() else {
            continue;
        };
        if alias_chars.next().is_none() {
            let spec = group.find_alias(first).ok_or(FlagError::UnknownFlag {
                flag: token.clone(),
            })?;
            apply_flag(spec, context, cursor, checker).await?;
            continue;
        }
        // Combined short form: every character must alias a presence flag.
        for alias in short.chars() {
            let spec = group.find_alias(alias).ok_or(FlagError::UnknownFlag {
                flag: format!("-{alias}"),
            })?;
            if spec.has_value() {
                return Err(FlagError::MissingArgument {
                    flag: spec.long_name.clone(),
                }
                .into());
            }
            check_flag_permission(spec, context, checker)?;
            check_duplicate(spec, context)?;
            context.flags_mut().add_present(&spec.long_name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::standard::{IntegerParser, StringParser};

    fn checker_allowing_all() -> PermissionChecker<()> {
        Arc::new(|_: &(), _: &str| true)
    }

    fn checker_denying(denied: &'static str) -> PermissionChecker<()> {
        Arc::new(move |_: &(), permission: &str| permission != denied)
    }

    fn group() -> FlagGroup<()> {
        let mut group = FlagGroup::new();
        group.add(FlagSpec::presence("silent").alias('s')).unwrap();
        group.add(FlagSpec::presence("verbose").alias('v')).unwrap();
        group
            .add(FlagSpec::with_value("file", StringParser::quoted()).alias('f'))
            .unwrap();
        group
            .add(FlagSpec::with_value("tag", StringParser::quoted()).repeatable())
            .unwrap();
        group
            .add(
                FlagSpec::with_value("level", IntegerParser::new(0..=3))
                    .permission("flags.level"),
            )
            .unwrap();
        group
    }

    fn context() -> CommandContext<()> {
        CommandContext::new((), String::new(), false)
    }

    #[test]
    fn test_looks_like_flag() {
        assert!(looks_like_flag("--file"));
        assert!(looks_like_flag("-s"));
        assert!(looks_like_flag("-abc"));
        assert!(!looks_like_flag("-"));
        assert!(!looks_like_flag("-5"));
        assert!(!looks_like_flag("-.5"));
        assert!(!looks_like_flag("word"));
    }

    #[test]
    fn test_flag_name_validation() {
        assert!(FlagSpec::<()>::presence("valid-name_1").validate().is_ok());
        assert!(matches!(
            FlagSpec::<()>::presence("1bad").validate(),
            Err(RegistrationError::InvalidFlagName { .. })
        ));
        assert!(matches!(
            FlagSpec::<()>::presence("ok").alias('1').validate(),
            Err(RegistrationError::InvalidFlagAlias { .. })
        ));
    }

    #[test]
    fn test_group_rejects_collisions() {
        let mut group = group();
        assert!(matches!(
            group.add(FlagSpec::presence("silent")),
            Err(RegistrationError::Ambiguity { .. })
        ));
        assert!(matches!(
            group.add(FlagSpec::presence("other").alias('s')),
            Err(RegistrationError::Ambiguity { .. })
        ));
    }

    #[tokio::test]
    async fn test_long_and_value_flags_in_any_order() {
        let group = group();
        let mut ctx = context();
        let mut cursor = InputCursor::new("--verbose --file a.txt --tag x --tag y");
        parse_flags(&group, &mut ctx, &mut cursor, &checker_allowing_all(), false)
            .await
            .unwrap();
        assert!(ctx.flags().is_present("verbose"));
        assert_eq!(ctx.flags().first::<String>("file"), Some("a.txt".into()));
        assert_eq!(
            ctx.flags().all::<String>("tag"),
            vec!["x".to_string(), "y".to_string()]
        );
    }

    #[tokio::test]
    async fn test_missing_value_is_reported() {
        let group = group();
        let mut ctx = context();
        let mut cursor = InputCursor::new("--tag x --file");
        let error = parse_flags(&group, &mut ctx, &mut cursor, &checker_allowing_all(), false)
            .await
            .unwrap_err();
        assert!(matches!(
            error,
            CommandError::FlagParse(FlagError::MissingArgument { ref flag }) if flag == "file"
        ));
    }

    #[tokio::test]
    async fn test_duplicate_single_flag() {
        let group = group();
        let mut ctx = context();
        let mut cursor = InputCursor::new("--silent --silent");
        let error = parse_flags(&group, &mut ctx, &mut cursor, &checker_allowing_all(), false)
            .await
            .unwrap_err();
        assert!(matches!(
            error,
            CommandError::FlagParse(FlagError::DuplicateFlag { ref flag }) if flag == "silent"
        ));
    }

    #[tokio::test]
    async fn test_unknown_flag() {
        let group = group();
        let mut ctx = context();
        let mut cursor = InputCursor::new("--nope");
        let error = parse_flags(&group, &mut ctx, &mut cursor, &checker_allowing_all(), false)
            .await
            .unwrap_err();
        assert!(matches!(
            error,
            CommandError::FlagParse(FlagError::UnknownFlag { ref flag }) if flag == "--nope"
        ));
    }

    #[tokio::test]
    async fn test_combined_short_flags() {
        let group = group();
        let mut ctx = context();
        let mut cursor = InputCursor::new("-sv");
        parse_flags(&group, &mut ctx, &mut cursor, &checker_allowing_all(), false)
            .await
            .unwrap();
        assert!(ctx.flags().is_present("silent"));
        assert!(ctx.flags().is_present("verbose"));
    }

    #[tokio::test]
    async fn test_combined_short_rejects_value_flags() {
        let group = group();
        let mut ctx = context();
        let mut cursor = InputCursor::new("-sf");
        let error = parse_flags(&group, &mut ctx, &mut cursor, &checker_allowing_all(), false)
            .await
            .unwrap_err();
        assert!(matches!(
            error,
            CommandError::FlagParse(FlagError::MissingArgument { ref flag }) if flag == "file"
        ));
    }

    #[tokio::test]
    async fn test_flag_permission_gate() {
        let group = group();
        let mut ctx = context();
        let mut cursor = InputCursor::new("--level 2");
        let error = parse_flags(
            &group,
            &mut ctx,
            &mut cursor,
            &checker_denying("flags.level"),
            false,
        )
        .await
        .unwrap_err();
        assert!(matches!(
            error,
            CommandError::FlagParse(FlagError::NoPermission { .. })
        ));
    }

    #[tokio::test]
    async fn test_trailing_non_flag_token() {
        let group = group();
        let mut ctx = context();
        let mut cursor = InputCursor::new("--silent junk");
        let error = parse_flags(&group, &mut ctx, &mut cursor, &checker_allowing_all(), false)
            .await
            .unwrap_err();
        assert!(matches!(
            error,
            CommandError::FlagParse(FlagError::NoFlagStarted { ref input }) if input == "junk"
        ));
    }

    #[tokio::test]
    async fn test_absorb_mode_stops_at_non_flag() {
        let group = group();
        let mut ctx = context();
        let mut cursor = InputCursor::new("--silent Alice");
        parse_flags(&group, &mut ctx, &mut cursor, &checker_allowing_all(), true)
            .await
            .unwrap();
        assert!(ctx.flags().is_present("silent"));
        assert_eq!(cursor.peek_word(), "Alice");
    }

    #[tokio::test]
    async fn test_flag_value_parse_failure_surfaces() {
        let group = group();
        let mut ctx = context();
        let mut cursor = InputCursor::new("--level nine");
        let error = parse_flags(&group, &mut ctx, &mut cursor, &checker_allowing_all(), false)
            .await
            .unwrap_err();
        assert!(matches!(error, CommandError::ArgumentParse(_)));
    }
}
