//! Suggestion engine tests: prefix filtering, argument providers, flag
//! forms, and idempotence.

use cloud_core::command::Command;
use cloud_core::flags::FlagSpec;
use cloud_core::manager::{CommandManager, ManagerSettings};
use cloud_core::parser::standard::{BooleanParser, IntegerParser, StringParser};
use cloud_core::parser::StaticSuggestions;

fn texts(suggestions: Vec<cloud_core::Suggestion>) -> Vec<String> {
    suggestions.into_iter().map(|s| s.text).collect()
}

fn sample_manager() -> CommandManager<()> {
    let mut manager = CommandManager::new();
    manager
        .register(
            Command::new("give")
                .required(
                    "player",
                    StringParser::single(),
                )
                .suggestions(StaticSuggestions::new(["Alice", "Bob", "alfred"]))
                .required("item", StringParser::single())
                .optional_with_default("amount", IntegerParser::new(1..=64), 1)
                .flag(FlagSpec::presence("silent").alias('s'))
                .handler_blocking(|_| Ok(())),
        )
        .unwrap();
    manager
        .register(
            Command::new("gamemode")
                .required("mode", IntegerParser::new(0..=3))
                .handler_blocking(|_| Ok(())),
        )
        .unwrap();
    manager
        .register(Command::new("op").literal("add").handler_blocking(|_| Ok(())))
        .unwrap();
    manager
        .register(Command::new("op").literal("remove").handler_blocking(|_| Ok(())))
        .unwrap();
    manager
        .register(
            Command::new("pack")
                .flag(FlagSpec::with_value("file", StringParser::quoted()).alias('f'))
                .flag(FlagSpec::presence("verbose").alias('v'))
                .flag(FlagSpec::with_value("tag", StringParser::quoted()).repeatable())
                .flag(FlagSpec::with_value("level", IntegerParser::new(0..=3)))
                .handler_blocking(|_| Ok(())),
        )
        .unwrap();
    manager
}

#[tokio::test]
async fn test_top_level_prefix() {
    let manager = sample_manager();
    let suggestions = texts(manager.suggest((), "g").await);
    assert_eq!(suggestions, vec!["give", "gamemode"]);
}

#[tokio::test]
async fn test_prefix_filter_is_case_insensitive() {
    let manager = sample_manager();
    let suggestions = texts(manager.suggest((), "GIV").await);
    assert_eq!(suggestions, vec!["give"]);
}

#[tokio::test]
async fn test_unknown_top_level_is_empty() {
    let manager = sample_manager();
    assert!(manager.suggest((), "zap x").await.is_empty());
}

#[tokio::test]
async fn test_force_suggestion_emits_empty_candidate() {
    let settings = ManagerSettings {
        force_suggestion: true,
        ..ManagerSettings::default()
    };
    let mut manager: CommandManager<()> = CommandManager::with_settings(settings);
    manager
        .register(Command::new("only").handler_blocking(|_| Ok(())))
        .unwrap();
    let suggestions = manager.suggest((), "nothing matches this").await;
    assert_eq!(texts(suggestions), vec![String::new()]);
}

#[tokio::test]
async fn test_literal_children_after_trailing_space() {
    let manager = sample_manager();
    let suggestions = texts(manager.suggest((), "op ").await);
    assert_eq!(suggestions, vec!["add", "remove"]);
}

#[tokio::test]
async fn test_literal_children_with_partial() {
    let manager = sample_manager();
    let suggestions = texts(manager.suggest((), "op a").await);
    assert_eq!(suggestions, vec!["add"]);
}

#[tokio::test]
async fn test_custom_provider_on_variable() {
    let manager = sample_manager();
    let suggestions = texts(manager.suggest((), "give ").await);
    assert_eq!(suggestions, vec!["Alice", "Bob", "alfred"]);

    let suggestions = texts(manager.suggest((), "give al").await);
    assert_eq!(suggestions, vec!["Alice", "alfred"]);
}

#[tokio::test]
async fn test_numeric_digit_extension() {
    let manager = sample_manager();
    let suggestions = texts(manager.suggest((), "gamemode ").await);
    assert_eq!(suggestions, vec!["0", "1", "2", "3"]);

    let suggestions = texts(manager.suggest((), "give Alice stone 1").await);
    assert_eq!(suggestions, vec!["1", "10", "11", "12", "13", "14", "15", "16", "17", "18", "19"]);
}

#[tokio::test]
async fn test_flag_forms_after_dash() {
    let manager = sample_manager();
    let suggestions = texts(manager.suggest((), "give Alice stone -").await);
    assert_eq!(suggestions, vec!["--silent", "-s"]);
}

#[tokio::test]
async fn test_flag_long_form_prefix() {
    let manager = sample_manager();
    let suggestions = texts(manager.suggest((), "pack --f").await);
    assert_eq!(suggestions, vec!["--file"]);
}

#[tokio::test]
async fn test_used_single_flags_are_not_resuggested() {
    let manager = sample_manager();
    let suggestions = texts(manager.suggest((), "pack --verbose --").await);
    assert_eq!(suggestions, vec!["--file", "--tag", "--level"]);
}

#[tokio::test]
async fn test_repeatable_flag_is_resuggested() {
    let manager = sample_manager();
    let suggestions = texts(manager.suggest((), "pack --tag x --ta").await);
    assert_eq!(suggestions, vec!["--tag"]);
}

#[tokio::test]
async fn test_pending_flag_value_delegates_to_parser() {
    let manager = sample_manager();
    let suggestions = texts(manager.suggest((), "pack --level ").await);
    assert_eq!(suggestions, vec!["0", "1", "2", "3"]);

    let suggestions = texts(manager.suggest((), "pack --level 2").await);
    assert_eq!(suggestions, vec!["2"]);
}

#[tokio::test]
async fn test_boolean_parser_suggestions() {
    let mut manager: CommandManager<()> = CommandManager::new();
    manager
        .register(
            Command::new("toggle")
                .required("state", BooleanParser::strict())
                .handler_blocking(|_| Ok(())),
        )
        .unwrap();
    let suggestions = texts(manager.suggest((), "toggle t").await);
    assert_eq!(suggestions, vec!["true"]);
}

#[tokio::test]
async fn test_optional_descent_reaches_flags() {
    // With nothing typed after the positionals, both the optional amount's
    // candidates and the flag forms are eligible.
    let manager = sample_manager();
    let suggestions = texts(manager.suggest((), "give Alice stone ").await);
    assert!(suggestions.contains(&"1".to_string()));
    assert!(suggestions.contains(&"--silent".to_string()));
}

#[tokio::test]
async fn test_suggestions_do_not_mutate_state() {
    let manager = sample_manager();
    let first = texts(manager.suggest((), "give Alice stone -").await);
    let second = texts(manager.suggest((), "give Alice stone -").await);
    assert_eq!(first, second);
    assert_eq!(manager.commands().len(), 5);
}

#[tokio::test]
async fn test_permission_filtered_flags() {
    let mut manager: CommandManager<&'static str> = CommandManager::new()
        .with_permission_checker(|sender: &&str, _permission: &str| *sender == "admin");
    manager
        .register(
            Command::new("list")
                .flag(FlagSpec::presence("all").permission("list.all"))
                .flag(FlagSpec::presence("brief"))
                .handler_blocking(|_| Ok(())),
        )
        .unwrap();

    let guest = texts(manager.suggest("guest", "list --").await);
    assert_eq!(guest, vec!["--brief"]);
    let admin = texts(manager.suggest("admin", "list --").await);
    assert_eq!(admin, vec!["--all", "--brief"]);
}

#[tokio::test]
async fn test_permission_filtered_literals() {
    let mut manager: CommandManager<&'static str> = CommandManager::new()
        .with_permission_checker(|sender: &&str, _permission: &str| *sender == "admin");
    manager
        .register(
            Command::new("admin")
                .permission("admin.use")
                .handler_blocking(|_| Ok(())),
        )
        .unwrap();
    manager
        .register(Command::new("anyone").handler_blocking(|_| Ok(())))
        .unwrap();

    let guest = texts(manager.suggest("guest", "a").await);
    assert_eq!(guest, vec!["anyone"]);
    let admin = texts(manager.suggest("admin", "a").await);
    assert_eq!(admin, vec!["admin", "anyone"]);
}

#[tokio::test]
async fn test_greedy_parser_full_sentence_focus() {
    let mut manager: CommandManager<()> = CommandManager::new();
    manager
        .register(
            Command::new("say")
                .required("message", StringParser::greedy())
                .suggestions(StaticSuggestions::new(["hello there", "help me"]))
                .handler_blocking(|_| Ok(())),
        )
        .unwrap();

    // The greedy parser swallows the tail; candidates are anchored after
    // the last whitespace.
    let suggestions = texts(manager.suggest((), "say hel").await);
    assert_eq!(suggestions, vec!["hello there", "help me"]);
}

#[tokio::test]
async fn test_liberal_mode_suggests_positionals_after_flags() {
    let settings = ManagerSettings {
        liberal_flag_parsing: true,
        ..ManagerSettings::default()
    };
    let mut manager: CommandManager<()> = CommandManager::with_settings(settings);
    manager
        .register(
            Command::new("give")
                .required("player", StringParser::single())
                .suggestions(StaticSuggestions::new(["Alice", "Bob"]))
                .flag(FlagSpec::presence("silent").alias('s'))
                .handler_blocking(|_| Ok(())),
        )
        .unwrap();

    let suggestions = texts(manager.suggest((), "give -s Al").await);
    assert_eq!(suggestions, vec!["Alice"]);
}
