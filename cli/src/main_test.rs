use clap::CommandFactory;

use super::*;

fn env_of(subcommand: &str, arg: &str) -> (Option<String>, bool) {
    let cli = Cli::command();
    let sub = cli.find_subcommand(subcommand).unwrap();
    let arg = sub.get_arguments().find(|a| a.get_id() == arg).unwrap();
    (arg.get_env().map(|e| e.to_string_lossy().into_owned()), arg.is_hide_env_values_set())
}

// =============================================================================
// secrets
// =============================================================================

#[test]
fn password_args_read_hidden_env() {
    assert_eq!(env_of("change-password", "current"), (Some("REFORM_CURRENT_PASSWORD".to_owned()), true));
    assert_eq!(env_of("change-password", "new"), (Some("REFORM_NEW_PASSWORD".to_owned()), true));
    assert_eq!(env_of("change-password", "confirm"), (Some("REFORM_CONFIRM_PASSWORD".to_owned()), true));
    assert_eq!(env_of("login", "password"), (Some("REFORM_PASSWORD".to_owned()), true));
    assert_eq!(env_of("signup", "password"), (Some("REFORM_PASSWORD".to_owned()), true));
}

#[test]
fn cli_definition_is_consistent() {
    Cli::command().debug_assert();
}

// =============================================================================
// config flags
// =============================================================================

#[test]
fn config_flags_are_optional_overrides() {
    let cli = Cli::try_parse_from(["reform", "whoami"]).unwrap();
    assert_eq!(cli.base_url, None);
    assert_eq!(cli.session_file, None);
    assert_eq!(cli.timeout_secs, None);

    let cli = Cli::try_parse_from(["reform", "--base-url", "http://flag.test", "--timeout-secs", "4", "me"]).unwrap();
    assert_eq!(cli.base_url.as_deref(), Some("http://flag.test"));
    assert_eq!(cli.timeout_secs, Some(4));
}

#[test]
fn parse_date_accepts_iso_only() {
    assert!(parse_date("2025-01-05").is_ok());
    assert!(parse_date("01/05/2025").is_err());
}
