// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

fn parse(args: &[&str]) -> Result<Command, ArgsError> {
    parse_args(args.iter().map(|s| s.to_string()))
}

#[test]
fn no_args_runs_with_defaults() {
    assert_eq!(parse(&[]), Ok(Command::Run(Overrides::default())));
}

#[parameterized(
    long_help = { "--help", Command::Help },
    short_help = { "-h", Command::Help },
    word_help = { "help", Command::Help },
    long_version = { "--version", Command::Version },
    short_version = { "-v", Command::Version },
    upper_version = { "-V", Command::Version },
)]
fn info_flags(flag: &str, expected: Command) {
    assert_eq!(parse(&[flag]), Ok(expected));
}

#[parameterized(
    separate = { &["--database-path", "/tmp/a.db"] },
    joined = { &["--database-path=/tmp/a.db"] },
)]
fn database_path_flag(args: &[&str]) {
    assert_eq!(
        parse(args),
        Ok(Command::Run(Overrides {
            database_path: Some(PathBuf::from("/tmp/a.db")),
        }))
    );
}

#[parameterized(
    dangling = { &["--database-path"] },
    empty_joined = { &["--database-path="] },
)]
fn database_path_needs_a_value(args: &[&str]) {
    assert_eq!(
        parse(args),
        Err(ArgsError::MissingValue("--database-path"))
    );
}

#[test]
fn unknown_argument_is_an_error() {
    assert_eq!(
        parse(&["--port", "7777"]),
        Err(ArgsError::Unexpected("--port".to_string()))
    );
}

#[test]
fn help_wins_after_other_flags() {
    assert_eq!(parse(&["--database-path", "x.db", "--help"]), Ok(Command::Help));
}

#[test]
fn help_text_mentions_version_and_flag() {
    let text = help_text();
    assert!(text.starts_with(&format!("hld {VERSION}")));
    assert!(text.contains("--database-path"));
}
