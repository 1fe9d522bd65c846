#![cfg(feature = "cli")]
//! Integration tests for `wdat completions`.

use clap::CommandFactory;
use wdat::cli::app::Cli;

fn generate_completions(shell: clap_complete::Shell) -> String {
    let mut cmd = Cli::command();
    let mut buf = Vec::new();
    clap_complete::generate(shell, &mut cmd, "wdat", &mut buf);
    String::from_utf8(buf).expect("completions should be valid UTF-8")
}

#[test]
fn bash_completions_contain_subcommands() {
    let output = generate_completions(clap_complete::Shell::Bash);
    assert!(output.contains("wdat"));
    assert!(output.contains("hash"));
    assert!(output.contains("info"));
    assert!(output.contains("completions"));
    assert!(output.contains("--with-filename"));
}

#[test]
fn zsh_and_fish_completions_name_the_binary() {
    for shell in [clap_complete::Shell::Zsh, clap_complete::Shell::Fish] {
        let output = generate_completions(shell);
        assert!(output.contains("wdat"), "{shell} completions missing binary name");
    }
}

#[test]
fn cli_definition_is_consistent() {
    Cli::command().debug_assert();
}
