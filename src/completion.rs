//! # Shell Completion Module
//!
//! Generation of completion scripts through clap's completion system. Model
//! names, shells and file arguments complete from the CLI definition.
//!
//! ## Usage
//!
//! ```bash
//! # Generate bash completions
//! dayscore completion bash > ~/.local/share/bash-completion/completions/dayscore
//!
//! # Generate fish completions
//! dayscore completion fish > ~/.config/fish/completions/dayscore.fish
//! ```

use crate::cli::Shell;
use clap::Command;
use clap_complete::{generate, Generator, Shell as CompletionShell};
use std::io::{self, Write};

/// Generate shell completions for the given shell on stdout
pub fn generate_completions<G: Generator>(gen: G, cmd: &mut Command) {
    write_completions(gen, cmd, &mut io::stdout());
}

/// Write a completion script to any writer
pub fn write_completions<G: Generator>(gen: G, cmd: &mut Command, out: &mut dyn Write) {
    let name = cmd.get_name().to_string();
    generate(gen, cmd, name, out);
}

/// Convert our Shell enum to clap_complete's Shell enum
pub fn shell_to_completion_shell(shell: &Shell) -> CompletionShell {
    match shell {
        Shell::Bash => CompletionShell::Bash,
        Shell::Zsh => CompletionShell::Zsh,
        Shell::Fish => CompletionShell::Fish,
        Shell::PowerShell => CompletionShell::PowerShell,
        Shell::Elvish => CompletionShell::Elvish,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Args;
    use clap::CommandFactory;

    #[test]
    fn test_shell_conversion() {
        assert_eq!(shell_to_completion_shell(&Shell::Fish), CompletionShell::Fish);
        assert_eq!(shell_to_completion_shell(&Shell::PowerShell), CompletionShell::PowerShell);
    }

    #[test]
    fn test_bash_script_lists_subcommands_and_models() {
        let mut buf = Vec::new();
        write_completions(CompletionShell::Bash, &mut Args::command(), &mut buf);
        let script = String::from_utf8(buf).unwrap();
        assert!(script.contains("dayscore"));
        assert!(script.contains("activities"));
        assert!(script.contains("musicgen-melody"));
    }
}
