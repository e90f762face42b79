//! Shell completions generation command.
//!
//! # Usage
//!
//! ```bash
//! qap completions bash > ~/.local/share/bash-completion/completions/qap
//! qap completions zsh -o ~/.zsh/completions/_qap
//! ```

use crate::cli::{Cli, CompletionsArgs, ShellType};
use crate::error::{Result, ResultExt};
use clap::CommandFactory;
use clap_complete::{Shell, generate};
use std::io;
use tracing::info;

/// Execute the completions command.
///
/// # Errors
///
/// Returns an error if file I/O fails.
pub fn execute(args: &CompletionsArgs) -> Result<()> {
    info!(shell = ?args.shell, output = ?args.output, "Generating shell completions");

    let mut cmd = Cli::command();
    let shell = convert_shell_type(args.shell);

    if let Some(output_path) = &args.output {
        let mut file = std::fs::File::create(output_path)
            .with_context(|| format!("creating {}", output_path.display()))?;
        generate(shell, &mut cmd, "qap", &mut file);
        info!(path = %output_path.display(), "Wrote completion script");
        eprintln!("Generated {shell} completions to {}", output_path.display());
    } else {
        generate(shell, &mut cmd, "qap", &mut io::stdout());
    }

    Ok(())
}

const fn convert_shell_type(shell: ShellType) -> Shell {
    match shell {
        ShellType::Bash => Shell::Bash,
        ShellType::Zsh => Shell::Zsh,
        ShellType::Fish => Shell::Fish,
        ShellType::PowerShell => Shell::PowerShell,
        ShellType::Elvish => Shell::Elvish,
    }
}
