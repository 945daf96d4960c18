//! Shell completions generator

use anyhow::{Context, Result};
use clap::{Args, CommandFactory};
use clap_complete::{generate, Shell};
use std::io::{self, Write};
use std::path::PathBuf;

use crate::args::Args as CliArgs;

/// Completions command arguments
#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,

    /// Write to a file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

/// Write the completion script for `shell` into `out`
fn render(shell: Shell, out: &mut dyn Write) {
    let mut cmd = CliArgs::command();
    let bin_name = cmd.get_name().to_string();
    generate(shell, &mut cmd, bin_name, out);
}

/// Execute completions command
pub fn execute(args: CompletionsArgs) -> Result<()> {
    match args.output {
        Some(path) => {
            let mut file = std::fs::File::create(&path)
                .with_context(|| format!("Failed to create {}", path.display()))?;
            render(args.shell, &mut file);
        }
        None => render(args.shell, &mut io::stdout()),
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_mentions_subcommands() {
        for shell in [Shell::Bash, Shell::Zsh, Shell::Fish] {
            let mut out = Vec::new();
            render(shell, &mut out);
            let script = String::from_utf8(out).unwrap();
            assert!(script.contains("dpi-bypass"), "{shell}");
            assert!(script.contains("completions"), "{shell}");
        }
    }
}
