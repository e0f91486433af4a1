//! completions command - Print a shell completion script
//!
//! The script is generated from the `Cli` definition, so every subcommand and
//! flag of largo completes without a hand-written list.

use clap::CommandFactory;
use clap_complete::Shell;

use super::Cli;
use crate::exit_code::ExitCode;

const BIN_NAME: &str = "largo";

/// Generate shell completions
#[derive(clap::Args, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}

/// Execute the completions command
pub fn execute(args: CompletionsArgs) -> ExitCode {
    let script = render(args.shell);
    print!("{script}");
    ExitCode::Success
}

/// Completion script for `shell`
fn render(shell: Shell) -> String {
    let mut cmd = Cli::command();
    let mut buf = Vec::new();
    clap_complete::generate(shell, &mut cmd, BIN_NAME, &mut buf);
    String::from_utf8_lossy(&buf).into_owned()
}
