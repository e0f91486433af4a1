//! CLI command definitions and execution
//!
//! Every command resolves a `profile/container[/key]` path, opens the store
//! the profile points at and reports through the shared [`Formatter`].

use clap::{Parser, Subcommand};
use largo_core::{parse_remote_path, ObjectPath, ProfileManager};
use largo_fs::FsStore;

use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};

mod completions;
mod ls;
mod mb;
mod profile;
mod put;
mod stat;
mod tree;

/// largo - segmented large object client
///
/// Uploads large files as resumable segments behind a manifest and browses
/// flat object stores as folders.
#[derive(Parser, Debug)]
#[command(name = "largo")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format: human-readable or JSON
    #[arg(long, global = true, default_value = "false")]
    pub json: bool,

    /// Disable colored output
    #[arg(long, global = true, default_value = "false")]
    pub no_color: bool,

    /// Disable progress bar
    #[arg(long, global = true, default_value = "false")]
    pub no_progress: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true, default_value = "false")]
    pub quiet: bool,

    /// Enable debug logging
    #[arg(long, global = true, default_value = "false")]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage storage profiles
    #[command(subcommand)]
    Profile(profile::ProfileCommands),

    /// Create a container
    Mb(mb::MbArgs),

    /// Upload a file as a segmented large object
    Put(put::PutArgs),

    /// List one folder level of a container
    Ls(ls::LsArgs),

    /// Show the folder tree of a container
    Tree(tree::TreeArgs),

    /// Show object metadata
    Stat(stat::StatArgs),

    /// Generate shell completions
    Completions(completions::CompletionsArgs),
}

/// Execute the CLI command and return an exit code
pub async fn execute(cli: Cli) -> ExitCode {
    let output_config = OutputConfig {
        json: cli.json,
        no_color: cli.no_color,
        no_progress: cli.no_progress,
        quiet: cli.quiet,
    };

    match cli.command {
        Commands::Profile(cmd) => profile::execute(cmd, output_config),
        Commands::Mb(args) => mb::execute(args, output_config).await,
        Commands::Put(args) => put::execute(args, output_config).await,
        Commands::Ls(args) => ls::execute(args, output_config).await,
        Commands::Tree(args) => tree::execute(args, output_config).await,
        Commands::Stat(args) => stat::execute(args, output_config).await,
        Commands::Completions(args) => completions::execute(args),
    }
}

/// Parse a remote path and open the store of its profile
///
/// Failures are reported through `formatter` and turned into the exit code
/// the command should return.
pub(crate) async fn open_remote(
    path: &str,
    formatter: &Formatter,
) -> Result<(ObjectPath, FsStore), ExitCode> {
    let remote = parse_remote_path(path).map_err(|e| {
        formatter.error(&e.to_string());
        ExitCode::UsageError
    })?;

    let profile = ProfileManager::new()
        .and_then(|manager| manager.get(&remote.profile))
        .map_err(|e| {
            formatter.error(&e.to_string());
            ExitCode::from_error(&e)
        })?;

    let store = FsStore::from_profile(&profile).await.map_err(|e| {
        formatter.error(&format!("Failed to open store '{}': {e}", profile.root));
        ExitCode::from_error(&e)
    })?;

    tracing::debug!(profile = %profile.name, root = %profile.root, "opened store");
    Ok((remote, store))
}
