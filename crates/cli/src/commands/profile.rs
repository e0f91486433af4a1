//! Profile management commands
//!
//! A profile names the root of a store and an optional token for it.

use clap::Subcommand;
use serde::Serialize;

use largo_core::{Profile, ProfileManager};

use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};

/// Profile subcommands
#[derive(Subcommand, Debug)]
pub enum ProfileCommands {
    /// Add or update a profile
    Set(SetArgs),

    /// List all configured profiles
    List,

    /// Remove a profile
    Remove(RemoveArgs),
}

/// Arguments for the `profile set` command
#[derive(clap::Args, Debug)]
pub struct SetArgs {
    /// Profile name (e.g., "local", "archive")
    pub name: String,

    /// Store root directory
    pub root: String,

    /// Auth token handed to the backend
    #[arg(long)]
    pub token: Option<String>,
}

/// Arguments for the `profile remove` command
#[derive(clap::Args, Debug)]
pub struct RemoveArgs {
    /// Name of the profile to remove
    pub name: String,
}

/// Profile information for output, without the token
#[derive(Serialize)]
struct ProfileInfo {
    name: String,
    root: String,
    has_token: bool,
}

impl From<&Profile> for ProfileInfo {
    fn from(profile: &Profile) -> Self {
        Self {
            name: profile.name.clone(),
            root: profile.root.clone(),
            has_token: profile.token.is_some(),
        }
    }
}

#[derive(Serialize)]
struct ProfileOperationOutput {
    success: bool,
    profile: String,
    message: String,
}

/// Execute a profile subcommand
pub fn execute(cmd: ProfileCommands, output_config: OutputConfig) -> ExitCode {
    let formatter = Formatter::new(output_config);

    let manager = match ProfileManager::new() {
        Ok(manager) => manager,
        Err(e) => {
            formatter.error(&format!("Failed to load configuration: {e}"));
            return ExitCode::GeneralError;
        }
    };

    match cmd {
        ProfileCommands::Set(args) => execute_set(args, &manager, &formatter),
        ProfileCommands::List => execute_list(&manager, &formatter),
        ProfileCommands::Remove(args) => execute_remove(args, &manager, &formatter),
    }
}

fn execute_set(args: SetArgs, manager: &ProfileManager, formatter: &Formatter) -> ExitCode {
    // Store roots are kept absolute so commands work from any directory
    let root = match std::path::absolute(&args.root) {
        Ok(root) => root.to_string_lossy().into_owned(),
        Err(e) => {
            formatter.error(&format!("Invalid root '{}': {e}", args.root));
            return ExitCode::UsageError;
        }
    };

    let mut profile = Profile::new(&args.name, root);
    profile.token = args.token;

    match manager.set(profile) {
        Ok(()) => {
            let message = format!("Profile '{}' configured successfully", args.name);
            if formatter.is_json() {
                formatter.json(&ProfileOperationOutput {
                    success: true,
                    profile: args.name,
                    message,
                });
            } else {
                formatter.success(&message);
            }
            ExitCode::Success
        }
        Err(e) => {
            formatter.error(&format!("Failed to save profile: {e}"));
            ExitCode::from_error(&e)
        }
    }
}

fn execute_list(manager: &ProfileManager, formatter: &Formatter) -> ExitCode {
    let profiles = match manager.list() {
        Ok(profiles) => profiles,
        Err(e) => {
            formatter.error(&format!("Failed to list profiles: {e}"));
            return ExitCode::from_error(&e);
        }
    };

    let infos: Vec<ProfileInfo> = profiles.iter().map(ProfileInfo::from).collect();
    if formatter.is_json() {
        formatter.json(&serde_json::json!({ "profiles": infos }));
        return ExitCode::Success;
    }

    if infos.is_empty() {
        formatter.println("No profiles configured.");
        return ExitCode::Success;
    }

    let mut table = formatter.table(["Name", "Root", "Token"]);
    for info in &infos {
        let token = if info.has_token { "yes" } else { "-" };
        table.add_row([info.name.as_str(), info.root.as_str(), token]);
    }
    formatter.print_table(&table);
    ExitCode::Success
}

fn execute_remove(args: RemoveArgs, manager: &ProfileManager, formatter: &Formatter) -> ExitCode {
    match manager.remove(&args.name) {
        Ok(()) => {
            let message = format!("Profile '{}' removed successfully", args.name);
            if formatter.is_json() {
                formatter.json(&ProfileOperationOutput {
                    success: true,
                    profile: args.name,
                    message,
                });
            } else {
                formatter.success(&message);
            }
            ExitCode::Success
        }
        Err(e) => {
            formatter.error(&e.to_string());
            ExitCode::from_error(&e)
        }
    }
}
