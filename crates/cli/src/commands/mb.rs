//! mb command - Make container
//!
//! Creates a new container in the store of a profile.

use clap::Args;
use largo_core::ObjectStore as _;
use serde::Serialize;

use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};

/// Create a container
#[derive(Args, Debug)]
pub struct MbArgs {
    /// Target path (profile/container)
    pub target: String,

    /// Ignore error if the container already exists
    #[arg(short = 'p', long)]
    pub ignore_existing: bool,
}

#[derive(Debug, Serialize)]
struct MbOutput {
    status: &'static str,
    container: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

/// Execute the mb command
pub async fn execute(args: MbArgs, output_config: OutputConfig) -> ExitCode {
    let formatter = Formatter::new(output_config);

    let (path, store) = match super::open_remote(&args.target, &formatter).await {
        Ok(opened) => opened,
        Err(code) => return code,
    };

    if !path.key.is_empty() {
        formatter.error(&format!(
            "Invalid target '{}'. Expected: profile/container",
            args.target
        ));
        return ExitCode::UsageError;
    }

    let container = path.container;
    let display = format!("{}/{container}", path.profile);

    match store.container_exists(&container).await {
        Ok(true) if args.ignore_existing => {
            if formatter.is_json() {
                formatter.json(&MbOutput {
                    status: "success",
                    container,
                    message: Some("Container already exists".to_string()),
                });
            } else {
                formatter.success(&format!("Container '{display}' already exists."));
            }
            return ExitCode::Success;
        }
        Ok(true) => {
            formatter.error(&format!("Container '{display}' already exists"));
            return ExitCode::Conflict;
        }
        Ok(false) => {}
        Err(e) => {
            formatter.error(&format!("Failed to check container: {e}"));
            return ExitCode::from_error(&e);
        }
    }

    match store.create_container(&container).await {
        Ok(()) => {
            if formatter.is_json() {
                formatter.json(&MbOutput {
                    status: "success",
                    container,
                    message: None,
                });
            } else {
                formatter.success(&format!("Container '{display}' created successfully."));
            }
            ExitCode::Success
        }
        Err(e) => {
            formatter.error(&format!("Failed to create container: {e}"));
            ExitCode::from_error(&e)
        }
    }
}
